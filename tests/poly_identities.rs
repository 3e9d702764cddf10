//! Property tests for the polynomial primitives.
use ff::Field;
use halo2curves::bn256::Fr;
use phalanx::polys::{eq::EqPolynomial, multilinear::MultilinearPolynomial, univariate::UniPoly};
use proptest::{collection::vec, prelude::*};

fn fr() -> impl Strategy<Value = Fr> {
  any::<u64>().prop_map(Fr::from)
}

proptest! {
  #![proptest_config(ProptestConfig { cases: 64, .. ProptestConfig::default() })]

  // p(X) - p(a) = q(X)·(X - a), checked at an independent point
  #[test]
  fn test_quotient_identity(coeffs in vec(fr(), 2..8), a in fr(), w in fr()) {
    let p = UniPoly::new(coeffs);
    let mut diff = p.clone();
    diff.sub_constant(&p.evaluate(&a));
    let q = diff.divide_by_linear(&a);
    prop_assert_eq!(p.evaluate(&w) - p.evaluate(&a), q.evaluate(&w) * (w - a));
  }

  #[test]
  fn test_interpolation_recovers_coefficients(coeffs in vec(fr(), 1..6)) {
    let p = UniPoly::new(coeffs);
    let evals: Vec<Fr> = (0..p.coeffs().len())
      .map(|i| p.evaluate(&Fr::from(i as u64)))
      .collect();
    let q = UniPoly::from_evals(&evals).unwrap();
    prop_assert_eq!(q.coeffs(), p.coeffs());
  }

  // the hypercube table agrees with pointwise evaluation and sums to one
  #[test]
  fn test_eq_table_is_consistent(point in vec(fr(), 1..5)) {
    let eq = EqPolynomial::new(point.clone());
    let table = eq.evals();
    let mut sum = Fr::ZERO;
    for (i, v) in table.iter().enumerate() {
      let corner: Vec<Fr> = (0..point.len())
        .map(|j| if (i >> j) & 1 == 1 { Fr::ONE } else { Fr::ZERO })
        .collect();
      prop_assert_eq!(*v, eq.evaluate(&corner));
      sum += v;
    }
    prop_assert_eq!(sum, Fr::ONE);
  }

  #[test]
  fn test_binding_matches_full_evaluation(vals in vec(fr(), 8), point in vec(fr(), 3)) {
    let mut p = MultilinearPolynomial::new(vals);
    let full = p.evaluate(&point);
    p.bind_low(&point[0]);
    prop_assert_eq!(p.evaluate(&point[1..]), full);
  }
}
