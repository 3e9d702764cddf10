//! Multilinear polynomials over the boolean hypercube, stored as their
//! evaluation vector. Index bit `j` corresponds to variable `j`, so binding
//! variable 0 combines adjacent pairs `(2i, 2i+1)`.
use crate::{math::Math, polys::eq::EqPolynomial};
use ff::PrimeField;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

/// A multilinear polynomial given by its evaluations over `{0,1}^num_vars`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MultilinearPolynomial<Scalar: PrimeField> {
  Z: Vec<Scalar>,
}

impl<Scalar: PrimeField> MultilinearPolynomial<Scalar> {
  /// Wraps an evaluation vector; its length must be a power of two.
  pub fn new(Z: Vec<Scalar>) -> Self {
    assert!(Z.len().is_power_of_two());
    Self { Z }
  }

  /// An identically-zero polynomial over `{0,1}^num_vars`.
  pub fn zero(num_vars: usize) -> Self {
    Self {
      Z: vec![Scalar::ZERO; num_vars.pow2()],
    }
  }

  /// The number of evaluations (a power of two).
  pub fn len(&self) -> usize {
    self.Z.len()
  }

  /// Whether the evaluation vector is empty.
  pub fn is_empty(&self) -> bool {
    self.Z.is_empty()
  }

  /// The underlying evaluation vector.
  pub fn evals(&self) -> &[Scalar] {
    &self.Z
  }

  /// Binds variable 0 to `r`, halving the vector:
  /// `Z'[i] = Z[2i] + r·(Z[2i+1] - Z[2i])`.
  pub fn bind_low(&mut self, r: &Scalar) {
    let half = self.Z.len() / 2;
    let bound: Vec<Scalar> = (0..half)
      .into_par_iter()
      .map(|i| self.Z[2 * i] + *r * (self.Z[2 * i + 1] - self.Z[2 * i]))
      .collect();
    self.Z = bound;
  }

  /// Evaluates the polynomial at `point` (variable `j` = `point[j]`).
  pub fn evaluate(&self, point: &[Scalar]) -> Scalar {
    assert_eq!(self.Z.len(), point.len().pow2());
    let eq = EqPolynomial::new(point.to_vec()).evals();
    self
      .Z
      .par_iter()
      .zip(eq.par_iter())
      .map(|(z, e)| *z * e)
      .sum()
  }

  /// The next-row view: `S[i] = Z[i+1]`, last entry zero. Well-formed as a
  /// division by X only when `Z[0] = 0`, which the trace layout guarantees
  /// for every to-be-shifted polynomial.
  pub fn shifted(&self) -> Self {
    let mut Z = self.Z[1..].to_vec();
    Z.push(Scalar::ZERO);
    Self { Z }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use ff::Field;
  use halo2curves::bn256::Fr;
  use rand::{SeedableRng, rngs::StdRng};

  #[test]
  fn test_bind_low_matches_evaluate() {
    let mut rng = StdRng::seed_from_u64(1);
    let num_vars = 4;
    let mut poly =
      MultilinearPolynomial::new((0..1 << num_vars).map(|_| Fr::random(&mut rng)).collect());
    let point: Vec<Fr> = (0..num_vars).map(|_| Fr::random(&mut rng)).collect();

    let direct = poly.evaluate(&point);
    for r in &point {
      poly.bind_low(r);
    }
    assert_eq!(poly.len(), 1);
    assert_eq!(poly.evals()[0], direct);
  }

  #[test]
  fn test_shifted() {
    let poly = MultilinearPolynomial::new(
      [0u64, 2, 3, 4].iter().map(|&v| Fr::from(v)).collect::<Vec<_>>(),
    );
    let shifted = poly.shifted();
    assert_eq!(
      shifted.evals(),
      &[Fr::from(2), Fr::from(3), Fr::from(4), Fr::ZERO]
    );
  }
}
