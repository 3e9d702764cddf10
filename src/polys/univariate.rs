//! Main components:
//! - `UniPoly`: an univariate dense polynomial in coefficient form (prover side),
//! - `RoundUnivariate`: a univariate polynomial in evaluation form over the
//!   domain `{0, 1, …, n-1}`, as sent in each sumcheck round and evaluated by
//!   the verifier through barycentric interpolation.
use crate::{
  errors::PipelineError,
  traits::FieldOps,
};
use ff::PrimeField;
use rayon::prelude::{IntoParallelIterator, ParallelIterator};
use serde::{Deserialize, Serialize};

// ax^2 + bx + c stored as vec![c, b, a]
// ax^3 + bx^2 + cx + d stored as vec![d, c, b, a]
/// A univariate dense polynomial in coefficient form.
///
/// For a polynomial $ax^2 + bx + c$, coefficients are stored as `vec![c, b, a]`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct UniPoly<Scalar: PrimeField> {
  pub(crate) coeffs: Vec<Scalar>,
}

impl<Scalar: PrimeField> UniPoly<Scalar> {
  /// Creates a `UniPoly` from a coefficient vector, least significant first.
  pub fn new(coeffs: Vec<Scalar>) -> Self {
    Self { coeffs }
  }

  /// Creates a `UniPoly` from its evaluations at consecutive integers starting
  /// from 0, interpolating with Gaussian elimination.
  pub fn from_evals(evals: &[Scalar]) -> Result<Self, PipelineError> {
    let n = evals.len();
    let xs: Vec<Scalar> = (0..n).map(|x| Scalar::from(x as u64)).collect();

    let mut matrix: Vec<Vec<Scalar>> = Vec::with_capacity(n);
    for i in 0..n {
      let mut row = Vec::with_capacity(n);
      let x = xs[i];
      row.push(Scalar::ONE);
      row.push(x);
      for j in 2..n {
        row.push(row[j - 1] * x);
      }
      row.push(evals[i]);
      matrix.push(row);
    }

    let coeffs = gaussian_elimination(&mut matrix)?;
    Ok(Self { coeffs })
  }

  /// Returns the degree of the polynomial.
  pub fn degree(&self) -> usize {
    self.coeffs.len() - 1
  }

  /// The coefficient vector, least significant first.
  pub fn coeffs(&self) -> &[Scalar] {
    &self.coeffs
  }

  /// Evaluates the polynomial at zero.
  pub fn eval_at_zero(&self) -> Scalar {
    self.coeffs[0]
  }

  /// Evaluates the polynomial at one.
  pub fn eval_at_one(&self) -> Scalar {
    (0..self.coeffs.len())
      .into_par_iter()
      .map(|i| self.coeffs[i])
      .sum()
  }

  /// Evaluates the polynomial at a given point `r`.
  pub fn evaluate(&self, r: &Scalar) -> Scalar {
    let mut eval = self.coeffs[0];
    let mut power = *r;
    for coeff in self.coeffs.iter().skip(1) {
      eval += power * coeff;
      power *= r;
    }
    eval
  }

  /// Adds `scale * other` into `self`, growing if needed.
  pub fn add_scaled(&mut self, other: &Self, scale: &Scalar) {
    if self.coeffs.len() < other.coeffs.len() {
      self.coeffs.resize(other.coeffs.len(), Scalar::ZERO);
    }
    for (c, o) in self.coeffs.iter_mut().zip(other.coeffs.iter()) {
      *c += *o * scale;
    }
  }

  /// Subtracts a constant from the polynomial.
  pub fn sub_constant(&mut self, v: &Scalar) {
    if self.coeffs.is_empty() {
      self.coeffs.push(-*v);
    } else {
      self.coeffs[0] -= v;
    }
  }

  /// Divides by the linear factor `(X - a)`, dropping the remainder.
  ///
  /// When `a` is a root the division is exact; the caller arranges that (the
  /// openings the quotients witness are of polynomials shifted by their
  /// claimed evaluation).
  pub fn divide_by_linear(&self, a: &Scalar) -> Self {
    let n = self.coeffs.len();
    if n <= 1 {
      return Self { coeffs: vec![] };
    }
    let mut quotient = vec![Scalar::ZERO; n - 1];
    let mut carry = Scalar::ZERO;
    for i in (0..n - 1).rev() {
      carry = self.coeffs[i + 1] + carry * a;
      quotient[i] = carry;
    }
    Self { coeffs: quotient }
  }
}

/// A univariate polynomial held as its evaluations over `{0, 1, …, n-1}`.
///
/// This is the shape of a sumcheck round message. It is generic over the
/// execution context's scalar so the verifier's barycentric evaluation runs
/// both natively and in-circuit.
#[derive(Clone, Debug)]
pub struct RoundUnivariate<T: FieldOps> {
  evals: Vec<T>,
}

impl<T: FieldOps> RoundUnivariate<T> {
  /// Wraps an evaluation vector.
  pub fn new(evals: Vec<T>) -> Self {
    Self { evals }
  }

  /// The number of evaluation points.
  pub fn len(&self) -> usize {
    self.evals.len()
  }

  /// Whether the evaluation vector is empty.
  pub fn is_empty(&self) -> bool {
    self.evals.is_empty()
  }

  /// The evaluation at zero.
  pub fn value_at_zero(&self) -> T {
    self.evals[0].clone()
  }

  /// The evaluation at one.
  pub fn value_at_one(&self) -> T {
    self.evals[1].clone()
  }

  /// Evaluates at an out-of-domain point by barycentric interpolation.
  ///
  /// Fails with `DivisionByZero` if `u` collides with a domain point; the
  /// challenges this is called with make that event negligible.
  pub fn evaluate(&self, u: &T) -> Result<T, PipelineError> {
    let n = self.evals.len();
    let weights = barycentric_weights::<T::Native>(n)?;

    // numerator Π (u - k)
    let mut full_product = T::one();
    for k in 0..n {
      full_product = full_product * (u.clone() - T::from_u64(k as u64));
    }

    let mut acc = T::zero();
    for (k, (eval, w)) in self.evals.iter().zip(weights.iter()).enumerate() {
      let denom_inv = (u.clone() - T::from_u64(k as u64)).invert()?;
      acc = acc + eval.clone() * T::from_native(*w) * denom_inv;
    }
    Ok(full_product * acc)
  }
}

/// Barycentric weights `w_k = 1 / Π_{j≠k} (k - j)` for the domain `{0, …, n-1}`.
fn barycentric_weights<F: PrimeField>(n: usize) -> Result<Vec<F>, PipelineError> {
  (0..n)
    .map(|k| {
      let mut denom = F::ONE;
      for j in 0..n {
        if j != k {
          let diff = if k > j {
            F::from((k - j) as u64)
          } else {
            -F::from((j - k) as u64)
          };
          denom *= diff;
        }
      }
      div_f(F::ONE, denom)
    })
    .collect()
}

/// Extends evaluations of a degree `< from` polynomial on `{0, …, from-1}` to
/// the domain `{0, …, target-1}` by Newton forward differences.
pub(crate) fn extend_evaluations<F: PrimeField>(evals: &mut Vec<F>, target: usize) {
  let from = evals.len();
  if from >= target {
    return;
  }

  // rightmost entry of each level of the difference triangle
  let mut diffs = vec![F::ZERO; from];
  let mut level = evals.clone();
  diffs[0] = level[from - 1];
  for j in 1..from {
    level = level.windows(2).map(|w| w[1] - w[0]).collect();
    diffs[j] = level[level.len() - 1];
  }

  for _ in from..target {
    for j in (0..from - 1).rev() {
      let next = diffs[j + 1];
      diffs[j] += next;
    }
    evals.push(diffs[0]);
  }
}

/// Performs Gaussian elimination on an augmented matrix to solve a linear system.
pub fn gaussian_elimination<F: PrimeField>(matrix: &mut [Vec<F>]) -> Result<Vec<F>, PipelineError> {
  let size = matrix.len();
  if size != matrix[0].len() - 1 {
    return Err(PipelineError::InvalidInputLength);
  }

  for i in 0..size - 1 {
    for j in i..size - 1 {
      echelon(matrix, i, j)?;
    }
  }

  for i in (1..size).rev() {
    eliminate(matrix, i)?;
  }

  #[allow(clippy::needless_range_loop)]
  for i in 0..size {
    if matrix[i][i] == F::ZERO {
      return Err(PipelineError::DivisionByZero);
    }
  }

  let mut result: Vec<F> = vec![F::ZERO; size];
  for i in 0..size {
    result[i] = div_f(matrix[i][size], matrix[i][i])?;
  }

  Ok(result)
}

fn echelon<F: PrimeField>(matrix: &mut [Vec<F>], i: usize, j: usize) -> Result<(), PipelineError> {
  let size = matrix.len();
  if matrix[i][i] != F::ZERO {
    let factor = div_f(matrix[j + 1][i], matrix[i][i])?;
    (i..size + 1).for_each(|k| {
      let tmp = matrix[i][k];
      matrix[j + 1][k] -= factor * tmp;
    });
  }
  Ok(())
}

fn eliminate<F: PrimeField>(matrix: &mut [Vec<F>], i: usize) -> Result<(), PipelineError> {
  let size = matrix.len();
  if matrix[i][i] != F::ZERO {
    for j in (1..i + 1).rev() {
      let factor = div_f(matrix[j - 1][i], matrix[i][i])?;
      for k in (0..size + 1).rev() {
        let tmp = matrix[i][k];
        matrix[j - 1][k] -= factor * tmp;
      }
    }
  }
  Ok(())
}

/// Division of two prime field elements, failing on a zero divisor.
pub fn div_f<F: PrimeField>(a: F, b: F) -> Result<F, PipelineError> {
  let inverse_b = b.invert();

  match inverse_b.into_option() {
    Some(inv) => Ok(a * inv),
    None => Err(PipelineError::DivisionByZero),
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use ff::Field;
  use halo2curves::bn256::Fr;
  use rand::{SeedableRng, rngs::StdRng};

  fn test_from_evals_cubic_with<F: PrimeField>() {
    // polynomial is x^3 + 2x^2 + 3x + 1
    let e0 = F::ONE;
    let e1 = F::from(7);
    let e2 = F::from(23);
    let e3 = F::from(55);
    let evals = vec![e0, e1, e2, e3];
    let poly = UniPoly::from_evals(&evals).unwrap();

    assert_eq!(poly.eval_at_zero(), e0);
    assert_eq!(poly.eval_at_one(), e1);
    assert_eq!(poly.coeffs.len(), 4);
    assert_eq!(poly.coeffs[1], F::from(3));
    assert_eq!(poly.coeffs[2], F::from(2));
    assert_eq!(poly.coeffs[3], F::from(1));

    let e4 = F::from(109);
    assert_eq!(poly.evaluate(&F::from(4)), e4);
  }

  #[test]
  fn test_from_evals_cubic() {
    test_from_evals_cubic_with::<Fr>();
  }

  #[test]
  fn test_barycentric_matches_interpolation() {
    let mut rng = StdRng::seed_from_u64(3);
    for n in 2..=8 {
      let evals: Vec<Fr> = (0..n).map(|_| Fr::random(&mut rng)).collect();
      let u = Fr::random(&mut rng);
      let direct = UniPoly::from_evals(&evals).unwrap().evaluate(&u);
      let bary = RoundUnivariate::new(evals).evaluate(&u).unwrap();
      assert_eq!(direct, bary);
    }
  }

  #[test]
  fn test_extend_evaluations() {
    // x^2 + 1 on {0,1,2}, extended to {0,…,6}
    let mut evals: Vec<Fr> = [1u64, 2, 5].iter().map(|&v| Fr::from(v)).collect();
    extend_evaluations(&mut evals, 7);
    let expect: Vec<Fr> = [1u64, 2, 5, 10, 17, 26, 37]
      .iter()
      .map(|&v| Fr::from(v))
      .collect();
    assert_eq!(evals, expect);
  }

  #[test]
  fn test_divide_by_linear() {
    // (X - 3)(2X + 5) = 2X^2 - X - 15
    let p = UniPoly::new(vec![-Fr::from(15), -Fr::ONE, Fr::from(2)]);
    let q = p.divide_by_linear(&Fr::from(3));
    assert_eq!(q.coeffs, vec![Fr::from(5), Fr::from(2)]);

    let mut rng = StdRng::seed_from_u64(9);
    let p = UniPoly::new((0..16).map(|_| Fr::random(&mut rng)).collect());
    let a = Fr::random(&mut rng);
    let mut shifted = p.clone();
    shifted.sub_constant(&p.evaluate(&a));
    let q = shifted.divide_by_linear(&a);
    // q * (X - a) == p - p(a) at a random point
    let x = Fr::random(&mut rng);
    assert_eq!(q.evaluate(&x) * (x - a), shifted.evaluate(&x));
  }
}
