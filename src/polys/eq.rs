//! `EqPolynomial` and the gate-separator polynomial.
//!
//! The gate separator is the multilinear extension of `pow(x; β) = Π_j β_j^{x_j}`:
//! over the hypercube it takes products of subsets of the `β_j`, and binding
//! variable `i` to a challenge `u_i` multiplies a running partial evaluation by
//! `(1 - u_i) + u_i·β_i`. The prover uses the precomputed subset products per
//! edge; the verifier only folds the partial evaluation.
use crate::traits::FieldOps;
use ff::PrimeField;

/// The multilinear extension of the equality polynomial `eq(x, e)`.
///
/// Index bit `j` of the domain corresponds to variable `j`, matching the
/// binding order of [`crate::polys::multilinear::MultilinearPolynomial`].
#[derive(Debug)]
pub struct EqPolynomial<Scalar: PrimeField> {
  r: Vec<Scalar>,
}

impl<Scalar: PrimeField> EqPolynomial<Scalar> {
  /// Creates a new `EqPolynomial` pinned at the point `r`.
  pub const fn new(r: Vec<Scalar>) -> Self {
    EqPolynomial { r }
  }

  /// Evaluates at `rx`, which must have the same length as `r`.
  pub fn evaluate(&self, rx: &[Scalar]) -> Scalar {
    assert_eq!(self.r.len(), rx.len());
    (0..rx.len())
      .map(|i| rx[i] * self.r[i] + (Scalar::ONE - rx[i]) * (Scalar::ONE - self.r[i]))
      .fold(Scalar::ONE, |acc, item| acc * item)
  }

  /// Evaluates at all `2^|r|` points of the hypercube.
  pub fn evals(&self) -> Vec<Scalar> {
    let ell = self.r.len();
    let mut evals: Vec<Scalar> = vec![Scalar::ZERO; 1 << ell];
    let mut size = 1;
    evals[0] = Scalar::ONE;

    for r in self.r.iter() {
      let (evals_left, evals_right) = evals.split_at_mut(size);
      let (evals_right, _) = evals_right.split_at_mut(size);

      for (x, y) in evals_left.iter_mut().zip(evals_right.iter_mut()) {
        *y = *x * r;
        *x -= &*y;
      }

      size *= 2;
    }

    evals
  }
}

/// The gate-separator (pow) polynomial, shared by the sumcheck prover and
/// verifier. Generic over the context scalar so the verifier-side folding runs
/// in-circuit as well.
#[derive(Debug, Clone)]
pub struct GateSeparatorPolynomial<T: FieldOps> {
  /// The separator challenges `β_0, …, β_{d-1}`.
  pub betas: Vec<T>,
  beta_products: Vec<T>,
  current_element_idx: usize,
  periodicity: usize,
  /// `Π_{i bound so far} ((1 - u_i) + u_i·β_i)`.
  pub partial_evaluation_result: T,
}

impl<T: FieldOps> GateSeparatorPolynomial<T> {
  /// Verifier-side construction: no per-edge products.
  pub fn new(betas: Vec<T>) -> Self {
    Self {
      betas,
      beta_products: Vec::new(),
      current_element_idx: 0,
      periodicity: 2,
      partial_evaluation_result: T::one(),
    }
  }

  /// Prover-side construction: precomputes `Π_{j: bit_j(i)=1} β_j` for every
  /// hypercube index `i`.
  pub fn new_with_products(betas: Vec<T>) -> Self {
    let d = betas.len();
    let mut beta_products = vec![T::one(); 1 << d];
    let mut size = 1;
    for beta in betas.iter() {
      for i in 0..size {
        beta_products[size + i] = beta_products[i].clone() * beta.clone();
      }
      size *= 2;
    }
    Self {
      beta_products,
      ..Self::new(betas)
    }
  }

  /// The separator challenge of the current round.
  pub fn current_element(&self) -> T {
    self.betas[self.current_element_idx].clone()
  }

  /// The subset product attached to edge `edge` of the current round
  /// (prover side only).
  pub fn at(&self, edge: usize) -> T {
    self.beta_products[edge * self.periodicity].clone()
  }

  /// The current round's univariate factor `(1 - X) + X·β_i` evaluated at `x`.
  pub fn univariate_eval(&self, x: &T) -> T {
    T::one() + x.clone() * (self.current_element() - T::one())
  }

  /// Folds the bound challenge into the partial evaluation and advances the
  /// round.
  pub fn partially_evaluate(&mut self, challenge: &T) {
    let eval = self.univariate_eval(challenge);
    self.partial_evaluation_result = self.partial_evaluation_result.clone() * eval;
    self.current_element_idx += 1;
    self.periodicity *= 2;
  }
}
