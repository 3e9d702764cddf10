//! Subrelation accumulators, generic over the context scalar.
//!
//! The same formulas serve three callers: the native verifier (plain field
//! values), the recursive verifier (wires), and the prover's round-univariate
//! construction (rows interpolated at extension points). Each accumulator adds
//! `scaling · contribution` into its slot of the output; the caller owns the
//! alpha batching.
use crate::traits::FieldOps;

mod arithmetic;
mod databus;
mod permutation;

pub(crate) use arithmetic::arithmetic_contribution;
pub(crate) use databus::read_tag_contribution;
pub(crate) use permutation::{PermutationRow, permutation_contributions};

/// Challenges shared by all subrelations of a flavor.
#[derive(Clone, Debug)]
pub struct RelationParameters<T> {
  /// Permutation challenge β.
  pub beta: T,
  /// Permutation challenge γ.
  pub gamma: T,
  /// The public-input correction factor the grand product closes against.
  pub public_input_delta: T,
}

impl<T: FieldOps> RelationParameters<T> {
  /// Bundles the permutation challenges with the public-input delta.
  pub fn new(beta: T, gamma: T, public_input_delta: T) -> Self {
    Self {
      beta,
      gamma,
      public_input_delta,
    }
  }
}
