//! A flavor fixes the polynomial entities of the proof system and the batched
//! relation the sumcheck verifies: how many precomputed and witness columns
//! there are, which witness columns also get opened at the shifted (next-row)
//! point, and how the subrelations combine on one row.
//!
//! The pipeline and the prover are generic over this trait; two flavors are
//! provided, [`hoplite::Hoplite`] and [`myrmidon::Myrmidon`].
use crate::{errors::PipelineError, relations::RelationParameters, traits::FieldOps};
use core::{fmt::Debug, marker::PhantomData};

pub mod hoplite;
pub mod myrmidon;

/// The static shape of one proof-system flavor.
pub trait Flavor: Clone + Debug + Send + Sync + 'static {
  /// Number of precomputed (verification key) polynomials.
  const NUM_PRECOMPUTED: usize;
  /// Number of plain wire columns, committed in the first prover round.
  const NUM_WIRES: usize;
  /// Number of auxiliary witness columns, committed after the wires.
  const NUM_AUX: usize = 0;
  /// The witness block: wires, auxiliary columns, then the grand product.
  const NUM_WITNESS: usize = Self::NUM_WIRES + Self::NUM_AUX + 1;
  /// All polynomials opened at the sumcheck point directly.
  const NUM_UNSHIFTED: usize = Self::NUM_PRECOMPUTED + Self::NUM_WITNESS;
  /// Witness polynomials additionally opened at the shifted point.
  const NUM_SHIFTED: usize;
  /// Total number of claimed evaluations the sumcheck produces.
  const NUM_ALL: usize = Self::NUM_UNSHIFTED + Self::NUM_SHIFTED;
  /// Number of subrelations batched by the alpha challenges.
  const NUM_SUBRELATIONS: usize;
  /// Per-subrelation univariate length (relation degree in the entities + 1).
  const SUBRELATION_PARTIAL_LENGTHS: &'static [usize];
  /// Length of the batched round univariate: the maximum partial length plus
  /// one for the gate-separator factor.
  const BATCHED_RELATION_PARTIAL_LENGTH: usize;

  /// Labels of the precomputed polynomials, in commitment order.
  fn precomputed_labels() -> &'static [&'static str];

  /// Labels of the wire columns, in commitment order.
  fn wire_labels() -> &'static [&'static str];

  /// Labels of the auxiliary columns, in commitment order.
  fn aux_labels() -> &'static [&'static str] {
    &[]
  }

  /// Indices (into the unshifted entity order) of the to-be-shifted columns.
  fn to_be_shifted() -> &'static [usize];

  /// Adds each subrelation's contribution on one row into `acc`, scaled by
  /// `scaling`. `acc` has `NUM_SUBRELATIONS` slots.
  fn accumulate_relations<T: FieldOps>(
    row: &AllEntities<T, Self>,
    params: &RelationParameters<T>,
    scaling: &T,
    acc: &mut [T],
  );
}

/// One value per entity of a flavor, in canonical order:
/// precomputed ∥ wires ∥ aux ∥ grand product ∥ shifted.
#[derive(Clone, Debug)]
pub struct AllEntities<T, F: Flavor> {
  vals: Vec<T>,
  _flavor: PhantomData<F>,
}

impl<T, F: Flavor> AllEntities<T, F> {
  /// Wraps a value vector; its length must be `F::NUM_ALL`.
  pub fn new(vals: Vec<T>) -> Result<Self, PipelineError> {
    if vals.len() != F::NUM_ALL {
      return Err(PipelineError::InvalidInputLength);
    }
    Ok(Self {
      vals,
      _flavor: PhantomData,
    })
  }

  /// Wraps a value vector whose length the caller has already established.
  pub(crate) fn new_unchecked(vals: Vec<T>) -> Self {
    Self {
      vals,
      _flavor: PhantomData,
    }
  }

  /// The value of entity `i`.
  pub fn get(&self, i: usize) -> &T {
    &self.vals[i]
  }

  /// All values in canonical order.
  pub fn all(&self) -> &[T] {
    &self.vals
  }

  /// The unshifted prefix.
  pub fn unshifted(&self) -> &[T] {
    &self.vals[..F::NUM_UNSHIFTED]
  }

  /// The shifted suffix.
  pub fn shifted(&self) -> &[T] {
    &self.vals[F::NUM_UNSHIFTED..]
  }
}

/// The labels of all entities of `F`, in canonical order.
pub fn entity_labels<F: Flavor>() -> Vec<String> {
  let mut labels: Vec<String> = F::precomputed_labels()
    .iter()
    .chain(F::wire_labels().iter())
    .chain(F::aux_labels().iter())
    .map(|s| s.to_string())
    .collect();
  labels.push("z_perm".to_string());
  for &i in F::to_be_shifted() {
    labels.push(format!("{}_shift", labels[i]));
  }
  labels
}
