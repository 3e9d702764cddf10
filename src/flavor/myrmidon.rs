//! The databus flavor: everything in [`super::hoplite::Hoplite`] plus a
//! calldata column with boolean read tags.
use super::{AllEntities, Flavor};
use crate::{
  relations::{
    arithmetic_contribution, permutation_contributions, read_tag_contribution, PermutationRow,
    RelationParameters,
  },
  traits::FieldOps,
};

pub use super::hoplite::{
  ID_1, ID_2, ID_3, ID_4, LAGRANGE_FIRST, LAGRANGE_LAST, Q_4, Q_C, Q_L, Q_M, Q_O, Q_R, SIGMA_1,
  SIGMA_2, SIGMA_3, SIGMA_4, W_4, W_L, W_O, W_R,
};

/// Index of the calldata column.
pub const CALLDATA: usize = 20;
/// Index of the calldata read tags.
pub const CALLDATA_READ_TAGS: usize = 21;
/// Index of the grand product `z_perm`.
pub const Z_PERM: usize = 22;
/// Index of the shifted grand product.
pub const Z_PERM_SHIFT: usize = 23;

/// Hoplite extended with a databus calldata column.
#[derive(Clone, Debug)]
pub struct Myrmidon;

impl Flavor for Myrmidon {
  const NUM_PRECOMPUTED: usize = 16;
  const NUM_WIRES: usize = 4;
  const NUM_AUX: usize = 2;
  const NUM_SHIFTED: usize = 1;
  const NUM_SUBRELATIONS: usize = 4;
  const SUBRELATION_PARTIAL_LENGTHS: &'static [usize] = &[4, 6, 3, 3];
  const BATCHED_RELATION_PARTIAL_LENGTH: usize = 7;

  fn precomputed_labels() -> &'static [&'static str] {
    super::hoplite::Hoplite::precomputed_labels()
  }

  fn wire_labels() -> &'static [&'static str] {
    super::hoplite::Hoplite::wire_labels()
  }

  fn aux_labels() -> &'static [&'static str] {
    &["calldata", "calldata_read_tags"]
  }

  fn to_be_shifted() -> &'static [usize] {
    &[Z_PERM]
  }

  fn accumulate_relations<T: FieldOps>(
    row: &AllEntities<T, Self>,
    params: &RelationParameters<T>,
    scaling: &T,
    acc: &mut [T],
  ) {
    acc[0] = acc[0].clone()
      + arithmetic_contribution(
        row.get(Q_M),
        row.get(Q_L),
        row.get(Q_R),
        row.get(Q_O),
        row.get(Q_4),
        row.get(Q_C),
        row.get(W_L),
        row.get(W_R),
        row.get(W_O),
        row.get(W_4),
        scaling,
      );

    let perm_row = PermutationRow {
      wires: [row.get(W_L), row.get(W_R), row.get(W_O), row.get(W_4)],
      ids: [row.get(ID_1), row.get(ID_2), row.get(ID_3), row.get(ID_4)],
      sigmas: [
        row.get(SIGMA_1),
        row.get(SIGMA_2),
        row.get(SIGMA_3),
        row.get(SIGMA_4),
      ],
      z_perm: row.get(Z_PERM),
      z_perm_shift: row.get(Z_PERM_SHIFT),
      lagrange_first: row.get(LAGRANGE_FIRST),
      lagrange_last: row.get(LAGRANGE_LAST),
    };
    let (transfer, boundary) = permutation_contributions(&perm_row, params, scaling);
    acc[1] = acc[1].clone() + transfer;
    acc[2] = acc[2].clone() + boundary;

    acc[3] =
      acc[3].clone() + read_tag_contribution(row.get(CALLDATA_READ_TAGS), scaling);
  }
}
