//! The base flavor: four wires, an arithmetic gate, and a copy-constraint
//! grand product.
use super::{AllEntities, Flavor};
use crate::{
  relations::{arithmetic_contribution, permutation_contributions, PermutationRow, RelationParameters},
  traits::FieldOps,
};

/// Index of `q_m` in the canonical entity order.
pub const Q_M: usize = 0;
/// Index of `q_l`.
pub const Q_L: usize = 1;
/// Index of `q_r`.
pub const Q_R: usize = 2;
/// Index of `q_o`.
pub const Q_O: usize = 3;
/// Index of `q_4`.
pub const Q_4: usize = 4;
/// Index of `q_c`.
pub const Q_C: usize = 5;
/// Index of `sigma_1`.
pub const SIGMA_1: usize = 6;
/// Index of `sigma_2`.
pub const SIGMA_2: usize = 7;
/// Index of `sigma_3`.
pub const SIGMA_3: usize = 8;
/// Index of `sigma_4`.
pub const SIGMA_4: usize = 9;
/// Index of `id_1`.
pub const ID_1: usize = 10;
/// Index of `id_2`.
pub const ID_2: usize = 11;
/// Index of `id_3`.
pub const ID_3: usize = 12;
/// Index of `id_4`.
pub const ID_4: usize = 13;
/// Index of the first-row indicator.
pub const LAGRANGE_FIRST: usize = 14;
/// Index of the last-row indicator.
pub const LAGRANGE_LAST: usize = 15;
/// Index of `w_l`.
pub const W_L: usize = 16;
/// Index of `w_r`.
pub const W_R: usize = 17;
/// Index of `w_o`.
pub const W_O: usize = 18;
/// Index of `w_4`.
pub const W_4: usize = 19;
/// Index of the grand product `z_perm`.
pub const Z_PERM: usize = 20;
/// Index of the shifted grand product.
pub const Z_PERM_SHIFT: usize = 21;

/// Four-wire arithmetic flavor with permutation subrelations.
#[derive(Clone, Debug)]
pub struct Hoplite;

impl Flavor for Hoplite {
  const NUM_PRECOMPUTED: usize = 16;
  const NUM_WIRES: usize = 4;
  const NUM_SHIFTED: usize = 1;
  const NUM_SUBRELATIONS: usize = 3;
  const SUBRELATION_PARTIAL_LENGTHS: &'static [usize] = &[4, 6, 3];
  const BATCHED_RELATION_PARTIAL_LENGTH: usize = 7;

  fn precomputed_labels() -> &'static [&'static str] {
    &[
      "q_m",
      "q_l",
      "q_r",
      "q_o",
      "q_4",
      "q_c",
      "sigma_1",
      "sigma_2",
      "sigma_3",
      "sigma_4",
      "id_1",
      "id_2",
      "id_3",
      "id_4",
      "lagrange_first",
      "lagrange_last",
    ]
  }

  fn wire_labels() -> &'static [&'static str] {
    &["w_l", "w_r", "w_o", "w_4"]
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
  }
}
