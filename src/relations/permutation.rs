//! The grand-product permutation subrelations.
use super::RelationParameters;
use crate::traits::FieldOps;

/// Inputs the permutation argument reads from one row.
pub(crate) struct PermutationRow<'a, T> {
  pub wires: [&'a T; 4],
  pub ids: [&'a T; 4],
  pub sigmas: [&'a T; 4],
  pub z_perm: &'a T,
  pub z_perm_shift: &'a T,
  pub lagrange_first: &'a T,
  pub lagrange_last: &'a T,
}

/// The two permutation contributions, scaled.
///
/// The first transfers the grand product across the row:
/// `(z + L_first)·Π(w_i + β·id_i + γ) - (z_shift + L_last·Δ)·Π(w_i + β·σ_i + γ)`.
/// With `z[0] = 0` the `L_first` term starts the product at one, and the
/// `L_last·Δ` term closes it against the public-input delta. The second,
/// `z_shift·L_last`, pins the shifted grand product to zero on the last row so
/// the closing equation is exact.
pub(crate) fn permutation_contributions<T: FieldOps>(
  row: &PermutationRow<'_, T>,
  params: &RelationParameters<T>,
  scaling: &T,
) -> (T, T) {
  let beta = &params.beta;
  let gamma = &params.gamma;

  let mut num = T::one();
  let mut den = T::one();
  for i in 0..4 {
    num = num * (row.wires[i].clone() + beta.clone() * row.ids[i].clone() + gamma.clone());
    den = den * (row.wires[i].clone() + beta.clone() * row.sigmas[i].clone() + gamma.clone());
  }

  let transfer = (row.z_perm.clone() + row.lagrange_first.clone()) * num
    - (row.z_perm_shift.clone()
      + row.lagrange_last.clone() * params.public_input_delta.clone())
      * den;
  let boundary = row.z_perm_shift.clone() * row.lagrange_last.clone();

  (transfer * scaling.clone(), boundary * scaling.clone())
}
