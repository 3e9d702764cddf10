//! The arithmetic gate subrelation.
use crate::traits::FieldOps;

/// `q_m·w_l·w_r + q_l·w_l + q_r·w_r + q_o·w_o + q_4·w_4 + q_c`, scaled.
///
/// Degree 3 in the entities, so its partial length is 4.
#[allow(clippy::too_many_arguments)]
pub(crate) fn arithmetic_contribution<T: FieldOps>(
  q_m: &T,
  q_l: &T,
  q_r: &T,
  q_o: &T,
  q_4: &T,
  q_c: &T,
  w_l: &T,
  w_r: &T,
  w_o: &T,
  w_4: &T,
  scaling: &T,
) -> T {
  let gate = q_m.clone() * w_l.clone() * w_r.clone()
    + q_l.clone() * w_l.clone()
    + q_r.clone() * w_r.clone()
    + q_o.clone() * w_o.clone()
    + q_4.clone() * w_4.clone()
    + q_c.clone();
  gate * scaling.clone()
}
