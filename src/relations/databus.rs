//! The calldata read-tag subrelation of the extended flavor.
use crate::traits::FieldOps;

/// `tag² - tag`, scaled: read tags must be boolean. The calldata column itself
/// carries no in-relation constraint; its consistency with the outer operation
/// queue is checked by the protocol that consumes the openings.
pub(crate) fn read_tag_contribution<T: FieldOps>(tag: &T, scaling: &T) -> T {
  (tag.clone() * tag.clone() - tag.clone()) * scaling.clone()
}
