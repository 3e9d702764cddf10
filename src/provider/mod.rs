//! Native execution backend over BN254.
pub mod bn256;
pub(crate) mod msm;

pub use bn256::{NativeContext, NativeScalar};
