//! The verification key: trace shape, commitments to the precomputed
//! polynomials, and the degree-one G2 powers the pairing check needs.
use crate::{
  digest::{DigestComputer, KeyDigest, SimpleDigestible},
  errors::PipelineError,
  math::Math,
  traits::ExecutionContext,
};
use halo2curves::bn256::G2Affine;
use once_cell::sync::OnceCell;
use serde::{Deserialize, Serialize};

/// Public parameters of one circuit, sufficient to verify its proofs.
///
/// The commitments are in the flavor's precomputed order. The G2 elements are
/// kept in native representation in both execution contexts; a recursive
/// verifier only defers to them through the final pairing check, which always
/// runs natively.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(bound(
  serialize = "C::Point: Serialize",
  deserialize = "C::Point: serde::de::DeserializeOwned"
))]
pub struct VerificationKey<C: ExecutionContext> {
  /// Number of rows in the execution trace, a power of two.
  pub circuit_size: u64,
  /// Base-two logarithm of `circuit_size`.
  pub log_circuit_size: u32,
  /// Number of public inputs.
  pub num_public_inputs: u64,
  /// Row index at which the public inputs start.
  pub pub_inputs_offset: u64,
  /// Commitments to the precomputed polynomials.
  pub commitments: Vec<C::Point>,
  /// The G2 generator.
  pub g2_gen: G2Affine,
  /// The G2 generator times the SRS toxic waste.
  pub g2_tau: G2Affine,
  #[serde(skip, default = "OnceCell::new")]
  pub(crate) digest: OnceCell<KeyDigest>,
}

impl<C: ExecutionContext> VerificationKey<C> {
  /// Assembles a key, checking that `circuit_size` is a nonzero power of two.
  pub fn new(
    circuit_size: u64,
    num_public_inputs: u64,
    pub_inputs_offset: u64,
    commitments: Vec<C::Point>,
    g2_gen: G2Affine,
    g2_tau: G2Affine,
  ) -> Result<Self, PipelineError> {
    if circuit_size == 0 || !circuit_size.is_power_of_two() {
      return Err(PipelineError::InvalidInputLength);
    }
    Ok(Self {
      circuit_size,
      log_circuit_size: (circuit_size as usize).log_2() as u32,
      num_public_inputs,
      pub_inputs_offset,
      commitments,
      g2_gen,
      g2_tau,
      digest: OnceCell::new(),
    })
  }
}

impl<C: ExecutionContext> SimpleDigestible for VerificationKey<C> where C::Point: Serialize {}

impl<C: ExecutionContext> VerificationKey<C>
where
  C::Point: Serialize,
{
  /// The digest that seeds every transcript bound to this key.
  pub fn digest(&self) -> Result<KeyDigest, PipelineError> {
    self
      .digest
      .get_or_try_init(|| DigestComputer::new(self).digest())
      .cloned()
      .map_err(|e| PipelineError::DigestError {
        reason: e.to_string(),
      })
  }
}
