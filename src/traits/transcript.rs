//! The verifier-side transcript contract.
use crate::{errors::PipelineError, traits::ExecutionContext};

/// Operations the pipeline performs against a proof transcript.
///
/// Every received item and every challenge is bound to a label; the sequence
/// of (label, kind) pairs is identical across contexts for the same flavor,
/// which is what makes native and recursive challenge derivation agree. The
/// recursive implementation wraps the native one (hashing happens outside the
/// circuit) and returns items and challenges as wires.
pub trait TranscriptOps<C: ExecutionContext>: Sized {
  /// Reads an 8-byte unsigned integer, returning it both as a scalar and as
  /// a natively usable size.
  fn receive_u64(&mut self, label: &str) -> Result<(C::Scalar, u64), PipelineError>;

  /// Reads one scalar.
  fn receive_scalar(&mut self, label: &str) -> Result<C::Scalar, PipelineError>;

  /// Reads `n` scalars absorbed under one label.
  fn receive_scalars(&mut self, label: &str, n: usize) -> Result<Vec<C::Scalar>, PipelineError>;

  /// Reads one curve point.
  fn receive_point(&mut self, label: &str) -> Result<C::Point, PipelineError>;

  /// Squeezes a challenge bound to everything absorbed so far.
  fn get_challenge(&mut self, label: &str) -> Result<C::Scalar, PipelineError>;

  /// Squeezes one challenge per label, in order.
  fn get_challenges(&mut self, labels: &[&str]) -> Result<Vec<C::Scalar>, PipelineError> {
    labels.iter().map(|l| self.get_challenge(l)).collect()
  }

  /// The native values of all challenges squeezed so far, for cross-context
  /// agreement checks.
  fn challenge_log(&self) -> Vec<<C::Scalar as crate::traits::FieldOps>::Native>;
}
