//! This module defines errors returned by the library.
use core::fmt::Debug;
use thiserror::Error;

/// Errors returned by the verification pipeline and its collaborators
#[derive(Clone, Debug, Eq, PartialEq, Error)]
pub enum PipelineError {
  /// returned if the transcript reads past the end of the proof data
  #[error("TranscriptOutOfData")]
  TranscriptOutOfData,
  /// returned if a proof item fails to deserialize (non-canonical scalar, off-curve point)
  #[error("TranscriptDeserialization: {reason}")]
  TranscriptDeserialization {
    /// The reason the item could not be decoded
    reason: String,
  },
  /// returned when the transcript engine encounters an overflow of the round number
  #[error("InternalTranscriptError")]
  InternalTranscriptError,
  /// returned if the supplied input is not of the right length
  #[error("InvalidInputLength")]
  InvalidInputLength,
  /// returned if the global SRS is used before initialization
  #[error("SrsNotInitialized")]
  SrsNotInitialized,
  /// returned when an input vector exceeds the capacity of the SRS
  #[error("InvalidVectorSize")]
  InvalidVectorSize {
    /// The actual size of the input vector
    actual: usize,
    /// The maximum size that can be handled
    max: usize,
  },
  /// returned when attempting to divide by zero
  #[error("DivisionByZero")]
  DivisionByZero,
  /// returned when a nonnative operand would overflow its CRT soundness bound;
  /// the caller must interleave an explicit reduction
  #[error("UnreducedOverflow: {reason}")]
  UnreducedOverflow {
    /// Which bound was exceeded
    reason: String,
  },
  /// returned when in-circuit construction fails outside of constraint checking
  #[error("SynthesisError: {reason}")]
  SynthesisError {
    /// The reason for circuit synthesis failure
    reason: String,
  },
  /// returned if the supplied trace is not a satisfying trace for its own gates
  #[error("UnSat: {reason}")]
  UnSat {
    /// The reason the trace is unsatisfiable
    reason: String,
  },
  /// returned when there is an error creating a digest
  #[error("DigestError")]
  DigestError {
    /// The reason for the digest error
    reason: String,
  },
  /// returned when the prover cannot prove the provided statement due to completeness error
  #[error("InternalError")]
  InternalError,
}
