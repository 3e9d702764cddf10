//! This module defines the traits the pipeline is generic over: field-like and
//! group-like value types, and the execution context that binds them together
//! with a transcript. The pipeline algorithm is written once against these
//! traits and instantiated for the native context (plain BN254 arithmetic) and
//! the recursive context (witness wires and emulated curve points).
use crate::{errors::PipelineError, key::VerificationKey};
use core::{
  fmt::Debug,
  ops::{Add, Mul, Neg, Sub},
};
use ff::{Field, PrimeField};

pub mod transcript;

use transcript::TranscriptOps;

/// Field-like values the pipeline computes with.
///
/// Implemented by the native scalar field and by circuit wires carrying scalar
/// witnesses. Arithmetic on wires emits gates through the wire's driver;
/// arithmetic on native values is plain field arithmetic. Constants are
/// context-free in both implementations, so generic code can build them
/// without a handle to anything.
pub trait FieldOps:
  Clone + Debug + Sized + Add<Output = Self> + Sub<Output = Self> + Mul<Output = Self> + Neg<Output = Self>
{
  /// The prime field the values live in.
  type Native: PrimeField;

  /// Lifts a native constant.
  fn from_native(v: Self::Native) -> Self;

  /// Lifts a small integer constant.
  fn from_u64(v: u64) -> Self {
    Self::from_native(Self::Native::from(v))
  }

  /// The additive identity.
  fn zero() -> Self {
    Self::from_native(Self::Native::ZERO)
  }

  /// The multiplicative identity.
  fn one() -> Self {
    Self::from_native(Self::Native::ONE)
  }

  /// The concrete value held (the witness value for wires).
  fn value(&self) -> Self::Native;

  /// Multiplicative inverse; fails on zero.
  fn invert(&self) -> Result<Self, PipelineError>;

  /// Records an equality check and reports whether it holds on values.
  ///
  /// The native implementation just compares. The wire implementation also
  /// emits an equality constraint labelled `label`, so a failed check leaves
  /// the surrounding circuit unsatisfiable.
  fn enforce_equal(&self, other: &Self, label: &str) -> bool;
}

/// Group-like values commitments are represented by.
///
/// All fallible operations return `Result` because the emulated implementation
/// can fail construction (nonnative bound overflow, exceptional point cases).
pub trait GroupOps<S: FieldOps>: Clone + Debug + Sized {
  /// The group generator (the `[1]₁` element of the SRS).
  fn generator() -> Self;

  /// Additive inverse.
  fn negate(&self) -> Self;

  /// Point addition.
  fn add(&self, other: &Self) -> Result<Self, PipelineError>;

  /// Scalar multiplication.
  fn mul(&self, scalar: &S) -> Result<Self, PipelineError>;

  /// Multi-scalar multiplication of parallel `points` and `scalars` vectors.
  ///
  /// Both contexts implement this as a genuine batch algorithm (Pippenger
  /// natively, a shared-doubling ladder in-circuit), never as a fold of
  /// per-point multiplications.
  fn batch_mul(points: &[Self], scalars: &[S]) -> Result<Self, PipelineError>;
}

/// The outcome of running the pipeline to completion.
#[derive(Debug, Clone)]
pub enum VerifierOutput<C: ExecutionContext> {
  /// Native contexts execute the final pairing check and fold it into the
  /// accumulated verdict.
  Verified(bool),
  /// Recursive contexts defer the pairing check, returning the accumulated
  /// point pair `(P₀, P₁)` for an outer protocol to discharge.
  DeferredPairing(C::Point, C::Point),
}

impl<C: ExecutionContext> VerifierOutput<C> {
  /// The verdict, if this output carries one.
  pub fn as_verified(&self) -> Option<bool> {
    match self {
      VerifierOutput::Verified(b) => Some(*b),
      VerifierOutput::DeferredPairing(..) => None,
    }
  }

  /// The deferred pair, if this output carries one.
  pub fn deferred(&self) -> Option<(&C::Point, &C::Point)> {
    match self {
      VerifierOutput::Verified(_) => None,
      VerifierOutput::DeferredPairing(p0, p1) => Some((p0, p1)),
    }
  }
}

/// An execution context binds the value types the pipeline runs over.
///
/// The pipeline core is generic over this trait; the two instantiations are
/// `provider::NativeContext` and `recursion::RecursiveContext`.
pub trait ExecutionContext: Sized {
  /// Scalar values (challenges, evaluations).
  type Scalar: FieldOps;
  /// Commitment values.
  type Point: GroupOps<Self::Scalar>;
  /// The transcript this context reads proofs through.
  type Transcript: TranscriptOps<Self>;

  /// Turns the accumulated pairing pair into the context's output shape:
  /// native contexts run the pairing check, recursive contexts defer it.
  fn finalize(
    vk: &VerificationKey<Self>,
    pair: (Self::Point, Self::Point),
  ) -> Result<VerifierOutput<Self>, PipelineError>;
}
