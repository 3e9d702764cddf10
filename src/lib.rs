//! This library implements a verification pipeline for sumcheck-based SNARKs
//! with KZG polynomial commitments over BN254. The pipeline reduces a proof to
//! a single pairing check through a chain of stages (sumcheck, Gemini fold,
//! Shplonk batch, KZG finalize) and runs in two execution contexts: native
//! field arithmetic, and in-circuit with nonnative base-field emulation, where
//! the final pairing check is deferred to an outer protocol.
#![deny(
  warnings,
  unused,
  future_incompatible,
  nonstandard_style,
  rust_2018_idioms,
  missing_docs
)]
#![allow(non_snake_case)]
#![allow(clippy::upper_case_acronyms)]
#![allow(clippy::type_complexity)]
#![forbid(unsafe_code)]

// private modules
mod math;

// public modules
pub mod digest;
pub mod errors;
pub mod flavor;
pub mod key;
pub mod pcs;
pub mod polys;
pub mod prover;
pub mod provider;
pub mod recursion;
pub mod relations;
pub mod srs;
pub mod sumcheck;
pub mod trace;
pub mod transcript;
pub mod traits;
pub mod verifier;

/// Start a span + timer, return `(Span, Instant)`.
macro_rules! start_span {
    ($name:expr $(, $($fmt:tt)+)?) => {{
        let span       = info_span!($name $(, $($fmt)+)?);
        let span_clone = span.clone();    // lives as long as the guard
        let _guard      = span_clone.enter();
        (span, Instant::now())
    }};
}
pub(crate) use start_span;

use traits::ExecutionContext;

/// Scalar type of an execution context.
pub type Scalar<C> = <C as ExecutionContext>::Scalar;
/// Point type of an execution context.
pub type Point<C> = <C as ExecutionContext>::Point;
