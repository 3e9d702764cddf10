//! In-circuit execution of the verification pipeline.
//!
//! The pipeline core is generic over an execution context; this module
//! provides the recursive instantiation, where scalars are witness wires in a
//! proving circuit and commitments are curve points with emulated base-field
//! coordinates. Running the pipeline in this context does not decide the
//! proof: it lays down gates whose satisfiability encodes every protocol
//! check, and returns the final pairing pair for an outer protocol to
//! discharge natively.
//!
//! The layers, bottom up: [`driver`] is the gate-recording interface circuits
//! are built through, [`field_wire`] puts scalar arithmetic on wires,
//! [`bigfield`] emulates the base field over scalar-field limbs, [`biggroup`]
//! builds curve arithmetic on emulated coordinates, and [`transcript`] wraps
//! the native transcript so received items come back as wires.
use crate::{
  errors::PipelineError,
  key::VerificationKey,
  provider::NativeContext,
  traits::{ExecutionContext, GroupOps, VerifierOutput},
};
use core::{fmt, marker::PhantomData};
use halo2curves::bn256::G1Affine;
use std::{cell::RefCell, rc::Rc};

pub mod bigfield;
pub mod biggroup;
pub mod driver;
pub mod field_wire;
pub mod transcript;

use biggroup::EmulatedPoint;
use driver::CircuitDriver;
use field_wire::FieldWire;
pub use transcript::RecursiveTranscript;

/// The execution context whose values live in a circuit built through `D`.
///
/// Never instantiated; it exists to select the wire and emulated-point types
/// at the pipeline's seams.
pub struct RecursiveContext<D: CircuitDriver> {
  _driver: PhantomData<D>,
}

impl<D: CircuitDriver> Clone for RecursiveContext<D> {
  fn clone(&self) -> Self {
    Self {
      _driver: PhantomData,
    }
  }
}

impl<D: CircuitDriver> fmt::Debug for RecursiveContext<D> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str("RecursiveContext")
  }
}

impl<D: CircuitDriver> ExecutionContext for RecursiveContext<D> {
  type Scalar = FieldWire<D>;
  type Point = EmulatedPoint<D>;
  type Transcript = RecursiveTranscript<D>;

  fn finalize(
    _vk: &VerificationKey<Self>,
    pair: (Self::Point, Self::Point),
  ) -> Result<VerifierOutput<Self>, PipelineError> {
    Ok(VerifierOutput::DeferredPairing(pair.0, pair.1))
  }
}

impl<D: CircuitDriver> VerificationKey<RecursiveContext<D>> {
  /// Lifts a native key into circuit form, witnessing each commitment's
  /// coordinates in `driver`.
  pub fn lift(
    driver: &Rc<RefCell<D>>,
    vk: &VerificationKey<NativeContext>,
  ) -> Result<Self, PipelineError> {
    let commitments = vk
      .commitments
      .iter()
      .map(|c| EmulatedPoint::from_affine(driver, &G1Affine::from(*c)))
      .collect::<Result<Vec<_>, _>>()?;
    Self::new(
      vk.circuit_size,
      vk.num_public_inputs,
      vk.pub_inputs_offset,
      commitments,
      vk.g2_gen,
      vk.g2_tau,
    )
  }
}

/// A running aggregate of deferred pairing pairs.
///
/// One pairing check discharges any number of deferred pairs once they are
/// folded together under random separators: if `e(P₀, [1]₂) = e(-P₁, [τ]₂)`
/// holds for each pair, it holds for `(P₀ + ν·P₀', P₁ + ν·P₁')` by
/// bilinearity, and a random ν makes the converse hold with overwhelming
/// probability.
pub struct PairingAccumulator<D: CircuitDriver> {
  p0: EmulatedPoint<D>,
  p1: EmulatedPoint<D>,
}

impl<D: CircuitDriver> PairingAccumulator<D> {
  /// Starts the aggregate from a first deferred pair.
  pub fn new(pair: (EmulatedPoint<D>, EmulatedPoint<D>)) -> Self {
    Self {
      p0: pair.0,
      p1: pair.1,
    }
  }

  /// Folds another deferred pair in under `separator`.
  pub fn aggregate(
    &mut self,
    pair: (EmulatedPoint<D>, EmulatedPoint<D>),
    separator: &FieldWire<D>,
  ) -> Result<(), PipelineError> {
    self.p0 = self.p0.add(&pair.0.mul(separator)?)?;
    self.p1 = self.p1.add(&pair.1.mul(separator)?)?;
    Ok(())
  }

  /// The accumulated pair, ready for the outer pairing check.
  pub fn into_pair(self) -> (EmulatedPoint<D>, EmulatedPoint<D>) {
    (self.p0, self.p1)
  }
}
