//! The recursive transcript: a native transcript wrapped so received items
//! and challenges come back as wires.
//!
//! Hashing stays outside the circuit. Every read and squeeze goes through the
//! inner native transcript, so the label sequence and challenge values agree
//! with native execution item for item; the wrapper only lifts the results
//! into the recursive context's value types.
use super::{RecursiveContext, biggroup::EmulatedPoint, driver::CircuitDriver, field_wire::FieldWire};
use crate::{errors::PipelineError, transcript::Transcript, traits::transcript::TranscriptOps};
use halo2curves::bn256::Fr;
use std::{cell::RefCell, rc::Rc};

/// A verifier-side transcript for in-circuit execution.
pub struct RecursiveTranscript<D: CircuitDriver> {
  driver: Rc<RefCell<D>>,
  inner: Transcript,
}

impl<D: CircuitDriver> RecursiveTranscript<D> {
  /// Wraps a native verifier transcript for the given circuit driver.
  pub fn new(driver: Rc<RefCell<D>>, inner: Transcript) -> Self {
    Self { driver, inner }
  }

  /// Whether every proof byte has been consumed.
  pub fn fully_consumed(&self) -> bool {
    self.inner.fully_consumed()
  }
}

impl<D: CircuitDriver> TranscriptOps<RecursiveContext<D>> for RecursiveTranscript<D> {
  fn receive_u64(&mut self, label: &str) -> Result<(FieldWire<D>, u64), PipelineError> {
    let v = self.inner.read_u64(label)?;
    Ok((FieldWire::witness(&self.driver, Fr::from(v)), v))
  }

  fn receive_scalar(&mut self, label: &str) -> Result<FieldWire<D>, PipelineError> {
    let s = self.inner.read_scalar(label)?;
    Ok(FieldWire::witness(&self.driver, s))
  }

  fn receive_scalars(&mut self, label: &str, n: usize) -> Result<Vec<FieldWire<D>>, PipelineError> {
    let scalars = self.inner.read_scalars(label, n)?;
    Ok(scalars.into_iter().map(|s| FieldWire::witness(&self.driver, s)).collect())
  }

  fn receive_point(&mut self, label: &str) -> Result<EmulatedPoint<D>, PipelineError> {
    let point = self.inner.read_point(label)?;
    EmulatedPoint::from_affine(&self.driver, &point)
  }

  fn get_challenge(&mut self, label: &str) -> Result<FieldWire<D>, PipelineError> {
    let c = self.inner.squeeze(label)?;
    Ok(FieldWire::witness(&self.driver, c))
  }

  fn challenge_log(&self) -> Vec<Fr> {
    self.inner.challenges().to_vec()
  }
}

#[cfg(test)]
mod tests {
  use super::super::driver::CircuitSimulator;
  use super::*;
  use crate::traits::FieldOps;
  use ff::Field;
  use rand::{SeedableRng, rngs::StdRng};

  #[test]
  fn test_wires_mirror_native_reads() {
    let mut rng = StdRng::seed_from_u64(60);
    let digest = [7u8; 32];
    let scalar = Fr::random(&mut rng);

    let mut prover = Transcript::new_prover(&digest);
    prover.send_u64("size", 64);
    prover.send_scalar("claim", &scalar);
    let native_challenge = prover.squeeze("alpha").unwrap();
    let proof = prover.into_proof();

    let driver = Rc::new(RefCell::new(CircuitSimulator::new()));
    let mut transcript =
      RecursiveTranscript::new(driver.clone(), Transcript::new_verifier(&digest, &proof));
    let (size_wire, size) = transcript.receive_u64("size").unwrap();
    assert_eq!(size, 64);
    assert_eq!(size_wire.value(), Fr::from(64u64));
    assert_eq!(transcript.receive_scalar("claim").unwrap().value(), scalar);
    assert_eq!(transcript.get_challenge("alpha").unwrap().value(), native_challenge);
    assert_eq!(transcript.challenge_log(), vec![native_challenge]);
    assert!(transcript.fully_consumed());
  }
}
