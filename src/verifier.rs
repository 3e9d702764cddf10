//! The verification pipeline: receives the proof stream stage by stage,
//! runs sumcheck, then chains the Gemini, Shplonk and KZG reductions.
//!
//! The pipeline body is written once against `ExecutionContext` and shared by
//! the native and recursive instantiations, which is what guarantees the two
//! derive identical challenge sequences for the same proof bytes. Local check
//! failures never abort: they accumulate into one verdict while the remaining
//! transcript items are still consumed, so the transcript shape (and hence
//! the recursive circuit shape) does not depend on the proof's validity.
use crate::{
  errors::PipelineError,
  flavor::Flavor,
  key::VerificationKey,
  pcs::{gemini::GeminiVerifier, kzg::KzgVerifier, shplonk::ShplonkVerifier},
  provider::NativeContext,
  recursion::{
    RecursiveContext, RecursiveTranscript, driver::CircuitDriver, field_wire::FieldWire,
  },
  relations::RelationParameters,
  start_span,
  sumcheck::SumcheckVerifier,
  traits::{ExecutionContext, FieldOps, VerifierOutput, transcript::TranscriptOps},
  transcript::Transcript,
};
use std::{cell::RefCell, rc::Rc, time::Instant};
use tracing::{debug, info, info_span};

/// Progression marker for the pipeline's strict stage order.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Stage {
  /// Sizes and public inputs are read and checked against the key.
  ReceiveSizeAndPublicInputs,
  /// Wire commitments are read.
  ReceiveWireCommitments,
  /// Auxiliary column commitments are read (flavors that declare them).
  ReceiveAuxCommitments,
  /// β and γ are derived.
  DerivePermutationChallenges,
  /// The grand-product commitment is read.
  ReceiveGrandProductCommitment,
  /// Subrelation and gate challenges are derived.
  DeriveAlphaAndGateChallenges,
  /// The sumcheck rounds run.
  RunSumcheck,
  /// ρ is derived.
  DeriveBatchingChallenge,
  /// Commitments and evaluations are batched under ρ.
  ComputeBatchedCommitments,
  /// The Gemini reduction runs.
  RunGemini,
  /// The Shplonk reduction runs.
  RunShplonk,
  /// The KZG finalization runs.
  RunPcsFinalize,
  /// Every stage passed.
  Done,
  /// Some check failed; remaining stages still consume their items.
  Failed,
}

/// Stage cursor plus the accumulated verdict.
struct Progress {
  stage: Stage,
  verified: bool,
}

impl Progress {
  fn new() -> Self {
    Self {
      stage: Stage::ReceiveSizeAndPublicInputs,
      verified: true,
    }
  }

  /// Moves to `next` unless a failure already made `Failed` terminal.
  fn enter(&mut self, next: Stage) {
    if self.verified {
      self.stage = next;
    }
    debug!(stage = ?self.stage, "pipeline");
  }

  fn record(&mut self, ok: bool) {
    if !ok {
      self.verified = false;
      self.stage = Stage::Failed;
    }
  }
}

/// The public-input correction factor of the permutation argument,
///
/// `Δ = Π_i (γ + x_i + β·(n + offset + i)) / (γ + x_i - β·(offset + 1 + i))`,
///
/// computed incrementally with two accumulators stepping by `±β`. A pure
/// function of its arguments.
pub fn compute_public_input_delta<S: FieldOps>(
  public_inputs: &[S],
  beta: &S,
  gamma: &S,
  circuit_size: u64,
  offset: u64,
) -> Result<S, PipelineError> {
  let mut numerator = S::one();
  let mut denominator = S::one();
  let mut num_acc = gamma.clone() + beta.clone() * S::from_u64(circuit_size + offset);
  let mut den_acc = gamma.clone() - beta.clone() * S::from_u64(offset + 1);
  for x in public_inputs {
    numerator = numerator * (num_acc.clone() + x.clone());
    denominator = denominator * (den_acc.clone() + x.clone());
    num_acc = num_acc + beta.clone();
    den_acc = den_acc - beta.clone();
  }
  Ok(numerator * denominator.invert()?)
}

/// Executes the stage order against the transcript, in context types.
///
/// Loop bounds and item counts come from the verification key and the flavor,
/// never from proof content, so the sequence of transcript operations is the
/// same for every proof of a given key.
pub(crate) fn run<C: ExecutionContext, F: Flavor>(
  vk: &VerificationKey<C>,
  transcript: &mut C::Transcript,
) -> Result<VerifierOutput<C>, PipelineError> {
  if vk.commitments.len() != F::NUM_PRECOMPUTED || vk.log_circuit_size == 0 {
    return Err(PipelineError::InvalidInputLength);
  }
  let d = vk.log_circuit_size as usize;
  let mut progress = Progress::new();

  progress.enter(Stage::ReceiveSizeAndPublicInputs);
  let (circuit_size, _) = transcript.receive_u64("circuit_size")?;
  let (num_public_inputs, _) = transcript.receive_u64("public_input_size")?;
  let (pub_inputs_offset, _) = transcript.receive_u64("pub_inputs_offset")?;
  progress.record(circuit_size.enforce_equal(&C::Scalar::from_u64(vk.circuit_size), "circuit_size"));
  progress.record(
    num_public_inputs.enforce_equal(&C::Scalar::from_u64(vk.num_public_inputs), "public_input_size"),
  );
  progress.record(
    pub_inputs_offset.enforce_equal(&C::Scalar::from_u64(vk.pub_inputs_offset), "pub_inputs_offset"),
  );
  let mut public_inputs = Vec::with_capacity(vk.num_public_inputs as usize);
  for i in 0..vk.num_public_inputs {
    public_inputs.push(transcript.receive_scalar(&format!("public_input_{i}"))?);
  }

  progress.enter(Stage::ReceiveWireCommitments);
  let mut witness_commitments = Vec::with_capacity(F::NUM_WITNESS);
  for label in F::wire_labels() {
    witness_commitments.push(transcript.receive_point(label)?);
  }

  if !F::aux_labels().is_empty() {
    progress.enter(Stage::ReceiveAuxCommitments);
    for label in F::aux_labels() {
      witness_commitments.push(transcript.receive_point(label)?);
    }
  }

  progress.enter(Stage::DerivePermutationChallenges);
  let perm = transcript.get_challenges(&["beta", "gamma"])?;
  let delta = compute_public_input_delta(
    &public_inputs,
    &perm[0],
    &perm[1],
    vk.circuit_size,
    vk.pub_inputs_offset,
  )?;
  let params = RelationParameters::new(perm[0].clone(), perm[1].clone(), delta);

  progress.enter(Stage::ReceiveGrandProductCommitment);
  witness_commitments.push(transcript.receive_point("z_perm")?);

  progress.enter(Stage::DeriveAlphaAndGateChallenges);
  let mut alphas = Vec::with_capacity(F::NUM_SUBRELATIONS - 1);
  for i in 0..F::NUM_SUBRELATIONS - 1 {
    alphas.push(transcript.get_challenge(&format!("alpha_{i}"))?);
  }
  let mut gate_challenges = Vec::with_capacity(d);
  for i in 0..d {
    gate_challenges.push(transcript.get_challenge(&format!("Sumcheck:gate_challenge_{i}"))?);
  }

  progress.enter(Stage::RunSumcheck);
  let sumcheck = SumcheckVerifier::verify::<C, F>(transcript, d, &params, &alphas, &gate_challenges)?;
  progress.record(sumcheck.verified);

  progress.enter(Stage::DeriveBatchingChallenge);
  let rho = transcript.get_challenge("rho")?;

  progress.enter(Stage::ComputeBatchedCommitments);
  let mut unshifted_commitments = vk.commitments.clone();
  unshifted_commitments.extend(witness_commitments.iter().cloned());
  let to_be_shifted: Vec<C::Point> = F::to_be_shifted()
    .iter()
    .map(|&i| unshifted_commitments[i].clone())
    .collect();
  let (batched_unshifted, batched_to_be_shifted, batched_evaluation) =
    GeminiVerifier::batch_multivariate_claims::<C>(
      &unshifted_commitments,
      &to_be_shifted,
      sumcheck.claimed_evaluations.unshifted(),
      sumcheck.claimed_evaluations.shifted(),
      &rho,
    )?;

  progress.enter(Stage::RunGemini);
  let claims = GeminiVerifier::reduce_verification::<C>(
    transcript,
    &sumcheck.challenge,
    &batched_unshifted,
    &batched_to_be_shifted,
    &batched_evaluation,
  )?;

  progress.enter(Stage::RunShplonk);
  let batched_claim = ShplonkVerifier::reduce_verification::<C>(transcript, &claims)?;

  progress.enter(Stage::RunPcsFinalize);
  let pair = KzgVerifier::reduce_verification::<C>(transcript, &batched_claim)?;
  let output = match C::finalize(vk, pair)? {
    VerifierOutput::Verified(ok) => {
      progress.record(ok);
      VerifierOutput::Verified(progress.verified)
    }
    deferred => deferred,
  };

  progress.enter(Stage::Done);
  Ok(output)
}

/// The verifier entry points.
pub struct Pipeline;

impl Pipeline {
  /// Verifies `proof` against `vk` natively, returning the verdict.
  ///
  /// An invalid proof yields `Ok(false)`; malformed bytes yield errors.
  pub fn verify<F: Flavor>(
    vk: &VerificationKey<NativeContext>,
    proof: &[u8],
  ) -> Result<bool, PipelineError> {
    let (_verify_span, verify_t) = start_span!("verify");
    let digest = vk.digest()?;
    let mut transcript = Transcript::new_verifier(&digest, proof);
    let output = run::<NativeContext, F>(vk, &mut transcript)?;
    let consumed = transcript.fully_consumed();

    let verdict = match output {
      VerifierOutput::Verified(ok) => ok && consumed,
      VerifierOutput::DeferredPairing(..) => return Err(PipelineError::InternalError),
    };
    info!(elapsed_ms = %verify_t.elapsed().as_millis(), verdict, "verify");
    Ok(verdict)
  }

  /// Verifies `proof` in-circuit through `driver`, returning the deferred
  /// pairing pair.
  ///
  /// Failed protocol checks leave the driver unsatisfied rather than
  /// surfacing here; the returned pair still has the input-independent shape.
  pub fn verify_recursive<D: CircuitDriver, F: Flavor>(
    driver: &Rc<RefCell<D>>,
    vk: &VerificationKey<NativeContext>,
    proof: &[u8],
  ) -> Result<(crate::Point<RecursiveContext<D>>, crate::Point<RecursiveContext<D>>), PipelineError>
  {
    let (_verify_span, verify_t) = start_span!("verify_recursive");
    let digest = vk.digest()?;
    let lifted = VerificationKey::lift(driver, vk)?;
    let mut transcript =
      RecursiveTranscript::new(driver.clone(), Transcript::new_verifier(&digest, proof));
    let output = run::<RecursiveContext<D>, F>(&lifted, &mut transcript)?;
    if !transcript.fully_consumed() {
      let leftover = FieldWire::witness(driver, crate::provider::NativeScalar::one());
      leftover.enforce_equal(&FieldWire::zero(), "proof_fully_consumed");
    }

    match output {
      VerifierOutput::DeferredPairing(p0, p1) => {
        info!(elapsed_ms = %verify_t.elapsed().as_millis(), "verify_recursive");
        Ok((p0, p1))
      }
      VerifierOutput::Verified(_) => Err(PipelineError::InternalError),
    }
  }
}
