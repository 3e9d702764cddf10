//! Native proof generation.
//!
//! The prover walks the same transcript schedule the verifier replays: trace
//! dimensions and public inputs, wire and auxiliary commitments, the grand
//! product, sumcheck, then the Gemini, Shplonk and KZG openings. Commitments
//! use the process-wide SRS, so [`crate::srs::init`] must have run first.
use crate::{
  digest::KeyDigest,
  errors::PipelineError,
  flavor::{Flavor, hoplite},
  math::Math,
  pcs::{gemini::GeminiProver, kzg::KzgProver, shplonk::ShplonkProver},
  polys::{multilinear::MultilinearPolynomial, univariate::UniPoly},
  relations::RelationParameters,
  srs, start_span,
  sumcheck::SumcheckProver,
  transcript::Transcript,
  verifier::compute_public_input_delta,
};
use core::marker::PhantomData;
use ff::Field;
use halo2curves::bn256::Fr;
use itertools::Itertools;
use std::time::Instant;
use tracing::{info, info_span};

/// The prover's half of a finalized trace: the key digest binding it to its
/// verification key, the trace dimensions and public inputs, and the full
/// polynomial columns.
pub struct ProvingKey<F: Flavor> {
  pub(crate) vk_digest: KeyDigest,
  pub(crate) circuit_size: u64,
  pub(crate) pub_inputs_offset: u64,
  pub(crate) public_inputs: Vec<Fr>,
  pub(crate) precomputed: Vec<MultilinearPolynomial<Fr>>,
  pub(crate) wires: Vec<MultilinearPolynomial<Fr>>,
  pub(crate) aux: Vec<MultilinearPolynomial<Fr>>,
  pub(crate) _flavor: PhantomData<F>,
}

/// Inverts every element of `values` in place with one field inversion.
fn batch_invert(values: &mut [Fr]) -> Result<(), PipelineError> {
  let mut prefix = Vec::with_capacity(values.len());
  let mut acc = Fr::ONE;
  for v in values.iter() {
    prefix.push(acc);
    acc *= v;
  }
  let mut acc_inv =
    Option::<Fr>::from(Field::invert(&acc)).ok_or(PipelineError::DivisionByZero)?;
  for (v, p) in values.iter_mut().zip(prefix.iter()).rev() {
    let inv = acc_inv * p;
    acc_inv *= *v;
    *v = inv;
  }
  Ok(())
}

/// Builds the permutation grand product column.
///
/// `z[0] = 0` and `z[i] = Π_{k<i} num(k)/den(k)` for `i ≥ 1`, where each row
/// contributes `(w_j + β·id_j + γ)` to the numerator and `(w_j + β·σ_j + γ)`
/// to the denominator over the four wire columns. The zero head keeps the
/// column well formed under the shift, and the relation's `L_last·Δ` term
/// stands in for the final accumulator value.
fn compute_grand_product<F: Flavor>(
  pk: &ProvingKey<F>,
  beta: &Fr,
  gamma: &Fr,
) -> Result<MultilinearPolynomial<Fr>, PipelineError> {
  let n = pk.circuit_size as usize;
  let mut numerators = vec![Fr::ONE; n];
  let mut denominators = vec![Fr::ONE; n];
  for r in 0..n {
    for c in 0..F::NUM_WIRES {
      let w = pk.wires[c].evals()[r];
      let id = pk.precomputed[hoplite::ID_1 + c].evals()[r];
      let sigma = pk.precomputed[hoplite::SIGMA_1 + c].evals()[r];
      numerators[r] *= w + *beta * id + *gamma;
      denominators[r] *= w + *beta * sigma + *gamma;
    }
  }
  batch_invert(&mut denominators)?;

  let mut z = vec![Fr::ZERO; n];
  for r in 0..n - 1 {
    let step = numerators[r] * denominators[r];
    z[r + 1] = if r == 0 { step } else { z[r] * step };
  }
  Ok(MultilinearPolynomial::new(z))
}

/// Generates proofs against a [`ProvingKey`].
pub struct Prover;

impl Prover {
  /// Proves one trace, returning the serialized proof.
  pub fn prove<F: Flavor>(pk: &ProvingKey<F>) -> Result<Vec<u8>, PipelineError> {
    let (_prove_span, prove_t) = start_span!("prove", size = pk.circuit_size);
    if pk.precomputed.len() != F::NUM_PRECOMPUTED
      || pk.wires.len() != F::NUM_WIRES
      || pk.aux.len() != F::NUM_AUX
      || pk.circuit_size < 2
    {
      return Err(PipelineError::InvalidInputLength);
    }
    let srs = srs::get()?;
    let n = pk.circuit_size as usize;
    let d = n.log_2();

    let mut transcript = Transcript::new_prover(&pk.vk_digest);
    transcript.send_u64("circuit_size", pk.circuit_size);
    transcript.send_u64("public_input_size", pk.public_inputs.len() as u64);
    transcript.send_u64("pub_inputs_offset", pk.pub_inputs_offset);
    for (i, x) in pk.public_inputs.iter().enumerate() {
      transcript.send_scalar(&format!("public_input_{i}"), x);
    }

    for (label, wire) in F::wire_labels().iter().zip_eq(pk.wires.iter()) {
      transcript.send_point(label, &srs.commit(wire.evals())?.into());
    }
    for (label, column) in F::aux_labels().iter().zip_eq(pk.aux.iter()) {
      transcript.send_point(label, &srs.commit(column.evals())?.into());
    }

    let beta = transcript.squeeze("beta")?;
    let gamma = transcript.squeeze("gamma")?;
    let delta = compute_public_input_delta(
      &pk.public_inputs,
      &beta,
      &gamma,
      pk.circuit_size,
      pk.pub_inputs_offset,
    )?;
    let params = RelationParameters::new(beta, gamma, delta);

    let z_perm = compute_grand_product(pk, &params.beta, &params.gamma)?;
    transcript.send_point("z_perm", &srs.commit(z_perm.evals())?.into());

    let mut alphas = Vec::with_capacity(F::NUM_SUBRELATIONS - 1);
    for i in 0..F::NUM_SUBRELATIONS - 1 {
      alphas.push(transcript.squeeze(&format!("alpha_{i}"))?);
    }
    let mut gate_challenges = Vec::with_capacity(d);
    for i in 0..d {
      gate_challenges.push(transcript.squeeze(&format!("Sumcheck:gate_challenge_{i}"))?);
    }

    // all entities in canonical order; the shifted columns come last and are
    // derived, not committed
    let mut entities: Vec<MultilinearPolynomial<Fr>> = Vec::with_capacity(F::NUM_ALL);
    entities.extend(pk.precomputed.iter().cloned());
    entities.extend(pk.wires.iter().cloned());
    entities.extend(pk.aux.iter().cloned());
    entities.push(z_perm);
    for &i in F::to_be_shifted() {
      let shift = entities[i].shifted();
      entities.push(shift);
    }

    let sumcheck = SumcheckProver::prove::<F>(
      &mut transcript,
      d,
      entities.clone(),
      &params,
      &alphas,
      &gate_challenges,
    )?;

    // batch the columns with powers of rho, in the order the evaluations are
    // claimed: the unshifted block, then the to-be-shifted sources
    let rho = transcript.squeeze("rho")?;
    let mut rho_power = Fr::ONE;
    let mut batched_unshifted = vec![Fr::ZERO; n];
    for poly in entities.iter().take(F::NUM_UNSHIFTED) {
      for (b, v) in batched_unshifted.iter_mut().zip(poly.evals()) {
        *b += rho_power * v;
      }
      rho_power *= rho;
    }
    let mut batched_to_be_shifted = vec![Fr::ZERO; n];
    for &i in F::to_be_shifted() {
      for (b, v) in batched_to_be_shifted.iter_mut().zip(entities[i].evals()) {
        *b += rho_power * v;
      }
      rho_power *= rho;
    }
    let g_down = MultilinearPolynomial::new(batched_to_be_shifted.clone()).shifted();
    let a_0: Vec<Fr> = batched_unshifted
      .iter()
      .zip(g_down.evals())
      .map(|(f, g)| f + g)
      .collect();

    let folds = GeminiProver::compute_fold_polynomials(
      &sumcheck.challenge,
      MultilinearPolynomial::new(a_0.clone()),
    );
    for (i, fold) in folds.iter().enumerate() {
      let c = srs.commit(fold.evals())?;
      transcript.send_point(&format!("Gemini:FOLD_{}", i + 1), &c.into());
    }
    let r = transcript.squeeze("Gemini:r")?;
    let (a0_pos, a0_neg) = GeminiProver::compute_partially_evaluated_batch_polynomials(
      &batched_unshifted,
      &batched_to_be_shifted,
      &r,
    )?;

    // openings: A_0 at ±r, then each fold at the negated squared powers
    let mut opening_polys: Vec<(UniPoly<Fr>, Fr)> =
      vec![(UniPoly::new(a0_pos), r), (UniPoly::new(a0_neg), -r)];
    let mut all_folds = vec![MultilinearPolynomial::new(a_0)];
    all_folds.extend(folds);
    let mut neg_power = -r;
    for (i, fold) in all_folds.iter().enumerate() {
      let poly = UniPoly::new(fold.evals().to_vec());
      transcript.send_scalar(&format!("Gemini:a_{i}"), &poly.evaluate(&neg_power));
      if i >= 1 {
        opening_polys.push((poly, neg_power));
      }
      neg_power = -(neg_power * neg_power);
    }

    let (g_batched, z) = ShplonkProver::prove(&mut transcript, &srs, &opening_polys)?;
    KzgProver::prove(&mut transcript, &srs, &g_batched, &z)?;

    info!(elapsed_ms = %prove_t.elapsed().as_millis(), "prove");
    Ok(transcript.into_proof())
  }
}
