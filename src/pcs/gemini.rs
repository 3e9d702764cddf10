//! The Gemini reduction: one multilinear evaluation claim over commitments
//! becomes `d + 1` univariate opening claims.
//!
//! The prover folds the batched polynomial `A_0 = F + G/X` down the sumcheck
//! challenge, committing to each fold, and later reveals the folds' values at
//! negated powers of the evaluation challenge `r`. The verifier never sees
//! `A_0(r)` directly: it reconstructs it from the claimed fold values by
//! running the fold recurrence backwards, so a wrong fold value breaks the
//! chain back to the multilinear claim.
use super::OpeningClaim;
use crate::{
  errors::PipelineError,
  polys::multilinear::MultilinearPolynomial,
  traits::{ExecutionContext, FieldOps, GroupOps, transcript::TranscriptOps},
};
use halo2curves::bn256::Fr;
use itertools::Itertools;

/// Verifier side of the Gemini reduction.
pub struct GeminiVerifier;

impl GeminiVerifier {
  /// Batches the unshifted and to-be-shifted commitment groups and their
  /// claimed evaluations with powers of `rho`.
  ///
  /// The first batching scalar is the constant one rather than a computed
  /// power, which pins it to a circuit constant in the recursive context.
  pub fn batch_multivariate_claims<C: ExecutionContext>(
    unshifted_commitments: &[C::Point],
    to_be_shifted_commitments: &[C::Point],
    unshifted_evals: &[C::Scalar],
    shifted_evals: &[C::Scalar],
    rho: &C::Scalar,
  ) -> Result<(C::Point, C::Point, C::Scalar), PipelineError> {
    if unshifted_commitments.len() != unshifted_evals.len()
      || to_be_shifted_commitments.len() != shifted_evals.len()
    {
      return Err(PipelineError::InvalidInputLength);
    }

    let total = unshifted_evals.len() + shifted_evals.len();
    let mut scalars = Vec::with_capacity(total);
    scalars.push(C::Scalar::one());
    for j in 1..total {
      scalars.push(scalars[j - 1].clone() * rho.clone());
    }

    let mut batched_evaluation = C::Scalar::zero();
    for (s, v) in scalars.iter().zip_eq(unshifted_evals.iter().chain(shifted_evals.iter())) {
      batched_evaluation = batched_evaluation + s.clone() * v.clone();
    }

    let split = unshifted_evals.len();
    let batched_unshifted = C::Point::batch_mul(unshifted_commitments, &scalars[..split])?;
    let batched_to_be_shifted = C::Point::batch_mul(to_be_shifted_commitments, &scalars[split..])?;
    Ok((batched_unshifted, batched_to_be_shifted, batched_evaluation))
  }

  /// Reads the fold commitments and fold evaluations, reconstructs the
  /// positive evaluation `A_0(r)`, and returns the `d + 1` opening claims
  /// in Shplonk order.
  pub fn reduce_verification<C: ExecutionContext>(
    transcript: &mut C::Transcript,
    multilinear_challenge: &[C::Scalar],
    batched_unshifted: &C::Point,
    batched_to_be_shifted: &C::Point,
    batched_evaluation: &C::Scalar,
  ) -> Result<Vec<OpeningClaim<C>>, PipelineError> {
    let d = multilinear_challenge.len();
    if d == 0 {
      return Err(PipelineError::InvalidInputLength);
    }

    let mut fold_commitments = Vec::with_capacity(d - 1);
    for i in 1..d {
      fold_commitments.push(transcript.receive_point(&format!("Gemini:FOLD_{i}"))?);
    }
    let r = transcript.get_challenge("Gemini:r")?;
    let mut fold_evals = Vec::with_capacity(d);
    for i in 0..d {
      fold_evals.push(transcript.receive_scalar(&format!("Gemini:a_{i}"))?);
    }

    // r, r^2, r^4, ..., r^(2^(d-1))
    let mut r_squares = Vec::with_capacity(d);
    r_squares.push(r.clone());
    for i in 1..d {
      let prev = r_squares[i - 1].clone();
      r_squares.push(prev.clone() * prev);
    }

    // Walk the fold recurrence backwards from the multilinear claim: at each
    // level, A_l(r^(2^l)) is determined by A_{l+1}(r^(2^(l+1))) and the
    // claimed negative evaluation A_l(-r^(2^l)).
    let mut eval_pos = batched_evaluation.clone();
    for l in (1..=d).rev() {
      let r_pow = r_squares[l - 1].clone();
      let u = multilinear_challenge[l - 1].clone();
      let eval_neg = fold_evals[l - 1].clone();
      let one_minus_u = C::Scalar::one() - u.clone();

      let denom = (r_pow.clone() * one_minus_u.clone() + u.clone()).invert()?;
      let num = r_pow.clone() * eval_pos * C::Scalar::from_u64(2)
        - eval_neg * (r_pow * one_minus_u - u);
      eval_pos = num * denom;
    }

    let r_inv = r.invert()?;
    let c0_pos = C::Point::batch_mul(
      &[batched_unshifted.clone(), batched_to_be_shifted.clone()],
      &[C::Scalar::one(), r_inv.clone()],
    )?;
    let c0_neg = C::Point::batch_mul(
      &[batched_unshifted.clone(), batched_to_be_shifted.clone()],
      &[C::Scalar::one(), -r_inv],
    )?;

    let mut claims = Vec::with_capacity(d + 1);
    claims.push(OpeningClaim {
      point: r,
      evaluation: eval_pos,
      commitment: c0_pos,
    });
    claims.push(OpeningClaim {
      point: -r_squares[0].clone(),
      evaluation: fold_evals[0].clone(),
      commitment: c0_neg,
    });
    for i in 1..d {
      claims.push(OpeningClaim {
        point: -r_squares[i].clone(),
        evaluation: fold_evals[i].clone(),
        commitment: fold_commitments[i - 1].clone(),
      });
    }
    Ok(claims)
  }
}

/// Prover side of the Gemini reduction. Native only.
pub struct GeminiProver;

impl GeminiProver {
  /// Folds `a_0` down the multilinear challenge, returning
  /// `[A_1, …, A_{d-1}]`.
  pub fn compute_fold_polynomials(
    multilinear_challenge: &[Fr],
    a_0: MultilinearPolynomial<Fr>,
  ) -> Vec<MultilinearPolynomial<Fr>> {
    let d = multilinear_challenge.len();
    let mut folds = Vec::with_capacity(d.saturating_sub(1));
    let mut cur = a_0;
    for u in multilinear_challenge.iter().take(d.saturating_sub(1)) {
      cur.bind_low(u);
      folds.push(cur.clone());
    }
    folds
  }

  /// The two coefficient vectors whose commitments the verifier assembles as
  /// `F ± r⁻¹·G`: their evaluations at `±r` equal `A_0(±r)`.
  pub fn compute_partially_evaluated_batch_polynomials(
    batched_unshifted: &[Fr],
    batched_to_be_shifted: &[Fr],
    r: &Fr,
  ) -> Result<(Vec<Fr>, Vec<Fr>), PipelineError> {
    if batched_unshifted.len() != batched_to_be_shifted.len() {
      return Err(PipelineError::InvalidInputLength);
    }
    let r_inv = FieldOps::invert(r)?;
    let pos = batched_unshifted
      .iter()
      .zip(batched_to_be_shifted.iter())
      .map(|(f, g)| f + r_inv * g)
      .collect();
    let neg = batched_unshifted
      .iter()
      .zip(batched_to_be_shifted.iter())
      .map(|(f, g)| f - r_inv * g)
      .collect();
    Ok((pos, neg))
  }
}
