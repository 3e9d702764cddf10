//! The sumcheck argument over the batched flavor relation.
//!
//! The prover factors the gate-separator polynomial out of the round
//! univariates: round `i` sends the evaluations of
//! `pow_partial · ((1-X) + X·β_i) · Σ_edge pow_edge · H_edge(X)`,
//! where `H_edge` batches the subrelations over the row pair of the edge. The
//! verifier checks `S_i(0) + S_i(1)` against the running target, evaluates
//! `S_i` barycentrically at the round challenge to form the next target, and
//! closes with the batched relation on the claimed entity evaluations times
//! the fully bound gate separator.
use crate::{
  errors::PipelineError,
  flavor::{AllEntities, Flavor},
  polys::{
    eq::GateSeparatorPolynomial,
    multilinear::MultilinearPolynomial,
    univariate::{RoundUnivariate, extend_evaluations},
  },
  relations::RelationParameters,
  start_span,
  traits::{ExecutionContext, FieldOps, transcript::TranscriptOps},
  transcript::Transcript,
};
use ff::Field;
use halo2curves::bn256::Fr;
use rayon::prelude::*;
use std::time::Instant;
use tracing::{info, info_span};

/// What the sumcheck hands to the opening reductions.
pub struct SumcheckOutput<C: ExecutionContext, F: Flavor> {
  /// The round challenges `u_0, …, u_{d-1}`.
  pub challenge: Vec<C::Scalar>,
  /// The prover's claimed entity evaluations at `u`.
  pub claimed_evaluations: AllEntities<C::Scalar, F>,
  /// Whether every round check and the final relation check passed.
  pub verified: bool,
}

/// Verifier side of the sumcheck.
pub struct SumcheckVerifier;

impl SumcheckVerifier {
  /// Consumes the round univariates and claimed evaluations, accumulating all
  /// checks into `verified`. The transcript shape is fixed by `d` and the
  /// flavor, so a failed check never desynchronizes challenge derivation.
  pub fn verify<C: ExecutionContext, F: Flavor>(
    transcript: &mut C::Transcript,
    d: usize,
    params: &RelationParameters<C::Scalar>,
    alphas: &[C::Scalar],
    gate_challenges: &[C::Scalar],
  ) -> Result<SumcheckOutput<C, F>, PipelineError> {
    if alphas.len() != F::NUM_SUBRELATIONS - 1 || gate_challenges.len() != d {
      return Err(PipelineError::InvalidInputLength);
    }

    let mut verified = true;
    let mut pow = GateSeparatorPolynomial::new(gate_challenges.to_vec());
    let mut target = C::Scalar::zero();
    let mut challenge = Vec::with_capacity(d);

    for i in 0..d {
      let evals =
        transcript.receive_scalars(&format!("Sumcheck:univariate_{i}"), F::BATCHED_RELATION_PARTIAL_LENGTH)?;
      let univariate = RoundUnivariate::new(evals);
      let total = univariate.value_at_zero() + univariate.value_at_one();
      verified &= total.enforce_equal(&target, &format!("sumcheck_round_{i}"));

      let u_i = transcript.get_challenge(&format!("Sumcheck:u_{i}"))?;
      target = univariate.evaluate(&u_i)?;
      pow.partially_evaluate(&u_i);
      challenge.push(u_i);
    }

    let flat = transcript.receive_scalars("Sumcheck:evaluations", F::NUM_ALL)?;
    let claimed_evaluations = AllEntities::<C::Scalar, F>::new(flat)?;

    let mut acc = vec![C::Scalar::zero(); F::NUM_SUBRELATIONS];
    F::accumulate_relations(&claimed_evaluations, params, &C::Scalar::one(), &mut acc);
    let mut full = acc[0].clone();
    for (a, alpha) in acc[1..].iter().zip(alphas.iter()) {
      full = full + a.clone() * alpha.clone();
    }
    full = full * pow.partial_evaluation_result.clone();
    verified &= full.enforce_equal(&target, "sumcheck_full_relation");

    Ok(SumcheckOutput {
      challenge,
      claimed_evaluations,
      verified,
    })
  }
}

/// What the sumcheck prover leaves behind for the opening stages.
pub struct SumcheckProverOutput {
  /// The round challenges.
  pub challenge: Vec<Fr>,
  /// The entity evaluations at the round challenges, in canonical order.
  pub claimed_evaluations: Vec<Fr>,
}

/// Prover side of the sumcheck. Native only.
pub struct SumcheckProver;

impl SumcheckProver {
  /// Runs `d` rounds over `polys` (all entities, canonical order, each of
  /// length `2^d`), consuming the polynomials by in-place folding.
  pub fn prove<F: Flavor>(
    transcript: &mut Transcript,
    d: usize,
    mut polys: Vec<MultilinearPolynomial<Fr>>,
    params: &RelationParameters<Fr>,
    alphas: &[Fr],
    gate_challenges: &[Fr],
  ) -> Result<SumcheckProverOutput, PipelineError> {
    let (_sumcheck_span, sumcheck_t) = start_span!("sumcheck_prove", rounds = d);
    if polys.len() != F::NUM_ALL
      || alphas.len() != F::NUM_SUBRELATIONS - 1
      || gate_challenges.len() != d
      || polys.iter().any(|p| p.len() != 1 << d)
    {
      return Err(PipelineError::InvalidInputLength);
    }

    let max_len = F::BATCHED_RELATION_PARTIAL_LENGTH - 1;
    let mut pow = GateSeparatorPolynomial::new_with_products(gate_challenges.to_vec());
    let mut challenge = Vec::with_capacity(d);

    for i in 0..d {
      let half = polys[0].len() / 2;

      // per-extension-point, per-subrelation accumulators over all edges
      let edge_accs = (0..half)
        .into_par_iter()
        .map(|edge| {
          let mut cur = Vec::with_capacity(F::NUM_ALL);
          let mut delta = Vec::with_capacity(F::NUM_ALL);
          for p in polys.iter() {
            let lo = p.evals()[2 * edge];
            let hi = p.evals()[2 * edge + 1];
            cur.push(lo);
            delta.push(hi - lo);
          }

          let scaling = pow.at(edge);
          let mut accs = vec![vec![Fr::ZERO; F::NUM_SUBRELATIONS]; max_len];
          for (k, acc) in accs.iter_mut().enumerate() {
            let row = AllEntities::<Fr, F>::new_unchecked(cur.clone());
            F::accumulate_relations(&row, params, &scaling, acc);
            if k + 1 < max_len {
              for (c, dv) in cur.iter_mut().zip(delta.iter()) {
                *c += dv;
              }
            }
          }
          accs
        })
        .reduce(
          || vec![vec![Fr::ZERO; F::NUM_SUBRELATIONS]; max_len],
          |mut a, b| {
            for (ak, bk) in a.iter_mut().zip(b.iter()) {
              for (av, bv) in ak.iter_mut().zip(bk.iter()) {
                *av += bv;
              }
            }
            a
          },
        );

      // batch subrelations with [1, alphas…], then extend and reattach the
      // gate-separator factor
      let mut batched: Vec<Fr> = edge_accs
        .iter()
        .map(|per_subrel| {
          let mut v = per_subrel[0];
          for (s, alpha) in per_subrel[1..].iter().zip(alphas.iter()) {
            v += s * alpha;
          }
          v
        })
        .collect();
      extend_evaluations(&mut batched, F::BATCHED_RELATION_PARTIAL_LENGTH);

      let beta = pow.current_element();
      let mut gs = Fr::ONE;
      let mut evals = Vec::with_capacity(F::BATCHED_RELATION_PARTIAL_LENGTH);
      for v in batched.iter() {
        evals.push(v * gs * pow.partial_evaluation_result);
        gs += beta - Fr::ONE;
      }
      transcript.send_scalars(&format!("Sumcheck:univariate_{i}"), &evals);

      let u_i = transcript.squeeze(&format!("Sumcheck:u_{i}"))?;
      polys.par_iter_mut().for_each(|p| p.bind_low(&u_i));
      pow.partially_evaluate(&u_i);
      challenge.push(u_i);
    }

    let claimed_evaluations: Vec<Fr> = polys.iter().map(|p| p.evals()[0]).collect();
    transcript.send_scalars("Sumcheck:evaluations", &claimed_evaluations);

    info!(elapsed_ms = %sumcheck_t.elapsed().as_millis(), rounds = d, "sumcheck_prove");
    Ok(SumcheckProverOutput {
      challenge,
      claimed_evaluations,
    })
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::{flavor::hoplite::Hoplite, provider::NativeContext};
  use rand::{SeedableRng, rngs::StdRng};

  fn random_params(rng: &mut StdRng) -> (RelationParameters<Fr>, Vec<Fr>, Vec<Fr>) {
    let params = RelationParameters::new(Fr::random(&mut *rng), Fr::random(&mut *rng), Fr::ONE);
    let alphas: Vec<Fr> = (0..Hoplite::NUM_SUBRELATIONS - 1)
      .map(|_| Fr::random(&mut *rng))
      .collect();
    (params, alphas, Vec::new())
  }

  #[test]
  fn test_zero_rounds_accepts_vanishing_evaluations() {
    let mut rng = StdRng::seed_from_u64(0);
    let (params, alphas, _) = random_params(&mut rng);
    let digest = [3u8; 32];

    let mut tp = Transcript::new_prover(&digest);
    tp.send_scalars("Sumcheck:evaluations", &vec![Fr::ZERO; Hoplite::NUM_ALL]);
    let proof = tp.into_proof();

    let mut tv = Transcript::new_verifier(&digest, &proof);
    let out =
      SumcheckVerifier::verify::<NativeContext, Hoplite>(&mut tv, 0, &params, &alphas, &[]).unwrap();
    assert!(out.verified);
    assert!(out.challenge.is_empty());
  }

  #[test]
  fn test_zero_rounds_rejects_nonzero_relation() {
    let mut rng = StdRng::seed_from_u64(1);
    let (params, alphas, _) = random_params(&mut rng);
    let digest = [3u8; 32];

    // q_c = 1 makes the arithmetic subrelation evaluate to one
    let mut evals = vec![Fr::ZERO; Hoplite::NUM_ALL];
    evals[crate::flavor::hoplite::Q_C] = Fr::ONE;
    let mut tp = Transcript::new_prover(&digest);
    tp.send_scalars("Sumcheck:evaluations", &evals);
    let proof = tp.into_proof();

    let mut tv = Transcript::new_verifier(&digest, &proof);
    let out =
      SumcheckVerifier::verify::<NativeContext, Hoplite>(&mut tv, 0, &params, &alphas, &[]).unwrap();
    assert!(!out.verified);
  }

  fn zero_polys(d: usize) -> Vec<MultilinearPolynomial<Fr>> {
    (0..Hoplite::NUM_ALL)
      .map(|_| MultilinearPolynomial::zero(d))
      .collect()
  }

  #[test]
  fn test_prover_verifier_roundtrip_on_zero_polys() {
    let mut rng = StdRng::seed_from_u64(2);
    let d = 3;
    let (params, alphas, _) = random_params(&mut rng);
    let gate_challenges: Vec<Fr> = (0..d).map(|_| Fr::random(&mut rng)).collect();
    let digest = [5u8; 32];

    let mut tp = Transcript::new_prover(&digest);
    let prover_out = SumcheckProver::prove::<Hoplite>(
      &mut tp,
      d,
      zero_polys(d),
      &params,
      &alphas,
      &gate_challenges,
    )
    .unwrap();
    let proof = tp.into_proof();

    let mut tv = Transcript::new_verifier(&digest, &proof);
    let out = SumcheckVerifier::verify::<NativeContext, Hoplite>(
      &mut tv,
      d,
      &params,
      &alphas,
      &gate_challenges,
    )
    .unwrap();

    assert!(out.verified);
    assert_eq!(out.challenge, prover_out.challenge);
    assert_eq!(out.claimed_evaluations.all(), &prover_out.claimed_evaluations[..]);
    assert!(tv.fully_consumed());
  }

  #[test]
  fn test_tampered_round_univariate_rejected() {
    let mut rng = StdRng::seed_from_u64(4);
    let d = 2;
    let (params, alphas, _) = random_params(&mut rng);
    let gate_challenges: Vec<Fr> = (0..d).map(|_| Fr::random(&mut rng)).collect();
    let digest = [5u8; 32];

    let mut tp = Transcript::new_prover(&digest);
    SumcheckProver::prove::<Hoplite>(&mut tp, d, zero_polys(d), &params, &alphas, &gate_challenges)
      .unwrap();
    let mut proof = tp.into_proof();
    // bump the first evaluation of the first round univariate
    proof[0] ^= 1;

    let mut tv = Transcript::new_verifier(&digest, &proof);
    let out = SumcheckVerifier::verify::<NativeContext, Hoplite>(
      &mut tv,
      d,
      &params,
      &alphas,
      &gate_challenges,
    )
    .unwrap();
    assert!(!out.verified);
  }

  #[test]
  fn test_rejects_mismatched_inputs() {
    let (params, _, _) = random_params(&mut StdRng::seed_from_u64(6));
    let mut tv = Transcript::new_verifier(&[0u8; 32], &[]);
    assert!(matches!(
      SumcheckVerifier::verify::<NativeContext, Hoplite>(&mut tv, 1, &params, &[], &[Fr::ONE]),
      Err(PipelineError::InvalidInputLength)
    ));
  }
}
