//! The Shplonk batch-opening reduction.
//!
//! Many opening claims at distinct points collapse into a single claim with
//! evaluation zero: the prover commits to the batched quotient
//! `Q(X) = Σⱼ νʲ·(pⱼ(X) − vⱼ)/(X − xⱼ)` and the verifier assembles, from `Q`
//! and the claim commitments, a commitment to the partially evaluated
//! difference `G(X) = Q(X) − Σⱼ νʲ/(z − xⱼ)·(pⱼ(X) − vⱼ)`. `G` vanishes at
//! `z` exactly when every claim holds, so one KZG opening finishes the job.
use super::OpeningClaim;
use crate::{
  errors::PipelineError,
  polys::univariate::{UniPoly, div_f},
  srs::KzgSrs,
  traits::{ExecutionContext, FieldOps, GroupOps, transcript::TranscriptOps},
  transcript::Transcript,
};
use halo2curves::bn256::Fr;

/// Verifier side of the Shplonk reduction.
pub struct ShplonkVerifier;

impl ShplonkVerifier {
  /// Reads `Q`, derives the batching challenges and assembles the single
  /// zero-evaluation claim `(z, 0, [G])`.
  ///
  /// The assembled commitment is
  /// `[G] = [Q] − Σⱼ νʲ/(z − xⱼ)·Cⱼ + (Σⱼ νʲ·vⱼ/(z − xⱼ))·[1]₁`,
  /// computed as one batched scalar multiplication.
  pub fn reduce_verification<C: ExecutionContext>(
    transcript: &mut C::Transcript,
    claims: &[OpeningClaim<C>],
  ) -> Result<OpeningClaim<C>, PipelineError> {
    if claims.is_empty() {
      return Err(PipelineError::InvalidInputLength);
    }
    let nu = transcript.get_challenge("Shplonk:nu")?;
    let q = transcript.receive_point("Shplonk:Q")?;
    let z = transcript.get_challenge("Shplonk:z")?;

    let mut points = Vec::with_capacity(claims.len() + 2);
    let mut scalars = Vec::with_capacity(claims.len() + 2);
    points.push(q);
    scalars.push(C::Scalar::one());

    let mut constant_term = C::Scalar::zero();
    let mut nu_power = C::Scalar::one();
    for claim in claims {
      let inv_diff = (z.clone() - claim.point.clone()).invert()?;
      let coeff = nu_power.clone() * inv_diff;
      points.push(claim.commitment.clone());
      scalars.push(-coeff.clone());
      constant_term = constant_term + coeff * claim.evaluation.clone();
      nu_power = nu_power * nu.clone();
    }
    points.push(C::Point::generator());
    scalars.push(constant_term);

    let commitment = C::Point::batch_mul(&points, &scalars)?;
    Ok(OpeningClaim {
      point: z,
      evaluation: C::Scalar::zero(),
      commitment,
    })
  }
}

/// Prover side of the Shplonk reduction. Native only.
pub struct ShplonkProver;

impl ShplonkProver {
  /// Commits to the batched quotient `Q`, then returns the partially
  /// evaluated difference `G` together with the opening point `z`.
  ///
  /// `G(z) = 0` by construction, so the returned polynomial is ready for the
  /// final KZG opening at `z`.
  pub fn prove(
    transcript: &mut Transcript,
    srs: &KzgSrs,
    polys_and_points: &[(UniPoly<Fr>, Fr)],
  ) -> Result<(UniPoly<Fr>, Fr), PipelineError> {
    if polys_and_points.is_empty() {
      return Err(PipelineError::InvalidInputLength);
    }
    let nu = transcript.squeeze("Shplonk:nu")?;

    // differences p_j - v_j, reused for both Q and G
    let mut differences = Vec::with_capacity(polys_and_points.len());
    for (p, x) in polys_and_points {
      let mut diff = p.clone();
      diff.sub_constant(&p.evaluate(x));
      differences.push(diff);
    }

    let mut q = UniPoly::new(vec![]);
    let mut nu_power = Fr::one();
    for (diff, (_, x)) in differences.iter().zip(polys_and_points.iter()) {
      let quotient = diff.divide_by_linear(x);
      q.add_scaled(&quotient, &nu_power);
      nu_power *= nu;
    }
    let q_commitment = srs.commit(q.coeffs())?;
    transcript.send_point("Shplonk:Q", &q_commitment.into());

    let z = transcript.squeeze("Shplonk:z")?;
    let mut g = q;
    let mut nu_power = Fr::one();
    for (diff, (_, x)) in differences.iter().zip(polys_and_points.iter()) {
      let coeff = div_f(nu_power, z - x)?;
      g.add_scaled(diff, &-coeff);
      nu_power *= nu;
    }
    Ok((g, z))
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::provider::NativeContext;
  use ff::Field;
  use rand::{SeedableRng, rngs::StdRng};

  #[test]
  fn test_batched_quotient_matches_assembled_commitment() {
    let mut rng = StdRng::seed_from_u64(13);
    let n = 8;
    let srs = KzgSrs::setup_from_tau(Fr::random(&mut rng), n);
    let polys_and_points: Vec<(UniPoly<Fr>, Fr)> = (0..3)
      .map(|_| {
        (
          UniPoly::new((0..n).map(|_| Fr::random(&mut rng)).collect()),
          Fr::random(&mut rng),
        )
      })
      .collect();

    let digest = [3u8; 32];
    let mut tp = Transcript::new_prover(&digest);
    let (g, z) = ShplonkProver::prove(&mut tp, &srs, &polys_and_points).unwrap();
    let proof = tp.into_proof();

    assert_eq!(g.evaluate(&z), Fr::ZERO);

    let claims: Vec<OpeningClaim<NativeContext>> = polys_and_points
      .iter()
      .map(|(p, x)| OpeningClaim {
        point: *x,
        evaluation: p.evaluate(x),
        commitment: srs.commit(p.coeffs()).unwrap(),
      })
      .collect();

    let mut tv = Transcript::new_verifier(&digest, &proof);
    let claim = ShplonkVerifier::reduce_verification::<NativeContext>(&mut tv, &claims).unwrap();
    assert!(tv.fully_consumed());
    assert_eq!(claim.point, z);
    assert_eq!(claim.evaluation, Fr::ZERO);
    assert_eq!(claim.commitment, srs.commit(g.coeffs()).unwrap());
  }

  #[test]
  fn test_wrong_claim_shifts_assembled_commitment() {
    let mut rng = StdRng::seed_from_u64(14);
    let n = 4;
    let srs = KzgSrs::setup_from_tau(Fr::random(&mut rng), n);
    let poly = UniPoly::new((0..n).map(|_| Fr::random(&mut rng)).collect());
    let x = Fr::random(&mut rng);

    let digest = [4u8; 32];
    let mut tp = Transcript::new_prover(&digest);
    let (g, _) = ShplonkProver::prove(&mut tp, &srs, &[(poly.clone(), x)]).unwrap();
    let proof = tp.into_proof();

    let claim = OpeningClaim::<NativeContext> {
      point: x,
      evaluation: poly.evaluate(&x) + Fr::ONE,
      commitment: srs.commit(poly.coeffs()).unwrap(),
    };
    let mut tv = Transcript::new_verifier(&digest, &proof);
    let assembled = ShplonkVerifier::reduce_verification::<NativeContext>(&mut tv, &[claim]).unwrap();
    assert_ne!(assembled.commitment, srs.commit(g.coeffs()).unwrap());
  }

  #[test]
  fn test_rejects_empty_claims() {
    let mut tv = Transcript::new_verifier(&[0u8; 32], &[]);
    assert!(matches!(
      ShplonkVerifier::reduce_verification::<NativeContext>(&mut tv, &[]),
      Err(PipelineError::InvalidInputLength)
    ));
  }
}
