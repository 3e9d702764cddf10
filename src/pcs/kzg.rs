//! The final KZG opening.
//!
//! The prover sends the quotient witness `W = (p(X) − v)/(X − z)`; the
//! verifier assembles the pairing pair `(P₀, P₁) = (C + z·W − v·[1]₁, −W)`
//! satisfying `e(P₀, [1]₂)·e(P₁, [τ]₂) = 1` exactly when the claim holds.
//! What happens to the pair is the execution context's business: checked
//! natively, deferred recursively.
use super::OpeningClaim;
use crate::{
  errors::PipelineError,
  polys::univariate::UniPoly,
  srs::KzgSrs,
  traits::{ExecutionContext, FieldOps, GroupOps, transcript::TranscriptOps},
  transcript::Transcript,
};
use halo2curves::bn256::Fr;

/// Verifier side of the KZG opening.
pub struct KzgVerifier;

impl KzgVerifier {
  /// Reads the quotient witness and assembles the deferred pairing pair.
  pub fn reduce_verification<C: ExecutionContext>(
    transcript: &mut C::Transcript,
    claim: &OpeningClaim<C>,
  ) -> Result<(C::Point, C::Point), PipelineError> {
    let w = transcript.receive_point("KZG:W")?;
    let p0 = C::Point::batch_mul(
      &[claim.commitment.clone(), w.clone(), C::Point::generator()],
      &[
        C::Scalar::one(),
        claim.point.clone(),
        -claim.evaluation.clone(),
      ],
    )?;
    let p1 = w.negate();
    Ok((p0, p1))
  }
}

/// Prover side of the KZG opening. Native only.
pub struct KzgProver;

impl KzgProver {
  /// Commits to the quotient `(p(X) − p(z))/(X − z)` and sends it.
  pub fn prove(
    transcript: &mut Transcript,
    srs: &KzgSrs,
    poly: &UniPoly<Fr>,
    point: &Fr,
  ) -> Result<(), PipelineError> {
    let mut diff = poly.clone();
    diff.sub_constant(&poly.evaluate(point));
    let witness = diff.divide_by_linear(point);
    let commitment = srs.commit(witness.coeffs())?;
    transcript.send_point("KZG:W", &commitment.into());
    Ok(())
  }
}
