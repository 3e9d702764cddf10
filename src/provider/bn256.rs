//! The native BN254 backend: scalars are `Fr`, commitments are `G1`, and the
//! final pairing check executes immediately.
use crate::{
  errors::PipelineError,
  key::VerificationKey,
  provider::msm::msm,
  transcript::Transcript,
  traits::{transcript::TranscriptOps, ExecutionContext, FieldOps, GroupOps, VerifierOutput},
};
use ff::Field;
use halo2curves::{
  bn256::{Bn256, Fr, G1, G1Affine, Gt},
  group::{cofactor::CofactorCurveAffine, Curve, Group},
  pairing::{MillerLoopResult, MultiMillerLoop},
};

type G2Prepared = <Bn256 as MultiMillerLoop>::G2Prepared;

/// The native scalar field.
pub type NativeScalar = Fr;

/// The native commitment group.
pub type NativePoint = G1;

impl FieldOps for Fr {
  type Native = Fr;

  fn from_native(v: Fr) -> Self {
    v
  }

  fn value(&self) -> Fr {
    *self
  }

  fn invert(&self) -> Result<Self, PipelineError> {
    Option::from(Field::invert(self)).ok_or(PipelineError::DivisionByZero)
  }

  fn enforce_equal(&self, other: &Self, _label: &str) -> bool {
    self == other
  }
}

impl GroupOps<Fr> for G1 {
  fn generator() -> Self {
    <G1 as Group>::generator()
  }

  fn negate(&self) -> Self {
    -self
  }

  fn add(&self, other: &Self) -> Result<Self, PipelineError> {
    Ok(self + other)
  }

  fn mul(&self, scalar: &Fr) -> Result<Self, PipelineError> {
    Ok(self * scalar)
  }

  fn batch_mul(points: &[Self], scalars: &[Fr]) -> Result<Self, PipelineError> {
    if points.len() != scalars.len() {
      return Err(PipelineError::InvalidInputLength);
    }
    let mut bases = vec![G1Affine::identity(); points.len()];
    G1::batch_normalize(points, &mut bases);
    msm(scalars, &bases)
  }
}

/// Runs the pipeline on plain BN254 arithmetic.
#[derive(Clone, Debug)]
pub struct NativeContext;

impl ExecutionContext for NativeContext {
  type Scalar = Fr;
  type Point = G1;
  type Transcript = Transcript;

  fn finalize(
    vk: &VerificationKey<Self>,
    pair: (G1, G1),
  ) -> Result<VerifierOutput<Self>, PipelineError> {
    let mut affine = [G1Affine::identity(); 2];
    G1::batch_normalize(&[pair.0, pair.1], &mut affine);
    let g2_gen = G2Prepared::from(vk.g2_gen);
    let g2_tau = G2Prepared::from(vk.g2_tau);

    // e(P0, [1]_2) * e(P1, [tau]_2) == 1
    let gt = Bn256::multi_miller_loop(&[(&affine[0], &g2_gen), (&affine[1], &g2_tau)])
      .final_exponentiation();
    Ok(VerifierOutput::Verified(gt == Gt::identity()))
  }
}

impl TranscriptOps<NativeContext> for Transcript {
  fn receive_u64(&mut self, label: &str) -> Result<(Fr, u64), PipelineError> {
    let v = self.read_u64(label)?;
    Ok((Fr::from(v), v))
  }

  fn receive_scalar(&mut self, label: &str) -> Result<Fr, PipelineError> {
    self.read_scalar(label)
  }

  fn receive_scalars(&mut self, label: &str, n: usize) -> Result<Vec<Fr>, PipelineError> {
    self.read_scalars(label, n)
  }

  fn receive_point(&mut self, label: &str) -> Result<G1, PipelineError> {
    Ok(self.read_point(label)?.into())
  }

  fn get_challenge(&mut self, label: &str) -> Result<Fr, PipelineError> {
    self.squeeze(label)
  }

  fn challenge_log(&self) -> Vec<Fr> {
    self.challenges().to_vec()
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use halo2curves::bn256::{G2, G2Affine};
  use rand::{SeedableRng, rngs::StdRng};

  #[test]
  fn test_batch_mul_matches_fold() {
    let mut rng = StdRng::seed_from_u64(0);
    let points: Vec<G1> = (0..9).map(|_| G1::random(&mut rng)).collect();
    let scalars: Vec<Fr> = (0..9).map(|_| Fr::random(&mut rng)).collect();

    let naive = points
      .iter()
      .zip(scalars.iter())
      .fold(G1::identity(), |acc, (p, s)| acc + p * s);
    assert_eq!(naive, G1::batch_mul(&points, &scalars).unwrap());
  }

  fn pairing_key(tau: Fr) -> VerificationKey<NativeContext> {
    VerificationKey::new(
      16,
      0,
      1,
      vec![],
      G2Affine::generator(),
      G2Affine::from(G2::generator() * tau),
    )
    .unwrap()
  }

  #[test]
  fn test_finalize_accepts_valid_pair() {
    // e([tau]_1, [1]_2) * e(-[1]_1, [tau]_2) == 1
    let tau = Fr::from(5u64);
    let vk = pairing_key(tau);
    let p0 = G1::generator() * tau;
    let p1 = -G1::generator();
    let out = NativeContext::finalize(&vk, (p0, p1)).unwrap();
    assert_eq!(out.as_verified(), Some(true));
  }

  #[test]
  fn test_finalize_rejects_invalid_pair() {
    let tau = Fr::from(5u64);
    let vk = pairing_key(tau);
    let p0 = G1::generator() * tau;
    let p1 = G1::generator();
    let out = NativeContext::finalize(&vk, (p0, p1)).unwrap();
    assert_eq!(out.as_verified(), Some(false));
  }
}
