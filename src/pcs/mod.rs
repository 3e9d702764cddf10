//! The opening-reduction chain.
//!
//! Gemini turns one multilinear evaluation claim into a handful of univariate
//! opening claims, Shplonk batches those into a single claim with evaluation
//! zero, and KZG reduces that claim to a pairing pair the execution context
//! either checks or defers.
use crate::traits::ExecutionContext;

pub mod gemini;
pub mod kzg;
pub mod shplonk;

/// A univariate opening claim: the polynomial behind `commitment` evaluates
/// to `evaluation` at `point`.
#[derive(Clone, Debug)]
pub struct OpeningClaim<C: ExecutionContext> {
  /// The opening point.
  pub point: C::Scalar,
  /// The claimed evaluation.
  pub evaluation: C::Scalar,
  /// Commitment to the opened polynomial.
  pub commitment: C::Point,
}

#[cfg(test)]
mod tests {
  use super::{gemini::{GeminiProver, GeminiVerifier}, kzg::{KzgProver, KzgVerifier}, shplonk::{ShplonkProver, ShplonkVerifier}};
  use crate::{
    key::VerificationKey,
    polys::{multilinear::MultilinearPolynomial, univariate::UniPoly},
    provider::NativeContext,
    srs::KzgSrs,
    traits::{ExecutionContext, VerifierOutput},
    transcript::Transcript,
  };
  use ff::Field;
  use halo2curves::bn256::Fr;
  use rand::{SeedableRng, rngs::StdRng};

  fn pairing_vk(srs: &KzgSrs, n: u64) -> VerificationKey<NativeContext> {
    VerificationKey::new(n, 0, 1, vec![], srs.g2_gen(), srs.g2_tau()).unwrap()
  }

  // Drives one multilinear claim through Gemini, Shplonk and KZG on both
  // sides and checks the pairing at the end.
  #[test]
  fn test_full_opening_chain() {
    let mut rng = StdRng::seed_from_u64(11);
    let d = 3;
    let n = 1usize << d;
    let srs = KzgSrs::setup_from_tau(Fr::random(&mut rng), n);

    // one unshifted column and one to-be-shifted column with a zero head
    let unshifted = MultilinearPolynomial::new((0..n).map(|_| Fr::random(&mut rng)).collect());
    let mut shifted_src: Vec<Fr> = (0..n).map(|_| Fr::random(&mut rng)).collect();
    shifted_src[0] = Fr::ZERO;
    let to_be_shifted = MultilinearPolynomial::new(shifted_src);

    let u: Vec<Fr> = (0..d).map(|_| Fr::random(&mut rng)).collect();
    let evals = vec![unshifted.evaluate(&u)];
    let shifted_evals = vec![to_be_shifted.shifted().evaluate(&u)];
    let commitments = vec![srs.commit(unshifted.evals()).unwrap()];
    let shifted_commitments = vec![srs.commit(to_be_shifted.evals()).unwrap()];

    let digest = [9u8; 32];
    let mut tp = Transcript::new_prover(&digest);
    let rho = tp.squeeze("rho").unwrap();

    let (batched_f, batched_g, batched_eval) =
      GeminiVerifier::batch_multivariate_claims::<NativeContext>(
        &commitments,
        &shifted_commitments,
        &evals,
        &shifted_evals,
        &rho,
      )
      .unwrap();

    // prover-side batched polynomials: F, G, and A_0 = F + G/X
    let f_poly: Vec<Fr> = unshifted.evals().to_vec();
    let g_poly: Vec<Fr> = to_be_shifted.evals().iter().map(|v| rho * v).collect();
    let g_down = MultilinearPolynomial::new(g_poly.clone()).shifted();
    let a0: Vec<Fr> = f_poly
      .iter()
      .zip(g_down.evals().iter())
      .map(|(f, g)| f + g)
      .collect();

    let folds = GeminiProver::compute_fold_polynomials(&u, MultilinearPolynomial::new(a0.clone()));
    for (i, fold) in folds.iter().enumerate() {
      let c = srs.commit(fold.evals()).unwrap();
      tp.send_point(&format!("Gemini:FOLD_{}", i + 1), &c.into());
    }
    let r = tp.squeeze("Gemini:r").unwrap();
    let (a0_pos, a0_neg) =
      GeminiProver::compute_partially_evaluated_batch_polynomials(&f_poly, &g_poly, &r).unwrap();

    let mut opening_polys: Vec<(UniPoly<Fr>, Fr)> =
      vec![(UniPoly::new(a0_pos), r), (UniPoly::new(a0_neg), -r)];
    let mut all_folds = vec![MultilinearPolynomial::new(a0.clone())];
    all_folds.extend(folds);
    let mut neg_power = -r;
    for (i, fold) in all_folds.iter().enumerate() {
      let poly = UniPoly::new(fold.evals().to_vec());
      tp.send_scalar(&format!("Gemini:a_{i}"), &poly.evaluate(&neg_power));
      if i >= 1 {
        opening_polys.push((poly, neg_power));
      }
      neg_power = -(neg_power * neg_power);
    }

    let (g_batched, z) = ShplonkProver::prove(&mut tp, &srs, &opening_polys).unwrap();
    KzgProver::prove(&mut tp, &srs, &g_batched, &z).unwrap();
    let proof = tp.into_proof();

    // verifier side
    let mut tv = Transcript::new_verifier(&digest, &proof);
    assert_eq!(tv.squeeze("rho").unwrap(), rho);
    let claims = GeminiVerifier::reduce_verification::<NativeContext>(
      &mut tv,
      &u,
      &batched_f,
      &batched_g,
      &batched_eval,
    )
    .unwrap();
    assert_eq!(claims.len(), d + 1);
    // the reconstructed positive evaluation is A_0(r)
    assert_eq!(claims[0].evaluation, UniPoly::new(a0).evaluate(&r));

    let final_claim =
      ShplonkVerifier::reduce_verification::<NativeContext>(&mut tv, &claims).unwrap();
    let pair = KzgVerifier::reduce_verification::<NativeContext>(&mut tv, &final_claim).unwrap();
    assert!(tv.fully_consumed());

    match NativeContext::finalize(&pairing_vk(&srs, n as u64), pair).unwrap() {
      VerifierOutput::Verified(ok) => assert!(ok),
      VerifierOutput::DeferredPairing(..) => unreachable!(),
    }
  }

  // A wrong claimed evaluation must surface as a failed pairing.
  #[test]
  fn test_kzg_rejects_wrong_evaluation() {
    let mut rng = StdRng::seed_from_u64(12);
    let n = 8;
    let srs = KzgSrs::setup_from_tau(Fr::random(&mut rng), n);
    let poly = UniPoly::new((0..n).map(|_| Fr::random(&mut rng)).collect());
    let commitment = srs.commit(poly.coeffs()).unwrap();

    let digest = [10u8; 32];
    let mut tp = Transcript::new_prover(&digest);
    let point = Fr::from(41);
    KzgProver::prove(&mut tp, &srs, &poly, &point).unwrap();
    let proof = tp.into_proof();

    for (delta, expect) in [(Fr::ZERO, true), (Fr::ONE, false)] {
      let claim = super::OpeningClaim::<NativeContext> {
        point,
        evaluation: poly.evaluate(&point) + delta,
        commitment,
      };
      let mut tv = Transcript::new_verifier(&digest, &proof);
      let pair = KzgVerifier::reduce_verification::<NativeContext>(&mut tv, &claim).unwrap();
      match NativeContext::finalize(&pairing_vk(&srs, n as u64), pair).unwrap() {
        VerifierOutput::Verified(ok) => assert_eq!(ok, expect),
        VerifierOutput::DeferredPairing(..) => unreachable!(),
      }
    }
  }
}
