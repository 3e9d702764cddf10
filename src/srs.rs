//! The KZG structured reference string, held as process-global state so that
//! key construction, proving, and verification all draw on one copy.
use crate::{errors::PipelineError, provider::msm::msm, start_span};
use ff::Field;
use halo2curves::{
  bn256::{Fr, G1, G1Affine, G2, G2Affine},
  group::{cofactor::CofactorCurveAffine, Curve},
};
use once_cell::sync::Lazy;
use rand_core::RngCore;
use rayon::prelude::*;
use std::{
  sync::{Arc, Mutex, MutexGuard},
  time::Instant,
};
use tracing::{info, info_span};

/// Monomial powers of the trapdoor in G1, plus the degree-zero and degree-one
/// powers in G2.
pub struct KzgSrs {
  g1_points: Vec<G1Affine>,
  g2_gen: G2Affine,
  g2_tau: G2Affine,
}

impl KzgSrs {
  /// Generates a reference string with a trapdoor sampled from `rng`.
  pub fn setup(max_size: usize, rng: impl RngCore) -> Self {
    Self::setup_from_tau(Fr::random(rng), max_size)
  }

  /// Generates a reference string from an explicit trapdoor. Intended for
  /// tests; deployments load ceremony output instead.
  pub fn setup_from_tau(tau: Fr, max_size: usize) -> Self {
    let (_setup_span, setup_t) = start_span!("srs_setup", size = max_size);

    let mut powers = Vec::with_capacity(max_size);
    let mut cur = Fr::ONE;
    for _ in 0..max_size {
      powers.push(cur);
      cur *= tau;
    }
    let projective: Vec<G1> = powers.par_iter().map(|p| G1::generator() * p).collect();
    let mut g1_points = vec![G1Affine::identity(); max_size];
    G1::batch_normalize(&projective, &mut g1_points);

    info!(elapsed_ms = %setup_t.elapsed().as_millis(), size = max_size, "srs_setup");
    Self {
      g1_points,
      g2_gen: G2Affine::generator(),
      g2_tau: G2Affine::from(G2::generator() * tau),
    }
  }

  /// The largest coefficient vector this string can commit to.
  pub fn max_size(&self) -> usize {
    self.g1_points.len()
  }

  /// The G2 generator.
  pub fn g2_gen(&self) -> G2Affine {
    self.g2_gen
  }

  /// The G2 generator times the trapdoor.
  pub fn g2_tau(&self) -> G2Affine {
    self.g2_tau
  }

  /// Commits to a coefficient vector against the low-order powers.
  pub fn commit(&self, coeffs: &[Fr]) -> Result<G1, PipelineError> {
    if coeffs.len() > self.g1_points.len() {
      return Err(PipelineError::InvalidVectorSize {
        actual: coeffs.len(),
        max: self.g1_points.len(),
      });
    }
    msm(coeffs, &self.g1_points[..coeffs.len()])
  }
}

static GLOBAL_SRS: Lazy<Mutex<Option<Arc<KzgSrs>>>> = Lazy::new(|| Mutex::new(None));

fn lock_global() -> MutexGuard<'static, Option<Arc<KzgSrs>>> {
  GLOBAL_SRS
    .lock()
    .unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Installs `srs` as the process-global reference string, replacing any
/// previous one. Handles already taken via [`get`] stay valid.
pub fn init(srs: KzgSrs) {
  *lock_global() = Some(Arc::new(srs));
}

/// A handle to the installed reference string.
pub fn get() -> Result<Arc<KzgSrs>, PipelineError> {
  (*lock_global()).clone().ok_or(PipelineError::SrsNotInitialized)
}

/// Clears the process-global reference string.
pub fn teardown() {
  *lock_global() = None;
}
