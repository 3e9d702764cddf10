//! Multi-scalar multiplication over affine bases.
//! The bucket method is adapted from zcash/halo2, with unit scalars
//! accumulated directly instead of passing through the windows.
use crate::{errors::PipelineError, start_span};
use ff::{Field, PrimeField};
use halo2curves::{CurveAffine, group::Group};
use rayon::{current_num_threads, prelude::*};
use std::time::Instant;
use tracing::{info, info_span};

#[derive(Clone, Copy)]
enum Bucket<C: CurveAffine> {
  None,
  Affine(C),
  Projective(C::Curve),
}

impl<C: CurveAffine> Bucket<C> {
  fn add_assign(&mut self, other: &C) {
    *self = match *self {
      Bucket::None => Bucket::Affine(*other),
      Bucket::Affine(a) => Bucket::Projective(a + *other),
      Bucket::Projective(a) => Bucket::Projective(a + other),
    }
  }

  fn add(self, other: C::Curve) -> C::Curve {
    match self {
      Bucket::None => other,
      Bucket::Affine(a) => other + a,
      Bucket::Projective(a) => other + a,
    }
  }
}

fn msm_serial<C: CurveAffine>(coeffs: &[C::Scalar], bases: &[C]) -> C::Curve {
  let c = if bases.len() < 4 {
    1
  } else if bases.len() < 32 {
    3
  } else {
    (f64::from(bases.len() as u32)).ln().ceil() as usize
  };

  fn get_at<F: PrimeField>(segment: usize, c: usize, bytes: &F::Repr) -> usize {
    let skip_bits = segment * c;
    let skip_bytes = skip_bits / 8;

    if skip_bytes >= 32 {
      return 0;
    }

    let mut v = [0; 8];
    for (v, o) in v.iter_mut().zip(bytes.as_ref()[skip_bytes..].iter()) {
      *v = *o;
    }

    let mut tmp = u64::from_le_bytes(v);
    tmp >>= skip_bits - (skip_bytes * 8);
    tmp %= 1 << c;

    tmp as usize
  }

  // Unit scalars: accumulated directly and kept out of the windowed pass
  let mut unit_sum = C::Curve::identity();
  let mut general = Vec::new();

  for (s, b) in coeffs.iter().zip(bases) {
    if *s == C::Scalar::ONE {
      unit_sum += b;
    } else if *s != C::Scalar::ZERO {
      general.push((*s, *b));
    }
  }

  if general.is_empty() {
    return unit_sum;
  }

  let general_sum = {
    let segments = (256 / c) + 1;
    (0..segments)
      .rev()
      .fold(C::Curve::identity(), |mut acc, segment| {
        (0..c).for_each(|_| acc = acc.double());

        let mut buckets = vec![Bucket::None; (1 << c) - 1];

        for (coeff, base) in general.iter() {
          let coeff = get_at::<C::Scalar>(segment, c, &coeff.to_repr());
          if coeff != 0 {
            buckets[coeff - 1].add_assign(base);
          }
        }

        // Summation by parts
        // e.g. 3a + 2b + 1c = a +
        //                    (a) + b +
        //                    ((a) + b) + c
        let mut running_sum = C::Curve::identity();
        for exp in buckets.into_iter().rev() {
          running_sum = exp.add(running_sum);
          acc += &running_sum;
        }
        acc
      })
  };

  unit_sum + general_sum
}

/// Performs a multi-scalar multiplication, splitting across threads when the
/// input is large enough to amortize the fork.
///
/// # Errors
/// Returns `PipelineError::InvalidInputLength` if coeffs and bases have different lengths.
pub(crate) fn msm<C: CurveAffine>(
  coeffs: &[C::Scalar],
  bases: &[C],
) -> Result<C::Curve, PipelineError> {
  let (_msm_span, msm_t) = start_span!("msm", size = coeffs.len());

  if coeffs.len() != bases.len() {
    return Err(PipelineError::InvalidInputLength);
  }

  let num_threads = if coeffs.len() > 1024 {
    current_num_threads()
  } else {
    1
  };

  let result = if coeffs.len() > num_threads {
    let chunk = coeffs.len() / num_threads;
    coeffs
      .par_chunks(chunk)
      .zip(bases.par_chunks(chunk))
      .map(|(coeffs, bases)| msm_serial(coeffs, bases))
      .reduce(C::Curve::identity, |sum, evl| sum + evl)
  } else {
    msm_serial(coeffs, bases)
  };

  info!(elapsed_ms = %msm_t.elapsed().as_millis(), size = coeffs.len(), "msm");
  Ok(result)
}
