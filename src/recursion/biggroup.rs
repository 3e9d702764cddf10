//! Emulated BN254 G1 points: affine coordinates held in nonnative wires.
//!
//! Group arithmetic uses the incomplete affine formulas, which divide by
//! coordinate differences and therefore exclude the identity and coincident
//! operands. Multi-scalar multiplication runs a bit-ladder seeded with a
//! fixed offset generator so the accumulator stays away from those
//! exceptional cases for any pipeline input; the offset's known multiple is
//! subtracted again at the end.
use super::{
  bigfield::{NonnativeField, field_from_biguint},
  driver::CircuitDriver,
  field_wire::FieldWire,
};
use crate::{
  errors::PipelineError,
  traits::{FieldOps, GroupOps},
};
use core::fmt;
use ff::PrimeField;
use halo2curves::{
  CurveAffine,
  bn256::{Fq, Fr, G1, G1Affine},
  group::Group,
};
use num_bigint::BigUint;
use once_cell::sync::Lazy;
use sha3::{Digest, Keccak256};
use std::{cell::RefCell, rc::Rc};

const NUM_SCALAR_BITS: usize = Fr::NUM_BITS as usize;

fn affine_coordinates(point: &G1Affine) -> Result<(Fq, Fq), PipelineError> {
  let coordinates = Option::<halo2curves::Coordinates<G1Affine>>::from(point.coordinates())
    .ok_or_else(|| PipelineError::SynthesisError {
      reason: "the point at infinity has no affine coordinates".to_string(),
    })?;
  Ok((*coordinates.x(), *coordinates.y()))
}

/// A fixed point with no special structure relative to pipeline inputs, and
/// the negated end-of-ladder multiple `-(2^254 * O)`. It only has to dodge
/// the identity, so a hashed-tag scalar against the generator is enough.
static OFFSET_GENERATOR: Lazy<(G1Affine, G1Affine)> = Lazy::new(|| {
  let mut hasher = Keccak256::new();
  hasher.update(b"emulated msm offset generator");
  let tag = BigUint::from_bytes_le(&hasher.finalize());
  let offset = G1::generator() * field_from_biguint::<Fr>(&tag);
  let shift: Fr = field_from_biguint(&(BigUint::from(1u8) << NUM_SCALAR_BITS));
  (G1Affine::from(offset), G1Affine::from(-(offset * shift)))
});

/// An emulated curve point of the recursive context.
pub struct EmulatedPoint<D: CircuitDriver> {
  x: NonnativeField<D>,
  y: NonnativeField<D>,
}

impl<D: CircuitDriver> Clone for EmulatedPoint<D> {
  fn clone(&self) -> Self {
    Self {
      x: self.x.clone(),
      y: self.y.clone(),
    }
  }
}

impl<D: CircuitDriver> fmt::Debug for EmulatedPoint<D> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "EmulatedPoint({:?}, {:?})", self.x.value(), self.y.value())
  }
}

impl<D: CircuitDriver> EmulatedPoint<D> {
  /// Witnesses the affine coordinates of a point. The identity has no affine
  /// coordinates and is rejected.
  pub fn from_affine(driver: &Rc<RefCell<D>>, point: &G1Affine) -> Result<Self, PipelineError> {
    let (x, y) = affine_coordinates(point)?;
    Ok(Self {
      x: NonnativeField::from_witness(driver, x),
      y: NonnativeField::from_witness(driver, y),
    })
  }

  /// Lifts a known point as constants. Emits no gates.
  pub fn constant(point: &G1Affine) -> Result<Self, PipelineError> {
    let (x, y) = affine_coordinates(point)?;
    Ok(Self {
      x: NonnativeField::from_constant(x),
      y: NonnativeField::from_constant(y),
    })
  }

  /// Reads the held coordinate values back as a native point.
  pub fn to_affine(&self) -> Result<G1Affine, PipelineError> {
    Option::from(G1Affine::from_xy(self.x.value(), self.y.value())).ok_or_else(|| {
      PipelineError::SynthesisError {
        reason: "held coordinates are not on the curve".to_string(),
      }
    })
  }

  fn driver(&self) -> Option<Rc<RefCell<D>>> {
    self.x.driver().or_else(|| self.y.driver())
  }

  #[allow(dead_code)]
  fn is_constant(&self) -> bool {
    self.x.is_constant() && self.y.is_constant()
  }

  /// Incomplete affine addition. Excluded: either operand the identity, or
  /// operands sharing an x coordinate.
  fn add_incomplete(&self, other: &Self) -> Result<Self, PipelineError> {
    let lambda = other.y.sub(&self.y)?.div(&other.x.sub(&self.x)?)?;
    let x3 = lambda.sqr()?.sub(&self.x)?.sub(&other.x)?.self_reduce()?;
    let y3 = lambda.mul(&self.x.sub(&x3)?)?.sub(&self.y)?.self_reduce()?;
    Ok(Self { x: x3, y: y3 })
  }

  /// Incomplete affine doubling. Excluded: the identity (BN254 G1 has no
  /// two-torsion, so y is never zero on valid points).
  fn double_incomplete(&self) -> Result<Self, PipelineError> {
    let three = NonnativeField::from_constant(Fq::from(3));
    let lambda = self.x.sqr()?.mul(&three)?.div(&self.y.add(&self.y)?)?;
    let x3 = lambda.sqr()?.sub(&self.x)?.sub(&self.x)?.self_reduce()?;
    let y3 = lambda.mul(&self.x.sub(&x3)?)?.sub(&self.y)?.self_reduce()?;
    Ok(Self { x: x3, y: y3 })
  }

  fn select(bit: &FieldWire<D>, if_one: &Self, if_zero: &Self) -> Self {
    Self {
      x: NonnativeField::conditional_select(bit, &if_one.x, &if_zero.x),
      y: NonnativeField::conditional_select(bit, &if_one.y, &if_zero.y),
    }
  }

  /// Decomposes a scalar wire into boolean wires, least significant first,
  /// and constrains the recomposition back onto the scalar.
  fn scalar_bits(driver: &Rc<RefCell<D>>, scalar: &FieldWire<D>) -> Vec<FieldWire<D>> {
    let repr = scalar.value().to_repr();
    let bytes = repr.as_ref();
    let bits: Vec<FieldWire<D>> = (0..NUM_SCALAR_BITS)
      .map(|j| {
        let set = u64::from((bytes[j / 8] >> (j % 8)) & 1);
        let bit = FieldWire::witness(driver, Fr::from(set));
        bit.constrain_bits(1);
        bit
      })
      .collect();

    let two = FieldWire::from_native(Fr::from(2));
    let recomposed = bits
      .iter()
      .rev()
      .fold(FieldWire::zero(), |acc, bit| acc * two.clone() + bit.clone());
    recomposed.enforce_equal(scalar, "msm_scalar_bits");
    bits
  }
}

impl<D: CircuitDriver> GroupOps<FieldWire<D>> for EmulatedPoint<D> {
  fn generator() -> Self {
    // the BN254 generator (1, 2)
    Self {
      x: NonnativeField::from_constant(Fq::from(1)),
      y: NonnativeField::from_constant(Fq::from(2)),
    }
  }

  fn negate(&self) -> Self {
    Self {
      x: self.x.clone(),
      y: self.y.negated(),
    }
  }

  fn add(&self, other: &Self) -> Result<Self, PipelineError> {
    if self.x.value() == other.x.value() {
      if self.y.value() == other.y.value() {
        return self.double_incomplete();
      }
      return Err(PipelineError::SynthesisError {
        reason: "incomplete addition of inverse points".to_string(),
      });
    }
    self.add_incomplete(other)
  }

  fn mul(&self, scalar: &FieldWire<D>) -> Result<Self, PipelineError> {
    Self::batch_mul(&[self.clone()], &[scalar.clone()])
  }

  fn batch_mul(points: &[Self], scalars: &[FieldWire<D>]) -> Result<Self, PipelineError> {
    if points.len() != scalars.len() || points.is_empty() {
      return Err(PipelineError::InvalidInputLength);
    }
    let driver = points
      .iter()
      .find_map(Self::driver)
      .or_else(|| scalars.iter().find_map(FieldWire::driver_handle));
    let driver = match driver {
      Some(d) => d,
      None => {
        // Constant inputs fold natively.
        let mut sum = G1::identity();
        for (point, scalar) in points.iter().zip(scalars.iter()) {
          sum += G1::from(point.to_affine()?) * scalar.value();
        }
        return Self::constant(&G1Affine::from(sum));
      }
    };

    let bits: Vec<Vec<FieldWire<D>>> =
      scalars.iter().map(|s| Self::scalar_bits(&driver, s)).collect();

    // Shared-doubling ladder: one doubling per bit position, then one
    // candidate addition and select per point. The gate shape depends only
    // on the number of points, never on the scalar values.
    let mut accumulator = Self::constant(&OFFSET_GENERATOR.0)?;
    for round in (0..NUM_SCALAR_BITS).rev() {
      accumulator = accumulator.double_incomplete()?;
      for (point, point_bits) in points.iter().zip(bits.iter()) {
        let candidate = accumulator.add_incomplete(point)?;
        accumulator = Self::select(&point_bits[round], &candidate, &accumulator);
      }
    }
    accumulator.add_incomplete(&Self::constant(&OFFSET_GENERATOR.1)?)
  }
}
