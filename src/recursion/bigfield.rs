//! Nonnative field arithmetic: base-field (`Fq`) values emulated with scalar
//! (`Fr`) wires.
//!
//! A value is four 68-bit limbs plus a prime-basis limb (the value reduced
//! into the native field), kept in lockstep. Every limb carries a tracked
//! maximum. Addition and subtraction combine limbs without reducing, so
//! maxima grow. Multiplication constrains a quotient-remainder decomposition
//! `a*b = q*p + r` in two bases at once: modulo `2^272` through a carry chain
//! over limb products (using the negated modulus, so no full-width arithmetic
//! appears), and modulo the native field through the prime-basis limbs. The
//! CRT combination of the two congruences pins the integer identity exactly,
//! provided operand maxima stay below the combined modulus.
//!
//! Reduction is never implicit. When tracked maxima exceed the soundness
//! bounds an operation refuses with `UnreducedOverflow` and the caller must
//! interleave `self_reduce`.
use super::{driver::CircuitDriver, field_wire::FieldWire};
use crate::{errors::PipelineError, traits::FieldOps};
use core::{array, fmt};
use ff::{Field, PrimeField};
use halo2curves::bn256::{Fq, Fr};
use num_bigint::{BigInt, BigUint, Sign};
use num_integer::Integer;
use num_traits::{One, Zero};
use once_cell::sync::Lazy;
use std::{cell::RefCell, rc::Rc};

const NUM_LIMBS: usize = 4;
const NUM_LIMB_BITS: usize = 68;
// 254 - 3 * 68: the top limb of a canonical value.
const NUM_LAST_LIMB_BITS: usize = 50;
// Headroom reserved for limb-wise additions between reductions.
const MAX_ADDITION_LOG: usize = 10;

static LIMB_MASK: Lazy<BigUint> = Lazy::new(|| (BigUint::one() << NUM_LIMB_BITS) - 1u32);

/// The emulated modulus p (the BN254 base field).
static TARGET_MODULUS: Lazy<BigUint> = Lazy::new(|| biguint_from_field(&-Fq::ONE) + 1u32);

/// The native modulus r (the BN254 scalar field).
static NATIVE_MODULUS: Lazy<BigUint> = Lazy::new(|| biguint_from_field(&-Fr::ONE) + 1u32);

/// The binary basis 2^272 the limb carry chain works under.
static BINARY_MODULUS: Lazy<BigUint> = Lazy::new(|| BigUint::one() << (NUM_LIMB_BITS * NUM_LIMBS));

/// The combined modulus 2^272 * r. A quotient-remainder identity checked in
/// both bases holds over the integers when all terms stay below this.
static CRT_MODULUS: Lazy<BigUint> = Lazy::new(|| &*BINARY_MODULUS * &*NATIVE_MODULUS);

/// Limbs of -p mod 2^272, so the binary-basis identity only ever adds terms.
static NEG_MODULUS_LIMBS: Lazy<[BigUint; NUM_LIMBS]> =
  Lazy::new(|| split_limbs(&(&*BINARY_MODULUS - &*TARGET_MODULUS)));

static NEG_MODULUS_LIMBS_FR: Lazy<[Fr; NUM_LIMBS]> =
  Lazy::new(|| array::from_fn(|i| field_from_biguint(&NEG_MODULUS_LIMBS[i])));

/// p reduced into the native field, for the prime-basis identity.
static TARGET_MODULUS_FR: Lazy<Fr> = Lazy::new(|| field_from_biguint(&TARGET_MODULUS));

static LIMB_SHIFT_FR: Lazy<Fr> = Lazy::new(|| field_from_biguint(&(BigUint::one() << NUM_LIMB_BITS)));

/// Limb maxima of a freshly reduced (range-constrained) value.
static NOMINAL_MAXIMA: Lazy<[BigUint; NUM_LIMBS]> = Lazy::new(|| {
  array::from_fn(|i| {
    let bits = if i == NUM_LIMBS - 1 { NUM_LAST_LIMB_BITS } else { NUM_LIMB_BITS };
    (BigUint::one() << bits) - 1u32
  })
});

/// Largest tracked limb maximum an operand of a multiplication may carry:
/// limb products and their short sums must stay inside the native field.
static MAX_UNREDUCED_LIMB: Lazy<BigUint> =
  Lazy::new(|| BigUint::one() << (Fr::NUM_BITS as usize / 2 - MAX_ADDITION_LOG));

pub(crate) fn biguint_from_field<F: PrimeField>(v: &F) -> BigUint {
  BigUint::from_bytes_le(v.to_repr().as_ref())
}

pub(crate) fn field_from_biguint<F: PrimeField>(v: &BigUint) -> F {
  let shift = F::from_u128(1u128 << 64);
  v.to_u64_digits()
    .iter()
    .rev()
    .fold(F::ZERO, |acc, digit| acc * shift + F::from(*digit))
}

fn field_from_bigint(v: &BigInt) -> Fr {
  let magnitude: Fr = field_from_biguint(v.magnitude());
  match v.sign() {
    Sign::Minus => -magnitude,
    _ => magnitude,
  }
}

fn split_limbs(v: &BigUint) -> [BigUint; NUM_LIMBS] {
  array::from_fn(|i| {
    let shifted = v >> (i * NUM_LIMB_BITS);
    if i == NUM_LIMBS - 1 { shifted } else { shifted & &*LIMB_MASK }
  })
}

fn combine_limbs(limbs: &[BigUint; NUM_LIMBS]) -> BigUint {
  limbs
    .iter()
    .enumerate()
    .map(|(i, l)| l << (i * NUM_LIMB_BITS))
    .sum()
}

/// Splits a multiple of p into limbs dominating `floor` limb-wise, so a
/// subtraction padded by it can never go negative in any limb. The returned
/// total is `k*p` for the smallest workable `k`.
fn padding_for(floor: &[BigUint; NUM_LIMBS]) -> (BigUint, [BigUint; NUM_LIMBS]) {
  let chunk = BigUint::one() << NUM_LIMB_BITS;
  let floor_total = combine_limbs(floor);
  let k = (&floor_total + (BigUint::one() << 210u32)) / &*TARGET_MODULUS + 1u32;
  let total = &k * &*TARGET_MODULUS;

  let mut remaining = total.clone();
  let mut parts: [BigUint; NUM_LIMBS] = array::from_fn(|_| BigUint::zero());
  for i in 0..NUM_LIMBS - 1 {
    let floor_low = &floor[i] % &chunk;
    let remaining_low = &remaining % &chunk;
    let mut limb = &floor[i] - &floor_low + &remaining_low;
    if remaining_low < floor_low {
      limb += &chunk;
    }
    remaining = (remaining - &limb) >> NUM_LIMB_BITS;
    parts[i] = limb;
  }
  parts[NUM_LIMBS - 1] = remaining;
  (total, parts)
}

struct Limb<D: CircuitDriver> {
  wire: FieldWire<D>,
  maximum_value: BigUint,
}

impl<D: CircuitDriver> Clone for Limb<D> {
  fn clone(&self) -> Self {
    Self {
      wire: self.wire.clone(),
      maximum_value: self.maximum_value.clone(),
    }
  }
}

/// An emulated base-field element held in scalar wires.
pub struct NonnativeField<D: CircuitDriver> {
  limbs: [Limb<D>; NUM_LIMBS],
  prime_basis_limb: FieldWire<D>,
}

impl<D: CircuitDriver> Clone for NonnativeField<D> {
  fn clone(&self) -> Self {
    Self {
      limbs: self.limbs.clone(),
      prime_basis_limb: self.prime_basis_limb.clone(),
    }
  }
}

impl<D: CircuitDriver> fmt::Debug for NonnativeField<D> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "NonnativeField({:?}, max {} bits)", self.value(), self.max_value().bits())
  }
}

fn recompose<D: CircuitDriver>(wires: &[FieldWire<D>; NUM_LIMBS]) -> FieldWire<D> {
  let shift = FieldWire::from_native(*LIMB_SHIFT_FR);
  ((wires[3].clone() * shift.clone() + wires[2].clone()) * shift.clone() + wires[1].clone()) * shift
    + wires[0].clone()
}

impl<D: CircuitDriver> NonnativeField<D> {
  /// Lifts a known base-field constant. Emits no gates.
  pub fn from_constant(v: Fq) -> Self {
    let parts = split_limbs(&biguint_from_field(&v));
    let prime_basis_limb = FieldWire::from_native(field_from_biguint(&biguint_from_field(&v)));
    Self {
      limbs: array::from_fn(|i| Limb {
        wire: FieldWire::from_native(field_from_biguint(&parts[i])),
        maximum_value: parts[i].clone(),
      }),
      prime_basis_limb,
    }
  }

  /// Witnesses a base-field value, range-constraining each limb to its
  /// canonical width.
  pub fn from_witness(driver: &Rc<RefCell<D>>, v: Fq) -> Self {
    Self::witness_reduced(driver, &biguint_from_field(&v))
  }

  fn witness_reduced(driver: &Rc<RefCell<D>>, int: &BigUint) -> Self {
    let parts = split_limbs(int);
    let wires: [FieldWire<D>; NUM_LIMBS] = array::from_fn(|i| {
      let wire = FieldWire::witness(driver, field_from_biguint(&parts[i]));
      let bits = if i == NUM_LIMBS - 1 { NUM_LAST_LIMB_BITS } else { NUM_LIMB_BITS };
      wire.constrain_bits(bits);
      wire
    });
    let prime_basis_limb = recompose(&wires);
    Self {
      limbs: array::from_fn(|i| Limb {
        wire: wires[i].clone(),
        maximum_value: NOMINAL_MAXIMA[i].clone(),
      }),
      prime_basis_limb,
    }
  }

  /// Decodes a canonical 32-byte little-endian encoding.
  pub fn from_bytes(driver: &Rc<RefCell<D>>, bytes: &[u8; 32]) -> Result<Self, PipelineError> {
    let v = Option::<Fq>::from(Fq::from_repr((*bytes).into())).ok_or_else(|| {
      PipelineError::TranscriptDeserialization {
        reason: "noncanonical base field bytes".to_string(),
      }
    })?;
    Ok(Self::from_witness(driver, v))
  }

  /// The canonical 32-byte little-endian encoding of the held value.
  pub fn to_bytes(&self) -> [u8; 32] {
    self.value().to_repr().into()
  }

  /// Whether the element is built purely from constants.
  pub fn is_constant(&self) -> bool {
    self.limbs.iter().all(|l| l.wire.is_constant()) && self.prime_basis_limb.is_constant()
  }

  pub(crate) fn driver(&self) -> Option<Rc<RefCell<D>>> {
    self
      .limbs
      .iter()
      .find_map(|l| l.wire.driver_handle())
      .or_else(|| self.prime_basis_limb.driver_handle())
  }

  fn integer(&self) -> BigUint {
    let limbs = array::from_fn(|i| biguint_from_field(&self.limbs[i].wire.value()));
    combine_limbs(&limbs)
  }

  /// The held value, reduced to the emulated field.
  pub fn value(&self) -> Fq {
    field_from_biguint(&(self.integer() % &*TARGET_MODULUS))
  }

  /// The tracked upper bound on the held (unreduced) integer.
  pub fn max_value(&self) -> BigUint {
    let limbs = array::from_fn(|i| self.limbs[i].maximum_value.clone());
    combine_limbs(&limbs)
  }

  fn guard_limbs(&self, context: &str) -> Result<(), PipelineError> {
    for limb in &self.limbs {
      if limb.maximum_value > *MAX_UNREDUCED_LIMB {
        return Err(PipelineError::UnreducedOverflow {
          reason: format!(
            "{context}: limb maximum has {} bits, reduce before combining",
            limb.maximum_value.bits()
          ),
        });
      }
    }
    Ok(())
  }

  /// Limb-wise addition. Maxima add; no reduction happens.
  pub fn add(&self, other: &Self) -> Result<Self, PipelineError> {
    self.guard_limbs("add")?;
    other.guard_limbs("add")?;
    Ok(Self {
      limbs: array::from_fn(|i| Limb {
        wire: self.limbs[i].wire.clone() + other.limbs[i].wire.clone(),
        maximum_value: &self.limbs[i].maximum_value + &other.limbs[i].maximum_value,
      }),
      prime_basis_limb: self.prime_basis_limb.clone() + other.prime_basis_limb.clone(),
    })
  }

  /// Limb-wise subtraction, padded by a constant multiple of p whose limbs
  /// dominate the subtrahend's maxima so no limb value can go negative.
  pub fn sub(&self, other: &Self) -> Result<Self, PipelineError> {
    self.guard_limbs("sub")?;
    other.guard_limbs("sub")?;
    let floor = array::from_fn(|i| other.limbs[i].maximum_value.clone());
    let (pad_total, pad) = padding_for(&floor);
    Ok(Self {
      limbs: array::from_fn(|i| Limb {
        wire: self.limbs[i].wire.clone() + FieldWire::from_native(field_from_biguint(&pad[i]))
          - other.limbs[i].wire.clone(),
        maximum_value: &self.limbs[i].maximum_value + &pad[i],
      }),
      prime_basis_limb: self.prime_basis_limb.clone()
        + FieldWire::from_native(field_from_biguint(&(&pad_total % &*NATIVE_MODULUS)))
        - other.prime_basis_limb.clone(),
    })
  }

  /// The additive inverse, as a padding constant minus the element.
  pub fn negated(&self) -> Self {
    let floor = array::from_fn(|i| self.limbs[i].maximum_value.clone());
    let (pad_total, pad) = padding_for(&floor);
    Self {
      limbs: array::from_fn(|i| Limb {
        wire: FieldWire::from_native(field_from_biguint(&pad[i])) - self.limbs[i].wire.clone(),
        maximum_value: pad[i].clone(),
      }),
      prime_basis_limb: FieldWire::from_native(field_from_biguint(&(&pad_total % &*NATIVE_MODULUS)))
        - self.prime_basis_limb.clone(),
    }
  }

  /// Constrained multiplication. The remainder comes back freshly reduced.
  pub fn mul(&self, other: &Self) -> Result<Self, PipelineError> {
    if self.is_constant() && other.is_constant() {
      return Ok(Self::from_constant(self.value() * other.value()));
    }
    let driver = self.driver().or_else(|| other.driver()).ok_or(PipelineError::InternalError)?;
    let product = (self.integer() * other.integer()) % &*TARGET_MODULUS;
    let remainder = Self::witness_reduced(&driver, &product);
    self.enforce_quotient_remainder(Some(other), &remainder, false, "nnf_mul")?;
    Ok(remainder)
  }

  /// Constrained squaring.
  pub fn sqr(&self) -> Result<Self, PipelineError> {
    self.mul(self)
  }

  /// Division without a nonzero check: witnesses `w = a/b` off-circuit and
  /// constrains `w*b == a`. The caller owes a divisor known nonzero; a zero
  /// divisor fails witness generation with `DivisionByZero`.
  pub fn div(&self, other: &Self) -> Result<Self, PipelineError> {
    let inverse = Option::<Fq>::from(Field::invert(&other.value())).ok_or(PipelineError::DivisionByZero)?;
    let quotient_value = self.value() * inverse;
    if self.is_constant() && other.is_constant() {
      return Ok(Self::from_constant(quotient_value));
    }
    let driver = self.driver().or_else(|| other.driver()).ok_or(PipelineError::InternalError)?;
    let quotient = Self::witness_reduced(&driver, &biguint_from_field(&quotient_value));
    quotient.enforce_quotient_remainder(Some(other), self, true, "nnf_div")?;
    Ok(quotient)
  }

  /// Division with an explicit nonzero-divisor constraint `b * b⁻¹ == 1`.
  pub fn div_check(&self, other: &Self) -> Result<Self, PipelineError> {
    let inverse = Option::<Fq>::from(Field::invert(&other.value())).ok_or(PipelineError::DivisionByZero)?;
    if !other.is_constant() {
      let driver = other.driver().ok_or(PipelineError::InternalError)?;
      let inverse = Self::witness_reduced(&driver, &biguint_from_field(&inverse));
      other.enforce_quotient_remainder(Some(&inverse), &Self::from_constant(Fq::ONE), false, "nnf_nonzero")?;
    }
    self.div(other)
  }

  /// Reduces back to canonical limb widths, resetting tracked maxima.
  pub fn self_reduce(&self) -> Result<Self, PipelineError> {
    if self.is_constant() {
      return Ok(Self::from_constant(self.value()));
    }
    let driver = self.driver().ok_or(PipelineError::InternalError)?;
    let reduced = Self::witness_reduced(&driver, &(self.integer() % &*TARGET_MODULUS));
    self.enforce_quotient_remainder(None, &reduced, false, "nnf_reduce")?;
    Ok(reduced)
  }

  /// Records an equality-mod-p constraint between canonical reductions of the
  /// two operands, and reports whether it holds on the held values.
  pub fn assert_equal(&self, other: &Self, label: &str) -> Result<bool, PipelineError> {
    if self.is_constant() && other.is_constant() {
      return Ok(self.value() == other.value());
    }
    let left = self.self_reduce()?;
    let right = other.self_reduce()?;
    left.enforce_quotient_remainder(None, &right, true, label)
  }

  /// Reduces and constrains the result below the emulated modulus.
  pub fn assert_is_in_field(&self) -> Result<Self, PipelineError> {
    let reduced = self.self_reduce()?;
    reduced.assert_less_than(&TARGET_MODULUS)?;
    Ok(reduced)
  }

  /// Constrains `self < bound` through a limb-wise borrow chain. Requires a
  /// reduced operand; a violated bound leaves the circuit unsatisfiable.
  pub fn assert_less_than(&self, bound: &BigUint) -> Result<(), PipelineError> {
    if bound.is_zero() || bound.bits() as usize > NUM_LIMBS * NUM_LIMB_BITS {
      return Err(PipelineError::InvalidInputLength);
    }
    let chunk = BigUint::one() << NUM_LIMB_BITS;
    for limb in &self.limbs {
      if limb.maximum_value >= chunk {
        return Err(PipelineError::UnreducedOverflow {
          reason: "comparison requires a reduced operand".to_string(),
        });
      }
    }
    let edge = split_limbs(&(bound - 1u32));
    if self.is_constant() {
      if self.integer() < *bound {
        return Ok(());
      }
      return Err(PipelineError::SynthesisError {
        reason: "constant exceeds its asserted bound".to_string(),
      });
    }
    let driver = self.driver().ok_or(PipelineError::InternalError)?;
    let shift = FieldWire::from_native(*LIMB_SHIFT_FR);

    // Ripple subtraction bound-1 minus self: every limb difference must fit
    // its limb width and the top limb must close without a borrow.
    let mut borrow_in: Option<FieldWire<D>> = None;
    let mut borrow_in_value = BigUint::zero();
    for i in 0..NUM_LIMBS {
      let value = biguint_from_field(&self.limbs[i].wire.value()) + &borrow_in_value;
      let mut difference =
        FieldWire::from_native(field_from_biguint(&edge[i])) - self.limbs[i].wire.clone();
      if let Some(b) = borrow_in.take() {
        difference = difference - b;
      }
      if i < NUM_LIMBS - 1 {
        let borrows = value > edge[i];
        let borrow = FieldWire::witness(&driver, if borrows { Fr::ONE } else { Fr::ZERO });
        borrow.constrain_bits(1);
        difference = difference + borrow.clone() * shift.clone();
        borrow_in = Some(borrow);
        borrow_in_value = if borrows { BigUint::one() } else { BigUint::zero() };
      }
      difference.constrain_bits(NUM_LIMB_BITS);
    }
    Ok(())
  }

  /// Ternary select on a boolean wire, limb by limb. The caller owes a
  /// boolean-constrained `bit`.
  pub(crate) fn conditional_select(bit: &FieldWire<D>, if_one: &Self, if_zero: &Self) -> Self {
    let pick = |one: &FieldWire<D>, zero: &FieldWire<D>| {
      zero.clone() + bit.clone() * (one.clone() - zero.clone())
    };
    Self {
      limbs: array::from_fn(|i| Limb {
        wire: pick(&if_one.limbs[i].wire, &if_zero.limbs[i].wire),
        maximum_value: if_one.limbs[i]
          .maximum_value
          .clone()
          .max(if_zero.limbs[i].maximum_value.clone()),
      }),
      prime_basis_limb: pick(&if_one.prime_basis_limb, &if_zero.prime_basis_limb),
    }
  }

  /// Constrains `self * right + pad = q*p + remainder` in the binary and
  /// prime bases (`right = None` treats the left factor as multiplied by
  /// one). `pad` is an internal constant multiple of p dominating the
  /// remainder's maxima, used when the remainder was not derived from the
  /// product. Returns whether the identity holds on the held values.
  fn enforce_quotient_remainder(
    &self,
    right: Option<&Self>,
    remainder: &Self,
    pad: bool,
    label: &str,
  ) -> Result<bool, PipelineError> {
    let driver = self
      .driver()
      .or_else(|| right.and_then(|r| r.driver()))
      .or_else(|| remainder.driver());
    let left_max = self.max_value();
    let right_max = right.map_or_else(BigUint::one, |r| r.max_value());
    if let Some(r) = right {
      self.guard_limbs(label)?;
      r.guard_limbs(label)?;
    }

    let (pad_total, pad_limbs) = if pad {
      let floor = array::from_fn(|i| remainder.limbs[i].maximum_value.clone());
      padding_for(&floor)
    } else {
      (BigUint::zero(), array::from_fn(|_| BigUint::zero()))
    };

    let total_max = &left_max * &right_max + &pad_total;
    if &total_max + remainder.max_value() >= *CRT_MODULUS {
      return Err(PipelineError::UnreducedOverflow {
        reason: format!("{label}: operand maxima exceed the crt modulus"),
      });
    }

    // Quotient witness against the emulated modulus.
    let left_int = self.integer();
    let right_int = right.map_or_else(BigUint::one, Self::integer);
    let total = &left_int * &right_int + &pad_total - remainder.integer();
    let (quotient_int, residue) = total.div_rem(&TARGET_MODULUS);
    let mut holds = residue.is_zero();

    let quotient_max = &total_max / &*TARGET_MODULUS;
    let quotient_bits = quotient_max.bits() as usize;
    let quotient_parts = split_limbs(&quotient_int);
    let quotient: [FieldWire<D>; NUM_LIMBS] = array::from_fn(|i| match &driver {
      Some(d) => {
        let wire = FieldWire::witness(d, field_from_biguint(&quotient_parts[i]));
        wire.constrain_bits(NUM_LIMB_BITS.min(quotient_bits.saturating_sub(i * NUM_LIMB_BITS)));
        wire
      }
      None => FieldWire::from_native(field_from_biguint(&quotient_parts[i])),
    });
    let quotient_limb_max: [BigUint; NUM_LIMBS] = array::from_fn(|i| {
      let bits = NUM_LIMB_BITS.min(quotient_bits.saturating_sub(i * NUM_LIMB_BITS));
      (BigUint::one() << bits) - 1u32
    });

    // Binary basis: accumulate limb products of a*b + q*(-p) + pad - r at
    // each 68-bit boundary and constrain the running value to flow into a
    // nonnegative, range-bounded carry.
    let zero = FieldWire::zero();
    let mut carry: Option<(FieldWire<D>, BigInt, BigUint)> = None;
    for i in 0..NUM_LIMBS {
      let mut expr = FieldWire::from_native(field_from_biguint(&pad_limbs[i]));
      let mut expr_value = BigInt::from(pad_limbs[i].clone());
      let mut expr_max = pad_limbs[i].clone();
      for j in 0..=i {
        let k = i - j;
        match right {
          Some(r) => {
            expr = expr + self.limbs[j].wire.clone() * r.limbs[k].wire.clone();
            expr_value += BigInt::from(
              biguint_from_field(&self.limbs[j].wire.value())
                * biguint_from_field(&r.limbs[k].wire.value()),
            );
            expr_max += &self.limbs[j].maximum_value * &r.limbs[k].maximum_value;
          }
          None => {
            if k == 0 {
              expr = expr + self.limbs[j].wire.clone();
              expr_value += BigInt::from(biguint_from_field(&self.limbs[j].wire.value()));
              expr_max += &self.limbs[j].maximum_value;
            }
          }
        }
        expr = expr + quotient[j].clone() * FieldWire::from_native(NEG_MODULUS_LIMBS_FR[k]);
        expr_value +=
          BigInt::from(biguint_from_field(&quotient[j].value()) * &NEG_MODULUS_LIMBS[k]);
        expr_max += &quotient_limb_max[j] * &NEG_MODULUS_LIMBS[k];
      }
      expr = expr - remainder.limbs[i].wire.clone();
      expr_value -= BigInt::from(biguint_from_field(&remainder.limbs[i].wire.value()));
      if let Some((carry_wire, carry_value, carry_max)) = carry {
        expr = expr + carry_wire;
        expr_value += carry_value;
        expr_max += carry_max;
      }

      let window = (&expr_max << 1u32) + &remainder.limbs[i].maximum_value;
      if window >= *NATIVE_MODULUS {
        return Err(PipelineError::UnreducedOverflow {
          reason: format!("{label}: carry chain exceeds the native field"),
        });
      }

      let carry_value = &expr_value >> NUM_LIMB_BITS;
      let carry_max = &expr_max >> NUM_LIMB_BITS;
      let carry_wire = match &driver {
        Some(d) => {
          let wire = FieldWire::witness(d, field_from_bigint(&carry_value));
          wire.constrain_bits(expr_max.bits().saturating_sub(NUM_LIMB_BITS as u64) as usize);
          wire
        }
        None => FieldWire::from_native(field_from_bigint(&carry_value)),
      };
      let boundary = expr - carry_wire.clone() * FieldWire::from_native(*LIMB_SHIFT_FR);
      holds &= boundary.enforce_equal(&zero, &format!("{label}_carry_{i}"));
      carry = Some((carry_wire, carry_value, carry_max));
    }

    // Prime basis: the same identity modulo the native field.
    let right_prime = right.map_or_else(FieldWire::one, |r| r.prime_basis_limb.clone());
    let prime = self.prime_basis_limb.clone() * right_prime
      + FieldWire::from_native(field_from_biguint(&(&pad_total % &*NATIVE_MODULUS)))
      - recompose(&quotient) * FieldWire::from_native(*TARGET_MODULUS_FR)
      - remainder.prime_basis_limb.clone();
    holds &= prime.enforce_equal(&zero, &format!("{label}_prime"));
    Ok(holds)
  }
}

#[cfg(test)]
mod tests {
  use super::super::driver::CircuitSimulator;
  use super::*;
  use rand::{SeedableRng, rngs::StdRng};

  fn sim() -> Rc<RefCell<CircuitSimulator>> {
    Rc::new(RefCell::new(CircuitSimulator::new()))
  }

  #[test]
  fn test_arithmetic_matches_reference() {
    let mut rng = StdRng::seed_from_u64(40);
    let driver = sim();
    for _ in 0..8 {
      let a_v = Fq::random(&mut rng);
      let b_v = Fq::random(&mut rng);
      let a = NonnativeField::from_witness(&driver, a_v);
      let b = NonnativeField::from_witness(&driver, b_v);

      assert_eq!(a.add(&b).unwrap().value(), a_v + b_v);
      assert_eq!(a.sub(&b).unwrap().value(), a_v - b_v);
      assert_eq!(a.mul(&b).unwrap().value(), a_v * b_v);
      assert_eq!(a.sqr().unwrap().value(), a_v * a_v);
      assert_eq!(a.negated().value(), -a_v);
      assert_eq!(a.div(&b).unwrap().value(), a_v * b_v.invert().unwrap());
    }
    assert!(driver.borrow().is_satisfied());
  }

  #[test]
  fn test_add_sub_and_mul_div_invert() {
    let mut rng = StdRng::seed_from_u64(41);
    let driver = sim();
    let a_v = Fq::random(&mut rng);
    let b_v = Fq::random(&mut rng);
    let a = NonnativeField::from_witness(&driver, a_v);
    let b = NonnativeField::from_witness(&driver, b_v);

    let round_trip = a.add(&b).unwrap().sub(&b).unwrap();
    assert!(round_trip.assert_equal(&a, "add_sub_round_trip").unwrap());

    let product_quotient = a.mul(&b).unwrap().div(&b).unwrap();
    assert!(product_quotient.assert_equal(&a, "mul_div_round_trip").unwrap());
    assert!(driver.borrow().is_satisfied());
  }

  #[test]
  fn test_constant_and_witness_mix() {
    let driver = sim();
    let a = NonnativeField::from_witness(&driver, Fq::from(10));
    let k = NonnativeField::<CircuitSimulator>::from_constant(Fq::from(3));
    assert_eq!(a.mul(&k).unwrap().value(), Fq::from(30));
    assert_eq!(k.mul(&k).unwrap().value(), Fq::from(9));
    assert!(k.mul(&k).unwrap().is_constant());
    assert!(driver.borrow().is_satisfied());
  }

  #[test]
  fn test_byte_round_trip() {
    let mut rng = StdRng::seed_from_u64(42);
    let driver = sim();
    let v = Fq::random(&mut rng);
    let a = NonnativeField::from_witness(&driver, v);
    let back = NonnativeField::from_bytes(&driver, &a.to_bytes()).unwrap();
    assert_eq!(back.value(), v);
  }

  #[test]
  fn test_unreduced_growth_is_rejected_and_recoverable() {
    let driver = sim();
    let mut x = NonnativeField::from_witness(&driver, Fq::from(3));
    let mut expected = Fq::from(3);
    let mut rejected = false;
    for _ in 0..60 {
      match x.add(&x) {
        Ok(doubled) => {
          x = doubled;
          expected += expected;
        }
        Err(PipelineError::UnreducedOverflow { .. }) => {
          rejected = true;
          break;
        }
        Err(e) => panic!("unexpected error {e:?}"),
      }
    }
    assert!(rejected);

    let reduced = x.self_reduce().unwrap();
    assert_eq!(reduced.value(), expected);
    assert!(reduced.add(&reduced).is_ok());
    assert!(driver.borrow().is_satisfied());
  }

  #[test]
  fn test_multiplication_requires_interleaved_reduction() {
    let driver = sim();
    let mut x = NonnativeField::from_witness(&driver, Fq::from(5));
    let mut expected = Fq::from(5);
    for _ in 0..35 {
      x = x.add(&x).unwrap();
      expected += expected;
    }
    assert!(matches!(x.mul(&x), Err(PipelineError::UnreducedOverflow { .. })));

    let reduced = x.self_reduce().unwrap();
    assert_eq!(reduced.mul(&reduced).unwrap().value(), expected * expected);
    assert!(driver.borrow().is_satisfied());
  }

  #[test]
  fn test_div_check_rejects_zero_divisor() {
    let driver = sim();
    let a = NonnativeField::from_witness(&driver, Fq::from(7));
    let zero = NonnativeField::from_witness(&driver, Fq::ZERO);
    assert!(matches!(a.div_check(&zero), Err(PipelineError::DivisionByZero)));
  }

  #[test]
  fn test_assert_equal_detects_mismatch() {
    let driver = sim();
    let a = NonnativeField::from_witness(&driver, Fq::from(11));
    let b = NonnativeField::from_witness(&driver, Fq::from(12));
    assert!(!a.assert_equal(&b, "different").unwrap());
    assert!(!driver.borrow().is_satisfied());
  }

  #[test]
  fn test_assert_less_than() {
    let driver = sim();
    let small = NonnativeField::from_witness(&driver, Fq::from(3));
    small.assert_less_than(&BigUint::from(5u32)).unwrap();
    assert!(driver.borrow().is_satisfied());

    let big = NonnativeField::from_witness(&driver, Fq::from(7));
    big.assert_less_than(&BigUint::from(5u32)).unwrap();
    assert!(!driver.borrow().is_satisfied());
  }

  #[test]
  fn test_assert_is_in_field() {
    let driver = sim();
    let mut x = NonnativeField::from_witness(&driver, Fq::from(9));
    let mut expected = Fq::from(9);
    for _ in 0..5 {
      x = x.add(&x).unwrap();
      expected += expected;
    }
    let canonical = x.assert_is_in_field().unwrap();
    assert_eq!(canonical.value(), expected);
    assert!(driver.borrow().is_satisfied());
  }

  #[test]
  fn test_conditional_select() {
    let driver = sim();
    let one_bit = FieldWire::witness(&driver, Fr::ONE);
    let zero_bit = FieldWire::witness(&driver, Fr::ZERO);
    let a = NonnativeField::from_witness(&driver, Fq::from(21));
    let b = NonnativeField::from_witness(&driver, Fq::from(34));
    assert_eq!(NonnativeField::conditional_select(&one_bit, &a, &b).value(), Fq::from(21));
    assert_eq!(NonnativeField::conditional_select(&zero_bit, &a, &b).value(), Fq::from(34));
    assert!(driver.borrow().is_satisfied());
  }
}
