//! Scalar wires: the recursive context's `FieldOps` type.
//!
//! A wire is either a circuit variable (driver handle plus index) or a
//! constant. Arithmetic between wires emits poly gates through the driver;
//! constants fold for free and only materialize into variables when a
//! constraint needs an index. Every operation also tracks the concrete value,
//! so generic pipeline code can read witnesses back out.
use super::driver::CircuitDriver;
use crate::{errors::PipelineError, traits::FieldOps};
use core::{
  fmt,
  ops::{Add, Mul, Neg, Sub},
};
use ff::Field;
use halo2curves::bn256::Fr;
use std::{cell::RefCell, rc::Rc};

/// A scalar value of the recursive context.
pub struct FieldWire<D: CircuitDriver> {
  driver: Option<Rc<RefCell<D>>>,
  index: usize,
  value: Fr,
}

impl<D: CircuitDriver> Clone for FieldWire<D> {
  fn clone(&self) -> Self {
    Self {
      driver: self.driver.clone(),
      index: self.index,
      value: self.value,
    }
  }
}

impl<D: CircuitDriver> fmt::Debug for FieldWire<D> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    if self.driver.is_some() {
      write!(f, "FieldWire(w{} = {:?})", self.index, self.value)
    } else {
      write!(f, "FieldWire(const {:?})", self.value)
    }
  }
}

impl<D: CircuitDriver> FieldWire<D> {
  /// Allocates a circuit variable holding `value`.
  pub fn witness(driver: &Rc<RefCell<D>>, value: Fr) -> Self {
    let index = driver.borrow_mut().add_variable(value);
    Self {
      driver: Some(driver.clone()),
      index,
      value,
    }
  }

  fn constant(value: Fr) -> Self {
    Self {
      driver: None,
      index: 0,
      value,
    }
  }

  /// Whether this wire is a constant rather than a circuit variable.
  pub fn is_constant(&self) -> bool {
    self.driver.is_none()
  }

  pub(crate) fn driver_handle(&self) -> Option<Rc<RefCell<D>>> {
    self.driver.clone()
  }

  #[allow(dead_code)]
  pub(crate) fn index(&self) -> usize {
    self.index
  }

  /// Emits `q_m·ab + q_l·a + q_r·b + q_c = out` and returns the output wire.
  fn emit(
    driver: &Rc<RefCell<D>>,
    a: usize,
    b: usize,
    value: Fr,
    q_m: Fr,
    q_l: Fr,
    q_r: Fr,
    q_c: Fr,
  ) -> Self {
    let c = driver.borrow_mut().add_variable(value);
    driver.borrow_mut().create_poly_gate(a, b, c, q_m, q_l, q_r, -Fr::ONE, q_c);
    Self {
      driver: Some(driver.clone()),
      index: c,
      value,
    }
  }

  /// Turns a constant into a pinned variable so constraints can reference it.
  fn materialize(&self, driver: &Rc<RefCell<D>>) -> usize {
    match &self.driver {
      Some(_) => self.index,
      None => {
        let idx = driver.borrow_mut().add_variable(self.value);
        driver.borrow_mut().create_poly_gate(
          idx,
          idx,
          idx,
          Fr::ZERO,
          Fr::ONE,
          Fr::ZERO,
          Fr::ZERO,
          -self.value,
        );
        idx
      }
    }
  }

  /// Constrains this wire to `num_bits` bits. Constants are checked by value.
  pub(crate) fn constrain_bits(&self, num_bits: usize) {
    if let Some(driver) = &self.driver {
      driver.borrow_mut().create_range_constraint(self.index, num_bits);
    }
  }
}

impl<D: CircuitDriver> Add for FieldWire<D> {
  type Output = Self;

  fn add(self, rhs: Self) -> Self {
    let value = self.value + rhs.value;
    match (&self.driver, &rhs.driver) {
      (None, None) => Self::constant(value),
      (Some(d), None) => {
        Self::emit(d, self.index, self.index, value, Fr::ZERO, Fr::ONE, Fr::ZERO, rhs.value)
      }
      (None, Some(d)) => {
        Self::emit(d, rhs.index, rhs.index, value, Fr::ZERO, Fr::ONE, Fr::ZERO, self.value)
      }
      (Some(d), Some(_)) => {
        Self::emit(d, self.index, rhs.index, value, Fr::ZERO, Fr::ONE, Fr::ONE, Fr::ZERO)
      }
    }
  }
}

impl<D: CircuitDriver> Sub for FieldWire<D> {
  type Output = Self;

  fn sub(self, rhs: Self) -> Self {
    let value = self.value - rhs.value;
    match (&self.driver, &rhs.driver) {
      (None, None) => Self::constant(value),
      (Some(d), None) => {
        Self::emit(d, self.index, self.index, value, Fr::ZERO, Fr::ONE, Fr::ZERO, -rhs.value)
      }
      (None, Some(d)) => {
        Self::emit(d, rhs.index, rhs.index, value, Fr::ZERO, Fr::ZERO, -Fr::ONE, self.value)
      }
      (Some(d), Some(_)) => {
        Self::emit(d, self.index, rhs.index, value, Fr::ZERO, Fr::ONE, -Fr::ONE, Fr::ZERO)
      }
    }
  }
}

impl<D: CircuitDriver> Mul for FieldWire<D> {
  type Output = Self;

  fn mul(self, rhs: Self) -> Self {
    let value = self.value * rhs.value;
    match (&self.driver, &rhs.driver) {
      (None, None) => Self::constant(value),
      (Some(d), None) => {
        Self::emit(d, self.index, self.index, value, Fr::ZERO, rhs.value, Fr::ZERO, Fr::ZERO)
      }
      (None, Some(d)) => {
        Self::emit(d, rhs.index, rhs.index, value, Fr::ZERO, self.value, Fr::ZERO, Fr::ZERO)
      }
      (Some(d), Some(_)) => {
        Self::emit(d, self.index, rhs.index, value, Fr::ONE, Fr::ZERO, Fr::ZERO, Fr::ZERO)
      }
    }
  }
}

impl<D: CircuitDriver> Neg for FieldWire<D> {
  type Output = Self;

  fn neg(self) -> Self {
    match &self.driver {
      None => Self::constant(-self.value),
      Some(d) => Self::emit(
        d,
        self.index,
        self.index,
        -self.value,
        Fr::ZERO,
        -Fr::ONE,
        Fr::ZERO,
        Fr::ZERO,
      ),
    }
  }
}

impl<D: CircuitDriver> FieldOps for FieldWire<D> {
  type Native = Fr;

  fn from_native(v: Fr) -> Self {
    Self::constant(v)
  }

  fn value(&self) -> Fr {
    self.value
  }

  fn invert(&self) -> Result<Self, PipelineError> {
    let inverse = Option::<Fr>::from(Field::invert(&self.value)).ok_or(PipelineError::DivisionByZero)?;
    match &self.driver {
      None => Ok(Self::constant(inverse)),
      Some(d) => {
        let inv_idx = d.borrow_mut().add_variable(inverse);
        // a · a⁻¹ = 1
        d.borrow_mut().create_poly_gate(
          self.index,
          inv_idx,
          inv_idx,
          Fr::ONE,
          Fr::ZERO,
          Fr::ZERO,
          Fr::ZERO,
          -Fr::ONE,
        );
        Ok(Self {
          driver: Some(d.clone()),
          index: inv_idx,
          value: inverse,
        })
      }
    }
  }

  fn enforce_equal(&self, other: &Self, label: &str) -> bool {
    if let Some(driver) = self.driver.clone().or_else(|| other.driver_handle()) {
      let a = self.materialize(&driver);
      let b = other.materialize(&driver);
      driver.borrow_mut().assert_equal(a, b, label);
    }
    self.value == other.value
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
  fn test_arithmetic_matches_native() {
    let mut rng = StdRng::seed_from_u64(30);
    let driver = sim();
    let a_v = Fr::random(&mut rng);
    let b_v = Fr::random(&mut rng);
    let a = FieldWire::witness(&driver, a_v);
    let b = FieldWire::witness(&driver, b_v);
    let k = FieldWire::<CircuitSimulator>::from_native(Fr::from(7));

    assert_eq!((a.clone() + b.clone()).value(), a_v + b_v);
    assert_eq!((a.clone() - b.clone()).value(), a_v - b_v);
    assert_eq!((a.clone() * b.clone()).value(), a_v * b_v);
    assert_eq!((a.clone() * k.clone()).value(), a_v * Fr::from(7));
    assert_eq!((k.clone() - a.clone()).value(), Fr::from(7) - a_v);
    assert_eq!((-a.clone()).value(), -a_v);
    assert_eq!(a.invert().unwrap().value() * a_v, Fr::ONE);

    assert!(driver.borrow().is_satisfied());
    assert!(driver.borrow().num_gates() > 0);
  }

  #[test]
  fn test_constants_emit_no_gates() {
    let x = FieldWire::<CircuitSimulator>::from_native(Fr::from(3));
    let y = FieldWire::<CircuitSimulator>::from_native(Fr::from(4));
    let z = x * y;
    assert!(z.is_constant());
    assert_eq!(z.value(), Fr::from(12));
  }

  #[test]
  fn test_enforce_equal_records_failure() {
    let driver = sim();
    let a = FieldWire::witness(&driver, Fr::from(5));
    let b = FieldWire::witness(&driver, Fr::from(6));
    assert!(a.enforce_equal(&a.clone(), "same"));
    assert!(driver.borrow().is_satisfied());

    assert!(!a.enforce_equal(&b, "different"));
    assert!(!driver.borrow().is_satisfied());
    assert_eq!(driver.borrow().failures(), &["different".to_string()]);
  }

  #[test]
  fn test_enforce_equal_against_constant() {
    let driver = sim();
    let a = FieldWire::witness(&driver, Fr::from(5));
    assert!(a.enforce_equal(&FieldWire::from_native(Fr::from(5)), "pin"));
    assert!(driver.borrow().is_satisfied());
  }

  #[test]
  fn test_invert_zero_fails() {
    let driver = sim();
    let zero = FieldWire::witness(&driver, Fr::ZERO);
    assert!(matches!(zero.invert(), Err(PipelineError::DivisionByZero)));
  }
}
