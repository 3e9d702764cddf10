//! The seam between the recursive verifier and a proving backend.
//!
//! The pipeline's in-circuit instantiation emits constraints through this
//! trait and nothing else; gate encoding into a real backend lives on the
//! other side of it. The provided `CircuitSimulator` checks every constraint
//! eagerly against the witness values and records failures, which is all the
//! tests need.
use ff::{Field, PrimeField};
use halo2curves::bn256::Fr;

/// Constraint sink for the recursive verifier.
///
/// The poly gate encodes `q_m·a·b + q_l·a + q_r·b + q_o·c + q_c = 0` over
/// three variable indices.
pub trait CircuitDriver {
  /// Allocates a witness variable, returning its index.
  fn add_variable(&mut self, value: Fr) -> usize;

  /// Adds one poly gate over the variables at `a`, `b`, `c`.
  fn create_poly_gate(
    &mut self,
    a: usize,
    b: usize,
    c: usize,
    q_m: Fr,
    q_l: Fr,
    q_r: Fr,
    q_o: Fr,
    q_c: Fr,
  );

  /// Constrains the variable at `a` to `num_bits` bits.
  fn create_range_constraint(&mut self, a: usize, num_bits: usize);

  /// Asserts two variables equal, tagging any violation with `label`.
  fn assert_equal(&mut self, a: usize, b: usize, label: &str);

  /// The witness value at `index`.
  fn get_value(&self, index: usize) -> Fr;

  /// Whether every constraint added so far holds.
  fn is_satisfied(&self) -> bool;

  /// Number of constraints added so far.
  fn num_gates(&self) -> usize;
}

/// A driver that evaluates constraints immediately instead of building a
/// circuit. Violations are recorded, not fatal, mirroring how an invalid
/// proof leaves a real verifier circuit unsatisfiable rather than panicking.
#[derive(Debug, Default)]
pub struct CircuitSimulator {
  variables: Vec<Fr>,
  num_gates: usize,
  failures: Vec<String>,
}

impl CircuitSimulator {
  /// An empty simulator.
  pub fn new() -> Self {
    Self::default()
  }

  /// Labels of every violated constraint, in insertion order.
  pub fn failures(&self) -> &[String] {
    &self.failures
  }
}

impl CircuitDriver for CircuitSimulator {
  fn add_variable(&mut self, value: Fr) -> usize {
    self.variables.push(value);
    self.variables.len() - 1
  }

  fn create_poly_gate(
    &mut self,
    a: usize,
    b: usize,
    c: usize,
    q_m: Fr,
    q_l: Fr,
    q_r: Fr,
    q_o: Fr,
    q_c: Fr,
  ) {
    let (va, vb, vc) = (self.variables[a], self.variables[b], self.variables[c]);
    self.num_gates += 1;
    if q_m * va * vb + q_l * va + q_r * vb + q_o * vc + q_c != Fr::ZERO {
      self.failures.push(format!("poly_gate_{}", self.num_gates - 1));
    }
  }

  fn create_range_constraint(&mut self, a: usize, num_bits: usize) {
    let value = self.variables[a];
    self.num_gates += 1;
    let repr = value.to_repr();
    let mut bits = 0usize;
    for (i, byte) in repr.as_ref().iter().enumerate() {
      if *byte != 0 {
        bits = 8 * i + (8 - byte.leading_zeros() as usize);
      }
    }
    if bits > num_bits {
      self.failures.push(format!("range_{num_bits}_gate_{}", self.num_gates - 1));
    }
  }

  fn assert_equal(&mut self, a: usize, b: usize, label: &str) {
    self.num_gates += 1;
    if self.variables[a] != self.variables[b] {
      self.failures.push(label.to_string());
    }
  }

  fn get_value(&self, index: usize) -> Fr {
    self.variables[index]
  }

  fn is_satisfied(&self) -> bool {
    self.failures.is_empty()
  }

  fn num_gates(&self) -> usize {
    self.num_gates
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_poly_gate_checks_witness() {
    let mut sim = CircuitSimulator::new();
    let a = sim.add_variable(Fr::from(3));
    let b = sim.add_variable(Fr::from(4));
    let c = sim.add_variable(Fr::from(12));
    // a * b - c == 0
    sim.create_poly_gate(a, b, c, Fr::ONE, Fr::ZERO, Fr::ZERO, -Fr::ONE, Fr::ZERO);
    assert!(sim.is_satisfied());

    let d = sim.add_variable(Fr::from(13));
    sim.create_poly_gate(a, b, d, Fr::ONE, Fr::ZERO, Fr::ZERO, -Fr::ONE, Fr::ZERO);
    assert!(!sim.is_satisfied());
    assert_eq!(sim.num_gates(), 2);
  }

  #[test]
  fn test_range_constraint() {
    let mut sim = CircuitSimulator::new();
    let a = sim.add_variable(Fr::from((1 << 20) - 1));
    sim.create_range_constraint(a, 20);
    assert!(sim.is_satisfied());

    let b = sim.add_variable(Fr::from(1 << 20));
    sim.create_range_constraint(b, 20);
    assert!(!sim.is_satisfied());
  }

  #[test]
  fn test_assert_equal_records_label() {
    let mut sim = CircuitSimulator::new();
    let a = sim.add_variable(Fr::from(1));
    let b = sim.add_variable(Fr::from(2));
    sim.assert_equal(a, b, "mismatch");
    assert_eq!(sim.failures(), &["mismatch".to_string()]);
  }
}
