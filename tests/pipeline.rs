//! End-to-end runs of the pipeline: prove real traces, verify them natively
//! and in-circuit, and exercise the failure paths a verifier must survive.
use ff::Field;
use halo2curves::bn256::Fr;
use rand::{SeedableRng, rngs::StdRng};
use phalanx::{
  errors::PipelineError,
  flavor::{hoplite::Hoplite, myrmidon::Myrmidon},
  key::VerificationKey,
  prover::{Prover, ProvingKey},
  provider::NativeContext,
  recursion::{
    PairingAccumulator,
    biggroup::EmulatedPoint,
    driver::{CircuitDriver, CircuitSimulator},
    field_wire::FieldWire,
  },
  srs::{self, KzgSrs},
  trace::TraceBuilder,
  traits::{ExecutionContext, VerifierOutput},
  verifier::Pipeline,
};
use std::{
  cell::RefCell,
  rc::Rc,
  sync::Once,
};

static INIT: Once = Once::new();

fn setup_srs() {
  INIT.call_once(|| {
    let _ = tracing_subscriber::fmt()
      .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
      .try_init();
    srs::init(KzgSrs::setup(1 << 10, StdRng::seed_from_u64(20260822)));
  });
}

// Three public inputs and one gate per selector: a multiplication, two
// additions (one with a constant term) and a four-wire addition.
fn arithmetic_trace(constant: u64) -> TraceBuilder<Hoplite> {
  let mut builder = TraceBuilder::new();
  let p0 = builder.add_public_input(Fr::from(3));
  let p1 = builder.add_public_input(Fr::from(5));
  let p2 = builder.add_public_input(Fr::from(7));

  let v1 = builder.add_variable(Fr::from(15));
  builder.create_poly_gate(p0, p1, v1, Fr::ONE, Fr::ZERO, Fr::ZERO, -Fr::ONE, Fr::ZERO);
  let v2 = builder.add_variable(Fr::from(8));
  builder.create_poly_gate(p0, p1, v2, Fr::ZERO, Fr::ONE, Fr::ONE, -Fr::ONE, Fr::ZERO);
  let v3 = builder.add_variable(Fr::from(23 + constant));
  builder.create_poly_gate(
    v1,
    v2,
    v3,
    Fr::ZERO,
    Fr::ONE,
    Fr::ONE,
    -Fr::ONE,
    Fr::from(constant),
  );
  let v4 = builder.add_variable(Fr::from(30));
  builder.create_big_add_gate(p2, v1, v2, v4, Fr::ONE, Fr::ONE, Fr::ONE, -Fr::ONE, Fr::ZERO);
  builder
}

// A chain of squarings starting from a public input, sized so the finalized
// trace fills a 2^10-row circuit.
fn large_trace(gates: usize) -> TraceBuilder<Hoplite> {
  let mut builder = TraceBuilder::new();
  let p0 = builder.add_public_input(Fr::from(3));
  builder.add_public_input(Fr::from(5));
  builder.add_public_input(Fr::from(7));

  let mut idx = p0;
  let mut value = Fr::from(3);
  for _ in 0..gates {
    value = value.square();
    let next = builder.add_variable(value);
    builder.create_poly_gate(idx, idx, next, Fr::ONE, Fr::ZERO, Fr::ZERO, -Fr::ONE, Fr::ZERO);
    idx = next;
  }
  builder
}

// A databus trace: two calldata reads feeding the same gate mix.
fn databus_trace() -> TraceBuilder<Myrmidon> {
  let mut builder = TraceBuilder::new();
  builder.set_calldata(vec![Fr::from(9), Fr::from(4)]);
  let p0 = builder.add_public_input(Fr::from(6));
  let a = builder.read_calldata(0).unwrap();
  let b = builder.read_calldata(1).unwrap();

  let c2 = builder.add_variable(Fr::from(36));
  builder.create_poly_gate(a, b, c2, Fr::ONE, Fr::ZERO, Fr::ZERO, -Fr::ONE, Fr::ZERO);
  let c3 = builder.add_variable(Fr::from(13));
  builder.create_poly_gate(a, b, c3, Fr::ZERO, Fr::ONE, Fr::ONE, -Fr::ONE, Fr::ZERO);
  let c4 = builder.add_variable(Fr::from(21));
  builder.create_poly_gate(p0, c3, c4, Fr::ZERO, Fr::ONE, Fr::ONE, -Fr::ONE, Fr::from(2));
  let c5 = builder.add_variable(Fr::from(49));
  builder.create_big_add_gate(a, b, c2, c5, Fr::ONE, Fr::ONE, Fr::ONE, -Fr::ONE, Fr::ZERO);
  builder
}

fn hoplite_keys(constant: u64) -> (ProvingKey<Hoplite>, VerificationKey<NativeContext>) {
  let srs = srs::get().unwrap();
  arithmetic_trace(constant).finalize(&srs).unwrap()
}

fn check_pairing(
  vk: &VerificationKey<NativeContext>,
  pair: (
    EmulatedPoint<CircuitSimulator>,
    EmulatedPoint<CircuitSimulator>,
  ),
) -> bool {
  let p0 = pair.0.to_affine().unwrap();
  let p1 = pair.1.to_affine().unwrap();
  match NativeContext::finalize(vk, (p0.into(), p1.into())).unwrap() {
    VerifierOutput::Verified(ok) => ok,
    VerifierOutput::DeferredPairing(..) => unreachable!(),
  }
}

#[test]
fn test_hoplite_proof_verifies() {
  setup_srs();
  let (pk, vk) = hoplite_keys(10);
  let proof = Prover::prove::<Hoplite>(&pk).unwrap();
  assert!(Pipeline::verify::<Hoplite>(&vk, &proof).unwrap());

  // proving is deterministic
  assert_eq!(proof, Prover::prove::<Hoplite>(&pk).unwrap());
}

#[test]
fn test_large_trace_proves_and_verifies() {
  setup_srs();
  let srs = srs::get().unwrap();
  // 1020 gates plus the offset row and three publics fill 2^10 rows exactly
  let (pk, vk) = large_trace(1020).finalize(&srs).unwrap();
  assert_eq!(vk.log_circuit_size, 10);
  let proof = Prover::prove::<Hoplite>(&pk).unwrap();
  assert!(Pipeline::verify::<Hoplite>(&vk, &proof).unwrap());

  let driver = Rc::new(RefCell::new(CircuitSimulator::new()));
  let pair =
    Pipeline::verify_recursive::<CircuitSimulator, Hoplite>(&driver, &vk, &proof).unwrap();
  assert!(
    driver.borrow().is_satisfied(),
    "failures: {:?}",
    driver.borrow().failures()
  );
  assert!(check_pairing(&vk, pair));
}

#[test]
fn test_myrmidon_proof_verifies() {
  setup_srs();
  let srs = srs::get().unwrap();
  let (pk, vk) = databus_trace().finalize(&srs).unwrap();
  let proof = Prover::prove::<Myrmidon>(&pk).unwrap();
  assert!(Pipeline::verify::<Myrmidon>(&vk, &proof).unwrap());
}

#[test]
fn test_tampered_public_input_is_rejected() {
  setup_srs();
  let (pk, vk) = hoplite_keys(10);
  let mut proof = Prover::prove::<Hoplite>(&pk).unwrap();
  // low byte of the first public input, after the three u64 sizes
  proof[24] ^= 1;
  assert!(!Pipeline::verify::<Hoplite>(&vk, &proof).unwrap());
}

#[test]
fn test_tampered_wire_commitment_is_rejected() {
  setup_srs();
  let (pk, vk) = hoplite_keys(10);
  let mut proof = Prover::prove::<Hoplite>(&pk).unwrap();
  // first byte of the w_l commitment
  proof[24 + 3 * 32] ^= 1;
  match Pipeline::verify::<Hoplite>(&vk, &proof) {
    Ok(ok) => assert!(!ok),
    Err(PipelineError::TranscriptDeserialization { .. }) => {}
    Err(e) => panic!("unexpected error: {e:?}"),
  }
}

#[test]
fn test_negated_w4_commitment_is_rejected() {
  setup_srs();
  let (pk, vk) = hoplite_keys(10);
  let mut proof = Prover::prove::<Hoplite>(&pk).unwrap();
  // top bit of the last byte of the w_4 commitment encoding
  proof[24 + 3 * 32 + 3 * 32 + 31] ^= 0x80;
  match Pipeline::verify::<Hoplite>(&vk, &proof) {
    Ok(ok) => assert!(!ok),
    Err(PipelineError::TranscriptDeserialization { .. }) => {}
    Err(e) => panic!("unexpected error: {e:?}"),
  }
}

#[test]
fn test_tampered_sumcheck_univariate_is_rejected() {
  setup_srs();
  let (pk, vk) = hoplite_keys(10);
  let mut proof = Prover::prove::<Hoplite>(&pk).unwrap();
  // first round univariate, after sizes, publics, wires and the grand product
  proof[24 + 3 * 32 + 5 * 32] ^= 1;
  match Pipeline::verify::<Hoplite>(&vk, &proof) {
    Ok(ok) => assert!(!ok),
    Err(PipelineError::TranscriptDeserialization { .. }) => {}
    Err(e) => panic!("unexpected error: {e:?}"),
  }
}

#[test]
fn test_truncated_proof_errors() {
  setup_srs();
  let (pk, vk) = hoplite_keys(10);
  let mut proof = Prover::prove::<Hoplite>(&pk).unwrap();
  proof.truncate(100);
  assert!(matches!(
    Pipeline::verify::<Hoplite>(&vk, &proof),
    Err(PipelineError::TranscriptOutOfData)
  ));
}

#[test]
fn test_trailing_bytes_fail_the_verdict() {
  setup_srs();
  let (pk, vk) = hoplite_keys(10);
  let mut proof = Prover::prove::<Hoplite>(&pk).unwrap();
  proof.push(0);
  assert!(!Pipeline::verify::<Hoplite>(&vk, &proof).unwrap());
}

#[test]
fn test_wrong_key_is_rejected() {
  setup_srs();
  let (pk, _) = hoplite_keys(10);
  let (_, other_vk) = hoplite_keys(11);
  let proof = Prover::prove::<Hoplite>(&pk).unwrap();
  assert!(!Pipeline::verify::<Hoplite>(&other_vk, &proof).unwrap());
}

#[test]
fn test_recursive_verification_is_satisfied() {
  setup_srs();
  let (pk, vk) = hoplite_keys(10);
  let proof = Prover::prove::<Hoplite>(&pk).unwrap();

  let driver = Rc::new(RefCell::new(CircuitSimulator::new()));
  let pair =
    Pipeline::verify_recursive::<CircuitSimulator, Hoplite>(&driver, &vk, &proof).unwrap();
  assert!(
    driver.borrow().is_satisfied(),
    "failures: {:?}",
    driver.borrow().failures()
  );
  assert!(driver.borrow().num_gates() > 0);
  assert!(check_pairing(&vk, pair));
}

#[test]
fn test_recursive_databus_verification_is_satisfied() {
  setup_srs();
  let srs = srs::get().unwrap();
  let (pk, vk) = databus_trace().finalize(&srs).unwrap();
  let proof = Prover::prove::<Myrmidon>(&pk).unwrap();

  let driver = Rc::new(RefCell::new(CircuitSimulator::new()));
  let pair =
    Pipeline::verify_recursive::<CircuitSimulator, Myrmidon>(&driver, &vk, &proof).unwrap();
  assert!(
    driver.borrow().is_satisfied(),
    "failures: {:?}",
    driver.borrow().failures()
  );
  assert!(check_pairing(&vk, pair));
}

#[test]
fn test_recursive_tamper_leaves_driver_unsatisfied() {
  setup_srs();
  let (pk, vk) = hoplite_keys(10);
  let mut proof = Prover::prove::<Hoplite>(&pk).unwrap();
  proof[24] ^= 1;

  let driver = Rc::new(RefCell::new(CircuitSimulator::new()));
  let pair =
    Pipeline::verify_recursive::<CircuitSimulator, Hoplite>(&driver, &vk, &proof).unwrap();
  assert!(!driver.borrow().is_satisfied());
  // the verdict and the deferred pair agree: the tampered byte shifts every
  // later challenge, so the opening no longer closes under the pairing
  assert!(!check_pairing(&vk, pair));
}

#[test]
fn test_deferred_pairs_aggregate() {
  setup_srs();
  let srs = srs::get().unwrap();
  let (pk1, vk1) = hoplite_keys(10);
  let (pk2, vk2) = databus_trace().finalize(&srs).unwrap();
  let proof1 = Prover::prove::<Hoplite>(&pk1).unwrap();
  let proof2 = Prover::prove::<Myrmidon>(&pk2).unwrap();

  let driver = Rc::new(RefCell::new(CircuitSimulator::new()));
  let pair1 =
    Pipeline::verify_recursive::<CircuitSimulator, Hoplite>(&driver, &vk1, &proof1).unwrap();
  let pair2 =
    Pipeline::verify_recursive::<CircuitSimulator, Myrmidon>(&driver, &vk2, &proof2).unwrap();
  assert!(driver.borrow().is_satisfied());

  let separator = FieldWire::witness(&driver, Fr::from(0x5eed));
  let mut acc = PairingAccumulator::new(pair1);
  acc.aggregate(pair2, &separator).unwrap();
  let (q0, q1) = acc.into_pair();
  // both keys share the SRS, so either one closes the combined pair
  assert!(check_pairing(&vk1, (q0, q1)));
}
