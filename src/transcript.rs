//! Keccak-256 Fiat-Shamir transcript over a byte-stream proof format.
//!
//! One type serves both roles: the prover constructs a transcript, appends
//! labelled items (which are simultaneously absorbed into the hash state) and
//! extracts the proof bytes at the end; the verifier wraps the proof bytes and
//! reads the same items in the same order, absorbing identically, so both
//! sides derive identical challenges. The transcript is seeded with the
//! verification-key digest before any message.
//!
//! Wire format: scalars are 32-byte little-endian canonical reprs, points are
//! 32-byte compressed affine encodings, sizes are 8-byte little-endian
//! integers. Any decode failure is a malformed-input error, never a panic.

use crate::{digest::KeyDigest, errors::PipelineError};
use byteorder::{ByteOrder, LittleEndian};
use ff::{FromUniformBytes, PrimeField};
use group::GroupEncoding;
use halo2curves::bn256::{Fr, G1Affine};
use sha3::{Digest, Keccak256};

const PERSONA_TAG: &[u8] = b"PhTR";
const DOM_SEP_TAG: &[u8] = b"PhDS";
const KECCAK256_STATE_SIZE: usize = 64;
const KECCAK256_PREFIX_CHALLENGE_LO: u8 = 0;
const KECCAK256_PREFIX_CHALLENGE_HI: u8 = 1;

/// The kind of an entry in the transcript manifest.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ItemKind {
  /// A prover-sent size.
  U64,
  /// A prover-sent scalar.
  Scalar,
  /// A prover-sent block of scalars of the given count.
  ScalarVec(usize),
  /// A prover-sent commitment.
  Point,
  /// A squeezed challenge.
  Challenge,
}

fn compute_updated_state(keccak_instance: Keccak256, input: &[u8]) -> [u8; KECCAK256_STATE_SIZE] {
  let input_lo = [input, &[KECCAK256_PREFIX_CHALLENGE_LO]].concat();
  let input_hi = [input, &[KECCAK256_PREFIX_CHALLENGE_HI]].concat();

  let mut hasher_lo = keccak_instance.clone();
  let mut hasher_hi = keccak_instance;

  hasher_lo.update(&input_lo);
  hasher_hi.update(&input_hi);

  let output_lo = hasher_lo.finalize();
  let output_hi = hasher_hi.finalize();

  [output_lo, output_hi]
    .concat()
    .as_slice()
    .try_into()
    .expect("fixed-size keccak outputs")
}

/// The Fiat-Shamir transcript. See the module docs for roles and wire format.
pub struct Transcript {
  round: u16,
  state: [u8; KECCAK256_STATE_SIZE],
  hasher: Keccak256,
  proof_data: Vec<u8>,
  cursor: usize,
  manifest: Vec<(String, ItemKind)>,
  challenges: Vec<Fr>,
}

impl Transcript {
  fn new(vk_digest: &KeyDigest, proof_data: Vec<u8>) -> Self {
    let keccak_instance = Keccak256::new();
    let input = [PERSONA_TAG, vk_digest.as_ref()].concat();
    let output = compute_updated_state(keccak_instance.clone(), &input);

    Self {
      round: 0u16,
      state: output,
      hasher: keccak_instance,
      proof_data,
      cursor: 0,
      manifest: Vec::new(),
      challenges: Vec::new(),
    }
  }

  /// Creates a prover-role transcript that builds the proof stream.
  pub fn new_prover(vk_digest: &KeyDigest) -> Self {
    Self::new(vk_digest, Vec::new())
  }

  /// Creates a verifier-role transcript over existing proof bytes.
  pub fn new_verifier(vk_digest: &KeyDigest, proof: &[u8]) -> Self {
    Self::new(vk_digest, proof.to_vec())
  }

  fn absorb_bytes(&mut self, label: &str, bytes: &[u8]) {
    self.hasher.update(label.as_bytes());
    self.hasher.update(bytes);
  }

  /// Derives a challenge scalar bound to everything absorbed so far.
  pub fn squeeze(&mut self, label: &str) -> Result<Fr, PipelineError> {
    // gather the current round, state and label to compute the new state
    let input = [
      DOM_SEP_TAG,
      self.round.to_le_bytes().as_ref(),
      self.state.as_ref(),
      label.as_bytes(),
    ]
    .concat();
    let hasher = core::mem::replace(&mut self.hasher, Keccak256::new());
    let output = compute_updated_state(hasher, &input);

    // update state and roll the round counter forward
    self.round = self
      .round
      .checked_add(1)
      .ok_or(PipelineError::InternalTranscriptError)?;
    self.state.copy_from_slice(&output);

    let challenge = Fr::from_uniform_bytes(&output);
    self.manifest.push((label.to_string(), ItemKind::Challenge));
    self.challenges.push(challenge);
    Ok(challenge)
  }

  fn append(&mut self, label: &str, kind: ItemKind, bytes: &[u8]) {
    self.absorb_bytes(label, bytes);
    self.proof_data.extend_from_slice(bytes);
    self.manifest.push((label.to_string(), kind));
  }

  fn take(&mut self, label: &str, kind: ItemKind, n: usize) -> Result<&[u8], PipelineError> {
    if self.cursor + n > self.proof_data.len() {
      return Err(PipelineError::TranscriptOutOfData);
    }
    let start = self.cursor;
    self.cursor += n;
    self.manifest.push((label.to_string(), kind));
    let bytes = &self.proof_data[start..self.cursor];
    self.hasher.update(label.as_bytes());
    self.hasher.update(bytes);
    Ok(bytes)
  }

  /// Sends a size (prover role).
  pub fn send_u64(&mut self, label: &str, v: u64) {
    let mut buf = [0u8; 8];
    LittleEndian::write_u64(&mut buf, v);
    self.append(label, ItemKind::U64, &buf);
  }

  /// Sends one scalar (prover role).
  pub fn send_scalar(&mut self, label: &str, v: &Fr) {
    self.append(label, ItemKind::Scalar, v.to_repr().as_ref());
  }

  /// Sends a block of scalars under one label (prover role).
  pub fn send_scalars(&mut self, label: &str, vs: &[Fr]) {
    let bytes: Vec<u8> = vs.iter().flat_map(|v| v.to_repr().as_ref().to_vec()).collect();
    self.append(label, ItemKind::ScalarVec(vs.len()), &bytes);
  }

  /// Sends one commitment (prover role).
  pub fn send_point(&mut self, label: &str, p: &G1Affine) {
    self.append(label, ItemKind::Point, p.to_bytes().as_ref());
  }

  /// Reads a size (verifier role).
  pub fn read_u64(&mut self, label: &str) -> Result<u64, PipelineError> {
    let bytes = self.take(label, ItemKind::U64, 8)?;
    Ok(LittleEndian::read_u64(bytes))
  }

  /// Reads one scalar (verifier role).
  pub fn read_scalar(&mut self, label: &str) -> Result<Fr, PipelineError> {
    let bytes = self.take(label, ItemKind::Scalar, 32)?;
    decode_scalar(label, bytes)
  }

  /// Reads `n` scalars absorbed under one label (verifier role).
  pub fn read_scalars(&mut self, label: &str, n: usize) -> Result<Vec<Fr>, PipelineError> {
    let bytes = self.take(label, ItemKind::ScalarVec(n), 32 * n)?.to_vec();
    bytes
      .chunks_exact(32)
      .map(|chunk| decode_scalar(label, chunk))
      .collect()
  }

  /// Reads one commitment (verifier role).
  pub fn read_point(&mut self, label: &str) -> Result<G1Affine, PipelineError> {
    let bytes = self.take(label, ItemKind::Point, 32)?;
    let mut repr = <G1Affine as GroupEncoding>::Repr::default();
    repr.as_mut().copy_from_slice(bytes);
    Option::<G1Affine>::from(G1Affine::from_bytes(&repr)).ok_or_else(|| {
      PipelineError::TranscriptDeserialization {
        reason: format!("{label}: not a valid curve point"),
      }
    })
  }

  /// Consumes the prover-role transcript, returning the proof bytes.
  pub fn into_proof(self) -> Vec<u8> {
    self.proof_data
  }

  /// True once every proof byte has been read (verifier role).
  pub fn fully_consumed(&self) -> bool {
    self.cursor == self.proof_data.len()
  }

  /// All challenges squeezed so far, in order.
  pub fn challenges(&self) -> &[Fr] {
    &self.challenges
  }

  /// The ordered (label, kind) log of everything sent, read, and squeezed.
  pub fn manifest(&self) -> &[(String, ItemKind)] {
    &self.manifest
  }
}

fn decode_scalar(label: &str, bytes: &[u8]) -> Result<Fr, PipelineError> {
  let mut repr = <Fr as PrimeField>::Repr::default();
  repr.as_mut().copy_from_slice(bytes);
  Option::<Fr>::from(Fr::from_repr(repr)).ok_or_else(|| PipelineError::TranscriptDeserialization {
    reason: format!("{label}: non-canonical scalar"),
  })
}
