//! Cryptographic digest functionality for verification keys.
//!
//! This module provides traits and utilities for computing secure cryptographic
//! digests of data structures used by the pipeline. It includes the `Digestible`
//! trait for types that can be converted to byte representations, the
//! `SimpleDigestible` marker trait for serializable types, and the
//! `DigestComputer` utility for computing SHA3-256 digests.

use bincode::Options;
use serde::Serialize;
use sha3::{Digest, Sha3_256};
use std::io;

/// A 32-byte digest of a verification key, absorbed into the transcript before
/// any prover message.
pub type KeyDigest = [u8; 32];

/// Trait for components with potentially discrete digests to be included in their container's digest.
pub trait Digestible {
  /// Write the byte representation of Self in a byte buffer
  fn write_bytes<W: Sized + io::Write>(&self, byte_sink: &mut W) -> Result<(), io::Error>;
}

/// Marker trait to be implemented for types that implement `Digestible` and `Serialize`.
/// Their instances will be serialized to bytes then digested.
pub trait SimpleDigestible: Serialize {}

impl<T: SimpleDigestible> Digestible for T {
  fn write_bytes<W: Sized + io::Write>(&self, byte_sink: &mut W) -> Result<(), io::Error> {
    let config = bincode::DefaultOptions::new()
      .with_little_endian()
      .with_fixint_encoding();
    // Note: bincode recursively length-prefixes every field!
    config
      .serialize_into(byte_sink, self)
      .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))
  }
}

/// A utility for computing cryptographic digests of `Digestible` instances.
///
/// `DigestComputer` serializes the input data and computes a 32-byte SHA3-256
/// digest that can be used for integrity verification and identification.
pub struct DigestComputer<'a, T> {
  inner: &'a T,
}

impl<'a, T: Digestible> DigestComputer<'a, T> {
  fn hasher() -> Sha3_256 {
    Sha3_256::new()
  }

  /// Create a new DigestComputer
  pub fn new(inner: &'a T) -> Self {
    DigestComputer { inner }
  }

  /// Compute the digest of a `Digestible` instance.
  pub fn digest(&self) -> Result<KeyDigest, io::Error> {
    let mut hasher = Self::hasher();
    self.inner.write_bytes(&mut hasher)?;
    Ok(hasher.finalize().into())
  }
}
