//! Deterministic value fingerprinting.
//!
//! Reuse decisions in the trace-based strategies compare fingerprints, never
//! values, so the fingerprint of a value must be stable across processes and
//! machines. `Fingerprint` hashes the canonical JSON form of a value with
//! SHA-256; any serde-serializable value type can opt in with an empty impl.

use std::fmt;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

pub type DigestError = serde_json::Error;

/// A fingerprint of one value.
///
/// The digest is a lowercase hexadecimal SHA-256 (64 characters) of the
/// value's canonical JSON serialization. Digest equality is treated as value
/// equality throughout the engine; collisions are assumed not to occur.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ContentDigest(pub String);

impl fmt::Display for ContentDigest {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}", self.0)
  }
}

/// Deterministic fingerprinting over canonical JSON.
pub trait Fingerprint: Serialize {
  fn fingerprint(&self) -> Result<ContentDigest, DigestError> {
    let serialized = serde_json::to_string(self)?;
    Ok(digest_bytes(serialized.as_bytes()))
  }
}

/// Hash arbitrary bytes.
pub fn digest_bytes(data: &[u8]) -> ContentDigest {
  let mut hasher = Sha256::new();
  hasher.update(data);
  ContentDigest(hex::encode(hasher.finalize()))
}

impl Fingerprint for bool {}
impl Fingerprint for i32 {}
impl Fingerprint for i64 {}
impl Fingerprint for u32 {}
impl Fingerprint for u64 {}
impl Fingerprint for usize {}
impl Fingerprint for f64 {}
impl Fingerprint for String {}
impl Fingerprint for &str {}
impl<T: Serialize> Fingerprint for Option<T> {}
impl<T: Serialize> Fingerprint for Vec<T> {}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn digest_bytes_is_stable() {
    let digest = digest_bytes(b"hello world");
    assert_eq!(digest.0, "b94d27b9934d3e08a52e52d7da7dabfac484efe37a5380ee9088f7ace2efcde9");
  }

  #[test]
  fn fingerprint_is_deterministic() {
    let a = 42_i64.fingerprint().unwrap();
    let b = 42_i64.fingerprint().unwrap();
    assert_eq!(a, b);
  }

  #[test]
  fn fingerprint_distinguishes_values() {
    assert_ne!(1_i64.fingerprint().unwrap(), 2_i64.fingerprint().unwrap());
  }

  #[test]
  fn fingerprint_distinguishes_types() {
    // "1" the string and 1 the number serialize differently
    assert_ne!(1_i64.fingerprint().unwrap(), "1".to_string().fingerprint().unwrap());
  }

  #[test]
  fn option_and_vec_fingerprints() {
    let some = Some(5_i64).fingerprint().unwrap();
    let none = None::<i64>.fingerprint().unwrap();
    assert_ne!(some, none);

    let short = vec![1_i64, 2].fingerprint().unwrap();
    let long = vec![1_i64, 2, 3].fingerprint().unwrap();
    assert_ne!(short, long);
  }
}
