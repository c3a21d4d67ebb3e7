//! Content-addressable value cache.
//!
//! Constructive-trace builds can restore a key from a value cache keyed by
//! fingerprint instead of re-running its task. The engine only relies on the
//! lookup/insert contract below; whether the backend is this in-memory table
//! or a remote service is the host's business.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::digest::ContentDigest;

/// Lookup/insert contract for a value cache keyed by fingerprint.
pub trait ContentStore<V> {
  /// The value whose fingerprint is `digest`, if the cache holds it.
  fn lookup(&self, digest: &ContentDigest) -> Option<V>;

  /// Record a value under its fingerprint.
  fn insert(&mut self, digest: ContentDigest, value: V);
}

/// In-memory reference backend.
///
/// Each digest maps to at most one value; with deterministic tasks a second
/// insert under the same digest carries the same value, so the first write
/// wins.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemoryContentStore<V> {
  objects: HashMap<ContentDigest, V>,
}

impl<V> Default for MemoryContentStore<V> {
  fn default() -> Self {
    Self {
      objects: HashMap::new(),
    }
  }
}

impl<V> MemoryContentStore<V> {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn len(&self) -> usize {
    self.objects.len()
  }

  pub fn is_empty(&self) -> bool {
    self.objects.is_empty()
  }
}

impl<V: Clone> ContentStore<V> for MemoryContentStore<V> {
  fn lookup(&self, digest: &ContentDigest) -> Option<V> {
    self.objects.get(digest).cloned()
  }

  fn insert(&mut self, digest: ContentDigest, value: V) {
    self.objects.entry(digest).or_insert(value);
  }
}
