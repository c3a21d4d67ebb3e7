//! Execution traces: the durable evidence behind trace-based reuse.

use serde::{Deserialize, Serialize};
use treadle_core::ContentDigest;

/// Record of one historical execution of a key's task: the fingerprints its
/// dependencies had when it ran, and the fingerprint of what it produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trace<K> {
  pub key: K,
  /// Dependency keys paired with the fingerprints observed at execution time.
  pub depends: Vec<(K, ContentDigest)>,
  pub result: ContentDigest,
}

/// Append-only collection of traces.
///
/// Traces are never mutated in place; re-execution of a key appends a new
/// record alongside the old ones, so every historical combination of
/// dependency fingerprints stays available for matching.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TraceStore<K> {
  traces: Vec<Trace<K>>,
}

impl<K> Default for TraceStore<K> {
  fn default() -> Self {
    Self { traces: Vec::new() }
  }
}

impl<K: Eq> TraceStore<K> {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn record(&mut self, trace: Trace<K>) {
    self.traces.push(trace);
  }

  /// All recorded traces for `key`, oldest first.
  pub fn for_key<'a>(&'a self, key: &'a K) -> impl Iterator<Item = &'a Trace<K>> {
    self.traces.iter().filter(move |t| &t.key == key)
  }

  pub fn len(&self) -> usize {
    self.traces.len()
  }

  pub fn is_empty(&self) -> bool {
    self.traces.is_empty()
  }
}
