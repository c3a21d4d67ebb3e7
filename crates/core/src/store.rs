//! The build store: a total key→value mapping plus strategy metadata.
//!
//! The store is the engine's only durable state. Hosts create one, hand it to
//! a build, and persist it between invocations; the JSON helpers below cover
//! hosts whose key, value, and metadata types are serde-serializable.

use std::collections::HashMap;
use std::fs;
use std::hash::Hash;
use std::path::Path;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::error::StoreError;

/// A total key→value mapping.
///
/// Keys without an entry resolve to a designated empty value, so reads never
/// fail and hosts never need a separate "missing" channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValueStore<K: Eq + Hash, V> {
  entries: HashMap<K, V>,
  empty: V,
}

impl<K: Eq + Hash + Clone, V: Clone> ValueStore<K, V> {
  /// Create an empty mapping where every key resolves to `empty`.
  pub fn new(empty: V) -> Self {
    Self {
      entries: HashMap::new(),
      empty,
    }
  }

  /// The value of `key`, or the empty value if it was never written.
  pub fn value(&self, key: &K) -> V {
    self.entries.get(key).cloned().unwrap_or_else(|| self.empty.clone())
  }

  /// Whether `key` has ever been written.
  pub fn contains(&self, key: &K) -> bool {
    self.entries.contains_key(key)
  }

  pub fn put(&mut self, key: K, value: V) {
    self.entries.insert(key, value);
  }

  /// All written entries, in no particular order.
  pub fn entries(&self) -> impl Iterator<Item = (&K, &V)> {
    self.entries.iter()
  }

  pub fn len(&self) -> usize {
    self.entries.len()
  }

  pub fn is_empty(&self) -> bool {
    self.entries.is_empty()
  }
}

/// The engine's durable state: values plus one strategy-owned metadata value.
///
/// The metadata shape `I` is chosen by the rebuilder strategy (and wrapped by
/// schedulers that persist ordering state of their own). A store is owned
/// exclusively by the build composer for the duration of one build; tasks
/// only ever see it through their fetch callback.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Store<K: Eq + Hash, V, I> {
  values: ValueStore<K, V>,
  info: I,
}

impl<K: Eq + Hash + Clone, V: Clone, I> Store<K, V, I> {
  /// Create a store with no written entries, resolving every key to `empty`.
  pub fn new(info: I, empty: V) -> Self {
    Self {
      values: ValueStore::new(empty),
      info,
    }
  }

  pub fn value(&self, key: &K) -> V {
    self.values.value(key)
  }

  pub fn put(&mut self, key: K, value: V) {
    self.values.put(key, value);
  }

  pub fn values(&self) -> &ValueStore<K, V> {
    &self.values
  }

  pub fn values_mut(&mut self) -> &mut ValueStore<K, V> {
    &mut self.values
  }

  pub fn info(&self) -> &I {
    &self.info
  }

  pub fn info_mut(&mut self) -> &mut I {
    &mut self.info
  }

  /// Mutable access to both halves at once, for callers that update values
  /// and metadata in one step.
  pub fn split_mut(&mut self) -> (&mut ValueStore<K, V>, &mut I) {
    (&mut self.values, &mut self.info)
  }
}

impl<K, V, I> Store<K, V, I>
where
  K: Eq + Hash + Serialize,
  V: Serialize,
  I: Serialize,
{
  /// Persist the store as pretty JSON.
  ///
  /// Uses atomic write (write to temp, then rename) to prevent corruption.
  pub fn save(&self, path: &Path) -> Result<(), StoreError> {
    let temp_path = path.with_extension("tmp");

    let content = serde_json::to_string_pretty(self).map_err(StoreError::Serialize)?;
    fs::write(&temp_path, &content)?;
    fs::rename(&temp_path, path)?;

    Ok(())
  }
}

impl<K, V, I> Store<K, V, I>
where
  K: Eq + Hash + DeserializeOwned,
  V: DeserializeOwned,
  I: DeserializeOwned,
{
  /// Reload a store persisted with [`Store::save`].
  pub fn load(path: &Path) -> Result<Self, StoreError> {
    let content = fs::read_to_string(path)?;
    let store = serde_json::from_str(&content).map_err(StoreError::Parse)?;
    Ok(store)
  }
}
