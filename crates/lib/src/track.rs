//! Dependency extraction.
//!
//! Three fetch implementations injected into the same task code:
//! - a recording fetch that logs requested keys and hands back placeholders,
//!   for enumerating a static task's dependencies without a store
//! - a tracking wrapper that records the keys actually fetched during one
//!   real execution, for dynamic tasks
//! - a plain store reader backing the recompute oracle

use std::hash::Hash;

use treadle_core::ValueStore;

use crate::task::{Capability, Fetch, Task};
use crate::types::{BuildError, Interrupt};

/// Fetch that records requested keys and hands back placeholder values.
struct RecordingFetch<K> {
  keys: Vec<K>,
}

impl<K: Clone, V: Default> Fetch<K, V> for RecordingFetch<K> {
  fn fetch(&mut self, key: &K) -> Result<V, Interrupt<K>> {
    self.keys.push(key.clone());
    Ok(V::default())
  }
}

/// Enumerate the dependencies of a static task, without a store.
///
/// Runs the task against a recording fetch and discards the produced value.
/// Keys are returned in fetch order; duplicates are retained. Dynamic tasks
/// are rejected; their fetched keys depend on values the recording fetch
/// cannot supply.
pub fn static_dependencies<K: Clone, V: Default>(task: &Task<K, V>) -> Result<Vec<K>, BuildError> {
  if task.capability() != Capability::Static {
    return Err(BuildError::CapabilityMismatch {
      supported: Capability::Static,
      required: Capability::Dynamic,
    });
  }

  let mut recording = RecordingFetch { keys: Vec::new() };
  match task.run(&mut recording) {
    Ok(_) | Err(Interrupt::Blocked { .. }) => Ok(recording.keys),
    Err(Interrupt::Failed(e)) => Err(e),
  }
}

/// Fetch wrapper that records every key successfully fetched, in order.
struct TrackingFetch<'a, K, V> {
  inner: &'a mut dyn Fetch<K, V>,
  fetched: Vec<K>,
}

impl<K: Clone, V> Fetch<K, V> for TrackingFetch<'_, K, V> {
  fn fetch(&mut self, key: &K) -> Result<V, Interrupt<K>> {
    let value = self.inner.fetch(key)?;
    self.fetched.push(key.clone());
    Ok(value)
  }
}

/// Run a task, returning its value and the keys it fetched, in fetch order.
///
/// Duplicates are retained; callers that only need the dependency set dedupe
/// themselves.
pub fn track<K: Clone, V>(task: &Task<K, V>, fetch: &mut dyn Fetch<K, V>) -> Result<(V, Vec<K>), Interrupt<K>> {
  let mut tracking = TrackingFetch {
    inner: fetch,
    fetched: Vec::new(),
  };
  let value = task.run(&mut tracking)?;
  Ok((value, tracking.fetched))
}

/// Fetch that reads current store values, with no build policy attached.
pub struct StoreFetch<'a, K: Eq + Hash, V> {
  pub values: &'a ValueStore<K, V>,
}

impl<K: Eq + Hash + Clone, V: Clone> Fetch<K, V> for StoreFetch<'_, K, V> {
  fn fetch(&mut self, key: &K) -> Result<V, Interrupt<K>> {
    Ok(self.values.value(key))
  }
}

/// Run a task purely against current store values.
///
/// Only the correctness checker uses this; schedulers never consult it to
/// decide rebuilding.
pub fn recompute<K: Eq + Hash + Clone, V: Clone>(task: &Task<K, V>, values: &ValueStore<K, V>) -> Result<V, BuildError> {
  let mut fetch = StoreFetch { values };
  task.run(&mut fetch).map_err(Interrupt::into_build_error)
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn static_dependencies_in_fetch_order() {
    let task: Task<&str, i64> = Task::fixed(|fetch| {
      let a = fetch.fetch(&"a1")?;
      let b = fetch.fetch(&"a2")?;
      Ok(a + b)
    });

    assert_eq!(static_dependencies(&task).unwrap(), vec!["a1", "a2"]);
  }

  #[test]
  fn static_dependencies_keeps_duplicates() {
    let task: Task<&str, i64> = Task::fixed(|fetch| {
      let a = fetch.fetch(&"a")?;
      let b = fetch.fetch(&"a")?;
      Ok(a + b)
    });

    assert_eq!(static_dependencies(&task).unwrap(), vec!["a", "a"]);
  }

  #[test]
  fn static_dependencies_rejects_dynamic_tasks() {
    let task: Task<&str, i64> = Task::dynamic(|fetch| fetch.fetch(&"a"));
    let result = static_dependencies(&task);
    assert!(matches!(result, Err(BuildError::CapabilityMismatch { .. })));
  }

  #[test]
  fn track_records_what_was_actually_fetched() {
    let values = {
      let mut v = ValueStore::new(0_i64);
      v.put("selector", 1);
      v.put("a2", 20);
      v
    };

    // Fetches "a2" only because the selector says so
    let task: Task<&str, i64> = Task::dynamic(|fetch| {
      let selector = fetch.fetch(&"selector")?;
      if selector == 0 { fetch.fetch(&"a1") } else { fetch.fetch(&"a2") }
    });

    let mut fetch = StoreFetch { values: &values };
    let (value, deps) = track(&task, &mut fetch).unwrap();
    assert_eq!(value, 20);
    assert_eq!(deps, vec!["selector", "a2"]);
  }

  #[test]
  fn recompute_reads_the_store_only() {
    let mut values = ValueStore::new(0_i64);
    values.put("a1", 10);
    values.put("a2", 20);

    let task: Task<&str, i64> = Task::fixed(|fetch| Ok(fetch.fetch(&"a1")? + fetch.fetch(&"a2")?));
    assert_eq!(recompute(&task, &values).unwrap(), 30);
  }
}
