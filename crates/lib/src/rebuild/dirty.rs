//! Make-style dirty-bit rebuilding.
//!
//! A key is dirty when its stored value differs from the previous run's
//! snapshot, when any dependency differs from the snapshot, or when a
//! dependency was written during this run. Dirtiness propagates
//! unconditionally (a dependency that recomputed to the same value still
//! marks its dependents dirty), so there is no early cutoff. The two-valued
//! "changed since last run" domain replaces Make's timestamps outright: the
//! ordering of mtimes never carried more information than this bit.

use std::collections::{HashMap, HashSet};
use std::hash::Hash;

use serde::{Deserialize, Serialize};
use tracing::debug;
use treadle_core::ValueStore;

use crate::rebuild::{Outcome, Progress, ProgressFetch, Rebuilder};
use crate::task::{Capability, Task};
use crate::track;
use crate::types::{BuildError, BuildKey, BuildValue, Interrupt};

/// Metadata for [`DirtyBit`]: the previous run's full store snapshot, the
/// dependency list observed for each key, and (transiently, cleared by
/// `finalize`) the keys written this run.
///
/// The per-key dependency lists exist for dynamic tasks, whose dependencies
/// cannot be enumerated without running them; static tasks are re-extracted
/// on every check instead.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DirtyInfo<K: Eq + Hash, V> {
  snapshot: HashMap<K, V>,
  depends: HashMap<K, Vec<K>>,
  #[serde(skip)]
  written: HashSet<K>,
}

impl<K: Eq + Hash, V> Default for DirtyInfo<K, V> {
  fn default() -> Self {
    Self {
      snapshot: HashMap::new(),
      depends: HashMap::new(),
      written: HashSet::new(),
    }
  }
}

impl<K: Eq + Hash, V> DirtyInfo<K, V> {
  pub fn new() -> Self {
    Self::default()
  }
}

/// The Make/Excel-style rebuilder: value equality against the previous run's
/// snapshot, no cutoff.
pub struct DirtyBit;

impl<K, V> Rebuilder<K, V> for DirtyBit
where
  K: BuildKey,
  V: BuildValue + PartialEq + Default,
{
  type Info = DirtyInfo<K, V>;

  fn check(
    &self,
    key: &K,
    task: &Task<K, V>,
    ctx: &mut dyn Progress<K, V, Self::Info>,
  ) -> Result<Outcome<K, V>, Interrupt<K>> {
    let deps = match task.capability() {
      Capability::Static => Some(track::static_dependencies(task)?),
      Capability::Dynamic => ctx.info().depends.get(key).cloned(),
    };

    let dirty = match deps {
      // A dynamic task with no recorded history must run.
      None => true,
      Some(deps) => {
        // Bring every dependency up to date before judging it.
        let mut dep_current = Vec::with_capacity(deps.len());
        for dep in &deps {
          dep_current.push(ctx.fetch(dep)?);
        }

        let current = ctx.stored(key);
        let info = ctx.info();
        info.snapshot.get(key) != Some(&current)
          || deps
            .iter()
            .zip(&dep_current)
            .any(|(dep, value)| info.written.contains(dep) || info.snapshot.get(dep) != Some(value))
      }
    };

    if !dirty {
      debug!(key = ?key, "clean, reusing stored value");
      return Ok(Outcome::UpToDate);
    }

    debug!(key = ?key, "dirty, executing task");
    let mut fetch = ProgressFetch(ctx);
    let (value, deps) = track::track(task, &mut fetch)?;
    Ok(Outcome::Executed { value, deps })
  }

  fn record(
    &self,
    key: &K,
    outcome: &Outcome<K, V>,
    values: &mut ValueStore<K, V>,
    info: &mut Self::Info,
  ) -> Result<(), BuildError> {
    match outcome {
      Outcome::UpToDate => {}
      Outcome::Executed { value, deps } => {
        values.put(key.clone(), value.clone());
        info.depends.insert(key.clone(), deps.clone());
        info.written.insert(key.clone());
      }
      Outcome::Restored { value } => {
        values.put(key.clone(), value.clone());
        info.written.insert(key.clone());
      }
    }
    Ok(())
  }

  fn finalize(&self, values: &ValueStore<K, V>, info: &mut Self::Info) {
    // The resulting store becomes the next run's reference point.
    info.snapshot = values.entries().map(|(k, v)| (k.clone(), v.clone())).collect();
    info.written.clear();
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use treadle_core::Store;

  /// Context over a bare store: dependencies are assumed current.
  struct Direct<'a> {
    store: &'a Store<&'static str, i64, DirtyInfo<&'static str, i64>>,
  }

  impl Progress<&'static str, i64, DirtyInfo<&'static str, i64>> for Direct<'_> {
    fn stored(&self, key: &&'static str) -> i64 {
      self.store.value(key)
    }

    fn fetch(&mut self, key: &&'static str) -> Result<i64, Interrupt<&'static str>> {
      Ok(self.store.value(key))
    }

    fn info(&self) -> &DirtyInfo<&'static str, i64> {
      self.store.info()
    }
  }

  fn sum_task() -> Task<&'static str, i64> {
    Task::fixed(|fetch| Ok(fetch.fetch(&"a1")? + fetch.fetch(&"a2")?))
  }

  fn built_store() -> Store<&'static str, i64, DirtyInfo<&'static str, i64>> {
    // State as if "b1" = a1 + a2 was built and finalized in a previous run
    let mut store = Store::new(DirtyInfo::new(), 0_i64);
    store.put("a1", 10);
    store.put("a2", 20);
    store.put("b1", 30);
    DirtyBit.finalize(&store.values().clone(), store.info_mut());
    store
  }

  #[test]
  fn unchanged_key_is_clean() {
    let store = built_store();
    let outcome = DirtyBit.check(&"b1", &sum_task(), &mut Direct { store: &store }).unwrap();
    assert_eq!(outcome, Outcome::UpToDate);
  }

  #[test]
  fn changed_input_marks_dependent_dirty() {
    let mut store = built_store();
    store.put("a1", 15);

    let outcome = DirtyBit.check(&"b1", &sum_task(), &mut Direct { store: &store }).unwrap();
    assert_eq!(
      outcome,
      Outcome::Executed {
        value: 35,
        deps: vec!["a1", "a2"],
      }
    );
  }

  #[test]
  fn written_dependency_marks_dependent_dirty_even_if_value_unchanged() {
    let mut store = built_store();
    // "a2" was rewritten this run to the value it already had
    store.info_mut().written.insert("a2");

    let outcome = DirtyBit.check(&"b1", &sum_task(), &mut Direct { store: &store }).unwrap();
    assert!(matches!(outcome, Outcome::Executed { value: 30, .. }));
  }

  #[test]
  fn dynamic_task_without_history_runs() {
    let store = built_store();
    let task: Task<&'static str, i64> = Task::dynamic(|fetch| fetch.fetch(&"a1"));

    let outcome = DirtyBit.check(&"pick", &task, &mut Direct { store: &store }).unwrap();
    assert!(matches!(outcome, Outcome::Executed { value: 10, .. }));
  }

  #[test]
  fn dynamic_task_reuses_recorded_dependencies() {
    let mut store = built_store();
    store.put("pick", 10);
    store.info_mut().depends.insert("pick", vec!["a1"]);
    DirtyBit.finalize(&store.values().clone(), store.info_mut());

    let task: Task<&'static str, i64> = Task::dynamic(|fetch| fetch.fetch(&"a1"));
    let outcome = DirtyBit.check(&"pick", &task, &mut Direct { store: &store }).unwrap();
    assert_eq!(outcome, Outcome::UpToDate);
  }

  #[test]
  fn record_tracks_written_set_until_finalize() {
    let mut store = built_store();
    let outcome = Outcome::Executed {
      value: 35,
      deps: vec!["a1", "a2"],
    };

    let (values, info) = store.split_mut();
    DirtyBit.record(&"b1", &outcome, values, info).unwrap();
    assert!(store.info().written.contains("b1"));
    assert_eq!(store.value(&"b1"), 35);

    let values = store.values().clone();
    DirtyBit.finalize(&values, store.info_mut());
    assert!(store.info().written.is_empty());
    assert_eq!(store.info().snapshot.get("b1"), Some(&35));
  }
}
