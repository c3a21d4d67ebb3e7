//! Depth-first demand-driven scheduling.
//!
//! To bring a key up to date, first bring every key it fetches up to date,
//! recursively. A per-run visited set (transient scheduling state, reset every
//! build, distinct from the durable metadata) guarantees each key is handled
//! at most once however many dependents demand it. This is the only scheduler
//! that achieves true minimality under dynamic dependencies.

use std::collections::HashSet;

use tracing::{debug, trace};
use treadle_core::Store;

use crate::rebuild::{Progress, Rebuilder};
use crate::schedule::{BuildReport, Scheduler};
use crate::task::{Capability, Rules};
use crate::types::{BuildError, BuildKey, BuildValue, Interrupt};

/// Shake-style recursive demand.
pub struct Suspending;

impl<K, V> Scheduler<K, V> for Suspending
where
  K: BuildKey,
  V: BuildValue,
{
  type Info<RI: Send + Sync> = RI;

  fn supports(&self) -> Capability {
    Capability::Dynamic
  }

  fn run<R: Rebuilder<K, V>>(
    &self,
    rules: &dyn Rules<K, V>,
    target: &K,
    rebuilder: &R,
    store: &mut Store<K, V, R::Info>,
  ) -> Result<BuildReport<K>, BuildError> {
    let mut demand = Demand {
      rules,
      rebuilder,
      store: &mut *store,
      visited: HashSet::new(),
      report: BuildReport::default(),
    };
    demand.ensure(target).map_err(Interrupt::into_build_error)?;

    let report = demand.report;
    let (values, info) = store.split_mut();
    rebuilder.finalize(values, info);
    Ok(report)
  }
}

/// One run's transient state.
struct Demand<'a, K: Eq + std::hash::Hash, V, R: Rebuilder<K, V>> {
  rules: &'a dyn Rules<K, V>,
  rebuilder: &'a R,
  store: &'a mut Store<K, V, R::Info>,
  visited: HashSet<K>,
  report: BuildReport<K>,
}

impl<K, V, R> Demand<'_, K, V, R>
where
  K: BuildKey,
  V: BuildValue,
  R: Rebuilder<K, V>,
{
  /// Bring `key` up to date, suspending on each dependency it fetches.
  fn ensure(&mut self, key: &K) -> Result<(), Interrupt<K>> {
    if self.visited.contains(key) {
      return Ok(());
    }

    let Some(task) = self.rules.task(key) else {
      // Inputs are always current
      self.visited.insert(key.clone());
      return Ok(());
    };

    debug!(key = ?key, "demanding");
    let rebuilder = self.rebuilder;
    let outcome = {
      let mut ctx = DemandProgress { demand: self };
      rebuilder.check(key, &task, &mut ctx)?
    };

    let (values, info) = self.store.split_mut();
    rebuilder.record(key, &outcome, values, info)?;
    self.report.note(key, &outcome);
    self.visited.insert(key.clone());
    Ok(())
  }
}

/// Fetch policy: recurse into the demanded key, then read its value.
struct DemandProgress<'b, 'a, K: Eq + std::hash::Hash, V, R: Rebuilder<K, V>> {
  demand: &'b mut Demand<'a, K, V, R>,
}

impl<K, V, R> Progress<K, V, R::Info> for DemandProgress<'_, '_, K, V, R>
where
  K: BuildKey,
  V: BuildValue,
  R: Rebuilder<K, V>,
{
  fn stored(&self, key: &K) -> V {
    self.demand.store.value(key)
  }

  fn fetch(&mut self, key: &K) -> Result<V, Interrupt<K>> {
    trace!(key = ?key, "fetch");
    self.demand.ensure(key)?;
    Ok(self.demand.store.value(key))
  }

  fn info(&self) -> &R::Info {
    self.demand.store.info()
  }
}
