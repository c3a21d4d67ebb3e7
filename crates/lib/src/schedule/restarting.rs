//! Queue-driven scheduling that restarts interrupted keys.
//!
//! Keys are processed from an ordered queue seeded by the previous run's
//! completion order. When a key's check trips over a dependency that has not
//! been built this run, the key is abandoned and reinserted just after the
//! blocking key; over successive runs the persisted order converges and
//! restarts become rare. A key may therefore run more than once per build:
//! this scheduler trades minimality for never suspending.

use std::collections::{HashSet, VecDeque};

use serde::{Deserialize, Serialize};
use tracing::{debug, trace};
use treadle_core::Store;

use crate::rebuild::{Progress, Rebuilder};
use crate::schedule::{BuildReport, Scheduler};
use crate::task::{Capability, Rules};
use crate::types::{BuildError, BuildKey, BuildValue, Interrupt};

/// Scheduler metadata: rebuilder state plus the persisted build order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sequenced<RI, K> {
  pub inner: RI,
  /// Completion order of the previous run, seeding the next queue.
  pub order: Vec<K>,
}

impl<RI: Default, K> Default for Sequenced<RI, K> {
  fn default() -> Self {
    Self {
      inner: RI::default(),
      order: Vec::new(),
    }
  }
}

/// Excel/Bazel-style queue scheduling.
pub struct Restarting;

impl<K, V> Scheduler<K, V> for Restarting
where
  K: BuildKey,
  V: BuildValue,
{
  type Info<RI: Send + Sync> = Sequenced<RI, K>;

  fn supports(&self) -> Capability {
    Capability::Dynamic
  }

  fn run<R: Rebuilder<K, V>>(
    &self,
    rules: &dyn Rules<K, V>,
    target: &K,
    rebuilder: &R,
    store: &mut Store<K, V, Sequenced<R::Info, K>>,
  ) -> Result<BuildReport<K>, BuildError> {
    let mut queue: VecDeque<K> = store
      .info()
      .order
      .iter()
      .filter(|key| rules.task(key).is_some())
      .cloned()
      .collect();
    if rules.task(target).is_some() && !queue.contains(target) {
      queue.push_back(target.clone());
    }

    let mut done: HashSet<K> = HashSet::new();
    let mut completed: Vec<K> = Vec::new();
    let mut report = BuildReport::default();

    while let Some(key) = queue.pop_front() {
      if done.contains(&key) {
        continue;
      }
      let Some(task) = rules.task(&key) else {
        continue;
      };

      let result = {
        let mut ctx = Blocking {
          store: &*store,
          rules,
          done: &done,
        };
        rebuilder.check(&key, &task, &mut ctx)
      };

      match result {
        Err(Interrupt::Blocked { key: dep }) => {
          debug!(key = ?key, blocked_on = ?dep, "restarting");
          report.restarted.push(key.clone());
          // Reinsert just after the blocking key, pulling the blocker to the
          // front if it was never queued (a freshly discovered dynamic
          // dependency).
          match queue.iter().position(|queued| *queued == dep) {
            Some(pos) => queue.insert(pos + 1, key),
            None => {
              queue.push_front(key);
              queue.push_front(dep);
            }
          }
        }
        Err(Interrupt::Failed(e)) => return Err(e),
        Ok(outcome) => {
          let (values, info) = store.split_mut();
          rebuilder.record(&key, &outcome, values, &mut info.inner)?;
          report.note(&key, &outcome);
          done.insert(key.clone());
          completed.push(key);
        }
      }
    }

    // This run's completion order seeds the next; keys not reached this run
    // keep their old relative positions at the tail.
    let previous = std::mem::take(&mut store.info_mut().order);
    let mut order = completed;
    order.extend(previous.into_iter().filter(|key| !done.contains(key)));
    store.info_mut().order = order;

    let (values, info) = store.split_mut();
    rebuilder.finalize(values, &mut info.inner);
    Ok(report)
  }
}

/// Fetch policy: a key with a task that has not completed this run blocks;
/// everything else reads straight from the store.
struct Blocking<'a, K: BuildKey, V, RI> {
  store: &'a Store<K, V, Sequenced<RI, K>>,
  rules: &'a dyn Rules<K, V>,
  done: &'a HashSet<K>,
}

impl<K, V, RI> Progress<K, V, RI> for Blocking<'_, K, V, RI>
where
  K: BuildKey,
  V: BuildValue,
{
  fn stored(&self, key: &K) -> V {
    self.store.value(key)
  }

  fn fetch(&mut self, key: &K) -> Result<V, Interrupt<K>> {
    if self.rules.task(key).is_some() && !self.done.contains(key) {
      return Err(Interrupt::Blocked { key: key.clone() });
    }
    trace!(key = ?key, "fetch");
    Ok(self.store.value(key))
  }

  fn info(&self) -> &RI {
    &self.store.info().inner
  }
}
