//! Wave-parallel ordered execution.
//!
//! The parallel variant of the topological scheduler. Keys are grouped into
//! dependency waves; within a wave every key's dependencies are already
//! final, so checks (including task execution) run concurrently on the rayon
//! pool against a shared read-only view of the store. All writes, values and
//! metadata alike, happen on the calling thread between waves, keeping the
//! store single-writer.

use rayon::prelude::*;
use tracing::debug;
use treadle_core::Store;

use crate::rebuild::{Outcome, Rebuilder};
use crate::schedule::{BuildReport, Scheduler, StaticGraph, StoreProgress};
use crate::task::{Capability, Rules};
use crate::types::{BuildError, BuildKey, BuildValue, Interrupt};

/// Concurrency bounded only by the width of the dependency graph.
pub struct ParallelTopological;

impl<K, V> Scheduler<K, V> for ParallelTopological
where
  K: BuildKey,
  V: BuildValue + Default,
{
  type Info<RI: Send + Sync> = RI;

  fn supports(&self) -> Capability {
    Capability::Static
  }

  fn run<R: Rebuilder<K, V>>(
    &self,
    rules: &dyn Rules<K, V>,
    target: &K,
    rebuilder: &R,
    store: &mut Store<K, V, R::Info>,
  ) -> Result<BuildReport<K>, BuildError> {
    let graph = StaticGraph::from_rules(rules, target)?;
    let waves = graph.waves()?;
    debug!(target = ?target, waves = waves.len(), "visiting closure in parallel waves");

    let mut report = BuildReport::default();
    for wave in waves {
      // Check concurrently against the finalized store, record serially.
      let outcomes: Vec<(K, Outcome<K, V>)> = {
        let snapshot = &*store;
        wave
          .into_par_iter()
          .filter_map(|key| rules.task(&key).map(|task| (key, task)))
          .map(|(key, task)| {
            let mut ctx = StoreProgress { store: snapshot };
            rebuilder
              .check(&key, &task, &mut ctx)
              .map(|outcome| (key, outcome))
              .map_err(Interrupt::into_build_error)
          })
          .collect::<Result<Vec<_>, BuildError>>()?
      };

      for (key, outcome) in outcomes {
        let (values, info) = store.split_mut();
        rebuilder.record(&key, &outcome, values, info)?;
        report.note(&key, &outcome);
      }
    }

    let (values, info) = store.split_mut();
    rebuilder.finalize(values, info);
    Ok(report)
  }
}
