//! Scheduler strategies: visitation order and missing-dependency policy.
//!
//! A scheduler decides which keys to visit, in what order, and what happens
//! when a key's dependency is not yet available; the per-key reuse decision
//! is always delegated to the rebuilder. All scheduler state here is
//! transient to one run except the restarting queue order, which is layered
//! into the store metadata as [`Sequenced`].

mod graph;
mod parallel;
mod restarting;
mod suspending;
mod topological;

pub use parallel::ParallelTopological;
pub use restarting::{Restarting, Sequenced};
pub use suspending::Suspending;
pub use topological::Topological;

pub(crate) use graph::StaticGraph;

use treadle_core::Store;

use crate::rebuild::{Outcome, Progress, Rebuilder};
use crate::task::{Capability, Rules};
use crate::types::{BuildError, BuildKey, BuildValue, Interrupt};

/// Per-run summary of what the engine did, in completion order.
#[derive(Debug, Clone, PartialEq)]
pub struct BuildReport<K> {
  /// Keys whose task ran.
  pub executed: Vec<K>,
  /// Keys restored from the content cache without running.
  pub restored: Vec<K>,
  /// Keys checked and reused as-is.
  pub reused: Vec<K>,
  /// Keys requeued because a dependency was not yet available. A key appears
  /// once per restart, so repeats are meaningful.
  pub restarted: Vec<K>,
}

impl<K> Default for BuildReport<K> {
  fn default() -> Self {
    Self {
      executed: Vec::new(),
      restored: Vec::new(),
      reused: Vec::new(),
      restarted: Vec::new(),
    }
  }
}

impl<K: Clone> BuildReport<K> {
  pub(crate) fn note<V>(&mut self, key: &K, outcome: &Outcome<K, V>) {
    match outcome {
      Outcome::Executed { .. } => self.executed.push(key.clone()),
      Outcome::Restored { .. } => self.restored.push(key.clone()),
      Outcome::UpToDate => self.reused.push(key.clone()),
    }
  }
}

/// A visitation strategy over a rule set.
///
/// `Info<RI>` is the store-metadata shape the scheduler needs when driving a
/// rebuilder whose own metadata is `RI`: the identity for schedulers with no
/// durable state of their own, a wrapper for those that persist ordering.
pub trait Scheduler<K: BuildKey, V: BuildValue> {
  type Info<RI: Send + Sync>: Send + Sync;

  /// The strongest task capability this scheduler can drive.
  fn supports(&self) -> Capability;

  /// Bring `target` up to date, mutating `store` in place.
  fn run<R: Rebuilder<K, V>>(
    &self,
    rules: &dyn Rules<K, V>,
    target: &K,
    rebuilder: &R,
    store: &mut Store<K, V, Self::Info<R::Info>>,
  ) -> Result<BuildReport<K>, BuildError>;
}

/// Context whose fetch simply reads the store, for schedulers that guarantee
/// dependencies are already current when a key is visited.
pub(crate) struct StoreProgress<'a, K: Eq + std::hash::Hash, V, I> {
  pub(crate) store: &'a Store<K, V, I>,
}

impl<K: BuildKey, V: BuildValue, I> Progress<K, V, I> for StoreProgress<'_, K, V, I> {
  fn stored(&self, key: &K) -> V {
    self.store.value(key)
  }

  fn fetch(&mut self, key: &K) -> Result<V, Interrupt<K>> {
    Ok(self.store.value(key))
  }

  fn info(&self) -> &I {
    self.store.info()
  }
}
