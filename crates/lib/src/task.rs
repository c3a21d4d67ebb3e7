//! Task descriptors and the rule table.
//!
//! A task is a pure description of how to compute one key's value from
//! others. Its only window on the world is the [`Fetch`] callback handed to
//! it; it never touches the store or any metadata directly. Which fetch
//! implementation it receives (recording, tracking, store-reading,
//! scheduler-owned) is the engine's choice, and that dependency injection is
//! what lets one task definition serve every scheduler and rebuilder.

use std::collections::HashMap;
use std::fmt;
use std::hash::Hash;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::types::Interrupt;

/// How a task discovers its dependencies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Capability {
  /// The fetched key set is fixed and enumerable without running the task.
  Static,
  /// Fetched keys may depend on previously fetched values, discoverable only
  /// by running the task.
  Dynamic,
}

impl Capability {
  /// Whether a scheduler supporting `self` can drive tasks requiring
  /// `required`.
  pub fn covers(self, required: Capability) -> bool {
    matches!((self, required), (Capability::Dynamic, _) | (_, Capability::Static))
  }
}

/// The callback a task uses to obtain a dependency's value.
pub trait Fetch<K, V> {
  fn fetch(&mut self, key: &K) -> Result<V, Interrupt<K>>;
}

type TaskFn<K, V> = dyn Fn(&mut dyn Fetch<K, V>) -> Result<V, Interrupt<K>> + Send + Sync;

/// A pure description of how to compute one key's value from others.
pub struct Task<K, V> {
  capability: Capability,
  run: Box<TaskFn<K, V>>,
}

impl<K, V> Task<K, V> {
  pub fn new(
    capability: Capability,
    run: impl Fn(&mut dyn Fetch<K, V>) -> Result<V, Interrupt<K>> + Send + Sync + 'static,
  ) -> Self {
    Self {
      capability,
      run: Box::new(run),
    }
  }

  /// A task whose fetched key set is fixed.
  ///
  /// The contract is behavioral: the closure must request the same keys
  /// whatever values its fetch hands back.
  pub fn fixed(run: impl Fn(&mut dyn Fetch<K, V>) -> Result<V, Interrupt<K>> + Send + Sync + 'static) -> Self {
    Self::new(Capability::Static, run)
  }

  /// A task that may choose keys based on previously fetched values.
  pub fn dynamic(run: impl Fn(&mut dyn Fetch<K, V>) -> Result<V, Interrupt<K>> + Send + Sync + 'static) -> Self {
    Self::new(Capability::Dynamic, run)
  }

  pub fn capability(&self) -> Capability {
    self.capability
  }

  pub fn run(&self, fetch: &mut dyn Fetch<K, V>) -> Result<V, Interrupt<K>> {
    (self.run)(fetch)
  }
}

impl<K, V> fmt::Debug for Task<K, V> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("Task").field("capability", &self.capability).finish_non_exhaustive()
  }
}

/// The task-descriptor table: key → task, or `None` for input keys.
///
/// Sourced externally (makefile parser, formula evaluator, rule DSL); the
/// engine only ever asks it two questions.
pub trait Rules<K, V>: Send + Sync {
  fn task(&self, key: &K) -> Option<Arc<Task<K, V>>>;

  /// The weakest capability a scheduler must support to drive these rules.
  fn capability(&self) -> Capability;
}

/// Map-backed rule table.
pub struct RuleSet<K, V> {
  tasks: HashMap<K, Arc<Task<K, V>>>,
}

impl<K: Eq + Hash, V> RuleSet<K, V> {
  pub fn new() -> Self {
    Self { tasks: HashMap::new() }
  }

  /// Register the task computing `key`. Keys never inserted are inputs.
  pub fn insert(&mut self, key: K, task: Task<K, V>) {
    self.tasks.insert(key, Arc::new(task));
  }

  pub fn len(&self) -> usize {
    self.tasks.len()
  }

  pub fn is_empty(&self) -> bool {
    self.tasks.is_empty()
  }
}

impl<K: Eq + Hash, V> Default for RuleSet<K, V> {
  fn default() -> Self {
    Self::new()
  }
}

impl<K, V> Rules<K, V> for RuleSet<K, V>
where
  K: Eq + Hash + Send + Sync,
  V: Send + Sync,
{
  fn task(&self, key: &K) -> Option<Arc<Task<K, V>>> {
    self.tasks.get(key).cloned()
  }

  fn capability(&self) -> Capability {
    if self.tasks.values().any(|t| t.capability() == Capability::Dynamic) {
      Capability::Dynamic
    } else {
      Capability::Static
    }
  }
}
