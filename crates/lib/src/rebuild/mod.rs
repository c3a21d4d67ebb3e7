//! Rebuilder strategies: decide whether a cached value may be reused.
//!
//! A rebuilder answers one question per key (can the stored value stand, or
//! must the task run) and owns the metadata that question is answered from.
//! The contract is split in two so concurrent schedulers can stay
//! single-writer: [`Rebuilder::check`] reads metadata and may execute the
//! task, [`Rebuilder::record`] commits the outcome, and every scheduler
//! serializes its `record` calls.

mod constructive;
mod dirty;
mod verifying;

pub use constructive::{Constructive, ConstructiveInfo};
pub use dirty::{DirtyBit, DirtyInfo};
pub use verifying::{Verifying, VerifyingInfo};

use treadle_core::ValueStore;

use crate::task::{Fetch, Task};
use crate::types::{BuildError, Interrupt};

/// What [`Rebuilder::check`] decided for one key.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome<K, V> {
  /// The stored value was verified current; nothing to write.
  UpToDate,
  /// The task ran and produced `value`, having fetched `deps` in order.
  Executed { value: V, deps: Vec<K> },
  /// A content-cache value stands in; the task never ran.
  Restored { value: V },
}

/// What a rebuilder sees of the build while checking one key: current store
/// values, its own metadata, and the scheduler's fetch policy.
pub trait Progress<K, V, I> {
  /// Current stored value of a key, without bringing it up to date.
  fn stored(&self, key: &K) -> V;

  /// Bring a key up to date under the scheduler's policy and return its
  /// value. May recurse (suspending), signal `Blocked` (restarting), or read
  /// the store directly (topological, where dependencies are already
  /// current).
  fn fetch(&mut self, key: &K) -> Result<V, Interrupt<K>>;

  /// Strategy metadata. Read-only during a check; a fetch may append to it
  /// behind the scenes, so borrows must not be held across fetches.
  fn info(&self) -> &I;
}

/// View a progress context as a plain fetch, for running tasks through it.
pub(crate) struct ProgressFetch<'a, K, V, I>(pub(crate) &'a mut dyn Progress<K, V, I>);

impl<K, V, I> Fetch<K, V> for ProgressFetch<'_, K, V, I> {
  fn fetch(&mut self, key: &K) -> Result<V, Interrupt<K>> {
    self.0.fetch(key)
  }
}

/// Per-key reuse decisions plus the metadata they are made from.
pub trait Rebuilder<K: Eq + std::hash::Hash, V>: Send + Sync {
  /// Shape of the persistent metadata this strategy keeps in the store.
  type Info: Send + Sync;

  /// Decide whether `key` must run, bringing dependencies up to date through
  /// the context, and execute the task if the stored value cannot be reused.
  ///
  /// Must not write through the context; all mutation happens in `record`.
  fn check(&self, key: &K, task: &Task<K, V>, ctx: &mut dyn Progress<K, V, Self::Info>)
  -> Result<Outcome<K, V>, Interrupt<K>>;

  /// Commit an outcome: write the value and append strategy metadata.
  fn record(
    &self,
    key: &K,
    outcome: &Outcome<K, V>,
    values: &mut ValueStore<K, V>,
    info: &mut Self::Info,
  ) -> Result<(), BuildError>;

  /// End-of-build hook, called once after the scheduler finishes.
  fn finalize(&self, _values: &ValueStore<K, V>, _info: &mut Self::Info) {}
}
