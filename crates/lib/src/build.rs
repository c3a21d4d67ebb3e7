//! Binding a scheduler to a rebuilder.
//!
//! Every scheduler × rebuilder pair is a valid build system as long as the
//! scheduler's capability covers what the rules demand; the composer enforces
//! that before any task runs. The named constructors below are the classic
//! points in the design space.

use tracing::debug;
use treadle_core::Store;

use crate::rebuild::{Constructive, DirtyBit, Rebuilder, Verifying};
use crate::schedule::{BuildReport, Restarting, Scheduler, Suspending, Topological};
use crate::task::Rules;
use crate::types::{BuildError, BuildKey, BuildValue};

/// A complete build system: one scheduler bound to one rebuilder.
pub struct Build<S, R> {
  scheduler: S,
  rebuilder: R,
}

impl<S, R> Build<S, R> {
  pub fn new(scheduler: S, rebuilder: R) -> Self {
    Self { scheduler, rebuilder }
  }

  /// Bring `target` up to date, mutating `store` in place.
  ///
  /// Rejects the composition, before visiting anything, when the rules
  /// require a capability the scheduler cannot drive.
  pub fn build<K, V>(
    &self,
    rules: &dyn Rules<K, V>,
    target: &K,
    store: &mut Store<K, V, S::Info<R::Info>>,
  ) -> Result<BuildReport<K>, BuildError>
  where
    K: BuildKey,
    V: BuildValue,
    S: Scheduler<K, V>,
    R: Rebuilder<K, V>,
  {
    let supported = self.scheduler.supports();
    let required = rules.capability();
    if !supported.covers(required) {
      return Err(BuildError::CapabilityMismatch { supported, required });
    }

    debug!(target = ?target, "starting build");
    self.scheduler.run(rules, target, &self.rebuilder, store)
  }
}

/// Ordered execution with dirty-bit change detection, the way Make works.
pub fn make() -> Build<Topological, DirtyBit> {
  Build::new(Topological, DirtyBit)
}

/// Restarting recalculation over dirty cells, the way Excel works.
pub fn excel() -> Build<Restarting, DirtyBit> {
  Build::new(Restarting, DirtyBit)
}

/// Demand-driven suspension with verifying traces, the way Shake works.
pub fn shake() -> Build<Suspending, Verifying> {
  Build::new(Suspending, Verifying)
}

/// Restarting execution with constructive traces, the way Bazel works.
pub fn bazel() -> Build<Restarting, Constructive> {
  Build::new(Restarting, Constructive)
}

/// Demand-driven suspension with constructive traces: Shake against a
/// shared content cache.
pub fn cloud_shake() -> Build<Suspending, Constructive> {
  Build::new(Suspending, Constructive)
}
