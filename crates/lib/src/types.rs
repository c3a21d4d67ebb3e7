//! Shared engine types: key/value bounds, errors, and the missing-dependency
//! signal.

use std::fmt;
use std::hash::Hash;

use thiserror::Error;

use crate::task::Capability;

/// Bounds every key type must satisfy.
///
/// A key is an opaque, equality-comparable, hashable identifier for one unit
/// of computation (a file path, a cell name). No ordering is assumed.
pub trait BuildKey: Clone + Eq + Hash + fmt::Debug + Send + Sync + 'static {}

impl<T: Clone + Eq + Hash + fmt::Debug + Send + Sync + 'static> BuildKey for T {}

/// Bounds every value type must satisfy.
///
/// Strategies add their own: dirty-bit comparison needs `PartialEq`, traces
/// need [`treadle_core::Fingerprint`], static dependency extraction needs
/// `Default` for its placeholder values.
pub trait BuildValue: Clone + fmt::Debug + Send + Sync + 'static {}

impl<T: Clone + fmt::Debug + Send + Sync + 'static> BuildValue for T {}

/// Errors surfaced by a build.
#[derive(Debug, Error)]
pub enum BuildError {
  /// A scheduler was paired with tasks it cannot drive.
  #[error("scheduler drives {supported:?} tasks but the rules require {required:?}")]
  CapabilityMismatch {
    supported: Capability,
    required: Capability,
  },

  /// The static dependency graph contains a cycle.
  #[error("dependency cycle detected")]
  CycleDetected,

  /// A value could not be fingerprinted.
  #[error("fingerprint failed: {0}")]
  Digest(#[from] treadle_core::DigestError),

  /// A task signalled a missing dependency outside a restarting scheduler.
  ///
  /// Tasks only ever propagate the signal from their fetch callback, so this
  /// indicates a task fabricating control flow it does not own.
  #[error("missing-dependency signal escaped its scheduler")]
  StrayBlock,
}

/// Control signal raised while bringing a key up to date.
///
/// `Blocked` is not a failure: it means "retry this key once `key` is
/// available" and is consumed by the restarting scheduler. Tasks propagate it
/// with `?` like any other fetch result.
#[derive(Debug)]
pub enum Interrupt<K> {
  /// A required key has not been built yet this run.
  Blocked { key: K },
  /// Unrecoverable engine failure.
  Failed(BuildError),
}

impl<K> Interrupt<K> {
  /// Collapse into a plain error, for schedulers whose fetch never blocks.
  pub fn into_build_error(self) -> BuildError {
    match self {
      Interrupt::Failed(e) => e,
      Interrupt::Blocked { .. } => BuildError::StrayBlock,
    }
  }
}

impl<K> From<BuildError> for Interrupt<K> {
  fn from(e: BuildError) -> Self {
    Interrupt::Failed(e)
  }
}

impl<K> From<treadle_core::DigestError> for Interrupt<K> {
  fn from(e: treadle_core::DigestError) -> Self {
    Interrupt::Failed(BuildError::Digest(e))
  }
}
