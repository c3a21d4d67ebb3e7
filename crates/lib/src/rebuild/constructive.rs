//! Constructive-trace rebuilding.
//!
//! As verifying traces, but every trace's result fingerprint is also a key
//! into a content-addressable value cache. A trace whose dependency
//! fingerprints match can therefore supply the value outright: a cache hit
//! that skips execution on machines that never computed the key, not merely a
//! cutoff.

use serde::{Deserialize, Serialize};
use tracing::debug;
use treadle_core::{ContentDigest, ContentStore, Fingerprint, MemoryContentStore, ValueStore};

use crate::rebuild::verifying::fingerprint_deps;
use crate::rebuild::{Outcome, Progress, ProgressFetch, Rebuilder};
use crate::task::Task;
use crate::trace::{Trace, TraceStore};
use crate::track;
use crate::types::{BuildError, BuildKey, BuildValue, Interrupt};

/// Metadata for [`Constructive`]: traces plus the content-addressable table.
///
/// The fields are public so hosts can seed `objects` from a shared cache (or
/// drain it into one) between builds; remote backends integrate through the
/// [`ContentStore`] contract at that boundary, the engine itself always works
/// against the in-memory table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConstructiveInfo<K, V> {
  pub traces: TraceStore<K>,
  pub objects: MemoryContentStore<V>,
}

impl<K, V> Default for ConstructiveInfo<K, V> {
  fn default() -> Self {
    Self {
      traces: TraceStore::default(),
      objects: MemoryContentStore::default(),
    }
  }
}

impl<K, V> ConstructiveInfo<K, V> {
  pub fn new() -> Self {
    Self::default()
  }
}

/// The cloud-build rebuilder: traces decide staleness, the content cache
/// supplies values without execution.
pub struct Constructive;

impl<K, V> Rebuilder<K, V> for Constructive
where
  K: BuildKey,
  V: BuildValue + Fingerprint,
{
  type Info = ConstructiveInfo<K, V>;

  fn check(
    &self,
    key: &K,
    task: &Task<K, V>,
    ctx: &mut dyn Progress<K, V, Self::Info>,
  ) -> Result<Outcome<K, V>, Interrupt<K>> {
    let candidates: Vec<Trace<K>> = ctx.info().traces.for_key(key).cloned().collect();

    // Every trace whose dependencies all match contributes a candidate result.
    let mut matching: Vec<ContentDigest> = Vec::new();
    'candidates: for trace in candidates {
      for (dep, recorded) in &trace.depends {
        let value = ctx.fetch(dep)?;
        if value.fingerprint()? != *recorded {
          continue 'candidates;
        }
      }
      matching.push(trace.result);
    }

    if !matching.is_empty() {
      let current = ctx.stored(key).fingerprint()?;
      if matching.contains(&current) {
        debug!(key = ?key, "trace verified, reusing stored value");
        return Ok(Outcome::UpToDate);
      }
      for digest in &matching {
        if let Some(value) = ctx.info().objects.lookup(digest) {
          debug!(key = ?key, digest = %digest, "restoring value from content cache");
          return Ok(Outcome::Restored { value });
        }
      }
    }

    debug!(key = ?key, "no usable trace, executing task");
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
        let result = value.fingerprint()?;
        info.traces.record(Trace {
          key: key.clone(),
          depends: fingerprint_deps(deps, values)?,
          result: result.clone(),
        });
        info.objects.insert(result, value.clone());
      }
      Outcome::Restored { value } => {
        values.put(key.clone(), value.clone());
      }
    }
    Ok(())
  }
}
