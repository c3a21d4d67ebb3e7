//! Trace-verifying rebuilding.
//!
//! Reuse is driven by fingerprint equality: a key is up to date when some
//! recorded trace matches its current value and the current fingerprints of
//! every dependency that trace names. A dependency that was recomputed to a
//! bit-identical value therefore stops recomputation from propagating, which
//! is the early-cutoff behavior the dirty bit cannot express.

use serde::{Deserialize, Serialize};
use tracing::debug;
use treadle_core::{ContentDigest, Fingerprint, ValueStore};

use crate::rebuild::{Outcome, Progress, ProgressFetch, Rebuilder};
use crate::task::Task;
use crate::trace::{Trace, TraceStore};
use crate::track;
use crate::types::{BuildError, BuildKey, BuildValue, Interrupt};

/// Metadata for [`Verifying`]: the append-only trace collection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VerifyingInfo<K> {
  traces: TraceStore<K>,
}

impl<K> Default for VerifyingInfo<K> {
  fn default() -> Self {
    Self {
      traces: TraceStore::default(),
    }
  }
}

impl<K: Eq> VerifyingInfo<K> {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn traces(&self) -> &TraceStore<K> {
    &self.traces
  }
}

/// The Shake-style rebuilder: fingerprints decide reuse, enabling early
/// cutoff.
pub struct Verifying;

/// Does `trace` still describe the present? Checks every recorded dependency
/// fingerprint against the live value, fetched through the scheduler so it is
/// current before being judged.
fn trace_matches<K, V, I>(trace: &Trace<K>, ctx: &mut dyn Progress<K, V, I>) -> Result<bool, Interrupt<K>>
where
  K: BuildKey,
  V: BuildValue + Fingerprint,
{
  for (dep, recorded) in &trace.depends {
    let value = ctx.fetch(dep)?;
    if value.fingerprint()? != *recorded {
      return Ok(false);
    }
  }
  Ok(true)
}

/// Fingerprint the dependency set of a fresh execution against current store
/// values, deduplicating repeated fetches.
pub(crate) fn fingerprint_deps<K, V>(deps: &[K], values: &ValueStore<K, V>) -> Result<Vec<(K, ContentDigest)>, BuildError>
where
  K: BuildKey,
  V: BuildValue + Fingerprint,
{
  let mut seen = std::collections::HashSet::new();
  let mut depends = Vec::new();
  for dep in deps {
    if seen.insert(dep.clone()) {
      depends.push((dep.clone(), values.value(dep).fingerprint()?));
    }
  }
  Ok(depends)
}

impl<K, V> Rebuilder<K, V> for Verifying
where
  K: BuildKey,
  V: BuildValue + Fingerprint,
{
  type Info = VerifyingInfo<K>;

  fn check(
    &self,
    key: &K,
    task: &Task<K, V>,
    ctx: &mut dyn Progress<K, V, Self::Info>,
  ) -> Result<Outcome<K, V>, Interrupt<K>> {
    // Snapshot the candidates up front: fetches below may append traces for
    // dependencies behind our back.
    let candidates: Vec<Trace<K>> = ctx.info().traces.for_key(key).cloned().collect();
    let current = ctx.stored(key).fingerprint()?;

    for trace in candidates {
      if trace.result != current {
        continue;
      }
      if trace_matches(&trace, ctx)? {
        debug!(key = ?key, "trace verified, reusing stored value");
        return Ok(Outcome::UpToDate);
      }
    }

    debug!(key = ?key, "no trace matches, executing task");
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
        info.traces.record(Trace {
          key: key.clone(),
          depends: fingerprint_deps(deps, values)?,
          result: value.fingerprint()?,
        });
      }
      Outcome::Restored { value } => {
        values.put(key.clone(), value.clone());
      }
    }
    Ok(())
  }
}
