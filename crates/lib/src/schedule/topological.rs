//! Ordered execution over the static dependency graph.

use tracing::debug;
use treadle_core::Store;

use crate::rebuild::Rebuilder;
use crate::schedule::{BuildReport, Scheduler, StaticGraph, StoreProgress};
use crate::task::{Capability, Rules};
use crate::types::{BuildError, BuildKey, BuildValue, Interrupt};

/// Visit the target's closure in topological order, each key exactly once.
///
/// Every dependency is already current when a key is visited, so the fetch
/// handed to the rebuilder is a plain store read. The linear order leaves no
/// room for revisits, which is exactly why this scheduler cannot drive
/// dynamic dependencies.
pub struct Topological;

impl<K, V> Scheduler<K, V> for Topological
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
    let order = graph.topological()?;
    debug!(target = ?target, keys = order.len(), "visiting closure in topological order");

    let mut report = BuildReport::default();
    for key in order {
      let Some(task) = rules.task(&key) else {
        continue;
      };

      let mut ctx = StoreProgress { store: &*store };
      let outcome = rebuilder
        .check(&key, &task, &mut ctx)
        .map_err(Interrupt::into_build_error)?;

      let (values, info) = store.split_mut();
      rebuilder.record(&key, &outcome, values, info)?;
      report.note(&key, &outcome);
    }

    let (values, info) = store.split_mut();
    rebuilder.finalize(values, info);
    Ok(report)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::rebuild::{DirtyBit, DirtyInfo};
  use crate::task::{RuleSet, Task};

  #[test]
  fn builds_dependencies_before_dependents() {
    let mut rules: RuleSet<&'static str, i64> = RuleSet::new();
    rules.insert("b1", Task::fixed(|fetch| Ok(fetch.fetch(&"a1")? + fetch.fetch(&"a2")?)));
    rules.insert("b2", Task::fixed(|fetch| Ok(fetch.fetch(&"b1")? * 2)));

    let mut store = Store::new(DirtyInfo::new(), 0_i64);
    store.put("a1", 10);
    store.put("a2", 20);

    let report = Topological.run(&rules, &"b2", &DirtyBit, &mut store).unwrap();
    assert_eq!(store.value(&"b1"), 30);
    assert_eq!(store.value(&"b2"), 60);
    assert_eq!(report.executed, vec!["b1", "b2"]);
  }

  #[test]
  fn input_target_builds_nothing() {
    let rules: RuleSet<&'static str, i64> = RuleSet::new();
    let mut store = Store::new(DirtyInfo::new(), 0_i64);
    store.put("a1", 10);

    let report = Topological.run(&rules, &"a1", &DirtyBit, &mut store).unwrap();
    assert!(report.executed.is_empty());
    assert_eq!(store.value(&"a1"), 10);
  }
}
