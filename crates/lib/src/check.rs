//! Executable correctness criterion.
//!
//! A build result is correct when some store consistent with the rules agrees
//! with it on the target and on everything the target transitively reads. The
//! checker below uses the result itself as that witness: it re-runs every
//! reachable task against the result's values and demands the stored value
//! back. Test harnesses call this after every build; schedulers never do.

use std::collections::HashSet;

use treadle_core::ValueStore;

use crate::task::Rules;
use crate::track::{self, StoreFetch};
use crate::types::{BuildError, BuildKey, BuildValue};

/// Keys reachable from `target` through the dependencies each task actually
/// reads against `values`, target first.
pub fn reachable<K, V>(rules: &dyn Rules<K, V>, values: &ValueStore<K, V>, target: &K) -> Result<Vec<K>, BuildError>
where
  K: BuildKey,
  V: BuildValue,
{
  let mut seen: HashSet<K> = HashSet::new();
  let mut ordered: Vec<K> = Vec::new();
  let mut pending = vec![target.clone()];

  while let Some(key) = pending.pop() {
    if !seen.insert(key.clone()) {
      continue;
    }
    ordered.push(key.clone());

    if let Some(task) = rules.task(&key) {
      let mut fetch = StoreFetch { values };
      let (_, deps) = track::track(&task, &mut fetch).map_err(crate::types::Interrupt::into_build_error)?;
      pending.extend(deps);
    }
  }

  Ok(ordered)
}

/// Does the result store agree with recomputation on the target's closure?
///
/// Every reachable key with a task must hold exactly the value the task
/// produces against the result's own values; reachable keys without a task
/// are inputs and agree by definition.
pub fn correct_build<K, V>(rules: &dyn Rules<K, V>, values: &ValueStore<K, V>, target: &K) -> Result<bool, BuildError>
where
  K: BuildKey,
  V: BuildValue + PartialEq,
{
  for key in reachable(rules, values, target)? {
    let Some(task) = rules.task(&key) else {
      continue;
    };
    if track::recompute(&task, values)? != values.value(&key) {
      return Ok(false);
    }
  }
  Ok(true)
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::task::{RuleSet, Task};

  fn sheet() -> RuleSet<&'static str, i64> {
    let mut rules = RuleSet::new();
    rules.insert("b1", Task::fixed(|fetch| Ok(fetch.fetch(&"a1")? + fetch.fetch(&"a2")?)));
    rules.insert("b2", Task::fixed(|fetch| Ok(fetch.fetch(&"b1")? * 2)));
    rules
  }

  fn consistent_values() -> ValueStore<&'static str, i64> {
    let mut values = ValueStore::new(0_i64);
    values.put("a1", 10);
    values.put("a2", 20);
    values.put("b1", 30);
    values.put("b2", 60);
    values
  }

  #[test]
  fn reachable_covers_the_closure_target_first() {
    let keys = reachable(&sheet(), &consistent_values(), &"b2").unwrap();
    assert_eq!(keys[0], "b2");
    assert_eq!(keys.len(), 4);
    for key in ["b1", "a1", "a2"] {
      assert!(keys.contains(&key));
    }
  }

  #[test]
  fn consistent_store_passes() {
    assert!(correct_build(&sheet(), &consistent_values(), &"b2").unwrap());
  }

  #[test]
  fn stale_intermediate_fails() {
    let mut values = consistent_values();
    values.put("b1", 29);
    assert!(!correct_build(&sheet(), &values, &"b2").unwrap());
  }

  #[test]
  fn stale_value_outside_the_closure_is_ignored() {
    let mut rules = sheet();
    rules.insert("unrelated", Task::fixed(|fetch| Ok(fetch.fetch(&"a1")? + 99)));

    let mut values = consistent_values();
    values.put("unrelated", -1);
    assert!(correct_build(&rules, &values, &"b2").unwrap());
  }

  #[test]
  fn dynamic_reachability_follows_the_live_selector() {
    let mut rules: RuleSet<&'static str, i64> = RuleSet::new();
    rules.insert(
      "pick",
      Task::dynamic(|fetch| {
        let selector = fetch.fetch(&"selector")?;
        if selector == 0 { fetch.fetch(&"a1") } else { fetch.fetch(&"a2") }
      }),
    );

    let mut values = ValueStore::new(0_i64);
    values.put("selector", 1);
    values.put("a1", 10);
    values.put("a2", 20);

    let keys = reachable(&rules, &values, &"pick").unwrap();
    assert!(keys.contains(&"a2"));
    assert!(!keys.contains(&"a1"));
  }
}
