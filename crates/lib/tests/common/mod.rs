//! Shared fixtures for the engine integration tests.
#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use treadle_core::ValueStore;
use treadle_lib::task::{Fetch, RuleSet, Rules, Task};
use treadle_lib::types::{BuildKey, BuildValue, Interrupt};

pub type Cell = &'static str;

/// Per-key execution counters, incremented from inside task bodies.
///
/// Only meaningful for trace rebuilders: the dirty-bit strategy re-extracts
/// static dependencies by running the task against a recording fetch, which
/// would inflate these.
pub type Counts = Arc<Mutex<HashMap<Cell, usize>>>;

pub fn new_counts() -> Counts {
  Arc::new(Mutex::new(HashMap::new()))
}

pub fn count_of(counts: &Counts, key: Cell) -> usize {
  *counts.lock().unwrap().get(key).unwrap_or(&0)
}

fn counted(
  counts: &Counts,
  key: Cell,
  f: impl Fn(&mut dyn Fetch<Cell, i64>) -> Result<i64, Interrupt<Cell>> + Send + Sync + 'static,
) -> Task<Cell, i64> {
  let counts = Arc::clone(counts);
  Task::fixed(move |fetch| {
    *counts.lock().unwrap().entry(key).or_insert(0) += 1;
    f(fetch)
  })
}

/// The two-input spreadsheet: `b1 = a1 + a2`, `b2 = b1 * 2`.
pub fn sheet_rules() -> RuleSet<Cell, i64> {
  let mut rules = RuleSet::new();
  rules.insert("b1", Task::fixed(|fetch| Ok(fetch.fetch(&"a1")? + fetch.fetch(&"a2")?)));
  rules.insert("b2", Task::fixed(|fetch| Ok(fetch.fetch(&"b1")? * 2)));
  rules
}

/// The sheet with execution counters on both derived cells.
pub fn counted_sheet_rules(counts: &Counts) -> RuleSet<Cell, i64> {
  let mut rules = RuleSet::new();
  rules.insert(
    "b1",
    counted(counts, "b1", |fetch| Ok(fetch.fetch(&"a1")? + fetch.fetch(&"a2")?)),
  );
  rules.insert("b2", counted(counts, "b2", |fetch| Ok(fetch.fetch(&"b1")? * 2)));
  rules
}

/// The sheet with `b1` clamped so edits to `a1` can leave it unchanged:
/// `b1 = min(a1 + a2, 30)`.
pub fn clamped_sheet_rules(counts: &Counts) -> RuleSet<Cell, i64> {
  let mut rules = RuleSet::new();
  rules.insert(
    "b1",
    counted(counts, "b1", |fetch| {
      Ok((fetch.fetch(&"a1")? + fetch.fetch(&"a2")?).min(30))
    }),
  );
  rules.insert("b2", counted(counts, "b2", |fetch| Ok(fetch.fetch(&"b1")? * 2)));
  rules
}

/// A dynamic rule set: `pick` reads `selector` and then one of `a1`/`a2`.
pub fn selector_rules() -> RuleSet<Cell, i64> {
  let mut rules = RuleSet::new();
  rules.insert(
    "pick",
    Task::dynamic(|fetch| {
      let selector = fetch.fetch(&"selector")?;
      if selector == 0 { fetch.fetch(&"a1") } else { fetch.fetch(&"a2") }
    }),
  );
  rules.insert("double", Task::dynamic(|fetch| Ok(fetch.fetch(&"pick")? * 2)));
  rules
}

/// The no-memory baseline: fetch everything, every time, remember nothing.
///
/// Useful purely as an oracle for what a correct build must produce.
pub fn busy<K: BuildKey, V: BuildValue>(rules: &dyn Rules<K, V>, target: &K, values: &mut ValueStore<K, V>) -> V {
  struct BusyFetch<'a, K: BuildKey, V> {
    rules: &'a dyn Rules<K, V>,
    values: &'a mut ValueStore<K, V>,
  }

  impl<K: BuildKey, V: BuildValue> Fetch<K, V> for BusyFetch<'_, K, V> {
    fn fetch(&mut self, key: &K) -> Result<V, Interrupt<K>> {
      match self.rules.task(key) {
        Some(task) => {
          let value = task.run(self)?;
          self.values.put(key.clone(), value.clone());
          Ok(value)
        }
        None => Ok(self.values.value(key)),
      }
    }
  }

  let mut fetch = BusyFetch { rules, values };
  fetch.fetch(target).map_err(|_| "busy build interrupted").unwrap()
}
