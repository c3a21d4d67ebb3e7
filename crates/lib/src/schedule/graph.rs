//! Static dependency graph shared by the ordered schedulers.
//!
//! Materializes the transitive closure of a target's static dependencies and
//! answers the two questions ordered execution needs: a topological order,
//! and parallel waves of mutually independent keys.

use std::collections::{HashMap, HashSet};

use petgraph::Direction;
use petgraph::algo::toposort;
use petgraph::graph::{DiGraph, NodeIndex};

use crate::task::{Capability, Rules};
use crate::track;
use crate::types::{BuildError, BuildKey, BuildValue};

/// Dependency graph over the target's transitive closure.
///
/// Edges run from dependency to dependent.
pub struct StaticGraph<K> {
  graph: DiGraph<K, ()>,
  nodes: HashMap<K, NodeIndex>,
}

impl<K: BuildKey> StaticGraph<K> {
  /// Walk static dependencies from `target`, materializing the closure.
  ///
  /// Fails with `CapabilityMismatch` if any reachable key's task declares
  /// dynamic dependencies, since its fetched keys cannot be enumerated up
  /// front.
  pub fn from_rules<V: BuildValue + Default>(rules: &dyn Rules<K, V>, target: &K) -> Result<Self, BuildError> {
    let mut graph = DiGraph::new();
    let mut nodes: HashMap<K, NodeIndex> = HashMap::new();
    let mut expanded: HashSet<K> = HashSet::new();
    let mut pending = vec![target.clone()];

    Self::node(&mut graph, &mut nodes, target);

    while let Some(key) = pending.pop() {
      if !expanded.insert(key.clone()) {
        continue;
      }
      let Some(task) = rules.task(&key) else {
        // Inputs are leaves
        continue;
      };
      if task.capability() != Capability::Static {
        return Err(BuildError::CapabilityMismatch {
          supported: Capability::Static,
          required: Capability::Dynamic,
        });
      }

      let key_idx = Self::node(&mut graph, &mut nodes, &key);
      let mut seen = HashSet::new();
      for dep in track::static_dependencies(&task)? {
        if !seen.insert(dep.clone()) {
          continue;
        }
        let dep_idx = Self::node(&mut graph, &mut nodes, &dep);
        // Edge from dependency to dependent
        graph.add_edge(dep_idx, key_idx, ());
        pending.push(dep);
      }
    }

    Ok(Self { graph, nodes })
  }

  fn node(graph: &mut DiGraph<K, ()>, nodes: &mut HashMap<K, NodeIndex>, key: &K) -> NodeIndex {
    if let Some(&idx) = nodes.get(key) {
      return idx;
    }
    let idx = graph.add_node(key.clone());
    nodes.insert(key.clone(), idx);
    idx
  }

  /// Keys in dependency-before-dependent order.
  pub fn topological(&self) -> Result<Vec<K>, BuildError> {
    let sorted = toposort(&self.graph, None).map_err(|_| BuildError::CycleDetected)?;
    Ok(sorted.into_iter().map(|idx| self.graph[idx].clone()).collect())
  }

  /// Keys grouped into parallel waves.
  ///
  /// Each wave contains keys whose dependencies all live in earlier waves,
  /// so the members of one wave can be brought up to date concurrently.
  pub fn waves(&self) -> Result<Vec<Vec<K>>, BuildError> {
    // Kahn's algorithm variant, assigning each node a level
    let mut in_degree: HashMap<NodeIndex, usize> = HashMap::new();
    let mut node_level: HashMap<NodeIndex, usize> = HashMap::new();

    for idx in self.graph.node_indices() {
      in_degree.insert(idx, self.graph.neighbors_directed(idx, Direction::Incoming).count());
    }

    let mut current_level = 0;
    let mut remaining: HashSet<NodeIndex> = self.graph.node_indices().collect();

    while !remaining.is_empty() {
      let ready: Vec<NodeIndex> = remaining.iter().filter(|&&idx| in_degree[&idx] == 0).copied().collect();

      if ready.is_empty() {
        return Err(BuildError::CycleDetected);
      }

      for &idx in &ready {
        node_level.insert(idx, current_level);
        remaining.remove(&idx);

        for neighbor in self.graph.neighbors_directed(idx, Direction::Outgoing) {
          if let Some(deg) = in_degree.get_mut(&neighbor) {
            *deg = deg.saturating_sub(1);
          }
        }
      }

      current_level += 1;
    }

    let max_level = node_level.values().copied().max().unwrap_or(0);
    let mut waves: Vec<Vec<K>> = vec![Vec::new(); max_level + 1];

    for idx in self.graph.node_indices() {
      if let Some(&level) = node_level.get(&idx) {
        waves[level].push(self.graph[idx].clone());
      }
    }

    waves.retain(|w| !w.is_empty());
    Ok(waves)
  }

  /// Number of keys in the closure.
  pub fn len(&self) -> usize {
    self.nodes.len()
  }

  pub fn is_empty(&self) -> bool {
    self.nodes.is_empty()
  }
}
