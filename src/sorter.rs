//! Dependency sorter — orders a batch of keyed entries so each entry comes
//! after the entries it depends on.
//!
//! The sorter knows nothing about tags. Entries expose two dependency sets
//! through [`DependencyEntry`]; required and optional edges both shape the
//! order, but an optional edge never makes its target mandatory and edges to
//! keys outside the batch are ignored.
//!
//! Every required edge is added before any optional one. An edge whose
//! insertion would close a cycle is left out of the graph and returned as a
//! [`BrokenEdge`], so sorting always terminates and the caller decides how to
//! report the cycle. Traversal uses an explicit stack, so very
//! long dependency chains cannot overflow the call stack.

use std::collections::HashSet;
use std::hash::Hash;

use indexmap::IndexMap;

/// An entry that can enumerate the keys it depends on.
pub trait DependencyEntry<K> {
    fn visit_required_dependencies(&self, visitor: &mut dyn FnMut(&K));
    fn visit_optional_dependencies(&self, visitor: &mut dyn FnMut(&K));
}

/// A dependency edge dropped because it would have closed a cycle.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BrokenEdge<K> {
    /// The entry that declared the dependency.
    pub from: K,
    /// The dependency that could not be ordered before `from`.
    pub to: K,
    pub required: bool,
}

/// Output of [`DependencySorter::order_by_dependencies`].
#[derive(Debug)]
pub struct Sorted<K, E> {
    /// Entries in dependency order.
    pub ordered: Vec<(K, E)>,
    /// Edges left out to keep the graph acyclic, in discovery order.
    pub broken: Vec<BrokenEdge<K>>,
}

/// Collects a batch of entries and emits them in dependency order.
///
/// Ties are broken by insertion order, so the output is deterministic.
#[derive(Debug)]
pub struct DependencySorter<K, E> {
    contents: IndexMap<K, E>,
}

impl<K, E> Default for DependencySorter<K, E> {
    fn default() -> Self {
        Self {
            contents: IndexMap::new(),
        }
    }
}

impl<K, E> DependencySorter<K, E>
where
    K: Clone + Eq + Hash,
    E: DependencyEntry<K>,
{
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an entry. A later entry with the same key replaces the earlier one
    /// but keeps its position.
    pub fn add_entry(&mut self, key: K, entry: E) -> &mut Self {
        self.contents.insert(key, entry);
        self
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.contents.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.contents.is_empty()
    }

    pub fn order_by_dependencies(self) -> Sorted<K, E> {
        let count = self.contents.len();
        let mut graph: Vec<Vec<usize>> = vec![Vec::new(); count];
        let mut broken = Vec::new();

        // Required edges claim the graph first, so a cycle mixing both kinds
        // is always broken at an optional edge.
        for required in [true, false] {
            for (from, (key, entry)) in self.contents.iter().enumerate() {
                let mut deps: Vec<K> = Vec::new();
                if required {
                    entry.visit_required_dependencies(&mut |dep| deps.push(dep.clone()));
                } else {
                    entry.visit_optional_dependencies(&mut |dep| deps.push(dep.clone()));
                }

                for dep in deps {
                    let Some(to) = self.contents.get_index_of(&dep) else {
                        continue;
                    };
                    if graph[from].contains(&to) {
                        continue;
                    }
                    if reaches(&graph, to, from) {
                        broken.push(BrokenEdge {
                            from: key.clone(),
                            to: dep,
                            required,
                        });
                        continue;
                    }
                    graph[from].push(to);
                }
            }
        }

        let order = post_order(&graph);

        let mut slots: Vec<Option<(K, E)>> = self.contents.into_iter().map(Some).collect();
        let ordered = order
            .into_iter()
            .filter_map(|idx| slots[idx].take())
            .collect();

        Sorted { ordered, broken }
    }
}

/// Whether `target` is reachable from `start` (a node reaches itself).
fn reaches(graph: &[Vec<usize>], start: usize, target: usize) -> bool {
    if start == target {
        return true;
    }
    let mut seen = HashSet::new();
    let mut stack = vec![start];
    while let Some(node) = stack.pop() {
        if !seen.insert(node) {
            continue;
        }
        for &next in &graph[node] {
            if next == target {
                return true;
            }
            stack.push(next);
        }
    }
    false
}

/// Depth-first post-order over an acyclic graph, roots in index order.
fn post_order(graph: &[Vec<usize>]) -> Vec<usize> {
    let mut visited = vec![false; graph.len()];
    let mut order = Vec::with_capacity(graph.len());
    let mut stack: Vec<(usize, usize)> = Vec::new();

    for root in 0..graph.len() {
        if visited[root] {
            continue;
        }
        visited[root] = true;
        stack.push((root, 0));

        while let Some((node, next)) = stack.last_mut() {
            match graph[*node].get(*next) {
                Some(&child) => {
                    *next += 1;
                    if !visited[child] {
                        visited[child] = true;
                        stack.push((child, 0));
                    }
                }
                None => {
                    order.push(*node);
                    stack.pop();
                }
            }
        }
    }

    order
}

// =============================================================================
// Tests
// =============================================================================
