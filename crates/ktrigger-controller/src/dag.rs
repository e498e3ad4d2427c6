//! Directed graph used to order dependents.
//!
//! Edges point from a prerequisite to the object that depends on it, so a
//! topological order lists prerequisites first.
//!
//! **Note:** This module is internal to `ktrigger-controller`; the public
//! seam is [`crate::sequencer::DependencySorter`].

use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashMap};
use std::fmt::Display;
use std::hash::Hash;

use petgraph::Direction;
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::EdgeRef;

use crate::error::{Error, Result};

/// A directed graph with deterministic topological sorting.
///
/// Node indices are handed out in insertion order, and the sort always emits
/// the earliest-inserted node among those whose prerequisites are satisfied.
/// Callers control the tie-break by choosing the insertion order.
#[derive(Debug, Clone)]
pub struct Dag<T>
where
    T: Clone + Eq + Hash + Display,
{
    graph: DiGraph<T, ()>,
    index_map: HashMap<T, NodeIndex>,
}

impl<T> Dag<T>
where
    T: Clone + Eq + Hash + Display,
{
    /// Creates a new empty graph.
    #[must_use]
    pub fn new() -> Self {
        Self {
            graph: DiGraph::new(),
            index_map: HashMap::new(),
        }
    }

    /// Returns the number of nodes.
    #[must_use]
    #[cfg(test)]
    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    /// Returns the number of edges.
    #[must_use]
    #[cfg(test)]
    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    /// Adds a node, or returns the existing index if already present.
    pub fn add_node(&mut self, value: T) -> NodeIndex {
        if let Some(&idx) = self.index_map.get(&value) {
            return idx;
        }
        let idx = self.graph.add_node(value.clone());
        self.index_map.insert(value, idx);
        idx
    }

    /// Adds an edge meaning `from` must be ordered before `to`.
    ///
    /// Adding the same edge twice is a no-op.
    ///
    /// # Errors
    ///
    /// Returns an error if either node index is invalid.
    pub fn add_edge(&mut self, from: NodeIndex, to: NodeIndex) -> Result<()> {
        for idx in [from, to] {
            self.graph
                .node_weight(idx)
                .ok_or_else(|| Error::DagNodeNotFound {
                    node: format!("index {}", idx.index()),
                })?;
        }
        self.graph.update_edge(from, to, ());
        Ok(())
    }

    /// Returns the nodes in topological order.
    ///
    /// Kahn's algorithm over a min-heap of node indices: whenever several
    /// nodes are ready, the earliest inserted is emitted first.
    ///
    /// # Errors
    ///
    /// Returns [`Error::CycleDetected`] listing every node that could not be
    /// ordered, in insertion order.
    pub fn toposort(&self) -> Result<Vec<T>> {
        let node_count = self.graph.node_count();
        let mut in_degree: HashMap<NodeIndex, usize> = self
            .graph
            .node_indices()
            .map(|idx| (idx, 0))
            .collect();
        for edge in self.graph.edge_references() {
            *in_degree.entry(edge.target()).or_insert(0) += 1;
        }

        let mut ready: BinaryHeap<Reverse<NodeIndex>> = in_degree
            .iter()
            .filter(|&(_, &deg)| deg == 0)
            .map(|(&idx, _)| Reverse(idx))
            .collect();

        let mut result = Vec::with_capacity(node_count);
        while let Some(Reverse(idx)) = ready.pop() {
            let node = self
                .graph
                .node_weight(idx)
                .ok_or_else(|| Error::DagNodeNotFound {
                    node: format!("index {}", idx.index()),
                })?;
            result.push(node.clone());

            for neighbor in self.graph.neighbors_directed(idx, Direction::Outgoing) {
                if let Some(deg) = in_degree.get_mut(&neighbor) {
                    *deg = deg.saturating_sub(1);
                    if *deg == 0 {
                        ready.push(Reverse(neighbor));
                    }
                }
            }
        }

        if result.len() != node_count {
            let mut stuck: Vec<NodeIndex> = in_degree
                .into_iter()
                .filter(|&(_, deg)| deg > 0)
                .map(|(idx, _)| idx)
                .collect();
            stuck.sort_unstable();
            let cycle = stuck
                .into_iter()
                .filter_map(|idx| self.graph.node_weight(idx))
                .map(ToString::to_string)
                .collect();
            return Err(Error::CycleDetected { cycle });
        }

        Ok(result)
    }

    /// Returns true if the node exists.
    #[must_use]
    #[cfg(test)]
    pub fn contains(&self, node: &T) -> bool {
        self.index_map.contains_key(node)
    }

    /// Returns the node index for a value, if it exists.
    #[must_use]
    pub fn get_index(&self, value: &T) -> Option<NodeIndex> {
        self.index_map.get(value).copied()
    }
}

impl<T> Default for Dag<T>
where
    T: Clone + Eq + Hash + Display,
{
    fn default() -> Self {
        Self::new()
    }
}
