//! Dependency-aware ordering of candidate consumers.
//!
//! The mapper hands the sequencer every consumer it intends to wake up; the
//! sequencer returns them in an order where each prerequisite precedes the
//! consumers that depend on it. Ordering is injected through the
//! [`DependencySorter`] trait so tests can substitute a scripted sorter.
//!
//! ## Rules
//!
//! - Only dependencies between members of the candidate set constrain the
//!   order. A prerequisite that is not itself a candidate (already current,
//!   or bound to another source) is ignored.
//! - Among consumers with no outstanding prerequisite, the lexicographically
//!   smallest `namespace/name` goes first, so repeated runs over the same
//!   set produce the same order.
//! - Any cycle fails the whole batch; no partial order is ever returned.

use std::collections::HashMap;

use ktrigger_core::{Dependent, ObjectKey};

use crate::dag::Dag;
use crate::error::{Error, Result};

/// One entry handed to a [`DependencySorter`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DependencyNode {
    /// Identity of the dependent.
    pub key: ObjectKey,
    /// Identities it must follow.
    pub depends_on: Vec<ObjectKey>,
}

impl DependencyNode {
    /// Creates a node with the given prerequisites.
    #[must_use]
    pub fn new(key: ObjectKey, depends_on: Vec<ObjectKey>) -> Self {
        Self { key, depends_on }
    }

    /// Captures a dependent's identity and resolved prerequisites.
    #[must_use]
    pub fn from_dependent<D: Dependent + ?Sized>(dependent: &D) -> Self {
        Self::new(dependent.dependent_key(), dependent.depends_on())
    }
}

impl Dependent for DependencyNode {
    fn dependent_key(&self) -> ObjectKey {
        self.key.clone()
    }

    fn depends_on(&self) -> Vec<ObjectKey> {
        self.depends_on.clone()
    }
}

/// Orders a set of dependents.
pub trait DependencySorter: Send + Sync {
    /// Returns the keys of `nodes` in dependency order.
    ///
    /// # Errors
    ///
    /// Returns [`crate::error::Error::CycleDetected`] when no valid order exists.
    fn sort(&self, nodes: &[DependencyNode]) -> Result<Vec<ObjectKey>>;
}

/// Default sorter backed by the internal DAG.
#[derive(Debug, Clone, Copy, Default)]
pub struct DagSorter;

impl DependencySorter for DagSorter {
    fn sort(&self, nodes: &[DependencyNode]) -> Result<Vec<ObjectKey>> {
        let mut ordered: Vec<&DependencyNode> = nodes.iter().collect();
        ordered.sort_by(|a, b| a.key.cmp(&b.key));

        // Insertion order is the tie-break, so insert sorted by key.
        let mut dag: Dag<ObjectKey> = Dag::new();
        for node in &ordered {
            dag.add_node(node.key.clone());
        }

        for node in &ordered {
            let Some(dependent) = dag.get_index(&node.key) else {
                continue;
            };
            for prerequisite in &node.depends_on {
                if let Some(prerequisite) = dag.get_index(prerequisite) {
                    dag.add_edge(prerequisite, dependent)?;
                }
            }
        }

        dag.toposort()
    }
}

/// Sorts dependents with `sorter` and returns them reordered.
///
/// Duplicate keys collapse to the first occurrence. The sorter must return
/// every distinct key exactly once.
///
/// # Errors
///
/// Propagates the sorter's error, and returns [`Error::InvalidOrder`] when
/// the sorter drops, repeats, or invents keys.
pub fn order<D, S>(sorter: &S, dependents: Vec<D>) -> Result<Vec<D>>
where
    D: Dependent,
    S: DependencySorter + ?Sized,
{
    let nodes: Vec<DependencyNode> = dependents
        .iter()
        .map(DependencyNode::from_dependent)
        .collect();
    let sorted = sorter.sort(&nodes)?;

    let mut by_key: HashMap<ObjectKey, D> = HashMap::with_capacity(dependents.len());
    for dependent in dependents {
        by_key.entry(dependent.dependent_key()).or_insert(dependent);
    }

    let mut ordered = Vec::with_capacity(by_key.len());
    let mut unexpected = Vec::new();
    for key in sorted {
        match by_key.remove(&key) {
            Some(dependent) => ordered.push(dependent),
            None => unexpected.push(key.to_string()),
        }
    }

    if !by_key.is_empty() || !unexpected.is_empty() {
        let mut missing: Vec<ObjectKey> = by_key.into_keys().collect();
        missing.sort();
        return Err(Error::InvalidOrder {
            missing: missing.iter().map(ToString::to_string).collect(),
            unexpected,
        });
    }

    Ok(ordered)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(name: &str) -> ObjectKey {
        ObjectKey::new("ns", name)
    }

    fn node(name: &str, deps: &[&str]) -> DependencyNode {
        DependencyNode::new(key(name), deps.iter().map(|d| key(d)).collect())
    }

    #[test]
    fn independent_nodes_sort_lexicographically() {
        let sorted = DagSorter
            .sort(&[node("c", &[]), node("a", &[]), node("b", &[])])
            .unwrap();
        assert_eq!(sorted, vec![key("a"), key("b"), key("c")]);
    }

    #[test]
    fn namespace_orders_before_name() {
        let sorted = DagSorter
            .sort(&[
                DependencyNode::new(ObjectKey::new("b", "a"), vec![]),
                DependencyNode::new(ObjectKey::new("a", "z"), vec![]),
            ])
            .unwrap();
        assert_eq!(sorted, vec![ObjectKey::new("a", "z"), ObjectKey::new("b", "a")]);
    }

    #[test]
    fn prerequisite_precedes_dependent() {
        let sorted = DagSorter
            .sort(&[node("a", &["z"]), node("z", &[])])
            .unwrap();
        assert_eq!(sorted, vec![key("z"), key("a")]);
    }

    #[test]
    fn prerequisites_outside_the_set_are_ignored() {
        let sorted = DagSorter
            .sort(&[node("b", &["missing"]), node("a", &[])])
            .unwrap();
        assert_eq!(sorted, vec![key("a"), key("b")]);
    }

    #[test]
    fn diamond_orders_deterministically() {
        let nodes = [
            node("top", &[]),
            node("left", &["top"]),
            node("right", &["top"]),
            node("bottom", &["left", "right"]),
        ];
        let sorted = DagSorter.sort(&nodes).unwrap();
        assert_eq!(sorted, vec![key("top"), key("left"), key("right"), key("bottom")]);
    }

    #[test]
    fn cycle_fails_the_batch() {
        let err = DagSorter
            .sort(&[node("a", &["b"]), node("b", &["a"]), node("c", &[])])
            .unwrap_err();
        assert!(err.is_cycle());
    }

    #[test]
    fn self_dependency_is_a_cycle() {
        assert!(DagSorter.sort(&[node("a", &["a"])]).unwrap_err().is_cycle());
    }

    #[test]
    fn empty_input_sorts_to_nothing() {
        assert!(DagSorter.sort(&[]).unwrap().is_empty());
    }

    #[test]
    fn order_returns_values_in_sorted_sequence() {
        #[derive(Debug, PartialEq)]
        struct Item(&'static str, Vec<&'static str>);

        impl Dependent for Item {
            fn dependent_key(&self) -> ObjectKey {
                key(self.0)
            }

            fn depends_on(&self) -> Vec<ObjectKey> {
                self.1.iter().map(|d| key(d)).collect()
            }
        }

        let ordered = order(
            &DagSorter,
            vec![Item("app", vec!["db"]), Item("db", vec![]), Item("app", vec![])],
        )
        .unwrap();
        assert_eq!(ordered, vec![Item("db", vec![]), Item("app", vec!["db"])]);
    }

    struct ScriptedSorter(Vec<ObjectKey>);

    impl DependencySorter for ScriptedSorter {
        fn sort(&self, _nodes: &[DependencyNode]) -> Result<Vec<ObjectKey>> {
            Ok(self.0.clone())
        }
    }

    fn keyed(names: &[&str]) -> Vec<DependencyNode> {
        names.iter().map(|n| node(n, &[])).collect()
    }

    #[test]
    fn order_rejects_dropped_keys() {
        let err = order(&ScriptedSorter(vec![key("b")]), keyed(&["a", "b"])).unwrap_err();
        match err {
            Error::InvalidOrder {
                missing,
                unexpected,
            } => {
                assert_eq!(missing, vec!["ns/a"]);
                assert!(unexpected.is_empty());
            }
            other => panic!("expected invalid order, got {other:?}"),
        }
    }

    #[test]
    fn order_rejects_invented_and_repeated_keys() {
        let sorter = ScriptedSorter(vec![key("a"), key("ghost"), key("a")]);
        let err = order(&sorter, keyed(&["a"])).unwrap_err();
        match err {
            Error::InvalidOrder {
                missing,
                unexpected,
            } => {
                assert!(missing.is_empty());
                assert_eq!(unexpected, vec!["ns/ghost", "ns/a"]);
            }
            other => panic!("expected invalid order, got {other:?}"),
        }
    }
}
