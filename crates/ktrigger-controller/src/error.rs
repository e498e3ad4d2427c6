//! Error types for the triggering pipeline.

/// The result type used throughout ktrigger-controller.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while computing reconcile requests.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A cycle was detected in the dependency graph.
    #[error("cycle detected in dependency graph: {cycle:?}")]
    CycleDetected {
        /// Objects left unordered when sorting stopped.
        cycle: Vec<String>,
    },

    /// A DAG node was not found (internal graph operation error).
    #[error("DAG node not found: {node}")]
    DagNodeNotFound {
        /// The node identifier (index or value).
        node: String,
    },

    /// A sorter returned an order that is not a permutation of its input.
    #[error("invalid dependency order: missing {missing:?}, unexpected {unexpected:?}")]
    InvalidOrder {
        /// Input objects absent from the returned order.
        missing: Vec<String>,
        /// Returned objects that were not in the input, or were returned twice.
        unexpected: Vec<String>,
    },

    /// An error from ktrigger-core.
    #[error("core error: {0}")]
    Core(#[from] ktrigger_core::Error),
}

impl Error {
    /// Returns true if this error reports a dependency cycle.
    #[must_use]
    pub const fn is_cycle(&self) -> bool {
        matches!(self, Self::CycleDetected { .. })
    }
}
