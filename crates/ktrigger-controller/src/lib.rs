//! # ktrigger-controller
//!
//! Turns source revision changes into ordered reconcile requests.
//!
//! When a source (repository or bucket) publishes a new artifact revision,
//! this crate works out which consumers reference that source, drops those
//! that already attempted the revision, and returns the rest ordered so that
//! every prerequisite precedes its dependents.
//!
//! - **Reference Index**: key derivation from a consumer to its source
//! - **Consumer Cache**: indexed, point-in-time consumer listing
//! - **Dependency Sequencer**: deterministic dependency ordering with cycle detection
//! - **Revision Change Mapper**: the filter-then-order pipeline per event
//! - **Watch Handlers**: one statically typed handler per source kind
//!
//! ## Guarantees
//!
//! - **Deterministic**: the same cache state and event yield the same order
//! - **Idempotent**: repeated delivery of an event is harmless
//! - **Fail-quiet**: listing failures and cycles emit nothing and never panic
//!
//! ## Example
//!
//! ```rust
//! use std::sync::Arc;
//!
//! use ktrigger_controller::prelude::*;
//! use ktrigger_core::prelude::*;
//!
//! let cache = Arc::new(InMemoryConsumerCache::new());
//! register_source_indexes(&cache).unwrap();
//! cache
//!     .upsert(Kustomization::new(
//!         "apps",
//!         "web",
//!         CrossNamespaceSourceReference::new(SourceKind::GitRepository, "repo"),
//!     ))
//!     .unwrap();
//!
//! let controller = TriggerController::new(Arc::clone(&cache), TriggerConfig::default());
//! let repo = GitRepository::new("apps", "repo")
//!     .with_artifact(Artifact::new("main/1a2b3c", "http://source/repo.tar.gz"));
//!
//! let requests = controller.on_git_repository_change(&repo);
//! assert_eq!(requests, vec![ReconcileRequest::new("apps", "web")]);
//! ```

#![forbid(unsafe_code)]
#![deny(missing_docs)]
#![deny(rust_2018_idioms)]
#![warn(clippy::pedantic)]

// Internal modules - not exposed in public API.
pub(crate) mod dag;

pub mod cache;
pub mod config;
pub mod error;
pub mod index;
pub mod mapper;
pub mod metrics;
pub mod request;
pub mod sequencer;
pub mod watch;

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::cache::{ConsumerLister, InMemoryConsumerCache};
    pub use crate::config::TriggerConfig;
    pub use crate::error::{Error, Result};
    pub use crate::index::{BUCKET_INDEX, GIT_REPOSITORY_INDEX, SourceIndex, index_key_for};
    pub use crate::mapper::{MappingOutcome, MappingStatus, RevisionChangeMapper};
    pub use crate::metrics::TriggerMetrics;
    pub use crate::request::{
        EnqueueResult, InMemoryRequestQueue, ReconcileRequest, RequestQueue, enqueue_all,
    };
    pub use crate::sequencer::{DagSorter, DependencyNode, DependencySorter};
    pub use crate::watch::{SourceEvent, TriggerController, register_source_indexes};
}
