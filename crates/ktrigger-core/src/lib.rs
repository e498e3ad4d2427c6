//! # ktrigger-core
//!
//! Shared primitives for the ktrigger source-change triggering pipeline.
//!
//! - **Object identity**: namespaced keys and source kinds
//! - **Sources**: repository and bucket objects with their artifacts
//! - **Consumers**: the `Kustomization` object, its source reference and
//!   declared dependencies
//! - **Error Types**: shared error definitions and result types
//! - **Observability**: logging initialisation and span helpers
//!
//! ## Example
//!
//! ```rust
//! use ktrigger_core::prelude::*;
//!
//! let repo = GitRepository::new("flux-system", "podinfo")
//!     .with_artifact(Artifact::new("main/1a2b3c", "http://source/podinfo.tar.gz"));
//!
//! let app = Kustomization::new(
//!     "apps",
//!     "podinfo",
//!     CrossNamespaceSourceReference::new(SourceKind::GitRepository, "podinfo")
//!         .in_namespace("flux-system"),
//! );
//!
//! assert_eq!(app.source_key(), repo.key());
//! ```

#![forbid(unsafe_code)]
#![deny(missing_docs)]
#![deny(rust_2018_idioms)]
#![warn(clippy::pedantic)]

pub mod error;
pub mod kustomization;
pub mod object;
pub mod observability;
pub mod source;

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::error::{Error, Result};
    pub use crate::kustomization::{
        CrossNamespaceSourceReference, Dependent, DependencyReference, Kustomization,
        KustomizationSpec, KustomizationStatus,
    };
    pub use crate::object::{ObjectKey, ObjectMeta, SourceKind};
    pub use crate::source::{Artifact, Bucket, GitRepository, SourceObject, SourceStatus};
}

pub use error::{Error, Result};
pub use kustomization::{Dependent, Kustomization};
pub use object::{ObjectKey, ObjectMeta, SourceKind};
pub use observability::{LogFormat, init_logging};
pub use source::{Artifact, Bucket, GitRepository, SourceObject};
