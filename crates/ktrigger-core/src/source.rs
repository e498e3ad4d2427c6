//! Upstream source objects and the artifacts they produce.
//!
//! A source fetches content (a repository checkout or an object-store bundle)
//! and publishes it as an [`Artifact`]. A source without an artifact has never
//! produced output.
//!
//! Each source kind is its own concrete type. Handlers are written against the
//! [`SourceObject`] trait and monomorphised per kind, so a handler can never be
//! handed an object of the wrong kind.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::object::{ObjectKey, ObjectMeta, SourceKind};

/// Output produced by a source reconciliation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Artifact {
    /// Opaque version token for the produced snapshot (e.g. `main/1a2b3c`).
    pub revision: String,
    /// Location the artifact can be downloaded from.
    pub url: String,
    /// Content checksum, when the producer computed one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub checksum: Option<String>,
    /// When the artifact was last produced.
    pub last_update_time: DateTime<Utc>,
}

impl Artifact {
    /// Creates an artifact for the given revision, stamped now.
    #[must_use]
    pub fn new(revision: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            revision: revision.into(),
            url: url.into(),
            checksum: None,
            last_update_time: Utc::now(),
        }
    }
}

/// Observed state of a source.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceStatus {
    /// The latest artifact, absent until the first successful fetch.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub artifact: Option<Artifact>,
}

/// Common view over all source kinds.
pub trait SourceObject {
    /// The kind discriminant for this type.
    const KIND: SourceKind;

    /// Returns the object's metadata.
    fn meta(&self) -> &ObjectMeta;

    /// Returns the current artifact, if any.
    fn artifact(&self) -> Option<&Artifact>;

    /// Returns the key identifying this source.
    fn key(&self) -> ObjectKey {
        self.meta().key()
    }
}

/// A source backed by a git repository.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GitRepository {
    /// Object metadata.
    pub metadata: ObjectMeta,
    /// Observed state.
    #[serde(default)]
    pub status: SourceStatus,
}

impl GitRepository {
    /// Creates a repository source with no artifact.
    #[must_use]
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            metadata: ObjectMeta::new(namespace, name),
            status: SourceStatus::default(),
        }
    }

    /// Sets the artifact, as a completed fetch would.
    #[must_use]
    pub fn with_artifact(mut self, artifact: Artifact) -> Self {
        self.status.artifact = Some(artifact);
        self
    }
}

impl SourceObject for GitRepository {
    const KIND: SourceKind = SourceKind::GitRepository;

    fn meta(&self) -> &ObjectMeta {
        &self.metadata
    }

    fn artifact(&self) -> Option<&Artifact> {
        self.status.artifact.as_ref()
    }
}

/// A source backed by an object-store bucket.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Bucket {
    /// Object metadata.
    pub metadata: ObjectMeta,
    /// Observed state.
    #[serde(default)]
    pub status: SourceStatus,
}

impl Bucket {
    /// Creates a bucket source with no artifact.
    #[must_use]
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            metadata: ObjectMeta::new(namespace, name),
            status: SourceStatus::default(),
        }
    }

    /// Sets the artifact, as a completed fetch would.
    #[must_use]
    pub fn with_artifact(mut self, artifact: Artifact) -> Self {
        self.status.artifact = Some(artifact);
        self
    }
}

impl SourceObject for Bucket {
    const KIND: SourceKind = SourceKind::Bucket;

    fn meta(&self) -> &ObjectMeta {
        &self.metadata
    }

    fn artifact(&self) -> Option<&Artifact> {
        self.status.artifact.as_ref()
    }
}
