//! Object identity primitives.
//!
//! Every watched object is addressed by a namespace and a name. The
//! `namespace/name` rendering of an [`ObjectKey`] is the canonical form used
//! for cache index keys and log fields.
//!
//! # Example
//!
//! ```rust
//! use ktrigger_core::object::{ObjectKey, SourceKind};
//!
//! let key = ObjectKey::new("flux-system", "podinfo");
//! assert_eq!(key.to_string(), "flux-system/podinfo");
//! assert_eq!("Bucket".parse::<SourceKind>().unwrap(), SourceKind::Bucket);
//! ```

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Namespaced object identity.
///
/// Ordering is by namespace, then name. This ordering is the tie-break used
/// wherever a deterministic sequence of objects is required.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectKey {
    /// Namespace the object lives in.
    pub namespace: String,
    /// Object name within the namespace.
    pub name: String,
}

impl ObjectKey {
    /// Creates a new object key.
    #[must_use]
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            name: name.into(),
        }
    }
}

impl fmt::Display for ObjectKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.namespace, self.name)
    }
}

/// Standard object metadata.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectMeta {
    /// Namespace the object lives in.
    pub namespace: String,
    /// Object name within the namespace.
    pub name: String,
}

impl ObjectMeta {
    /// Creates metadata for the given namespace and name.
    #[must_use]
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            name: name.into(),
        }
    }

    /// Returns the key identifying this object.
    #[must_use]
    pub fn key(&self) -> ObjectKey {
        ObjectKey::new(self.namespace.clone(), self.name.clone())
    }
}

/// The kinds of artifact-producing source objects a consumer can reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum SourceKind {
    /// A repository checkout.
    GitRepository,
    /// An object-store bundle.
    Bucket,
}

impl SourceKind {
    /// All recognised source kinds.
    pub const ALL: [Self; 2] = [Self::GitRepository, Self::Bucket];

    /// Returns the API kind name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::GitRepository => "GitRepository",
            Self::Bucket => "Bucket",
        }
    }
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SourceKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "GitRepository" => Ok(Self::GitRepository),
            "Bucket" => Ok(Self::Bucket),
            other => Err(Error::InvalidKind {
                kind: other.to_string(),
            }),
        }
    }
}
