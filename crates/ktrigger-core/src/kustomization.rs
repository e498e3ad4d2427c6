//! The `Kustomization` consumer object.
//!
//! A kustomization reconciles content from exactly one source, named by its
//! `sourceRef`, and may declare other kustomizations it depends on. Both kinds
//! of reference may omit the namespace, in which case the kustomization's own
//! namespace applies.

use serde::{Deserialize, Serialize};

use crate::object::{ObjectKey, ObjectMeta, SourceKind};

/// Reference to a source object, possibly in another namespace.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CrossNamespaceSourceReference {
    /// Kind of the referenced source.
    pub kind: SourceKind,
    /// Name of the referenced source.
    pub name: String,
    /// Namespace of the referenced source; defaults to the referrer's namespace.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
}

impl CrossNamespaceSourceReference {
    /// Creates a reference to a source in the referrer's namespace.
    #[must_use]
    pub fn new(kind: SourceKind, name: impl Into<String>) -> Self {
        Self {
            kind,
            name: name.into(),
            namespace: None,
        }
    }

    /// Pins the reference to an explicit namespace.
    #[must_use]
    pub fn in_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = Some(namespace.into());
        self
    }
}

/// Reference to another kustomization this one depends on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DependencyReference {
    /// Name of the prerequisite.
    pub name: String,
    /// Namespace of the prerequisite; defaults to the dependent's namespace.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
}

impl DependencyReference {
    /// Creates a same-namespace dependency reference.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            namespace: None,
        }
    }

    /// Creates a dependency reference into an explicit namespace.
    #[must_use]
    pub fn namespaced(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            namespace: Some(namespace.into()),
        }
    }
}

/// Desired state of a kustomization, as far as triggering is concerned.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KustomizationSpec {
    /// The single source this kustomization consumes.
    pub source_ref: CrossNamespaceSourceReference,
    /// Kustomizations that must be reconciled before this one.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub depends_on: Vec<DependencyReference>,
}

/// Observed state, written by the reconciler.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KustomizationStatus {
    /// Source revision of the most recent reconciliation attempt.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_attempted_revision: Option<String>,
    /// Source revision of the most recent successful apply.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_applied_revision: Option<String>,
}

/// A downstream consumer of a source artifact.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Kustomization {
    /// Object metadata.
    pub metadata: ObjectMeta,
    /// Desired state.
    pub spec: KustomizationSpec,
    /// Observed state.
    #[serde(default)]
    pub status: KustomizationStatus,
}

impl Kustomization {
    /// Creates a kustomization consuming the given source.
    #[must_use]
    pub fn new(
        namespace: impl Into<String>,
        name: impl Into<String>,
        source_ref: CrossNamespaceSourceReference,
    ) -> Self {
        Self {
            metadata: ObjectMeta::new(namespace, name),
            spec: KustomizationSpec {
                source_ref,
                depends_on: Vec::new(),
            },
            status: KustomizationStatus::default(),
        }
    }

    /// Adds a prerequisite.
    #[must_use]
    pub fn depending_on(mut self, dependency: DependencyReference) -> Self {
        self.spec.depends_on.push(dependency);
        self
    }

    /// Records the last attempted revision, as the reconciler would.
    #[must_use]
    pub fn with_last_attempted_revision(mut self, revision: impl Into<String>) -> Self {
        self.status.last_attempted_revision = Some(revision.into());
        self
    }

    /// Returns the key identifying this kustomization.
    #[must_use]
    pub fn key(&self) -> ObjectKey {
        self.metadata.key()
    }

    /// Returns the key of the referenced source, with the namespace resolved.
    ///
    /// The result ignores `sourceRef.kind`.
    #[must_use]
    pub fn source_key(&self) -> ObjectKey {
        let source_ref = &self.spec.source_ref;
        let namespace = source_ref
            .namespace
            .as_deref()
            .filter(|ns| !ns.is_empty())
            .unwrap_or(&self.metadata.namespace);
        ObjectKey::new(namespace, source_ref.name.clone())
    }

    /// Returns true when the last attempt already covered `revision`.
    #[must_use]
    pub fn has_attempted(&self, revision: &str) -> bool {
        self.status.last_attempted_revision.as_deref() == Some(revision)
    }
}

/// An object that participates in dependency ordering.
pub trait Dependent {
    /// Returns the identity of this object in the dependency graph.
    fn dependent_key(&self) -> ObjectKey;

    /// Returns the prerequisites of this object, namespaces resolved.
    fn depends_on(&self) -> Vec<ObjectKey>;
}

impl Dependent for Kustomization {
    fn dependent_key(&self) -> ObjectKey {
        self.key()
    }

    fn depends_on(&self) -> Vec<ObjectKey> {
        self.spec
            .depends_on
            .iter()
            .map(|dep| {
                let namespace = dep
                    .namespace
                    .as_deref()
                    .filter(|ns| !ns.is_empty())
                    .unwrap_or(&self.metadata.namespace);
                ObjectKey::new(namespace, dep.name.clone())
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn git_ref(name: &str) -> CrossNamespaceSourceReference {
        CrossNamespaceSourceReference::new(SourceKind::GitRepository, name)
    }

    #[test]
    fn source_key_defaults_to_own_namespace() {
        let k = Kustomization::new("apps", "frontend", git_ref("repo"));
        assert_eq!(k.source_key(), ObjectKey::new("apps", "repo"));
    }

    #[test]
    fn source_key_uses_explicit_namespace() {
        let k = Kustomization::new("apps", "frontend", git_ref("repo").in_namespace("flux-system"));
        assert_eq!(k.source_key(), ObjectKey::new("flux-system", "repo"));
    }

    #[test]
    fn empty_namespace_counts_as_unset() {
        let k = Kustomization::new("apps", "frontend", git_ref("repo").in_namespace(""));
        assert_eq!(k.source_key(), ObjectKey::new("apps", "repo"));
    }

    #[test]
    fn depends_on_resolves_namespaces() {
        let k = Kustomization::new("apps", "frontend", git_ref("repo"))
            .depending_on(DependencyReference::new("backend"))
            .depending_on(DependencyReference::namespaced("infra", "ingress"));
        assert_eq!(
            k.depends_on(),
            vec![ObjectKey::new("apps", "backend"), ObjectKey::new("infra", "ingress")]
        );
    }

    #[test]
    fn has_attempted_requires_matching_revision() {
        let fresh = Kustomization::new("ns", "app", git_ref("repo"));
        assert!(!fresh.has_attempted("rev-A"));

        let attempted = fresh.with_last_attempted_revision("rev-A");
        assert!(attempted.has_attempted("rev-A"));
        assert!(!attempted.has_attempted("rev-B"));
    }

    #[test]
    fn deserializes_from_manifest() {
        let k: Kustomization = serde_json::from_value(serde_json::json!({
            "metadata": { "namespace": "apps", "name": "frontend" },
            "spec": {
                "sourceRef": { "kind": "Bucket", "name": "configs", "namespace": "flux-system" },
                "dependsOn": [ { "name": "backend" } ]
            },
            "status": { "lastAttemptedRevision": "rev-0" }
        }))
        .unwrap();
        assert_eq!(k.spec.source_ref.kind, SourceKind::Bucket);
        assert_eq!(k.source_key(), ObjectKey::new("flux-system", "configs"));
        assert_eq!(k.depends_on(), vec![ObjectKey::new("apps", "backend")]);
        assert!(k.has_attempted("rev-0"));
    }
}
