//! Reference index from sources to the consumers that reference them.
//!
//! The cache keeps one index per source kind. For each consumer it calls the
//! index's key function on every create, update, and delete; the function
//! yields the `namespace/name` of the referenced source when the consumer's
//! `sourceRef.kind` matches the index, and nothing otherwise. A consumer
//! therefore appears in at most one of the two indexes.
//!
//! # Example
//!
//! ```rust
//! use ktrigger_controller::index::{GIT_REPOSITORY_INDEX, BUCKET_INDEX};
//! use ktrigger_core::kustomization::CrossNamespaceSourceReference;
//! use ktrigger_core::{Kustomization, SourceKind};
//!
//! let app = Kustomization::new(
//!     "apps",
//!     "frontend",
//!     CrossNamespaceSourceReference::new(SourceKind::GitRepository, "monorepo"),
//! );
//!
//! assert_eq!(GIT_REPOSITORY_INDEX.key_for(&app).as_deref(), Some("apps/monorepo"));
//! assert_eq!(BUCKET_INDEX.key_for(&app), None);
//! ```

use ktrigger_core::{Kustomization, SourceKind};

/// Index field for consumers of repository sources.
pub const GIT_REPOSITORY_INDEX_FIELD: &str = "spec.sourceRef.gitRepository";

/// Index field for consumers of bucket sources.
pub const BUCKET_INDEX_FIELD: &str = "spec.sourceRef.bucket";

/// A named index scoped to one source kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SourceIndex {
    /// Field name the cache registers the index under.
    pub field: &'static str,
    /// Only consumers referencing this kind are indexed.
    pub kind: SourceKind,
}

/// Index of consumers by referenced repository.
pub const GIT_REPOSITORY_INDEX: SourceIndex = SourceIndex {
    field: GIT_REPOSITORY_INDEX_FIELD,
    kind: SourceKind::GitRepository,
};

/// Index of consumers by referenced bucket.
pub const BUCKET_INDEX: SourceIndex = SourceIndex {
    field: BUCKET_INDEX_FIELD,
    kind: SourceKind::Bucket,
};

impl SourceIndex {
    /// Returns the index for the given source kind.
    #[must_use]
    pub const fn for_kind(kind: SourceKind) -> Self {
        match kind {
            SourceKind::GitRepository => GIT_REPOSITORY_INDEX,
            SourceKind::Bucket => BUCKET_INDEX,
        }
    }

    /// Derives the index key for a consumer.
    ///
    /// Returns `None` when the consumer references a different source kind.
    #[must_use]
    pub fn key_for(&self, consumer: &Kustomization) -> Option<String> {
        index_key_for(consumer, self.kind)
    }
}

/// Derives the index key for `consumer` within the index for `expected_kind`.
#[must_use]
pub fn index_key_for(consumer: &Kustomization, expected_kind: SourceKind) -> Option<String> {
    if consumer.spec.source_ref.kind != expected_kind {
        return None;
    }
    Some(consumer.source_key().to_string())
}

/// Returns every source index, for registration at startup.
#[must_use]
pub const fn source_indexes() -> [SourceIndex; 2] {
    [GIT_REPOSITORY_INDEX, BUCKET_INDEX]
}

#[cfg(test)]
mod tests {
    use super::*;
    use ktrigger_core::ObjectKey;
    use ktrigger_core::kustomization::CrossNamespaceSourceReference;

    fn consumer(kind: SourceKind, source: &str, source_ns: Option<&str>) -> Kustomization {
        let mut source_ref = CrossNamespaceSourceReference::new(kind, source);
        if let Some(ns) = source_ns {
            source_ref = source_ref.in_namespace(ns);
        }
        Kustomization::new("apps", "frontend", source_ref)
    }

    #[test]
    fn omitted_namespace_resolves_to_consumer_namespace() {
        let k = consumer(SourceKind::GitRepository, "repo", None);
        assert_eq!(GIT_REPOSITORY_INDEX.key_for(&k).as_deref(), Some("apps/repo"));
    }

    #[test]
    fn explicit_namespace_is_used() {
        let k = consumer(SourceKind::Bucket, "configs", Some("flux-system"));
        assert_eq!(BUCKET_INDEX.key_for(&k).as_deref(), Some("flux-system/configs"));
    }

    #[test]
    fn mismatched_kind_yields_no_key() {
        let git = consumer(SourceKind::GitRepository, "shared", None);
        let bucket = consumer(SourceKind::Bucket, "shared", None);
        assert_eq!(BUCKET_INDEX.key_for(&git), None);
        assert_eq!(GIT_REPOSITORY_INDEX.key_for(&bucket), None);
    }

    #[test]
    fn consumer_lands_in_exactly_one_index() {
        for kind in SourceKind::ALL {
            let k = consumer(kind, "src", None);
            let hits = source_indexes()
                .iter()
                .filter(|index| index.key_for(&k).is_some())
                .count();
            assert_eq!(hits, 1, "{kind} consumer should be indexed once");
        }
    }

    #[test]
    fn for_kind_selects_matching_index() {
        assert_eq!(SourceIndex::for_kind(SourceKind::GitRepository), GIT_REPOSITORY_INDEX);
        assert_eq!(SourceIndex::for_kind(SourceKind::Bucket), BUCKET_INDEX);
    }

    #[test]
    fn derived_key_is_source_display_form() {
        let k = consumer(SourceKind::GitRepository, "repo", Some("infra"));
        let source = ObjectKey::new("infra", "repo");
        assert_eq!(GIT_REPOSITORY_INDEX.key_for(&k), Some(source.to_string()));
    }
}
