//! Consumer cache with field indexes.
//!
//! In a running controller the informer cache owns consumer objects and keeps
//! the indexes current; the triggering pipeline only ever reads through
//! [`ConsumerLister`]. [`InMemoryConsumerCache`] is a self-contained rendition
//! of that cache for embedding and tests.
//!
//! ## Index maintenance
//!
//! - Registering an index derives entries for every cached consumer.
//! - `upsert` and `delete` recompute the affected consumer's entries in every
//!   registered index, so an index always reflects the current `sourceRef`.
//! - `rebuild_indexes` reconstructs all indexes from the cached objects; index
//!   entries are derived state and never authoritative.
//!
//! ## Limitations
//!
//! - **Single-process only**: state is not shared across process boundaries
//! - **No watch**: callers feed mutations in explicitly

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::{Arc, PoisonError, RwLock};

use ktrigger_core::{Error, Kustomization, ObjectKey, Result};
use tracing::debug;

use crate::config::TriggerConfig;
use crate::index::SourceIndex;

/// Point-in-time listing of consumers by index key.
pub trait ConsumerLister: Send + Sync {
    /// Lists consumers whose `field` index entry equals `key`.
    ///
    /// Results are ordered by object key.
    ///
    /// # Errors
    ///
    /// Returns [`Error::IndexNotRegistered`] for an unknown field, or a
    /// storage error when the cache cannot be read.
    fn list_by_index(&self, field: &str, key: &str) -> Result<Vec<Kustomization>>;
}

impl<T: ConsumerLister + ?Sized> ConsumerLister for Arc<T> {
    fn list_by_index(&self, field: &str, key: &str) -> Result<Vec<Kustomization>> {
        (**self).list_by_index(field, key)
    }
}

#[derive(Debug, Default)]
struct CacheState {
    objects: BTreeMap<ObjectKey, Kustomization>,
    indexes: HashMap<&'static str, FieldIndex>,
}

#[derive(Debug)]
struct FieldIndex {
    index: SourceIndex,
    entries: HashMap<String, BTreeSet<ObjectKey>>,
}

impl FieldIndex {
    fn new(index: SourceIndex) -> Self {
        Self {
            index,
            entries: HashMap::new(),
        }
    }

    fn insert(&mut self, consumer: &Kustomization) {
        if let Some(key) = self.index.key_for(consumer) {
            self.entries.entry(key).or_default().insert(consumer.key());
        }
    }

    fn remove(&mut self, consumer: &Kustomization) {
        if let Some(key) = self.index.key_for(consumer) {
            if let Some(set) = self.entries.get_mut(&key) {
                set.remove(&consumer.key());
                if set.is_empty() {
                    self.entries.remove(&key);
                }
            }
        }
    }
}

impl CacheState {
    fn unindex(&mut self, consumer: &Kustomization) {
        for field_index in self.indexes.values_mut() {
            field_index.remove(consumer);
        }
    }

    fn index(&mut self, consumer: &Kustomization) {
        for field_index in self.indexes.values_mut() {
            field_index.insert(consumer);
        }
    }
}

/// Converts a lock poison error to a storage error.
fn poison_err<T>(_: PoisonError<T>) -> Error {
    Error::storage("consumer cache lock poisoned")
}

/// In-memory consumer cache.
///
/// ## Example
///
/// ```rust
/// use ktrigger_controller::cache::{ConsumerLister, InMemoryConsumerCache};
/// use ktrigger_controller::index::GIT_REPOSITORY_INDEX;
/// use ktrigger_core::kustomization::CrossNamespaceSourceReference;
/// use ktrigger_core::{Kustomization, SourceKind};
///
/// let cache = InMemoryConsumerCache::new();
/// cache.register_index(GIT_REPOSITORY_INDEX).unwrap();
/// cache
///     .upsert(Kustomization::new(
///         "apps",
///         "frontend",
///         CrossNamespaceSourceReference::new(SourceKind::GitRepository, "repo"),
///     ))
///     .unwrap();
///
/// let hits = cache.list_by_index(GIT_REPOSITORY_INDEX.field, "apps/repo").unwrap();
/// assert_eq!(hits.len(), 1);
/// ```
#[derive(Debug, Default)]
pub struct InMemoryConsumerCache {
    state: RwLock<CacheState>,
    namespace_scope: Option<String>,
}

impl InMemoryConsumerCache {
    /// Creates a cache watching all namespaces.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a cache that only admits consumers from `namespace`.
    #[must_use]
    pub fn with_namespace_scope(namespace: impl Into<String>) -> Self {
        Self {
            state: RwLock::default(),
            namespace_scope: Some(namespace.into()),
        }
    }

    /// Creates a cache scoped to the configured watch namespace, if any.
    #[must_use]
    pub fn from_config(config: &TriggerConfig) -> Self {
        Self {
            state: RwLock::default(),
            namespace_scope: config.watch_namespace.clone(),
        }
    }

    /// Registers an index and derives entries for all cached consumers.
    ///
    /// Registering the same field again replaces the index.
    ///
    /// # Errors
    ///
    /// Returns an error if the lock is poisoned.
    pub fn register_index(&self, index: SourceIndex) -> Result<()> {
        let mut state = self.state.write().map_err(poison_err)?;
        let mut field_index = FieldIndex::new(index);
        for consumer in state.objects.values() {
            field_index.insert(consumer);
        }
        state.indexes.insert(index.field, field_index);
        drop(state);
        debug!(field = index.field, kind = %index.kind, "registered consumer index");
        Ok(())
    }

    /// Inserts or replaces a consumer and recomputes its index entries.
    ///
    /// Returns `false` if the consumer is outside the namespace scope.
    ///
    /// # Errors
    ///
    /// Returns an error if the lock is poisoned.
    pub fn upsert(&self, consumer: Kustomization) -> Result<bool> {
        if let Some(scope) = &self.namespace_scope {
            if consumer.metadata.namespace != *scope {
                debug!(consumer = %consumer.key(), "ignoring consumer outside namespace scope");
                return Ok(false);
            }
        }

        let mut state = self.state.write().map_err(poison_err)?;
        if let Some(previous) = state.objects.remove(&consumer.key()) {
            state.unindex(&previous);
        }
        state.index(&consumer);
        state.objects.insert(consumer.key(), consumer);
        drop(state);
        Ok(true)
    }

    /// Removes a consumer and its index entries.
    ///
    /// Returns the removed consumer, if it was cached.
    ///
    /// # Errors
    ///
    /// Returns an error if the lock is poisoned.
    pub fn delete(&self, key: &ObjectKey) -> Result<Option<Kustomization>> {
        let mut state = self.state.write().map_err(poison_err)?;
        let removed = state.objects.remove(key);
        if let Some(consumer) = &removed {
            state.unindex(consumer);
        }
        drop(state);
        Ok(removed)
    }

    /// Rebuilds every registered index by rescanning cached consumers.
    ///
    /// # Errors
    ///
    /// Returns an error if the lock is poisoned.
    pub fn rebuild_indexes(&self) -> Result<()> {
        let mut guard = self.state.write().map_err(poison_err)?;
        let state = &mut *guard;
        for field_index in state.indexes.values_mut() {
            field_index.entries.clear();
            for consumer in state.objects.values() {
                field_index.insert(consumer);
            }
        }
        drop(guard);
        Ok(())
    }

    /// Returns a cached consumer.
    ///
    /// # Errors
    ///
    /// Returns an error if the lock is poisoned.
    pub fn get(&self, key: &ObjectKey) -> Result<Option<Kustomization>> {
        let state = self.state.read().map_err(poison_err)?;
        Ok(state.objects.get(key).cloned())
    }

    /// Returns the number of cached consumers.
    ///
    /// # Errors
    ///
    /// Returns an error if the lock is poisoned.
    pub fn len(&self) -> Result<usize> {
        let state = self.state.read().map_err(poison_err)?;
        Ok(state.objects.len())
    }

    /// Returns true if no consumers are cached.
    ///
    /// # Errors
    ///
    /// Returns an error if the lock is poisoned.
    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }
}

impl ConsumerLister for InMemoryConsumerCache {
    fn list_by_index(&self, field: &str, key: &str) -> Result<Vec<Kustomization>> {
        let state = self.state.read().map_err(poison_err)?;
        let field_index = state
            .indexes
            .get(field)
            .ok_or_else(|| Error::IndexNotRegistered {
                field: field.to_string(),
            })?;

        let Some(members) = field_index.entries.get(key) else {
            return Ok(Vec::new());
        };
        Ok(members
            .iter()
            .filter_map(|member| state.objects.get(member).cloned())
            .collect())
    }
}
