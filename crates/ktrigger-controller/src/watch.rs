//! Per-kind source watch handlers.
//!
//! The watch layer delivers one event per observed source change. Each
//! source kind gets its own statically typed handler; [`SourceEvent`] carries
//! the concrete object so dispatch is a plain `match`, never a runtime type
//! check.

use ktrigger_core::{Bucket, GitRepository, ObjectKey, Result, SourceKind, SourceObject};
use tracing::{debug, info};

use crate::cache::{ConsumerLister, InMemoryConsumerCache};
use crate::config::TriggerConfig;
use crate::index::source_indexes;
use crate::mapper::RevisionChangeMapper;
use crate::request::{ReconcileRequest, RequestQueue, enqueue_all};
use crate::sequencer::{DagSorter, DependencySorter};

/// A change observed on a source object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceEvent {
    /// A repository source changed.
    GitRepository(GitRepository),
    /// A bucket source changed.
    Bucket(Bucket),
}

impl SourceEvent {
    /// Returns the kind of the changed source.
    #[must_use]
    pub const fn kind(&self) -> SourceKind {
        match self {
            Self::GitRepository(_) => SourceKind::GitRepository,
            Self::Bucket(_) => SourceKind::Bucket,
        }
    }

    /// Returns the key of the changed source.
    #[must_use]
    pub fn key(&self) -> ObjectKey {
        match self {
            Self::GitRepository(repo) => repo.key(),
            Self::Bucket(bucket) => bucket.key(),
        }
    }
}

impl From<GitRepository> for SourceEvent {
    fn from(repo: GitRepository) -> Self {
        Self::GitRepository(repo)
    }
}

impl From<Bucket> for SourceEvent {
    fn from(bucket: Bucket) -> Self {
        Self::Bucket(bucket)
    }
}

/// Registers the key function of every source index with the cache.
///
/// Called once at startup, before any event is handled.
///
/// # Errors
///
/// Returns an error if the cache rejects a registration.
pub fn register_source_indexes(cache: &InMemoryConsumerCache) -> Result<()> {
    for index in source_indexes() {
        cache.register_index(index)?;
    }
    info!(count = source_indexes().len(), "registered source indexes");
    Ok(())
}

/// Source watch handlers for the consumer controller.
#[derive(Debug)]
pub struct TriggerController<L, D = DagSorter> {
    mapper: RevisionChangeMapper<L, D>,
    config: TriggerConfig,
}

impl<L> TriggerController<L, DagSorter>
where
    L: ConsumerLister,
{
    /// Creates handlers reading from `lister` with the default sorter.
    #[must_use]
    pub fn new(lister: L, config: TriggerConfig) -> Self {
        Self::with_mapper(RevisionChangeMapper::new(lister), config)
    }
}

impl<L, D> TriggerController<L, D>
where
    L: ConsumerLister,
    D: DependencySorter,
{
    /// Creates handlers around an existing mapper.
    #[must_use]
    pub fn with_mapper(mapper: RevisionChangeMapper<L, D>, config: TriggerConfig) -> Self {
        Self { mapper, config }
    }

    /// Handler for repository changes.
    #[must_use]
    pub fn on_git_repository_change(&self, repo: &GitRepository) -> Vec<ReconcileRequest> {
        self.on_change(repo)
    }

    /// Handler for bucket changes.
    #[must_use]
    pub fn on_bucket_change(&self, bucket: &Bucket) -> Vec<ReconcileRequest> {
        self.on_change(bucket)
    }

    /// Dispatches an event to the handler for its kind.
    #[must_use]
    pub fn handle(&self, event: &SourceEvent) -> Vec<ReconcileRequest> {
        match event {
            SourceEvent::GitRepository(repo) => self.on_git_repository_change(repo),
            SourceEvent::Bucket(bucket) => self.on_bucket_change(bucket),
        }
    }

    /// Handles an event and enqueues the resulting requests in order.
    ///
    /// Returns the number of requests newly queued.
    ///
    /// # Errors
    ///
    /// Returns an error if the queue cannot be written.
    pub fn handle_and_enqueue<Q>(&self, event: &SourceEvent, queue: &Q) -> Result<usize>
    where
        Q: RequestQueue + ?Sized,
    {
        enqueue_all(queue, self.handle(event))
    }

    fn on_change<S: SourceObject>(&self, source: &S) -> Vec<ReconcileRequest> {
        let namespace = &source.meta().namespace;
        if !self.config.watches(namespace) {
            debug!(
                kind = %S::KIND,
                source = %source.key(),
                "source outside watch namespace"
            );
            return Vec::new();
        }
        self.mapper.requests_for_source_change(source)
    }
}
