//! Reconcile requests and the work queue they are handed to.
//!
//! The mapper returns requests in dependency order; [`enqueue_all`] preserves
//! that order when feeding a [`RequestQueue`]. The in-memory queue follows
//! work-queue semantics: a request that is already pending is not queued a
//! second time, and its key is released once the request is taken.

use std::collections::{HashSet, VecDeque};
use std::fmt;
use std::sync::{PoisonError, RwLock};

use ktrigger_core::{Error, ObjectKey, Result};

use crate::config::TriggerConfig;
use crate::metrics::TriggerMetrics;

/// A consumer that should be re-evaluated by the reconciliation loop.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ReconcileRequest {
    /// Namespace of the consumer.
    pub namespace: String,
    /// Name of the consumer.
    pub name: String,
}

impl ReconcileRequest {
    /// Creates a request for the given consumer.
    #[must_use]
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            name: name.into(),
        }
    }

    /// Returns the key of the consumer to reconcile.
    #[must_use]
    pub fn key(&self) -> ObjectKey {
        ObjectKey::new(self.namespace.clone(), self.name.clone())
    }
}

impl From<ObjectKey> for ReconcileRequest {
    fn from(key: ObjectKey) -> Self {
        Self {
            namespace: key.namespace,
            name: key.name,
        }
    }
}

impl fmt::Display for ReconcileRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.namespace, self.name)
    }
}

/// Result of an enqueue operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnqueueResult {
    /// The request was added to the queue.
    Enqueued,
    /// The request was already pending.
    Deduplicated,
    /// The queue is at capacity.
    QueueFull,
}

impl EnqueueResult {
    /// Returns the metric label for this result.
    #[must_use]
    pub const fn as_label(self) -> &'static str {
        match self {
            Self::Enqueued => "enqueued",
            Self::Deduplicated => "deduplicated",
            Self::QueueFull => "queue_full",
        }
    }
}

/// Destination for reconcile requests.
pub trait RequestQueue: Send + Sync {
    /// Adds a request to the queue.
    ///
    /// # Errors
    ///
    /// Returns an error if the queue cannot be written.
    fn enqueue(&self, request: ReconcileRequest) -> Result<EnqueueResult>;

    /// Returns the number of pending requests.
    ///
    /// # Errors
    ///
    /// Returns an error if the queue cannot be read.
    fn len(&self) -> Result<usize>;

    /// Returns true if nothing is pending.
    ///
    /// # Errors
    ///
    /// Returns an error if the queue cannot be read.
    fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }
}

/// Enqueues `requests` in order and returns how many were newly queued.
///
/// Stops at the first queue error, leaving earlier requests queued.
///
/// # Errors
///
/// Propagates the queue's error.
pub fn enqueue_all<Q>(queue: &Q, requests: Vec<ReconcileRequest>) -> Result<usize>
where
    Q: RequestQueue + ?Sized,
{
    let metrics = TriggerMetrics::new();
    let mut queued = 0;
    for request in requests {
        let result = queue.enqueue(request)?;
        metrics.record_enqueue(result.as_label());
        if result == EnqueueResult::Enqueued {
            queued += 1;
        }
    }
    Ok(queued)
}

#[derive(Debug, Default)]
struct QueueState {
    queue: VecDeque<ReconcileRequest>,
    pending: HashSet<ReconcileRequest>,
}

/// Converts a lock poison error to a storage error.
fn poison_err<T>(_: PoisonError<T>) -> Error {
    Error::storage("request queue lock poisoned")
}

/// In-memory FIFO request queue with pending-key deduplication.
///
/// ## Example
///
/// ```rust
/// use ktrigger_controller::request::{
///     EnqueueResult, InMemoryRequestQueue, ReconcileRequest, RequestQueue,
/// };
///
/// let queue = InMemoryRequestQueue::new();
/// let req = ReconcileRequest::new("apps", "frontend");
/// assert_eq!(queue.enqueue(req.clone()).unwrap(), EnqueueResult::Enqueued);
/// assert_eq!(queue.enqueue(req).unwrap(), EnqueueResult::Deduplicated);
/// ```
#[derive(Debug, Default)]
pub struct InMemoryRequestQueue {
    state: RwLock<QueueState>,
    max_capacity: Option<usize>,
}

impl InMemoryRequestQueue {
    /// Creates an unbounded queue.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a queue holding at most `max_capacity` pending requests.
    #[must_use]
    pub fn with_capacity(max_capacity: usize) -> Self {
        Self {
            state: RwLock::default(),
            max_capacity: Some(max_capacity),
        }
    }

    /// Creates a queue bounded by the configured capacity, if any.
    #[must_use]
    pub fn from_config(config: &TriggerConfig) -> Self {
        Self {
            state: RwLock::default(),
            max_capacity: config.queue_capacity,
        }
    }

    /// Takes the next request, releasing its deduplication key.
    ///
    /// # Errors
    ///
    /// Returns an error if the lock is poisoned.
    pub fn take(&self) -> Result<Option<ReconcileRequest>> {
        let mut state = self.state.write().map_err(poison_err)?;
        let next = state.queue.pop_front();
        if let Some(request) = &next {
            state.pending.remove(request);
        }
        drop(state);
        Ok(next)
    }

    /// Takes every pending request in queue order.
    ///
    /// # Errors
    ///
    /// Returns an error if the lock is poisoned.
    pub fn drain(&self) -> Result<Vec<ReconcileRequest>> {
        let mut state = self.state.write().map_err(poison_err)?;
        let drained: Vec<_> = state.queue.drain(..).collect();
        state.pending.clear();
        drop(state);
        Ok(drained)
    }
}

impl RequestQueue for InMemoryRequestQueue {
    fn enqueue(&self, request: ReconcileRequest) -> Result<EnqueueResult> {
        let mut state = self.state.write().map_err(poison_err)?;
        if state.pending.contains(&request) {
            return Ok(EnqueueResult::Deduplicated);
        }
        if let Some(max) = self.max_capacity {
            if state.queue.len() >= max {
                return Ok(EnqueueResult::QueueFull);
            }
        }
        state.pending.insert(request.clone());
        state.queue.push_back(request);
        drop(state);
        Ok(EnqueueResult::Enqueued)
    }

    fn len(&self) -> Result<usize> {
        let state = self.state.read().map_err(poison_err)?;
        Ok(state.queue.len())
    }
}
