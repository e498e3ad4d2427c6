//! Maps a source revision change to ordered reconcile requests.
//!
//! ## Event Flow
//!
//! ```text
//! source changed ──▶ artifact present? ──no──▶ (nothing)
//!                          │ yes
//!                          ▼
//!            list consumers by source index ──err──▶ (nothing, warn)
//!                          │
//!                          ▼
//!          drop consumers already at this revision
//!                          │
//!                          ▼
//!            order by declared dependencies ──cycle──▶ (nothing, warn)
//!                          │      └──other sort failure──▶ (nothing, error)
//!                          │
//!                          ▼
//!               ordered reconcile requests
//! ```
//!
//! ## Guarantees
//!
//! 1. **Side-effect free**: reads the cache, never writes it
//! 2. **Idempotent**: redelivering the same event after consumers have
//!    recorded the revision as attempted yields nothing new
//! 3. **All or nothing**: a dependency cycle or a failed sort suppresses the
//!    whole batch; the returned order must name every candidate exactly once
//!
//! The revision filter compares against the last *attempted* revision. A
//! consumer that attempted a revision and failed is not re-woken by further
//! events for that same revision; retrying it is the reconciler's own
//! requeue policy.

use ktrigger_core::observability::trigger_span;
use ktrigger_core::{Error as CoreError, Kustomization, SourceObject};
use tracing::{debug, error, warn};

use crate::cache::ConsumerLister;
use crate::error::Error;
use crate::index::SourceIndex;
use crate::metrics::{TimingGuard, TriggerMetrics};
use crate::request::ReconcileRequest;
use crate::sequencer::{self, DagSorter, DependencySorter};

/// Why a mapping produced the requests it did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MappingStatus {
    /// The source has no artifact yet.
    NoArtifact,
    /// The consumer listing failed; the event was dropped.
    ListFailed,
    /// Candidate consumers form a dependency cycle; the batch was dropped.
    CycleDetected,
    /// The sorter failed for another reason; the batch was dropped.
    SortFailed,
    /// Every referencing consumer already attempted this revision, or none exist.
    UpToDate,
    /// At least one request was produced.
    Triggered,
}

impl MappingStatus {
    /// Returns the metric label for this status.
    #[must_use]
    pub const fn as_label(self) -> &'static str {
        match self {
            Self::NoArtifact => "no_artifact",
            Self::ListFailed => "list_failed",
            Self::CycleDetected => "cycle_detected",
            Self::SortFailed => "sort_failed",
            Self::UpToDate => "up_to_date",
            Self::Triggered => "triggered",
        }
    }
}

/// Full result of mapping one source change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MappingOutcome {
    /// Outcome classification.
    pub status: MappingStatus,
    /// Requests in dependency order; empty unless `status` is `Triggered`.
    pub requests: Vec<ReconcileRequest>,
    /// Consumers filtered out because they already attempted the revision.
    pub skipped: usize,
}

impl MappingOutcome {
    fn empty(status: MappingStatus, skipped: usize) -> Self {
        Self {
            status,
            requests: Vec::new(),
            skipped,
        }
    }
}

/// Computes which consumers to wake when a source produces a new revision.
#[derive(Debug)]
pub struct RevisionChangeMapper<L, D = DagSorter> {
    lister: L,
    sorter: D,
    metrics: TriggerMetrics,
}

impl<L> RevisionChangeMapper<L, DagSorter>
where
    L: ConsumerLister,
{
    /// Creates a mapper using the default DAG sorter.
    #[must_use]
    pub fn new(lister: L) -> Self {
        Self::with_sorter(lister, DagSorter)
    }
}

impl<L, D> RevisionChangeMapper<L, D>
where
    L: ConsumerLister,
    D: DependencySorter,
{
    /// Creates a mapper with an injected dependency sorter.
    #[must_use]
    pub fn with_sorter(lister: L, sorter: D) -> Self {
        Self {
            lister,
            sorter,
            metrics: TriggerMetrics::new(),
        }
    }

    /// Returns the ordered requests for a changed source.
    ///
    /// Failures degrade to an empty result; see [`Self::map_source_change`]
    /// for the classified outcome.
    #[must_use]
    pub fn requests_for_source_change<S: SourceObject>(
        &self,
        source: &S,
    ) -> Vec<ReconcileRequest> {
        self.map_source_change(source).requests
    }

    /// Maps a changed source to a classified outcome.
    #[must_use]
    pub fn map_source_change<S: SourceObject>(&self, source: &S) -> MappingOutcome {
        let kind = S::KIND.as_str();
        let _timer = TimingGuard::new(|elapsed| {
            self.metrics.observe_mapping_duration(kind, elapsed);
        });

        let outcome = self.map_inner(source);
        self.metrics.record_event(kind, outcome.status.as_label());
        self.metrics
            .record_fanout(kind, outcome.requests.len(), outcome.skipped);
        outcome
    }

    fn map_inner<S: SourceObject>(&self, source: &S) -> MappingOutcome {
        let source_key = source.key();
        let Some(artifact) = source.artifact() else {
            debug!(
                kind = %S::KIND,
                source = %source_key,
                "source has no artifact, nothing to trigger"
            );
            return MappingOutcome::empty(MappingStatus::NoArtifact, 0);
        };

        let lookup_key = source_key.to_string();
        let span = trigger_span(S::KIND.as_str(), &lookup_key, &artifact.revision);
        let _entered = span.enter();

        let index = SourceIndex::for_kind(S::KIND);
        let consumers = match self.lister.list_by_index(index.field, &lookup_key) {
            Ok(consumers) => consumers,
            Err(err @ CoreError::IndexNotRegistered { .. }) => {
                error!(
                    error = %err,
                    field = index.field,
                    "consumer index missing, dropping source event"
                );
                return MappingOutcome::empty(MappingStatus::ListFailed, 0);
            }
            Err(err) => {
                warn!(error = %err, "failed to list consumers, dropping source event");
                return MappingOutcome::empty(MappingStatus::ListFailed, 0);
            }
        };

        let listed = consumers.len();
        let candidates: Vec<Kustomization> = consumers
            .into_iter()
            .filter(|consumer| !consumer.has_attempted(&artifact.revision))
            .collect();
        let skipped = listed - candidates.len();

        if candidates.is_empty() {
            debug!(listed, skipped, "all consumers already attempted this revision");
            return MappingOutcome::empty(MappingStatus::UpToDate, skipped);
        }

        let ordered = match sequencer::order(&self.sorter, candidates) {
            Ok(ordered) => ordered,
            Err(Error::CycleDetected { cycle }) => {
                warn!(?cycle, "dependency cycle among consumers, suppressing all requests");
                return MappingOutcome::empty(MappingStatus::CycleDetected, skipped);
            }
            Err(err) => {
                error!(error = %err, "failed to order consumers, suppressing all requests");
                return MappingOutcome::empty(MappingStatus::SortFailed, skipped);
            }
        };

        let requests: Vec<ReconcileRequest> = ordered
            .iter()
            .map(|consumer| ReconcileRequest::from(consumer.key()))
            .collect();
        debug!(requests = requests.len(), skipped, "triggering consumers");

        MappingOutcome {
            status: MappingStatus::Triggered,
            requests,
            skipped,
        }
    }
}
