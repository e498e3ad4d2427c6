//! Metrics for the triggering pipeline.
//!
//! Recorded through the `metrics` crate facade; installing an exporter is the
//! embedding binary's concern. Without a recorder installed every call is a
//! no-op.
//!
//! ## Metrics Exported
//!
//! | Metric | Type | Labels | Description |
//! |--------|------|--------|-------------|
//! | `ktrigger_source_events_total` | Counter | `kind`, `status` | Source change events by mapping outcome |
//! | `ktrigger_requests_emitted_total` | Counter | `kind` | Reconcile requests returned to the watch layer |
//! | `ktrigger_consumers_skipped_total` | Counter | `kind` | Consumers already at the triggering revision |
//! | `ktrigger_mapping_duration_seconds` | Histogram | `kind` | Time spent mapping one event |
//! | `ktrigger_queue_enqueues_total` | Counter | `result` | Request queue outcomes |

use std::time::{Duration, Instant};

use metrics::{counter, histogram};

/// Metric names as constants for consistency.
pub mod names {
    /// Counter: source change events by outcome.
    pub const SOURCE_EVENTS_TOTAL: &str = "ktrigger_source_events_total";
    /// Counter: reconcile requests emitted.
    pub const REQUESTS_EMITTED_TOTAL: &str = "ktrigger_requests_emitted_total";
    /// Counter: consumers filtered out as already current.
    pub const CONSUMERS_SKIPPED_TOTAL: &str = "ktrigger_consumers_skipped_total";
    /// Histogram: mapping duration in seconds.
    pub const MAPPING_DURATION_SECONDS: &str = "ktrigger_mapping_duration_seconds";
    /// Counter: request queue outcomes.
    pub const QUEUE_ENQUEUES_TOTAL: &str = "ktrigger_queue_enqueues_total";
}

/// Label keys used across metrics.
pub mod labels {
    /// Source kind (`GitRepository`, `Bucket`).
    pub const KIND: &str = "kind";
    /// Mapping outcome (`triggered`, `up_to_date`, `no_artifact`, `list_failed`,
    /// `cycle_detected`, `sort_failed`).
    pub const STATUS: &str = "status";
    /// Enqueue result (`enqueued`, `deduplicated`, `queue_full`).
    pub const RESULT: &str = "result";
}

/// Recorder for triggering metrics.
///
/// Cheap to clone and share across handlers.
#[derive(Debug, Clone, Default)]
pub struct TriggerMetrics;

impl TriggerMetrics {
    /// Creates a new metrics recorder.
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Records the outcome of one source change event.
    pub fn record_event(&self, kind: &str, status: &str) {
        counter!(
            names::SOURCE_EVENTS_TOTAL,
            labels::KIND => kind.to_string(),
            labels::STATUS => status.to_string(),
        )
        .increment(1);
    }

    /// Records emitted requests and skipped consumers for one event.
    pub fn record_fanout(&self, kind: &str, emitted: usize, skipped: usize) {
        counter!(
            names::REQUESTS_EMITTED_TOTAL,
            labels::KIND => kind.to_string(),
        )
        .increment(u64::try_from(emitted).unwrap_or(u64::MAX));
        counter!(
            names::CONSUMERS_SKIPPED_TOTAL,
            labels::KIND => kind.to_string(),
        )
        .increment(u64::try_from(skipped).unwrap_or(u64::MAX));
    }

    /// Records the duration of one mapping call.
    pub fn observe_mapping_duration(&self, kind: &str, duration: Duration) {
        histogram!(
            names::MAPPING_DURATION_SECONDS,
            labels::KIND => kind.to_string(),
        )
        .record(duration.as_secs_f64());
    }

    /// Records a request queue outcome.
    pub fn record_enqueue(&self, result: &str) {
        counter!(
            names::QUEUE_ENQUEUES_TOTAL,
            labels::RESULT => result.to_string(),
        )
        .increment(1);
    }
}

/// RAII guard for timing operations.
///
/// Calls `on_drop` with the elapsed duration when dropped.
pub struct TimingGuard<F>
where
    F: FnOnce(Duration),
{
    start: Instant,
    on_drop: Option<F>,
}

impl<F> TimingGuard<F>
where
    F: FnOnce(Duration),
{
    /// Creates a new timing guard.
    pub fn new(on_drop: F) -> Self {
        Self {
            start: Instant::now(),
            on_drop: Some(on_drop),
        }
    }

    /// Returns the elapsed time since the guard was created.
    #[must_use]
    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }
}

impl<F> Drop for TimingGuard<F>
where
    F: FnOnce(Duration),
{
    fn drop(&mut self) {
        if let Some(f) = self.on_drop.take() {
            f(self.start.elapsed());
        }
    }
}
