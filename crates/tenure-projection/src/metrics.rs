//! Projection metrics.
//!
//! Recorded through the `metrics` crate facade; install any exporter in the
//! host process to collect them. Without a recorder every call is a no-op.
//!
//! | Metric | Type | Labels |
//! |--------|------|--------|
//! | `tenure_events_total` | Counter | `event_type`, `result` |
//! | `tenure_event_duration_seconds` | Histogram | `event_type` |
//! | `tenure_status_transitions_total` | Counter | `entity`, `from`, `to` |
//! | `tenure_effects_enqueued_total` | Counter | `effect`, `result` |
//! | `tenure_effect_calls_total` | Counter | `effect`, `result` |
//! | `tenure_effect_retries_total` | Counter | `effect` |
//! | `tenure_outbox_depth` | Gauge | - |
//! | `tenure_actions_total` | Counter | `action_type` |

use std::time::{Duration, Instant};

use metrics::{counter, gauge, histogram};

/// Metric names as constants for consistency.
pub mod names {
    /// Counter: projected events by outcome.
    pub const EVENTS_TOTAL: &str = "tenure_events_total";
    /// Histogram: time spent projecting one event.
    pub const EVENT_DURATION_SECONDS: &str = "tenure_event_duration_seconds";
    /// Counter: derived status changes.
    pub const STATUS_TRANSITIONS_TOTAL: &str = "tenure_status_transitions_total";
    /// Counter: side effects handed to the outbox.
    pub const EFFECTS_ENQUEUED_TOTAL: &str = "tenure_effects_enqueued_total";
    /// Counter: sibling-service calls by outcome.
    pub const EFFECT_CALLS_TOTAL: &str = "tenure_effect_calls_total";
    /// Counter: sibling-service call retries.
    pub const EFFECT_RETRIES_TOTAL: &str = "tenure_effect_retries_total";
    /// Gauge: side effects waiting in the outbox.
    pub const OUTBOX_DEPTH: &str = "tenure_outbox_depth";
    /// Counter: timeline actions recorded.
    pub const ACTIONS_TOTAL: &str = "tenure_actions_total";
}

/// Label keys used across metrics.
pub mod labels {
    /// Wire event type.
    pub const EVENT_TYPE: &str = "event_type";
    /// Outcome (ok, error, enqueued, deduplicated, queue_full).
    pub const RESULT: &str = "result";
    /// Entity whose status changed.
    pub const ENTITY: &str = "entity";
    /// Previous status.
    pub const FROM: &str = "from";
    /// New status.
    pub const TO: &str = "to";
    /// Side effect kind.
    pub const EFFECT: &str = "effect";
    /// Timeline action type.
    pub const ACTION_TYPE: &str = "action_type";
}

/// Handle for recording projection metrics. Cheap to clone.
#[derive(Debug, Clone, Default)]
pub struct ProjectionMetrics;

impl ProjectionMetrics {
    /// Creates a metrics handle.
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Records the outcome of projecting one event.
    pub fn record_event(&self, event_type: &str, result: &str) {
        counter!(
            names::EVENTS_TOTAL,
            labels::EVENT_TYPE => event_type.to_string(),
            labels::RESULT => result.to_string(),
        )
        .increment(1);
    }

    /// Records how long projecting one event took.
    pub fn observe_event_duration(&self, event_type: &str, duration: Duration) {
        histogram!(
            names::EVENT_DURATION_SECONDS,
            labels::EVENT_TYPE => event_type.to_string(),
        )
        .record(duration.as_secs_f64());
    }

    /// Records a derived status change.
    pub fn record_status_transition(&self, entity: &'static str, from: &str, to: &str) {
        counter!(
            names::STATUS_TRANSITIONS_TOTAL,
            labels::ENTITY => entity,
            labels::FROM => from.to_string(),
            labels::TO => to.to_string(),
        )
        .increment(1);
    }

    /// Records a side effect handed to the outbox.
    pub fn record_effect_enqueued(&self, effect: &'static str, result: &'static str) {
        counter!(
            names::EFFECTS_ENQUEUED_TOTAL,
            labels::EFFECT => effect,
            labels::RESULT => result,
        )
        .increment(1);
    }

    /// Records a finished sibling-service call.
    pub fn record_effect_call(&self, effect: &'static str, result: &'static str) {
        counter!(
            names::EFFECT_CALLS_TOTAL,
            labels::EFFECT => effect,
            labels::RESULT => result,
        )
        .increment(1);
    }

    /// Records a sibling-service call retry.
    pub fn record_effect_retry(&self, effect: &'static str) {
        counter!(names::EFFECT_RETRIES_TOTAL, labels::EFFECT => effect).increment(1);
    }

    /// Sets the number of side effects waiting in the outbox.
    #[allow(clippy::cast_precision_loss)]
    pub fn set_outbox_depth(&self, depth: usize) {
        gauge!(names::OUTBOX_DEPTH).set(depth as f64);
    }

    /// Records a timeline action.
    pub fn record_action(&self, action_type: &'static str) {
        counter!(names::ACTIONS_TOTAL, labels::ACTION_TYPE => action_type).increment(1);
    }
}

/// RAII guard for timing operations.
///
/// Calls `on_drop` with the elapsed time when dropped.
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
    /// Starts timing.
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

/// Times the projection of one event of `event_type`.
#[must_use]
pub fn time_event(event_type: &'static str) -> TimingGuard<impl FnOnce(Duration)> {
    TimingGuard::new(move |duration| {
        ProjectionMetrics::new().observe_event_duration(event_type, duration);
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recording_without_recorder_is_a_no_op() {
        let metrics = ProjectionMetrics::new();
        metrics.record_event("V1_CONTRACT_UPDATE", "ok");
        metrics.record_status_transition("contract", "DRAFT", "LIVE");
        metrics.record_effect_enqueued("refresh_arr", "enqueued");
        metrics.record_effect_call("refresh_arr", "ok");
        metrics.record_effect_retry("refresh_arr");
        metrics.set_outbox_depth(3);
        metrics.record_action("CONTRACT_RENEWED");
    }

    #[test]
    fn timing_guard_measures_duration() {
        let mut recorded = None;
        {
            let _guard = TimingGuard::new(|d| recorded = Some(d));
            std::thread::sleep(Duration::from_millis(5));
        }
        assert!(recorded.is_some_and(|d| d >= Duration::from_millis(5)));
    }

    #[test]
    fn event_timer_records_on_drop() {
        let guard = time_event("V1_CONTRACT_CREATE");
        assert!(guard.elapsed() < Duration::from_secs(5));
    }
}
