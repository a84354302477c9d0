//! Projection handlers.
//!
//! One async function per event type. Each handler follows the same shape:
//! load the primary entity, apply the event, derive statuses with the pure
//! functions in [`crate::status`], persist, then propagate and enqueue side
//! effects. Only failures on the primary entity are returned; secondary
//! lookups, action recording and effect enqueueing are logged and swallowed.

pub mod contract;
pub mod onboarding;
pub mod opportunity;
pub mod organization;
pub mod renewal;

use std::sync::Arc;

use chrono::{DateTime, Utc};

use tenure_core::action::ActionBuilder;
use tenure_core::{ActionRecorder, TenantId};

use crate::config::ProjectionConfig;
use crate::effects::{EffectEnvelope, EffectQueue, EnqueueResult, SideEffect};
use crate::error::Result;
use crate::metrics::ProjectionMetrics;
use crate::store::Store;

/// Collaborators shared by every handler.
pub struct ProjectionContext<S, Q, A> {
    /// Projected state.
    pub store: Arc<S>,
    /// Outbox for sibling-service calls.
    pub queue: Arc<Q>,
    /// Timeline action sink.
    pub recorder: Arc<A>,
    /// Engine configuration.
    pub config: ProjectionConfig,
    /// Metrics handle.
    pub metrics: ProjectionMetrics,
}

impl<S, Q, A> ProjectionContext<S, Q, A>
where
    S: Store,
    Q: EffectQueue,
    A: ActionRecorder,
{
    /// Creates a new projection context.
    #[must_use]
    pub fn new(store: Arc<S>, queue: Arc<Q>, recorder: Arc<A>, config: ProjectionConfig) -> Self {
        Self {
            store,
            queue,
            recorder,
            config,
            metrics: ProjectionMetrics::new(),
        }
    }

    /// Hands an effect to the outbox. Never fails the caller.
    pub(crate) async fn enqueue(&self, meta: &EventMeta<'_>, effect: SideEffect) {
        let kind = effect.kind();
        let envelope = EffectEnvelope::new(meta.tenant.clone(), effect, meta.event_id);
        let idempotency_key = envelope.idempotency_key();

        match self.queue.enqueue(envelope).await {
            Ok(result) => {
                self.metrics.record_effect_enqueued(kind, result.label());
                match result {
                    EnqueueResult::Enqueued { .. } => {
                        tracing::debug!(effect = kind, %idempotency_key, "effect enqueued");
                    }
                    EnqueueResult::Deduplicated { .. } => {
                        tracing::debug!(effect = kind, %idempotency_key, "effect already pending");
                    }
                    EnqueueResult::QueueFull => {
                        tracing::warn!(effect = kind, %idempotency_key, "outbox full, effect dropped");
                    }
                }
            }
            Err(err) => {
                self.metrics.record_effect_enqueued(kind, "error");
                tracing::warn!(effect = kind, %idempotency_key, error = %err, "failed to enqueue effect");
            }
        }
    }

    /// Records a timeline action. Never fails the caller.
    ///
    /// Fills in tenant and app source; callers provide everything else.
    pub(crate) async fn record_action(&self, meta: &EventMeta<'_>, action: ActionBuilder) {
        if !self.config.record_actions {
            tracing::debug!("action recording disabled");
            return;
        }

        let action = match action
            .tenant(meta.tenant.clone())
            .app_source(self.config.app_source.as_str())
            .try_build()
        {
            Ok(action) => action,
            Err(err) => {
                tracing::error!(error = %err, "invalid action");
                return;
            }
        };

        let action_type = action.action_type.as_str();
        let entity_id = action.entity_id.clone();
        match self.recorder.create(action).await {
            Ok(action_id) => {
                self.metrics.record_action(action_type);
                tracing::debug!(%action_id, action_type, %entity_id, "action recorded");
            }
            Err(err) => {
                tracing::warn!(action_type, %entity_id, error = %err, "failed to record action");
            }
        }
    }

    /// Counts and logs a derived status change.
    pub(crate) fn record_transition(&self, entity: &'static str, id: &str, from: &str, to: &str) {
        self.metrics.record_status_transition(entity, from, to);
        tracing::info!(entity, id, from, to, "status changed");
    }
}

/// Per-event values every handler needs.
#[derive(Debug, Clone, Copy)]
pub struct EventMeta<'a> {
    /// Tenant the event belongs to.
    pub tenant: &'a TenantId,
    /// Inbound event id; the causation id of every effect it enqueues.
    pub event_id: &'a str,
    /// Clock reading for the whole event.
    pub now: DateTime<Utc>,
}

impl<'a> EventMeta<'a> {
    /// Creates event metadata.
    #[must_use]
    pub const fn new(tenant: &'a TenantId, event_id: &'a str, now: DateTime<Utc>) -> Self {
        Self {
            tenant,
            event_id,
            now,
        }
    }
}

/// Logs a failed secondary step and carries on.
pub(crate) fn warn_secondary(step: &'static str, result: Result<()>) {
    if let Err(err) = result {
        tracing::warn!(step, error = %err, "secondary step failed");
    }
}
