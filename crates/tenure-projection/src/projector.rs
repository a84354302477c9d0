//! Routes inbound events to their projection handlers.

use chrono::{DateTime, Utc};
use tracing::Instrument;

use tenure_core::ActionRecorder;
use tenure_core::observability::projection_span;

use crate::effects::EffectQueue;
use crate::error::{Error, Result};
use crate::events::{InboundEvent, ProjectionEvent};
use crate::handlers::{
    EventMeta, ProjectionContext, contract, onboarding, opportunity, organization,
};
use crate::metrics::time_event;
use crate::store::Store;

/// Entry point of the engine: one call per delivered event.
///
/// Events of the same aggregate must be handed over in order. The projector
/// holds no state of its own, so it is safe to share across tasks for events
/// of different aggregates.
pub struct Projector<S, Q, A> {
    ctx: ProjectionContext<S, Q, A>,
}

impl<S, Q, A> Projector<S, Q, A>
where
    S: Store,
    Q: EffectQueue,
    A: ActionRecorder,
{
    /// Creates a projector over the given context.
    #[must_use]
    pub fn new(ctx: ProjectionContext<S, Q, A>) -> Self {
        Self { ctx }
    }

    /// The handler context.
    pub fn context(&self) -> &ProjectionContext<S, Q, A> {
        &self.ctx
    }

    /// Projects one event at the current time.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnknownEventType`] or [`Error::MalformedEvent`] before
    /// touching the store, [`Error::EntityNotFound`] when the primary entity
    /// is missing, and store errors on the primary entity. Side-effect
    /// failures are never returned.
    pub async fn handle(&self, event: &InboundEvent) -> Result<()> {
        self.handle_at(event, Utc::now()).await
    }

    /// Projects one event as if the clock read `now`.
    ///
    /// # Errors
    ///
    /// See [`Projector::handle`].
    pub async fn handle_at(&self, event: &InboundEvent, now: DateTime<Utc>) -> Result<()> {
        let decoded = match ProjectionEvent::decode(event) {
            Ok(decoded) => decoded,
            Err(err) => {
                let label = match &err {
                    Error::UnknownEventType { .. } => "unknown",
                    _ => event.event_type.as_str(),
                };
                self.ctx.metrics.record_event(label, err.kind());
                tracing::warn!(
                    event_id = %event.event_id,
                    event_type = %event.event_type,
                    error = %err,
                    "rejected inbound event"
                );
                return Err(err);
            }
        };

        let event_type = decoded.event_type();
        let span = projection_span(event_type, event.tenant.as_str(), &event.aggregate_id);
        let _timer = time_event(event_type);
        let meta = EventMeta::new(&event.tenant, &event.event_id, now);

        let result = self.route(&meta, &decoded).instrument(span.clone()).await;
        span.in_scope(|| match &result {
            Ok(()) => {
                self.ctx.metrics.record_event(event_type, "ok");
                tracing::debug!(event_id = %event.event_id, "event projected");
            }
            Err(err) => {
                self.ctx.metrics.record_event(event_type, err.kind());
                tracing::error!(event_id = %event.event_id, error = %err, "event projection failed");
            }
        });
        result
    }

    async fn route(&self, meta: &EventMeta<'_>, event: &ProjectionEvent) -> Result<()> {
        let ctx = &self.ctx;
        match event {
            ProjectionEvent::ContractCreate { contract_id, data } => {
                contract::handle_contract_create(ctx, meta, *contract_id, data).await
            }
            ProjectionEvent::ContractUpdate { contract_id, data } => {
                contract::handle_contract_update(ctx, meta, *contract_id, data).await
            }
            ProjectionEvent::ContractRolloutRenewal { contract_id, data } => {
                contract::handle_rollout_renewal(ctx, meta, *contract_id, data).await
            }
            ProjectionEvent::ContractRefreshStatus { contract_id, data } => {
                contract::handle_refresh_status(ctx, meta, *contract_id, data).await
            }
            ProjectionEvent::RenewalCreate {
                opportunity_id,
                data,
            } => opportunity::handle_create_renewal(ctx, meta, *opportunity_id, data).await,
            ProjectionEvent::RenewalUpdate {
                opportunity_id,
                data,
            } => opportunity::handle_update_renewal(ctx, meta, *opportunity_id, data).await,
            ProjectionEvent::NextCycleDateUpdate {
                opportunity_id,
                data,
            } => {
                opportunity::handle_update_next_cycle_date(ctx, meta, *opportunity_id, data).await
            }
            ProjectionEvent::CloseWon {
                opportunity_id,
                data,
            } => opportunity::handle_close_won(ctx, meta, *opportunity_id, data).await,
            ProjectionEvent::CloseLost {
                opportunity_id,
                data,
            } => opportunity::handle_close_lost(ctx, meta, *opportunity_id, data).await,
            ProjectionEvent::PlanCreate { plan_id, data } => {
                onboarding::handle_plan_create(ctx, meta, *plan_id, data).await
            }
            ProjectionEvent::PlanUpdate { plan_id, data } => {
                onboarding::handle_plan_update(ctx, meta, *plan_id, data).await
            }
            ProjectionEvent::MilestoneCreate { plan_id, data } => {
                onboarding::handle_milestone_create(ctx, meta, *plan_id, data).await
            }
            ProjectionEvent::MilestoneUpdate { plan_id, data } => {
                onboarding::handle_milestone_update(ctx, meta, *plan_id, data).await
            }
            ProjectionEvent::MilestonesReorder { plan_id, data } => {
                onboarding::handle_milestones_reorder(ctx, meta, *plan_id, data).await
            }
            ProjectionEvent::OnboardingStatusUpdate {
                organization_id,
                data,
            } => {
                organization::handle_onboarding_status_update(ctx, meta, *organization_id, data)
                    .await
            }
        }
    }
}
