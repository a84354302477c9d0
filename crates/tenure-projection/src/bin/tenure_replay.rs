//! Replays newline-delimited inbound events through an in-memory projection.
//!
//! Reads one JSON [`InboundEvent`] per line from stdin, projects each one,
//! then drains the outbox into a client that only logs the sibling calls.
//! Useful for checking how a captured event stream would be projected.
//!
//! The store starts empty and no inbound event creates an organization, so
//! organization-level results (onboarding roll-up, customer relationship)
//! stay unset in a replay; contract, renewal and plan state is complete.
//!
//! Configuration comes from the `TENURE_*` variables, see
//! [`ProjectionConfig::from_env`].

use std::io::BufRead;
use std::sync::Arc;

use async_trait::async_trait;

use tenure_core::observability::init_logging;
use tenure_core::{ContractId, InMemoryActionRecorder, OpportunityId, OrganizationId, TenantId};
use tenure_projection::prelude::*;

/// Sibling client that logs every call and always succeeds.
struct LoggingSiblingClient;

#[async_trait]
impl SiblingClient for LoggingSiblingClient {
    async fn create_renewal_opportunity(
        &self,
        tenant: &TenantId,
        contract_id: &ContractId,
    ) -> Result<()> {
        tracing::info!(%tenant, %contract_id, "create_renewal_opportunity");
        Ok(())
    }

    async fn close_win_opportunity(
        &self,
        tenant: &TenantId,
        opportunity_id: &OpportunityId,
    ) -> Result<()> {
        tracing::info!(%tenant, %opportunity_id, "close_win_opportunity");
        Ok(())
    }

    async fn close_lost_opportunity(
        &self,
        tenant: &TenantId,
        opportunity_id: &OpportunityId,
    ) -> Result<()> {
        tracing::info!(%tenant, %opportunity_id, "close_lost_opportunity");
        Ok(())
    }

    async fn refresh_renewal_summary(
        &self,
        tenant: &TenantId,
        organization_id: &OrganizationId,
    ) -> Result<()> {
        tracing::info!(%tenant, %organization_id, "refresh_renewal_summary");
        Ok(())
    }

    async fn refresh_arr(&self, tenant: &TenantId, organization_id: &OrganizationId) -> Result<()> {
        tracing::info!(%tenant, %organization_id, "refresh_arr");
        Ok(())
    }

    async fn update_onboarding_status(
        &self,
        tenant: &TenantId,
        organization_id: &OrganizationId,
        status: OnboardingStatus,
        comments: &str,
        caused_by: Option<&ContractId>,
    ) -> Result<()> {
        tracing::info!(
            %tenant,
            %organization_id,
            ?status,
            comments,
            caused_by = ?caused_by,
            "update_onboarding_status"
        );
        Ok(())
    }

    async fn refresh_contract_status(
        &self,
        tenant: &TenantId,
        contract_id: &ContractId,
    ) -> Result<()> {
        tracing::info!(%tenant, %contract_id, "refresh_contract_status");
        Ok(())
    }
}

#[derive(Debug, Default)]
struct ReplaySummary {
    projected: usize,
    rejected: usize,
    unreadable: usize,
}

#[tokio::main]
async fn main() -> Result<()> {
    let config = ProjectionConfig::from_env()?;
    init_logging(config.log_format);

    let queue = Arc::new(InMemoryEffectQueue::from_config("replay-effects", &config));
    let ctx = ProjectionContext::new(
        Arc::new(InMemoryStore::new()),
        Arc::clone(&queue),
        Arc::new(InMemoryActionRecorder::new()),
        config.clone(),
    );
    let projector = Projector::new(ctx);

    let mut summary = ReplaySummary::default();
    for (index, line) in std::io::stdin().lock().lines().enumerate() {
        let line = line.map_err(|e| Error::configuration(format!("failed to read stdin: {e}")))?;
        if line.trim().is_empty() {
            continue;
        }

        let event: InboundEvent = match serde_json::from_str(&line) {
            Ok(event) => event,
            Err(e) => {
                tracing::warn!(line = index + 1, error = %e, "skipping unreadable event");
                summary.unreadable += 1;
                continue;
            }
        };

        match projector.handle(&event).await {
            Ok(()) => summary.projected += 1,
            Err(e) => {
                tracing::warn!(
                    line = index + 1,
                    event_id = %event.event_id,
                    error = %e,
                    "event was not projected"
                );
                summary.rejected += 1;
            }
        }
    }

    let dispatcher = EffectDispatcher::from_config(queue, LoggingSiblingClient, &config);
    let report = dispatcher.dispatch_pending().await?;

    tracing::info!(
        projected = summary.projected,
        rejected = summary.rejected,
        unreadable = summary.unreadable,
        effects_delivered = report.succeeded,
        effects_failed = report.failed,
        "replay finished"
    );
    Ok(())
}
