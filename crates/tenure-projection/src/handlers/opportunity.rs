//! Renewal opportunity event handlers.

use tenure_core::{ActionRecorder, OpportunityId, OrganizationId};

use super::renewal::{
    adjust_likelihood, likelihood_changed, refresh_renewal_arr,
    update_active_renewal_renew_date_and_arr,
};
use super::{EventMeta, ProjectionContext};
use crate::effects::{EffectQueue, SideEffect};
use crate::error::{Error, Result};
use crate::events::{NextCycleDateUpdated, OpportunityClosed, RenewalCreated, RenewalUpdated};
use crate::model::{Contract, OpportunityStage, RenewalOpportunity};
use crate::store::Store;

const ENTITY: &str = "opportunity";

/// Handles `V1_OPPORTUNITY_CREATE_RENEWAL`.
///
/// A contract holds at most one active renewal. Creation is skipped when the
/// opportunity already exists, when the contract still has an active renewal,
/// or when a suspended renewal is waiting to be reactivated.
///
/// # Errors
///
/// Returns an error if the store fails on the opportunity or its contract.
#[tracing::instrument(
    skip(ctx, meta, data),
    fields(
        tenant = %meta.tenant,
        opportunity_id = %opportunity_id,
        contract_id = %data.contract_id,
        created = tracing::field::Empty,
    )
)]
pub async fn handle_create_renewal<S, Q, A>(
    ctx: &ProjectionContext<S, Q, A>,
    meta: &EventMeta<'_>,
    opportunity_id: OpportunityId,
    data: &RenewalCreated,
) -> Result<()>
where
    S: Store,
    Q: EffectQueue,
    A: ActionRecorder,
{
    let span = tracing::Span::current();
    span.record("created", false);

    if ctx
        .store
        .get_opportunity(meta.tenant, &opportunity_id)
        .await?
        .is_some()
    {
        tracing::debug!("renewal already projected");
        return Ok(());
    }

    if let Some(active) = ctx
        .store
        .active_renewal_opportunity(meta.tenant, &data.contract_id)
        .await?
        .filter(|active| active.is_active(meta.now))
    {
        tracing::debug!(active_opportunity_id = %active.id, "contract already has an active renewal");
        return Ok(());
    }

    if let Some(suspended) = ctx
        .store
        .suspended_renewal_opportunity(meta.tenant, &data.contract_id)
        .await?
    {
        tracing::debug!(suspended_opportunity_id = %suspended.id, "contract has a suspended renewal");
        return Ok(());
    }

    let renewal = data.to_renewal(opportunity_id);
    ctx.store.save_opportunity(meta.tenant, &renewal).await?;
    span.record("created", true);
    tracing::info!("renewal created");

    let Some(contract) = ctx
        .store
        .get_contract(meta.tenant, &data.contract_id)
        .await?
    else {
        tracing::warn!("renewal created for a contract that is not projected");
        return Ok(());
    };

    update_active_renewal_renew_date_and_arr(ctx, meta, &contract).await?;
    ctx.enqueue(
        meta,
        SideEffect::RefreshRenewalSummary {
            organization_id: contract.organization_id,
        },
    )
    .await;
    Ok(())
}

/// Handles `V1_OPPORTUNITY_UPDATE_RENEWAL`.
///
/// # Errors
///
/// Returns [`Error::EntityNotFound`] if the opportunity does not exist, or an
/// error if the store fails.
#[tracing::instrument(
    skip(ctx, meta, data),
    fields(
        tenant = %meta.tenant,
        opportunity_id = %opportunity_id,
        likelihood_changed = tracing::field::Empty,
    )
)]
pub async fn handle_update_renewal<S, Q, A>(
    ctx: &ProjectionContext<S, Q, A>,
    meta: &EventMeta<'_>,
    opportunity_id: OpportunityId,
    data: &RenewalUpdated,
) -> Result<()>
where
    S: Store,
    Q: EffectQueue,
    A: ActionRecorder,
{
    let mut renewal = load_opportunity(ctx, meta, opportunity_id).await?;
    let changes = data.apply(&mut renewal);
    ctx.store.save_opportunity(meta.tenant, &renewal).await?;
    tracing::Span::current().record("likelihood_changed", changes.likelihood);

    let Some(contract) = contract_of(ctx, meta, &renewal).await else {
        return Ok(());
    };

    if (changes.likelihood || changes.adjusted_rate) && !changes.amount {
        refresh_renewal_arr(ctx, meta, &contract, &mut renewal).await?;
    } else if changes.amount {
        enqueue_refresh_arr(ctx, meta, contract.organization_id).await;
    }

    if changes.likelihood {
        let user_name = match &data.updated_by_user_id {
            Some(user_id) => ctx
                .store
                .user_display_name(meta.tenant, user_id)
                .await
                .unwrap_or_else(|err| {
                    tracing::warn!(%user_id, error = %err, "failed to resolve user name");
                    None
                }),
            None => None,
        };
        likelihood_changed(ctx, meta, &contract, &renewal, user_name.as_deref()).await;
    }
    Ok(())
}

/// Handles `V1_OPPORTUNITY_UPDATE_NEXT_CYCLE_DATE`.
///
/// # Errors
///
/// Returns [`Error::EntityNotFound`] if the opportunity does not exist, or an
/// error if the store fails.
#[tracing::instrument(
    skip(ctx, meta, data),
    fields(tenant = %meta.tenant, opportunity_id = %opportunity_id)
)]
pub async fn handle_update_next_cycle_date<S, Q, A>(
    ctx: &ProjectionContext<S, Q, A>,
    meta: &EventMeta<'_>,
    opportunity_id: OpportunityId,
    data: &NextCycleDateUpdated,
) -> Result<()>
where
    S: Store,
    Q: EffectQueue,
    A: ActionRecorder,
{
    let mut renewal = load_opportunity(ctx, meta, opportunity_id).await?;
    renewal.renewed_at = data.renewed_at;
    renewal.updated_at = data.updated_at;
    ctx.store.save_opportunity(meta.tenant, &renewal).await?;

    let Some(contract) = contract_of(ctx, meta, &renewal).await else {
        return Ok(());
    };

    adjust_likelihood(ctx, meta, &contract).await?;
    ctx.enqueue(
        meta,
        SideEffect::RefreshContractStatus {
            contract_id: contract.id,
        },
    )
    .await;
    ctx.enqueue(
        meta,
        SideEffect::RefreshRenewalSummary {
            organization_id: contract.organization_id,
        },
    )
    .await;
    Ok(())
}

/// Handles `V1_OPPORTUNITY_CLOSE_WIN` and requests the next renewal.
///
/// # Errors
///
/// Returns [`Error::EntityNotFound`] if the opportunity does not exist, or an
/// error if the store fails.
#[tracing::instrument(
    skip(ctx, meta, data),
    fields(tenant = %meta.tenant, opportunity_id = %opportunity_id)
)]
pub async fn handle_close_won<S, Q, A>(
    ctx: &ProjectionContext<S, Q, A>,
    meta: &EventMeta<'_>,
    opportunity_id: OpportunityId,
    data: &OpportunityClosed,
) -> Result<()>
where
    S: Store,
    Q: EffectQueue,
    A: ActionRecorder,
{
    let mut renewal = load_opportunity(ctx, meta, opportunity_id).await?;
    renewal.stage = OpportunityStage::ClosedWon;
    renewal.closed_at = Some(data.closed_at);
    renewal.updated_at = data.closed_at;
    ctx.store.save_opportunity(meta.tenant, &renewal).await?;
    tracing::info!("renewal closed as won");

    ctx.enqueue(
        meta,
        SideEffect::CreateRenewalOpportunity {
            contract_id: renewal.contract_id,
        },
    )
    .await;
    Ok(())
}

/// Handles `V1_OPPORTUNITY_CLOSE_LOOSE`.
///
/// # Errors
///
/// Returns [`Error::EntityNotFound`] if the opportunity does not exist, or an
/// error if the store fails.
#[tracing::instrument(
    skip(ctx, meta, data),
    fields(tenant = %meta.tenant, opportunity_id = %opportunity_id)
)]
pub async fn handle_close_lost<S, Q, A>(
    ctx: &ProjectionContext<S, Q, A>,
    meta: &EventMeta<'_>,
    opportunity_id: OpportunityId,
    data: &OpportunityClosed,
) -> Result<()>
where
    S: Store,
    Q: EffectQueue,
    A: ActionRecorder,
{
    let mut renewal = load_opportunity(ctx, meta, opportunity_id).await?;
    renewal.stage = OpportunityStage::ClosedLost;
    renewal.closed_at = Some(data.closed_at);
    renewal.updated_at = data.closed_at;
    ctx.store.save_opportunity(meta.tenant, &renewal).await?;
    tracing::info!("renewal closed as lost");

    let Some(contract) = contract_of(ctx, meta, &renewal).await else {
        return Ok(());
    };
    ctx.enqueue(
        meta,
        SideEffect::RefreshRenewalSummary {
            organization_id: contract.organization_id,
        },
    )
    .await;
    enqueue_refresh_arr(ctx, meta, contract.organization_id).await;
    Ok(())
}

async fn load_opportunity<S, Q, A>(
    ctx: &ProjectionContext<S, Q, A>,
    meta: &EventMeta<'_>,
    opportunity_id: OpportunityId,
) -> Result<RenewalOpportunity>
where
    S: Store,
    Q: EffectQueue,
    A: ActionRecorder,
{
    ctx.store
        .get_opportunity(meta.tenant, &opportunity_id)
        .await?
        .ok_or_else(|| Error::not_found(ENTITY, opportunity_id))
}

/// Secondary lookup of the renewal's contract; failures are logged.
async fn contract_of<S, Q, A>(
    ctx: &ProjectionContext<S, Q, A>,
    meta: &EventMeta<'_>,
    renewal: &RenewalOpportunity,
) -> Option<Contract>
where
    S: Store,
    Q: EffectQueue,
    A: ActionRecorder,
{
    match ctx.store.get_contract(meta.tenant, &renewal.contract_id).await {
        Ok(Some(contract)) => Some(contract),
        Ok(None) => {
            tracing::warn!(contract_id = %renewal.contract_id, "renewal contract not projected");
            None
        }
        Err(err) => {
            tracing::warn!(contract_id = %renewal.contract_id, error = %err, "failed to load renewal contract");
            None
        }
    }
}

async fn enqueue_refresh_arr<S, Q, A>(
    ctx: &ProjectionContext<S, Q, A>,
    meta: &EventMeta<'_>,
    organization_id: OrganizationId,
) where
    S: Store,
    Q: EffectQueue,
    A: ActionRecorder,
{
    ctx.enqueue(meta, SideEffect::RefreshArr { organization_id })
        .await;
}
