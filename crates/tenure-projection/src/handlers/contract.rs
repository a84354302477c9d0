//! Contract event handlers.

use serde_json::json;

use tenure_core::{Action, ActionRecorder, ActionType, ContractId, EntityType};

use super::renewal::{adjust_likelihood, update_active_renewal_renew_date_and_arr};
use super::{EventMeta, ProjectionContext, warn_secondary};
use crate::effects::{EffectQueue, SideEffect};
use crate::error::{Error, Result};
use crate::events::{ContractCreated, ContractUpdated, Touched};
use crate::model::{Contract, ContractStatus, OpportunityStage, OrganizationRelationship};
use crate::status::{derive_contract_status, requires_renewal_lookup, status_change_message};
use crate::store::Store;

const ENTITY: &str = "contract";

/// Derives the contract's status, persists the contract and reports whether
/// the status changed.
///
/// The contract is always written, even when the status is unchanged.
///
/// # Errors
///
/// Returns an error if the renewal lookup or the write fails. A failed
/// renewal lookup never defaults the status.
pub async fn derive_and_save_status<S, Q, A>(
    ctx: &ProjectionContext<S, Q, A>,
    meta: &EventMeta<'_>,
    contract: &mut Contract,
) -> Result<bool>
where
    S: Store,
    Q: EffectQueue,
    A: ActionRecorder,
{
    let active_renewal = if requires_renewal_lookup(contract, meta.now) {
        ctx.store
            .active_renewal_opportunity(meta.tenant, &contract.id)
            .await?
    } else {
        None
    };

    let previous = contract.status;
    contract.status = derive_contract_status(contract, active_renewal.as_ref(), meta.now);
    ctx.store.save_contract(meta.tenant, contract).await?;

    let changed = previous != contract.status;
    if changed {
        ctx.record_transition(
            ENTITY,
            &contract.id.to_string(),
            previous.as_str(),
            contract.status.as_str(),
        );
    }
    Ok(changed)
}

/// Handles `V1_CONTRACT_CREATE`.
///
/// Replays keep the stored status so the transition is not counted twice.
///
/// # Errors
///
/// Returns an error if the store fails.
#[tracing::instrument(
    skip(ctx, meta, data),
    fields(
        tenant = %meta.tenant,
        contract_id = %contract_id,
        status = tracing::field::Empty,
    )
)]
pub async fn handle_contract_create<S, Q, A>(
    ctx: &ProjectionContext<S, Q, A>,
    meta: &EventMeta<'_>,
    contract_id: ContractId,
    data: &ContractCreated,
) -> Result<()>
where
    S: Store,
    Q: EffectQueue,
    A: ActionRecorder,
{
    let mut contract = data.to_contract(contract_id);
    if let Some(existing) = ctx.store.get_contract(meta.tenant, &contract_id).await? {
        contract.status = existing.status;
    }

    derive_and_save_status(ctx, meta, &mut contract).await?;
    tracing::Span::current().record("status", contract.status.as_str());

    if contract.renewal_cycle.is_frequency_based() {
        ctx.enqueue(meta, SideEffect::CreateRenewalOpportunity { contract_id })
            .await;
    }
    Ok(())
}

/// Handles `V1_CONTRACT_UPDATE`.
///
/// The status action is recorded as soon as the new status is written: a
/// redelivery sees the status unchanged and would not record it again.
/// Renewal upkeep after that point is logged and skipped on failure.
///
/// # Errors
///
/// Returns [`Error::EntityNotFound`] if the contract does not exist, or an
/// error if the store fails on the contract itself.
#[tracing::instrument(
    skip(ctx, meta, data),
    fields(
        tenant = %meta.tenant,
        contract_id = %contract_id,
        status = tracing::field::Empty,
        status_changed = tracing::field::Empty,
    )
)]
pub async fn handle_contract_update<S, Q, A>(
    ctx: &ProjectionContext<S, Q, A>,
    meta: &EventMeta<'_>,
    contract_id: ContractId,
    data: &ContractUpdated,
) -> Result<()>
where
    S: Store,
    Q: EffectQueue,
    A: ActionRecorder,
{
    let before = load_contract(ctx, meta, contract_id).await?;

    let mut contract = before.clone();
    data.apply(&mut contract);
    let status_changed = derive_and_save_status(ctx, meta, &mut contract).await?;

    let after = load_contract(ctx, meta, contract_id).await?;
    let span = tracing::Span::current();
    span.record("status", after.status.as_str());
    span.record("status_changed", status_changed);

    if status_changed {
        warn_secondary(
            "refresh organization relationship",
            refresh_organization_relationship(ctx, meta, &after).await,
        );
        record_status_action(ctx, meta, &after).await;
    }

    let had_cycle = before.renewal_cycle.is_frequency_based();
    let has_cycle = after.renewal_cycle.is_frequency_based();
    match (had_cycle, has_cycle) {
        (true, false) => warn_secondary(
            "suspend active renewal",
            suspend_active_renewal(ctx, meta, &after).await,
        ),
        (false, true) => {
            warn_secondary(
                "reactivate suspended renewal",
                reactivate_suspended_renewal(ctx, meta, &after).await,
            );
            warn_secondary(
                "update active renewal",
                update_active_renewal_renew_date_and_arr(ctx, meta, &after).await,
            );
        }
        _ => warn_secondary(
            "update active renewal",
            update_active_renewal_renew_date_and_arr(ctx, meta, &after).await,
        ),
    }

    warn_secondary(
        "adjust renewal likelihood",
        adjust_likelihood(ctx, meta, &after).await,
    );
    Ok(())
}

/// Handles `V1_CONTRACT_ROLLOUT_RENEWAL_OPPORTUNITY`.
///
/// Closes the active renewal as won; the next renewal is opened when that
/// close is projected.
///
/// # Errors
///
/// Returns [`Error::EntityNotFound`] if the contract does not exist.
#[tracing::instrument(
    skip(ctx, meta, data),
    fields(tenant = %meta.tenant, contract_id = %contract_id)
)]
pub async fn handle_rollout_renewal<S, Q, A>(
    ctx: &ProjectionContext<S, Q, A>,
    meta: &EventMeta<'_>,
    contract_id: ContractId,
    data: &Touched,
) -> Result<()>
where
    S: Store,
    Q: EffectQueue,
    A: ActionRecorder,
{
    let contract = load_contract(ctx, meta, contract_id).await?;
    if !contract.renewal_cycle.is_frequency_based() {
        tracing::debug!("contract does not renew on a cycle");
        return Ok(());
    }

    let Some(active) = ctx
        .store
        .active_renewal_opportunity(meta.tenant, &contract_id)
        .await?
    else {
        tracing::debug!("no active renewal to roll out");
        return Ok(());
    };

    ctx.enqueue(
        meta,
        SideEffect::CloseWinOpportunity {
            opportunity_id: active.id,
        },
    )
    .await;

    let action = Action::builder()
        .entity(contract_id, EntityType::Contract)
        .action_type(ActionType::ContractRenewed)
        .content(format!("{} renewed", contract.display_name()))
        .metadata(json!({ "status": "Renewed" }))
        .created_at(data.updated_at.unwrap_or(meta.now));
    ctx.record_action(meta, action).await;
    Ok(())
}

/// Handles `V1_CONTRACT_REFRESH_STATUS`.
///
/// # Errors
///
/// Returns [`Error::EntityNotFound`] if the contract does not exist, or an
/// error if the store fails.
#[tracing::instrument(
    skip(ctx, meta, _data),
    fields(
        tenant = %meta.tenant,
        contract_id = %contract_id,
        status = tracing::field::Empty,
    )
)]
pub async fn handle_refresh_status<S, Q, A>(
    ctx: &ProjectionContext<S, Q, A>,
    meta: &EventMeta<'_>,
    contract_id: ContractId,
    _data: &Touched,
) -> Result<()>
where
    S: Store,
    Q: EffectQueue,
    A: ActionRecorder,
{
    let mut contract = load_contract(ctx, meta, contract_id).await?;
    let status_changed = derive_and_save_status(ctx, meta, &mut contract).await?;
    tracing::Span::current().record("status", contract.status.as_str());

    if !status_changed {
        return Ok(());
    }

    warn_secondary(
        "refresh organization relationship",
        refresh_organization_relationship(ctx, meta, &contract).await,
    );
    record_status_action(ctx, meta, &contract).await;

    if contract.status == ContractStatus::Ended {
        warn_secondary(
            "close renewal of ended contract",
            update_active_renewal_renew_date_and_arr(ctx, meta, &contract).await,
        );
    }
    Ok(())
}

async fn load_contract<S, Q, A>(
    ctx: &ProjectionContext<S, Q, A>,
    meta: &EventMeta<'_>,
    contract_id: ContractId,
) -> Result<Contract>
where
    S: Store,
    Q: EffectQueue,
    A: ActionRecorder,
{
    ctx.store
        .get_contract(meta.tenant, &contract_id)
        .await?
        .ok_or_else(|| Error::not_found(ENTITY, contract_id))
}

/// Marks the organization a former customer once its last running contract
/// has ended.
async fn refresh_organization_relationship<S, Q, A>(
    ctx: &ProjectionContext<S, Q, A>,
    meta: &EventMeta<'_>,
    contract: &Contract,
) -> Result<()>
where
    S: Store,
    Q: EffectQueue,
    A: ActionRecorder,
{
    if contract.status != ContractStatus::Ended {
        return Ok(());
    }

    let contracts = ctx
        .store
        .contracts_for_organization(meta.tenant, &contract.organization_id)
        .await?;
    if contracts
        .iter()
        .any(|other| other.id != contract.id && other.status.is_active())
    {
        return Ok(());
    }

    let Some(mut organization) = ctx
        .store
        .get_organization(meta.tenant, &contract.organization_id)
        .await?
    else {
        tracing::debug!(organization_id = %contract.organization_id, "organization not projected");
        return Ok(());
    };
    if organization.relationship == OrganizationRelationship::FormerCustomer {
        return Ok(());
    }

    organization.relationship = OrganizationRelationship::FormerCustomer;
    organization.updated_at = meta.now;
    ctx.store.save_organization(meta.tenant, &organization).await?;
    tracing::info!(organization_id = %organization.id, "organization is now a former customer");
    Ok(())
}

async fn suspend_active_renewal<S, Q, A>(
    ctx: &ProjectionContext<S, Q, A>,
    meta: &EventMeta<'_>,
    contract: &Contract,
) -> Result<()>
where
    S: Store,
    Q: EffectQueue,
    A: ActionRecorder,
{
    if let Some(mut renewal) = ctx
        .store
        .active_renewal_opportunity(meta.tenant, &contract.id)
        .await?
    {
        renewal.stage = OpportunityStage::Suspended;
        renewal.updated_at = meta.now;
        ctx.store.save_opportunity(meta.tenant, &renewal).await?;
        tracing::info!(opportunity_id = %renewal.id, "renewal suspended");
    } else {
        tracing::debug!("no active renewal to suspend");
    }

    // Summaries are refreshed whether or not a renewal was suspended.
    ctx.enqueue(
        meta,
        SideEffect::RefreshRenewalSummary {
            organization_id: contract.organization_id,
        },
    )
    .await;
    ctx.enqueue(
        meta,
        SideEffect::RefreshArr {
            organization_id: contract.organization_id,
        },
    )
    .await;
    Ok(())
}

async fn reactivate_suspended_renewal<S, Q, A>(
    ctx: &ProjectionContext<S, Q, A>,
    meta: &EventMeta<'_>,
    contract: &Contract,
) -> Result<()>
where
    S: Store,
    Q: EffectQueue,
    A: ActionRecorder,
{
    let Some(mut renewal) = ctx
        .store
        .suspended_renewal_opportunity(meta.tenant, &contract.id)
        .await?
    else {
        return Ok(());
    };

    renewal.stage = OpportunityStage::Open;
    renewal.updated_at = meta.now;
    ctx.store.save_opportunity(meta.tenant, &renewal).await?;
    tracing::info!(opportunity_id = %renewal.id, "renewal reactivated");
    Ok(())
}

async fn record_status_action<S, Q, A>(
    ctx: &ProjectionContext<S, Q, A>,
    meta: &EventMeta<'_>,
    contract: &Contract,
) where
    S: Store,
    Q: EffectQueue,
    A: ActionRecorder,
{
    let name = contract.display_name();
    let Some(message) = status_change_message(name, contract.status) else {
        return;
    };

    let action = Action::builder()
        .entity(contract.id, EntityType::Contract)
        .action_type(ActionType::ContractStatusUpdated)
        .metadata(json!({
            "status": contract.status.as_str(),
            "contractName": name,
            "comment": message,
        }))
        .content(message)
        .created_at(contract.updated_at);
    ctx.record_action(meta, action).await;
}
