//! Renewal bookkeeping shared by contract and opportunity handlers.
//!
//! Keeps the contract's active renewal in line with the contract: renewal
//! date, renewal ARR and a likelihood that follows the contract end date.

use serde_json::json;

use tenure_core::{Action, ActionRecorder, ActionType, EntityType};

use super::{EventMeta, ProjectionContext};
use crate::effects::{EffectQueue, SideEffect};
use crate::error::Result;
use crate::model::{Contract, RenewalOpportunity};
use crate::status::{RenewalArr, likelihood_adjustment, next_renewal_date};
use crate::store::Store;

/// Brings the active renewal's date and ARR up to date with `contract`.
///
/// - no renewal cycle: nothing to do
/// - no active renewal: request one, unless the contract has ended
/// - contract ended: request the active renewal be closed as lost
/// - otherwise fill a missing renewal date and recompute the ARR
///
/// # Errors
///
/// Returns an error if the store fails on the renewal itself.
pub async fn update_active_renewal_renew_date_and_arr<S, Q, A>(
    ctx: &ProjectionContext<S, Q, A>,
    meta: &EventMeta<'_>,
    contract: &Contract,
) -> Result<()>
where
    S: Store,
    Q: EffectQueue,
    A: ActionRecorder,
{
    if !contract.renewal_cycle.is_frequency_based() {
        return Ok(());
    }

    let Some(mut renewal) = ctx
        .store
        .active_renewal_opportunity(meta.tenant, &contract.id)
        .await?
    else {
        if contract.has_ended(meta.now) {
            tracing::debug!(contract_id = %contract.id, "ended contract has no active renewal");
        } else {
            ctx.enqueue(
                meta,
                SideEffect::CreateRenewalOpportunity {
                    contract_id: contract.id,
                },
            )
            .await;
        }
        return Ok(());
    };

    if contract.has_ended(meta.now) {
        ctx.enqueue(
            meta,
            SideEffect::CloseLostOpportunity {
                opportunity_id: renewal.id,
            },
        )
        .await;
        return Ok(());
    }

    if renewal.renewed_at.is_none() {
        let last_won = ctx
            .store
            .latest_closed_won_renewal(meta.tenant, &contract.id)
            .await?
            .and_then(|won| won.renewed_at);
        let anchor = last_won.or(contract.service_started_at);
        let next = anchor.and_then(|anchor| {
            next_renewal_date(anchor, contract.renewal_cycle, contract.auto_renew, meta.now)
        });

        if let Some(renewed_at) = next {
            renewal.renewed_at = Some(renewed_at);
            renewal.updated_at = meta.now;
            ctx.store.save_opportunity(meta.tenant, &renewal).await?;
            tracing::info!(opportunity_id = %renewal.id, %renewed_at, "renewal date set");

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
        }
    }

    refresh_renewal_arr(ctx, meta, contract, &mut renewal).await
}

/// Recomputes the renewal's amounts; saves and requests an ARR refresh when
/// they moved.
///
/// # Errors
///
/// Returns an error if the store fails.
pub async fn refresh_renewal_arr<S, Q, A>(
    ctx: &ProjectionContext<S, Q, A>,
    meta: &EventMeta<'_>,
    contract: &Contract,
    renewal: &mut RenewalOpportunity,
) -> Result<()>
where
    S: Store,
    Q: EffectQueue,
    A: ActionRecorder,
{
    if contract.has_ended(meta.now) {
        return Ok(());
    }

    let items = ctx
        .store
        .service_line_items_for_contract(meta.tenant, &contract.id)
        .await?;
    let arr = RenewalArr::compute(&items, contract.ended_at, renewal.adjusted_rate, meta.now);
    if !arr.differs_from(renewal) {
        return Ok(());
    }

    renewal.max_amount = arr.max_amount;
    renewal.amount = arr.amount;
    renewal.updated_at = meta.now;
    ctx.store.save_opportunity(meta.tenant, renewal).await?;
    tracing::debug!(
        opportunity_id = %renewal.id,
        max_amount = arr.max_amount,
        amount = arr.amount,
        "renewal arr updated"
    );

    ctx.enqueue(
        meta,
        SideEffect::RefreshArr {
            organization_id: contract.organization_id,
        },
    )
    .await;
    Ok(())
}

/// Moves the active renewal's likelihood to follow the contract end date.
///
/// # Errors
///
/// Returns an error if the store fails.
pub async fn adjust_likelihood<S, Q, A>(
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
        .active_renewal_opportunity(meta.tenant, &contract.id)
        .await?
    else {
        return Ok(());
    };
    let Some(adjustment) = likelihood_adjustment(contract.ended_at, &renewal) else {
        return Ok(());
    };

    renewal.likelihood = adjustment.likelihood;
    renewal.adjusted_rate = adjustment.adjusted_rate;
    let arr = RenewalArr::compute(
        &ctx.store
            .service_line_items_for_contract(meta.tenant, &contract.id)
            .await?,
        contract.ended_at,
        renewal.adjusted_rate,
        meta.now,
    );
    renewal.max_amount = arr.max_amount;
    renewal.amount = arr.amount;
    renewal.updated_at = meta.now;
    ctx.store.save_opportunity(meta.tenant, &renewal).await?;

    tracing::info!(
        opportunity_id = %renewal.id,
        likelihood = %renewal.likelihood,
        "renewal likelihood adjusted to contract end date"
    );
    likelihood_changed(ctx, meta, contract, &renewal, None).await;
    ctx.enqueue(
        meta,
        SideEffect::RefreshArr {
            organization_id: contract.organization_id,
        },
    )
    .await;
    Ok(())
}

/// Announces a likelihood change: a timeline action and a renewal summary
/// refresh for the owning organization.
pub async fn likelihood_changed<S, Q, A>(
    ctx: &ProjectionContext<S, Q, A>,
    meta: &EventMeta<'_>,
    contract: &Contract,
    renewal: &RenewalOpportunity,
    changed_by: Option<&str>,
) where
    S: Store,
    Q: EffectQueue,
    A: ActionRecorder,
{
    let mut content = format!("Renewal likelihood set to {}", renewal.likelihood.title());
    if let Some(user) = changed_by {
        content.push_str(" by ");
        content.push_str(user);
    }

    let action = Action::builder()
        .entity(contract.id, EntityType::Contract)
        .action_type(ActionType::RenewalLikelihoodUpdated)
        .content(content)
        .metadata(json!({
            "reason": renewal.comments,
            "likelihood": renewal.likelihood,
        }))
        .extra_property("comments", json!(renewal.comments))
        .created_at(renewal.updated_at);
    ctx.record_action(meta, action).await;

    ctx.enqueue(
        meta,
        SideEffect::RefreshRenewalSummary {
            organization_id: contract.organization_id,
        },
    )
    .await;
}
