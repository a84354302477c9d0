//! Onboarding plan and milestone handlers, and bottom-up status propagation.
//!
//! Statuses flow Item → Milestone → Plan → Organization. Each stage is a pure
//! aggregation over all children followed by a change gate: a parent is only
//! written when its derived status moved. The organization is re-derived
//! whenever a plan is touched, so a redelivered event can finish an
//! organization write that failed the first time.

use serde_json::json;

use tenure_core::{
    Action, ActionRecorder, ActionType, ContractId, EntityType, OrganizationId, PlanId,
};

use super::{EventMeta, ProjectionContext};
use crate::effects::{EffectQueue, SideEffect};
use crate::error::{Error, Result};
use crate::events::{
    MilestoneCreated, MilestoneUpdated, MilestonesReordered, PlanCreated, PlanUpdated, event_types,
};
use crate::model::{Milestone, MilestoneItem, MilestoneStatus, Organization, StatusDetails};
use crate::status::{aggregate_items, aggregate_milestones, aggregate_plans, recolor, should_be_late};
use crate::store::Store;

/// Handles `V1_ORGANIZATION_PLAN_CREATE`.
///
/// # Errors
///
/// Returns an error if the store fails.
#[tracing::instrument(
    skip(ctx, meta, data),
    fields(
        tenant = %meta.tenant,
        plan_id = %plan_id,
        organization_id = %data.organization_id,
    )
)]
pub async fn handle_plan_create<S, Q, A>(
    ctx: &ProjectionContext<S, Q, A>,
    meta: &EventMeta<'_>,
    plan_id: PlanId,
    data: &PlanCreated,
) -> Result<()>
where
    S: Store,
    Q: EffectQueue,
    A: ActionRecorder,
{
    if ctx.store.get_plan(meta.tenant, &plan_id).await?.is_some() {
        tracing::debug!("plan already projected");
        return Ok(());
    }

    let plan = data.to_plan(plan_id);
    ctx.store.save_plan(meta.tenant, &plan).await?;
    tracing::info!("plan created");

    propagate_to_organization(ctx, meta, plan.organization_id).await
}

/// Handles `V1_ORGANIZATION_PLAN_UPDATE`.
///
/// # Errors
///
/// Returns [`Error::EntityNotFound`] if the plan does not exist, or an error
/// if the store fails.
#[tracing::instrument(
    skip(ctx, meta, data),
    fields(
        tenant = %meta.tenant,
        plan_id = %plan_id,
        status_changed = tracing::field::Empty,
    )
)]
pub async fn handle_plan_update<S, Q, A>(
    ctx: &ProjectionContext<S, Q, A>,
    meta: &EventMeta<'_>,
    plan_id: PlanId,
    data: &PlanUpdated,
) -> Result<()>
where
    S: Store,
    Q: EffectQueue,
    A: ActionRecorder,
{
    let mut plan = ctx
        .store
        .get_plan(meta.tenant, &plan_id)
        .await?
        .ok_or_else(|| Error::not_found("plan", plan_id))?;

    let status_changed = data.apply(&mut plan);
    ctx.store.save_plan(meta.tenant, &plan).await?;
    tracing::Span::current().record("status_changed", status_changed);

    propagate_to_organization(ctx, meta, plan.organization_id).await
}

/// Handles `V1_ORGANIZATION_PLAN_MILESTONE_CREATE`.
///
/// Items start as not done, each with a fresh id.
///
/// # Errors
///
/// Returns an error if the store fails or the plan does not exist.
#[tracing::instrument(
    skip(ctx, meta, data),
    fields(
        tenant = %meta.tenant,
        plan_id = %plan_id,
        milestone_id = %data.milestone_id,
    )
)]
pub async fn handle_milestone_create<S, Q, A>(
    ctx: &ProjectionContext<S, Q, A>,
    meta: &EventMeta<'_>,
    plan_id: PlanId,
    data: &MilestoneCreated,
) -> Result<()>
where
    S: Store,
    Q: EffectQueue,
    A: ActionRecorder,
{
    if ctx
        .store
        .get_milestone(meta.tenant, &data.milestone_id)
        .await?
        .is_some()
    {
        tracing::debug!("milestone already projected");
        return Ok(());
    }

    let milestone = Milestone {
        id: data.milestone_id,
        plan_id,
        name: data.name.clone(),
        order: data.order,
        due_date: data.due_date,
        optional: data.optional,
        retired: false,
        items: data
            .items
            .iter()
            .map(|text| MilestoneItem::new(text.as_str(), data.created_at))
            .collect(),
        status_details: StatusDetails::new(MilestoneStatus::NotStarted, data.created_at),
        created_at: data.created_at,
        updated_at: data.created_at,
    };
    ctx.store.save_milestone(meta.tenant, &milestone).await?;
    tracing::info!(items = milestone.items.len(), "milestone created");

    propagate_from_milestones(ctx, meta, plan_id).await
}

/// Handles `V1_ORGANIZATION_PLAN_MILESTONE_UPDATE`.
///
/// Lateness is judged at the event's `updated_at`. A due-date move that flips
/// lateness recolors the milestone and every item; otherwise a new item list
/// re-derives the milestone status from scratch. Never both.
///
/// # Errors
///
/// Returns [`Error::EntityNotFound`] if the milestone does not exist,
/// [`Error::MalformedEvent`] if it belongs to another plan, or an error if
/// the store fails.
#[tracing::instrument(
    skip(ctx, meta, data),
    fields(
        tenant = %meta.tenant,
        plan_id = %plan_id,
        milestone_id = %data.milestone_id,
        status = tracing::field::Empty,
    )
)]
pub async fn handle_milestone_update<S, Q, A>(
    ctx: &ProjectionContext<S, Q, A>,
    meta: &EventMeta<'_>,
    plan_id: PlanId,
    data: &MilestoneUpdated,
) -> Result<()>
where
    S: Store,
    Q: EffectQueue,
    A: ActionRecorder,
{
    let stored = ctx
        .store
        .get_milestone(meta.tenant, &data.milestone_id)
        .await?
        .ok_or_else(|| Error::not_found("milestone", data.milestone_id))?;
    if stored.plan_id != plan_id {
        return Err(Error::MalformedEvent {
            event_type: event_types::ORGANIZATION_PLAN_MILESTONE_UPDATE.to_owned(),
            message: format!(
                "milestone {} belongs to plan {}, not {plan_id}",
                stored.id, stored.plan_id
            ),
        });
    }

    let at = data.updated_at;
    let mut milestone = apply_milestone_fields(&stored, data);

    let current = data
        .status_details
        .clone()
        .unwrap_or_else(|| stored.status_details.clone());
    let items = data.items.as_deref().unwrap_or(&stored.items);
    let late = should_be_late(milestone.due_date, at);

    let status_written = if data.due_date.is_some() && late != current.status.is_late() {
        let (status, items) = recolor(current.status, items, late, at);
        milestone.items = items;
        milestone.status_details = StatusDetails {
            status,
            updated_at: at,
            comments: current.comments,
        };
        true
    } else if let Some(items) = &data.items {
        milestone.items.clone_from(items);
        milestone.status_details = StatusDetails {
            status: aggregate_items(items, late),
            updated_at: at,
            comments: current.comments,
        };
        true
    } else if data.status_details.is_some() {
        milestone.status_details = current;
        true
    } else {
        false
    };

    ctx.store.save_milestone(meta.tenant, &milestone).await?;
    tracing::Span::current().record("status", milestone.status_details.status.as_str());

    if milestone.status_details.status != stored.status_details.status {
        ctx.record_transition(
            "milestone",
            &milestone.id.to_string(),
            stored.status_details.status.as_str(),
            milestone.status_details.status.as_str(),
        );
    }

    if status_written {
        propagate_from_milestones(ctx, meta, plan_id).await?;
    }
    Ok(())
}

/// Handles `V1_ORGANIZATION_PLAN_MILESTONES_REORDER`.
///
/// Only positions change; order has no bearing on status, so nothing is
/// re-derived.
///
/// # Errors
///
/// Returns [`Error::EntityNotFound`] if a listed milestone does not exist, or
/// an error if the store fails.
#[tracing::instrument(
    skip(ctx, meta, data),
    fields(tenant = %meta.tenant, plan_id = %plan_id, count = data.milestone_ids.len())
)]
pub async fn handle_milestones_reorder<S, Q, A>(
    ctx: &ProjectionContext<S, Q, A>,
    meta: &EventMeta<'_>,
    plan_id: PlanId,
    data: &MilestonesReordered,
) -> Result<()>
where
    S: Store,
    Q: EffectQueue,
    A: ActionRecorder,
{
    for (position, milestone_id) in data.milestone_ids.iter().enumerate() {
        let mut milestone = ctx
            .store
            .get_milestone(meta.tenant, milestone_id)
            .await?
            .ok_or_else(|| Error::not_found("milestone", milestone_id))?;

        let order = u32::try_from(position).unwrap_or(u32::MAX);
        if milestone.order == order {
            continue;
        }
        milestone.order = order;
        milestone.updated_at = data.updated_at;
        ctx.store.save_milestone(meta.tenant, &milestone).await?;
    }
    Ok(())
}

/// Re-derives a plan's status from all of its milestones, persists it on
/// change, then re-derives the owning organization.
///
/// # Errors
///
/// Returns [`Error::EntityNotFound`] if the plan does not exist, or an error
/// if the store fails.
pub async fn propagate_from_milestones<S, Q, A>(
    ctx: &ProjectionContext<S, Q, A>,
    meta: &EventMeta<'_>,
    plan_id: PlanId,
) -> Result<()>
where
    S: Store,
    Q: EffectQueue,
    A: ActionRecorder,
{
    let mut plan = ctx
        .store
        .get_plan(meta.tenant, &plan_id)
        .await?
        .ok_or_else(|| Error::not_found("plan", plan_id))?;
    let milestones = ctx.store.milestones_for_plan(meta.tenant, &plan_id).await?;

    let status = aggregate_milestones(milestones.iter().map(|m| m.status_details.status));
    let previous = plan.status_details.status;
    if status == previous {
        tracing::debug!(%plan_id, status = status.as_str(), "plan status unchanged");
    } else {
        plan.status_details.status = status;
        plan.status_details.updated_at = meta.now;
        plan.updated_at = meta.now;
        ctx.store.save_plan(meta.tenant, &plan).await?;
        ctx.record_transition("plan", &plan_id.to_string(), previous.as_str(), status.as_str());
    }

    // The organization has its own gate. Running it on an unchanged plan
    // lets a redelivery finish an organization write that failed earlier.
    propagate_to_organization(ctx, meta, plan.organization_id).await
}

/// Re-derives an organization's onboarding status from all of its plans and,
/// on change, persists it, records an action and publishes the new status.
///
/// Organizations are never created here: no inbound event carries one, so
/// they are seeded into the store by whoever owns organization records. An
/// organization that is not there yet is skipped and picked up by the next
/// plan or milestone event.
///
/// # Errors
///
/// Returns an error if the store fails.
pub async fn propagate_to_organization<S, Q, A>(
    ctx: &ProjectionContext<S, Q, A>,
    meta: &EventMeta<'_>,
    organization_id: OrganizationId,
) -> Result<()>
where
    S: Store,
    Q: EffectQueue,
    A: ActionRecorder,
{
    let Some(mut organization) = ctx
        .store
        .get_organization(meta.tenant, &organization_id)
        .await?
    else {
        tracing::warn!(%organization_id, "organization not projected, onboarding status not derived");
        return Ok(());
    };
    let plans = ctx
        .store
        .plans_for_organization(meta.tenant, &organization_id)
        .await?;

    let status = aggregate_plans(plans.iter().map(|p| p.status_details.status));
    let previous = organization.onboarding.status;
    if status == previous {
        return Ok(());
    }

    organization.onboarding.status = status;
    organization.onboarding.updated_at = Some(meta.now);
    organization.updated_at = meta.now;
    ctx.store.save_organization(meta.tenant, &organization).await?;
    ctx.record_transition(
        "organization",
        &organization_id.to_string(),
        previous.as_str(),
        status.as_str(),
    );

    record_onboarding_action(ctx, meta, &organization, None, None).await;
    ctx.enqueue(
        meta,
        SideEffect::UpdateOnboardingStatus {
            organization_id,
            status,
            comments: organization.onboarding.comments.clone(),
            caused_by: None,
        },
    )
    .await;
    Ok(())
}

/// Records an `ONBOARDING_STATUS_CHANGED` action for the organization's
/// current onboarding status.
pub(crate) async fn record_onboarding_action<S, Q, A>(
    ctx: &ProjectionContext<S, Q, A>,
    meta: &EventMeta<'_>,
    organization: &Organization,
    changed_by: Option<(&str, &str)>,
    caused_by: Option<ContractId>,
) where
    S: Store,
    Q: EffectQueue,
    A: ActionRecorder,
{
    let onboarding = &organization.onboarding;
    let readable = onboarding.status.readable();
    let (content, user_id) = match changed_by {
        Some((user_id, user_name)) => (
            format!("{user_name} changed the onboarding status to {readable}"),
            user_id,
        ),
        None => (
            format!("The onboarding status was automatically set to {readable}"),
            "",
        ),
    };

    let action = Action::builder()
        .entity(organization.id, EntityType::Organization)
        .action_type(ActionType::OnboardingStatusChanged)
        .content(content)
        .metadata(json!({
            "status": onboarding.status.as_str(),
            "comments": onboarding.comments,
            "userId": user_id,
            "contractId": caused_by.map(|id| id.to_string()).unwrap_or_default(),
        }))
        .extra_property("status", json!(onboarding.status.as_str()))
        .extra_property("comments", json!(onboarding.comments))
        .created_at(onboarding.updated_at.unwrap_or(meta.now));
    ctx.record_action(meta, action).await;
}

fn apply_milestone_fields(stored: &Milestone, data: &MilestoneUpdated) -> Milestone {
    let mut milestone = stored.clone();
    if let Some(name) = &data.name {
        milestone.name.clone_from(name);
    }
    if let Some(order) = data.order {
        milestone.order = order;
    }
    if let Some(due_date) = data.due_date {
        milestone.due_date = due_date;
    }
    if let Some(optional) = data.optional {
        milestone.optional = optional;
    }
    if let Some(retired) = data.retired {
        milestone.retired = retired;
    }
    milestone.updated_at = data.updated_at;
    milestone
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};
    use tenure_core::MilestoneId;

    use super::*;

    #[test]
    fn masked_fields_leave_the_rest_untouched() {
        let created = Utc.with_ymd_and_hms(2024, 1, 1, 9, 0, 0).unwrap();
        let stored = Milestone {
            id: MilestoneId::generate(),
            plan_id: PlanId::generate(),
            name: "Kickoff".into(),
            order: 0,
            due_date: created,
            optional: false,
            retired: false,
            items: vec![MilestoneItem::new("Intro call", created)],
            status_details: StatusDetails::new(MilestoneStatus::Started, created),
            created_at: created,
            updated_at: created,
        };
        let later = created + chrono::Duration::days(1);
        let data = MilestoneUpdated {
            milestone_id: stored.id,
            name: Some("Kick-off".into()),
            order: None,
            due_date: None,
            optional: Some(true),
            retired: None,
            items: None,
            status_details: None,
            updated_at: later,
        };

        let updated = apply_milestone_fields(&stored, &data);
        assert_eq!(updated.name, "Kick-off");
        assert!(updated.optional);
        assert_eq!(updated.items, stored.items);
        assert_eq!(updated.status_details, stored.status_details);
        assert_eq!(updated.updated_at, later);
    }
}
