//! Onboarding status propagation tests.
//!
//! Item → milestone → plan → organization, with lateness judged on calendar
//! dates and each stage gated on an actual status change.

use chrono::{DateTime, Duration, Utc};
use serde_json::{Value, json};

use tenure_core::{ActionType, ContractId, MilestoneId, OrganizationId, PlanId};
use tenure_projection::effects::SideEffect;
use tenure_projection::error::Error;
use tenure_projection::events::event_types;
use tenure_projection::model::{
    ItemStatus, MilestoneStatus, OnboardingStatus, PlanStatus,
};
use tenure_test_utils::{Harness, MilestoneFactory, assert_no_effect_kind, at, single_action};

async fn start_plan(harness: &Harness) -> (OrganizationId, PlanId) {
    let organization_id = harness.seed_organization("Initech").await;
    let plan_id = PlanId::generate();
    harness
        .send(
            event_types::ORGANIZATION_PLAN_CREATE,
            plan_id,
            json!({
                "organizationId": organization_id,
                "name": "Enterprise onboarding",
                "createdAt": at(2024, 1, 1),
            }),
        )
        .await
        .unwrap();
    (organization_id, plan_id)
}

async fn add_milestone(
    harness: &Harness,
    plan_id: PlanId,
    order: u32,
    due_date: DateTime<Utc>,
) -> MilestoneId {
    let milestone_id = MilestoneId::generate();
    harness
        .send(
            event_types::ORGANIZATION_PLAN_MILESTONE_CREATE,
            plan_id,
            MilestoneFactory::create_payload(milestone_id, order, due_date, &["Kickoff call", "Provision"]),
        )
        .await
        .unwrap();
    milestone_id
}

/// Sends the milestone's stored items back with new statuses.
async fn mark_items(
    harness: &Harness,
    plan_id: PlanId,
    milestone_id: MilestoneId,
    statuses: &[ItemStatus],
) {
    let mut items = harness.milestone(milestone_id).await.items;
    for (item, status) in items.iter_mut().zip(statuses) {
        item.status = *status;
    }
    harness
        .send(
            event_types::ORGANIZATION_PLAN_MILESTONE_UPDATE,
            plan_id,
            json!({
                "milestoneId": milestone_id,
                "items": serde_json::to_value(&items).unwrap(),
                "updatedAt": harness.now,
            }),
        )
        .await
        .unwrap();
}

fn onboarding_actions(harness: &Harness) -> Vec<String> {
    harness
        .actions()
        .into_iter()
        .filter(|a| a.action_type == ActionType::OnboardingStatusChanged)
        .map(|a| a.content)
        .collect()
}

#[tokio::test]
async fn new_plan_starts_the_organization_onboarding() {
    let harness = Harness::new();
    let (organization_id, plan_id) = start_plan(&harness).await;

    assert_eq!(harness.plan(plan_id).await.status_details.status, PlanStatus::NotStarted);
    let organization = harness.organization(organization_id).await;
    assert_eq!(organization.onboarding.status, OnboardingStatus::NotStarted);
    assert_eq!(organization.onboarding.updated_at, Some(harness.now));

    let action = single_action(&harness.actions(), ActionType::OnboardingStatusChanged);
    assert_eq!(action.entity_id, organization_id.to_string());
    assert_eq!(
        action.content,
        "The onboarding status was automatically set to Not started"
    );
    let metadata: Value = serde_json::from_str(&action.metadata).unwrap();
    assert_eq!(metadata["status"], "NOT_STARTED");
    assert_eq!(metadata["userId"], "");
    assert_eq!(
        harness.pending_effects(),
        vec![SideEffect::UpdateOnboardingStatus {
            organization_id,
            status: OnboardingStatus::NotStarted,
            comments: String::new(),
            caused_by: None,
        }]
    );
}

#[tokio::test]
async fn finishing_every_item_finishes_the_whole_chain() {
    let harness = Harness::new();
    let (organization_id, plan_id) = start_plan(&harness).await;
    let milestone_id = add_milestone(&harness, plan_id, 0, at(2024, 7, 1)).await;
    assert_eq!(
        harness.milestone(milestone_id).await.status_details.status,
        MilestoneStatus::NotStarted
    );

    mark_items(&harness, plan_id, milestone_id, &[ItemStatus::Done, ItemStatus::Done]).await;

    assert_eq!(
        harness.milestone(milestone_id).await.status_details.status,
        MilestoneStatus::Done
    );
    assert_eq!(harness.plan(plan_id).await.status_details.status, PlanStatus::Done);
    assert_eq!(
        harness.organization(organization_id).await.onboarding.status,
        OnboardingStatus::Done
    );
    assert_eq!(
        onboarding_actions(&harness),
        vec![
            "The onboarding status was automatically set to Not started",
            "The onboarding status was automatically set to Done",
        ]
    );
}

#[tokio::test]
async fn done_next_to_untouched_milestone_is_not_started() {
    let harness = Harness::new();
    let (organization_id, plan_id) = start_plan(&harness).await;
    let first = add_milestone(&harness, plan_id, 0, at(2024, 7, 1)).await;
    let second = add_milestone(&harness, plan_id, 1, at(2024, 8, 1)).await;

    mark_items(&harness, plan_id, first, &[ItemStatus::Done, ItemStatus::Done]).await;
    assert_eq!(harness.plan(plan_id).await.status_details.status, PlanStatus::NotStarted);

    mark_items(&harness, plan_id, second, &[ItemStatus::Done, ItemStatus::NotDone]).await;

    assert_eq!(
        harness.milestone(second).await.status_details.status,
        MilestoneStatus::Started
    );
    assert_eq!(harness.plan(plan_id).await.status_details.status, PlanStatus::OnTrack);
    assert_eq!(
        harness.organization(organization_id).await.onboarding.status,
        OnboardingStatus::OnTrack
    );
}

#[tokio::test]
async fn skipped_items_count_as_started() {
    let harness = Harness::new();
    let (_, plan_id) = start_plan(&harness).await;
    let milestone_id = add_milestone(&harness, plan_id, 0, at(2024, 7, 1)).await;

    mark_items(&harness, plan_id, milestone_id, &[ItemStatus::Skipped, ItemStatus::NotDone]).await;

    assert_eq!(
        harness.milestone(milestone_id).await.status_details.status,
        MilestoneStatus::Started
    );
}

#[tokio::test]
async fn moving_the_due_date_into_the_past_recolors_everything() {
    let harness = Harness::new();
    let (organization_id, plan_id) = start_plan(&harness).await;
    let milestone_id = add_milestone(&harness, plan_id, 0, at(2024, 7, 1)).await;
    mark_items(&harness, plan_id, milestone_id, &[ItemStatus::Done, ItemStatus::NotDone]).await;
    harness.take_effects();

    harness
        .send(
            event_types::ORGANIZATION_PLAN_MILESTONE_UPDATE,
            plan_id,
            json!({
                "milestoneId": milestone_id,
                "dueDate": at(2024, 5, 1),
                "updatedAt": harness.now,
            }),
        )
        .await
        .unwrap();

    let milestone = harness.milestone(milestone_id).await;
    assert_eq!(milestone.due_date, at(2024, 5, 1));
    assert_eq!(milestone.status_details.status, MilestoneStatus::StartedLate);
    let items: Vec<_> = milestone.items.iter().map(|item| item.status).collect();
    assert_eq!(items, vec![ItemStatus::DoneLate, ItemStatus::NotDoneLate]);
    assert!(milestone.items.iter().all(|item| item.updated_at == harness.now));

    assert_eq!(harness.plan(plan_id).await.status_details.status, PlanStatus::Late);
    assert_eq!(
        harness.organization(organization_id).await.onboarding.status,
        OnboardingStatus::Late
    );
    assert_eq!(
        harness.pending_effects(),
        vec![SideEffect::UpdateOnboardingStatus {
            organization_id,
            status: OnboardingStatus::Late,
            comments: String::new(),
            caused_by: None,
        }]
    );
}

#[tokio::test]
async fn moving_the_due_date_back_clears_lateness() {
    let harness = Harness::new();
    let (_, plan_id) = start_plan(&harness).await;
    let milestone_id = add_milestone(&harness, plan_id, 0, at(2024, 7, 1)).await;
    mark_items(&harness, plan_id, milestone_id, &[ItemStatus::Done, ItemStatus::NotDone]).await;

    for due in [at(2024, 5, 1), at(2024, 9, 1)] {
        harness
            .send(
                event_types::ORGANIZATION_PLAN_MILESTONE_UPDATE,
                plan_id,
                json!({ "milestoneId": milestone_id, "dueDate": due, "updatedAt": harness.now }),
            )
            .await
            .unwrap();
    }

    let milestone = harness.milestone(milestone_id).await;
    assert_eq!(milestone.status_details.status, MilestoneStatus::Started);
    assert_eq!(milestone.items[0].status, ItemStatus::Done);
    assert_eq!(harness.plan(plan_id).await.status_details.status, PlanStatus::OnTrack);
}

#[tokio::test]
async fn finishing_after_the_due_date_is_done_late() {
    let harness = Harness::new();
    let (organization_id, plan_id) = start_plan(&harness).await;
    let milestone_id = add_milestone(&harness, plan_id, 0, at(2024, 5, 1)).await;

    mark_items(&harness, plan_id, milestone_id, &[ItemStatus::Done, ItemStatus::Done]).await;

    assert_eq!(
        harness.milestone(milestone_id).await.status_details.status,
        MilestoneStatus::DoneLate
    );
    assert_eq!(harness.plan(plan_id).await.status_details.status, PlanStatus::DoneLate);
    assert_eq!(
        harness.organization(organization_id).await.onboarding.status,
        OnboardingStatus::Done
    );
}

#[tokio::test]
async fn due_today_is_not_late() {
    let harness = Harness::new();
    let (_, plan_id) = start_plan(&harness).await;
    let milestone_id = add_milestone(&harness, plan_id, 0, harness.now - Duration::hours(3)).await;

    mark_items(&harness, plan_id, milestone_id, &[ItemStatus::Done, ItemStatus::Done]).await;

    assert_eq!(
        harness.milestone(milestone_id).await.status_details.status,
        MilestoneStatus::Done
    );
}

#[tokio::test]
async fn unchanged_plan_status_writes_nothing_upstream() {
    let harness = Harness::new();
    let (organization_id, plan_id) = start_plan(&harness).await;
    let first = add_milestone(&harness, plan_id, 0, at(2024, 7, 1)).await;
    let second = add_milestone(&harness, plan_id, 1, at(2024, 7, 1)).await;
    mark_items(&harness, plan_id, first, &[ItemStatus::Done, ItemStatus::NotDone]).await;
    harness.take_effects();
    harness.store.clear_operations();

    mark_items(&harness, plan_id, second, &[ItemStatus::Skipped, ItemStatus::NotDone]).await;

    assert_eq!(harness.plan(plan_id).await.status_details.status, PlanStatus::OnTrack);
    let writes: Vec<_> = harness.store.writes().into_iter().map(|op| op.method).collect();
    assert_eq!(writes, vec!["save_milestone"]);
    assert_no_effect_kind(&harness.pending_effects(), "update_onboarding_status");
    assert_eq!(
        harness.organization(organization_id).await.onboarding.status,
        OnboardingStatus::OnTrack
    );
}

#[tokio::test]
async fn redelivered_milestone_update_finishes_a_failed_organization_write() {
    let harness = Harness::new();
    let (organization_id, plan_id) = start_plan(&harness).await;
    let milestone_id = add_milestone(&harness, plan_id, 0, at(2024, 7, 1)).await;
    harness.take_effects();

    let mut items = harness.milestone(milestone_id).await.items;
    for item in &mut items {
        item.status = ItemStatus::Done;
    }
    let finished = harness.event(
        event_types::ORGANIZATION_PLAN_MILESTONE_UPDATE,
        plan_id,
        json!({
            "milestoneId": milestone_id,
            "items": serde_json::to_value(&items).unwrap(),
            "updatedAt": harness.now,
        }),
    );

    harness.store.inject_failure("save_organization");
    let err = harness.replay(&finished).await.unwrap_err();
    assert!(matches!(err, Error::Storage { .. }), "{err}");
    assert_eq!(harness.plan(plan_id).await.status_details.status, PlanStatus::Done);
    assert_eq!(
        harness.organization(organization_id).await.onboarding.status,
        OnboardingStatus::NotStarted
    );

    harness.store.clear_failures();
    harness.replay(&finished).await.unwrap();

    assert_eq!(
        harness.organization(organization_id).await.onboarding.status,
        OnboardingStatus::Done
    );
    assert_eq!(
        onboarding_actions(&harness).last().map(String::as_str),
        Some("The onboarding status was automatically set to Done")
    );
    assert!(harness.pending_effects().iter().any(|effect| matches!(
        effect,
        SideEffect::UpdateOnboardingStatus { organization_id: id, status: OnboardingStatus::Done, .. }
            if *id == organization_id
    )));
}

#[tokio::test]
async fn redelivered_plan_update_finishes_a_failed_organization_write() {
    let harness = Harness::new();
    let (organization_id, plan_id) = start_plan(&harness).await;
    let closed = harness.event(
        event_types::ORGANIZATION_PLAN_UPDATE,
        plan_id,
        json!({
            "statusDetails": { "status": "DONE", "updatedAt": harness.now, "comments": "" },
            "updatedAt": harness.now,
        }),
    );

    harness.store.inject_failure("save_organization");
    assert!(harness.replay(&closed).await.is_err());
    harness.store.clear_failures();
    harness.replay(&closed).await.unwrap();

    assert_eq!(
        harness.organization(organization_id).await.onboarding.status,
        OnboardingStatus::Done
    );
}

#[tokio::test]
async fn milestone_update_under_another_plan_is_rejected() {
    let harness = Harness::new();
    let (_, plan_id) = start_plan(&harness).await;
    let (_, other_plan_id) = start_plan(&harness).await;
    let milestone_id = add_milestone(&harness, plan_id, 0, at(2024, 7, 1)).await;
    let before = harness.milestone(milestone_id).await;
    harness.store.clear_operations();

    let err = harness
        .send(
            event_types::ORGANIZATION_PLAN_MILESTONE_UPDATE,
            other_plan_id,
            json!({ "milestoneId": milestone_id, "name": "Moved", "updatedAt": harness.now }),
        )
        .await
        .unwrap_err();

    assert!(matches!(err, Error::MalformedEvent { .. }), "{err}");
    assert!(harness.store.writes().is_empty());
    assert_eq!(harness.milestone(milestone_id).await, before);
}

#[tokio::test]
async fn reordering_only_moves_milestones() {
    let harness = Harness::new();
    let (_, plan_id) = start_plan(&harness).await;
    let first = add_milestone(&harness, plan_id, 0, at(2024, 7, 1)).await;
    let second = add_milestone(&harness, plan_id, 1, at(2024, 8, 1)).await;
    let before = harness.plan(plan_id).await;
    harness.store.clear_operations();

    harness
        .send(
            event_types::ORGANIZATION_PLAN_MILESTONES_REORDER,
            plan_id,
            json!({ "milestoneIds": [second, first], "updatedAt": harness.now }),
        )
        .await
        .unwrap();

    assert_eq!(harness.milestone(second).await.order, 0);
    assert_eq!(harness.milestone(first).await.order, 1);
    assert_eq!(harness.plan(plan_id).await, before);
    let writes: Vec<_> = harness.store.writes().into_iter().map(|op| op.method).collect();
    assert_eq!(writes, vec!["save_milestone", "save_milestone"]);
}

#[tokio::test]
async fn reordering_an_unknown_milestone_is_not_found() {
    let harness = Harness::new();
    let (_, plan_id) = start_plan(&harness).await;

    let err = harness
        .send(
            event_types::ORGANIZATION_PLAN_MILESTONES_REORDER,
            plan_id,
            json!({ "milestoneIds": [MilestoneId::generate()], "updatedAt": harness.now }),
        )
        .await
        .unwrap_err();
    assert!(err.is_not_found(), "{err}");
}

#[tokio::test]
async fn replayed_creates_are_idempotent() {
    let harness = Harness::new();
    let organization_id = harness.seed_organization("Initech").await;
    let plan_id = PlanId::generate();
    let milestone_id = MilestoneId::generate();
    let plan_event = harness.event(
        event_types::ORGANIZATION_PLAN_CREATE,
        plan_id,
        json!({ "organizationId": organization_id, "createdAt": at(2024, 1, 1) }),
    );
    let milestone_event = harness.event(
        event_types::ORGANIZATION_PLAN_MILESTONE_CREATE,
        plan_id,
        MilestoneFactory::create_payload(milestone_id, 0, at(2024, 7, 1), &["Kickoff call"]),
    );

    for event in [&plan_event, &milestone_event, &plan_event, &milestone_event] {
        harness.replay(event).await.unwrap();
    }

    assert_eq!(harness.milestone(milestone_id).await.items.len(), 1);
    assert_eq!(onboarding_actions(&harness).len(), 1);
    assert_eq!(harness.pending_effects().len(), 1);
}

#[tokio::test]
async fn plan_for_an_unprojected_organization_is_kept() {
    let harness = Harness::new();
    let plan_id = PlanId::generate();

    harness
        .send(
            event_types::ORGANIZATION_PLAN_CREATE,
            plan_id,
            json!({ "organizationId": OrganizationId::generate(), "createdAt": at(2024, 1, 1) }),
        )
        .await
        .unwrap();

    assert_eq!(harness.plan(plan_id).await.status_details.status, PlanStatus::NotStarted);
    assert!(harness.actions().is_empty());
    assert!(harness.pending_effects().is_empty());
}

#[tokio::test]
async fn unknown_milestone_update_is_not_found() {
    let harness = Harness::new();
    let (_, plan_id) = start_plan(&harness).await;

    let err = harness
        .send(
            event_types::ORGANIZATION_PLAN_MILESTONE_UPDATE,
            plan_id,
            json!({ "milestoneId": MilestoneId::generate(), "updatedAt": harness.now }),
        )
        .await
        .unwrap_err();
    assert!(err.is_not_found(), "{err}");
}

#[tokio::test]
async fn manual_plan_status_reaches_the_organization() {
    let harness = Harness::new();
    let (organization_id, plan_id) = start_plan(&harness).await;

    harness
        .send(
            event_types::ORGANIZATION_PLAN_UPDATE,
            plan_id,
            json!({
                "statusDetails": { "status": "DONE", "updatedAt": harness.now, "comments": "Closed early" },
                "updatedAt": harness.now,
            }),
        )
        .await
        .unwrap();

    let plan = harness.plan(plan_id).await;
    assert_eq!(plan.status_details.status, PlanStatus::Done);
    assert_eq!(plan.status_details.comments, "Closed early");
    assert_eq!(
        harness.organization(organization_id).await.onboarding.status,
        OnboardingStatus::Done
    );
}

#[tokio::test]
async fn renaming_a_plan_does_not_propagate() {
    let harness = Harness::new();
    let (_, plan_id) = start_plan(&harness).await;
    harness.take_effects();

    harness
        .send(
            event_types::ORGANIZATION_PLAN_UPDATE,
            plan_id,
            json!({ "name": "Renamed", "updatedAt": harness.now }),
        )
        .await
        .unwrap();

    assert_eq!(harness.plan(plan_id).await.name, "Renamed");
    assert!(harness.pending_effects().is_empty());
    assert_eq!(onboarding_actions(&harness).len(), 1);
}

#[tokio::test]
async fn manual_onboarding_change_is_attributed_once() {
    let harness = Harness::new();
    harness.seed_user("u-7", "Fox Mulder").await;
    let organization_id = harness.seed_organization("Initech").await;
    let contract_id = ContractId::generate();
    let payload = json!({
        "status": "DONE",
        "comments": "Signed off",
        "userId": "u-7",
        "causedByContractId": contract_id,
        "updatedAt": harness.now,
    });

    for _ in 0..2 {
        harness
            .send(
                event_types::ORGANIZATION_UPDATE_ONBOARDING_STATUS,
                organization_id,
                payload.clone(),
            )
            .await
            .unwrap();
    }

    let onboarding = harness.organization(organization_id).await.onboarding;
    assert_eq!(onboarding.status, OnboardingStatus::Done);
    assert_eq!(onboarding.comments, "Signed off");

    let action = single_action(&harness.actions(), ActionType::OnboardingStatusChanged);
    assert_eq!(action.content, "Fox Mulder changed the onboarding status to Done");
    let metadata: Value = serde_json::from_str(&action.metadata).unwrap();
    assert_eq!(metadata["userId"], "u-7");
    assert_eq!(metadata["comments"], "Signed off");
    assert_eq!(metadata["contractId"], contract_id.to_string());
    assert_eq!(action.extra_properties["status"], "DONE");
    assert!(harness.pending_effects().is_empty());
}

#[tokio::test]
async fn onboarding_change_by_an_unknown_user_is_automatic() {
    let harness = Harness::new();
    let organization_id = harness.seed_organization("Initech").await;

    harness
        .send(
            event_types::ORGANIZATION_UPDATE_ONBOARDING_STATUS,
            organization_id,
            json!({ "status": "LATE", "userId": "ghost", "updatedAt": harness.now }),
        )
        .await
        .unwrap();

    let action = single_action(&harness.actions(), ActionType::OnboardingStatusChanged);
    assert_eq!(
        action.content,
        "The onboarding status was automatically set to Late"
    );
}
