//! Outbox delivery tests: projections enqueue, the dispatcher drains into a
//! sibling client with bounded retries.

use std::sync::Arc;
use std::time::Duration;

use serde_json::json;

use tenure_core::PlanId;
use tenure_projection::config::ProjectionConfig;
use tenure_projection::effects::client::{RetryPolicy, RetryingClient};
use tenure_projection::effects::dispatcher::{DispatchReport, EffectDispatcher};
use tenure_projection::effects::memory::InMemoryEffectQueue;
use tenure_projection::effects::{EffectQueue, SideEffect};
use tenure_projection::error::Result;
use tenure_projection::events::event_types;
use tenure_projection::model::{BilledType, OnboardingStatus};
use tenure_test_utils::{
    ContractFactory, Harness, RecordingSiblingClient, ScriptedFailure, at,
};

fn fast_policy(max_attempts: u32) -> RetryPolicy {
    RetryPolicy {
        max_attempts,
        base_backoff: Duration::from_millis(1),
        max_backoff: Duration::from_millis(2),
    }
}

fn dispatcher_for(
    harness: &Harness,
    client: &RecordingSiblingClient,
    max_attempts: u32,
) -> EffectDispatcher<Arc<InMemoryEffectQueue>, RecordingSiblingClient> {
    EffectDispatcher::new(
        Arc::clone(&harness.queue),
        RetryingClient::with_policy(client.clone(), fast_policy(max_attempts)),
    )
}

#[tokio::test]
async fn transient_failures_are_retried_until_delivered() -> Result<()> {
    let harness = Harness::new();
    let (_, contract_id) = harness.create_contract(&ContractFactory::annual()).await;
    let client = RecordingSiblingClient::new();
    client.fail_next("create_renewal_opportunity", 2, ScriptedFailure::Transient);

    let report = dispatcher_for(&harness, &client, 3).dispatch_pending().await?;

    assert_eq!(report, DispatchReport { succeeded: 1, failed: 0 });
    let calls = client.calls();
    assert_eq!(calls.len(), 3);
    assert!(calls.iter().all(|(tenant, effect)| {
        *tenant == harness.tenant && *effect == SideEffect::CreateRenewalOpportunity { contract_id }
    }));
    assert_eq!(harness.queue.queue_depth().await?, 0);
    Ok(())
}

#[tokio::test]
async fn exhausted_retries_are_counted_as_failed() -> Result<()> {
    let harness = Harness::new();
    harness.create_contract(&ContractFactory::annual()).await;
    let client = RecordingSiblingClient::new();
    client.fail_next("create_renewal_opportunity", 5, ScriptedFailure::Transient);

    let report = dispatcher_for(&harness, &client, 3).dispatch_pending().await?;

    assert_eq!(report, DispatchReport { succeeded: 0, failed: 1 });
    assert_eq!(client.calls_of("create_renewal_opportunity").len(), 3);
    assert_eq!(harness.queue.queue_depth().await?, 0);
    Ok(())
}

#[tokio::test]
async fn permanent_failure_is_not_retried_and_spares_the_rest() -> Result<()> {
    let harness = Harness::new();
    let (organization_id, contract_id) = harness.create_contract(&ContractFactory::annual()).await;
    harness
        .seed_line_item(contract_id, BilledType::Monthly, 50.0, 1)
        .await;
    harness.create_renewal(contract_id, None).await;
    assert_eq!(harness.pending_effects().len(), 4);

    let client = RecordingSiblingClient::new();
    client.fail_next("refresh_arr", 1, ScriptedFailure::Permanent);

    let report = dispatcher_for(&harness, &client, 3).dispatch_pending().await?;

    assert_eq!(report, DispatchReport { succeeded: 3, failed: 1 });
    assert_eq!(
        client.calls_of("refresh_arr"),
        vec![SideEffect::RefreshArr { organization_id }]
    );
    assert_eq!(client.calls_of("refresh_renewal_summary").len(), 1);
    assert_eq!(client.calls_of("refresh_contract_status").len(), 1);
    Ok(())
}

#[tokio::test]
async fn onboarding_status_is_published_with_its_payload() -> Result<()> {
    let harness = Harness::new();
    let organization_id = harness.seed_organization("Initech").await;
    harness
        .send(
            event_types::ORGANIZATION_PLAN_CREATE,
            PlanId::generate(),
            json!({ "organizationId": organization_id, "createdAt": at(2024, 1, 1) }),
        )
        .await?;
    let client = RecordingSiblingClient::new();

    dispatcher_for(&harness, &client, 1).dispatch_pending().await?;

    assert_eq!(
        client.calls_of("update_onboarding_status"),
        vec![SideEffect::UpdateOnboardingStatus {
            organization_id,
            status: OnboardingStatus::NotStarted,
            comments: String::new(),
            caused_by: None,
        }]
    );
    Ok(())
}

#[tokio::test]
async fn redelivered_event_does_not_enqueue_twice_while_pending() -> Result<()> {
    let harness = Harness::new();
    let (_, contract_id) = harness.create_contract(&ContractFactory::annual()).await;
    let opportunity_id = harness.create_renewal(contract_id, None).await;
    harness.take_effects();
    let rollout = harness.event(
        event_types::CONTRACT_ROLLOUT_RENEWAL_OPPORTUNITY,
        contract_id,
        json!({}),
    );

    harness.replay(&rollout).await?;
    harness.replay(&rollout).await?;
    assert_eq!(
        harness.pending_effects(),
        vec![SideEffect::CloseWinOpportunity { opportunity_id }]
    );

    let client = RecordingSiblingClient::new();
    dispatcher_for(&harness, &client, 1).dispatch_pending().await?;
    harness.replay(&rollout).await?;

    assert_eq!(harness.pending_effects().len(), 1);
    assert_eq!(client.calls().len(), 1);
    Ok(())
}

#[tokio::test]
async fn distinct_events_enqueue_the_same_effect_separately() -> Result<()> {
    let harness = Harness::new();
    let (_, contract_id) = harness.create_contract(&ContractFactory::annual()).await;
    harness.create_renewal(contract_id, None).await;
    harness.take_effects();

    for _ in 0..2 {
        harness
            .send(
                event_types::CONTRACT_ROLLOUT_RENEWAL_OPPORTUNITY,
                contract_id,
                json!({}),
            )
            .await?;
    }

    assert_eq!(harness.pending_effects().len(), 2);
    Ok(())
}

#[tokio::test]
async fn full_outbox_drops_effects_without_failing_the_projection() {
    let harness = Harness::with_config(ProjectionConfig {
        outbox_capacity: Some(1),
        ..ProjectionConfig::default()
    });
    let (_, contract_id) = harness.create_contract(&ContractFactory::annual()).await;

    let opportunity_id = harness.create_renewal(contract_id, None).await;

    assert_eq!(
        harness.opportunity(opportunity_id).await.renewed_at,
        Some(at(2025, 1, 1))
    );
    assert_eq!(
        harness.pending_effects(),
        vec![SideEffect::CreateRenewalOpportunity { contract_id }]
    );
}

#[tokio::test]
async fn dispatcher_follows_the_configured_retry_policy() -> Result<()> {
    let harness = Harness::new();
    harness.create_contract(&ContractFactory::annual()).await;
    let config = ProjectionConfig {
        retry_max_attempts: 2,
        retry_base_backoff_ms: 1,
        retry_max_backoff_ms: 1,
        dispatch_concurrency: 1,
        ..ProjectionConfig::default()
    };
    config.validate()?;
    let client = RecordingSiblingClient::new();
    client.fail_next("create_renewal_opportunity", 5, ScriptedFailure::Transient);

    let dispatcher = EffectDispatcher::from_config(Arc::clone(&harness.queue), client.clone(), &config);
    let report = dispatcher.dispatch_pending().await?;

    assert_eq!(report.failed, 1);
    assert_eq!(client.calls().len(), 2);
    Ok(())
}

#[tokio::test]
async fn draining_an_empty_outbox_is_a_no_op() -> Result<()> {
    let harness = Harness::new();
    let client = RecordingSiblingClient::new();

    let report = dispatcher_for(&harness, &client, 3).dispatch_pending().await?;

    assert_eq!(report.total(), 0);
    assert!(client.calls().is_empty());
    Ok(())
}
