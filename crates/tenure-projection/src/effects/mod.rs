//! Outbound side effects (the outbox).
//!
//! Handlers never call sibling services directly. They enqueue a
//! [`SideEffect`] wrapped in an [`EffectEnvelope`]; an
//! [`EffectDispatcher`](dispatcher::EffectDispatcher) later drains the queue
//! through a [`RetryingClient`](client::RetryingClient).
//!
//! - [`EffectQueue`]: the enqueue-side contract
//! - [`memory::InMemoryEffectQueue`]: in-memory queue for tests and single-process use
//! - [`client::SiblingClient`]: one async method per sibling-service RPC
//! - [`dispatcher::EffectDispatcher`]: bounded-concurrency drain loop
//!
//! Effects are best-effort: a failed call is logged and counted, and never
//! rolls back the local write that caused it.

pub mod client;
pub mod dispatcher;
pub mod memory;

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use tenure_core::{ContractId, OpportunityId, OrganizationId, TenantId};

use crate::error::Result;
use crate::model::OnboardingStatus;

/// A call to a sibling service triggered by a projection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SideEffect {
    /// Open a new renewal opportunity for the contract.
    CreateRenewalOpportunity {
        /// Contract to renew.
        contract_id: ContractId,
    },
    /// Close an opportunity as won.
    CloseWinOpportunity {
        /// Opportunity to close.
        opportunity_id: OpportunityId,
    },
    /// Close an opportunity as lost.
    CloseLostOpportunity {
        /// Opportunity to close.
        opportunity_id: OpportunityId,
    },
    /// Recompute the organization's renewal summary.
    RefreshRenewalSummary {
        /// Organization to refresh.
        organization_id: OrganizationId,
    },
    /// Recompute the organization's ARR.
    RefreshArr {
        /// Organization to refresh.
        organization_id: OrganizationId,
    },
    /// Publish the organization's derived onboarding status.
    UpdateOnboardingStatus {
        /// Organization to update.
        organization_id: OrganizationId,
        /// Derived status.
        status: OnboardingStatus,
        /// Comments carried with the status.
        comments: String,
        /// Contract that caused the change, if any.
        caused_by: Option<ContractId>,
    },
    /// Re-derive a contract's status.
    RefreshContractStatus {
        /// Contract to refresh.
        contract_id: ContractId,
    },
}

impl SideEffect {
    /// Stable kind name, used in idempotency keys, logs and metric labels.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::CreateRenewalOpportunity { .. } => "create_renewal_opportunity",
            Self::CloseWinOpportunity { .. } => "close_win_opportunity",
            Self::CloseLostOpportunity { .. } => "close_lost_opportunity",
            Self::RefreshRenewalSummary { .. } => "refresh_renewal_summary",
            Self::RefreshArr { .. } => "refresh_arr",
            Self::UpdateOnboardingStatus { .. } => "update_onboarding_status",
            Self::RefreshContractStatus { .. } => "refresh_contract_status",
        }
    }

    /// Id of the entity the effect targets.
    #[must_use]
    pub fn target(&self) -> String {
        match self {
            Self::CreateRenewalOpportunity { contract_id }
            | Self::RefreshContractStatus { contract_id } => contract_id.to_string(),
            Self::CloseWinOpportunity { opportunity_id }
            | Self::CloseLostOpportunity { opportunity_id } => opportunity_id.to_string(),
            Self::RefreshRenewalSummary { organization_id }
            | Self::RefreshArr { organization_id }
            | Self::UpdateOnboardingStatus {
                organization_id, ..
            } => organization_id.to_string(),
        }
    }
}

impl fmt::Display for SideEffect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({})", self.kind(), self.target())
    }
}

/// A side effect plus the context needed to deliver it exactly once per cause.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EffectEnvelope {
    /// Tenant the effect belongs to.
    pub tenant: TenantId,
    /// The effect itself.
    pub effect: SideEffect,
    /// Id of the inbound event that caused the effect.
    pub causation_event_id: String,
    /// When the effect was enqueued.
    pub enqueued_at: DateTime<Utc>,
}

impl EffectEnvelope {
    /// Wraps an effect caused by the given inbound event.
    #[must_use]
    pub fn new(tenant: TenantId, effect: SideEffect, causation_event_id: impl Into<String>) -> Self {
        Self {
            tenant,
            effect,
            causation_event_id: causation_event_id.into(),
            enqueued_at: Utc::now(),
        }
    }

    /// Idempotency key: `{kind}:{target}:{causation_event_id}`.
    ///
    /// Redelivery of the same inbound event produces the same keys, so a
    /// pending effect is never enqueued twice.
    #[must_use]
    pub fn idempotency_key(&self) -> String {
        format!(
            "{}:{}:{}",
            self.effect.kind(),
            self.effect.target(),
            self.causation_event_id
        )
    }
}

/// Result of enqueuing an effect.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EnqueueResult {
    /// The effect was enqueued.
    Enqueued {
        /// Queue-specific message id.
        message_id: String,
    },
    /// An effect with the same idempotency key is already pending.
    Deduplicated {
        /// The pending message id.
        existing_message_id: String,
    },
    /// The queue is at capacity.
    QueueFull,
}

impl EnqueueResult {
    /// Returns true if the effect was newly enqueued.
    #[must_use]
    pub const fn is_enqueued(&self) -> bool {
        matches!(self, Self::Enqueued { .. })
    }

    /// Returns the message id, if the effect is (now or already) pending.
    #[must_use]
    pub fn message_id(&self) -> Option<&str> {
        match self {
            Self::Enqueued { message_id }
            | Self::Deduplicated {
                existing_message_id: message_id,
            } => Some(message_id),
            Self::QueueFull => None,
        }
    }

    /// Metric label for this result.
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Enqueued { .. } => "enqueued",
            Self::Deduplicated { .. } => "deduplicated",
            Self::QueueFull => "queue_full",
        }
    }
}

/// A pending effect as held by a queue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueueEntry {
    /// Message id.
    pub message_id: String,
    /// Idempotency key the entry was deduplicated on.
    pub idempotency_key: String,
    /// The envelope.
    pub envelope: EffectEnvelope,
}

/// Queue of pending side effects.
#[async_trait]
pub trait EffectQueue: Send + Sync {
    /// Enqueues an effect.
    ///
    /// # Returns
    ///
    /// - `EnqueueResult::Enqueued` with the message id on success
    /// - `EnqueueResult::Deduplicated` if the same effect is already pending
    /// - `EnqueueResult::QueueFull` if the queue is at capacity
    async fn enqueue(&self, envelope: EffectEnvelope) -> Result<EnqueueResult>;

    /// Enqueues several effects in order.
    async fn enqueue_batch(&self, envelopes: Vec<EffectEnvelope>) -> Result<Vec<EnqueueResult>> {
        let mut results = Vec::with_capacity(envelopes.len());
        for envelope in envelopes {
            results.push(self.enqueue(envelope).await?);
        }
        Ok(results)
    }

    /// Removes and returns up to `max` pending effects, oldest first.
    async fn dequeue(&self, max: usize) -> Result<Vec<QueueEntry>>;

    /// Number of pending effects.
    async fn queue_depth(&self) -> Result<usize>;

    /// The queue's name.
    fn queue_name(&self) -> &str;
}

/// Lets the projector and the dispatcher share one queue.
#[async_trait]
impl<T: EffectQueue + ?Sized> EffectQueue for Arc<T> {
    async fn enqueue(&self, envelope: EffectEnvelope) -> Result<EnqueueResult> {
        (**self).enqueue(envelope).await
    }

    async fn enqueue_batch(&self, envelopes: Vec<EffectEnvelope>) -> Result<Vec<EnqueueResult>> {
        (**self).enqueue_batch(envelopes).await
    }

    async fn dequeue(&self, max: usize) -> Result<Vec<QueueEntry>> {
        (**self).dequeue(max).await
    }

    async fn queue_depth(&self) -> Result<usize> {
        (**self).queue_depth().await
    }

    fn queue_name(&self) -> &str {
        (**self).queue_name()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tenant() -> TenantId {
        TenantId::new("acme").unwrap()
    }

    #[test]
    fn idempotency_key_combines_kind_target_and_cause() {
        let organization_id = OrganizationId::generate();
        let envelope = EffectEnvelope::new(
            tenant(),
            SideEffect::RefreshArr { organization_id },
            "evt-1",
        );
        assert_eq!(
            envelope.idempotency_key(),
            format!("refresh_arr:{organization_id}:evt-1")
        );
    }

    #[test]
    fn different_kinds_on_the_same_target_do_not_collide() {
        let organization_id = OrganizationId::generate();
        let arr = EffectEnvelope::new(tenant(), SideEffect::RefreshArr { organization_id }, "e");
        let summary = EffectEnvelope::new(
            tenant(),
            SideEffect::RefreshRenewalSummary { organization_id },
            "e",
        );
        assert_ne!(arr.idempotency_key(), summary.idempotency_key());
    }

    #[test]
    fn side_effect_serializes_with_kind_tag() {
        let contract_id = ContractId::generate();
        let json = serde_json::to_value(SideEffect::RefreshContractStatus { contract_id }).unwrap();
        assert_eq!(json["kind"], "refresh_contract_status");
        assert_eq!(json["contract_id"], contract_id.to_string());
    }

    #[test]
    fn enqueue_result_accessors() {
        let enqueued = EnqueueResult::Enqueued {
            message_id: "m-1".into(),
        };
        assert!(enqueued.is_enqueued());
        assert_eq!(enqueued.message_id(), Some("m-1"));
        assert_eq!(
            EnqueueResult::Deduplicated {
                existing_message_id: "m-2".into()
            }
            .message_id(),
            Some("m-2")
        );
        assert_eq!(EnqueueResult::QueueFull.message_id(), None);
        assert_eq!(EnqueueResult::QueueFull.label(), "queue_full");
    }
}
