//! Sibling-service RPC client with bounded retries.
//!
//! [`SiblingClient`] has one method per downstream RPC. Transport is left to
//! implementors; [`RetryingClient`] wraps any implementation with a small
//! deterministic exponential backoff and only retries errors the client marks
//! as retryable.

use std::time::Duration;

use async_trait::async_trait;

use tenure_core::{ContractId, OpportunityId, OrganizationId, TenantId};

use super::SideEffect;
use crate::error::Result;
use crate::metrics::ProjectionMetrics;
use crate::model::OnboardingStatus;

/// Downstream RPCs a projection may trigger.
#[async_trait]
pub trait SiblingClient: Send + Sync {
    /// Opens a renewal opportunity for the contract.
    async fn create_renewal_opportunity(&self, tenant: &TenantId, contract_id: &ContractId)
    -> Result<()>;

    /// Closes an opportunity as won.
    async fn close_win_opportunity(&self, tenant: &TenantId, opportunity_id: &OpportunityId)
    -> Result<()>;

    /// Closes an opportunity as lost.
    async fn close_lost_opportunity(
        &self,
        tenant: &TenantId,
        opportunity_id: &OpportunityId,
    ) -> Result<()>;

    /// Recomputes the organization's renewal summary.
    async fn refresh_renewal_summary(
        &self,
        tenant: &TenantId,
        organization_id: &OrganizationId,
    ) -> Result<()>;

    /// Recomputes the organization's ARR.
    async fn refresh_arr(&self, tenant: &TenantId, organization_id: &OrganizationId)
    -> Result<()>;

    /// Publishes an organization's onboarding status.
    async fn update_onboarding_status(
        &self,
        tenant: &TenantId,
        organization_id: &OrganizationId,
        status: OnboardingStatus,
        comments: &str,
        caused_by: Option<&ContractId>,
    ) -> Result<()>;

    /// Re-derives a contract's status.
    async fn refresh_contract_status(&self, tenant: &TenantId, contract_id: &ContractId)
    -> Result<()>;

    /// Routes a queued effect to the matching RPC.
    async fn invoke(&self, tenant: &TenantId, effect: &SideEffect) -> Result<()> {
        match effect {
            SideEffect::CreateRenewalOpportunity { contract_id } => {
                self.create_renewal_opportunity(tenant, contract_id).await
            }
            SideEffect::CloseWinOpportunity { opportunity_id } => {
                self.close_win_opportunity(tenant, opportunity_id).await
            }
            SideEffect::CloseLostOpportunity { opportunity_id } => {
                self.close_lost_opportunity(tenant, opportunity_id).await
            }
            SideEffect::RefreshRenewalSummary { organization_id } => {
                self.refresh_renewal_summary(tenant, organization_id).await
            }
            SideEffect::RefreshArr { organization_id } => {
                self.refresh_arr(tenant, organization_id).await
            }
            SideEffect::UpdateOnboardingStatus {
                organization_id,
                status,
                comments,
                caused_by,
            } => {
                self.update_onboarding_status(
                    tenant,
                    organization_id,
                    *status,
                    comments,
                    caused_by.as_ref(),
                )
                .await
            }
            SideEffect::RefreshContractStatus { contract_id } => {
                self.refresh_contract_status(tenant, contract_id).await
            }
        }
    }
}

/// Retry schedule for sibling calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts including the first one.
    pub max_attempts: u32,
    /// Delay before the first retry; doubled on each further retry.
    pub base_backoff: Duration,
    /// Upper bound on a single delay.
    pub max_backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_backoff: Duration::from_millis(50),
            max_backoff: Duration::from_millis(500),
        }
    }
}

impl RetryPolicy {
    /// Delay to wait after the given failed attempt (1-based).
    #[must_use]
    pub fn backoff_for(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1);
        let factor = 2_u32.saturating_pow(exponent);
        self.base_backoff
            .saturating_mul(factor)
            .min(self.max_backoff)
    }
}

/// Wraps a [`SiblingClient`] with bounded retries.
#[derive(Debug, Clone)]
pub struct RetryingClient<C> {
    inner: C,
    policy: RetryPolicy,
    metrics: ProjectionMetrics,
}

impl<C: SiblingClient> RetryingClient<C> {
    /// Wraps `inner` with the default policy.
    pub fn new(inner: C) -> Self {
        Self::with_policy(inner, RetryPolicy::default())
    }

    /// Wraps `inner` with a custom policy.
    pub fn with_policy(inner: C, policy: RetryPolicy) -> Self {
        Self {
            inner,
            policy,
            metrics: ProjectionMetrics::new(),
        }
    }

    /// The wrapped client.
    pub fn inner(&self) -> &C {
        &self.inner
    }

    /// Calls the RPC for `effect`, retrying transient failures.
    ///
    /// # Errors
    ///
    /// Returns the last error once attempts are exhausted, or the first
    /// non-retryable error.
    pub async fn call(&self, tenant: &TenantId, effect: &SideEffect) -> Result<()> {
        let mut attempt = 0;
        loop {
            attempt += 1;
            match self.inner.invoke(tenant, effect).await {
                Ok(()) => return Ok(()),
                Err(err) if err.is_retryable() && attempt < self.policy.max_attempts => {
                    let backoff = self.policy.backoff_for(attempt);
                    tracing::debug!(
                        effect = effect.kind(),
                        attempt,
                        backoff_ms = u64::try_from(backoff.as_millis()).unwrap_or(u64::MAX),
                        error = %err,
                        "retrying sibling call"
                    );
                    self.metrics.record_effect_retry(effect.kind());
                    tokio::time::sleep(backoff).await;
                }
                Err(err) => return Err(err),
            }
        }
    }
}
