//! Recording sibling-service client with scripted failures.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use tenure_core::{ContractId, OpportunityId, OrganizationId, TenantId};
use tenure_projection::effects::SideEffect;
use tenure_projection::effects::client::SiblingClient;
use tenure_projection::error::{Error, Result};
use tenure_projection::model::OnboardingStatus;

/// A failure to return from a scripted call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScriptedFailure {
    /// Fails with a retryable dispatch error.
    Transient,
    /// Fails with a non-retryable dispatch error.
    Permanent,
}

/// Sibling client that records every attempted call.
///
/// Failures are scripted per effect kind and consumed in order; once a kind's
/// script is empty its calls succeed.
#[derive(Debug, Clone, Default)]
pub struct RecordingSiblingClient {
    calls: Arc<Mutex<Vec<(TenantId, SideEffect)>>>,
    script: Arc<Mutex<HashMap<&'static str, VecDeque<ScriptedFailure>>>>,
}

impl RecordingSiblingClient {
    /// Creates a client where every call succeeds.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues `count` failures for calls of the given effect kind.
    pub fn fail_next(&self, kind: &'static str, count: usize, failure: ScriptedFailure) {
        let mut script = self.script.lock().expect("lock");
        let queue = script.entry(kind).or_default();
        queue.extend(std::iter::repeat_n(failure, count));
    }

    /// Every attempted call, including failed ones.
    #[must_use]
    pub fn calls(&self) -> Vec<(TenantId, SideEffect)> {
        self.calls.lock().expect("lock").clone()
    }

    /// Attempted calls of one effect kind.
    #[must_use]
    pub fn calls_of(&self, kind: &str) -> Vec<SideEffect> {
        self.calls()
            .into_iter()
            .filter(|(_, effect)| effect.kind() == kind)
            .map(|(_, effect)| effect)
            .collect()
    }

    fn attempt(&self, tenant: &TenantId, effect: SideEffect) -> Result<()> {
        let kind = effect.kind();
        self.calls
            .lock()
            .expect("lock")
            .push((tenant.clone(), effect));
        let failure = self
            .script
            .lock()
            .expect("lock")
            .get_mut(kind)
            .and_then(VecDeque::pop_front);
        match failure {
            None => Ok(()),
            Some(ScriptedFailure::Transient) => Err(Error::dispatch(format!("{kind} unavailable"))),
            Some(ScriptedFailure::Permanent) => {
                Err(Error::dispatch_permanent(format!("{kind} rejected")))
            }
        }
    }
}

#[async_trait]
impl SiblingClient for RecordingSiblingClient {
    async fn create_renewal_opportunity(&self, tenant: &TenantId, contract_id: &ContractId)
    -> Result<()> {
        self.attempt(
            tenant,
            SideEffect::CreateRenewalOpportunity {
                contract_id: *contract_id,
            },
        )
    }

    async fn close_win_opportunity(&self, tenant: &TenantId, opportunity_id: &OpportunityId)
    -> Result<()> {
        self.attempt(
            tenant,
            SideEffect::CloseWinOpportunity {
                opportunity_id: *opportunity_id,
            },
        )
    }

    async fn close_lost_opportunity(
        &self,
        tenant: &TenantId,
        opportunity_id: &OpportunityId,
    ) -> Result<()> {
        self.attempt(
            tenant,
            SideEffect::CloseLostOpportunity {
                opportunity_id: *opportunity_id,
            },
        )
    }

    async fn refresh_renewal_summary(
        &self,
        tenant: &TenantId,
        organization_id: &OrganizationId,
    ) -> Result<()> {
        self.attempt(
            tenant,
            SideEffect::RefreshRenewalSummary {
                organization_id: *organization_id,
            },
        )
    }

    async fn refresh_arr(&self, tenant: &TenantId, organization_id: &OrganizationId)
    -> Result<()> {
        self.attempt(
            tenant,
            SideEffect::RefreshArr {
                organization_id: *organization_id,
            },
        )
    }

    async fn update_onboarding_status(
        &self,
        tenant: &TenantId,
        organization_id: &OrganizationId,
        status: OnboardingStatus,
        comments: &str,
        caused_by: Option<&ContractId>,
    ) -> Result<()> {
        self.attempt(
            tenant,
            SideEffect::UpdateOnboardingStatus {
                organization_id: *organization_id,
                status,
                comments: comments.to_string(),
                caused_by: caused_by.copied(),
            },
        )
    }

    async fn refresh_contract_status(&self, tenant: &TenantId, contract_id: &ContractId)
    -> Result<()> {
        self.attempt(
            tenant,
            SideEffect::RefreshContractStatus {
                contract_id: *contract_id,
            },
        )
    }
}
