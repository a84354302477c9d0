//! Pre-built test fixtures for common test scenarios.
//!
//! [`Harness`] wires a [`Projector`] to in-memory collaborators and a fixed
//! clock. The factories build event payloads with sensible defaults.

use std::sync::Arc;

use chrono::{DateTime, TimeZone, Utc};
use serde_json::{Value, json};

use tenure_core::{
    Action, ContractId, InMemoryActionRecorder, MilestoneId, OpportunityId, OrganizationId,
    PlanId, ServiceLineItemId, TenantId,
};
use tenure_projection::config::ProjectionConfig;
use tenure_projection::effects::SideEffect;
use tenure_projection::effects::memory::InMemoryEffectQueue;
use tenure_projection::error::Result;
use tenure_projection::events::{InboundEvent, event_types};
use tenure_projection::handlers::ProjectionContext;
use tenure_projection::model::{
    BilledType, Contract, Milestone, Organization, OrganizationPlan, RenewalCycle,
    RenewalOpportunity, ServiceLineItem,
};
use tenure_projection::projector::Projector;
use tenure_projection::store::Store;

use crate::storage::TracingStore;

/// Noon UTC on the given day.
#[must_use]
pub fn at(year: i32, month: u32, day: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(year, month, day, 12, 0, 0)
        .single()
        .expect("valid date")
}

/// Projector type used by the harness.
pub type TestProjector = Projector<TracingStore, InMemoryEffectQueue, InMemoryActionRecorder>;

/// Projector wired to in-memory collaborators and a settable clock.
pub struct Harness {
    /// Tenant every event is sent for.
    pub tenant: TenantId,
    /// Projected state.
    pub store: Arc<TracingStore>,
    /// Outbox.
    pub queue: Arc<InMemoryEffectQueue>,
    /// Timeline actions.
    pub recorder: Arc<InMemoryActionRecorder>,
    /// The projector under test.
    pub projector: TestProjector,
    /// Clock used by [`Harness::send`].
    pub now: DateTime<Utc>,
}

impl Harness {
    /// Creates a harness with a unique tenant, default config and the clock
    /// at 2024-06-01.
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(ProjectionConfig::default())
    }

    /// Creates a harness with a custom configuration.
    #[must_use]
    pub fn with_config(config: ProjectionConfig) -> Self {
        let store = Arc::new(TracingStore::new());
        let queue = Arc::new(InMemoryEffectQueue::from_config("test-effects", &config));
        let recorder = Arc::new(InMemoryActionRecorder::new());
        let ctx = ProjectionContext::new(
            Arc::clone(&store),
            Arc::clone(&queue),
            Arc::clone(&recorder),
            config,
        );
        Self {
            tenant: TenantId::new(format!("test-tenant-{}", uuid::Uuid::new_v4().as_simple()))
                .expect("valid tenant"),
            store,
            queue,
            recorder,
            projector: Projector::new(ctx),
            now: at(2024, 6, 1),
        }
    }

    /// Moves the clock.
    pub fn set_now(&mut self, now: DateTime<Utc>) {
        self.now = now;
    }

    /// Builds an inbound event for this tenant.
    #[must_use]
    pub fn event(&self, event_type: &str, aggregate_id: impl ToString, payload: Value) -> InboundEvent {
        InboundEvent::new(self.tenant.clone(), aggregate_id, event_type, payload)
    }

    /// Projects one event at the harness clock.
    ///
    /// # Errors
    ///
    /// Returns whatever the projector returns.
    pub async fn send(
        &self,
        event_type: &str,
        aggregate_id: impl ToString,
        payload: Value,
    ) -> Result<()> {
        let event = self.event(event_type, aggregate_id, payload);
        self.projector.handle_at(&event, self.now).await
    }

    /// Projects a prepared event at the harness clock.
    ///
    /// # Errors
    ///
    /// Returns whatever the projector returns.
    pub async fn replay(&self, event: &InboundEvent) -> Result<()> {
        self.projector.handle_at(event, self.now).await
    }

    /// Stores an organization and returns its id.
    pub async fn seed_organization(&self, name: &str) -> OrganizationId {
        let organization = Organization::new(OrganizationId::generate(), name, at(2023, 1, 1));
        self.store
            .save_organization(&self.tenant, &organization)
            .await
            .expect("seed organization");
        organization.id
    }

    /// Stores a user display name.
    pub async fn seed_user(&self, user_id: &str, name: &str) {
        self.store
            .save_user_name(&self.tenant, user_id, name)
            .await
            .expect("seed user");
    }

    /// Stores a recurring line item under the contract.
    pub async fn seed_line_item(
        &self,
        contract_id: ContractId,
        billed: BilledType,
        price: f64,
        quantity: u32,
    ) -> ServiceLineItem {
        let item = ServiceLineItem {
            id: ServiceLineItemId::generate(),
            contract_id,
            billed,
            price,
            quantity,
            ended_at: None,
        };
        self.store
            .save_service_line_item(&self.tenant, &item)
            .await
            .expect("seed line item");
        item
    }

    /// Stores an organization, then projects the contract's create event.
    pub async fn create_contract(&self, factory: &ContractFactory) -> (OrganizationId, ContractId) {
        let organization_id = self.seed_organization("Acme").await;
        let contract_id = ContractId::generate();
        self.send(
            event_types::CONTRACT_CREATE,
            contract_id,
            factory.create_payload(organization_id),
        )
        .await
        .expect("create contract");
        (organization_id, contract_id)
    }

    /// Projects a renewal create event and returns the new opportunity id.
    pub async fn create_renewal(&self, contract_id: ContractId, renewed_at: Option<DateTime<Utc>>) -> OpportunityId {
        let opportunity_id = OpportunityId::generate();
        self.send(
            event_types::OPPORTUNITY_CREATE_RENEWAL,
            opportunity_id,
            json!({
                "contractId": contract_id,
                "renewedAt": renewed_at,
                "createdAt": self.now,
            }),
        )
        .await
        .expect("create renewal");
        opportunity_id
    }

    /// Loads a contract that must exist.
    pub async fn contract(&self, id: ContractId) -> Contract {
        self.store
            .get_contract(&self.tenant, &id)
            .await
            .expect("load contract")
            .expect("contract exists")
    }

    /// Loads an opportunity that must exist.
    pub async fn opportunity(&self, id: OpportunityId) -> RenewalOpportunity {
        self.store
            .get_opportunity(&self.tenant, &id)
            .await
            .expect("load opportunity")
            .expect("opportunity exists")
    }

    /// Every renewal of the contract.
    pub async fn renewals(&self, contract_id: ContractId) -> Vec<RenewalOpportunity> {
        self.store
            .renewal_opportunities_for_contract(&self.tenant, &contract_id)
            .await
            .expect("load renewals")
    }

    /// Loads an organization that must exist.
    pub async fn organization(&self, id: OrganizationId) -> Organization {
        self.store
            .get_organization(&self.tenant, &id)
            .await
            .expect("load organization")
            .expect("organization exists")
    }

    /// Loads a plan that must exist.
    pub async fn plan(&self, id: PlanId) -> OrganizationPlan {
        self.store
            .get_plan(&self.tenant, &id)
            .await
            .expect("load plan")
            .expect("plan exists")
    }

    /// Loads a milestone that must exist.
    pub async fn milestone(&self, id: MilestoneId) -> Milestone {
        self.store
            .get_milestone(&self.tenant, &id)
            .await
            .expect("load milestone")
            .expect("milestone exists")
    }

    /// Pending effects, oldest first.
    #[must_use]
    pub fn pending_effects(&self) -> Vec<SideEffect> {
        self.queue.pending().expect("read outbox")
    }

    /// Empties the outbox and returns what was pending.
    pub fn take_effects(&self) -> Vec<SideEffect> {
        self.queue
            .drain()
            .expect("drain outbox")
            .into_iter()
            .map(|entry| entry.envelope.effect)
            .collect()
    }

    /// Every recorded action.
    #[must_use]
    pub fn actions(&self) -> Vec<Action> {
        self.recorder.actions().expect("read actions")
    }
}

impl Default for Harness {
    fn default() -> Self {
        Self::new()
    }
}

/// Factory for contract create payloads.
#[derive(Debug, Clone)]
pub struct ContractFactory {
    /// Contract name.
    pub name: String,
    /// Service start.
    pub service_started_at: Option<DateTime<Utc>>,
    /// End date.
    pub ended_at: Option<DateTime<Utc>>,
    /// Auto-renew flag.
    pub auto_renew: bool,
    /// Renewal cycle.
    pub renewal_cycle: RenewalCycle,
    /// Creation time.
    pub created_at: DateTime<Utc>,
}

impl ContractFactory {
    /// An annual contract that started on 2024-01-01 and does not auto-renew.
    #[must_use]
    pub fn annual() -> Self {
        Self {
            name: "Platform licence".to_string(),
            service_started_at: Some(at(2024, 1, 1)),
            ended_at: None,
            auto_renew: false,
            renewal_cycle: RenewalCycle::Annually,
            created_at: at(2023, 12, 15),
        }
    }

    /// A contract without a renewal cycle.
    #[must_use]
    pub fn one_off() -> Self {
        Self {
            renewal_cycle: RenewalCycle::None,
            ..Self::annual()
        }
    }

    /// Sets the auto-renew flag.
    #[must_use]
    pub fn auto_renew(mut self, auto_renew: bool) -> Self {
        self.auto_renew = auto_renew;
        self
    }

    /// Sets the service start.
    #[must_use]
    pub fn started_at(mut self, started_at: Option<DateTime<Utc>>) -> Self {
        self.service_started_at = started_at;
        self
    }

    /// Sets the end date.
    #[must_use]
    pub fn ended_at(mut self, ended_at: Option<DateTime<Utc>>) -> Self {
        self.ended_at = ended_at;
        self
    }

    /// Payload of `V1_CONTRACT_CREATE` for the organization.
    #[must_use]
    pub fn create_payload(&self, organization_id: OrganizationId) -> Value {
        json!({
            "organizationId": organization_id,
            "name": self.name,
            "serviceStartedAt": self.service_started_at,
            "endedAt": self.ended_at,
            "autoRenew": self.auto_renew,
            "renewalCycle": String::from(self.renewal_cycle),
            "createdAt": self.created_at,
        })
    }
}

/// Factory for milestone payloads.
#[derive(Debug, Clone)]
pub struct MilestoneFactory;

impl MilestoneFactory {
    /// Payload of `V1_ORGANIZATION_PLAN_MILESTONE_CREATE`.
    #[must_use]
    pub fn create_payload(
        milestone_id: MilestoneId,
        order: u32,
        due_date: DateTime<Utc>,
        items: &[&str],
    ) -> Value {
        json!({
            "milestoneId": milestone_id,
            "name": format!("Milestone {order}"),
            "order": order,
            "dueDate": due_date,
            "items": items,
            "createdAt": at(2024, 1, 1),
        })
    }
}
