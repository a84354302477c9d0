//! Inbound domain events and their typed payloads.
//!
//! The dispatcher hands the projector an [`InboundEvent`]: a tenant, the id of
//! the aggregate the event belongs to, an event type string and a raw JSON
//! payload. [`ProjectionEvent::decode`] turns that into a typed event before
//! any store access, so a malformed payload never causes a partial write.
//!
//! ## Update masks
//!
//! Update payloads carry only the fields that changed. Every updatable field
//! is an `Option<T>`: `None` means "not sent". Fields that can be cleared are
//! `Option<Option<T>>`, where `Some(None)` is an explicit `null`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, de::DeserializeOwned};

use tenure_core::{
    ContractId, MasterPlanId, MilestoneId, OpportunityId, OrganizationId, PlanId, TenantId,
};

use crate::error::{Error, Result};
use crate::model::{
    Contract, MilestoneItem, MilestoneStatus, OnboardingStatus, OrganizationPlan, PlanStatus,
    RenewalCycle, RenewalLikelihood, RenewalOpportunity, StatusDetails,
};

/// Event type names as they appear on the wire.
pub mod event_types {
    /// A contract was created.
    pub const CONTRACT_CREATE: &str = "V1_CONTRACT_CREATE";
    /// Contract facts changed.
    pub const CONTRACT_UPDATE: &str = "V1_CONTRACT_UPDATE";
    /// A contract reached the end of its renewal cycle.
    pub const CONTRACT_ROLLOUT_RENEWAL_OPPORTUNITY: &str = "V1_CONTRACT_ROLLOUT_RENEWAL_OPPORTUNITY";
    /// The contract status must be re-derived.
    pub const CONTRACT_REFRESH_STATUS: &str = "V1_CONTRACT_REFRESH_STATUS";
    /// A renewal opportunity was requested.
    pub const OPPORTUNITY_CREATE_RENEWAL: &str = "V1_OPPORTUNITY_CREATE_RENEWAL";
    /// A renewal opportunity was edited.
    pub const OPPORTUNITY_UPDATE_RENEWAL: &str = "V1_OPPORTUNITY_UPDATE_RENEWAL";
    /// The renewal date of an opportunity moved.
    pub const OPPORTUNITY_UPDATE_NEXT_CYCLE_DATE: &str = "V1_OPPORTUNITY_UPDATE_NEXT_CYCLE_DATE";
    /// An opportunity was closed as won.
    pub const OPPORTUNITY_CLOSE_WIN: &str = "V1_OPPORTUNITY_CLOSE_WIN";
    /// An opportunity was closed as lost.
    pub const OPPORTUNITY_CLOSE_LOOSE: &str = "V1_OPPORTUNITY_CLOSE_LOOSE";
    /// An onboarding plan was created.
    pub const ORGANIZATION_PLAN_CREATE: &str = "V1_ORGANIZATION_PLAN_CREATE";
    /// An onboarding plan was edited.
    pub const ORGANIZATION_PLAN_UPDATE: &str = "V1_ORGANIZATION_PLAN_UPDATE";
    /// A milestone was added to a plan.
    pub const ORGANIZATION_PLAN_MILESTONE_CREATE: &str = "V1_ORGANIZATION_PLAN_MILESTONE_CREATE";
    /// A milestone was edited.
    pub const ORGANIZATION_PLAN_MILESTONE_UPDATE: &str = "V1_ORGANIZATION_PLAN_MILESTONE_UPDATE";
    /// Milestones of a plan were reordered.
    pub const ORGANIZATION_PLAN_MILESTONES_REORDER: &str =
        "V1_ORGANIZATION_PLAN_MILESTONES_REORDER";
    /// Someone set the onboarding status of an organization.
    pub const ORGANIZATION_UPDATE_ONBOARDING_STATUS: &str =
        "V1_ORGANIZATION_UPDATE_ONBOARDING_STATUS";
}

/// An event as delivered by the dispatcher, payload still untyped.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InboundEvent {
    /// Unique id of the delivered event; redeliveries keep the same id.
    pub event_id: String,
    /// Tenant the event belongs to.
    pub tenant: TenantId,
    /// Id of the aggregate the event was recorded on.
    pub aggregate_id: String,
    /// Wire event type, see [`event_types`].
    pub event_type: String,
    /// Raw JSON payload.
    pub payload: serde_json::Value,
    /// When the event was recorded.
    pub recorded_at: DateTime<Utc>,
}

impl InboundEvent {
    /// Creates an inbound event with a fresh event id.
    #[must_use]
    pub fn new(
        tenant: TenantId,
        aggregate_id: impl ToString,
        event_type: impl Into<String>,
        payload: serde_json::Value,
    ) -> Self {
        Self {
            event_id: ulid::Ulid::new().to_string(),
            tenant,
            aggregate_id: aggregate_id.to_string(),
            event_type: event_type.into(),
            payload,
            recorded_at: Utc::now(),
        }
    }

    /// Overrides the event id (used to simulate redelivery).
    #[must_use]
    pub fn with_event_id(mut self, event_id: impl Into<String>) -> Self {
        self.event_id = event_id.into();
        self
    }
}

/// Deserializes a field that distinguishes "absent" from "null".
///
/// Combine with `#[serde(default)]` so an absent field stays `None`.
fn double_option<'de, T, D>(deserializer: D) -> std::result::Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

/// Payload of a contract creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContractCreated {
    /// Owning organization.
    pub organization_id: OrganizationId,
    /// Display name.
    #[serde(default)]
    pub name: String,
    /// Service start.
    pub service_started_at: Option<DateTime<Utc>>,
    /// Signature date.
    pub signed_at: Option<DateTime<Utc>>,
    /// End date.
    pub ended_at: Option<DateTime<Utc>>,
    /// Auto-renew flag.
    #[serde(default)]
    pub auto_renew: bool,
    /// Renewal cycle.
    #[serde(default)]
    pub renewal_cycle: RenewalCycle,
    /// Creation time.
    pub created_at: DateTime<Utc>,
}

impl ContractCreated {
    /// Builds the contract this payload describes, status not yet derived.
    #[must_use]
    pub fn to_contract(&self, id: ContractId) -> Contract {
        Contract {
            name: self.name.clone(),
            service_started_at: self.service_started_at,
            signed_at: self.signed_at,
            ended_at: self.ended_at,
            auto_renew: self.auto_renew,
            renewal_cycle: self.renewal_cycle,
            ..Contract::new(id, self.organization_id, self.created_at)
        }
    }
}

/// Masked update of contract facts.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContractUpdated {
    /// New name.
    #[serde(default)]
    pub name: Option<String>,
    /// New or cleared service start.
    #[serde(default, deserialize_with = "double_option")]
    pub service_started_at: Option<Option<DateTime<Utc>>>,
    /// New or cleared signature date.
    #[serde(default, deserialize_with = "double_option")]
    pub signed_at: Option<Option<DateTime<Utc>>>,
    /// New or cleared end date.
    #[serde(default, deserialize_with = "double_option")]
    pub ended_at: Option<Option<DateTime<Utc>>>,
    /// New auto-renew flag.
    #[serde(default)]
    pub auto_renew: Option<bool>,
    /// New renewal cycle; the empty string clears it.
    #[serde(default)]
    pub renewal_cycle: Option<RenewalCycle>,
    /// Time of the update.
    pub updated_at: DateTime<Utc>,
}

impl ContractUpdated {
    /// Applies the sent fields to `contract`.
    pub fn apply(&self, contract: &mut Contract) {
        if let Some(name) = &self.name {
            contract.name.clone_from(name);
        }
        if let Some(service_started_at) = self.service_started_at {
            contract.service_started_at = service_started_at;
        }
        if let Some(signed_at) = self.signed_at {
            contract.signed_at = signed_at;
        }
        if let Some(ended_at) = self.ended_at {
            contract.ended_at = ended_at;
        }
        if let Some(auto_renew) = self.auto_renew {
            contract.auto_renew = auto_renew;
        }
        if let Some(renewal_cycle) = self.renewal_cycle {
            contract.renewal_cycle = renewal_cycle;
        }
        contract.updated_at = self.updated_at;
    }
}

/// Payload of events that only carry a timestamp.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Touched {
    /// When the event happened; defaults to the time of projection.
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

/// Payload of a renewal opportunity creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RenewalCreated {
    /// Contract being renewed.
    pub contract_id: ContractId,
    /// Initial likelihood.
    #[serde(default)]
    pub likelihood: Option<RenewalLikelihood>,
    /// Whether the renewal starts approved.
    #[serde(default)]
    pub approved: bool,
    /// Initial renewal date.
    #[serde(default)]
    pub renewed_at: Option<DateTime<Utc>>,
    /// Creation time.
    pub created_at: DateTime<Utc>,
}

impl RenewalCreated {
    /// Builds the renewal this payload describes.
    #[must_use]
    pub fn to_renewal(&self, id: OpportunityId) -> RenewalOpportunity {
        let mut renewal = RenewalOpportunity::new(id, self.contract_id, self.created_at);
        if let Some(likelihood) = self.likelihood {
            renewal.likelihood = likelihood;
        }
        renewal.approved = self.approved;
        renewal.renewed_at = self.renewed_at;
        renewal
    }
}

/// Masked update of a renewal opportunity.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RenewalUpdated {
    /// New likelihood.
    #[serde(default)]
    pub likelihood: Option<RenewalLikelihood>,
    /// New adjusted rate (0-100).
    #[serde(default)]
    pub adjusted_rate: Option<u8>,
    /// New amount set by hand.
    #[serde(default)]
    pub amount: Option<f64>,
    /// New approval flag.
    #[serde(default)]
    pub approved: Option<bool>,
    /// New comments.
    #[serde(default)]
    pub comments: Option<String>,
    /// User who made the change, if any.
    #[serde(default)]
    pub updated_by_user_id: Option<String>,
    /// Time of the update.
    pub updated_at: DateTime<Utc>,
}

/// Which renewal fields a [`RenewalUpdated`] actually changed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RenewalChanges {
    /// Likelihood differs from the stored one.
    pub likelihood: bool,
    /// Adjusted rate differs from the stored one.
    pub adjusted_rate: bool,
    /// Amount differs from the stored one.
    pub amount: bool,
}

impl RenewalUpdated {
    /// Applies the sent fields to `renewal` and reports what changed.
    pub fn apply(&self, renewal: &mut RenewalOpportunity) -> RenewalChanges {
        let mut changes = RenewalChanges::default();
        if let Some(likelihood) = self.likelihood {
            changes.likelihood = likelihood != renewal.likelihood;
            renewal.likelihood = likelihood;
        }
        if let Some(rate) = self.adjusted_rate {
            let rate = rate.min(100);
            changes.adjusted_rate = rate != renewal.adjusted_rate;
            renewal.adjusted_rate = rate;
        }
        if let Some(amount) = self.amount {
            changes.amount = (amount - renewal.amount).abs() > f64::EPSILON;
            renewal.amount = amount;
        }
        if let Some(approved) = self.approved {
            renewal.approved = approved;
        }
        if let Some(comments) = &self.comments {
            renewal.comments.clone_from(comments);
        }
        renewal.updated_at = self.updated_at;
        changes
    }
}

/// Payload moving the renewal date of an opportunity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NextCycleDateUpdated {
    /// New renewal date.
    pub renewed_at: Option<DateTime<Utc>>,
    /// Time of the update.
    pub updated_at: DateTime<Utc>,
}

/// Payload closing an opportunity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OpportunityClosed {
    /// When the opportunity was closed.
    pub closed_at: DateTime<Utc>,
}

/// Payload of an onboarding plan creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanCreated {
    /// Organization being onboarded.
    pub organization_id: OrganizationId,
    /// Master plan the plan was instantiated from.
    #[serde(default)]
    pub master_plan_id: Option<MasterPlanId>,
    /// Display name.
    #[serde(default)]
    pub name: String,
    /// Creation time.
    pub created_at: DateTime<Utc>,
}

impl PlanCreated {
    /// Builds a not-started plan from this payload.
    #[must_use]
    pub fn to_plan(&self, id: PlanId) -> OrganizationPlan {
        OrganizationPlan {
            id,
            organization_id: self.organization_id,
            master_plan_id: self.master_plan_id,
            name: self.name.clone(),
            retired: false,
            status_details: StatusDetails::new(PlanStatus::NotStarted, self.created_at),
            created_at: self.created_at,
            updated_at: self.created_at,
        }
    }
}

/// Masked update of an onboarding plan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanUpdated {
    /// New name.
    #[serde(default)]
    pub name: Option<String>,
    /// New retired flag.
    #[serde(default)]
    pub retired: Option<bool>,
    /// New status details.
    #[serde(default)]
    pub status_details: Option<StatusDetails<PlanStatus>>,
    /// Time of the update.
    pub updated_at: DateTime<Utc>,
}

impl PlanUpdated {
    /// Applies the sent fields; returns true if the status details changed.
    pub fn apply(&self, plan: &mut OrganizationPlan) -> bool {
        if let Some(name) = &self.name {
            plan.name.clone_from(name);
        }
        if let Some(retired) = self.retired {
            plan.retired = retired;
        }
        let mut status_changed = false;
        if let Some(details) = &self.status_details {
            status_changed = details.status != plan.status_details.status
                || details.comments != plan.status_details.comments;
            plan.status_details = details.clone();
        }
        plan.updated_at = self.updated_at;
        status_changed
    }
}

/// Payload of a milestone creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MilestoneCreated {
    /// New milestone id.
    pub milestone_id: MilestoneId,
    /// Display name.
    #[serde(default)]
    pub name: String,
    /// Position within the plan.
    #[serde(default)]
    pub order: u32,
    /// Due date.
    pub due_date: DateTime<Utc>,
    /// Whether the milestone is optional.
    #[serde(default)]
    pub optional: bool,
    /// Item texts.
    #[serde(default)]
    pub items: Vec<String>,
    /// Creation time.
    pub created_at: DateTime<Utc>,
}

/// Masked update of a milestone.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MilestoneUpdated {
    /// Milestone being updated.
    pub milestone_id: MilestoneId,
    /// New name.
    #[serde(default)]
    pub name: Option<String>,
    /// New position.
    #[serde(default)]
    pub order: Option<u32>,
    /// New due date.
    #[serde(default)]
    pub due_date: Option<DateTime<Utc>>,
    /// New optional flag.
    #[serde(default)]
    pub optional: Option<bool>,
    /// New retired flag.
    #[serde(default)]
    pub retired: Option<bool>,
    /// Full replacement item list.
    #[serde(default)]
    pub items: Option<Vec<MilestoneItem>>,
    /// Status details as seen by the sender.
    #[serde(default)]
    pub status_details: Option<StatusDetails<MilestoneStatus>>,
    /// Time of the update.
    pub updated_at: DateTime<Utc>,
}

/// New milestone order of a plan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MilestonesReordered {
    /// Milestone ids in their new order.
    pub milestone_ids: Vec<MilestoneId>,
    /// Time of the update.
    pub updated_at: DateTime<Utc>,
}

/// Onboarding status set by a user or another service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OnboardingStatusUpdated {
    /// New status.
    pub status: OnboardingStatus,
    /// New comments.
    #[serde(default)]
    pub comments: String,
    /// User who made the change.
    #[serde(default)]
    pub user_id: Option<String>,
    /// Contract that caused the change.
    #[serde(default)]
    pub caused_by_contract_id: Option<ContractId>,
    /// Time of the update.
    pub updated_at: DateTime<Utc>,
}

/// A decoded event routed to exactly one handler.
#[derive(Debug, Clone, PartialEq)]
pub enum ProjectionEvent {
    /// See [`event_types::CONTRACT_CREATE`].
    ContractCreate {
        /// Contract aggregate.
        contract_id: ContractId,
        /// Payload.
        data: ContractCreated,
    },
    /// See [`event_types::CONTRACT_UPDATE`].
    ContractUpdate {
        /// Contract aggregate.
        contract_id: ContractId,
        /// Payload.
        data: ContractUpdated,
    },
    /// See [`event_types::CONTRACT_ROLLOUT_RENEWAL_OPPORTUNITY`].
    ContractRolloutRenewal {
        /// Contract aggregate.
        contract_id: ContractId,
        /// Payload.
        data: Touched,
    },
    /// See [`event_types::CONTRACT_REFRESH_STATUS`].
    ContractRefreshStatus {
        /// Contract aggregate.
        contract_id: ContractId,
        /// Payload.
        data: Touched,
    },
    /// See [`event_types::OPPORTUNITY_CREATE_RENEWAL`].
    RenewalCreate {
        /// Opportunity aggregate.
        opportunity_id: OpportunityId,
        /// Payload.
        data: RenewalCreated,
    },
    /// See [`event_types::OPPORTUNITY_UPDATE_RENEWAL`].
    RenewalUpdate {
        /// Opportunity aggregate.
        opportunity_id: OpportunityId,
        /// Payload.
        data: RenewalUpdated,
    },
    /// See [`event_types::OPPORTUNITY_UPDATE_NEXT_CYCLE_DATE`].
    NextCycleDateUpdate {
        /// Opportunity aggregate.
        opportunity_id: OpportunityId,
        /// Payload.
        data: NextCycleDateUpdated,
    },
    /// See [`event_types::OPPORTUNITY_CLOSE_WIN`].
    CloseWon {
        /// Opportunity aggregate.
        opportunity_id: OpportunityId,
        /// Payload.
        data: OpportunityClosed,
    },
    /// See [`event_types::OPPORTUNITY_CLOSE_LOOSE`].
    CloseLost {
        /// Opportunity aggregate.
        opportunity_id: OpportunityId,
        /// Payload.
        data: OpportunityClosed,
    },
    /// See [`event_types::ORGANIZATION_PLAN_CREATE`].
    PlanCreate {
        /// Plan aggregate.
        plan_id: PlanId,
        /// Payload.
        data: PlanCreated,
    },
    /// See [`event_types::ORGANIZATION_PLAN_UPDATE`].
    PlanUpdate {
        /// Plan aggregate.
        plan_id: PlanId,
        /// Payload.
        data: PlanUpdated,
    },
    /// See [`event_types::ORGANIZATION_PLAN_MILESTONE_CREATE`].
    MilestoneCreate {
        /// Plan aggregate.
        plan_id: PlanId,
        /// Payload.
        data: MilestoneCreated,
    },
    /// See [`event_types::ORGANIZATION_PLAN_MILESTONE_UPDATE`].
    MilestoneUpdate {
        /// Plan aggregate.
        plan_id: PlanId,
        /// Payload.
        data: MilestoneUpdated,
    },
    /// See [`event_types::ORGANIZATION_PLAN_MILESTONES_REORDER`].
    MilestonesReorder {
        /// Plan aggregate.
        plan_id: PlanId,
        /// Payload.
        data: MilestonesReordered,
    },
    /// See [`event_types::ORGANIZATION_UPDATE_ONBOARDING_STATUS`].
    OnboardingStatusUpdate {
        /// Organization aggregate.
        organization_id: OrganizationId,
        /// Payload.
        data: OnboardingStatusUpdated,
    },
}

fn aggregate<T>(event: &InboundEvent) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    event
        .aggregate_id
        .parse()
        .map_err(|e: T::Err| Error::MalformedEvent {
            event_type: event.event_type.clone(),
            message: format!("aggregate id: {e}"),
        })
}

fn payload<T: DeserializeOwned>(event: &InboundEvent) -> Result<T> {
    T::deserialize(&event.payload).map_err(|e| Error::MalformedEvent {
        event_type: event.event_type.clone(),
        message: e.to_string(),
    })
}

impl ProjectionEvent {
    /// Decodes an inbound event into its typed form.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnknownEventType`] for unrouted event types and
    /// [`Error::MalformedEvent`] if the aggregate id or payload do not decode.
    pub fn decode(event: &InboundEvent) -> Result<Self> {
        use event_types as t;

        let decoded = match event.event_type.as_str() {
            t::CONTRACT_CREATE => Self::ContractCreate {
                contract_id: aggregate(event)?,
                data: payload(event)?,
            },
            t::CONTRACT_UPDATE => Self::ContractUpdate {
                contract_id: aggregate(event)?,
                data: payload(event)?,
            },
            t::CONTRACT_ROLLOUT_RENEWAL_OPPORTUNITY => Self::ContractRolloutRenewal {
                contract_id: aggregate(event)?,
                data: touched(event)?,
            },
            t::CONTRACT_REFRESH_STATUS => Self::ContractRefreshStatus {
                contract_id: aggregate(event)?,
                data: touched(event)?,
            },
            t::OPPORTUNITY_CREATE_RENEWAL => Self::RenewalCreate {
                opportunity_id: aggregate(event)?,
                data: payload(event)?,
            },
            t::OPPORTUNITY_UPDATE_RENEWAL => Self::RenewalUpdate {
                opportunity_id: aggregate(event)?,
                data: payload(event)?,
            },
            t::OPPORTUNITY_UPDATE_NEXT_CYCLE_DATE => Self::NextCycleDateUpdate {
                opportunity_id: aggregate(event)?,
                data: payload(event)?,
            },
            t::OPPORTUNITY_CLOSE_WIN => Self::CloseWon {
                opportunity_id: aggregate(event)?,
                data: payload(event)?,
            },
            t::OPPORTUNITY_CLOSE_LOOSE => Self::CloseLost {
                opportunity_id: aggregate(event)?,
                data: payload(event)?,
            },
            t::ORGANIZATION_PLAN_CREATE => Self::PlanCreate {
                plan_id: aggregate(event)?,
                data: payload(event)?,
            },
            t::ORGANIZATION_PLAN_UPDATE => Self::PlanUpdate {
                plan_id: aggregate(event)?,
                data: payload(event)?,
            },
            t::ORGANIZATION_PLAN_MILESTONE_CREATE => Self::MilestoneCreate {
                plan_id: aggregate(event)?,
                data: payload(event)?,
            },
            t::ORGANIZATION_PLAN_MILESTONE_UPDATE => Self::MilestoneUpdate {
                plan_id: aggregate(event)?,
                data: payload(event)?,
            },
            t::ORGANIZATION_PLAN_MILESTONES_REORDER => Self::MilestonesReorder {
                plan_id: aggregate(event)?,
                data: payload(event)?,
            },
            t::ORGANIZATION_UPDATE_ONBOARDING_STATUS => Self::OnboardingStatusUpdate {
                organization_id: aggregate(event)?,
                data: payload(event)?,
            },
            other => {
                return Err(Error::UnknownEventType {
                    event_type: other.to_string(),
                });
            }
        };
        Ok(decoded)
    }

    /// Wire event type of this event.
    #[must_use]
    pub const fn event_type(&self) -> &'static str {
        use event_types as t;

        match self {
            Self::ContractCreate { .. } => t::CONTRACT_CREATE,
            Self::ContractUpdate { .. } => t::CONTRACT_UPDATE,
            Self::ContractRolloutRenewal { .. } => t::CONTRACT_ROLLOUT_RENEWAL_OPPORTUNITY,
            Self::ContractRefreshStatus { .. } => t::CONTRACT_REFRESH_STATUS,
            Self::RenewalCreate { .. } => t::OPPORTUNITY_CREATE_RENEWAL,
            Self::RenewalUpdate { .. } => t::OPPORTUNITY_UPDATE_RENEWAL,
            Self::NextCycleDateUpdate { .. } => t::OPPORTUNITY_UPDATE_NEXT_CYCLE_DATE,
            Self::CloseWon { .. } => t::OPPORTUNITY_CLOSE_WIN,
            Self::CloseLost { .. } => t::OPPORTUNITY_CLOSE_LOOSE,
            Self::PlanCreate { .. } => t::ORGANIZATION_PLAN_CREATE,
            Self::PlanUpdate { .. } => t::ORGANIZATION_PLAN_UPDATE,
            Self::MilestoneCreate { .. } => t::ORGANIZATION_PLAN_MILESTONE_CREATE,
            Self::MilestoneUpdate { .. } => t::ORGANIZATION_PLAN_MILESTONE_UPDATE,
            Self::MilestonesReorder { .. } => t::ORGANIZATION_PLAN_MILESTONES_REORDER,
            Self::OnboardingStatusUpdate { .. } => t::ORGANIZATION_UPDATE_ONBOARDING_STATUS,
        }
    }
}

/// Timestamp-only payloads may arrive as `null` or `{}`.
fn touched(event: &InboundEvent) -> Result<Touched> {
    if event.payload.is_null() {
        return Ok(Touched::default());
    }
    payload(event)
}
