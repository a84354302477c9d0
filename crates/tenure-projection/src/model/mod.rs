//! Projected entities.
//!
//! Each entity stores its canonical (cached) status next to the raw facts the
//! status is derived from, so the status can always be recomputed.

pub mod contract;
pub mod onboarding;
pub mod opportunity;
pub mod organization;
pub mod service_line_item;

pub use contract::{Contract, ContractStatus, RenewalCycle};
pub use onboarding::{
    ItemStatus, Milestone, MilestoneItem, MilestoneStatus, OrganizationPlan, PlanStatus,
    StatusDetails,
};
pub use opportunity::{OpportunityStage, RenewalLikelihood, RenewalOpportunity};
pub use organization::{
    OnboardingDetails, OnboardingStatus, Organization, OrganizationRelationship,
};
pub use service_line_item::{BilledType, ServiceLineItem};
