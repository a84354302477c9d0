//! # tenure-projection
//!
//! Event-sourced projection of derived statuses for customer contracts,
//! renewals and onboarding plans.
//!
//! This crate consumes domain events and keeps a set of cached statuses in
//! line with the facts they are derived from:
//!
//! - **Contract status**: Draft, Live, `OutOfContract` or Ended, from dates,
//!   auto-renew and the active renewal opportunity
//! - **Renewal lifecycle**: at most one active renewal per contract, with its
//!   renewal date, ARR and likelihood kept current
//! - **Onboarding**: Item → Milestone → Plan → Organization status roll-up
//!
//! ## Core Concepts
//!
//! - **Derivation**: pure functions in [`status`] compute every status from
//!   facts and an explicit `now`; the stored status is only a cache
//! - **Handlers**: one per event type in [`handlers`]; they load, derive,
//!   persist and propagate
//! - **Effects**: calls to sibling services go through the [`effects`]
//!   outbox and are delivered best-effort with bounded retries
//!
//! ## Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use serde_json::json;
//! use tenure_core::{ContractId, InMemoryActionRecorder, OrganizationId, TenantId};
//! use tenure_projection::prelude::*;
//!
//! # async fn run() -> tenure_projection::error::Result<()> {
//! let ctx = ProjectionContext::new(
//!     Arc::new(InMemoryStore::new()),
//!     Arc::new(InMemoryEffectQueue::default()),
//!     Arc::new(InMemoryActionRecorder::new()),
//!     ProjectionConfig::from_env()?,
//! );
//! let projector = Projector::new(ctx);
//!
//! let event = InboundEvent::new(
//!     TenantId::new("acme")?,
//!     ContractId::generate(),
//!     event_types::CONTRACT_CREATE,
//!     json!({
//!         "organizationId": OrganizationId::generate(),
//!         "name": "Platform licence",
//!         "serviceStartedAt": "2024-01-01T00:00:00Z",
//!         "renewalCycle": "ANNUALLY",
//!         "createdAt": "2023-12-15T09:00:00Z"
//!     }),
//! );
//! projector.handle(&event).await?;
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]
#![deny(missing_docs)]
#![deny(rust_2018_idioms)]
#![warn(clippy::pedantic)]

pub mod config;
pub mod effects;
pub mod error;
pub mod events;
pub mod handlers;
pub mod metrics;
pub mod model;
pub mod projector;
pub mod status;
pub mod store;

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::config::ProjectionConfig;
    pub use crate::effects::client::{RetryPolicy, RetryingClient, SiblingClient};
    pub use crate::effects::dispatcher::{DispatchReport, EffectDispatcher};
    pub use crate::effects::memory::InMemoryEffectQueue;
    pub use crate::effects::{EffectEnvelope, EffectQueue, EnqueueResult, SideEffect};
    pub use crate::error::{Error, Result};
    pub use crate::events::{InboundEvent, ProjectionEvent, event_types};
    pub use crate::handlers::{EventMeta, ProjectionContext};
    pub use crate::model::{
        Contract, ContractStatus, Milestone, MilestoneStatus, OnboardingStatus, Organization,
        OrganizationPlan, PlanStatus, RenewalOpportunity,
    };
    pub use crate::projector::Projector;
    pub use crate::store::Store;
    pub use crate::store::memory::InMemoryStore;
}
