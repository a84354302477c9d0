//! # tenure-core
//!
//! Shared primitives for the tenure derived-status projection engine.
//!
//! This crate provides the foundational types used by every tenure component:
//!
//! - **Tenant Context**: opaque tenant routing keys
//! - **Identifiers**: strongly-typed ULID identifiers for contracts, plans and friends
//! - **Error Types**: shared error definitions and result types
//! - **Observability**: logging initialization and span helpers
//! - **Actions**: the timeline action record and its recorder contract
//!
//! ## Example
//!
//! ```rust
//! use tenure_core::prelude::*;
//!
//! let tenant = TenantId::new("acme-corp").unwrap();
//! let contract = ContractId::generate();
//! assert_ne!(contract.to_string(), tenant.to_string());
//! ```

#![forbid(unsafe_code)]
#![deny(missing_docs)]
#![deny(rust_2018_idioms)]
#![warn(clippy::pedantic)]

pub mod action;
pub mod error;
pub mod id;
pub mod observability;
pub mod tenant;

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::action::{Action, ActionRecorder, ActionType, EntityType};
    pub use crate::error::{Error, Result};
    pub use crate::id::{
        ActionId, ContractId, MasterPlanId, MilestoneId, OpportunityId, OrganizationId, PlanId,
        ServiceLineItemId,
    };
    pub use crate::tenant::TenantId;
}

pub use action::{Action, ActionRecorder, ActionType, EntityType, InMemoryActionRecorder};
pub use error::{Error, Result};
pub use id::{
    ActionId, ContractId, MasterPlanId, MilestoneId, OpportunityId, OrganizationId, PlanId,
    ServiceLineItemId,
};
pub use observability::{LogFormat, init_logging};
pub use tenant::TenantId;
