//! Strongly-typed identifiers for projected entities.
//!
//! All identifiers are:
//! - **Strongly typed**: a contract ID cannot be passed where a plan ID is expected
//! - **Lexicographically sortable**: ULIDs encode creation time and sort naturally
//! - **Globally unique**: no coordination required for generation
//!
//! # Example
//!
//! ```rust
//! use tenure_core::id::{ContractId, PlanId};
//!
//! let contract = ContractId::generate();
//! let plan = PlanId::generate();
//!
//! // IDs are different types - this won't compile:
//! // let wrong: ContractId = plan;
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use ulid::Ulid;

use crate::error::{Error, Result};

macro_rules! ulid_id {
    ($(#[$meta:meta])* $name:ident, $label:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(Ulid);

        impl $name {
            /// Generates a new unique identifier.
            #[must_use]
            pub fn generate() -> Self {
                Self(Ulid::new())
            }

            /// Creates an identifier from a raw ULID.
            #[must_use]
            pub const fn from_ulid(ulid: Ulid) -> Self {
                Self(ulid)
            }

            /// Returns the underlying ULID.
            #[must_use]
            pub const fn as_ulid(&self) -> Ulid {
                self.0
            }

            /// Returns the creation timestamp encoded in the ID.
            #[must_use]
            pub fn created_at(&self) -> chrono::DateTime<chrono::Utc> {
                i64::try_from(self.0.timestamp_ms())
                    .ok()
                    .and_then(chrono::DateTime::from_timestamp_millis)
                    .unwrap_or_else(chrono::Utc::now)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl FromStr for $name {
            type Err = Error;

            fn from_str(s: &str) -> Result<Self> {
                Ulid::from_string(s)
                    .map(Self)
                    .map_err(|e| Error::InvalidId {
                        message: format!(concat!("invalid ", $label, " ID '{}': {}"), s, e),
                    })
            }
        }
    };
}

ulid_id!(
    /// Identifier of a customer contract.
    ContractId,
    "contract"
);

ulid_id!(
    /// Identifier of an organization (the customer account).
    OrganizationId,
    "organization"
);

ulid_id!(
    /// Identifier of an opportunity; renewal opportunities hang off a contract.
    OpportunityId,
    "opportunity"
);

ulid_id!(
    /// Identifier of an organization onboarding plan.
    PlanId,
    "plan"
);

ulid_id!(
    /// Identifier of the master plan an organization plan was instantiated from.
    MasterPlanId,
    "master plan"
);

ulid_id!(
    /// Identifier of a milestone inside an organization plan.
    MilestoneId,
    "milestone"
);

ulid_id!(
    /// Identifier of a service line item billed under a contract.
    ServiceLineItemId,
    "service line item"
);

ulid_id!(
    /// Identifier of a recorded timeline action.
    ActionId,
    "action"
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn contract_id_roundtrip() {
        let id = ContractId::generate();
        let parsed: ContractId = id.to_string().parse().unwrap();
        assert_eq!(id, parsed);
    }

    #[test]
    fn invalid_id_names_the_kind() {
        let err = "not-a-ulid".parse::<MilestoneId>().unwrap_err();
        assert!(err.to_string().contains("invalid milestone ID"));
    }

    #[test]
    fn ids_serialize_transparently() {
        let id = PlanId::generate();
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, format!("\"{id}\""));
    }

    #[test]
    fn ids_sort_by_creation_time() {
        let earlier = OpportunityId::from_ulid(Ulid::from_parts(1_000, 0));
        let later = OpportunityId::from_ulid(Ulid::from_parts(2_000, 0));
        assert!(earlier < later);
        assert_eq!(earlier.created_at().timestamp_millis(), 1_000);
    }
}
