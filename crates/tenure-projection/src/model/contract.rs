//! Contracts and their renewal cycle.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use tenure_core::{ContractId, OrganizationId};

/// Fallback display name for contracts without a name.
pub const UNNAMED_CONTRACT: &str = "Unnamed contract";

/// Derived contract status.
///
/// Cached on the contract for query performance; always recomputable from
/// the contract's dates, its auto-renew flag and its active renewal.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ContractStatus {
    /// Service has not started yet.
    #[default]
    Draft,
    /// Service is running.
    Live,
    /// Service is running past its renewal date without auto-renew.
    OutOfContract,
    /// The contract has ended.
    Ended,
}

impl ContractStatus {
    /// Returns the wire name of the status.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Draft => "DRAFT",
            Self::Live => "LIVE",
            Self::OutOfContract => "OUT_OF_CONTRACT",
            Self::Ended => "ENDED",
        }
    }

    /// Returns true if the contract currently provides service.
    #[must_use]
    pub const fn is_active(&self) -> bool {
        matches!(self, Self::Live | Self::OutOfContract)
    }
}

impl fmt::Display for ContractStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How often a contract renews.
///
/// On the wire this is a string; the empty string (or `NONE`) means the
/// contract does not renew.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum RenewalCycle {
    /// The contract does not renew.
    #[default]
    None,
    /// Renews every month.
    Monthly,
    /// Renews every three months.
    Quarterly,
    /// Renews every year.
    Annually,
    /// Renews every given number of years.
    MultiYear(u8),
}

impl RenewalCycle {
    /// Returns true if the contract renews on a fixed frequency.
    #[must_use]
    pub const fn is_frequency_based(&self) -> bool {
        !matches!(self, Self::None)
    }

    /// Length of one cycle in months (0 when the contract does not renew).
    #[must_use]
    pub fn months(&self) -> u32 {
        match self {
            Self::None => 0,
            Self::Monthly => 1,
            Self::Quarterly => 3,
            Self::Annually => 12,
            Self::MultiYear(years) => u32::from(*years) * 12,
        }
    }
}

impl TryFrom<String> for RenewalCycle {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        let normalized = value.trim().to_ascii_uppercase();
        match normalized.as_str() {
            "" | "NONE" => Ok(Self::None),
            "MONTHLY" => Ok(Self::Monthly),
            "QUARTERLY" => Ok(Self::Quarterly),
            "ANNUALLY" => Ok(Self::Annually),
            other => other
                .strip_prefix("MULTI_YEAR_")
                .and_then(|years| years.parse::<u8>().ok())
                .filter(|years| *years > 0)
                .map(Self::MultiYear)
                .ok_or_else(|| format!("unknown renewal cycle '{value}'")),
        }
    }
}

impl From<RenewalCycle> for String {
    fn from(cycle: RenewalCycle) -> Self {
        match cycle {
            RenewalCycle::None => String::new(),
            RenewalCycle::Monthly => "MONTHLY".to_string(),
            RenewalCycle::Quarterly => "QUARTERLY".to_string(),
            RenewalCycle::Annually => "ANNUALLY".to_string(),
            RenewalCycle::MultiYear(years) => format!("MULTI_YEAR_{years}"),
        }
    }
}

/// A customer contract as stored in the graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Contract {
    /// Contract identifier.
    pub id: ContractId,
    /// Owning organization.
    pub organization_id: OrganizationId,
    /// Display name.
    #[serde(default)]
    pub name: String,
    /// When service started, if it has been scheduled.
    pub service_started_at: Option<DateTime<Utc>>,
    /// When the contract was signed.
    pub signed_at: Option<DateTime<Utc>>,
    /// When the contract ends or ended.
    pub ended_at: Option<DateTime<Utc>>,
    /// Whether the contract renews automatically.
    pub auto_renew: bool,
    /// Renewal frequency.
    #[serde(default)]
    pub renewal_cycle: RenewalCycle,
    /// Cached derived status.
    #[serde(default)]
    pub status: ContractStatus,
    /// Creation time.
    pub created_at: DateTime<Utc>,
    /// Last update time.
    pub updated_at: DateTime<Utc>,
}

impl Contract {
    /// Creates a draft contract with no dates set.
    #[must_use]
    pub fn new(id: ContractId, organization_id: OrganizationId, created_at: DateTime<Utc>) -> Self {
        Self {
            id,
            organization_id,
            name: String::new(),
            service_started_at: None,
            signed_at: None,
            ended_at: None,
            auto_renew: false,
            renewal_cycle: RenewalCycle::None,
            status: ContractStatus::Draft,
            created_at,
            updated_at: created_at,
        }
    }

    /// Name used in human-readable messages.
    #[must_use]
    pub fn display_name(&self) -> &str {
        let trimmed = self.name.trim();
        if trimmed.is_empty() {
            UNNAMED_CONTRACT
        } else {
            trimmed
        }
    }

    /// Returns true if the contract has an end date at or before `now`.
    #[must_use]
    pub fn has_ended(&self, now: DateTime<Utc>) -> bool {
        self.ended_at.is_some_and(|ended_at| ended_at <= now)
    }
}
