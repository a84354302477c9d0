//! Renewal opportunities.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use tenure_core::{ContractId, OpportunityId};

/// How likely the customer is to renew.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RenewalLikelihood {
    /// The contract will not renew.
    Zero,
    /// Renewal is unlikely.
    Low,
    /// Renewal is uncertain.
    #[default]
    Medium,
    /// Renewal is likely.
    High,
}

impl RenewalLikelihood {
    /// Title-cased name used in timeline messages.
    #[must_use]
    pub const fn title(&self) -> &'static str {
        match self {
            Self::Zero => "Zero",
            Self::Low => "Low",
            Self::Medium => "Medium",
            Self::High => "High",
        }
    }
}

impl fmt::Display for RenewalLikelihood {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.title())
    }
}

/// Internal lifecycle stage of an opportunity.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OpportunityStage {
    /// Open and counting towards the contract's renewal.
    #[default]
    Open,
    /// Closed as renewed.
    ClosedWon,
    /// Closed as churned.
    ClosedLost,
    /// Parked while the contract has no renewal cycle.
    Suspended,
}

impl OpportunityStage {
    /// Returns the wire name of the stage.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Open => "OPEN",
            Self::ClosedWon => "CLOSED_WON",
            Self::ClosedLost => "CLOSED_LOST",
            Self::Suspended => "SUSPENDED",
        }
    }
}

impl fmt::Display for OpportunityStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Adjusted rate used when renewal likelihood drops to zero.
pub const ZERO_LIKELIHOOD_RATE: u8 = 0;
/// Adjusted rate used when renewal likelihood is restored from zero.
pub const RESTORED_LIKELIHOOD_RATE: u8 = 50;
/// Adjusted rate for a fresh renewal.
pub const FULL_RATE: u8 = 100;

/// A renewal opportunity attached to a contract.
///
/// A contract has at most one active renewal at a time; closed renewals are
/// kept as history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RenewalOpportunity {
    /// Opportunity identifier.
    pub id: OpportunityId,
    /// Contract being renewed (weak back-reference).
    pub contract_id: ContractId,
    /// Lifecycle stage.
    pub stage: OpportunityStage,
    /// Renewal likelihood.
    pub likelihood: RenewalLikelihood,
    /// Whether the renewal has been approved.
    pub approved: bool,
    /// Percentage (0-100) of the maximum amount expected to renew.
    pub adjusted_rate: u8,
    /// Expected renewal ARR after applying the adjusted rate.
    pub amount: f64,
    /// ARR if everything renews.
    pub max_amount: f64,
    /// When the renewal happens.
    pub renewed_at: Option<DateTime<Utc>>,
    /// When the opportunity was closed.
    pub closed_at: Option<DateTime<Utc>>,
    /// Free-text comments.
    #[serde(default)]
    pub comments: String,
    /// Creation time.
    pub created_at: DateTime<Utc>,
    /// Last update time.
    pub updated_at: DateTime<Utc>,
}

impl RenewalOpportunity {
    /// Creates an open renewal opportunity with full rate and no renewal date.
    #[must_use]
    pub fn new(id: OpportunityId, contract_id: ContractId, created_at: DateTime<Utc>) -> Self {
        Self {
            id,
            contract_id,
            stage: OpportunityStage::Open,
            likelihood: RenewalLikelihood::default(),
            approved: false,
            adjusted_rate: FULL_RATE,
            amount: 0.0,
            max_amount: 0.0,
            renewed_at: None,
            closed_at: None,
            comments: String::new(),
            created_at,
            updated_at: created_at,
        }
    }

    /// Returns true if the renewal is open and has not completed its cycle.
    #[must_use]
    pub fn is_active(&self, now: DateTime<Utc>) -> bool {
        self.stage == OpportunityStage::Open && self.renewed_at.is_none_or(|at| at > now)
    }
}
