//! Organizations and their onboarding summary.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use tenure_core::OrganizationId;

/// Onboarding status of an organization, derived from all of its plans.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OnboardingStatus {
    /// The organization is not being onboarded.
    #[default]
    NotApplicable,
    /// Onboarding has not started.
    NotStarted,
    /// Onboarding is on schedule.
    OnTrack,
    /// Onboarding is behind schedule.
    Late,
    /// Onboarding is complete.
    Done,
}

impl OnboardingStatus {
    /// Returns the wire name of the status.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::NotApplicable => "NOT_APPLICABLE",
            Self::NotStarted => "NOT_STARTED",
            Self::OnTrack => "ON_TRACK",
            Self::Late => "LATE",
            Self::Done => "DONE",
        }
    }

    /// Human-readable name used in timeline messages.
    #[must_use]
    pub const fn readable(&self) -> &'static str {
        match self {
            Self::NotApplicable => "Not applicable",
            Self::NotStarted => "Not started",
            Self::OnTrack => "On track",
            Self::Late => "Late",
            Self::Done => "Done",
        }
    }
}

impl fmt::Display for OnboardingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Onboarding summary stored on the organization.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OnboardingDetails {
    /// Current onboarding status.
    pub status: OnboardingStatus,
    /// Free-text comments.
    #[serde(default)]
    pub comments: String,
    /// When the status was last written.
    pub updated_at: Option<DateTime<Utc>>,
}

/// Commercial relationship with an organization.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrganizationRelationship {
    /// Not yet a customer.
    #[default]
    Prospect,
    /// At least one contract is running.
    Customer,
    /// Every contract has ended.
    FormerCustomer,
}

/// An organization as stored in the graph.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Organization {
    /// Organization identifier.
    pub id: OrganizationId,
    /// Display name.
    #[serde(default)]
    pub name: String,
    /// Commercial relationship.
    #[serde(default)]
    pub relationship: OrganizationRelationship,
    /// Onboarding summary.
    #[serde(default)]
    pub onboarding: OnboardingDetails,
    /// Creation time.
    pub created_at: DateTime<Utc>,
    /// Last update time.
    pub updated_at: DateTime<Utc>,
}

impl Organization {
    /// Creates an organization with default relationship and onboarding.
    #[must_use]
    pub fn new(id: OrganizationId, name: impl Into<String>, created_at: DateTime<Utc>) -> Self {
        Self {
            id,
            name: name.into(),
            relationship: OrganizationRelationship::default(),
            onboarding: OnboardingDetails::default(),
            created_at,
            updated_at: created_at,
        }
    }
}
