//! Organization onboarding plans, their milestones and milestone items.
//!
//! Every status enum here knows whether it is a "late" variant and how to
//! recolor itself to the late or on-time twin. Aggregation over these
//! statuses lives in [`crate::status`].

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use tenure_core::{MasterPlanId, MilestoneId, OrganizationId, PlanId};

/// Status of an organization plan.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PlanStatus {
    /// No milestone has started.
    #[default]
    NotStarted,
    /// No milestone has started and at least one is overdue.
    NotStartedLate,
    /// Work is under way on schedule.
    OnTrack,
    /// Work is under way and something is overdue.
    Late,
    /// Every milestone is done.
    Done,
    /// Every milestone is done, some of them late.
    DoneLate,
}

impl PlanStatus {
    /// Returns true for the late variants.
    #[must_use]
    pub const fn is_late(&self) -> bool {
        matches!(self, Self::NotStartedLate | Self::Late | Self::DoneLate)
    }

    /// Returns true for the done variants.
    #[must_use]
    pub const fn is_done(&self) -> bool {
        matches!(self, Self::Done | Self::DoneLate)
    }

    /// Returns true for the not-started variants.
    #[must_use]
    pub const fn is_not_started(&self) -> bool {
        matches!(self, Self::NotStarted | Self::NotStartedLate)
    }

    /// Returns the wire name of the status.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::NotStarted => "NOT_STARTED",
            Self::NotStartedLate => "NOT_STARTED_LATE",
            Self::OnTrack => "ON_TRACK",
            Self::Late => "LATE",
            Self::Done => "DONE",
            Self::DoneLate => "DONE_LATE",
        }
    }
}

impl fmt::Display for PlanStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Status of a milestone.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MilestoneStatus {
    /// No item has been touched.
    #[default]
    NotStarted,
    /// No item has been touched and the milestone is overdue.
    NotStartedLate,
    /// Some items are done or skipped.
    Started,
    /// Some items are done or skipped and the milestone is overdue.
    StartedLate,
    /// Every item is done.
    Done,
    /// Every item is done, some of them late.
    DoneLate,
}

impl MilestoneStatus {
    /// Returns true for the late variants.
    #[must_use]
    pub const fn is_late(&self) -> bool {
        matches!(self, Self::NotStartedLate | Self::StartedLate | Self::DoneLate)
    }

    /// Returns true for the done variants.
    #[must_use]
    pub const fn is_done(&self) -> bool {
        matches!(self, Self::Done | Self::DoneLate)
    }

    /// Returns true for the started variants.
    #[must_use]
    pub const fn is_started(&self) -> bool {
        matches!(self, Self::Started | Self::StartedLate)
    }

    /// Returns the late or on-time twin of this status.
    #[must_use]
    pub const fn with_lateness(self, late: bool) -> Self {
        match (self, late) {
            (Self::NotStarted | Self::NotStartedLate, false) => Self::NotStarted,
            (Self::NotStarted | Self::NotStartedLate, true) => Self::NotStartedLate,
            (Self::Started | Self::StartedLate, false) => Self::Started,
            (Self::Started | Self::StartedLate, true) => Self::StartedLate,
            (Self::Done | Self::DoneLate, false) => Self::Done,
            (Self::Done | Self::DoneLate, true) => Self::DoneLate,
        }
    }

    /// Returns the wire name of the status.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::NotStarted => "NOT_STARTED",
            Self::NotStartedLate => "NOT_STARTED_LATE",
            Self::Started => "STARTED",
            Self::StartedLate => "STARTED_LATE",
            Self::Done => "DONE",
            Self::DoneLate => "DONE_LATE",
        }
    }
}

impl fmt::Display for MilestoneStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Status of a single milestone item.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ItemStatus {
    /// Not done yet.
    #[default]
    NotDone,
    /// Not done and overdue.
    NotDoneLate,
    /// Done.
    Done,
    /// Done after the due date.
    DoneLate,
    /// Deliberately skipped.
    Skipped,
    /// Skipped after the due date.
    SkippedLate,
}

impl ItemStatus {
    /// Returns true for the late variants.
    #[must_use]
    pub const fn is_late(&self) -> bool {
        matches!(self, Self::NotDoneLate | Self::DoneLate | Self::SkippedLate)
    }

    /// Returns true for the done variants.
    #[must_use]
    pub const fn is_done(&self) -> bool {
        matches!(self, Self::Done | Self::DoneLate)
    }

    /// Returns true once the item has been acted on (done or skipped).
    #[must_use]
    pub const fn is_started(&self) -> bool {
        matches!(
            self,
            Self::Done | Self::DoneLate | Self::Skipped | Self::SkippedLate
        )
    }

    /// Returns the late or on-time twin of this status.
    #[must_use]
    pub const fn with_lateness(self, late: bool) -> Self {
        match (self, late) {
            (Self::NotDone | Self::NotDoneLate, false) => Self::NotDone,
            (Self::NotDone | Self::NotDoneLate, true) => Self::NotDoneLate,
            (Self::Done | Self::DoneLate, false) => Self::Done,
            (Self::Done | Self::DoneLate, true) => Self::DoneLate,
            (Self::Skipped | Self::SkippedLate, false) => Self::Skipped,
            (Self::Skipped | Self::SkippedLate, true) => Self::SkippedLate,
        }
    }
}

/// Status plus its bookkeeping, shared by plans and milestones.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusDetails<S> {
    /// Current status.
    pub status: S,
    /// When the status was last written.
    pub updated_at: DateTime<Utc>,
    /// Free-text comments.
    #[serde(default)]
    pub comments: String,
}

impl<S> StatusDetails<S> {
    /// Creates status details with empty comments.
    #[must_use]
    pub fn new(status: S, updated_at: DateTime<Utc>) -> Self {
        Self {
            status,
            updated_at,
            comments: String::new(),
        }
    }
}

/// An onboarding plan for an organization.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrganizationPlan {
    /// Plan identifier.
    pub id: PlanId,
    /// Organization being onboarded.
    pub organization_id: OrganizationId,
    /// Master plan this plan was instantiated from.
    pub master_plan_id: Option<MasterPlanId>,
    /// Display name.
    #[serde(default)]
    pub name: String,
    /// Whether the plan has been retired.
    #[serde(default)]
    pub retired: bool,
    /// Derived status.
    pub status_details: StatusDetails<PlanStatus>,
    /// Creation time.
    pub created_at: DateTime<Utc>,
    /// Last update time.
    pub updated_at: DateTime<Utc>,
}

/// One checklist entry of a milestone.
///
/// Items are value-contained in their milestone and not addressable on
/// their own.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MilestoneItem {
    /// Stable item identifier.
    pub uuid: Uuid,
    /// Item text.
    pub text: String,
    /// Item status.
    pub status: ItemStatus,
    /// When the item was last updated.
    pub updated_at: DateTime<Utc>,
}

impl MilestoneItem {
    /// Creates a fresh, not-done item.
    #[must_use]
    pub fn new(text: impl Into<String>, updated_at: DateTime<Utc>) -> Self {
        Self {
            uuid: Uuid::new_v4(),
            text: text.into(),
            status: ItemStatus::NotDone,
            updated_at,
        }
    }
}

/// A milestone of an organization plan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Milestone {
    /// Milestone identifier.
    pub id: MilestoneId,
    /// Owning plan.
    pub plan_id: PlanId,
    /// Display name.
    #[serde(default)]
    pub name: String,
    /// Position within the plan.
    pub order: u32,
    /// When the milestone is due.
    pub due_date: DateTime<Utc>,
    /// Whether the milestone is optional.
    #[serde(default)]
    pub optional: bool,
    /// Whether the milestone has been retired.
    #[serde(default)]
    pub retired: bool,
    /// Checklist items.
    #[serde(default)]
    pub items: Vec<MilestoneItem>,
    /// Derived status.
    pub status_details: StatusDetails<MilestoneStatus>,
    /// Creation time.
    pub created_at: DateTime<Utc>,
    /// Last update time.
    pub updated_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn milestone_recoloring_is_symmetric() {
        for status in [
            MilestoneStatus::NotStarted,
            MilestoneStatus::Started,
            MilestoneStatus::Done,
        ] {
            let late = status.with_lateness(true);
            assert!(late.is_late());
            assert_eq!(late.with_lateness(false), status);
            assert_eq!(status.with_lateness(false), status);
        }
    }

    #[test]
    fn item_recoloring_is_symmetric() {
        for status in [ItemStatus::NotDone, ItemStatus::Done, ItemStatus::Skipped] {
            let late = status.with_lateness(true);
            assert!(late.is_late());
            assert_eq!(late.with_lateness(false), status);
        }
    }

    #[test]
    fn item_started_includes_skipped() {
        assert!(ItemStatus::Skipped.is_started());
        assert!(ItemStatus::DoneLate.is_started());
        assert!(!ItemStatus::NotDoneLate.is_started());
    }

    #[test]
    fn plan_status_classification() {
        assert!(PlanStatus::NotStartedLate.is_late());
        assert!(PlanStatus::NotStartedLate.is_not_started());
        assert!(PlanStatus::DoneLate.is_done());
        assert!(!PlanStatus::OnTrack.is_late());
    }
}
