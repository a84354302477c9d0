//! Milestone status derivation.

use chrono::{DateTime, Utc};

use crate::model::{MilestoneItem, MilestoneStatus};

/// Returns true if a milestone due at `due_date` is late when touched at `at`.
///
/// Updates on the due date's calendar day (UTC) are never late.
#[must_use]
pub fn should_be_late(due_date: DateTime<Utc>, at: DateTime<Utc>) -> bool {
    at > due_date && at.date_naive() != due_date.date_naive()
}

/// Recolors a milestone and its items to the late or on-time variants.
///
/// Every item's timestamp moves to `at`, whether or not its status changes.
#[must_use]
pub fn recolor(
    status: MilestoneStatus,
    items: &[MilestoneItem],
    late: bool,
    at: DateTime<Utc>,
) -> (MilestoneStatus, Vec<MilestoneItem>) {
    let items = items
        .iter()
        .map(|item| MilestoneItem {
            status: item.status.with_lateness(late),
            updated_at: at,
            ..item.clone()
        })
        .collect();
    (status.with_lateness(late), items)
}

/// Derives a milestone status from its items.
///
/// `overdue` forces a late variant even when no item is late. A milestone
/// without items has not started.
#[must_use]
pub fn aggregate_items(items: &[MilestoneItem], overdue: bool) -> MilestoneStatus {
    let all_done = !items.is_empty() && items.iter().all(|item| item.status.is_done());
    let late = overdue || items.iter().any(|item| item.status.is_late());
    let started = items.iter().any(|item| item.status.is_started());

    let status = if all_done {
        MilestoneStatus::Done
    } else if started {
        MilestoneStatus::Started
    } else {
        MilestoneStatus::NotStarted
    };
    status.with_lateness(late)
}
