//! Plan status derivation from its milestones.

use crate::model::{MilestoneStatus, PlanStatus};

/// Derives a plan status from the statuses of all its milestones.
///
/// Done milestones alone do not count as started: a plan with only done and
/// untouched milestones stays not started until one is under way.
#[must_use]
pub fn aggregate_milestones<I>(statuses: I) -> PlanStatus
where
    I: IntoIterator<Item = MilestoneStatus>,
{
    let mut any = false;
    let mut all_done = true;
    let mut late = false;
    let mut started = false;

    for status in statuses {
        any = true;
        all_done &= status.is_done();
        late |= status.is_late();
        started |= status.is_started();
    }

    match (any && all_done, started, late) {
        (true, _, false) => PlanStatus::Done,
        (true, _, true) => PlanStatus::DoneLate,
        (false, false, false) => PlanStatus::NotStarted,
        (false, false, true) => PlanStatus::NotStartedLate,
        (false, true, false) => PlanStatus::OnTrack,
        (false, true, true) => PlanStatus::Late,
    }
}
