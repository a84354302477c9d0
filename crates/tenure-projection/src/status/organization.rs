//! Organization onboarding status derivation from all of its plans.

use crate::model::{OnboardingStatus, PlanStatus};

/// Derives the onboarding status of an organization from all of its plans.
///
/// Lateness outranks progress: one late plan makes the whole onboarding late
/// unless every plan is done.
#[must_use]
pub fn aggregate_plans<I>(statuses: I) -> OnboardingStatus
where
    I: IntoIterator<Item = PlanStatus>,
{
    let mut any = false;
    let mut all_done = true;
    let mut late = false;
    let mut started = false;

    for status in statuses {
        any = true;
        all_done &= status.is_done();
        late |= status.is_late();
        started |= !status.is_not_started();
    }

    if any && all_done {
        OnboardingStatus::Done
    } else if late {
        OnboardingStatus::Late
    } else if started {
        OnboardingStatus::OnTrack
    } else {
        OnboardingStatus::NotStarted
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use PlanStatus as P;

    #[test]
    fn all_done_wins_even_if_late() {
        assert_eq!(aggregate_plans([P::Done, P::DoneLate]), OnboardingStatus::Done);
    }

    #[test]
    fn any_late_plan_makes_onboarding_late() {
        assert_eq!(aggregate_plans([P::OnTrack, P::NotStartedLate]), OnboardingStatus::Late);
        assert_eq!(aggregate_plans([P::Done, P::DoneLate, P::NotStarted]), OnboardingStatus::Late);
    }

    #[test]
    fn progress_without_lateness_is_on_track() {
        assert_eq!(aggregate_plans([P::Done, P::NotStarted]), OnboardingStatus::OnTrack);
        assert_eq!(aggregate_plans([P::OnTrack]), OnboardingStatus::OnTrack);
    }

    #[test]
    fn untouched_plans_are_not_started() {
        assert_eq!(aggregate_plans([P::NotStarted, P::NotStarted]), OnboardingStatus::NotStarted);
        assert_eq!(aggregate_plans([]), OnboardingStatus::NotStarted);
    }
}
