//! Custom assertion helpers for integration tests.

use tenure_core::{Action, ActionType};
use tenure_projection::effects::SideEffect;
use tenure_projection::model::RenewalOpportunity;

/// Asserts that `effects` contains `expected` and returns how many times.
///
/// # Panics
///
/// Panics if the effect is absent.
pub fn assert_effect(effects: &[SideEffect], expected: &SideEffect) -> usize {
    let count = effects.iter().filter(|effect| *effect == expected).count();
    assert!(
        count > 0,
        "Expected effect {expected} to be pending, got {effects:?}"
    );
    count
}

/// Asserts that no effect of the given kind is pending.
///
/// # Panics
///
/// Panics if one is.
pub fn assert_no_effect_kind(effects: &[SideEffect], kind: &str) {
    let found: Vec<_> = effects.iter().filter(|e| e.kind() == kind).collect();
    assert!(found.is_empty(), "Expected no {kind} effect, got {found:?}");
}

/// Returns the single action of the given type.
///
/// # Panics
///
/// Panics unless exactly one action of that type was recorded.
pub fn single_action(actions: &[Action], action_type: ActionType) -> Action {
    let matching: Vec<_> = actions
        .iter()
        .filter(|action| action.action_type == action_type)
        .collect();
    assert_eq!(
        matching.len(),
        1,
        "Expected exactly one {action_type} action, got {matching:?}"
    );
    matching[0].clone()
}

/// Asserts that at most one renewal is active at `now`.
///
/// # Panics
///
/// Panics if several renewals are active.
pub fn assert_at_most_one_active(renewals: &[RenewalOpportunity], now: chrono::DateTime<chrono::Utc>) {
    let active: Vec<_> = renewals.iter().filter(|r| r.is_active(now)).collect();
    assert!(
        active.len() <= 1,
        "Expected at most one active renewal, got {}: {active:?}",
        active.len()
    );
}
