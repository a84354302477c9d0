//! Renewal date, ARR and likelihood derivation.
//!
//! Amounts are rounded half-up to two decimals at every step that produces a
//! stored value.

use chrono::{DateTime, Datelike, Months, Utc};

use crate::model::{
    RenewalCycle, RenewalLikelihood, RenewalOpportunity, ServiceLineItem,
    opportunity::{FULL_RATE, RESTORED_LIKELIHOOD_RATE, ZERO_LIKELIHOOD_RATE},
};

/// Upper bound on cycles walked forward when rolling an auto-renewing date.
const MAX_CYCLES: u32 = 10_000;

/// Rounds half away from zero to two decimals.
#[must_use]
pub fn round_half_up(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Computes the next renewal date of a contract.
///
/// Starts from `anchor` (the last won renewal date, or the service start) and
/// adds one cycle. Auto-renewing contracts keep adding cycles until the date
/// lies after `now`. Returns `None` when the contract has no cycle or the
/// date would overflow.
#[must_use]
pub fn next_renewal_date(
    anchor: DateTime<Utc>,
    cycle: RenewalCycle,
    auto_renew: bool,
    now: DateTime<Utc>,
) -> Option<DateTime<Utc>> {
    let months = cycle.months();
    if months == 0 {
        return None;
    }
    let step = Months::new(months);

    let mut next = anchor.checked_add_months(step)?;
    if auto_renew {
        let mut cycles = 0;
        while next <= now && cycles < MAX_CYCLES {
            next = next.checked_add_months(step)?;
            cycles += 1;
        }
    }
    Some(next)
}

/// Whole months from `now` until `end`, never negative.
///
/// A partial month counts only when the end day-of-month is not earlier than
/// today's.
#[must_use]
pub fn months_until(now: DateTime<Utc>, end: DateTime<Utc>) -> u32 {
    let years = i64::from(end.year()) - i64::from(now.year());
    let months = i64::from(end.month()) - i64::from(now.month());
    let mut total = years * 12 + months;
    if end.day() < now.day() {
        total -= 1;
    }
    u32::try_from(total.max(0)).unwrap_or(u32::MAX)
}

/// Prorates an annual amount to the months left before the contract ends.
///
/// More than twelve remaining months keeps the full annual value.
#[must_use]
pub fn prorate(annual: f64, months_remaining: u32) -> f64 {
    if months_remaining > 12 {
        return annual;
    }
    round_half_up(annual / 12.0 * f64::from(months_remaining))
}

/// Maximum renewal ARR: recurring value of line items still billed, prorated
/// when the contract has an end date.
#[must_use]
pub fn max_renewal_arr<'a>(
    items: impl IntoIterator<Item = &'a ServiceLineItem>,
    ended_at: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
) -> f64 {
    let annual: f64 = items
        .into_iter()
        .filter(|item| item.ended_at.is_none())
        .map(ServiceLineItem::annual_value)
        .sum();
    let annual = round_half_up(annual);

    match ended_at {
        Some(end) => prorate(annual, months_until(now, end)),
        None => annual,
    }
}

/// Expected ARR after applying an adjusted rate to the maximum.
#[must_use]
pub fn amount_for_rate(max_amount: f64, adjusted_rate: u8) -> f64 {
    match adjusted_rate {
        ZERO_LIKELIHOOD_RATE => 0.0,
        FULL_RATE => max_amount,
        rate => round_half_up(max_amount * f64::from(rate) / 100.0),
    }
}

/// Renewal amounts recomputed from the contract's line items.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RenewalArr {
    /// ARR if everything renews.
    pub max_amount: f64,
    /// ARR after the adjusted rate.
    pub amount: f64,
}

impl RenewalArr {
    /// Computes both amounts for a renewal at `adjusted_rate`.
    #[must_use]
    pub fn compute<'a>(
        items: impl IntoIterator<Item = &'a ServiceLineItem>,
        ended_at: Option<DateTime<Utc>>,
        adjusted_rate: u8,
        now: DateTime<Utc>,
    ) -> Self {
        let max_amount = max_renewal_arr(items, ended_at, now);
        Self {
            max_amount,
            amount: amount_for_rate(max_amount, adjusted_rate),
        }
    }

    /// Returns true if these amounts differ from the renewal's stored ones.
    #[must_use]
    pub fn differs_from(&self, renewal: &RenewalOpportunity) -> bool {
        (self.max_amount - renewal.max_amount).abs() > f64::EPSILON
            || (self.amount - renewal.amount).abs() > f64::EPSILON
    }
}

/// Likelihood change implied by the contract end date.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LikelihoodAdjustment {
    /// New likelihood.
    pub likelihood: RenewalLikelihood,
    /// New adjusted rate.
    pub adjusted_rate: u8,
}

/// Decides whether the renewal likelihood must follow the contract end date.
///
/// A contract ending before its renewal date cannot renew, so the likelihood
/// drops to zero. When the end date moves back past the renewal date (or is
/// removed) a zero likelihood is restored to medium.
#[must_use]
pub fn likelihood_adjustment(
    contract_ended_at: Option<DateTime<Utc>>,
    renewal: &RenewalOpportunity,
) -> Option<LikelihoodAdjustment> {
    let renewed_at = renewal.renewed_at?;

    let ends_before_renewal = contract_ended_at.is_some_and(|ended_at| ended_at < renewed_at);
    if ends_before_renewal {
        if renewal.likelihood == RenewalLikelihood::Zero {
            return None;
        }
        return Some(LikelihoodAdjustment {
            likelihood: RenewalLikelihood::Zero,
            adjusted_rate: ZERO_LIKELIHOOD_RATE,
        });
    }

    if renewal.likelihood == RenewalLikelihood::Zero {
        return Some(LikelihoodAdjustment {
            likelihood: RenewalLikelihood::Medium,
            adjusted_rate: RESTORED_LIKELIHOOD_RATE,
        });
    }

    None
}
