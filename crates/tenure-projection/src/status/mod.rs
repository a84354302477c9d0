//! Pure status derivation.
//!
//! Nothing in this module touches storage or the clock: every function takes
//! the facts it needs plus an explicit `now`, so projection handlers can load,
//! derive and persist in separate, testable steps.

pub mod contract;
pub mod milestone;
pub mod organization;
pub mod plan;
pub mod renewal;

pub use contract::{derive_contract_status, requires_renewal_lookup, status_change_message};
pub use milestone::{aggregate_items, recolor, should_be_late};
pub use organization::aggregate_plans;
pub use plan::aggregate_milestones;
pub use renewal::{
    LikelihoodAdjustment, RenewalArr, amount_for_rate, likelihood_adjustment, max_renewal_arr,
    months_until, next_renewal_date, prorate, round_half_up,
};
