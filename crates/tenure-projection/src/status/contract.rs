//! Contract status derivation.
//!
//! First match wins, evaluated against `now`:
//!
//! 1. an end date at or before now → `Ended`
//! 2. no service start, or a start in the future → `Draft`
//! 3. no auto-renew and the active renewal has a renewal date after now → `OutOfContract`
//! 4. otherwise → `Live`

use chrono::{DateTime, Utc};

use crate::model::{Contract, ContractStatus, RenewalOpportunity};

/// Returns true if deriving the status needs the contract's active renewal.
///
/// Callers use this to skip the renewal lookup when the first two rules or
/// auto-renew already decide the outcome.
#[must_use]
pub fn requires_renewal_lookup(contract: &Contract, now: DateTime<Utc>) -> bool {
    !contract.auto_renew
        && !contract.has_ended(now)
        && contract
            .service_started_at
            .is_some_and(|started_at| started_at <= now)
}

/// Derives the contract status from its facts.
///
/// `active_renewal` is only consulted when the contract does not auto-renew.
#[must_use]
pub fn derive_contract_status(
    contract: &Contract,
    active_renewal: Option<&RenewalOpportunity>,
    now: DateTime<Utc>,
) -> ContractStatus {
    if contract.has_ended(now) {
        return ContractStatus::Ended;
    }

    let started = contract
        .service_started_at
        .is_some_and(|started_at| started_at <= now);
    if !started {
        return ContractStatus::Draft;
    }

    if !contract.auto_renew {
        let renews_later = active_renewal
            .and_then(|renewal| renewal.renewed_at)
            .is_some_and(|renewed_at| renewed_at > now);
        if renews_later {
            return ContractStatus::OutOfContract;
        }
    }

    ContractStatus::Live
}

/// Timeline message for a contract entering `status`, if the status is worth
/// announcing.
#[must_use]
pub fn status_change_message(contract_name: &str, status: ContractStatus) -> Option<String> {
    match status {
        ContractStatus::Live => Some(format!("{contract_name} is now live")),
        ContractStatus::Ended => Some(format!("{contract_name} has ended")),
        ContractStatus::OutOfContract => Some(format!("{contract_name} is now out of contract")),
        ContractStatus::Draft => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use tenure_core::{ContractId, OpportunityId, OrganizationId};

    fn contract(now: DateTime<Utc>) -> Contract {
        Contract::new(ContractId::generate(), OrganizationId::generate(), now)
    }

    fn renewal(contract: &Contract, renewed_at: Option<DateTime<Utc>>) -> RenewalOpportunity {
        let mut renewal =
            RenewalOpportunity::new(OpportunityId::generate(), contract.id, contract.created_at);
        renewal.renewed_at = renewed_at;
        renewal
    }

    #[test]
    fn missing_service_start_is_draft() {
        let now = Utc::now();
        let c = contract(now);
        assert_eq!(derive_contract_status(&c, None, now), ContractStatus::Draft);
    }

    #[test]
    fn future_service_start_is_draft() {
        let now = Utc::now();
        let mut c = contract(now);
        c.service_started_at = Some(now + Duration::days(3));
        assert_eq!(derive_contract_status(&c, None, now), ContractStatus::Draft);
        assert!(!requires_renewal_lookup(&c, now));
    }

    #[test]
    fn ended_yesterday_wins_over_everything() {
        let now = Utc::now();
        let mut c = contract(now);
        c.ended_at = Some(now - Duration::days(1));
        c.service_started_at = None;
        let r = renewal(&c, Some(now + Duration::days(10)));
        assert_eq!(derive_contract_status(&c, Some(&r), now), ContractStatus::Ended);
    }

    #[test]
    fn end_date_equal_to_now_has_ended() {
        let now = Utc::now();
        let mut c = contract(now);
        c.service_started_at = Some(now - Duration::days(30));
        c.ended_at = Some(now);
        assert_eq!(derive_contract_status(&c, None, now), ContractStatus::Ended);
    }

    #[test]
    fn started_without_auto_renew_and_future_renewal_is_out_of_contract() {
        let now = Utc::now();
        let mut c = contract(now);
        c.service_started_at = Some(now - Duration::days(30));
        assert!(requires_renewal_lookup(&c, now));
        let r = renewal(&c, Some(now + Duration::days(5)));
        assert_eq!(
            derive_contract_status(&c, Some(&r), now),
            ContractStatus::OutOfContract
        );
    }

    #[test]
    fn auto_renew_ignores_the_renewal() {
        let now = Utc::now();
        let mut c = contract(now);
        c.service_started_at = Some(now - Duration::days(30));
        c.auto_renew = true;
        assert!(!requires_renewal_lookup(&c, now));
        let r = renewal(&c, Some(now + Duration::days(5)));
        assert_eq!(derive_contract_status(&c, Some(&r), now), ContractStatus::Live);
    }

    #[test]
    fn started_without_renewal_date_is_live() {
        let now = Utc::now();
        let mut c = contract(now);
        c.service_started_at = Some(now - Duration::days(30));
        let r = renewal(&c, None);
        assert_eq!(derive_contract_status(&c, Some(&r), now), ContractStatus::Live);
        assert_eq!(derive_contract_status(&c, None, now), ContractStatus::Live);
    }

    #[test]
    fn messages_per_status() {
        assert_eq!(
            status_change_message("Acme", ContractStatus::Live).as_deref(),
            Some("Acme is now live")
        );
        assert_eq!(
            status_change_message("Acme", ContractStatus::Ended).as_deref(),
            Some("Acme has ended")
        );
        assert_eq!(
            status_change_message("Acme", ContractStatus::OutOfContract).as_deref(),
            Some("Acme is now out of contract")
        );
        assert_eq!(status_change_message("Acme", ContractStatus::Draft), None);
    }
}
