//! Service line items billed under a contract.
//!
//! Line items are projected elsewhere; this crate only reads them to compute
//! renewal ARR.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use tenure_core::{ContractId, ServiceLineItemId};

/// Billing frequency of a line item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BilledType {
    /// Billed every month.
    Monthly,
    /// Billed every quarter.
    Quarterly,
    /// Billed every year.
    Annually,
    /// Billed once.
    Once,
    /// Billed by usage.
    Usage,
}

impl BilledType {
    /// Number of billing periods per year; zero for non-recurring items.
    #[must_use]
    pub const fn periods_per_year(&self) -> u32 {
        match self {
            Self::Monthly => 12,
            Self::Quarterly => 4,
            Self::Annually => 1,
            Self::Once | Self::Usage => 0,
        }
    }
}

/// A billed line item of a contract.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceLineItem {
    /// Line item identifier.
    pub id: ServiceLineItemId,
    /// Contract the item is billed under.
    pub contract_id: ContractId,
    /// Billing frequency.
    pub billed: BilledType,
    /// Price per unit per billing period.
    pub price: f64,
    /// Quantity billed.
    pub quantity: u32,
    /// When the item stopped being billed.
    pub ended_at: Option<DateTime<Utc>>,
}

impl ServiceLineItem {
    /// Annualised recurring value of the item.
    #[must_use]
    pub fn annual_value(&self) -> f64 {
        self.price * f64::from(self.quantity) * f64::from(self.billed.periods_per_year())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn annual_value_by_billing_frequency() {
        let mut item = ServiceLineItem {
            id: ServiceLineItemId::generate(),
            contract_id: ContractId::generate(),
            billed: BilledType::Monthly,
            price: 10.0,
            quantity: 3,
            ended_at: None,
        };
        assert!((item.annual_value() - 360.0).abs() < f64::EPSILON);
        item.billed = BilledType::Quarterly;
        assert!((item.annual_value() - 120.0).abs() < f64::EPSILON);
        item.billed = BilledType::Once;
        assert!(item.annual_value().abs() < f64::EPSILON);
    }
}
