//! In-memory store implementation for testing.
//!
//! [`InMemoryStore`] keeps every entity in a tenant-scoped `HashMap` behind a
//! single `RwLock`. No durability and no cross-process sharing.

use std::collections::HashMap;
use std::hash::Hash;
use std::sync::{PoisonError, RwLock};

use async_trait::async_trait;

use tenure_core::{
    ContractId, MilestoneId, OpportunityId, OrganizationId, PlanId, ServiceLineItemId, TenantId,
};

use super::Store;
use crate::error::{Error, Result};
use crate::model::{
    Contract, Milestone, OpportunityStage, Organization, OrganizationPlan, RenewalOpportunity,
    ServiceLineItem,
};

type Table<K, V> = HashMap<(TenantId, K), V>;

#[derive(Debug, Default)]
struct Tables {
    contracts: Table<ContractId, Contract>,
    line_items: Table<ServiceLineItemId, ServiceLineItem>,
    opportunities: Table<OpportunityId, RenewalOpportunity>,
    organizations: Table<OrganizationId, Organization>,
    users: Table<String, String>,
    plans: Table<PlanId, OrganizationPlan>,
    milestones: Table<MilestoneId, Milestone>,
}

/// In-memory store for testing.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    tables: RwLock<Tables>,
}

/// Converts a lock poison error to a storage error.
fn poison_err<T>(_: PoisonError<T>) -> Error {
    Error::storage("lock poisoned")
}

fn key<K: Clone>(tenant: &TenantId, id: &K) -> (TenantId, K) {
    (tenant.clone(), id.clone())
}

fn scan<K, V, F>(table: &Table<K, V>, tenant: &TenantId, filter: F) -> Vec<V>
where
    K: Eq + Hash,
    V: Clone,
    F: Fn(&V) -> bool,
{
    table
        .iter()
        .filter(|(owner, value)| owner.0 == *tenant && filter(*value))
        .map(|(_, value)| value.clone())
        .collect()
}

impl InMemoryStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn read<R>(&self, f: impl FnOnce(&Tables) -> R) -> Result<R> {
        let tables = self.tables.read().map_err(poison_err)?;
        Ok(f(&tables))
    }

    fn write(&self, f: impl FnOnce(&mut Tables)) -> Result<()> {
        let mut tables = self.tables.write().map_err(poison_err)?;
        f(&mut tables);
        Ok(())
    }

    fn renewals_in_stage(
        &self,
        tenant: &TenantId,
        contract_id: &ContractId,
        stage: OpportunityStage,
    ) -> Result<Vec<RenewalOpportunity>> {
        self.read(|t| {
            scan(&t.opportunities, tenant, |o: &RenewalOpportunity| {
                o.contract_id == *contract_id && o.stage == stage
            })
        })
    }
}

#[async_trait]
impl Store for InMemoryStore {
    async fn get_contract(&self, tenant: &TenantId, id: &ContractId) -> Result<Option<Contract>> {
        self.read(|t| t.contracts.get(&key(tenant, id)).cloned())
    }

    async fn save_contract(&self, tenant: &TenantId, contract: &Contract) -> Result<()> {
        self.write(|t| {
            t.contracts.insert(key(tenant, &contract.id), contract.clone());
        })
    }

    async fn contracts_for_organization(
        &self,
        tenant: &TenantId,
        organization_id: &OrganizationId,
    ) -> Result<Vec<Contract>> {
        let mut contracts = self.read(|t| {
            scan(&t.contracts, tenant, |c: &Contract| {
                c.organization_id == *organization_id
            })
        })?;
        contracts.sort_by_key(|c| c.id);
        Ok(contracts)
    }

    async fn service_line_items_for_contract(
        &self,
        tenant: &TenantId,
        contract_id: &ContractId,
    ) -> Result<Vec<ServiceLineItem>> {
        let mut items = self.read(|t| {
            scan(&t.line_items, tenant, |i: &ServiceLineItem| {
                i.contract_id == *contract_id
            })
        })?;
        items.sort_by_key(|i| i.id);
        Ok(items)
    }

    async fn save_service_line_item(
        &self,
        tenant: &TenantId,
        item: &ServiceLineItem,
    ) -> Result<()> {
        self.write(|t| {
            t.line_items.insert(key(tenant, &item.id), item.clone());
        })
    }

    async fn get_opportunity(
        &self,
        tenant: &TenantId,
        id: &OpportunityId,
    ) -> Result<Option<RenewalOpportunity>> {
        self.read(|t| t.opportunities.get(&key(tenant, id)).cloned())
    }

    async fn save_opportunity(
        &self,
        tenant: &TenantId,
        opportunity: &RenewalOpportunity,
    ) -> Result<()> {
        self.write(|t| {
            t.opportunities
                .insert(key(tenant, &opportunity.id), opportunity.clone());
        })
    }

    async fn renewal_opportunities_for_contract(
        &self,
        tenant: &TenantId,
        contract_id: &ContractId,
    ) -> Result<Vec<RenewalOpportunity>> {
        let mut renewals = self.read(|t| {
            scan(&t.opportunities, tenant, |o: &RenewalOpportunity| {
                o.contract_id == *contract_id
            })
        })?;
        renewals.sort_by_key(|o| (o.created_at, o.id));
        Ok(renewals)
    }

    async fn active_renewal_opportunity(
        &self,
        tenant: &TenantId,
        contract_id: &ContractId,
    ) -> Result<Option<RenewalOpportunity>> {
        let open = self.renewals_in_stage(tenant, contract_id, OpportunityStage::Open)?;
        Ok(open.into_iter().max_by_key(|o| (o.created_at, o.id)))
    }

    async fn suspended_renewal_opportunity(
        &self,
        tenant: &TenantId,
        contract_id: &ContractId,
    ) -> Result<Option<RenewalOpportunity>> {
        let suspended = self.renewals_in_stage(tenant, contract_id, OpportunityStage::Suspended)?;
        Ok(suspended.into_iter().max_by_key(|o| (o.created_at, o.id)))
    }

    async fn latest_closed_won_renewal(
        &self,
        tenant: &TenantId,
        contract_id: &ContractId,
    ) -> Result<Option<RenewalOpportunity>> {
        let won = self.renewals_in_stage(tenant, contract_id, OpportunityStage::ClosedWon)?;
        Ok(won
            .into_iter()
            .filter(|o| o.renewed_at.is_some())
            .max_by_key(|o| (o.renewed_at, o.id)))
    }

    async fn get_organization(
        &self,
        tenant: &TenantId,
        id: &OrganizationId,
    ) -> Result<Option<Organization>> {
        self.read(|t| t.organizations.get(&key(tenant, id)).cloned())
    }

    async fn save_organization(
        &self,
        tenant: &TenantId,
        organization: &Organization,
    ) -> Result<()> {
        self.write(|t| {
            t.organizations
                .insert(key(tenant, &organization.id), organization.clone());
        })
    }

    async fn user_display_name(&self, tenant: &TenantId, user_id: &str) -> Result<Option<String>> {
        self.read(|t| {
            t.users
                .get(&(tenant.clone(), user_id.to_string()))
                .cloned()
        })
    }

    async fn save_user_name(&self, tenant: &TenantId, user_id: &str, name: &str) -> Result<()> {
        self.write(|t| {
            t.users
                .insert((tenant.clone(), user_id.to_string()), name.to_string());
        })
    }

    async fn get_plan(&self, tenant: &TenantId, id: &PlanId) -> Result<Option<OrganizationPlan>> {
        self.read(|t| t.plans.get(&key(tenant, id)).cloned())
    }

    async fn save_plan(&self, tenant: &TenantId, plan: &OrganizationPlan) -> Result<()> {
        self.write(|t| {
            t.plans.insert(key(tenant, &plan.id), plan.clone());
        })
    }

    async fn plans_for_organization(
        &self,
        tenant: &TenantId,
        organization_id: &OrganizationId,
    ) -> Result<Vec<OrganizationPlan>> {
        let mut plans = self.read(|t| {
            scan(&t.plans, tenant, |p: &OrganizationPlan| {
                p.organization_id == *organization_id
            })
        })?;
        plans.sort_by_key(|p| p.id);
        Ok(plans)
    }

    async fn get_milestone(
        &self,
        tenant: &TenantId,
        id: &MilestoneId,
    ) -> Result<Option<Milestone>> {
        self.read(|t| t.milestones.get(&key(tenant, id)).cloned())
    }

    async fn save_milestone(&self, tenant: &TenantId, milestone: &Milestone) -> Result<()> {
        self.write(|t| {
            t.milestones.insert(key(tenant, &milestone.id), milestone.clone());
        })
    }

    async fn milestones_for_plan(
        &self,
        tenant: &TenantId,
        plan_id: &PlanId,
    ) -> Result<Vec<Milestone>> {
        let mut milestones = self.read(|t| {
            scan(&t.milestones, tenant, |m: &Milestone| m.plan_id == *plan_id)
        })?;
        milestones.sort_by_key(|m| (m.order, m.id));
        Ok(milestones)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};

    fn tenant(name: &str) -> TenantId {
        TenantId::new(name).unwrap()
    }

    #[tokio::test]
    async fn entities_are_tenant_scoped() -> Result<()> {
        let store = InMemoryStore::new();
        let contract = Contract::new(ContractId::generate(), OrganizationId::generate(), Utc::now());
        store.save_contract(&tenant("a"), &contract).await?;

        assert!(store.get_contract(&tenant("a"), &contract.id).await?.is_some());
        assert!(store.get_contract(&tenant("b"), &contract.id).await?.is_none());
        assert!(
            store
                .contracts_for_organization(&tenant("b"), &contract.organization_id)
                .await?
                .is_empty()
        );
        Ok(())
    }

    #[tokio::test]
    async fn active_renewal_is_newest_open_one() -> Result<()> {
        let store = InMemoryStore::new();
        let t = tenant("a");
        let contract_id = ContractId::generate();
        let now = Utc::now();

        let older = RenewalOpportunity::new(OpportunityId::generate(), contract_id, now - Duration::days(2));
        let newer = RenewalOpportunity::new(OpportunityId::generate(), contract_id, now);
        let mut won = RenewalOpportunity::new(OpportunityId::generate(), contract_id, now + Duration::days(1));
        won.stage = OpportunityStage::ClosedWon;
        won.renewed_at = Some(now);
        for o in [&older, &newer, &won] {
            store.save_opportunity(&t, o).await?;
        }

        let active = store.active_renewal_opportunity(&t, &contract_id).await?;
        assert_eq!(active.map(|o| o.id), Some(newer.id));
        let latest_won = store.latest_closed_won_renewal(&t, &contract_id).await?;
        assert_eq!(latest_won.map(|o| o.id), Some(won.id));
        assert!(store.suspended_renewal_opportunity(&t, &contract_id).await?.is_none());
        assert_eq!(store.renewal_opportunities_for_contract(&t, &contract_id).await?.len(), 3);
        Ok(())
    }

    #[tokio::test]
    async fn user_names_resolve() -> Result<()> {
        let store = InMemoryStore::new();
        let t = tenant("a");
        store.save_user_name(&t, "u-1", "Ada Lovelace").await?;
        assert_eq!(
            store.user_display_name(&t, "u-1").await?.as_deref(),
            Some("Ada Lovelace")
        );
        assert!(store.user_display_name(&t, "u-2").await?.is_none());
        Ok(())
    }
}
