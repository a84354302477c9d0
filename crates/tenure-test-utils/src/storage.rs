//! Test store with operation tracing and failure injection.
//!
//! Wraps [`InMemoryStore`] and records every call so tests can assert on what
//! a handler read and wrote.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use tenure_core::{ContractId, MilestoneId, OpportunityId, OrganizationId, PlanId, TenantId};
use tenure_projection::error::{Error, Result};
use tenure_projection::model::{
    Contract, Milestone, Organization, OrganizationPlan, RenewalOpportunity, ServiceLineItem,
};
use tenure_projection::store::Store;
use tenure_projection::store::memory::InMemoryStore;

/// Record of a store call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreOp {
    /// Trait method name, e.g. `save_contract`.
    pub method: &'static str,
    /// Identifier argument, or an empty string for user lookups by name.
    pub key: String,
}

impl StoreOp {
    /// Returns true for writes.
    #[must_use]
    pub fn is_write(&self) -> bool {
        self.method.starts_with("save_")
    }
}

/// In-memory store recording operations, with injectable failures.
#[derive(Debug, Clone, Default)]
pub struct TracingStore {
    inner: Arc<InMemoryStore>,
    operations: Arc<Mutex<Vec<StoreOp>>>,
    fail_methods: Arc<Mutex<Vec<&'static str>>>,
}

impl TracingStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns all recorded operations.
    #[must_use]
    pub fn operations(&self) -> Vec<StoreOp> {
        self.operations.lock().expect("lock").clone()
    }

    /// Returns the recorded writes.
    #[must_use]
    pub fn writes(&self) -> Vec<StoreOp> {
        self.operations()
            .into_iter()
            .filter(StoreOp::is_write)
            .collect()
    }

    /// Clears recorded operations.
    pub fn clear_operations(&self) {
        self.operations.lock().expect("lock").clear();
    }

    /// Makes every call to `method` fail until cleared.
    pub fn inject_failure(&self, method: &'static str) {
        self.fail_methods.lock().expect("lock").push(method);
    }

    /// Clears all injected failures.
    pub fn clear_failures(&self) {
        self.fail_methods.lock().expect("lock").clear();
    }

    fn record(&self, method: &'static str, key: impl ToString) -> Result<()> {
        self.operations.lock().expect("lock").push(StoreOp {
            method,
            key: key.to_string(),
        });
        if self.fail_methods.lock().expect("lock").contains(&method) {
            return Err(Error::storage(format!("injected failure for {method}")));
        }
        Ok(())
    }
}

#[async_trait]
impl Store for TracingStore {
    async fn get_contract(&self, tenant: &TenantId, id: &ContractId) -> Result<Option<Contract>> {
        self.record("get_contract", id)?;
        self.inner.get_contract(tenant, id).await
    }

    async fn save_contract(&self, tenant: &TenantId, contract: &Contract) -> Result<()> {
        self.record("save_contract", contract.id)?;
        self.inner.save_contract(tenant, contract).await
    }

    async fn contracts_for_organization(
        &self,
        tenant: &TenantId,
        organization_id: &OrganizationId,
    ) -> Result<Vec<Contract>> {
        self.record("contracts_for_organization", organization_id)?;
        self.inner
            .contracts_for_organization(tenant, organization_id)
            .await
    }

    async fn service_line_items_for_contract(
        &self,
        tenant: &TenantId,
        contract_id: &ContractId,
    ) -> Result<Vec<ServiceLineItem>> {
        self.record("service_line_items_for_contract", contract_id)?;
        self.inner
            .service_line_items_for_contract(tenant, contract_id)
            .await
    }

    async fn save_service_line_item(&self, tenant: &TenantId, item: &ServiceLineItem)
    -> Result<()> {
        self.record("save_service_line_item", item.id)?;
        self.inner.save_service_line_item(tenant, item).await
    }

    async fn get_opportunity(
        &self,
        tenant: &TenantId,
        id: &OpportunityId,
    ) -> Result<Option<RenewalOpportunity>> {
        self.record("get_opportunity", id)?;
        self.inner.get_opportunity(tenant, id).await
    }

    async fn save_opportunity(&self, tenant: &TenantId, opportunity: &RenewalOpportunity)
    -> Result<()> {
        self.record("save_opportunity", opportunity.id)?;
        self.inner.save_opportunity(tenant, opportunity).await
    }

    async fn renewal_opportunities_for_contract(
        &self,
        tenant: &TenantId,
        contract_id: &ContractId,
    ) -> Result<Vec<RenewalOpportunity>> {
        self.record("renewal_opportunities_for_contract", contract_id)?;
        self.inner
            .renewal_opportunities_for_contract(tenant, contract_id)
            .await
    }

    async fn active_renewal_opportunity(
        &self,
        tenant: &TenantId,
        contract_id: &ContractId,
    ) -> Result<Option<RenewalOpportunity>> {
        self.record("active_renewal_opportunity", contract_id)?;
        self.inner
            .active_renewal_opportunity(tenant, contract_id)
            .await
    }

    async fn suspended_renewal_opportunity(
        &self,
        tenant: &TenantId,
        contract_id: &ContractId,
    ) -> Result<Option<RenewalOpportunity>> {
        self.record("suspended_renewal_opportunity", contract_id)?;
        self.inner
            .suspended_renewal_opportunity(tenant, contract_id)
            .await
    }

    async fn latest_closed_won_renewal(
        &self,
        tenant: &TenantId,
        contract_id: &ContractId,
    ) -> Result<Option<RenewalOpportunity>> {
        self.record("latest_closed_won_renewal", contract_id)?;
        self.inner
            .latest_closed_won_renewal(tenant, contract_id)
            .await
    }

    async fn get_organization(
        &self,
        tenant: &TenantId,
        id: &OrganizationId,
    ) -> Result<Option<Organization>> {
        self.record("get_organization", id)?;
        self.inner.get_organization(tenant, id).await
    }

    async fn save_organization(&self, tenant: &TenantId, organization: &Organization)
    -> Result<()> {
        self.record("save_organization", organization.id)?;
        self.inner.save_organization(tenant, organization).await
    }

    async fn user_display_name(&self, tenant: &TenantId, user_id: &str) -> Result<Option<String>> {
        self.record("user_display_name", user_id)?;
        self.inner.user_display_name(tenant, user_id).await
    }

    async fn save_user_name(&self, tenant: &TenantId, user_id: &str, name: &str) -> Result<()> {
        self.record("save_user_name", user_id)?;
        self.inner.save_user_name(tenant, user_id, name).await
    }

    async fn get_plan(&self, tenant: &TenantId, id: &PlanId) -> Result<Option<OrganizationPlan>> {
        self.record("get_plan", id)?;
        self.inner.get_plan(tenant, id).await
    }

    async fn save_plan(&self, tenant: &TenantId, plan: &OrganizationPlan) -> Result<()> {
        self.record("save_plan", plan.id)?;
        self.inner.save_plan(tenant, plan).await
    }

    async fn plans_for_organization(
        &self,
        tenant: &TenantId,
        organization_id: &OrganizationId,
    ) -> Result<Vec<OrganizationPlan>> {
        self.record("plans_for_organization", organization_id)?;
        self.inner
            .plans_for_organization(tenant, organization_id)
            .await
    }

    async fn get_milestone(&self, tenant: &TenantId, id: &MilestoneId)
    -> Result<Option<Milestone>> {
        self.record("get_milestone", id)?;
        self.inner.get_milestone(tenant, id).await
    }

    async fn save_milestone(&self, tenant: &TenantId, milestone: &Milestone) -> Result<()> {
        self.record("save_milestone", milestone.id)?;
        self.inner.save_milestone(tenant, milestone).await
    }

    async fn milestones_for_plan(&self, tenant: &TenantId, plan_id: &PlanId)
    -> Result<Vec<Milestone>> {
        self.record("milestones_for_plan", plan_id)?;
        self.inner.milestones_for_plan(tenant, plan_id).await
    }
}
