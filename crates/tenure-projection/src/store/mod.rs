//! Pluggable storage for projected entities.
//!
//! The [`Store`] trait is the graph store seen by the projection handlers:
//! per-entity reads and full-replacement writes keyed by `(tenant, id)`, plus
//! the handful of relationship queries the derivations need. Every call is
//! assumed strongly consistent on its own; there are no multi-call
//! transactions, so handlers re-read after writing when they need the
//! committed state.

pub mod memory;

use async_trait::async_trait;

use tenure_core::{
    ContractId, MilestoneId, OpportunityId, OrganizationId, PlanId, TenantId,
};

use crate::error::Result;
use crate::model::{
    Contract, Milestone, Organization, OrganizationPlan, RenewalOpportunity, ServiceLineItem,
};

/// Storage abstraction for projected state.
///
/// Reads return `Ok(None)` for missing entities; `Err` is reserved for the
/// store itself failing.
#[async_trait]
pub trait Store: Send + Sync {
    // --- Contracts ---

    /// Gets a contract by id.
    async fn get_contract(&self, tenant: &TenantId, id: &ContractId) -> Result<Option<Contract>>;

    /// Saves a contract (insert or full replacement).
    async fn save_contract(&self, tenant: &TenantId, contract: &Contract) -> Result<()>;

    /// Lists all contracts of an organization.
    async fn contracts_for_organization(
        &self,
        tenant: &TenantId,
        organization_id: &OrganizationId,
    ) -> Result<Vec<Contract>>;

    /// Lists the billed line items of a contract.
    async fn service_line_items_for_contract(
        &self,
        tenant: &TenantId,
        contract_id: &ContractId,
    ) -> Result<Vec<ServiceLineItem>>;

    /// Saves a line item.
    async fn save_service_line_item(&self, tenant: &TenantId, item: &ServiceLineItem)
    -> Result<()>;

    // --- Renewal opportunities ---

    /// Gets an opportunity by id.
    async fn get_opportunity(
        &self,
        tenant: &TenantId,
        id: &OpportunityId,
    ) -> Result<Option<RenewalOpportunity>>;

    /// Saves an opportunity (insert or full replacement).
    async fn save_opportunity(&self, tenant: &TenantId, opportunity: &RenewalOpportunity)
    -> Result<()>;

    /// Lists every renewal opportunity of a contract, oldest first.
    async fn renewal_opportunities_for_contract(
        &self,
        tenant: &TenantId,
        contract_id: &ContractId,
    ) -> Result<Vec<RenewalOpportunity>>;

    /// Gets the contract's active renewal: the most recently created open one.
    async fn active_renewal_opportunity(
        &self,
        tenant: &TenantId,
        contract_id: &ContractId,
    ) -> Result<Option<RenewalOpportunity>>;

    /// Gets the contract's suspended renewal, if any.
    async fn suspended_renewal_opportunity(
        &self,
        tenant: &TenantId,
        contract_id: &ContractId,
    ) -> Result<Option<RenewalOpportunity>>;

    /// Gets the closed-won renewal with the latest renewal date.
    async fn latest_closed_won_renewal(
        &self,
        tenant: &TenantId,
        contract_id: &ContractId,
    ) -> Result<Option<RenewalOpportunity>>;

    // --- Organizations ---

    /// Gets an organization by id.
    async fn get_organization(
        &self,
        tenant: &TenantId,
        id: &OrganizationId,
    ) -> Result<Option<Organization>>;

    /// Saves an organization (insert or full replacement).
    async fn save_organization(&self, tenant: &TenantId, organization: &Organization)
    -> Result<()>;

    /// Resolves a user id to a display name.
    async fn user_display_name(&self, tenant: &TenantId, user_id: &str) -> Result<Option<String>>;

    /// Records a user's display name.
    async fn save_user_name(&self, tenant: &TenantId, user_id: &str, name: &str) -> Result<()>;

    // --- Onboarding plans ---

    /// Gets a plan by id.
    async fn get_plan(&self, tenant: &TenantId, id: &PlanId) -> Result<Option<OrganizationPlan>>;

    /// Saves a plan (insert or full replacement).
    async fn save_plan(&self, tenant: &TenantId, plan: &OrganizationPlan) -> Result<()>;

    /// Lists all plans of an organization.
    async fn plans_for_organization(
        &self,
        tenant: &TenantId,
        organization_id: &OrganizationId,
    ) -> Result<Vec<OrganizationPlan>>;

    /// Gets a milestone by id.
    async fn get_milestone(&self, tenant: &TenantId, id: &MilestoneId)
    -> Result<Option<Milestone>>;

    /// Saves a milestone (insert or full replacement).
    async fn save_milestone(&self, tenant: &TenantId, milestone: &Milestone) -> Result<()>;

    /// Lists the milestones of a plan ordered by position.
    async fn milestones_for_plan(&self, tenant: &TenantId, plan_id: &PlanId)
    -> Result<Vec<Milestone>>;
}
