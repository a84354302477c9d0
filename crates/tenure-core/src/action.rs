//! Timeline action records.
//!
//! An [`Action`] is a human-readable audit entry appended whenever a derived
//! status changes (a contract goes live, an onboarding plan falls behind, a
//! renewal likelihood is adjusted). Actions are shown on the customer timeline.
//!
//! ## Design Principles
//!
//! 1. **Append-only**: actions are immutable once recorded
//! 2. **Caller-gated**: the recorder performs no deduplication; callers only
//!    record after an explicit before/after comparison
//! 3. **Fail-open**: a recorder failure is logged by the caller and never
//!    rolls back the state change it describes
//!
//! ## Usage
//!
//! ```rust
//! use tenure_core::action::{Action, ActionType, EntityType};
//! use tenure_core::TenantId;
//!
//! let action = Action::builder()
//!     .tenant(TenantId::new("acme").unwrap())
//!     .entity("01J00000000000000000000000", EntityType::Contract)
//!     .action_type(ActionType::ContractStatusUpdated)
//!     .content("Enterprise plan is now live")
//!     .metadata(serde_json::json!({"status": "LIVE"}))
//!     .app_source("event-processing-platform-subscribers")
//!     .try_build()
//!     .unwrap();
//!
//! assert_eq!(action.metadata, r#"{"status":"LIVE"}"#);
//! ```

use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::id::ActionId;
use crate::tenant::TenantId;

/// Kind of timeline action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[non_exhaustive]
pub enum ActionType {
    /// A contract's derived status changed.
    ContractStatusUpdated,
    /// A contract rolled over into a new renewal cycle.
    ContractRenewed,
    /// A renewal opportunity's likelihood changed.
    RenewalLikelihoodUpdated,
    /// An organization's onboarding status changed.
    OnboardingStatusChanged,
}

impl ActionType {
    /// Returns the wire name of this action type.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::ContractStatusUpdated => "CONTRACT_STATUS_UPDATED",
            Self::ContractRenewed => "CONTRACT_RENEWED",
            Self::RenewalLikelihoodUpdated => "RENEWAL_LIKELIHOOD_UPDATED",
            Self::OnboardingStatusChanged => "ONBOARDING_STATUS_CHANGED",
        }
    }
}

impl std::fmt::Display for ActionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Entity an action is attached to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EntityType {
    /// A contract.
    Contract,
    /// An opportunity.
    Opportunity,
    /// An organization.
    Organization,
}

impl std::fmt::Display for EntityType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Contract => "CONTRACT",
            Self::Opportunity => "OPPORTUNITY",
            Self::Organization => "ORGANIZATION",
        };
        f.write_str(s)
    }
}

/// A recorded timeline action.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Action {
    /// Unique action identifier.
    pub id: ActionId,
    /// Tenant the action belongs to.
    pub tenant: TenantId,
    /// Identifier of the entity the action describes.
    pub entity_id: String,
    /// Kind of entity the action describes.
    pub entity_type: EntityType,
    /// Kind of action.
    pub action_type: ActionType,
    /// Human-readable message.
    pub content: String,
    /// Structured metadata, serialized as a JSON document.
    pub metadata: String,
    /// When the described change happened.
    pub created_at: DateTime<Utc>,
    /// Application that recorded the action.
    pub app_source: String,
    /// Additional properties stored alongside the action.
    #[serde(default, skip_serializing_if = "serde_json::Map::is_empty")]
    pub extra_properties: serde_json::Map<String, serde_json::Value>,
}

impl Action {
    /// Creates a new builder for constructing actions.
    #[must_use]
    pub fn builder() -> ActionBuilder {
        ActionBuilder::default()
    }
}

/// Error returned when an action cannot be built.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ActionValidationError {
    /// A required field is missing.
    #[error("action missing required field: {field}")]
    MissingField {
        /// The name of the missing field.
        field: &'static str,
    },
    /// The metadata could not be serialized.
    #[error("action metadata is not serializable: {message}")]
    InvalidMetadata {
        /// Serializer message.
        message: String,
    },
}

/// Builder for constructing [`Action`] instances.
#[derive(Debug, Default)]
pub struct ActionBuilder {
    tenant: Option<TenantId>,
    entity_id: Option<String>,
    entity_type: Option<EntityType>,
    action_type: Option<ActionType>,
    content: Option<String>,
    metadata: Option<serde_json::Value>,
    created_at: Option<DateTime<Utc>>,
    app_source: Option<String>,
    extra_properties: serde_json::Map<String, serde_json::Value>,
}

impl ActionBuilder {
    /// Sets the tenant.
    #[must_use]
    pub fn tenant(mut self, tenant: TenantId) -> Self {
        self.tenant = Some(tenant);
        self
    }

    /// Sets the entity the action is attached to.
    #[must_use]
    pub fn entity(mut self, entity_id: impl ToString, entity_type: EntityType) -> Self {
        self.entity_id = Some(entity_id.to_string());
        self.entity_type = Some(entity_type);
        self
    }

    /// Sets the action type.
    #[must_use]
    pub fn action_type(mut self, action_type: ActionType) -> Self {
        self.action_type = Some(action_type);
        self
    }

    /// Sets the human-readable message.
    #[must_use]
    pub fn content(mut self, content: impl Into<String>) -> Self {
        self.content = Some(content.into());
        self
    }

    /// Sets the structured metadata.
    #[must_use]
    pub fn metadata(mut self, metadata: serde_json::Value) -> Self {
        self.metadata = Some(metadata);
        self
    }

    /// Sets when the described change happened. Defaults to now.
    #[must_use]
    pub fn created_at(mut self, created_at: DateTime<Utc>) -> Self {
        self.created_at = Some(created_at);
        self
    }

    /// Sets the recording application.
    #[must_use]
    pub fn app_source(mut self, app_source: impl Into<String>) -> Self {
        self.app_source = Some(app_source.into());
        self
    }

    /// Adds an extra property.
    #[must_use]
    pub fn extra_property(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.extra_properties.insert(key.into(), value);
        self
    }

    /// Builds the action.
    ///
    /// # Errors
    ///
    /// Returns an error if a required field is missing or the metadata cannot
    /// be serialized.
    pub fn try_build(self) -> std::result::Result<Action, ActionValidationError> {
        let tenant = self
            .tenant
            .ok_or(ActionValidationError::MissingField { field: "tenant" })?;
        let entity_id = self
            .entity_id
            .ok_or(ActionValidationError::MissingField { field: "entity_id" })?;
        let entity_type = self
            .entity_type
            .ok_or(ActionValidationError::MissingField {
                field: "entity_type",
            })?;
        let action_type = self
            .action_type
            .ok_or(ActionValidationError::MissingField {
                field: "action_type",
            })?;
        let content = self
            .content
            .ok_or(ActionValidationError::MissingField { field: "content" })?;
        let app_source = self
            .app_source
            .ok_or(ActionValidationError::MissingField { field: "app_source" })?;

        let metadata = match self.metadata {
            Some(value) => serde_json::to_string(&value).map_err(|e| {
                ActionValidationError::InvalidMetadata {
                    message: e.to_string(),
                }
            })?,
            None => String::new(),
        };

        Ok(Action {
            id: ActionId::generate(),
            tenant,
            entity_id,
            entity_type,
            action_type,
            content,
            metadata,
            created_at: self.created_at.unwrap_or_else(Utc::now),
            app_source,
            extra_properties: self.extra_properties,
        })
    }
}

/// Append-only sink for timeline actions.
///
/// Implementations perform no deduplication; every call appends a record.
#[async_trait]
pub trait ActionRecorder: Send + Sync {
    /// Appends an action and returns its identifier.
    async fn create(&self, action: Action) -> Result<ActionId>;
}

/// In-memory action recorder for tests and local runs.
#[derive(Debug, Default)]
pub struct InMemoryActionRecorder {
    actions: RwLock<Vec<Action>>,
    failing: RwLock<bool>,
}

fn poison_err<T>(_: PoisonError<T>) -> Error {
    Error::storage("action recorder lock poisoned")
}

impl InMemoryActionRecorder {
    /// Creates an empty recorder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns every recorded action in insertion order.
    ///
    /// # Errors
    ///
    /// Returns an error if the lock is poisoned.
    pub fn actions(&self) -> Result<Vec<Action>> {
        Ok(self.actions.read().map_err(poison_err)?.clone())
    }

    /// Returns the recorded actions attached to the given entity.
    ///
    /// # Errors
    ///
    /// Returns an error if the lock is poisoned.
    pub fn actions_for(&self, entity_id: &str) -> Result<Vec<Action>> {
        let actions = self.actions.read().map_err(poison_err)?;
        Ok(actions
            .iter()
            .filter(|a| a.entity_id == entity_id)
            .cloned()
            .collect())
    }

    /// Makes subsequent `create` calls fail, to exercise fail-open callers.
    ///
    /// # Errors
    ///
    /// Returns an error if the lock is poisoned.
    pub fn set_failing(&self, failing: bool) -> Result<()> {
        *self.failing.write().map_err(poison_err)? = failing;
        Ok(())
    }
}

#[async_trait]
impl ActionRecorder for InMemoryActionRecorder {
    async fn create(&self, action: Action) -> Result<ActionId> {
        if *self.failing.read().map_err(poison_err)? {
            return Err(Error::storage("action recorder unavailable"));
        }
        let id = action.id;
        self.actions.write().map_err(poison_err)?.push(action);
        Ok(id)
    }
}

/// Counts actions by type, mostly useful in assertions.
#[must_use]
pub fn count_by_type(actions: &[Action]) -> HashMap<ActionType, usize> {
    let mut counts = HashMap::new();
    for action in actions {
        *counts.entry(action.action_type).or_insert(0) += 1;
    }
    counts
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tenant() -> TenantId {
        TenantId::new("acme").unwrap()
    }

    #[test]
    fn builder_requires_content() {
        let err = Action::builder()
            .tenant(tenant())
            .entity("c-1", EntityType::Contract)
            .action_type(ActionType::ContractRenewed)
            .app_source("test")
            .try_build()
            .unwrap_err();
        assert_eq!(err, ActionValidationError::MissingField { field: "content" });
    }

    #[test]
    fn action_type_wire_names() {
        let json = serde_json::to_string(&ActionType::OnboardingStatusChanged).unwrap();
        assert_eq!(json, "\"ONBOARDING_STATUS_CHANGED\"");
        assert_eq!(
            ActionType::RenewalLikelihoodUpdated.to_string(),
            "RENEWAL_LIKELIHOOD_UPDATED"
        );
        assert_eq!(EntityType::Organization.to_string(), "ORGANIZATION");
    }

    #[test]
    fn extra_properties_are_kept() {
        let action = Action::builder()
            .tenant(tenant())
            .entity("org-1", EntityType::Organization)
            .action_type(ActionType::OnboardingStatusChanged)
            .content("The onboarding status was automatically set to Late")
            .app_source("test")
            .extra_property("status", serde_json::json!("LATE"))
            .try_build()
            .unwrap();
        assert_eq!(action.extra_properties["status"], "LATE");
        assert!(action.metadata.is_empty());
    }

    #[tokio::test]
    async fn in_memory_recorder_appends_without_dedup() {
        let recorder = InMemoryActionRecorder::new();
        for _ in 0..2 {
            let action = Action::builder()
                .tenant(tenant())
                .entity("c-1", EntityType::Contract)
                .action_type(ActionType::ContractRenewed)
                .content("Acme renewed")
                .app_source("test")
                .try_build()
                .unwrap();
            recorder.create(action).await.unwrap();
        }
        let actions = recorder.actions_for("c-1").unwrap();
        assert_eq!(actions.len(), 2);
        assert_eq!(count_by_type(&actions)[&ActionType::ContractRenewed], 2);
    }

    #[tokio::test]
    async fn failing_recorder_returns_storage_error() {
        let recorder = InMemoryActionRecorder::new();
        recorder.set_failing(true).unwrap();
        let action = Action::builder()
            .tenant(tenant())
            .entity("c-1", EntityType::Contract)
            .action_type(ActionType::ContractRenewed)
            .content("Acme renewed")
            .app_source("test")
            .try_build()
            .unwrap();
        let err = recorder.create(action).await.unwrap_err();
        assert!(matches!(err, Error::Storage { .. }));
        assert!(recorder.actions().unwrap().is_empty());
    }
}
