//! Tenant routing keys.
//!
//! Every stored entity, action and outbound call is scoped by a tenant. The
//! key is opaque to the projection: its shape is checked when it is created
//! or deserialized, its content is never interpreted.
//!
//! ```rust
//! use tenure_core::tenant::TenantId;
//!
//! let tenant: TenantId = "acme_corp".parse()?;
//! assert_eq!(tenant.as_str(), "acme_corp");
//! assert!(TenantId::new("acme corp").is_err());
//! # Ok::<(), tenure_core::Error>(())
//! ```

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::Error;

/// Longest accepted tenant key, in bytes.
pub const MAX_TENANT_LEN: usize = 128;

/// A validated tenant routing key.
///
/// Non-empty, at most [`MAX_TENANT_LEN`] bytes, no whitespace, no control
/// characters and no `/`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TenantId(String);

impl TenantId {
    /// Validates and wraps a tenant key.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidId`] when the key breaks one of the shape rules.
    pub fn new(key: impl Into<String>) -> Result<Self, Error> {
        let key = key.into();
        match shape_violation(&key) {
            None => Ok(Self(key)),
            Some(reason) => Err(Error::InvalidId {
                message: format!("tenant key {key:?} {reason}"),
            }),
        }
    }

    /// The key as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

fn shape_violation(key: &str) -> Option<&'static str> {
    if key.is_empty() {
        Some("is empty")
    } else if key.len() > MAX_TENANT_LEN {
        Some("is too long")
    } else if key
        .chars()
        .any(|c| c.is_whitespace() || c.is_control() || c == '/')
    {
        Some("contains whitespace, control characters or '/'")
    } else {
        None
    }
}

impl TryFrom<String> for TenantId {
    type Error = Error;

    fn try_from(key: String) -> Result<Self, Error> {
        Self::new(key)
    }
}

impl From<TenantId> for String {
    fn from(tenant: TenantId) -> Self {
        tenant.0
    }
}

impl FromStr for TenantId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Error> {
        Self::new(s)
    }
}

impl fmt::Display for TenantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for TenantId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
