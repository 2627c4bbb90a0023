//! Per-organization provider credentials.
//!
//! Each organization authenticates against its own user pool and app client.
//! The credentials come from an external store behind [`OrgConfigResolver`];
//! the challenge engine refuses to talk to the provider unless every field
//! is present.

use std::collections::HashMap;
use std::fmt;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::AuthError;

/// Provider settings as stored for an organization. Fields may be absent.
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq, Eq)]
pub struct OrgProviderConfig {
    pub region: Option<String>,
    pub user_pool_id: Option<String>,
    pub client_id: Option<String>,
    #[serde(skip_serializing)]
    pub client_secret: Option<String>,
}

/// Complete credentials for one organization's app client.
#[derive(Clone, PartialEq, Eq)]
pub struct ProviderCredentials {
    pub region: String,
    pub user_pool_id: String,
    pub client_id: String,
    pub client_secret: String,
}

impl fmt::Debug for ProviderCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderCredentials")
            .field("region", &self.region)
            .field("user_pool_id", &self.user_pool_id)
            .field("client_id", &self.client_id)
            .field("client_secret", &"[redacted]")
            .finish()
    }
}

impl ProviderCredentials {
    /// Validates a stored config into complete credentials.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Misconfigured` naming the first missing field.
    pub fn from_config(org_id: &str, config: &OrgProviderConfig) -> Result<Self, AuthError> {
        fn required(org_id: &str, field: &str, value: &Option<String>) -> Result<String, AuthError> {
            match value.as_deref().map(str::trim) {
                Some(v) if !v.is_empty() => Ok(v.to_string()),
                _ => {
                    tracing::error!(org_id = %org_id, field = %field, "Provider credentials incomplete");
                    Err(AuthError::misconfigured(format!(
                        "organization {} is missing {}",
                        org_id, field
                    )))
                }
            }
        }

        Ok(Self {
            region: required(org_id, "region", &config.region)?,
            user_pool_id: required(org_id, "user_pool_id", &config.user_pool_id)?,
            client_id: required(org_id, "client_id", &config.client_id)?,
            client_secret: required(org_id, "client_secret", &config.client_secret)?,
        })
    }
}

/// Looks up provider settings for an organization.
#[async_trait]
pub trait OrgConfigResolver: Send + Sync {
    /// Returns the stored settings, or `None` for an unknown organization.
    async fn lookup(&self, org_id: &str) -> Result<Option<OrgProviderConfig>, AuthError>;

    /// Returns complete credentials for `org_id`.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Misconfigured` for unknown organizations and
    /// incomplete settings.
    async fn credentials(&self, org_id: &str) -> Result<ProviderCredentials, AuthError> {
        if org_id.trim().is_empty() {
            return Err(AuthError::MissingOrg);
        }
        let config = self.lookup(org_id).await?.ok_or_else(|| {
            tracing::error!(org_id = %org_id, "No provider configured for organization");
            AuthError::misconfigured(format!("no provider configured for organization {}", org_id))
        })?;
        ProviderCredentials::from_config(org_id, &config)
    }
}

/// In-memory resolver over a fixed map.
#[derive(Debug, Clone, Default)]
pub struct StaticOrgResolver {
    orgs: HashMap<String, OrgProviderConfig>,
}

impl StaticOrgResolver {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds or replaces an organization.
    #[must_use]
    pub fn with_org(mut self, org_id: impl Into<String>, config: OrgProviderConfig) -> Self {
        self.orgs.insert(org_id.into(), config);
        self
    }
}

#[async_trait]
impl OrgConfigResolver for StaticOrgResolver {
    async fn lookup(&self, org_id: &str) -> Result<Option<OrgProviderConfig>, AuthError> {
        Ok(self.orgs.get(org_id).cloned())
    }
}
