//! Verified request context types.

use std::collections::HashMap;
use std::sync::Arc;

use crate::config::ClaimConfig;
use crate::error::AuthError;

/// Authenticated request context derived from a verified bearer token.
///
/// Built fresh on every verified request and never persisted. The raw claim
/// map is wrapped in `Arc` so the context clones cheaply across handlers.
#[derive(Debug, Clone)]
pub struct AuthContext {
    /// The token's `sub` claim.
    pub subject: String,

    /// Username from the primary or fallback username claim.
    pub username: Option<String>,

    /// Organization resolved from claim, header or query parameter.
    pub org_id: Option<String>,

    /// Groups/roles carried by the token.
    pub roles: Vec<String>,

    /// The `token_use` claim (`id` or `access`).
    pub token_use: String,

    /// Expiry as a Unix timestamp.
    pub expires_at: i64,

    /// All claims of the token.
    pub claims: Arc<HashMap<String, serde_json::Value>>,
}

impl AuthContext {
    /// Returns `true` if the token carries `role` (case-insensitive).
    #[must_use]
    pub fn has_role(&self, role: &str) -> bool {
        self.roles.iter().any(|r| r.eq_ignore_ascii_case(role))
    }

    /// Gets a raw claim by name.
    #[must_use]
    pub fn claim(&self, name: &str) -> Option<&serde_json::Value> {
        self.claims.get(name)
    }

    /// Returns the organization id or `MissingOrg`.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::MissingOrg` if no organization was resolved.
    pub fn require_org(&self) -> Result<&str, AuthError> {
        self.org_id.as_deref().ok_or(AuthError::MissingOrg)
    }

    /// Name to show in logs: the username if present, else the subject.
    #[must_use]
    pub fn display_name(&self) -> &str {
        self.username.as_deref().unwrap_or(&self.subject)
    }
}

/// Whether the caller needs an organization to be resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OrgRequirement {
    /// Verification fails with `MissingOrg` if no organization resolves.
    Required,
    /// A missing organization leaves `AuthContext::org_id` empty.
    #[default]
    Optional,
}

/// Organization hints supplied by the caller alongside the token.
///
/// Only consulted when the token itself carries no organization claim.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OrgHints {
    /// Value of the organization header.
    pub header: Option<String>,
    /// Value of the organization query parameter.
    pub query: Option<String>,
}

impl OrgHints {
    /// No hints.
    #[must_use]
    pub fn none() -> Self {
        Self::default()
    }

    /// Sets the header hint.
    #[must_use]
    pub fn with_header(mut self, value: impl Into<String>) -> Self {
        self.header = Some(value.into());
        self
    }

    /// Sets the query parameter hint.
    #[must_use]
    pub fn with_query(mut self, value: impl Into<String>) -> Self {
        self.query = Some(value.into());
        self
    }

    /// Reads the hints from request headers and the raw query string, using
    /// the header and parameter names from `claims`.
    #[must_use]
    pub fn from_request(
        headers: &axum::http::HeaderMap,
        query: Option<&str>,
        claims: &ClaimConfig,
    ) -> Self {
        let header = headers
            .get(claims.org_header.as_str())
            .and_then(|v| v.to_str().ok())
            .map(String::from);

        let query = query.and_then(|q| {
            url::form_urlencoded::parse(q.as_bytes())
                .find(|(name, _)| name == claims.org_query_param.as_str())
                .map(|(_, value)| value.into_owned())
        });

        Self { header, query }
    }
}
