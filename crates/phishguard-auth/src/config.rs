//! Authentication core configuration.
//!
//! Configuration is organized into sections for the identity provider
//! client, the JWKS key cache, the bearer token verifier, claim naming and
//! the TOTP matcher. Every section has serviceable defaults so that only
//! deployment-specific values (pool identifiers) need to be supplied.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Root configuration for the authentication core.
///
/// # Example (TOML)
///
/// ```toml
/// [provider]
/// request_timeout = "10s"
///
/// [jwks]
/// ttl = "12h"
///
/// [verifier]
/// region = "eu-west-1"
/// user_pool_id = "eu-west-1_AbCdEf123"
/// client_ids = ["4k1example0client"]
/// ```
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct AuthConfig {
    /// Identity provider client configuration.
    pub provider: ProviderConfig,

    /// JWKS key cache configuration.
    pub jwks: JwksConfig,

    /// Bearer token verifier configuration.
    pub verifier: VerifierConfig,

    /// Claim names consumed by the verifier.
    pub claims: ClaimConfig,

    /// TOTP matcher configuration.
    pub totp: TotpConfig,
}

/// Identity provider client configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ProviderConfig {
    /// Upper bound for every provider call.
    #[serde(with = "humantime_serde")]
    pub request_timeout: Duration,

    /// Endpoint override. When unset the regional endpoint
    /// `https://cognito-idp.{region}.amazonaws.com/` is used.
    pub endpoint: Option<String>,

    /// Allow plain HTTP endpoints. Only meant for tests.
    pub allow_http: bool,

    /// Lifetime of a provider challenge session.
    #[serde(with = "humantime_serde")]
    pub session_ttl: Duration,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            request_timeout: Duration::from_secs(10),
            endpoint: None,
            allow_http: false,
            session_ttl: Duration::from_secs(180), // 3 minutes
        }
    }
}

/// JWKS key cache configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct JwksConfig {
    /// How long a fetched key set stays valid.
    #[serde(with = "humantime_serde")]
    pub ttl: Duration,

    /// Extra time past `ttl` during which a previous key set is still served
    /// when a refresh fails.
    #[serde(with = "humantime_serde")]
    pub stale_grace: Duration,

    /// Additional fetch attempts after a transient failure.
    pub fetch_retries: u32,

    /// After a failed refresh, how long a stale key set within its grace
    /// window is served without another fetch.
    #[serde(with = "humantime_serde")]
    pub failure_backoff: Duration,

    /// HTTP request timeout for the key set endpoint.
    #[serde(with = "humantime_serde")]
    pub request_timeout: Duration,

    /// Maximum response size in bytes.
    pub max_response_size: usize,
}

impl Default for JwksConfig {
    fn default() -> Self {
        Self {
            ttl: Duration::from_secs(12 * 3600),    // 12 hours
            stale_grace: Duration::from_secs(3600), // 1 hour
            fetch_retries: 1,
            failure_backoff: Duration::from_secs(30),
            request_timeout: Duration::from_secs(10),
            max_response_size: 1024 * 1024, // 1 MB
        }
    }
}

/// Bearer token verifier configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct VerifierConfig {
    /// Region hosting the user pool.
    pub region: String,

    /// User pool that issues the tokens.
    pub user_pool_id: String,

    /// Accepted app client ids (`aud` for id tokens, `client_id` for
    /// access tokens).
    pub client_ids: Vec<String>,

    /// Clock skew tolerance applied to `exp`.
    #[serde(with = "humantime_serde")]
    pub leeway: Duration,

    /// Accepted values of the `token_use` claim.
    pub accepted_token_uses: Vec<String>,
}

impl Default for VerifierConfig {
    fn default() -> Self {
        Self {
            region: String::new(),
            user_pool_id: String::new(),
            client_ids: Vec::new(),
            leeway: Duration::from_secs(60),
            accepted_token_uses: vec!["id".to_string(), "access".to_string()],
        }
    }
}

impl VerifierConfig {
    /// Returns the issuer URL tokens must carry in `iss`.
    #[must_use]
    pub fn issuer(&self) -> String {
        format!(
            "https://cognito-idp.{}.amazonaws.com/{}",
            self.region, self.user_pool_id
        )
    }

    /// Returns the published key set URL for the pool.
    #[must_use]
    pub fn jwks_uri(&self) -> String {
        format!("{}/.well-known/jwks.json", self.issuer())
    }

    /// Ensures the pool identifiers needed for verification are present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Missing` naming the first absent field.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.region.trim().is_empty() {
            return Err(ConfigError::Missing("verifier.region".to_string()));
        }
        if self.user_pool_id.trim().is_empty() {
            return Err(ConfigError::Missing("verifier.user_pool_id".to_string()));
        }
        if self.client_ids.is_empty() {
            return Err(ConfigError::Missing("verifier.client_ids".to_string()));
        }
        if self.accepted_token_uses.is_empty() {
            return Err(ConfigError::InvalidValue(
                "verifier.accepted_token_uses cannot be empty".to_string(),
            ));
        }
        Ok(())
    }
}

/// Claim names consumed by the token verifier.
///
/// Each logical claim has a primary and a fallback name. The organization id
/// additionally falls back to a request header and a query parameter.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ClaimConfig {
    /// Primary username claim.
    pub username: String,

    /// Fallback username claim.
    pub username_fallback: String,

    /// Primary group/role claim.
    pub groups: String,

    /// Fallback group/role claim.
    pub groups_fallback: String,

    /// Primary organization claim.
    pub org: String,

    /// Fallback organization claim.
    pub org_fallback: String,

    /// Request header consulted when no organization claim is present.
    pub org_header: String,

    /// Query parameter consulted when neither claim nor header resolve.
    pub org_query_param: String,
}

impl Default for ClaimConfig {
    fn default() -> Self {
        Self {
            username: "cognito:username".to_string(),
            username_fallback: "username".to_string(),
            groups: "cognito:groups".to_string(),
            groups_fallback: "custom:roles".to_string(),
            org: "custom:org_id".to_string(),
            org_fallback: "org_id".to_string(),
            org_header: "x-org-id".to_string(),
            org_query_param: "org_id".to_string(),
        }
    }
}

/// Longest accepted TOTP time step.
pub const MAX_TOTP_STEP: Duration = Duration::from_secs(300);

/// TOTP matcher configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TotpConfig {
    /// Number of digits per code.
    pub digits: usize,

    /// Time step.
    #[serde(with = "humantime_serde")]
    pub step: Duration,

    /// Steps accepted on each side of the server time.
    pub skew_steps: u8,

    /// Issuer label written into provisioning URIs.
    pub issuer: String,
}

impl Default for TotpConfig {
    fn default() -> Self {
        Self {
            digits: 6,
            step: Duration::from_secs(30),
            skew_steps: 5,
            issuer: "PhishGuard".to_string(),
        }
    }
}

impl TotpConfig {
    /// Total tolerance on each side of the server time.
    #[must_use]
    pub fn tolerance(&self) -> Duration {
        self.step * u32::from(self.skew_steps)
    }
}

/// Configuration validation errors.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ConfigError {
    /// An invalid configuration value was provided.
    #[error("Invalid configuration value: {0}")]
    InvalidValue(String),

    /// A required configuration value is missing.
    #[error("Missing required configuration: {0}")]
    Missing(String),

    /// The configuration sources could not be read or merged.
    #[error("Failed to load configuration: {0}")]
    Load(String),
}

impl AuthConfig {
    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` if a timeout or TTL is zero, the
    /// TOTP parameters are out of range, or a claim name is empty.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.provider.request_timeout.is_zero() {
            return Err(ConfigError::InvalidValue(
                "provider.request_timeout must be > 0".to_string(),
            ));
        }

        if self.provider.session_ttl.is_zero() {
            return Err(ConfigError::InvalidValue(
                "provider.session_ttl must be > 0".to_string(),
            ));
        }

        if let Some(endpoint) = &self.provider.endpoint {
            let url = url::Url::parse(endpoint).map_err(|e| {
                ConfigError::InvalidValue(format!("provider.endpoint '{}': {}", endpoint, e))
            })?;
            if url.scheme() != "https" && !(url.scheme() == "http" && self.provider.allow_http) {
                return Err(ConfigError::InvalidValue(format!(
                    "provider.endpoint must use https: '{}'",
                    endpoint
                )));
            }
        }

        if self.jwks.ttl.is_zero() {
            return Err(ConfigError::InvalidValue(
                "jwks.ttl must be > 0".to_string(),
            ));
        }

        if self.jwks.request_timeout.is_zero() {
            return Err(ConfigError::InvalidValue(
                "jwks.request_timeout must be > 0".to_string(),
            ));
        }

        if !(6..=8).contains(&self.totp.digits) {
            return Err(ConfigError::InvalidValue(format!(
                "totp.digits must be between 6 and 8, got {}",
                self.totp.digits
            )));
        }

        if self.totp.step.as_secs() == 0 {
            return Err(ConfigError::InvalidValue(
                "totp.step must be at least one second".to_string(),
            ));
        }

        if self.totp.step > MAX_TOTP_STEP {
            return Err(ConfigError::InvalidValue(format!(
                "totp.step must be at most {}s",
                MAX_TOTP_STEP.as_secs()
            )));
        }

        let claims = [
            ("claims.username", &self.claims.username),
            ("claims.groups", &self.claims.groups),
            ("claims.org", &self.claims.org),
            ("claims.org_header", &self.claims.org_header),
            ("claims.org_query_param", &self.claims.org_query_param),
        ];
        for (name, value) in claims {
            if value.trim().is_empty() {
                return Err(ConfigError::InvalidValue(format!(
                    "{} cannot be empty",
                    name
                )));
            }
        }

        Ok(())
    }
}

/// Layered configuration loading.
pub mod loader {
    use super::{AuthConfig, ConfigError};
    use config::{Config, Environment, File};
    use std::path::PathBuf;

    /// Default configuration file looked up when no path is given.
    pub const DEFAULT_CONFIG_FILE: &str = "phishguard.toml";

    /// Environment variable prefix, e.g. `PHISHGUARD__JWKS__TTL=6h`.
    pub const ENV_PREFIX: &str = "PHISHGUARD";

    /// Loads configuration from an optional TOML file plus environment
    /// overrides, then validates it.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Load` if a source cannot be merged or
    /// deserialized, or any validation error.
    pub fn load_config(path: Option<&str>) -> Result<AuthConfig, ConfigError> {
        let mut builder = Config::builder();
        let file = PathBuf::from(path.unwrap_or(DEFAULT_CONFIG_FILE));
        if file.exists() {
            builder = builder.add_source(File::from(file));
        } else if let Some(p) = path {
            return Err(ConfigError::Load(format!("config file not found: {}", p)));
        }

        builder = builder.add_source(
            Environment::with_prefix(ENV_PREFIX)
                .try_parsing(true)
                .separator("__")
                .list_separator(",")
                .with_list_parse_key("verifier.client_ids")
                .with_list_parse_key("verifier.accepted_token_uses"),
        );

        let cfg = builder
            .build()
            .map_err(|e| ConfigError::Load(format!("config build error: {}", e)))?;
        let merged: AuthConfig = cfg
            .try_deserialize()
            .map_err(|e| ConfigError::Load(format!("config deserialize error: {}", e)))?;

        merged.validate()?;
        Ok(merged)
    }
}
