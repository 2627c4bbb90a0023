//! # phishguard-auth
//!
//! Authentication core for PhishGuard.
//!
//! The crate fronts a managed identity provider. It drives the multi-step
//! login protocol (password, forced password reset, authenticator
//! enrollment, TOTP), verifies the bearer tokens the provider issues, and
//! expands verified roles into permissions.
//!
//! ## Modules
//!
//! - [`secret_hash`] - `SECRET_HASH` signing required on provider calls
//! - [`jwks`] - Lazily refreshed, single-flight cache of the pool's signing keys
//! - [`token`] - Bearer token verification and [`AuthContext`]
//! - [`totp`] - Drift-tolerant TOTP matching and provisioning URIs
//! - [`challenge`] - The login state machine
//! - [`rbac`] - Role to permission expansion and guards
//! - [`provider`] - Identity provider boundary and HTTP client
//! - [`org`] - Per-organization provider credentials
//! - [`config`] - Configuration and loading
//! - [`response`] - Mapping of results onto HTTP responses
//!
//! ## Flow
//!
//! Client credentials go to the [`ChallengeEngine`], which signs provider
//! requests and returns either a [`TokenSet`] or the next challenge. Later
//! requests present the token to the [`TokenVerifier`], and the resulting
//! [`AuthContext`] is checked with [`rbac::require_permission`].

pub mod challenge;
pub mod clock;
pub mod config;
pub mod error;
pub mod jwks;
pub mod org;
pub mod provider;
pub mod rbac;
pub mod response;
pub mod secret_hash;
pub mod token;
pub mod totp;

pub use challenge::{
    AuthOutcome, ChallengeEngine, ChallengeResponses, ChallengeState, MfaSetup, Session, TokenSet,
    UserProfile,
};
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{AuthConfig, ConfigError};
pub use error::{AuthError, ErrorCategory};
pub use jwks::{HttpKeyFetcher, JwksCache, JwksError, KeyFetcher};
pub use org::{OrgConfigResolver, OrgProviderConfig, ProviderCredentials, StaticOrgResolver};
pub use provider::{CognitoClient, IdentityProvider, ProviderError, ProviderErrorKind};
pub use rbac::{PermissionSet, ResolvedAccess};
pub use token::{AuthContext, OrgHints, OrgRequirement, TokenVerifier};
pub use totp::{TotpError, TotpMatcher};

/// Type alias for authentication/authorization results.
pub type AuthResult<T> = Result<T, AuthError>;

/// Prelude module for convenient imports.
///
/// ```
/// use phishguard_auth::prelude::*;
/// ```
pub mod prelude {
    pub use crate::AuthResult;
    pub use crate::challenge::{AuthOutcome, ChallengeEngine, ChallengeResponses, ChallengeState};
    pub use crate::config::AuthConfig;
    pub use crate::error::AuthError;
    pub use crate::rbac::{can, can_any, expand_roles, require_any_permission, require_permission};
    pub use crate::token::{AuthContext, OrgHints, OrgRequirement, TokenVerifier};
}
