//! Bearer token verification.
//!
//! [`TokenVerifier`] validates provider-issued tokens using the
//! [`JwksCache`](crate::jwks::JwksCache) and turns them into an
//! [`AuthContext`] for downstream authorization.

mod context;
mod verifier;

pub use context::{AuthContext, OrgHints, OrgRequirement};
pub use verifier::{TokenVerifier, bearer_token};
