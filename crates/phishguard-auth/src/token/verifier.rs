//! Bearer token verification against the pool's published keys.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{Algorithm, Validation, decode, decode_header};
use serde_json::Value;

use super::context::{AuthContext, OrgHints, OrgRequirement};
use crate::clock::{Clock, SystemClock};
use crate::config::{AuthConfig, ClaimConfig, ConfigError};
use crate::error::AuthError;
use crate::jwks::{HttpKeyFetcher, JwksCache, JwksError};

type Claims = HashMap<String, Value>;

/// Verifies provider-issued bearer tokens.
///
/// Tokens must be RS256-signed by a key from the pool's key set, issued by
/// the configured pool, addressed to one of the configured app clients and
/// unexpired relative to the injected clock.
pub struct TokenVerifier {
    cache: Arc<JwksCache>,
    clock: Arc<dyn Clock>,
    issuer: String,
    client_ids: HashSet<String>,
    accepted_token_uses: HashSet<String>,
    leeway: i64,
    claims: ClaimConfig,
}

impl TokenVerifier {
    /// Creates a verifier that reads keys from `cache`.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if the verifier section is incomplete.
    pub fn new(
        config: &AuthConfig,
        cache: Arc<JwksCache>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, ConfigError> {
        config.verifier.validate()?;

        Ok(Self {
            cache,
            clock,
            issuer: config.verifier.issuer(),
            client_ids: config.verifier.client_ids.iter().cloned().collect(),
            accepted_token_uses: config.verifier.accepted_token_uses.iter().cloned().collect(),
            leeway: i64::try_from(config.verifier.leeway.as_secs()).unwrap_or(i64::MAX),
            claims: config.claims.clone(),
        })
    }

    /// Creates a verifier that fetches keys over HTTPS from the pool's
    /// well-known endpoint, using the system clock.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if the verifier section is incomplete or the
    /// key set endpoint is unusable.
    pub fn from_config(config: &AuthConfig) -> Result<Self, ConfigError> {
        config.verifier.validate()?;

        let fetcher = HttpKeyFetcher::new(
            &config.verifier.jwks_uri(),
            &config.jwks,
            config.provider.allow_http,
        )
        .map_err(|e| ConfigError::InvalidValue(format!("verifier jwks endpoint: {}", e)))?;

        let clock: Arc<dyn Clock> = Arc::new(SystemClock);
        let cache = Arc::new(JwksCache::new(
            config.jwks.clone(),
            Arc::new(fetcher),
            clock.clone(),
        ));
        Self::new(config, cache, clock)
    }

    /// The issuer tokens must carry.
    #[must_use]
    pub fn issuer(&self) -> &str {
        &self.issuer
    }

    /// Verifies `token` and builds the request context.
    ///
    /// The organization is taken from the organization claim, then the
    /// header hint, then the query hint.
    ///
    /// # Errors
    ///
    /// - `TokenInvalid` for malformed tokens and bad signature, issuer,
    ///   audience or `token_use`
    /// - `TokenExpired` once `exp` plus leeway has passed
    /// - `UnknownKey` if the `kid` is not in the key set
    /// - `MissingOrg` if `requirement` is `Required` and nothing resolves
    pub async fn verify(
        &self,
        token: &str,
        hints: &OrgHints,
        requirement: OrgRequirement,
    ) -> Result<AuthContext, AuthError> {
        let token = token.trim();
        if token.is_empty() {
            return Err(AuthError::token_invalid("empty token"));
        }

        let header = decode_header(token)
            .map_err(|e| AuthError::token_invalid(format!("malformed header: {}", e)))?;
        if header.alg != Algorithm::RS256 {
            return Err(AuthError::token_invalid(format!(
                "unsupported algorithm {:?}",
                header.alg
            )));
        }
        let kid = header
            .kid
            .ok_or_else(|| AuthError::token_invalid("missing kid"))?;

        let (key, key_alg) = self.cache.get_key(&kid).await.map_err(|e| match e {
            JwksError::KeyNotFound(kid) => {
                tracing::debug!(kid = %kid, "Token signed with unknown key");
                AuthError::unknown_key(kid)
            }
            other => AuthError::provider_unavailable(other.to_string()),
        })?;
        if let Some(alg) = key_alg
            && alg != Algorithm::RS256
        {
            return Err(AuthError::token_invalid(format!(
                "key {} is not an RS256 key",
                kid
            )));
        }

        let mut validation = Validation::new(Algorithm::RS256);
        validation.set_issuer(&[self.issuer.as_str()]);
        validation.set_required_spec_claims(&["exp", "iss", "sub"]);
        // Expiry is checked against the injected clock below.
        validation.validate_exp = false;
        validation.validate_nbf = false;
        validation.validate_aud = false;

        let claims = decode::<Claims>(token, &key, &validation)
            .map_err(|e| match e.kind() {
                ErrorKind::InvalidSignature => AuthError::token_invalid("signature mismatch"),
                ErrorKind::InvalidIssuer => AuthError::token_invalid("issuer mismatch"),
                ErrorKind::ExpiredSignature => AuthError::TokenExpired,
                _ => AuthError::token_invalid(e.to_string()),
            })?
            .claims;

        let expires_at = numeric_claim(&claims, "exp")
            .ok_or_else(|| AuthError::token_invalid("exp is not numeric"))?;
        if expires_at.saturating_add(self.leeway) < self.clock.unix_timestamp() {
            return Err(AuthError::TokenExpired);
        }

        let token_use = string_claim(&claims, "token_use")
            .ok_or_else(|| AuthError::token_invalid("missing token_use"))?;
        if !self.accepted_token_uses.contains(token_use) {
            return Err(AuthError::token_invalid(format!(
                "token_use {} not accepted",
                token_use
            )));
        }

        if !audiences(&claims)
            .iter()
            .any(|aud| self.client_ids.contains(*aud))
        {
            return Err(AuthError::token_invalid("audience mismatch"));
        }

        let subject = string_claim(&claims, "sub")
            .filter(|s| !s.is_empty())
            .ok_or_else(|| AuthError::token_invalid("missing sub"))?
            .to_string();
        let username = string_claim(&claims, &self.claims.username)
            .or_else(|| string_claim(&claims, &self.claims.username_fallback))
            .map(String::from);
        let roles = extract_roles(&claims, &self.claims);
        let org_id = resolve_org(&claims, hints, &self.claims);

        if org_id.is_none() && requirement == OrgRequirement::Required {
            tracing::debug!(subject = %subject, "No organization resolved for token");
            return Err(AuthError::MissingOrg);
        }

        tracing::debug!(
            subject = %subject,
            token_use = %token_use,
            roles = roles.len(),
            "Verified bearer token"
        );

        Ok(AuthContext {
            subject,
            username,
            org_id,
            roles,
            token_use: token_use.to_string(),
            expires_at,
            claims: Arc::new(claims),
        })
    }
}

/// Extracts the token from an `Authorization: Bearer <token>` header value.
#[must_use]
pub fn bearer_token(header_value: &str) -> Option<&str> {
    let (scheme, token) = header_value.trim().split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }
    let token = token.trim();
    (!token.is_empty()).then_some(token)
}

fn string_claim<'a>(claims: &'a Claims, name: &str) -> Option<&'a str> {
    claims.get(name).and_then(Value::as_str)
}

fn numeric_claim(claims: &Claims, name: &str) -> Option<i64> {
    let value = claims.get(name)?;
    value
        .as_i64()
        .or_else(|| value.as_f64().map(|f| f as i64))
}

/// `aud` for id tokens, `client_id` for access tokens.
fn audiences(claims: &Claims) -> Vec<&str> {
    let mut out = Vec::new();
    match claims.get("aud") {
        Some(Value::String(aud)) => out.push(aud.as_str()),
        Some(Value::Array(items)) => out.extend(items.iter().filter_map(Value::as_str)),
        _ => {}
    }
    if let Some(client_id) = string_claim(claims, "client_id") {
        out.push(client_id);
    }
    out
}

/// Reads the primary groups claim, falling back to the secondary one.
/// Accepts a JSON array or a comma-separated string.
fn extract_roles(claims: &Claims, names: &ClaimConfig) -> Vec<String> {
    let value = claims
        .get(&names.groups)
        .or_else(|| claims.get(&names.groups_fallback));

    let roles: Vec<String> = match value {
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(Value::as_str)
            .map(|r| r.trim().to_string())
            .collect(),
        Some(Value::String(s)) => s.split(',').map(|r| r.trim().to_string()).collect(),
        _ => Vec::new(),
    };
    roles.into_iter().filter(|r| !r.is_empty()).collect()
}

fn resolve_org(claims: &Claims, hints: &OrgHints, names: &ClaimConfig) -> Option<String> {
    let non_empty = |s: &str| {
        let s = s.trim();
        (!s.is_empty()).then(|| s.to_string())
    };

    string_claim(claims, &names.org)
        .and_then(non_empty)
        .or_else(|| string_claim(claims, &names.org_fallback).and_then(non_empty))
        .or_else(|| hints.header.as_deref().and_then(non_empty))
        .or_else(|| hints.query.as_deref().and_then(non_empty))
}
