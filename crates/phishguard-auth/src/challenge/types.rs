//! Login protocol types.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::AuthError;
use crate::secret_hash;

/// Step of the login protocol.
///
/// Every state after `Password` is entered only because the provider said
/// so; the engine never infers the next state on its own.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ChallengeState {
    /// Username and password not yet accepted.
    Password,
    /// The user must choose a new password.
    NewPasswordRequired,
    /// The user must enroll an authenticator app.
    MfaSetup,
    /// The user must enter a code from their authenticator app.
    SoftwareTokenMfa,
    /// Tokens were issued.
    Complete,
}

impl ChallengeState {
    /// Wire name of the state.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Password => "PASSWORD",
            Self::NewPasswordRequired => "NEW_PASSWORD_REQUIRED",
            Self::MfaSetup => "MFA_SETUP",
            Self::SoftwareTokenMfa => "SOFTWARE_TOKEN_MFA",
            Self::Complete => "COMPLETE",
        }
    }

    /// Maps a challenge name returned by the provider.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::UnsupportedChallenge` for challenges this crate
    /// cannot drive (SMS, SRP, custom auth).
    pub fn from_provider(name: &str) -> Result<Self, AuthError> {
        match name {
            "NEW_PASSWORD_REQUIRED" => Ok(Self::NewPasswordRequired),
            "MFA_SETUP" => Ok(Self::MfaSetup),
            "SOFTWARE_TOKEN_MFA" => Ok(Self::SoftwareTokenMfa),
            other => Err(AuthError::unsupported_challenge(other)),
        }
    }

    /// Returns `true` if a client can answer this state with
    /// `respond_to_challenge`.
    #[must_use]
    pub fn accepts_responses(&self) -> bool {
        matches!(
            self,
            Self::NewPasswordRequired | Self::MfaSetup | Self::SoftwareTokenMfa
        )
    }
}

impl fmt::Display for ChallengeState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ChallengeState {
    type Err = AuthError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PASSWORD" => Ok(Self::Password),
            "NEW_PASSWORD_REQUIRED" => Ok(Self::NewPasswordRequired),
            "MFA_SETUP" => Ok(Self::MfaSetup),
            "SOFTWARE_TOKEN_MFA" => Ok(Self::SoftwareTokenMfa),
            "COMPLETE" => Ok(Self::Complete),
            other => Err(AuthError::validation(format!("unknown challenge {}", other))),
        }
    }
}

/// Provider continuation for one login attempt.
///
/// Serializes to the caller-facing challenge payload
/// (`{"challengeName", "session", "username", "expiresAt", "seal"}`) and is
/// sent back unchanged with the next response.
///
/// `seal` is an HMAC over challenge, username and expiry keyed by the app
/// client secret, so those fields cannot be altered by the caller. The
/// provider session token is opaque and checked by the provider itself.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    /// Opaque provider session token.
    #[serde(rename = "session")]
    pub token: String,

    /// Challenge this session is waiting on.
    #[serde(rename = "challengeName")]
    pub challenge: ChallengeState,

    /// The user logging in. Fixed for the life of the session.
    pub username: String,

    /// Unix timestamp after which the provider no longer accepts the session.
    pub expires_at: i64,

    /// Challenge parameters reported by the provider.
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub parameters: HashMap<String, String>,

    /// Integrity tag set by the engine.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub seal: String,
}

impl Session {
    /// Returns `true` once `now` has reached `expires_at`.
    #[must_use]
    pub fn is_expired(&self, now: i64) -> bool {
        now >= self.expires_at
    }

    /// Sets `seal` from the current fields.
    pub(crate) fn seal_with(&mut self, client_secret: &str) -> Result<(), AuthError> {
        let expires_at = self.expires_at.to_string();
        self.seal = secret_hash::seal(client_secret, &self.sealed_fields(&expires_at))?;
        Ok(())
    }

    /// Returns `true` if `seal` matches the current fields.
    pub(crate) fn has_valid_seal(&self, client_secret: &str) -> bool {
        let expires_at = self.expires_at.to_string();
        secret_hash::verify_seal(client_secret, &self.sealed_fields(&expires_at), &self.seal)
    }

    fn sealed_fields<'a>(&'a self, expires_at: &'a str) -> [&'a str; 3] {
        [self.challenge.as_str(), self.username.as_str(), expires_at]
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("challenge", &self.challenge)
            .field("username", &self.username)
            .field("expires_at", &self.expires_at)
            .finish_non_exhaustive()
    }
}

/// Tokens issued when a login completes.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenSet {
    pub id_token: String,
    pub access_token: String,
    /// Absent when the set comes from a refresh.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    pub token_type: String,
    /// Lifetime of the access token in seconds.
    pub expires_in: i64,
}

impl fmt::Debug for TokenSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenSet")
            .field("token_type", &self.token_type)
            .field("expires_in", &self.expires_in)
            .field("has_refresh_token", &self.refresh_token.is_some())
            .finish_non_exhaustive()
    }
}

/// Result of a login step: tokens, or the next challenge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthOutcome {
    /// The login completed.
    Authenticated(TokenSet),
    /// The provider requires another step.
    Challenge(Session),
}

impl AuthOutcome {
    /// State the login is in after this step.
    #[must_use]
    pub fn state(&self) -> ChallengeState {
        match self {
            Self::Authenticated(_) => ChallengeState::Complete,
            Self::Challenge(session) => session.challenge,
        }
    }

    /// Returns the tokens if the login completed.
    #[must_use]
    pub fn tokens(&self) -> Option<&TokenSet> {
        match self {
            Self::Authenticated(tokens) => Some(tokens),
            Self::Challenge(_) => None,
        }
    }

    /// Returns the session if another step is required.
    #[must_use]
    pub fn session(&self) -> Option<&Session> {
        match self {
            Self::Authenticated(_) => None,
            Self::Challenge(session) => Some(session),
        }
    }
}

/// Client answers to a challenge.
#[derive(Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ChallengeResponses {
    /// One-time code from the authenticator app.
    pub code: Option<String>,

    /// Replacement password for `NEW_PASSWORD_REQUIRED`.
    pub new_password: Option<String>,

    /// Shared secret being enrolled. When present the code is checked
    /// locally before it is forwarded.
    pub totp_secret: Option<String>,

    /// Client-adjusted Unix timestamp the code was generated at.
    pub client_time: Option<i64>,

    /// Device name recorded with a newly enrolled authenticator.
    pub friendly_name: Option<String>,

    /// User attributes the provider asked for with `NEW_PASSWORD_REQUIRED`.
    pub attributes: HashMap<String, String>,
}

impl ChallengeResponses {
    #[must_use]
    pub fn code(code: impl Into<String>) -> Self {
        Self {
            code: Some(code.into()),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn new_password(password: impl Into<String>) -> Self {
        Self {
            new_password: Some(password.into()),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_totp_secret(mut self, secret: impl Into<String>) -> Self {
        self.totp_secret = Some(secret.into());
        self
    }

    #[must_use]
    pub fn with_client_time(mut self, timestamp: i64) -> Self {
        self.client_time = Some(timestamp);
        self
    }

    #[must_use]
    pub fn with_friendly_name(mut self, name: impl Into<String>) -> Self {
        self.friendly_name = Some(name.into());
        self
    }

    #[must_use]
    pub fn with_attribute(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(name.into(), value.into());
        self
    }
}

impl fmt::Debug for ChallengeResponses {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChallengeResponses")
            .field("has_code", &self.code.is_some())
            .field("has_new_password", &self.new_password.is_some())
            .field("has_totp_secret", &self.totp_secret.is_some())
            .field("client_time", &self.client_time)
            .field("friendly_name", &self.friendly_name)
            .finish_non_exhaustive()
    }
}

/// Authenticator enrollment material.
#[derive(Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MfaSetup {
    /// Base32 shared secret.
    pub secret: String,
    /// `otpauth://` URI for QR rendering.
    pub provisioning_uri: String,
    /// Updated session when enrolling during login.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session: Option<Session>,
}

impl fmt::Debug for MfaSetup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MfaSetup")
            .field("session", &self.session)
            .finish_non_exhaustive()
    }
}

/// User record as reported by the provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub username: String,
    pub attributes: HashMap<String, String>,
    pub preferred_mfa: Option<String>,
    pub mfa_methods: Vec<String>,
}

impl UserProfile {
    /// Returns an attribute such as `email` or `custom:org_id`.
    #[must_use]
    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).map(String::as_str)
    }

    /// Returns `true` if an authenticator app is enrolled.
    #[must_use]
    pub fn has_software_token(&self) -> bool {
        self.mfa_methods.iter().any(|m| m == "SOFTWARE_TOKEN_MFA")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_state_wire_names() {
        for state in [
            ChallengeState::Password,
            ChallengeState::NewPasswordRequired,
            ChallengeState::MfaSetup,
            ChallengeState::SoftwareTokenMfa,
            ChallengeState::Complete,
        ] {
            assert_eq!(serde_json::to_value(state).unwrap(), json!(state.as_str()));
            assert_eq!(state.as_str().parse::<ChallengeState>().unwrap(), state);
        }
    }

    #[test]
    fn test_provider_challenges() {
        assert_eq!(
            ChallengeState::from_provider("SOFTWARE_TOKEN_MFA").unwrap(),
            ChallengeState::SoftwareTokenMfa
        );
        assert!(matches!(
            ChallengeState::from_provider("SMS_MFA"),
            Err(AuthError::UnsupportedChallenge { ref name }) if name == "SMS_MFA"
        ));
        // Terminal and initial states never come from the provider.
        assert!(ChallengeState::from_provider("COMPLETE").is_err());
        assert!(ChallengeState::from_provider("PASSWORD").is_err());
    }

    #[test]
    fn test_session_payload_shape() {
        let session = Session {
            token: "opaque".into(),
            challenge: ChallengeState::MfaSetup,
            username: "alice".into(),
            expires_at: 1_700_000_180,
            parameters: HashMap::new(),
            seal: String::new(),
        };
        let value = serde_json::to_value(&session).unwrap();
        assert_eq!(
            value,
            json!({
                "session": "opaque",
                "challengeName": "MFA_SETUP",
                "username": "alice",
                "expiresAt": 1_700_000_180
            })
        );
        let back: Session = serde_json::from_value(value).unwrap();
        assert_eq!(back, session);
        assert!(!format!("{:?}", session).contains("opaque"));
    }

    #[test]
    fn test_session_expiry() {
        let session = Session {
            token: "t".into(),
            challenge: ChallengeState::SoftwareTokenMfa,
            username: "alice".into(),
            expires_at: 100,
            parameters: HashMap::new(),
            seal: String::new(),
        };
        assert!(!session.is_expired(99));
        assert!(session.is_expired(100));
    }

    #[test]
    fn test_sealed_session_detects_changes() {
        let mut session = Session {
            token: "opaque".into(),
            challenge: ChallengeState::SoftwareTokenMfa,
            username: "alice".into(),
            expires_at: 1_700_000_180,
            parameters: HashMap::new(),
            seal: String::new(),
        };
        assert!(!session.has_valid_seal("client-secret"));

        session.seal_with("client-secret").unwrap();
        let back: Session = serde_json::from_value(serde_json::to_value(&session).unwrap()).unwrap();
        assert!(back.has_valid_seal("client-secret"));
        assert!(!back.has_valid_seal("other-secret"));

        let mut later = back.clone();
        later.expires_at += 3600;
        assert!(!later.has_valid_seal("client-secret"));

        let mut other_user = back;
        other_user.username = "mallory".into();
        assert!(!other_user.has_valid_seal("client-secret"));
    }

    #[test]
    fn test_responses_from_json() {
        let responses: ChallengeResponses = serde_json::from_value(json!({
            "code": "123456",
            "clientTime": 1_700_000_000,
            "totpSecret": "JBSWY3DPEHPK3PXP"
        }))
        .unwrap();
        assert_eq!(responses.code.as_deref(), Some("123456"));
        assert_eq!(responses.client_time, Some(1_700_000_000));
        assert!(responses.new_password.is_none());
    }

    #[test]
    fn test_token_set_debug_hides_tokens() {
        let tokens = TokenSet {
            id_token: "id.jwt".into(),
            access_token: "access.jwt".into(),
            refresh_token: None,
            token_type: "Bearer".into(),
            expires_in: 3600,
        };
        let debug = format!("{:?}", tokens);
        assert!(!debug.contains("jwt"));
        assert_eq!(AuthOutcome::Authenticated(tokens).state(), ChallengeState::Complete);
    }
}
