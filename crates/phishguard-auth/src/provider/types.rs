//! Request and response bodies of the identity provider's JSON API.
//!
//! Field names follow the provider's PascalCase wire format.

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Clone, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct InitiateAuthRequest {
    pub auth_flow: String,
    pub client_id: String,
    pub auth_parameters: HashMap<String, String>,
}

impl fmt::Debug for InitiateAuthRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InitiateAuthRequest")
            .field("auth_flow", &self.auth_flow)
            .field("client_id", &self.client_id)
            .field("auth_parameters", &self.auth_parameters.keys().collect::<Vec<_>>())
            .finish()
    }
}

#[derive(Clone, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct RespondToAuthChallengeRequest {
    pub client_id: String,
    pub challenge_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session: Option<String>,
    pub challenge_responses: HashMap<String, String>,
}

impl fmt::Debug for RespondToAuthChallengeRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RespondToAuthChallengeRequest")
            .field("client_id", &self.client_id)
            .field("challenge_name", &self.challenge_name)
            .field(
                "challenge_responses",
                &self.challenge_responses.keys().collect::<Vec<_>>(),
            )
            .finish_non_exhaustive()
    }
}

/// Response to both `InitiateAuth` and `RespondToAuthChallenge`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct AuthResponse {
    #[serde(default)]
    pub challenge_name: Option<String>,
    #[serde(default)]
    pub session: Option<String>,
    #[serde(default)]
    pub challenge_parameters: HashMap<String, String>,
    #[serde(default)]
    pub authentication_result: Option<AuthenticationResult>,
}

#[derive(Clone, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct AuthenticationResult {
    #[serde(default)]
    pub access_token: Option<String>,
    #[serde(default)]
    pub id_token: Option<String>,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub token_type: Option<String>,
    #[serde(default)]
    pub expires_in: Option<i64>,
}

impl fmt::Debug for AuthenticationResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthenticationResult")
            .field("token_type", &self.token_type)
            .field("expires_in", &self.expires_in)
            .finish_non_exhaustive()
    }
}

#[derive(Clone, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct AccessTokenRequest {
    pub access_token: String,
}

impl fmt::Debug for AccessTokenRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("AccessTokenRequest { .. }")
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct GetUserResponse {
    pub username: String,
    #[serde(default)]
    pub user_attributes: Vec<AttributeType>,
    #[serde(default)]
    pub preferred_mfa_setting: Option<String>,
    #[serde(default, rename = "UserMFASettingList")]
    pub user_mfa_setting_list: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct AttributeType {
    pub name: String,
    #[serde(default)]
    pub value: Option<String>,
}

/// Software tokens are associated either for a signed-in user (access
/// token) or in the middle of a login (session).
#[derive(Clone, PartialEq, Eq)]
pub enum TokenTarget {
    AccessToken(String),
    Session(String),
}

impl fmt::Debug for TokenTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AccessToken(_) => f.write_str("AccessToken(..)"),
            Self::Session(_) => f.write_str("Session(..)"),
        }
    }
}

#[derive(Clone, Default, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct AssociateSoftwareTokenRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub access_token: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session: Option<String>,
}

impl fmt::Debug for AssociateSoftwareTokenRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AssociateSoftwareTokenRequest")
            .field("with_access_token", &self.access_token.is_some())
            .field("with_session", &self.session.is_some())
            .finish()
    }
}

impl From<TokenTarget> for AssociateSoftwareTokenRequest {
    fn from(target: TokenTarget) -> Self {
        match target {
            TokenTarget::AccessToken(token) => Self {
                access_token: Some(token),
                session: None,
            },
            TokenTarget::Session(session) => Self {
                access_token: None,
                session: Some(session),
            },
        }
    }
}

#[derive(Clone, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct AssociateSoftwareTokenResponse {
    #[serde(default)]
    pub secret_code: Option<String>,
    #[serde(default)]
    pub session: Option<String>,
}

impl fmt::Debug for AssociateSoftwareTokenResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AssociateSoftwareTokenResponse")
            .field("has_secret", &self.secret_code.is_some())
            .field("has_session", &self.session.is_some())
            .finish()
    }
}

#[derive(Clone, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct VerifySoftwareTokenRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub access_token: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session: Option<String>,
    pub user_code: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub friendly_device_name: Option<String>,
}

impl fmt::Debug for VerifySoftwareTokenRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VerifySoftwareTokenRequest")
            .field("friendly_device_name", &self.friendly_device_name)
            .finish_non_exhaustive()
    }
}

impl VerifySoftwareTokenRequest {
    #[must_use]
    pub fn new(target: TokenTarget, user_code: impl Into<String>) -> Self {
        let AssociateSoftwareTokenRequest {
            access_token,
            session,
        } = target.into();
        Self {
            access_token,
            session,
            user_code: user_code.into(),
            friendly_device_name: None,
        }
    }

    #[must_use]
    pub fn with_friendly_name(mut self, name: Option<String>) -> Self {
        self.friendly_device_name = name;
        self
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct VerifySoftwareTokenResponse {
    /// `SUCCESS` or `ERROR`.
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub session: Option<String>,
}

impl VerifySoftwareTokenResponse {
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.status.as_deref() == Some("SUCCESS")
    }
}

#[derive(Clone, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct SetUserMfaPreferenceRequest {
    pub access_token: String,
    pub software_token_mfa_settings: MfaOptionSettings,
}

impl fmt::Debug for SetUserMfaPreferenceRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SetUserMfaPreferenceRequest")
            .field("software_token_mfa_settings", &self.software_token_mfa_settings)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct MfaOptionSettings {
    pub enabled: bool,
    pub preferred_mfa: bool,
}

/// Error body returned with non-success statuses.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ErrorBody {
    #[serde(rename = "__type", default)]
    pub error_type: Option<String>,
    #[serde(alias = "Message", default)]
    pub message: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_initiate_auth_wire_names() {
        let request = InitiateAuthRequest {
            auth_flow: "USER_PASSWORD_AUTH".into(),
            client_id: "client".into(),
            auth_parameters: HashMap::from([("USERNAME".to_string(), "alice".to_string())]),
        };
        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(value["AuthFlow"], "USER_PASSWORD_AUTH");
        assert_eq!(value["ClientId"], "client");
        assert_eq!(value["AuthParameters"]["USERNAME"], "alice");
        assert!(!format!("{:?}", request).contains("alice"));
    }

    #[test]
    fn test_auth_response_challenge() {
        let response: AuthResponse = serde_json::from_value(json!({
            "ChallengeName": "SOFTWARE_TOKEN_MFA",
            "Session": "sess",
            "ChallengeParameters": { "USER_ID_FOR_SRP": "alice" }
        }))
        .unwrap();
        assert_eq!(response.challenge_name.as_deref(), Some("SOFTWARE_TOKEN_MFA"));
        assert!(response.authentication_result.is_none());
    }

    #[test]
    fn test_get_user_mfa_list() {
        let response: GetUserResponse = serde_json::from_value(json!({
            "Username": "alice",
            "UserAttributes": [{ "Name": "email", "Value": "a@example.com" }],
            "PreferredMfaSetting": "SOFTWARE_TOKEN_MFA",
            "UserMFASettingList": ["SOFTWARE_TOKEN_MFA"]
        }))
        .unwrap();
        assert_eq!(response.user_mfa_setting_list, vec!["SOFTWARE_TOKEN_MFA"]);
        assert_eq!(response.user_attributes[0].name, "email");
    }

    #[test]
    fn test_token_target_serialization() {
        let request = VerifySoftwareTokenRequest::new(TokenTarget::Session("s".into()), "123456");
        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(value, json!({ "Session": "s", "UserCode": "123456" }));
    }

    #[test]
    fn test_error_body_aliases() {
        let body: ErrorBody = serde_json::from_value(json!({
            "__type": "NotAuthorizedException",
            "Message": "Incorrect username or password."
        }))
        .unwrap();
        assert_eq!(body.error_type.as_deref(), Some("NotAuthorizedException"));
        assert_eq!(body.message.as_deref(), Some("Incorrect username or password."));
    }
}
