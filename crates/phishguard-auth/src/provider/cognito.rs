//! HTTP client for the managed user pool service.
//!
//! Every operation is a `POST` to the regional endpoint with an
//! `X-Amz-Target` header naming the operation and a JSON 1.1 body. The
//! operations used here are authorized by the app client id, session or
//! access token in the body, so requests are not request-signed.

use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use serde::Serialize;
use serde::de::{DeserializeOwned, IgnoredAny};
use url::Url;

use super::types::{
    AccessTokenRequest, AssociateSoftwareTokenRequest, AssociateSoftwareTokenResponse,
    AuthResponse, ErrorBody, GetUserResponse, InitiateAuthRequest, MfaOptionSettings,
    RespondToAuthChallengeRequest, SetUserMfaPreferenceRequest, TokenTarget,
    VerifySoftwareTokenRequest, VerifySoftwareTokenResponse,
};
use super::{IdentityProvider, ProviderError, ProviderErrorKind};
use crate::config::{ConfigError, ProviderConfig};
use crate::org::ProviderCredentials;

const TARGET_PREFIX: &str = "AWSCognitoIdentityProviderService";
const CONTENT_TYPE_JSON_1_1: &str = "application/x-amz-json-1.1";

/// [`IdentityProvider`] backed by the user pool HTTP API.
#[derive(Debug, Clone)]
pub struct CognitoClient {
    http_client: reqwest::Client,
    /// Fixed endpoint replacing the regional one (local emulators, tests).
    endpoint: Option<Url>,
}

impl CognitoClient {
    /// Creates a client from the provider section.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` for an unparsable or plain-HTTP
    /// endpoint override (unless `allow_http`), and if the HTTP client
    /// cannot be built.
    pub fn new(config: &ProviderConfig) -> Result<Self, ConfigError> {
        let endpoint = match config.endpoint.as_deref() {
            Some(raw) => {
                let url = Url::parse(raw).map_err(|e| {
                    ConfigError::InvalidValue(format!("provider.endpoint: {}", e))
                })?;
                match url.scheme() {
                    "https" => {}
                    "http" if config.allow_http => {}
                    _ => {
                        return Err(ConfigError::InvalidValue(
                            "provider.endpoint must use https".to_string(),
                        ));
                    }
                }
                Some(url)
            }
            None => None,
        };

        let http_client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| ConfigError::InvalidValue(format!("provider http client: {}", e)))?;

        Ok(Self {
            http_client,
            endpoint,
        })
    }

    fn endpoint_for(&self, region: &str) -> Result<Url, ProviderError> {
        if let Some(endpoint) = &self.endpoint {
            return Ok(endpoint.clone());
        }
        let valid = !region.is_empty()
            && region
                .bytes()
                .all(|b| b.is_ascii_lowercase() || b.is_ascii_digit() || b == b'-');
        if !valid {
            return Err(ProviderError::invalid_configuration(format!(
                "invalid region {:?}",
                region
            )));
        }
        Url::parse(&format!("https://cognito-idp.{}.amazonaws.com/", region))
            .map_err(|e| ProviderError::invalid_configuration(e.to_string()))
    }

    async fn call<Req, Resp>(
        &self,
        credentials: &ProviderCredentials,
        operation: &str,
        body: &Req,
    ) -> Result<Resp, ProviderError>
    where
        Req: Serialize + Sync + ?Sized,
        Resp: DeserializeOwned,
    {
        let url = self.endpoint_for(&credentials.region)?;
        let payload = serde_json::to_vec(body)
            .map_err(|e| ProviderError::transport(format!("encode {}: {}", operation, e)))?;

        tracing::debug!(operation = %operation, "Calling identity provider");

        let response = self
            .http_client
            .post(url)
            .header(CONTENT_TYPE, CONTENT_TYPE_JSON_1_1)
            .header("X-Amz-Target", format!("{}.{}", TARGET_PREFIX, operation))
            .body(payload)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    ProviderError::timeout()
                } else {
                    ProviderError::transport(e.to_string())
                }
            })?;

        let status = response.status();
        let bytes = response
            .bytes()
            .await
            .map_err(|e| ProviderError::transport(e.to_string()))?;

        if !status.is_success() {
            let body: ErrorBody = serde_json::from_slice(&bytes).unwrap_or_default();
            let err = match body.error_type {
                Some(name) => ProviderError::from_exception(&name, body.message.unwrap_or_default()),
                None => ProviderError {
                    kind: if status.is_server_error() {
                        ProviderErrorKind::Internal
                    } else {
                        ProviderErrorKind::Unknown
                    },
                    code: format!("HTTP {}", status.as_u16()),
                    message: body.message.unwrap_or_default(),
                },
            };
            tracing::warn!(
                operation = %operation,
                status = status.as_u16(),
                code = %err.code,
                "Identity provider call failed"
            );
            return Err(err);
        }

        let bytes: &[u8] = if bytes.is_empty() { b"{}" } else { &bytes };
        serde_json::from_slice(bytes).map_err(|e| ProviderError {
            kind: ProviderErrorKind::Unknown,
            code: "MalformedResponse".to_string(),
            message: format!("{}: {}", operation, e),
        })
    }
}

#[async_trait]
impl IdentityProvider for CognitoClient {
    async fn initiate_auth(
        &self,
        credentials: &ProviderCredentials,
        request: InitiateAuthRequest,
    ) -> Result<AuthResponse, ProviderError> {
        self.call(credentials, "InitiateAuth", &request).await
    }

    async fn respond_to_auth_challenge(
        &self,
        credentials: &ProviderCredentials,
        request: RespondToAuthChallengeRequest,
    ) -> Result<AuthResponse, ProviderError> {
        self.call(credentials, "RespondToAuthChallenge", &request)
            .await
    }

    async fn get_user(
        &self,
        credentials: &ProviderCredentials,
        access_token: &str,
    ) -> Result<GetUserResponse, ProviderError> {
        let request = AccessTokenRequest {
            access_token: access_token.to_string(),
        };
        self.call(credentials, "GetUser", &request).await
    }

    async fn associate_software_token(
        &self,
        credentials: &ProviderCredentials,
        target: TokenTarget,
    ) -> Result<AssociateSoftwareTokenResponse, ProviderError> {
        let request = AssociateSoftwareTokenRequest::from(target);
        self.call(credentials, "AssociateSoftwareToken", &request)
            .await
    }

    async fn verify_software_token(
        &self,
        credentials: &ProviderCredentials,
        request: VerifySoftwareTokenRequest,
    ) -> Result<VerifySoftwareTokenResponse, ProviderError> {
        self.call(credentials, "VerifySoftwareToken", &request)
            .await
    }

    async fn set_software_token_preferred(
        &self,
        credentials: &ProviderCredentials,
        access_token: &str,
    ) -> Result<(), ProviderError> {
        let request = SetUserMfaPreferenceRequest {
            access_token: access_token.to_string(),
            software_token_mfa_settings: MfaOptionSettings {
                enabled: true,
                preferred_mfa: true,
            },
        };
        let _: IgnoredAny = self
            .call(credentials, "SetUserMFAPreference", &request)
            .await?;
        Ok(())
    }
}
