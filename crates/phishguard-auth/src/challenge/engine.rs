//! The login state machine.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use super::types::{AuthOutcome, ChallengeResponses, ChallengeState, MfaSetup, Session, TokenSet, UserProfile};
use crate::clock::Clock;
use crate::config::AuthConfig;
use crate::error::AuthError;
use crate::org::{OrgConfigResolver, ProviderCredentials};
use crate::provider::{
    AuthResponse, IdentityProvider, InitiateAuthRequest, ProviderError,
    RespondToAuthChallengeRequest, TokenTarget, VerifySoftwareTokenRequest,
};
use crate::secret_hash;
use crate::totp::{Match, TotpMatcher};

const USER_PASSWORD_AUTH: &str = "USER_PASSWORD_AUTH";
const REFRESH_TOKEN_AUTH: &str = "REFRESH_TOKEN_AUTH";

/// Drives login, challenge and MFA enrollment against the identity provider.
///
/// Every operation first resolves the organization's provider credentials,
/// signs the request with the secret hash and wraps the provider call in the
/// configured timeout. Provider errors are translated into [`AuthError`]
/// here.
pub struct ChallengeEngine {
    provider: Arc<dyn IdentityProvider>,
    orgs: Arc<dyn OrgConfigResolver>,
    clock: Arc<dyn Clock>,
    matcher: TotpMatcher,
    request_timeout: Duration,
    session_ttl: Duration,
}

impl ChallengeEngine {
    /// Creates an engine.
    #[must_use]
    pub fn new(
        config: &AuthConfig,
        provider: Arc<dyn IdentityProvider>,
        orgs: Arc<dyn OrgConfigResolver>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            provider,
            orgs,
            clock,
            matcher: TotpMatcher::new(&config.totp),
            request_timeout: config.provider.request_timeout,
            session_ttl: config.provider.session_ttl,
        }
    }

    /// Starts a password login.
    ///
    /// # Errors
    ///
    /// Returns `Validation` for empty input, `InvalidCredentials` for any
    /// rejected username/password pair, and `Misconfigured` or
    /// `ProviderUnavailable` for operator and infrastructure failures.
    pub async fn start_login(
        &self,
        org_id: &str,
        username: &str,
        password: &str,
    ) -> Result<AuthOutcome, AuthError> {
        require("username", username)?;
        require("password", password)?;

        let credentials = self.orgs.credentials(org_id).await?;
        let hash = secret_hash::sign(username, &credentials.client_id, &credentials.client_secret)?;

        let request = InitiateAuthRequest {
            auth_flow: USER_PASSWORD_AUTH.to_string(),
            client_id: credentials.client_id.clone(),
            auth_parameters: HashMap::from([
                ("USERNAME".to_string(), username.to_string()),
                ("PASSWORD".to_string(), password.to_string()),
                ("SECRET_HASH".to_string(), hash),
            ]),
        };

        let response = self
            .call(
                "InitiateAuth",
                org_id,
                self.provider.initiate_auth(&credentials, request),
            )
            .await?;

        let outcome = self.outcome(response, username, &credentials)?;
        log_outcome(org_id, username, &outcome);
        Ok(outcome)
    }

    /// Answers the challenge `session` is waiting on.
    ///
    /// `state` must equal the session's challenge. Expired sessions are
    /// rejected before any provider call.
    ///
    /// # Errors
    ///
    /// Returns `Validation` for missing or malformed responses,
    /// `ChallengeExpired` for expired sessions, `CodeMismatch` or
    /// `CodeExpired` for rejected codes and `InvalidPassword` for a new
    /// password the provider's policy rejects.
    pub async fn respond_to_challenge(
        &self,
        org_id: &str,
        session: &Session,
        state: ChallengeState,
        responses: &ChallengeResponses,
    ) -> Result<AuthOutcome, AuthError> {
        if state != session.challenge {
            return Err(AuthError::validation(format!(
                "session is waiting on {}, not {}",
                session.challenge, state
            )));
        }
        if !state.accepts_responses() {
            return Err(AuthError::validation(format!("{} takes no responses", state)));
        }
        self.ensure_live(session)?;

        let credentials = self.orgs.credentials(org_id).await?;
        self.ensure_sealed(session, &credentials)?;
        let username = session.username.as_str();
        let hash = secret_hash::sign(username, &credentials.client_id, &credentials.client_secret)?;

        let mut challenge_responses = HashMap::from([
            ("USERNAME".to_string(), username.to_string()),
            ("SECRET_HASH".to_string(), hash),
        ]);
        let mut provider_session = session.token.clone();

        match state {
            ChallengeState::NewPasswordRequired => {
                let new_password = responses
                    .new_password
                    .as_deref()
                    .filter(|p| !p.is_empty())
                    .ok_or_else(|| AuthError::validation("new_password is required"))?;
                challenge_responses.insert("NEW_PASSWORD".to_string(), new_password.to_string());
                for (name, value) in &responses.attributes {
                    challenge_responses.insert(format!("userAttributes.{}", name), value.clone());
                }
            }
            ChallengeState::SoftwareTokenMfa => {
                let code = self.checked_code(responses)?;
                challenge_responses.insert("SOFTWARE_TOKEN_MFA_CODE".to_string(), code.to_string());
            }
            ChallengeState::MfaSetup => {
                let code = self.checked_code(responses)?;
                let request = VerifySoftwareTokenRequest::new(
                    TokenTarget::Session(provider_session.clone()),
                    code,
                )
                .with_friendly_name(responses.friendly_name.clone());

                let verified = self
                    .call(
                        "VerifySoftwareToken",
                        org_id,
                        self.provider.verify_software_token(&credentials, request),
                    )
                    .await?;
                if !verified.is_success() {
                    tracing::debug!(org_id = %org_id, "Software token verification not successful");
                    return Err(AuthError::CodeMismatch);
                }
                if let Some(next) = verified.session {
                    provider_session = next;
                }
            }
            ChallengeState::Password | ChallengeState::Complete => {
                return Err(AuthError::internal("state takes no responses"));
            }
        }

        let request = RespondToAuthChallengeRequest {
            client_id: credentials.client_id.clone(),
            challenge_name: state.as_str().to_string(),
            session: Some(provider_session),
            challenge_responses,
        };
        let response = self
            .call(
                "RespondToAuthChallenge",
                org_id,
                self.provider.respond_to_auth_challenge(&credentials, request),
            )
            .await?;

        let outcome = self.outcome(response, username, &credentials)?;
        log_outcome(org_id, username, &outcome);
        Ok(outcome)
    }

    /// Starts authenticator enrollment for a signed-in user.
    ///
    /// # Errors
    ///
    /// Returns `Validation` for an empty token and `InvalidCredentials` if
    /// the provider rejects it.
    pub async fn setup_mfa(&self, org_id: &str, access_token: &str) -> Result<MfaSetup, AuthError> {
        require("access_token", access_token)?;
        let credentials = self.orgs.credentials(org_id).await?;

        let user = self
            .call(
                "GetUser",
                org_id,
                self.provider.get_user(&credentials, access_token),
            )
            .await?;
        let associated = self
            .call(
                "AssociateSoftwareToken",
                org_id,
                self.provider.associate_software_token(
                    &credentials,
                    TokenTarget::AccessToken(access_token.to_string()),
                ),
            )
            .await?;

        let secret = associated
            .secret_code
            .ok_or_else(|| AuthError::internal("provider returned no secret code"))?;
        let provisioning_uri = self.provisioning_uri(&secret, &user.username)?;

        tracing::info!(org_id = %org_id, username = %user.username, "Started authenticator enrollment");
        Ok(MfaSetup {
            secret,
            provisioning_uri,
            session: None,
        })
    }

    /// Starts authenticator enrollment in the middle of a login that is
    /// waiting on `MFA_SETUP`. Returns the secret and the updated session to
    /// answer the challenge with.
    ///
    /// # Errors
    ///
    /// Returns `Validation` if the session is not waiting on `MFA_SETUP` and
    /// `ChallengeExpired` if it expired.
    pub async fn setup_mfa_for_session(
        &self,
        org_id: &str,
        session: &Session,
    ) -> Result<MfaSetup, AuthError> {
        if session.challenge != ChallengeState::MfaSetup {
            return Err(AuthError::validation(format!(
                "session is waiting on {}, not {}",
                session.challenge,
                ChallengeState::MfaSetup
            )));
        }
        self.ensure_live(session)?;
        let credentials = self.orgs.credentials(org_id).await?;
        self.ensure_sealed(session, &credentials)?;

        let associated = self
            .call(
                "AssociateSoftwareToken",
                org_id,
                self.provider.associate_software_token(
                    &credentials,
                    TokenTarget::Session(session.token.clone()),
                ),
            )
            .await?;

        let secret = associated
            .secret_code
            .ok_or_else(|| AuthError::internal("provider returned no secret code"))?;
        let provisioning_uri = self.provisioning_uri(&secret, &session.username)?;

        let mut next = Session {
            token: associated.session.unwrap_or_else(|| session.token.clone()),
            challenge: ChallengeState::MfaSetup,
            username: session.username.clone(),
            expires_at: self.session_expiry(),
            parameters: session.parameters.clone(),
            seal: String::new(),
        };
        next.seal_with(&credentials.client_secret)?;

        tracing::info!(org_id = %org_id, username = %session.username, "Started authenticator enrollment during login");
        Ok(MfaSetup {
            secret,
            provisioning_uri,
            session: Some(next),
        })
    }

    /// Completes enrollment for a signed-in user and makes the authenticator
    /// the preferred MFA method.
    ///
    /// # Errors
    ///
    /// Returns `Validation` for a malformed code and `CodeMismatch` if the
    /// code is rejected locally or by the provider.
    pub async fn confirm_mfa_setup(
        &self,
        org_id: &str,
        access_token: &str,
        responses: &ChallengeResponses,
    ) -> Result<(), AuthError> {
        require("access_token", access_token)?;
        let code = self.checked_code(responses)?;
        let credentials = self.orgs.credentials(org_id).await?;

        let request =
            VerifySoftwareTokenRequest::new(TokenTarget::AccessToken(access_token.to_string()), code)
                .with_friendly_name(responses.friendly_name.clone());
        let verified = self
            .call(
                "VerifySoftwareToken",
                org_id,
                self.provider.verify_software_token(&credentials, request),
            )
            .await?;
        if !verified.is_success() {
            return Err(AuthError::CodeMismatch);
        }

        self.call(
            "SetUserMFAPreference",
            org_id,
            self.provider
                .set_software_token_preferred(&credentials, access_token),
        )
        .await?;

        tracing::info!(org_id = %org_id, "Authenticator enrolled and preferred");
        Ok(())
    }

    /// Exchanges a refresh token for new id and access tokens.
    ///
    /// # Errors
    ///
    /// Returns `InvalidCredentials` for revoked or expired refresh tokens.
    pub async fn refresh_session(
        &self,
        org_id: &str,
        username: &str,
        refresh_token: &str,
    ) -> Result<TokenSet, AuthError> {
        require("username", username)?;
        require("refresh_token", refresh_token)?;

        let credentials = self.orgs.credentials(org_id).await?;
        let hash = secret_hash::sign(username, &credentials.client_id, &credentials.client_secret)?;

        let request = InitiateAuthRequest {
            auth_flow: REFRESH_TOKEN_AUTH.to_string(),
            client_id: credentials.client_id.clone(),
            auth_parameters: HashMap::from([
                ("REFRESH_TOKEN".to_string(), refresh_token.to_string()),
                ("SECRET_HASH".to_string(), hash),
            ]),
        };
        let response = self
            .call(
                "InitiateAuth",
                org_id,
                self.provider.initiate_auth(&credentials, request),
            )
            .await?;

        match self.outcome(response, username, &credentials)? {
            AuthOutcome::Authenticated(tokens) => {
                tracing::info!(org_id = %org_id, username = %username, "Refreshed tokens");
                Ok(tokens)
            }
            AuthOutcome::Challenge(session) => Err(AuthError::internal(format!(
                "unexpected {} challenge during refresh",
                session.challenge
            ))),
        }
    }

    /// Looks up the user owning `access_token`.
    ///
    /// # Errors
    ///
    /// Returns `InvalidCredentials` if the provider rejects the token.
    pub async fn fetch_user(&self, org_id: &str, access_token: &str) -> Result<UserProfile, AuthError> {
        require("access_token", access_token)?;
        let credentials = self.orgs.credentials(org_id).await?;

        let user = self
            .call(
                "GetUser",
                org_id,
                self.provider.get_user(&credentials, access_token),
            )
            .await?;

        Ok(UserProfile {
            username: user.username,
            attributes: user
                .user_attributes
                .into_iter()
                .filter_map(|attr| attr.value.map(|value| (attr.name, value)))
                .collect(),
            preferred_mfa: user.preferred_mfa_setting,
            mfa_methods: user.user_mfa_setting_list,
        })
    }

    /// Credentials the engine would use for `org_id`.
    ///
    /// # Errors
    ///
    /// Returns `Misconfigured` for unknown or incomplete organizations.
    pub async fn credentials(&self, org_id: &str) -> Result<ProviderCredentials, AuthError> {
        self.orgs.credentials(org_id).await
    }

    async fn call<T, F>(&self, operation: &'static str, org_id: &str, call: F) -> Result<T, AuthError>
    where
        F: Future<Output = Result<T, ProviderError>>,
    {
        let result = match tokio::time::timeout(self.request_timeout, call).await {
            Ok(result) => result,
            Err(_) => Err(ProviderError::timeout()),
        };

        result.map_err(|err| {
            tracing::warn!(
                operation = %operation,
                org_id = %org_id,
                code = %err.code,
                kind = ?err.kind,
                "Identity provider rejected request"
            );
            AuthError::from(err)
        })
    }

    fn outcome(
        &self,
        response: AuthResponse,
        username: &str,
        credentials: &ProviderCredentials,
    ) -> Result<AuthOutcome, AuthError> {
        if let Some(result) = response.authentication_result {
            let id_token = result
                .id_token
                .ok_or_else(|| AuthError::internal("provider returned no id token"))?;
            let access_token = result
                .access_token
                .ok_or_else(|| AuthError::internal("provider returned no access token"))?;
            return Ok(AuthOutcome::Authenticated(TokenSet {
                id_token,
                access_token,
                refresh_token: result.refresh_token,
                token_type: result.token_type.unwrap_or_else(|| "Bearer".to_string()),
                expires_in: result.expires_in.unwrap_or(3600),
            }));
        }

        let name = response
            .challenge_name
            .ok_or_else(|| AuthError::internal("provider returned neither tokens nor a challenge"))?;
        let challenge = ChallengeState::from_provider(&name).inspect_err(|_| {
            tracing::error!(challenge = %name, "Provider requires an unsupported challenge");
        })?;
        let token = response
            .session
            .ok_or_else(|| AuthError::internal(format!("provider returned {} without a session", name)))?;

        // Alias sign-ins report the canonical username, which later
        // SECRET_HASH values must be computed over.
        let username = response
            .challenge_parameters
            .get("USERNAME")
            .filter(|name| !name.is_empty())
            .map_or(username, String::as_str)
            .to_string();

        let mut session = Session {
            token,
            challenge,
            username,
            expires_at: self.session_expiry(),
            parameters: response.challenge_parameters,
            seal: String::new(),
        };
        session.seal_with(&credentials.client_secret)?;
        Ok(AuthOutcome::Challenge(session))
    }

    /// Validates the submitted code and, when the secret is known, matches
    /// it locally across the drift window.
    fn checked_code<'a>(&self, responses: &'a ChallengeResponses) -> Result<&'a str, AuthError> {
        let code = responses
            .code
            .as_deref()
            .map(str::trim)
            .ok_or_else(|| AuthError::validation("code is required"))?;
        if !self.matcher.is_well_formed(code) {
            return Err(AuthError::validation(format!(
                "code must be {} digits",
                self.matcher.digits()
            )));
        }

        if let Some(secret) = responses.totp_secret.as_deref() {
            let server_time = u64::try_from(self.clock.unix_timestamp()).unwrap_or(0);
            let client_time = responses.client_time.and_then(|t| u64::try_from(t).ok());
            match self.matcher.matching_offset(secret, code, server_time, client_time) {
                Some(Match::Window(offset)) => {
                    tracing::debug!(offset, "Code matched within drift window");
                }
                Some(Match::ClientTime) => {
                    tracing::debug!("Code matched at client-adjusted time");
                }
                None => return Err(AuthError::CodeMismatch),
            }
        }

        Ok(code)
    }

    fn provisioning_uri(&self, secret: &str, account: &str) -> Result<String, AuthError> {
        self.matcher
            .provisioning_uri(secret, account)
            .map_err(|e| AuthError::internal(e.to_string()))
    }

    fn ensure_live(&self, session: &Session) -> Result<(), AuthError> {
        if session.is_expired(self.clock.unix_timestamp()) {
            tracing::debug!(username = %session.username, "Challenge session expired locally");
            return Err(AuthError::ChallengeExpired);
        }
        Ok(())
    }

    fn ensure_sealed(
        &self,
        session: &Session,
        credentials: &ProviderCredentials,
    ) -> Result<(), AuthError> {
        if !session.has_valid_seal(&credentials.client_secret) {
            tracing::warn!(username = %session.username, "Rejecting altered challenge session");
            return Err(AuthError::ChallengeExpired);
        }
        Ok(())
    }

    fn session_expiry(&self) -> i64 {
        let ttl = i64::try_from(self.session_ttl.as_secs()).unwrap_or(i64::MAX);
        self.clock.unix_timestamp().saturating_add(ttl)
    }
}

fn require(field: &str, value: &str) -> Result<(), AuthError> {
    if value.trim().is_empty() {
        return Err(AuthError::validation(format!("{} is required", field)));
    }
    Ok(())
}

fn log_outcome(org_id: &str, username: &str, outcome: &AuthOutcome) {
    match outcome {
        AuthOutcome::Authenticated(_) => {
            tracing::info!(org_id = %org_id, username = %username, "Login completed");
        }
        AuthOutcome::Challenge(session) => {
            tracing::info!(
                org_id = %org_id,
                username = %username,
                challenge = %session.challenge,
                "Login requires challenge"
            );
        }
    }
}
