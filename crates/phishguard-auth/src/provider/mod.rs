//! Identity provider boundary.
//!
//! [`IdentityProvider`] is the set of remote operations the challenge engine
//! consumes. [`CognitoClient`] implements it over the provider's JSON
//! protocol; tests substitute scripted implementations.
//!
//! Provider failures arrive as a [`ProviderError`] carrying the provider's
//! exception name. They are translated into [`AuthError`] at the engine
//! boundary and never travel further.

mod cognito;
pub mod types;

use async_trait::async_trait;

pub use cognito::CognitoClient;
pub use types::{
    AssociateSoftwareTokenResponse, AttributeType, AuthResponse, AuthenticationResult,
    GetUserResponse, InitiateAuthRequest, RespondToAuthChallengeRequest, TokenTarget,
    VerifySoftwareTokenRequest, VerifySoftwareTokenResponse,
};

use crate::error::AuthError;
use crate::org::ProviderCredentials;

/// Classified provider failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderErrorKind {
    NotAuthorized,
    UserNotFound,
    UserNotConfirmed,
    PasswordResetRequired,
    CodeMismatch,
    ExpiredCode,
    InvalidPassword,
    InvalidParameter,
    ResourceNotFound,
    InvalidConfiguration,
    Throttled,
    Internal,
    Timeout,
    Transport,
    Unknown,
}

impl ProviderErrorKind {
    /// Classifies a provider exception name such as `NotAuthorizedException`.
    ///
    /// Namespaced names (`prefix#Name`) are accepted.
    #[must_use]
    pub fn from_exception(name: &str) -> Self {
        let name = name.rsplit('#').next().unwrap_or(name);
        match name {
            "NotAuthorizedException" => Self::NotAuthorized,
            "UserNotFoundException" => Self::UserNotFound,
            "UserNotConfirmedException" => Self::UserNotConfirmed,
            "PasswordResetRequiredException" => Self::PasswordResetRequired,
            "CodeMismatchException" | "EnableSoftwareTokenMFAException" => Self::CodeMismatch,
            "ExpiredCodeException" => Self::ExpiredCode,
            "InvalidPasswordException" => Self::InvalidPassword,
            "InvalidParameterException" => Self::InvalidParameter,
            "ResourceNotFoundException" => Self::ResourceNotFound,
            "InvalidUserPoolConfigurationException"
            | "InvalidLambdaResponseException"
            | "SoftwareTokenMFANotFoundException" => Self::InvalidConfiguration,
            "TooManyRequestsException" | "LimitExceededException" => Self::Throttled,
            "InternalErrorException" => Self::Internal,
            _ => Self::Unknown,
        }
    }
}

/// Error returned by an [`IdentityProvider`] call.
#[derive(Debug, Clone, thiserror::Error)]
#[error("{code}: {message}")]
pub struct ProviderError {
    pub kind: ProviderErrorKind,
    /// Exception name as reported by the provider, or a local label.
    pub code: String,
    pub message: String,
}

impl ProviderError {
    /// Builds an error from a provider exception name and message.
    #[must_use]
    pub fn from_exception(name: &str, message: impl Into<String>) -> Self {
        let code = name.rsplit('#').next().unwrap_or(name).to_string();
        Self {
            kind: ProviderErrorKind::from_exception(&code),
            code,
            message: message.into(),
        }
    }

    #[must_use]
    pub fn timeout() -> Self {
        Self {
            kind: ProviderErrorKind::Timeout,
            code: "Timeout".to_string(),
            message: "provider call timed out".to_string(),
        }
    }

    #[must_use]
    pub fn transport(message: impl Into<String>) -> Self {
        Self {
            kind: ProviderErrorKind::Transport,
            code: "Transport".to_string(),
            message: message.into(),
        }
    }

    #[must_use]
    pub fn invalid_configuration(message: impl Into<String>) -> Self {
        Self {
            kind: ProviderErrorKind::InvalidConfiguration,
            code: "InvalidConfiguration".to_string(),
            message: message.into(),
        }
    }

    /// `InvalidParameterException` raised because the app client does not
    /// allow the requested flow, which only an operator can fix.
    #[must_use]
    pub fn is_client_misconfiguration(&self) -> bool {
        if self.kind != ProviderErrorKind::InvalidParameter {
            return false;
        }
        let message = self.message.to_ascii_lowercase();
        (message.contains("flow") || message.contains("client"))
            && (message.contains("not enabled") || message.contains("disabled"))
    }

    /// `NotAuthorizedException` raised for an invalid or expired session
    /// rather than for the credentials themselves.
    #[must_use]
    pub fn is_session_rejection(&self) -> bool {
        self.kind == ProviderErrorKind::NotAuthorized
            && self.message.to_ascii_lowercase().contains("session")
    }
}

impl From<ProviderError> for AuthError {
    fn from(err: ProviderError) -> Self {
        use ProviderErrorKind as Kind;

        if err.is_session_rejection() {
            return Self::ChallengeExpired;
        }
        if err.is_client_misconfiguration() {
            tracing::error!(code = %err.code, message = %err.message, "App client rejects auth flow");
            return Self::misconfigured(err.to_string());
        }
        match err.kind {
            Kind::NotAuthorized
            | Kind::UserNotFound
            | Kind::UserNotConfirmed
            | Kind::PasswordResetRequired => Self::invalid_credentials(err.to_string()),
            Kind::CodeMismatch => Self::CodeMismatch,
            Kind::ExpiredCode => Self::CodeExpired,
            Kind::InvalidPassword => Self::invalid_password(err.message),
            Kind::InvalidParameter => {
                tracing::warn!(code = %err.code, message = %err.message, "Provider rejected request parameters");
                Self::validation(INVALID_PARAMETERS)
            }
            Kind::ResourceNotFound | Kind::InvalidConfiguration => {
                Self::misconfigured(err.to_string())
            }
            Kind::Throttled | Kind::Internal | Kind::Timeout | Kind::Transport | Kind::Unknown => {
                Self::provider_unavailable(err.to_string())
            }
        }
    }
}

const INVALID_PARAMETERS: &str = "Invalid request parameters";

/// Remote operations of the managed identity provider.
///
/// Every call addresses the user pool and app client in `credentials`.
/// Implementations do not retry.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Starts an authentication flow (`USER_PASSWORD_AUTH`,
    /// `REFRESH_TOKEN_AUTH`).
    async fn initiate_auth(
        &self,
        credentials: &ProviderCredentials,
        request: InitiateAuthRequest,
    ) -> Result<AuthResponse, ProviderError>;

    /// Answers the challenge returned by a previous call.
    async fn respond_to_auth_challenge(
        &self,
        credentials: &ProviderCredentials,
        request: RespondToAuthChallengeRequest,
    ) -> Result<AuthResponse, ProviderError>;

    /// Looks up the user owning `access_token`.
    async fn get_user(
        &self,
        credentials: &ProviderCredentials,
        access_token: &str,
    ) -> Result<GetUserResponse, ProviderError>;

    /// Creates a new software token secret.
    async fn associate_software_token(
        &self,
        credentials: &ProviderCredentials,
        target: TokenTarget,
    ) -> Result<AssociateSoftwareTokenResponse, ProviderError>;

    /// Verifies a code against the pending software token secret.
    async fn verify_software_token(
        &self,
        credentials: &ProviderCredentials,
        request: VerifySoftwareTokenRequest,
    ) -> Result<VerifySoftwareTokenResponse, ProviderError>;

    /// Enables software token MFA for the user and marks it preferred.
    async fn set_software_token_preferred(
        &self,
        credentials: &ProviderCredentials,
        access_token: &str,
    ) -> Result<(), ProviderError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exception_classification() {
        assert_eq!(
            ProviderErrorKind::from_exception("NotAuthorizedException"),
            ProviderErrorKind::NotAuthorized
        );
        assert_eq!(
            ProviderErrorKind::from_exception("com.amazonaws.cognito#CodeMismatchException"),
            ProviderErrorKind::CodeMismatch
        );
        assert_eq!(
            ProviderErrorKind::from_exception("SomethingNewException"),
            ProviderErrorKind::Unknown
        );
    }

    #[test]
    fn test_credential_failures_collapse() {
        let wrong_password = ProviderError::from_exception(
            "NotAuthorizedException",
            "Incorrect username or password.",
        );
        let no_user = ProviderError::from_exception("UserNotFoundException", "User does not exist.");

        let a = AuthError::from(wrong_password);
        let b = AuthError::from(no_user);
        assert!(matches!(a, AuthError::InvalidCredentials { .. }));
        assert!(matches!(b, AuthError::InvalidCredentials { .. }));
        assert_eq!(a.public_message(), b.public_message());
        assert_eq!(a.error_code(), b.error_code());
    }

    #[test]
    fn test_session_rejection_is_challenge_expired() {
        let err = ProviderError::from_exception("NotAuthorizedException", "Invalid session for the user, session is expired.");
        assert!(matches!(AuthError::from(err), AuthError::ChallengeExpired));
    }

    #[test]
    fn test_invalid_parameter_detail_stays_internal() {
        let err = AuthError::from(ProviderError::from_exception(
            "InvalidParameterException",
            "1 validation error detected: Value at 'userName' failed to satisfy constraint",
        ));
        assert_eq!(err.error_code(), "validation_error");
        assert_eq!(err.public_message(), "Invalid request parameters");
    }

    #[test]
    fn test_disabled_flow_is_misconfigured() {
        let err = ProviderError::from_exception(
            "InvalidParameterException",
            "USER_PASSWORD_AUTH flow not enabled for this client",
        );
        assert!(err.is_client_misconfiguration());

        let err = AuthError::from(err);
        assert!(matches!(err, AuthError::Misconfigured { .. }));
        assert!(!err.public_message().contains("USER_PASSWORD_AUTH"));
    }

    #[test]
    fn test_translation_table() {
        let cases = [
            ("CodeMismatchException", "code_mismatch"),
            ("EnableSoftwareTokenMFAException", "code_mismatch"),
            ("ExpiredCodeException", "code_expired"),
            ("InvalidPasswordException", "invalid_password"),
            ("InvalidParameterException", "validation_error"),
            ("ResourceNotFoundException", "misconfigured"),
            ("InvalidUserPoolConfigurationException", "misconfigured"),
            ("TooManyRequestsException", "provider_unavailable"),
            ("InternalErrorException", "provider_unavailable"),
            ("UserNotConfirmedException", "invalid_credentials"),
            ("PasswordResetRequiredException", "invalid_credentials"),
            ("Unheard", "provider_unavailable"),
        ];
        for (exception, code) in cases {
            let err = AuthError::from(ProviderError::from_exception(exception, "detail"));
            assert_eq!(err.error_code(), code, "{}", exception);
        }

        assert!(AuthError::from(ProviderError::timeout()).is_retryable());
        assert!(AuthError::from(ProviderError::transport("reset")).is_retryable());
    }
}
