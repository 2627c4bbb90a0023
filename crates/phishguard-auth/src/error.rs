//! Authentication and authorization error types.
//!
//! Every operation of the crate fails with an [`AuthError`]. Provider, key
//! cache and configuration errors are translated into this taxonomy at the
//! challenge engine and token verifier boundary, so callers never see a
//! provider-specific type.
//!
//! Variants carry internal diagnostic detail in `message`. That detail is
//! meant for logs; callers facing end users should render
//! [`AuthError::public_message`] instead, which is deliberately generic for
//! credential and token failures.

use std::fmt;

use crate::config::ConfigError;

/// Errors that can occur during authentication and authorization operations.
#[derive(Debug, Clone, thiserror::Error)]
pub enum AuthError {
    /// A required input is missing or malformed.
    #[error("Validation error: {message}")]
    Validation {
        /// Description of the invalid input.
        message: String,
    },

    /// Wrong password, unknown user or otherwise rejected credentials.
    ///
    /// Every underlying cause collapses into this one variant so that the
    /// outcome is identical whether the account exists or not.
    #[error("Invalid credentials: {message}")]
    InvalidCredentials {
        /// Internal description of the rejection cause.
        message: String,
    },

    /// The challenge session expired or was rejected by the provider.
    #[error("Challenge session expired")]
    ChallengeExpired,

    /// The submitted one-time code does not match.
    #[error("Verification code mismatch")]
    CodeMismatch,

    /// The submitted one-time code has expired.
    #[error("Verification code expired")]
    CodeExpired,

    /// The new password violates the provider's password policy.
    #[error("Invalid password: {message}")]
    InvalidPassword {
        /// Policy violation reported by the provider.
        message: String,
    },

    /// Required provider identifiers are missing or wrong.
    #[error("Misconfigured: {message}")]
    Misconfigured {
        /// Description of the configuration problem.
        message: String,
    },

    /// The identity provider could not be reached or failed transiently.
    #[error("Provider unavailable: {message}")]
    ProviderUnavailable {
        /// Description of the infrastructure failure.
        message: String,
    },

    /// The provider answered with a challenge this crate does not support.
    #[error("Unsupported challenge: {name}")]
    UnsupportedChallenge {
        /// Challenge name as reported by the provider.
        name: String,
    },

    /// The bearer token is malformed or its signature or claims are invalid.
    #[error("Invalid token: {message}")]
    TokenInvalid {
        /// Description of why the token is invalid.
        message: String,
    },

    /// The bearer token has expired.
    #[error("Token expired")]
    TokenExpired,

    /// The token's key id is absent from the provider's key set.
    #[error("Unknown signing key: {kid}")]
    UnknownKey {
        /// The key id from the token header.
        kid: String,
    },

    /// No organization could be resolved for a caller that requires one.
    #[error("Organization context is missing")]
    MissingOrg,

    /// The authenticated principal lacks the required permission.
    #[error("Forbidden: {message}")]
    Forbidden {
        /// Description of the missing permission.
        message: String,
    },

    /// An unexpected internal error occurred.
    #[error("Internal error: {message}")]
    Internal {
        /// Description of the internal error.
        message: String,
    },
}

impl AuthError {
    /// Creates a new `Validation` error.
    #[must_use]
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    /// Creates a new `InvalidCredentials` error.
    #[must_use]
    pub fn invalid_credentials(message: impl Into<String>) -> Self {
        Self::InvalidCredentials {
            message: message.into(),
        }
    }

    /// Creates a new `InvalidPassword` error.
    #[must_use]
    pub fn invalid_password(message: impl Into<String>) -> Self {
        Self::InvalidPassword {
            message: message.into(),
        }
    }

    /// Creates a new `Misconfigured` error.
    #[must_use]
    pub fn misconfigured(message: impl Into<String>) -> Self {
        Self::Misconfigured {
            message: message.into(),
        }
    }

    /// Creates a new `ProviderUnavailable` error.
    #[must_use]
    pub fn provider_unavailable(message: impl Into<String>) -> Self {
        Self::ProviderUnavailable {
            message: message.into(),
        }
    }

    /// Creates a new `UnsupportedChallenge` error.
    #[must_use]
    pub fn unsupported_challenge(name: impl Into<String>) -> Self {
        Self::UnsupportedChallenge { name: name.into() }
    }

    /// Creates a new `TokenInvalid` error.
    #[must_use]
    pub fn token_invalid(message: impl Into<String>) -> Self {
        Self::TokenInvalid {
            message: message.into(),
        }
    }

    /// Creates a new `UnknownKey` error.
    #[must_use]
    pub fn unknown_key(kid: impl Into<String>) -> Self {
        Self::UnknownKey { kid: kid.into() }
    }

    /// Creates a new `Forbidden` error.
    #[must_use]
    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::Forbidden {
            message: message.into(),
        }
    }

    /// Creates a new `Internal` error.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Returns `true` if the failure is transient and the caller may retry
    /// the same request unchanged.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::ProviderUnavailable { .. })
    }

    /// Returns `true` if the user can fix the failure by submitting new input
    /// (another code or another password) within the same flow.
    #[must_use]
    pub fn is_user_retryable(&self) -> bool {
        matches!(
            self,
            Self::CodeMismatch | Self::CodeExpired | Self::InvalidPassword { .. }
        )
    }

    /// Returns `true` if this is a client error (4xx category).
    #[must_use]
    pub fn is_client_error(&self) -> bool {
        !self.is_server_error()
    }

    /// Returns `true` if this is a server error (5xx category).
    #[must_use]
    pub fn is_server_error(&self) -> bool {
        matches!(
            self,
            Self::Misconfigured { .. }
                | Self::ProviderUnavailable { .. }
                | Self::UnsupportedChallenge { .. }
                | Self::Internal { .. }
        )
    }

    /// Returns `true` if this is a verification-time token error.
    #[must_use]
    pub fn is_token_error(&self) -> bool {
        matches!(
            self,
            Self::TokenInvalid { .. } | Self::TokenExpired | Self::UnknownKey { .. }
        )
    }

    /// Returns the error category for logging/monitoring purposes.
    #[must_use]
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::Validation { .. } | Self::MissingOrg => ErrorCategory::Validation,
            Self::InvalidCredentials { .. } | Self::ChallengeExpired => {
                ErrorCategory::Authentication
            }
            Self::CodeMismatch | Self::CodeExpired | Self::InvalidPassword { .. } => {
                ErrorCategory::Challenge
            }
            Self::Misconfigured { .. } => ErrorCategory::Configuration,
            Self::ProviderUnavailable { .. } => ErrorCategory::Infrastructure,
            Self::TokenInvalid { .. } | Self::TokenExpired | Self::UnknownKey { .. } => {
                ErrorCategory::Token
            }
            Self::Forbidden { .. } => ErrorCategory::Authorization,
            Self::UnsupportedChallenge { .. } | Self::Internal { .. } => ErrorCategory::Internal,
        }
    }

    /// Returns a stable machine-readable code for this error.
    #[must_use]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Validation { .. } => "validation_error",
            Self::InvalidCredentials { .. } => "invalid_credentials",
            Self::ChallengeExpired => "challenge_expired",
            Self::CodeMismatch => "code_mismatch",
            Self::CodeExpired => "code_expired",
            Self::InvalidPassword { .. } => "invalid_password",
            Self::Misconfigured { .. } => "misconfigured",
            Self::ProviderUnavailable { .. } => "provider_unavailable",
            Self::UnsupportedChallenge { .. } => "unsupported_challenge",
            Self::TokenInvalid { .. } => "token_invalid",
            Self::TokenExpired => "token_expired",
            Self::UnknownKey { .. } => "unknown_key",
            Self::MissingOrg => "missing_org",
            Self::Forbidden { .. } => "forbidden",
            Self::Internal { .. } => "internal_error",
        }
    }

    /// Returns the message that may be shown to end users.
    ///
    /// Credential, token and infrastructure failures get fixed text so that
    /// nothing about accounts, keys or internal state leaks.
    #[must_use]
    pub fn public_message(&self) -> String {
        match self {
            Self::Validation { message } => message.clone(),
            Self::InvalidCredentials { .. } => "Incorrect username or password".to_string(),
            Self::ChallengeExpired => {
                "Authentication session expired, please sign in again".to_string()
            }
            Self::CodeMismatch => "Invalid verification code".to_string(),
            Self::CodeExpired => "Verification code expired".to_string(),
            Self::InvalidPassword { message } => message.clone(),
            Self::Misconfigured { .. } => {
                "Authentication is not configured for this organization".to_string()
            }
            Self::ProviderUnavailable { .. } => {
                "Authentication service temporarily unavailable".to_string()
            }
            Self::TokenInvalid { .. } | Self::UnknownKey { .. } => "Invalid token".to_string(),
            Self::TokenExpired => "Token expired".to_string(),
            Self::MissingOrg => "Organization context required".to_string(),
            Self::Forbidden { .. } => "Insufficient permissions".to_string(),
            Self::UnsupportedChallenge { .. } | Self::Internal { .. } => {
                "Internal error".to_string()
            }
        }
    }
}

impl From<ConfigError> for AuthError {
    fn from(err: ConfigError) -> Self {
        Self::misconfigured(err.to_string())
    }
}

/// Categories of authentication/authorization errors for logging and monitoring.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    /// Missing or malformed client input.
    Validation,
    /// Credential verification failures.
    Authentication,
    /// User-retryable challenge failures (codes, password policy).
    Challenge,
    /// Token verification failures.
    Token,
    /// Permission checks.
    Authorization,
    /// Operator-actionable configuration problems.
    Configuration,
    /// Transient provider or network failures.
    Infrastructure,
    /// Internal errors.
    Internal,
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Validation => write!(f, "validation"),
            Self::Authentication => write!(f, "authentication"),
            Self::Challenge => write!(f, "challenge"),
            Self::Token => write!(f, "token"),
            Self::Authorization => write!(f, "authorization"),
            Self::Configuration => write!(f, "configuration"),
            Self::Infrastructure => write!(f, "infrastructure"),
            Self::Internal => write!(f, "internal"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = AuthError::invalid_credentials("user not found");
        assert_eq!(err.to_string(), "Invalid credentials: user not found");

        let err = AuthError::unknown_key("kid-1");
        assert_eq!(err.to_string(), "Unknown signing key: kid-1");

        let err = AuthError::TokenExpired;
        assert_eq!(err.to_string(), "Token expired");
    }

    #[test]
    fn test_public_message_hides_credential_detail() {
        let wrong_password = AuthError::invalid_credentials("Incorrect password for alice");
        let no_user = AuthError::invalid_credentials("User does not exist");
        assert_eq!(wrong_password.public_message(), no_user.public_message());
        assert!(!wrong_password.public_message().contains("alice"));

        let err = AuthError::unknown_key("kid-secret");
        assert!(!err.public_message().contains("kid-secret"));
    }

    #[test]
    fn test_error_predicates() {
        let err = AuthError::provider_unavailable("timeout");
        assert!(err.is_retryable());
        assert!(err.is_server_error());
        assert!(!err.is_client_error());

        assert!(AuthError::CodeMismatch.is_user_retryable());
        assert!(!AuthError::CodeMismatch.is_retryable());

        let err = AuthError::misconfigured("missing client_id");
        assert!(!err.is_retryable());
        assert!(err.is_server_error());

        assert!(AuthError::TokenExpired.is_token_error());
        assert!(AuthError::unknown_key("k").is_token_error());
        assert!(!AuthError::MissingOrg.is_token_error());
    }

    #[test]
    fn test_error_category() {
        assert_eq!(
            AuthError::invalid_credentials("x").category(),
            ErrorCategory::Authentication
        );
        assert_eq!(AuthError::CodeExpired.category(), ErrorCategory::Challenge);
        assert_eq!(AuthError::TokenExpired.category(), ErrorCategory::Token);
        assert_eq!(
            AuthError::misconfigured("x").category(),
            ErrorCategory::Configuration
        );
        assert_eq!(
            AuthError::provider_unavailable("x").category(),
            ErrorCategory::Infrastructure
        );
        assert_eq!(
            AuthError::forbidden("x").category(),
            ErrorCategory::Authorization
        );
    }

    #[test]
    fn test_config_error_becomes_misconfigured() {
        let err: AuthError = ConfigError::Missing("client_secret".to_string()).into();
        assert!(matches!(err, AuthError::Misconfigured { .. }));
        assert_eq!(err.error_code(), "misconfigured");
    }

    #[test]
    fn test_error_category_display() {
        assert_eq!(ErrorCategory::Authentication.to_string(), "authentication");
        assert_eq!(ErrorCategory::Challenge.to_string(), "challenge");
        assert_eq!(ErrorCategory::Infrastructure.to_string(), "infrastructure");
    }
}
