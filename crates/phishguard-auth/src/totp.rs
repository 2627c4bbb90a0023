//! Drift-tolerant TOTP matching.
//!
//! Client clocks are frequently skewed against the server and against the
//! provider's own (narrower) validation window, so codes are checked locally
//! across a wider window before they are forwarded. A code is accepted when
//! it equals the code for `server_time + k * step` for any
//! `k` in `[-skew_steps, skew_steps]`, or the code for a client-supplied
//! adjusted timestamp.
//!
//! The matcher is a pure function of secret and time and holds no state.

use totp_rs::{Algorithm, Secret, TOTP};

use crate::config::TotpConfig;

/// Errors produced while deriving codes.
#[derive(Debug, Clone, thiserror::Error)]
pub enum TotpError {
    /// The shared secret is not valid base32.
    #[error("Invalid TOTP secret: {0}")]
    InvalidSecret(String),
}

/// Generates and validates time-based one-time codes.
#[derive(Debug, Clone)]
pub struct TotpMatcher {
    digits: usize,
    step: u64,
    skew_steps: u8,
    issuer: String,
}

impl Default for TotpMatcher {
    fn default() -> Self {
        Self::new(&TotpConfig::default())
    }
}

impl TotpMatcher {
    /// Creates a matcher from configuration.
    #[must_use]
    pub fn new(config: &TotpConfig) -> Self {
        Self {
            digits: config.digits,
            step: config.step.as_secs().max(1),
            skew_steps: config.skew_steps,
            issuer: config.issuer.clone(),
        }
    }

    /// Number of digits per code.
    #[must_use]
    pub fn digits(&self) -> usize {
        self.digits
    }

    /// Returns the code for `secret` at the given Unix timestamp.
    ///
    /// # Errors
    ///
    /// Returns `TotpError::InvalidSecret` if the secret is not base32.
    pub fn code_at(&self, secret: &str, timestamp: u64) -> Result<String, TotpError> {
        Ok(self.totp(secret, "")?.generate(timestamp))
    }

    /// Returns `true` if `submitted` matches within the tolerance window
    /// around `server_time`, or exactly at `client_time` when given.
    ///
    /// Malformed codes and malformed secrets never match.
    #[must_use]
    pub fn is_valid(
        &self,
        secret: &str,
        submitted: &str,
        server_time: u64,
        client_time: Option<u64>,
    ) -> bool {
        self.matching_offset(secret, submitted, server_time, client_time)
            .is_some()
    }

    /// Like [`is_valid`](Self::is_valid) but reports which rule matched:
    /// `Some(Match::Window(k))` for a step offset, `Some(Match::ClientTime)`
    /// for the client-adjusted timestamp.
    #[must_use]
    pub fn matching_offset(
        &self,
        secret: &str,
        submitted: &str,
        server_time: u64,
        client_time: Option<u64>,
    ) -> Option<Match> {
        if !self.is_well_formed(submitted) {
            return None;
        }

        let totp = match self.totp(secret, "") {
            Ok(totp) => totp,
            Err(e) => {
                tracing::warn!(error = %e, "Rejecting code checked against malformed secret");
                return None;
            }
        };

        let skew = i64::from(self.skew_steps);
        for k in -skew..=skew {
            let Some(at) = self.window_time(server_time, k) else {
                continue;
            };
            if constant_time_eq(&totp.generate(at), submitted) {
                return Some(Match::Window(k));
            }
        }

        if let Some(client_time) = client_time
            && constant_time_eq(&totp.generate(client_time), submitted)
        {
            return Some(Match::ClientTime);
        }

        None
    }

    /// `server_time + k * step`, or `None` when it falls outside `u64`.
    fn window_time(&self, server_time: u64, k: i64) -> Option<u64> {
        let offset = self.step.checked_mul(k.unsigned_abs())?;
        if k < 0 {
            server_time.checked_sub(offset)
        } else {
            server_time.checked_add(offset)
        }
    }

    /// Returns `true` if `code` has the configured number of ASCII digits.
    #[must_use]
    pub fn is_well_formed(&self, code: &str) -> bool {
        code.len() == self.digits && code.bytes().all(|b| b.is_ascii_digit())
    }

    /// Builds the `otpauth://` provisioning URI for an authenticator app.
    ///
    /// The URI is meant for external QR rendering.
    ///
    /// # Errors
    ///
    /// Returns `TotpError::InvalidSecret` if the secret is not base32.
    pub fn provisioning_uri(&self, secret: &str, account: &str) -> Result<String, TotpError> {
        Ok(self.totp(secret, account)?.get_url())
    }

    fn totp(&self, secret: &str, account: &str) -> Result<TOTP, TotpError> {
        let normalized: String = secret
            .chars()
            .filter(|c| !c.is_whitespace() && *c != '=')
            .map(|c| c.to_ascii_uppercase())
            .collect();
        if normalized.is_empty() {
            return Err(TotpError::InvalidSecret("secret is empty".to_string()));
        }
        let bytes = Secret::Encoded(normalized)
            .to_bytes()
            .map_err(|e| TotpError::InvalidSecret(format!("{:?}", e)))?;

        Ok(TOTP::new_unchecked(
            Algorithm::SHA1,
            self.digits,
            0,
            self.step,
            bytes,
            Some(self.issuer.clone()),
            account.to_string(),
        ))
    }
}

/// Which acceptance rule matched a code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Match {
    /// Matched at `server_time + k * step`.
    Window(i64),
    /// Matched at the client-adjusted timestamp.
    ClientTime,
}

fn constant_time_eq(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.bytes().zip(b.bytes()).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

#[cfg(test)]
mod tests {
    use super::*;

    // RFC 6238 SHA1 seed "12345678901234567890" in base32.
    const RFC_SECRET: &str = "GEZDGNBVGY3TQOJQGEZDGNBVGY3TQOJQ";
    const SECRET: &str = "JBSWY3DPEHPK3PXPJBSWY3DPEHPK3PXP";
    // Aligned to a 30 second boundary.
    const T: u64 = 1_700_000_010;

    #[test]
    fn test_rfc6238_vectors() {
        let matcher = TotpMatcher::default();
        // RFC 6238 appendix B, truncated to 6 digits.
        assert_eq!(matcher.code_at(RFC_SECRET, 59).unwrap(), "287082");
        assert_eq!(matcher.code_at(RFC_SECRET, 1_111_111_109).unwrap(), "081804");
        assert_eq!(matcher.code_at(RFC_SECRET, 1_234_567_890).unwrap(), "005924");
        assert_eq!(matcher.code_at(RFC_SECRET, 2_000_000_000).unwrap(), "279037");
    }

    #[test]
    fn test_code_is_six_digits() {
        let matcher = TotpMatcher::default();
        let code = matcher.code_at(SECRET, T).unwrap();
        assert!(matcher.is_well_formed(&code));
    }

    #[test]
    fn test_accepts_within_tolerance() {
        let matcher = TotpMatcher::default();
        let code = matcher.code_at(SECRET, T).unwrap();

        assert!(matcher.is_valid(SECRET, &code, T, None));
        assert!(matcher.is_valid(SECRET, &code, T + 150, None));
        assert!(matcher.is_valid(SECRET, &code, T - 150, None));
        assert_eq!(
            matcher.matching_offset(SECRET, &code, T + 60, None),
            Some(Match::Window(-2))
        );
    }

    #[test]
    fn test_rejects_outside_tolerance() {
        let matcher = TotpMatcher::default();
        let code = matcher.code_at(SECRET, T).unwrap();

        assert!(!matcher.is_valid(SECRET, &code, T + 180, None));
        assert!(!matcher.is_valid(SECRET, &code, T - 180, None));
        assert!(!matcher.is_valid(SECRET, &code, T + 600, None));
    }

    #[test]
    fn test_independent_of_calendar_date() {
        let matcher = TotpMatcher::default();
        for base in [30_000_000u64, 946_684_800, 1_893_456_000, 4_102_444_800] {
            let code = matcher.code_at(SECRET, base).unwrap();
            assert!(matcher.is_valid(SECRET, &code, base + 120, None));
            assert!(!matcher.is_valid(SECRET, &code, base + 900, None));
        }
    }

    #[test]
    fn test_window_edges_do_not_overflow() {
        let matcher = TotpMatcher::new(&TotpConfig {
            step: std::time::Duration::from_secs(u64::MAX / 2),
            ..TotpConfig::default()
        });
        let late = u64::MAX - 10;
        let code = matcher.code_at(SECRET, late).unwrap();
        assert!(matcher.is_valid(SECRET, &code, late, None));

        let matcher = TotpMatcher::default();
        let code = matcher.code_at(SECRET, 0).unwrap();
        assert_eq!(
            matcher.matching_offset(SECRET, &code, 0, None),
            Some(Match::Window(0))
        );
        assert_eq!(matcher.window_time(10, -1), None);
        assert_eq!(matcher.window_time(u64::MAX, 1), None);
    }

    #[test]
    fn test_client_adjusted_time() {
        let matcher = TotpMatcher::default();
        let code = matcher.code_at(SECRET, T - 3600).unwrap();

        assert!(!matcher.is_valid(SECRET, &code, T, None));
        assert_eq!(
            matcher.matching_offset(SECRET, &code, T, Some(T - 3600)),
            Some(Match::ClientTime)
        );
    }

    #[test]
    fn test_rejects_malformed_codes() {
        let matcher = TotpMatcher::default();
        assert!(!matcher.is_valid(SECRET, "12345", T, None));
        assert!(!matcher.is_valid(SECRET, "1234567", T, None));
        assert!(!matcher.is_valid(SECRET, "12a456", T, None));
        assert!(!matcher.is_valid(SECRET, "", T, None));
    }

    #[test]
    fn test_malformed_secret() {
        let matcher = TotpMatcher::default();
        assert!(matcher.code_at("not base32!", T).is_err());
        assert!(matcher.code_at("", T).is_err());
        assert!(!matcher.is_valid("not base32!", "123456", T, None));
    }

    #[test]
    fn test_secret_normalization() {
        let matcher = TotpMatcher::default();
        let lower = SECRET.to_ascii_lowercase();
        assert_eq!(
            matcher.code_at(&lower, T).unwrap(),
            matcher.code_at(SECRET, T).unwrap()
        );
    }

    #[test]
    fn test_near_epoch_does_not_underflow() {
        let matcher = TotpMatcher::default();
        let code = matcher.code_at(SECRET, 0).unwrap();
        assert!(matcher.is_valid(SECRET, &code, 60, None));
    }

    #[test]
    fn test_provisioning_uri() {
        let matcher = TotpMatcher::default();
        let uri = matcher.provisioning_uri(SECRET, "alice").unwrap();
        assert!(uri.starts_with("otpauth://totp/PhishGuard:alice?"));
        assert!(uri.contains(&format!("secret={}", SECRET)));
        assert!(uri.contains("issuer=PhishGuard"));
    }
}
