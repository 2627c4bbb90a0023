//! Secret hash signing for provider calls.
//!
//! App clients that have a client secret must send a `SECRET_HASH` with every
//! authentication call: `Base64(HMAC-SHA256(key = client_secret,
//! message = username + client_id))`. A mismatch makes the provider reject
//! the call as if the credentials were wrong, so this must reproduce the
//! provider's value exactly.

use base64::{
    Engine,
    engine::general_purpose::{STANDARD, URL_SAFE_NO_PAD},
};
use hmac::{Hmac, Mac};
use sha2::Sha256;

use crate::config::ConfigError;

type HmacSha256 = Hmac<Sha256>;

/// Computes the secret hash for `username` under the given app client.
///
/// # Errors
///
/// Returns `ConfigError::Missing` if any input is empty.
///
/// # Example
///
/// ```
/// use phishguard_auth::secret_hash::sign;
///
/// let hash = sign("alice", "client-id", "client-secret").unwrap();
/// assert_eq!(hash, sign("alice", "client-id", "client-secret").unwrap());
/// ```
pub fn sign(username: &str, client_id: &str, client_secret: &str) -> Result<String, ConfigError> {
    if username.is_empty() {
        return Err(ConfigError::Missing("username".to_string()));
    }
    if client_id.is_empty() {
        return Err(ConfigError::Missing("client_id".to_string()));
    }
    if client_secret.is_empty() {
        return Err(ConfigError::Missing("client_secret".to_string()));
    }

    let mut mac = HmacSha256::new_from_slice(client_secret.as_bytes())
        .map_err(|e| ConfigError::InvalidValue(format!("client_secret: {}", e)))?;
    mac.update(username.as_bytes());
    mac.update(client_id.as_bytes());
    Ok(STANDARD.encode(mac.finalize().into_bytes()))
}

/// HMAC-SHA256 over length-prefixed `fields`, URL-safe Base64 encoded.
///
/// Binds values that travel through the client to the app client secret.
pub(crate) fn seal(client_secret: &str, fields: &[&str]) -> Result<String, ConfigError> {
    Ok(URL_SAFE_NO_PAD.encode(seal_mac(client_secret, fields)?.finalize().into_bytes()))
}

/// Checks a value produced by [`seal`] in constant time.
pub(crate) fn verify_seal(client_secret: &str, fields: &[&str], sealed: &str) -> bool {
    let Ok(tag) = URL_SAFE_NO_PAD.decode(sealed) else {
        return false;
    };
    seal_mac(client_secret, fields).is_ok_and(|mac| mac.verify_slice(&tag).is_ok())
}

fn seal_mac(client_secret: &str, fields: &[&str]) -> Result<HmacSha256, ConfigError> {
    if client_secret.is_empty() {
        return Err(ConfigError::Missing("client_secret".to_string()));
    }
    let mut mac = HmacSha256::new_from_slice(client_secret.as_bytes())
        .map_err(|e| ConfigError::InvalidValue(format!("client_secret: {}", e)))?;
    for field in fields {
        mac.update(&(field.len() as u64).to_be_bytes());
        mac.update(field.as_bytes());
    }
    Ok(mac)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_vector() {
        // HMAC-SHA256(key = "key", "The quick brown fox jumps over the lazy dog")
        let hash = sign("The quick brown fox ", "jumps over the lazy dog", "key").unwrap();
        assert_eq!(hash, "97yD9DBThCSxMpjmqm+xQ+9NWaFJRhdZl0edvC0aPNg=");
    }

    #[test]
    fn test_deterministic() {
        let a = sign("alice", "client-1", "s3cret").unwrap();
        let b = sign("alice", "client-1", "s3cret").unwrap();
        assert_eq!(a, b);
        // 32-byte digest, standard base64 with padding
        assert_eq!(a.len(), 44);
        assert!(a.ends_with('='));
    }

    #[test]
    fn test_every_input_changes_hash() {
        let base = sign("alice", "client-1", "s3cret").unwrap();
        assert_ne!(base, sign("alice2", "client-1", "s3cret").unwrap());
        assert_ne!(base, sign("alice", "client-2", "s3cret").unwrap());
        assert_ne!(base, sign("alice", "client-1", "s3cret!").unwrap());
    }

    #[test]
    fn test_missing_inputs() {
        assert!(matches!(
            sign("", "client-1", "s3cret"),
            Err(ConfigError::Missing(ref f)) if f == "username"
        ));
        assert!(matches!(
            sign("alice", "", "s3cret"),
            Err(ConfigError::Missing(ref f)) if f == "client_id"
        ));
        assert!(matches!(
            sign("alice", "client-1", ""),
            Err(ConfigError::Missing(ref f)) if f == "client_secret"
        ));
    }

    #[test]
    fn test_seal_binds_every_field() {
        let sealed = seal("secret", &["a", "bc"]).unwrap();
        assert!(verify_seal("secret", &["a", "bc"], &sealed));
        assert!(!verify_seal("secret", &["ab", "c"], &sealed));
        assert!(!verify_seal("other", &["a", "bc"], &sealed));
        assert!(!verify_seal("secret", &["a", "bc"], "not base64!"));
        assert!(seal("", &["a"]).is_err());
    }
}
