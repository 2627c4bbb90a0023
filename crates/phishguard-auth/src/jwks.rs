//! Provider JWKS fetching and caching.
//!
//! The user pool publishes its token signing keys as a JSON Web Key Set.
//! [`JwksCache`] holds one key set for one pool, keyed by `kid`, and refreshes
//! it lazily when a lookup finds it expired. There is no background refresh.
//!
//! # Refresh rules
//!
//! - An entry is fresh while `now < fetched_at + ttl`. Fresh lookups never
//!   touch the network, also when the requested `kid` is absent.
//! - Concurrent lookups that find the entry expired collapse into a single
//!   fetch. Callers that queued behind it reuse its outcome.
//! - A transient fetch failure is retried `fetch_retries` times.
//! - If the refresh still fails, the previous entry keeps being served while
//!   `now < fetched_at + ttl + stale_grace`. Past that, lookups see an empty
//!   key set and verification fails closed.
//! - After a failed refresh, lookups within the grace window serve the stale
//!   entry without fetching until `failure_backoff` has elapsed.
//!
//! Time comes from an injected [`Clock`] and key sets from an injected
//! [`KeyFetcher`], so the cache can be driven deterministically in tests.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use jsonwebtoken::jwk::{Jwk, JwkSet, PublicKeyUse};
use jsonwebtoken::{Algorithm, DecodingKey};
use time::OffsetDateTime;
use tokio::sync::{Mutex, RwLock};
use url::Url;

use crate::clock::Clock;
use crate::config::JwksConfig;

/// Errors that can occur during JWKS operations.
#[derive(Debug, Clone, thiserror::Error)]
pub enum JwksError {
    /// A network error occurred while fetching the JWKS.
    #[error("Network error: {0}")]
    NetworkError(String),

    /// The fetch did not complete within the request timeout.
    #[error("JWKS request timed out")]
    Timeout,

    /// The HTTP request returned a non-success status code.
    #[error("HTTP error: status {0}")]
    HttpError(u16),

    /// The JWKS response could not be parsed as JSON.
    #[error("Failed to parse JWKS: {0}")]
    ParseError(String),

    /// The requested key was not found in the JWKS.
    #[error("Key not found: {0}")]
    KeyNotFound(String),

    /// The key could not be converted to a decoding key.
    #[error("Invalid key: {0}")]
    InvalidKey(String),

    /// The JWKS URI could not be parsed.
    #[error("Invalid JWKS URL: {0}")]
    InvalidUrl(String),

    /// The JWKS URI scheme is not allowed (must be HTTPS in production).
    #[error("Invalid URL scheme: only HTTPS is allowed")]
    InvalidScheme,

    /// The response exceeded the maximum allowed size.
    #[error("Response exceeds maximum size of {max_size} bytes")]
    ResponseTooLarge {
        /// The maximum allowed size.
        max_size: usize,
    },
}

impl JwksError {
    /// Returns `true` if a repeated fetch may succeed.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        match self {
            Self::NetworkError(_) | Self::Timeout => true,
            Self::HttpError(status) => *status == 429 || *status >= 500,
            _ => false,
        }
    }
}

/// Source of the provider's published key set.
#[async_trait]
pub trait KeyFetcher: Send + Sync {
    /// Fetches the complete key set.
    async fn fetch(&self) -> Result<JwkSet, JwksError>;
}

/// Fetches a key set over HTTPS.
pub struct HttpKeyFetcher {
    http_client: reqwest::Client,
    jwks_uri: Url,
    max_response_size: usize,
}

impl HttpKeyFetcher {
    /// Creates a fetcher for `jwks_uri`.
    ///
    /// # Errors
    ///
    /// Returns `JwksError::InvalidUrl` or `JwksError::InvalidScheme` for an
    /// unusable URI, and `JwksError::NetworkError` if the HTTP client cannot
    /// be built.
    pub fn new(jwks_uri: &str, config: &JwksConfig, allow_http: bool) -> Result<Self, JwksError> {
        let jwks_uri = Url::parse(jwks_uri).map_err(|e| JwksError::InvalidUrl(e.to_string()))?;
        validate_scheme(&jwks_uri, allow_http)?;

        let http_client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| JwksError::NetworkError(e.to_string()))?;

        Ok(Self {
            http_client,
            jwks_uri,
            max_response_size: config.max_response_size,
        })
    }

    /// The endpoint this fetcher reads from.
    #[must_use]
    pub fn jwks_uri(&self) -> &Url {
        &self.jwks_uri
    }
}

#[async_trait]
impl KeyFetcher for HttpKeyFetcher {
    async fn fetch(&self) -> Result<JwkSet, JwksError> {
        tracing::debug!("Fetching JWKS from {}", self.jwks_uri);

        let response = self
            .http_client
            .get(self.jwks_uri.as_str())
            .header("Accept", "application/json")
            .send()
            .await
            .map_err(|e| {
                tracing::warn!("Failed to fetch JWKS from {}: {}", self.jwks_uri, e);
                if e.is_timeout() {
                    JwksError::Timeout
                } else {
                    JwksError::NetworkError(e.to_string())
                }
            })?;

        if !response.status().is_success() {
            return Err(JwksError::HttpError(response.status().as_u16()));
        }

        if let Some(len) = response.content_length()
            && len as usize > self.max_response_size
        {
            return Err(JwksError::ResponseTooLarge {
                max_size: self.max_response_size,
            });
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| JwksError::NetworkError(e.to_string()))?;
        if body.len() > self.max_response_size {
            return Err(JwksError::ResponseTooLarge {
                max_size: self.max_response_size,
            });
        }

        serde_json::from_slice(&body).map_err(|e| {
            tracing::warn!("Failed to parse JWKS from {}: {}", self.jwks_uri, e);
            JwksError::ParseError(e.to_string())
        })
    }
}

fn validate_scheme(uri: &Url, allow_http: bool) -> Result<(), JwksError> {
    match uri.scheme() {
        "https" => Ok(()),
        "http" if allow_http => Ok(()),
        _ => Err(JwksError::InvalidScheme),
    }
}

#[derive(Clone)]
struct CachedKey {
    key: DecodingKey,
    algorithm: Option<Algorithm>,
}

/// One fetched key set. Replaced wholesale on refresh.
struct CachedKeys {
    keys: HashMap<String, CachedKey>,
    fetched_at: OffsetDateTime,
}

impl CachedKeys {
    fn from_jwks(jwks: &JwkSet, fetched_at: OffsetDateTime) -> Self {
        let mut keys = HashMap::with_capacity(jwks.keys.len());
        for jwk in &jwks.keys {
            if matches!(jwk.common.public_key_use, Some(PublicKeyUse::Encryption)) {
                continue;
            }
            let Some(kid) = jwk.common.key_id.clone() else {
                tracing::debug!("Skipping JWK without kid");
                continue;
            };
            match DecodingKey::from_jwk(jwk) {
                Ok(key) => {
                    keys.insert(
                        kid,
                        CachedKey {
                            key,
                            algorithm: jwk_algorithm(jwk),
                        },
                    );
                }
                Err(e) => tracing::warn!(kid = %kid, error = %e, "Skipping unusable JWK"),
            }
        }
        Self { keys, fetched_at }
    }
}

/// Lazily refreshed key set for one user pool.
pub struct JwksCache {
    fetcher: Arc<dyn KeyFetcher>,
    clock: Arc<dyn Clock>,
    config: JwksConfig,
    entry: RwLock<Option<Arc<CachedKeys>>>,
    /// Held for the duration of a refresh.
    refresh_lock: Mutex<()>,
    /// Bumped after every completed refresh attempt, successful or not.
    generation: AtomicU64,
    last_failure: RwLock<Option<OffsetDateTime>>,
    fetches: AtomicU64,
}

impl JwksCache {
    /// Creates an empty cache.
    #[must_use]
    pub fn new(config: JwksConfig, fetcher: Arc<dyn KeyFetcher>, clock: Arc<dyn Clock>) -> Self {
        Self {
            fetcher,
            clock,
            config,
            entry: RwLock::new(None),
            refresh_lock: Mutex::new(()),
            generation: AtomicU64::new(0),
            last_failure: RwLock::new(None),
            fetches: AtomicU64::new(0),
        }
    }

    /// Gets a decoding key by key ID, refreshing the key set if it expired.
    ///
    /// Returns the `DecodingKey` and the algorithm the key advertises.
    ///
    /// # Errors
    ///
    /// Returns `JwksError::KeyNotFound` if the usable key set does not
    /// contain `kid`. Fetch failures are not surfaced; they degrade to the
    /// stale or empty key set.
    pub async fn get_key(&self, kid: &str) -> Result<(DecodingKey, Option<Algorithm>), JwksError> {
        let observed = self.generation.load(Ordering::Acquire);
        let now = self.clock.now();

        let current = self.entry.read().await.clone();
        let keys = match current {
            Some(entry) if self.is_fresh(&entry, now) => {
                tracing::trace!(kid = %kid, "JWKS cache hit");
                entry
            }
            Some(entry) if self.backing_off(now).await && self.within_grace(&entry, now) => {
                tracing::debug!(kid = %kid, "JWKS refresh backing off after failure");
                entry
            }
            _ => {
                tracing::debug!(kid = %kid, "JWKS cache expired or empty");
                match self.refresh_if_unchanged(observed).await {
                    Some(entry) => entry,
                    None => return Err(JwksError::KeyNotFound(kid.to_string())),
                }
            }
        };

        keys.keys
            .get(kid)
            .map(|cached| (cached.key.clone(), cached.algorithm))
            .ok_or_else(|| JwksError::KeyNotFound(kid.to_string()))
    }

    /// Refreshes unless another caller completed a refresh since
    /// `observed`, then returns the entry that is usable right now.
    async fn refresh_if_unchanged(&self, observed: u64) -> Option<Arc<CachedKeys>> {
        let _guard = self.refresh_lock.lock().await;

        if self.generation.load(Ordering::Acquire) == observed {
            self.refresh_locked().await;
        } else {
            tracing::debug!("Reusing concurrent JWKS refresh");
        }

        let now = self.clock.now();
        let entry = self.entry.read().await.clone()?;
        if self.is_fresh(&entry, now) || self.within_grace(&entry, now) {
            Some(entry)
        } else {
            tracing::warn!("JWKS unavailable and stale key set past grace window");
            None
        }
    }

    async fn refresh_locked(&self) {
        let attempts = self.config.fetch_retries.saturating_add(1);
        let mut attempt = 0;

        let outcome = loop {
            attempt += 1;
            self.fetches.fetch_add(1, Ordering::Relaxed);
            match self.fetcher.fetch().await {
                Ok(jwks) => break Ok(jwks),
                Err(e) if e.is_transient() && attempt < attempts => {
                    tracing::debug!(attempt, error = %e, "Retrying JWKS fetch");
                }
                Err(e) => break Err(e),
            }
        };

        match outcome {
            Ok(jwks) => {
                let entry = CachedKeys::from_jwks(&jwks, self.clock.now());
                tracing::debug!(keys = entry.keys.len(), "Cached JWKS");
                *self.entry.write().await = Some(Arc::new(entry));
                *self.last_failure.write().await = None;
            }
            Err(e) => {
                tracing::warn!(error = %e, "JWKS refresh failed");
                *self.last_failure.write().await = Some(self.clock.now());
            }
        }

        self.generation.fetch_add(1, Ordering::Release);
    }

    fn is_fresh(&self, entry: &CachedKeys, now: OffsetDateTime) -> bool {
        now < entry.fetched_at + self.config.ttl
    }

    async fn backing_off(&self, now: OffsetDateTime) -> bool {
        self.last_failure
            .read()
            .await
            .is_some_and(|failed_at| now < failed_at + self.config.failure_backoff)
    }

    fn within_grace(&self, entry: &CachedKeys, now: OffsetDateTime) -> bool {
        let usable = now < entry.fetched_at + self.config.ttl + self.config.stale_grace;
        if usable {
            tracing::warn!("Serving stale JWKS within grace window");
        }
        usable
    }

    /// Drops the cached key set so the next lookup fetches.
    pub async fn invalidate(&self) {
        *self.entry.write().await = None;
        *self.last_failure.write().await = None;
        tracing::debug!("Invalidated JWKS cache");
    }

    /// Returns the number of keys in the cached set.
    pub async fn len(&self) -> usize {
        self.entry
            .read()
            .await
            .as_ref()
            .map_or(0, |entry| entry.keys.len())
    }

    /// Returns `true` if no keys are cached.
    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Number of fetch attempts made so far, retries included.
    #[must_use]
    pub fn fetch_count(&self) -> u64 {
        self.fetches.load(Ordering::Relaxed)
    }
}

/// Extracts the algorithm from a JWK.
fn jwk_algorithm(jwk: &Jwk) -> Option<Algorithm> {
    use jsonwebtoken::jwk::KeyAlgorithm;

    jwk.common.key_algorithm.as_ref().and_then(|alg| match alg {
        KeyAlgorithm::RS256 => Some(Algorithm::RS256),
        KeyAlgorithm::RS384 => Some(Algorithm::RS384),
        KeyAlgorithm::RS512 => Some(Algorithm::RS512),
        KeyAlgorithm::ES256 => Some(Algorithm::ES256),
        KeyAlgorithm::ES384 => Some(Algorithm::ES384),
        KeyAlgorithm::PS256 => Some(Algorithm::PS256),
        KeyAlgorithm::PS384 => Some(Algorithm::PS384),
        KeyAlgorithm::PS512 => Some(Algorithm::PS512),
        _ => None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use std::collections::VecDeque;
    use std::sync::Mutex as StdMutex;
    use std::time::Duration;

    const N: &str = "0vx7agoebGcQSuuPiLJXZptN9nndrQmbXEps2aiAFbWhM78LhWx4cbbfAAtVT86zwu1RK7aPFFxuhDR1L6tSoc_BJECPebWKRXjBZCiFV4n3oknjhMstn64tZ_2W-5JsGY4Hc5n9yBXArwl93lqt7_RN5w6Cf0h4QyQ5v-65YGjQR0_FDW2QvzqY368QQMicAtaSqzs8KJZgnYb9c7d0zgdAZHzu6qMQvRL5hajrn1n91CbOpbISD08qNLyrdkt-bFTWhAI4vMQFh6WeZu0fM4lFd2NcRwr3XPksINHaQ-G_xBniIqbw0Ls1jF44-csFCur-kEgU8awapJzKnqDKgw";

    fn test_jwks(kids: &[&str]) -> JwkSet {
        let keys: Vec<_> = kids
            .iter()
            .map(|kid| {
                serde_json::json!({
                    "kty": "RSA",
                    "kid": kid,
                    "use": "sig",
                    "alg": "RS256",
                    "n": N,
                    "e": "AQAB"
                })
            })
            .collect();
        serde_json::from_value(serde_json::json!({ "keys": keys })).unwrap()
    }

    /// Replays scripted results; falls back to `default` once exhausted.
    struct ScriptedFetcher {
        script: StdMutex<VecDeque<Result<JwkSet, JwksError>>>,
        default: Result<JwkSet, JwksError>,
        delay: Duration,
    }

    impl ScriptedFetcher {
        fn always(result: Result<JwkSet, JwksError>) -> Self {
            Self {
                script: StdMutex::new(VecDeque::new()),
                default: result,
                delay: Duration::ZERO,
            }
        }

        fn then(self, result: Result<JwkSet, JwksError>) -> Self {
            self.script.lock().unwrap().push_back(result);
            self
        }

        fn with_delay(mut self, delay: Duration) -> Self {
            self.delay = delay;
            self
        }
    }

    #[async_trait]
    impl KeyFetcher for ScriptedFetcher {
        async fn fetch(&self) -> Result<JwkSet, JwksError> {
            if !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }
            let next = self.script.lock().unwrap().pop_front();
            next.unwrap_or_else(|| self.default.clone())
        }
    }

    fn cache_with(fetcher: ScriptedFetcher, clock: Arc<ManualClock>) -> JwksCache {
        JwksCache::new(JwksConfig::default(), Arc::new(fetcher), clock)
    }

    #[test]
    fn test_transient_classification() {
        assert!(JwksError::NetworkError("reset".into()).is_transient());
        assert!(JwksError::Timeout.is_transient());
        assert!(JwksError::HttpError(503).is_transient());
        assert!(JwksError::HttpError(429).is_transient());
        assert!(!JwksError::HttpError(404).is_transient());
        assert!(!JwksError::ParseError("eof".into()).is_transient());
    }

    #[test]
    fn test_validate_scheme() {
        let https = Url::parse("https://example.com/jwks").unwrap();
        let http = Url::parse("http://example.com/jwks").unwrap();
        assert!(validate_scheme(&https, false).is_ok());
        assert!(validate_scheme(&http, false).is_err());
        assert!(validate_scheme(&http, true).is_ok());
    }

    #[test]
    fn test_http_fetcher_rejects_plain_http() {
        let config = JwksConfig::default();
        assert!(matches!(
            HttpKeyFetcher::new("http://example.com/jwks", &config, false),
            Err(JwksError::InvalidScheme)
        ));
        assert!(matches!(
            HttpKeyFetcher::new("not a url", &config, false),
            Err(JwksError::InvalidUrl(_))
        ));
        assert!(HttpKeyFetcher::new("https://example.com/jwks", &config, false).is_ok());
    }

    #[test]
    fn test_encryption_keys_skipped() {
        let jwks: JwkSet = serde_json::from_value(serde_json::json!({
            "keys": [
                { "kty": "RSA", "kid": "sig-1", "use": "sig", "alg": "RS256", "n": N, "e": "AQAB" },
                { "kty": "RSA", "kid": "enc-1", "use": "enc", "n": N, "e": "AQAB" }
            ]
        }))
        .unwrap();
        let entry = CachedKeys::from_jwks(&jwks, OffsetDateTime::UNIX_EPOCH);
        assert!(entry.keys.contains_key("sig-1"));
        assert!(!entry.keys.contains_key("enc-1"));
    }

    #[tokio::test]
    async fn test_fresh_entry_needs_no_fetch() {
        let clock = Arc::new(ManualClock::at_unix(1_700_000_000));
        let cache = cache_with(ScriptedFetcher::always(Ok(test_jwks(&["k1"]))), clock.clone());

        let (_, alg) = cache.get_key("k1").await.unwrap();
        assert_eq!(alg, Some(Algorithm::RS256));
        assert_eq!(cache.fetch_count(), 1);

        clock.advance(Duration::from_secs(11 * 3600));
        cache.get_key("k1").await.unwrap();
        assert_eq!(cache.fetch_count(), 1);
    }

    #[tokio::test]
    async fn test_unknown_kid_does_not_refetch() {
        let clock = Arc::new(ManualClock::at_unix(1_700_000_000));
        let cache = cache_with(ScriptedFetcher::always(Ok(test_jwks(&["k1"]))), clock);

        cache.get_key("k1").await.unwrap();
        assert!(matches!(
            cache.get_key("other").await,
            Err(JwksError::KeyNotFound(ref kid)) if kid == "other"
        ));
        assert_eq!(cache.fetch_count(), 1);
    }

    #[tokio::test]
    async fn test_expired_entry_is_replaced() {
        let clock = Arc::new(ManualClock::at_unix(1_700_000_000));
        let fetcher = ScriptedFetcher::always(Ok(test_jwks(&["k2"]))).then(Ok(test_jwks(&["k1"])));
        let cache = cache_with(fetcher, clock.clone());

        cache.get_key("k1").await.unwrap();
        clock.advance(Duration::from_secs(12 * 3600));

        // Rotated set replaces the old one entirely.
        assert!(cache.get_key("k1").await.is_err());
        cache.get_key("k2").await.unwrap();
        assert_eq!(cache.fetch_count(), 2);
    }

    #[tokio::test]
    async fn test_concurrent_misses_fetch_once() {
        let clock = Arc::new(ManualClock::at_unix(1_700_000_000));
        let fetcher = ScriptedFetcher::always(Ok(test_jwks(&["k1"])))
            .with_delay(Duration::from_millis(50));
        let cache = Arc::new(cache_with(fetcher, clock));

        let tasks: Vec<_> = (0..16)
            .map(|_| {
                let cache = cache.clone();
                tokio::spawn(async move { cache.get_key("k1").await.is_ok() })
            })
            .collect();
        for task in tasks {
            assert!(task.await.unwrap());
        }

        assert_eq!(cache.fetch_count(), 1);
    }

    #[tokio::test]
    async fn test_concurrent_expired_lookups_fetch_once() {
        let clock = Arc::new(ManualClock::at_unix(1_700_000_000));
        let fetcher = ScriptedFetcher::always(Ok(test_jwks(&["k1"])))
            .with_delay(Duration::from_millis(50));
        let cache = Arc::new(cache_with(fetcher, clock.clone()));

        cache.get_key("k1").await.unwrap();
        assert_eq!(cache.fetch_count(), 1);
        clock.advance(JwksConfig::default().ttl);

        let tasks: Vec<_> = (0..16)
            .map(|_| {
                let cache = cache.clone();
                tokio::spawn(async move { cache.get_key("k1").await.is_ok() })
            })
            .collect();
        for task in tasks {
            assert!(task.await.unwrap());
        }

        assert_eq!(cache.fetch_count(), 2);
    }

    #[tokio::test]
    async fn test_failed_refresh_backs_off_within_grace() {
        let clock = Arc::new(ManualClock::at_unix(1_700_000_000));
        let fetcher = ScriptedFetcher::always(Err(JwksError::Timeout)).then(Ok(test_jwks(&["k1"])));
        let cache = cache_with(fetcher, clock.clone());

        cache.get_key("k1").await.unwrap();
        clock.advance(Duration::from_secs(12 * 3600 + 60));

        // First expired lookup tries once plus one retry, then serves stale.
        cache.get_key("k1").await.unwrap();
        assert_eq!(cache.fetch_count(), 3);

        // Inside the backoff the stale set is served without fetching.
        clock.advance(Duration::from_secs(10));
        cache.get_key("k1").await.unwrap();
        cache.get_key("k1").await.unwrap();
        assert_eq!(cache.fetch_count(), 3);

        // Once the backoff elapses the next lookup refreshes again.
        clock.advance(Duration::from_secs(30));
        cache.get_key("k1").await.unwrap();
        assert_eq!(cache.fetch_count(), 5);
    }

    #[tokio::test]
    async fn test_transient_failure_retried_once() {
        let clock = Arc::new(ManualClock::at_unix(1_700_000_000));
        let fetcher = ScriptedFetcher::always(Ok(test_jwks(&["k1"])))
            .then(Err(JwksError::NetworkError("connection reset".into())));
        let cache = cache_with(fetcher, clock);

        cache.get_key("k1").await.unwrap();
        assert_eq!(cache.fetch_count(), 2);
    }

    #[tokio::test]
    async fn test_permanent_failure_not_retried() {
        let clock = Arc::new(ManualClock::at_unix(1_700_000_000));
        let cache = cache_with(ScriptedFetcher::always(Err(JwksError::HttpError(404))), clock);

        assert!(cache.get_key("k1").await.is_err());
        assert_eq!(cache.fetch_count(), 1);
        assert!(cache.is_empty().await);
    }

    #[tokio::test]
    async fn test_stale_entry_served_within_grace() {
        let clock = Arc::new(ManualClock::at_unix(1_700_000_000));
        let fetcher = ScriptedFetcher::always(Err(JwksError::Timeout)).then(Ok(test_jwks(&["k1"])));
        let cache = cache_with(fetcher, clock.clone());

        cache.get_key("k1").await.unwrap();

        // Expired, refresh fails, 30 minutes into the 1 hour grace window.
        clock.advance(Duration::from_secs(12 * 3600 + 1800));
        cache.get_key("k1").await.unwrap();

        // Past the grace window the cache fails closed.
        clock.advance(Duration::from_secs(3600));
        assert!(matches!(
            cache.get_key("k1").await,
            Err(JwksError::KeyNotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_invalidate_forces_fetch() {
        let clock = Arc::new(ManualClock::at_unix(1_700_000_000));
        let cache = cache_with(ScriptedFetcher::always(Ok(test_jwks(&["k1", "k2"]))), clock);

        cache.get_key("k1").await.unwrap();
        assert_eq!(cache.len().await, 2);

        cache.invalidate().await;
        assert!(cache.is_empty().await);

        cache.get_key("k2").await.unwrap();
        assert_eq!(cache.fetch_count(), 2);
    }

    #[test]
    fn test_jwks_error_display() {
        let err = JwksError::HttpError(404);
        assert_eq!(err.to_string(), "HTTP error: status 404");

        let err = JwksError::KeyNotFound("key-1".to_string());
        assert_eq!(err.to_string(), "Key not found: key-1");

        let err = JwksError::ResponseTooLarge { max_size: 1024 };
        assert_eq!(err.to_string(), "Response exceeds maximum size of 1024 bytes");
    }
}
