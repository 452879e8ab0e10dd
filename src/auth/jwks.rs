//! Signing key lookup against the identity provider
//!
//! The provider publishes its RSA public keys as a JWK set. Keys are cached by
//! `kid`; a cache miss triggers a refetch of the whole set, limited to a fixed
//! number of fetches per minute so a flood of tokens with bogus key ids cannot
//! be turned into a flood of requests against the provider.

use jsonwebtoken::jwk::Jwk;
use jsonwebtoken::DecodingKey;
use serde::Deserialize;
use std::collections::{HashMap, VecDeque};
use std::time::{Duration, Instant};
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info, warn};

use super::jwt::AuthError;

const RATE_WINDOW: Duration = Duration::from_secs(60);

/// Source of token verification keys (allows mocking in tests)
#[async_trait::async_trait]
pub trait KeyProvider: Send + Sync {
    /// Get the decoding key for a key id
    async fn signing_key(&self, kid: &str) -> Result<DecodingKey, AuthError>;
}

/// Configuration for the JWKS client
#[derive(Debug, Clone)]
pub struct JwksConfig {
    /// Key set endpoint
    pub jwks_uri: String,
    /// How long fetched keys stay valid (default: 10 minutes)
    pub cache_ttl: Duration,
    /// Maximum key-set fetches per minute (default: 5)
    pub requests_per_minute: u32,
    /// Timeout for HTTP requests (default: 10 seconds)
    pub request_timeout: Duration,
}

impl JwksConfig {
    pub fn new(jwks_uri: impl Into<String>) -> Self {
        Self {
            jwks_uri: jwks_uri.into(),
            cache_ttl: Duration::from_secs(600),
            requests_per_minute: 5,
            request_timeout: Duration::from_secs(10),
        }
    }
}

/// Key set as published; entries are parsed one by one so a key of an
/// unsupported type does not poison the rest.
#[derive(Debug, Deserialize)]
struct RawKeySet {
    #[serde(default)]
    keys: Vec<serde_json::Value>,
}

struct CachedKey {
    key: DecodingKey,
    expires_at: Instant,
}

/// Sliding-window fetch limiter
#[derive(Debug)]
pub(crate) struct FetchLimiter {
    max: usize,
    window: Duration,
    recent: VecDeque<Instant>,
}

impl FetchLimiter {
    pub(crate) fn new(max_per_window: u32, window: Duration) -> Self {
        Self {
            max: max_per_window as usize,
            window,
            recent: VecDeque::new(),
        }
    }

    /// Record a fetch at `now` if the window has room
    pub(crate) fn try_acquire(&mut self, now: Instant) -> bool {
        while let Some(&oldest) = self.recent.front() {
            if now.duration_since(oldest) >= self.window {
                self.recent.pop_front();
            } else {
                break;
            }
        }

        if self.recent.len() >= self.max {
            return false;
        }

        self.recent.push_back(now);
        true
    }
}

/// JWKS client with key cache and fetch rate limit
pub struct JwksClient {
    config: JwksConfig,
    cache: RwLock<HashMap<String, CachedKey>>,
    limiter: Mutex<FetchLimiter>,
    /// Held across re-check, limiter and fetch so concurrent misses share one refresh
    refresh_lock: Mutex<()>,
    http_client: reqwest::Client,
}

impl JwksClient {
    pub fn new(config: JwksConfig) -> Self {
        let http_client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .user_agent(concat!("windsurf-backend/", env!("CARGO_PKG_VERSION")))
            .build()
            .unwrap_or_default();

        let limiter = FetchLimiter::new(config.requests_per_minute, RATE_WINDOW);

        Self {
            config,
            cache: RwLock::new(HashMap::new()),
            limiter: Mutex::new(limiter),
            refresh_lock: Mutex::new(()),
            http_client,
        }
    }

    async fn get_cached(&self, kid: &str) -> Option<DecodingKey> {
        let cache = self.cache.read().await;
        cache.get(kid).and_then(|cached| {
            if cached.expires_at > Instant::now() {
                Some(cached.key.clone())
            } else {
                None
            }
        })
    }

    /// Fetch the key set and replace the cache with its signing keys
    async fn refresh(&self) -> Result<usize, AuthError> {
        debug!(uri = %self.config.jwks_uri, "Fetching signing keys");

        let response = self
            .http_client
            .get(&self.config.jwks_uri)
            .header("Accept", "application/json")
            .send()
            .await
            .map_err(|e| AuthError::KeyFetch(e.to_string()))?;

        if !response.status().is_success() {
            return Err(AuthError::KeyFetch(format!(
                "HTTP {} from {}",
                response.status(),
                self.config.jwks_uri
            )));
        }

        let raw: RawKeySet = response
            .json()
            .await
            .map_err(|e| AuthError::KeyFetch(format!("Invalid key set: {}", e)))?;

        let expires_at = Instant::now() + self.config.cache_ttl;
        let mut fresh = HashMap::new();
        for value in raw.keys {
            let jwk: Jwk = match serde_json::from_value(value) {
                Ok(jwk) => jwk,
                Err(e) => {
                    debug!(error = %e, "Skipping unparseable key");
                    continue;
                }
            };
            let Some(kid) = jwk.common.key_id.clone() else {
                continue;
            };
            match DecodingKey::from_jwk(&jwk) {
                Ok(key) => {
                    fresh.insert(kid, CachedKey { key, expires_at });
                }
                Err(e) => debug!(kid = %kid, error = %e, "Skipping unusable key"),
            }
        }

        let count = fresh.len();
        *self.cache.write().await = fresh;
        info!(keys = count, "Signing keys refreshed");
        Ok(count)
    }
}

#[async_trait::async_trait]
impl KeyProvider for JwksClient {
    async fn signing_key(&self, kid: &str) -> Result<DecodingKey, AuthError> {
        if let Some(key) = self.get_cached(kid).await {
            return Ok(key);
        }

        let _refreshing = self.refresh_lock.lock().await;

        // Another caller may have refreshed while we waited
        if let Some(key) = self.get_cached(kid).await {
            return Ok(key);
        }

        if !self.limiter.lock().await.try_acquire(Instant::now()) {
            warn!(kid = %kid, "Key set fetch rate limit reached");
            return Err(AuthError::RateLimited);
        }

        self.refresh().await?;

        self.get_cached(kid)
            .await
            .ok_or_else(|| AuthError::UnknownKey(kid.to_string()))
    }
}
