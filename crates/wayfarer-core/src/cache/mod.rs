//! Time-bounded artifact cache with interchangeable backends.
//!
//! [`Cache`] is the only type callers touch. It wraps a [`CacheBackend`]
//! (in-process [`MemoryBackend`] or external [`RedisBackend`]) and turns
//! every backend error into a miss or a `false` return, so planning stays
//! correct with caching fully broken or disabled.
//!
//! ```text
//! Orchestrator --get_json/set_json--> Cache --Box<dyn CacheBackend>--> memory | redis
//! ```

pub mod memory;
pub mod redis_backend;

use std::env;
use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use serde::de::DeserializeOwned;

pub use memory::MemoryBackend;
pub use redis_backend::RedisBackend;

/// Errors raised by cache backends. [`Cache`] never lets these escape.
#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    #[error("cache backend connection failed: {0}")]
    Connection(String),

    #[error("cache backend command failed: {0}")]
    Command(String),

    #[error("invalid key pattern {pattern:?}: {reason}")]
    Pattern { pattern: String, reason: String },
}

// ---------------------------------------------------------------------------
// Backend trait
// ---------------------------------------------------------------------------

/// Storage contract shared by all cache backends.
///
/// Values are opaque strings; [`Cache`] owns serialization.
#[async_trait]
pub trait CacheBackend: Send + Sync {
    /// Short backend name for logs (e.g. "memory").
    fn name(&self) -> &str;

    /// Fetch a live value. Expired entries read as absent.
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError>;

    /// Store `value` under `key` for `ttl`, replacing any previous entry.
    async fn set(&self, key: &str, value: &str, ttl: Duration) -> Result<(), CacheError>;

    /// Delete every key matching `pattern`. Returns how many were removed.
    async fn invalidate(&self, pattern: &KeyPattern) -> Result<usize, CacheError>;

    /// Delete everything.
    async fn clear(&self) -> Result<(), CacheError>;

    /// Number of live entries.
    async fn entry_count(&self) -> Result<usize, CacheError>;
}

// Compile-time assertion: CacheBackend must be usable as `dyn CacheBackend`.
const _: () = {
    fn _assert_object_safe(_: &dyn CacheBackend) {}
};

/// A backend that stores nothing. Every read misses.
#[derive(Debug, Default)]
pub struct DisabledBackend;

#[async_trait]
impl CacheBackend for DisabledBackend {
    fn name(&self) -> &str {
        "disabled"
    }

    async fn get(&self, _key: &str) -> Result<Option<String>, CacheError> {
        Ok(None)
    }

    async fn set(&self, _key: &str, _value: &str, _ttl: Duration) -> Result<(), CacheError> {
        Ok(())
    }

    async fn invalidate(&self, _pattern: &KeyPattern) -> Result<usize, CacheError> {
        Ok(0)
    }

    async fn clear(&self) -> Result<(), CacheError> {
        Ok(())
    }

    async fn entry_count(&self) -> Result<usize, CacheError> {
        Ok(0)
    }
}

/// Point-in-time summary of a cache, as reported by [`Cache::stats`].
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct CacheStats {
    pub backend: String,
    pub entries: usize,
    pub default_ttl_secs: u64,
}

// ---------------------------------------------------------------------------
// Key patterns
// ---------------------------------------------------------------------------

/// Pattern accepted by [`Cache::invalidate`].
///
/// A pattern containing any of `*`, `?` or `[` is a glob over the whole
/// key; anything else matches as a substring.
#[derive(Debug, Clone)]
pub enum KeyPattern {
    Substring(String),
    Glob(glob::Pattern),
}

impl KeyPattern {
    pub fn parse(pattern: &str) -> Result<Self, CacheError> {
        if pattern.contains(['*', '?', '[']) {
            glob::Pattern::new(pattern)
                .map(Self::Glob)
                .map_err(|e| CacheError::Pattern {
                    pattern: pattern.to_owned(),
                    reason: e.to_string(),
                })
        } else {
            Ok(Self::Substring(pattern.to_owned()))
        }
    }

    pub fn matches(&self, key: &str) -> bool {
        match self {
            Self::Substring(needle) => key.contains(needle.as_str()),
            Self::Glob(glob) => glob.matches(key),
        }
    }

    /// The equivalent Redis `KEYS` pattern.
    pub fn to_redis_pattern(&self) -> String {
        match self {
            Self::Substring(needle) => format!("*{}*", needle.replace('\\', "\\\\")),
            Self::Glob(glob) => glob.as_str().to_owned(),
        }
    }
}

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Cache configuration.
///
/// Reads `WAYFARER_REDIS_URL` and `WAYFARER_CACHE_TTL_SECS`; without a Redis
/// URL the in-process backend is used.
#[derive(Debug, Clone)]
pub struct CacheConfig {
    pub redis_url: Option<String>,
    pub ttl: Duration,
}

impl CacheConfig {
    /// One hour.
    pub const DEFAULT_TTL_SECS: u64 = 3600;

    pub fn from_env() -> Self {
        let redis_url = env::var("WAYFARER_REDIS_URL")
            .ok()
            .filter(|url| !url.trim().is_empty());
        let ttl_secs = env::var("WAYFARER_CACHE_TTL_SECS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(Self::DEFAULT_TTL_SECS);
        Self {
            redis_url,
            ttl: Duration::from_secs(ttl_secs),
        }
    }

    pub fn in_memory() -> Self {
        Self {
            redis_url: None,
            ttl: Duration::from_secs(Self::DEFAULT_TTL_SECS),
        }
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self::from_env()
    }
}

// ---------------------------------------------------------------------------
// Cache
// ---------------------------------------------------------------------------

/// Backend-agnostic, failure-tolerant cache handle.
///
/// Construct once at startup and share it as `Arc<Cache>`.
pub struct Cache {
    backend: Box<dyn CacheBackend>,
    default_ttl: Duration,
}

impl Cache {
    pub fn new(backend: impl CacheBackend + 'static, default_ttl: Duration) -> Self {
        Self {
            backend: Box::new(backend),
            default_ttl,
        }
    }

    pub fn in_memory(default_ttl: Duration) -> Self {
        Self::new(MemoryBackend::new(), default_ttl)
    }

    pub fn disabled() -> Self {
        Self::new(DisabledBackend, Duration::ZERO)
    }

    /// Build the cache described by `config`.
    ///
    /// Uses Redis when a URL is configured and answers `PING`; otherwise
    /// falls back to the in-process backend.
    pub async fn connect(config: &CacheConfig) -> Self {
        let Some(url) = config.redis_url.as_deref() else {
            tracing::info!(backend = "memory", "using in-process cache");
            return Self::in_memory(config.ttl);
        };

        let backend = match RedisBackend::connect(url).await {
            Ok(backend) => backend,
            Err(e) => {
                tracing::warn!(error = %e, "redis unavailable, using in-process cache");
                return Self::in_memory(config.ttl);
            }
        };

        match backend.ping().await {
            Ok(()) => {
                tracing::info!(backend = "redis", "connected to redis cache");
                Self::new(backend, config.ttl)
            }
            Err(e) => {
                tracing::warn!(error = %e, "redis unavailable, using in-process cache");
                Self::in_memory(config.ttl)
            }
        }
    }

    pub fn backend_name(&self) -> &str {
        self.backend.name()
    }

    /// Lifetime given to entries stored through [`Cache::set_json`].
    pub fn default_ttl(&self) -> Duration {
        self.default_ttl
    }

    /// Backend name and live entry count; `None` if the backend cannot say.
    pub async fn stats(&self) -> Option<CacheStats> {
        match self.backend.entry_count().await {
            Ok(entries) => Some(CacheStats {
                backend: self.backend.name().to_owned(),
                entries,
                default_ttl_secs: self.default_ttl.as_secs(),
            }),
            Err(e) => {
                tracing::warn!(backend = self.backend.name(), error = %e, "cache stats failed");
                None
            }
        }
    }

    /// Fetch a raw value; backend errors read as a miss.
    pub async fn get(&self, key: &str) -> Option<String> {
        match self.backend.get(key).await {
            Ok(value) => value,
            Err(e) => {
                tracing::warn!(key, backend = self.backend.name(), error = %e, "cache get failed");
                None
            }
        }
    }

    /// Store a raw value. Returns `false` if the backend refused.
    pub async fn set(&self, key: &str, value: &str, ttl: Duration) -> bool {
        match self.backend.set(key, value, ttl).await {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!(key, backend = self.backend.name(), error = %e, "cache set failed");
                false
            }
        }
    }

    /// Delete keys matching `pattern` (substring, or glob if it contains
    /// glob metacharacters).
    pub async fn invalidate(&self, pattern: &str) -> bool {
        let parsed = match KeyPattern::parse(pattern) {
            Ok(parsed) => parsed,
            Err(e) => {
                tracing::warn!(error = %e, "cache invalidation skipped");
                return false;
            }
        };
        match self.backend.invalidate(&parsed).await {
            Ok(removed) => {
                tracing::debug!(pattern, removed, "cache entries invalidated");
                true
            }
            Err(e) => {
                tracing::warn!(pattern, backend = self.backend.name(), error = %e, "cache invalidation failed");
                false
            }
        }
    }

    pub async fn clear(&self) -> bool {
        match self.backend.clear().await {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!(backend = self.backend.name(), error = %e, "cache clear failed");
                false
            }
        }
    }

    /// Fetch and deserialize a JSON value. Undecodable entries read as a miss.
    pub async fn get_json<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let raw = self.get(key).await?;
        match serde_json::from_str(&raw) {
            Ok(value) => Some(value),
            Err(e) => {
                tracing::warn!(key, error = %e, "discarding undecodable cache entry");
                None
            }
        }
    }

    /// Serialize `value` as JSON and store it for the default TTL.
    pub async fn set_json<T: Serialize>(&self, key: &str, value: &T) -> bool {
        match serde_json::to_string(value) {
            Ok(raw) => self.set(key, &raw, self.default_ttl).await,
            Err(e) => {
                tracing::warn!(key, error = %e, "cache value could not be serialized");
                false
            }
        }
    }
}

impl std::fmt::Debug for Cache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Cache")
            .field("backend", &self.backend.name())
            .field("default_ttl", &self.default_ttl)
            .finish()
    }
}
