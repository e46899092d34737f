// ============================================================================
// Per-IP Rate Limiter
// ============================================================================
//
// One request per window per IP. The last accepted request time lives in the
// shared store under `{prefix}{ip}` and is measured on the store's clock, so
// every server instance agrees on "now". Rejected requests do not move the
// marker.
//
// ============================================================================

use async_trait::async_trait;
use intake_config::RateLimitConfig;
use intake_error::{AppError, AppResult};
use intake_redis::{RedisClient, Script};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tracing::{error, warn};

use crate::utils::log_safe_id;

/// Backing store for "last seen" timestamps (fractional unix seconds)
#[async_trait]
pub trait TimestampStore: Send + Sync {
    async fn get_timestamp(&self, key: &str) -> AppResult<Option<f64>>;

    async fn set_timestamp(&self, key: &str, value: f64, ttl_secs: u64) -> AppResult<()>;

    /// Current time according to the store
    async fn server_time(&self) -> AppResult<f64>;

    /// Returns true and records "now" if no timestamp newer than `window_secs`
    /// exists; returns false and leaves the key untouched otherwise.
    ///
    /// The default is three round trips; stores that can do it atomically
    /// should override.
    async fn check_and_set(&self, key: &str, window_secs: f64, ttl_secs: u64) -> AppResult<bool> {
        let now = self.server_time().await?;
        if let Some(last) = self.get_timestamp(key).await?
            && now - last < window_secs
        {
            return Ok(false);
        }
        self.set_timestamp(key, now, ttl_secs).await?;
        Ok(true)
    }
}

/// Clock read, comparison and write in a single script so two racing
/// requests cannot both pass.
const CHECK_AND_SET_SCRIPT: &str = r"
local t = redis.call('TIME')
local now = tonumber(t[1]) + tonumber(t[2]) / 1000000
local last = redis.call('GET', KEYS[1])
if last and (now - tonumber(last)) < tonumber(ARGV[1]) then
    return 0
end
redis.call('SET', KEYS[1], string.format('%.6f', now), 'EX', ARGV[2])
return 1
";

pub struct RedisTimestampStore {
    client: RedisClient,
    script: Script,
}

impl RedisTimestampStore {
    pub fn new(client: RedisClient) -> Self {
        Self {
            client,
            script: Script::new(CHECK_AND_SET_SCRIPT),
        }
    }
}

#[async_trait]
impl TimestampStore for RedisTimestampStore {
    async fn get_timestamp(&self, key: &str) -> AppResult<Option<f64>> {
        let value: Option<String> = self.client.get(key).await?;
        Ok(value.and_then(|v| v.parse().ok()))
    }

    async fn set_timestamp(&self, key: &str, value: f64, ttl_secs: u64) -> AppResult<()> {
        self.client
            .set_ex(key, format!("{:.6}", value), ttl_secs)
            .await?;
        Ok(())
    }

    async fn server_time(&self) -> AppResult<f64> {
        Ok(self.client.server_time().await?)
    }

    async fn check_and_set(&self, key: &str, window_secs: f64, ttl_secs: u64) -> AppResult<bool> {
        let allowed: i64 = self
            .script
            .key(key)
            .arg(window_secs)
            .arg(ttl_secs)
            .invoke_async(&mut self.client.connection())
            .await?;
        Ok(allowed == 1)
    }
}

/// Store with a manually driven clock, for tests
#[derive(Clone, Default)]
pub struct MemoryTimestampStore {
    inner: Arc<Mutex<MemoryClock>>,
}

#[derive(Default)]
struct MemoryClock {
    now: f64,
    /// key -> (timestamp, expires_at)
    entries: HashMap<String, (f64, f64)>,
    unavailable: bool,
}

impl MemoryTimestampStore {
    pub fn new(start: f64) -> Self {
        let store = Self::default();
        store.with_clock(|clock| clock.now = start);
        store
    }

    pub fn advance(&self, secs: f64) {
        self.with_clock(|clock| clock.now += secs);
    }

    /// Every operation fails while set
    pub fn set_unavailable(&self, unavailable: bool) {
        self.with_clock(|clock| clock.unavailable = unavailable);
    }

    fn with_clock<T>(&self, f: impl FnOnce(&mut MemoryClock) -> T) -> T {
        let mut clock = match self.inner.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        f(&mut clock)
    }

    fn available(&self) -> AppResult<()> {
        if self.with_clock(|clock| clock.unavailable) {
            return Err(AppError::internal("timestamp store unavailable"));
        }
        Ok(())
    }
}

#[async_trait]
impl TimestampStore for MemoryTimestampStore {
    async fn get_timestamp(&self, key: &str) -> AppResult<Option<f64>> {
        self.available()?;
        Ok(self.with_clock(|clock| {
            clock
                .entries
                .get(key)
                .filter(|(_, expires_at)| *expires_at > clock.now)
                .map(|(value, _)| *value)
        }))
    }

    async fn set_timestamp(&self, key: &str, value: f64, ttl_secs: u64) -> AppResult<()> {
        self.available()?;
        self.with_clock(|clock| {
            let expires_at = clock.now + ttl_secs as f64;
            clock.entries.insert(key.to_string(), (value, expires_at));
        });
        Ok(())
    }

    async fn server_time(&self) -> AppResult<f64> {
        self.available()?;
        Ok(self.with_clock(|clock| clock.now))
    }
}

#[derive(Clone)]
pub struct RateLimiter {
    store: Arc<dyn TimestampStore>,
    config: RateLimitConfig,
    log_salt: String,
}

impl RateLimiter {
    pub fn new(
        store: Arc<dyn TimestampStore>,
        config: RateLimitConfig,
        log_salt: impl Into<String>,
    ) -> Self {
        Self {
            store,
            config,
            log_salt: log_salt.into(),
        }
    }

    /// `Err(TooManyRequests)` if this IP was let through within the window.
    /// Store failures let the request through.
    pub async fn check(&self, ip: &str) -> AppResult<()> {
        if !self.config.enabled {
            return Ok(());
        }

        let key = format!("{}{}", self.config.key_prefix, ip);
        match self
            .store
            .check_and_set(&key, self.config.window_secs, self.config.ttl_secs)
            .await
        {
            Ok(true) => Ok(()),
            Ok(false) => {
                warn!(
                    ip_hash = %log_safe_id(ip, &self.log_salt),
                    "Rate limit exceeded"
                );
                Err(AppError::TooManyRequests)
            }
            Err(e) => {
                // Fail open - allow the request
                error!(error = %e, "Rate limit check failed, allowing request");
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const START: f64 = 1_700_000_000.0;

    fn limiter(store: &MemoryTimestampStore) -> RateLimiter {
        RateLimiter::new(
            Arc::new(store.clone()),
            RateLimitConfig::default(),
            "test-salt",
        )
    }

    #[tokio::test]
    async fn test_second_request_within_window_rejected() {
        let store = MemoryTimestampStore::new(START);
        let limiter = limiter(&store);

        assert!(limiter.check("10.0.0.1").await.is_ok());
        store.advance(0.5);
        let err = limiter.check("10.0.0.1").await.unwrap_err();
        assert!(matches!(err, AppError::TooManyRequests));
    }

    #[tokio::test]
    async fn test_request_after_expiry_allowed() {
        let store = MemoryTimestampStore::new(START);
        let limiter = limiter(&store);

        assert!(limiter.check("10.0.0.1").await.is_ok());
        store.advance(0.2);
        assert!(limiter.check("10.0.0.1").await.is_err());
        store.advance(2.1);
        assert!(limiter.check("10.0.0.1").await.is_ok());
    }

    #[tokio::test]
    async fn test_rejection_does_not_extend_window() {
        let store = MemoryTimestampStore::new(START);
        let limiter = limiter(&store);

        assert!(limiter.check("10.0.0.1").await.is_ok());
        store.advance(0.9);
        assert!(limiter.check("10.0.0.1").await.is_err());
        store.advance(0.2);
        assert!(limiter.check("10.0.0.1").await.is_ok());
    }

    #[tokio::test]
    async fn test_ips_are_independent() {
        let store = MemoryTimestampStore::new(START);
        let limiter = limiter(&store);

        assert!(limiter.check("10.0.0.1").await.is_ok());
        assert!(limiter.check("10.0.0.2").await.is_ok());
        assert!(limiter.check("10.0.0.1").await.is_err());
    }

    #[tokio::test]
    async fn test_fails_open_when_store_down() {
        let store = MemoryTimestampStore::new(START);
        let limiter = limiter(&store);
        store.set_unavailable(true);

        assert!(limiter.check("10.0.0.1").await.is_ok());
        assert!(limiter.check("10.0.0.1").await.is_ok());
    }

    #[tokio::test]
    async fn test_disabled_limiter_allows_everything() {
        let store = MemoryTimestampStore::new(START);
        let config = RateLimitConfig {
            enabled: false,
            ..RateLimitConfig::default()
        };
        let limiter = RateLimiter::new(Arc::new(store), config, "salt");

        assert!(limiter.check("10.0.0.1").await.is_ok());
        assert!(limiter.check("10.0.0.1").await.is_ok());
    }

    #[tokio::test]
    async fn test_key_uses_prefix() {
        let store = MemoryTimestampStore::new(START);
        let limiter = limiter(&store);

        limiter.check("10.0.0.1").await.unwrap();
        let stored = store.get_timestamp("rate:submit:10.0.0.1").await.unwrap();
        assert_eq!(stored, Some(START));
    }

    #[tokio::test]
    #[ignore] // Requires Redis
    async fn test_redis_check_and_set() {
        let client = RedisClient::connect("redis://localhost:6379").await.unwrap();
        let store = RedisTimestampStore::new(client.clone());
        let key = "rate:test:redis_check_and_set";
        client.del(key).await.unwrap();

        assert!(store.check_and_set(key, 1.0, 2).await.unwrap());
        assert!(!store.check_and_set(key, 1.0, 2).await.unwrap());

        let recorded = store.get_timestamp(key).await.unwrap().unwrap();
        let now = store.server_time().await.unwrap();
        assert!(now - recorded < 1.0);

        client.del(key).await.unwrap();
    }
}
