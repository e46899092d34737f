// ============================================================================
// Rate Limiting & Spam Configuration
// ============================================================================

use crate::constants::{
    DEFAULT_RATE_LIMIT_TTL_SECS, DEFAULT_RATE_LIMIT_WINDOW_SECS, DEFAULT_SPAM_THRESHOLD,
};

/// Per-IP submission throttle
#[derive(Clone, Debug)]
pub struct RateLimitConfig {
    pub enabled: bool,
    /// Minimum spacing between two requests from one IP (seconds, fractional allowed)
    pub window_secs: f64,
    /// Expiry of the "last seen" marker (seconds)
    pub ttl_secs: u64,
    /// Redis key prefix: "{prefix}{ip}"
    pub key_prefix: String,
}

impl RateLimitConfig {
    pub(crate) fn from_env() -> Self {
        Self {
            enabled: std::env::var("RATE_LIMIT_ENABLED")
                .unwrap_or_else(|_| "true".to_string())
                .parse()
                .unwrap_or(true),
            window_secs: std::env::var("RATE_LIMIT_WINDOW_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(DEFAULT_RATE_LIMIT_WINDOW_SECS),
            ttl_secs: std::env::var("RATE_LIMIT_TTL_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(DEFAULT_RATE_LIMIT_TTL_SECS),
            key_prefix: std::env::var("RATE_LIMIT_KEY_PREFIX")
                .unwrap_or_else(|_| "rate:submit:".to_string()),
        }
        .checked()
    }

    /// The marker must outlive the window, and Redis rejects `EX 0`.
    /// Bad combinations fall back to the defaults.
    fn checked(mut self) -> Self {
        if !self.window_secs.is_finite() || self.window_secs <= 0.0 {
            tracing::warn!(
                window_secs = self.window_secs,
                "RATE_LIMIT_WINDOW_SECS must be positive, using default"
            );
            self.window_secs = DEFAULT_RATE_LIMIT_WINDOW_SECS;
        }

        if self.ttl_secs < 1 || (self.ttl_secs as f64) < self.window_secs {
            tracing::warn!(
                ttl_secs = self.ttl_secs,
                window_secs = self.window_secs,
                "RATE_LIMIT_TTL_SECS must be at least 1 and not shorter than the window, using defaults"
            );
            self.window_secs = DEFAULT_RATE_LIMIT_WINDOW_SECS;
            self.ttl_secs = DEFAULT_RATE_LIMIT_TTL_SECS;
        }

        self
    }
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            window_secs: DEFAULT_RATE_LIMIT_WINDOW_SECS,
            ttl_secs: DEFAULT_RATE_LIMIT_TTL_SECS,
            key_prefix: "rate:submit:".to_string(),
        }
    }
}

/// Spam flagging policy shared by clients and addresses
#[derive(Clone, Debug)]
pub struct SpamConfig {
    /// A counter strictly above this value marks the record as spam
    pub threshold: i32,
}

impl SpamConfig {
    pub(crate) fn from_env() -> Self {
        Self {
            threshold: std::env::var("SPAM_THRESHOLD")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(DEFAULT_SPAM_THRESHOLD),
        }
    }
}

impl Default for SpamConfig {
    fn default() -> Self {
        Self {
            threshold: DEFAULT_SPAM_THRESHOLD,
        }
    }
}
