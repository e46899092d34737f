// ============================================================================
// Configuration Constants
// ============================================================================

// Listener defaults
pub(crate) const DEFAULT_LISTEN_ADDR: &str = "0.0.0.0";
pub(crate) const DEFAULT_LISTEN_PORT: u16 = 8000;

// Rate limiting defaults (in seconds)
pub(crate) const DEFAULT_RATE_LIMIT_WINDOW_SECS: f64 = 1.0;
pub(crate) const DEFAULT_RATE_LIMIT_TTL_SECS: u64 = 2;

// Submissions above this count flag a client or address as spam
pub(crate) const DEFAULT_SPAM_THRESHOLD: i32 = 5;

// Topic the notification bot consumes
pub(crate) const DEFAULT_NOTIFY_TOPIC: &str = "telegram-newclient-notify";

// Form field limits
pub const MIN_NAME_LENGTH: usize = 2;
pub const MAX_NAME_LENGTH: usize = 50;
pub const PHONE_LENGTH: usize = 11;

// A contact form never needs more than this
pub const MAX_REQUEST_BODY_SIZE: usize = 64 * 1024; // 64 KB
