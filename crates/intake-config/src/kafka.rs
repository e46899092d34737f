// ============================================================================
// Kafka Configuration
// ============================================================================

use crate::constants::DEFAULT_NOTIFY_TOPIC;

/// Kafka configuration for submission notifications
#[derive(Clone, Debug)]
pub struct KafkaConfig {
    /// Whether Kafka is enabled (false = log-only mode for local development)
    pub enabled: bool,
    /// Comma-separated list of Kafka brokers (e.g., "kafka1:9092,kafka2:9092")
    pub brokers: String,
    /// Topic the notification bot consumes
    pub topic: String,
    /// SSL/TLS enabled
    pub ssl_enabled: bool,
    /// SASL mechanism (e.g., "SCRAM-SHA-256", "PLAIN")
    pub sasl_mechanism: Option<String>,
    /// SASL username
    pub sasl_username: Option<String>,
    /// SASL password
    pub sasl_password: Option<String>,
    /// Upper bound on a single publish call, including enqueue wait
    pub send_timeout_ms: u64,
    // producer-specific settings
    pub producer_acks: String, // "all" | "1" | "0"
    pub producer_linger_ms: u32,
    pub producer_request_timeout_ms: u32,
    pub producer_delivery_timeout_ms: u32,
}

impl KafkaConfig {
    /// `brokers` comes from the top-level `KAFKA_URL`
    pub(crate) fn from_env(brokers: String) -> Self {
        Self {
            enabled: std::env::var("KAFKA_ENABLED")
                .unwrap_or_else(|_| "true".to_string())
                .parse()
                .unwrap_or(true),
            brokers,
            topic: std::env::var("KAFKA_TOPIC")
                .unwrap_or_else(|_| DEFAULT_NOTIFY_TOPIC.to_string()),
            ssl_enabled: std::env::var("KAFKA_SSL_ENABLED")
                .unwrap_or_else(|_| "false".to_string())
                .parse()
                .unwrap_or(false),
            sasl_mechanism: std::env::var("KAFKA_SASL_MECHANISM").ok(),
            sasl_username: std::env::var("KAFKA_SASL_USERNAME").ok(),
            sasl_password: std::env::var("KAFKA_SASL_PASSWORD").ok(),
            send_timeout_ms: std::env::var("KAFKA_SEND_TIMEOUT_MS")
                .unwrap_or_else(|_| "5000".to_string())
                .parse()
                .unwrap_or(5000),
            producer_acks: std::env::var("KAFKA_PRODUCER_ACKS")
                .unwrap_or_else(|_| "all".to_string()),
            producer_linger_ms: std::env::var("KAFKA_PRODUCER_LINGER_MS")
                .unwrap_or_else(|_| "5".to_string())
                .parse()
                .unwrap_or(5),
            producer_request_timeout_ms: std::env::var("KAFKA_PRODUCER_REQUEST_TIMEOUT_MS")
                .unwrap_or_else(|_| "30000".to_string())
                .parse()
                .unwrap_or(30000),
            producer_delivery_timeout_ms: std::env::var("KAFKA_PRODUCER_DELIVERY_TIMEOUT_MS")
                .unwrap_or_else(|_| "120000".to_string())
                .parse()
                .unwrap_or(120000),
        }
    }

    /// Disabled configuration pointing at a local broker, used by tests and dev setups
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            brokers: "localhost:9092".to_string(),
            topic: DEFAULT_NOTIFY_TOPIC.to_string(),
            ssl_enabled: false,
            sasl_mechanism: None,
            sasl_username: None,
            sasl_password: None,
            send_timeout_ms: 5000,
            producer_acks: "all".to_string(),
            producer_linger_ms: 5,
            producer_request_timeout_ms: 30000,
            producer_delivery_timeout_ms: 120000,
        }
    }
}
