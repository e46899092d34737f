// Kafka module for submission notifications
//
// Accepted submissions are published as JSON to the topic the notification
// bot consumes. Delivery is at-least-once; the bot tolerates duplicates.

pub mod config;
pub mod producer;
pub mod types;

// Re-export commonly used types
pub use producer::KafkaPublisher;
pub use types::SubmissionNotice;
