// ============================================================================
// Notifier
// ============================================================================
//
// Turns an accepted client into a `SubmissionNotice` and hands the bytes to a
// `Publisher`. Kafka is the production publisher; tests record in memory.
//
// ============================================================================

use async_trait::async_trait;
use intake_error::{AppError, AppResult};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use crate::kafka::SubmissionNotice;
use crate::models::Client;

/// Outbound queue seam
#[async_trait]
pub trait Publisher: Send + Sync {
    async fn publish(&self, topic: &str, key: &str, payload: &[u8]) -> AppResult<()>;
}

#[derive(Clone)]
pub struct Notifier {
    publisher: Arc<dyn Publisher>,
    topic: String,
}

impl Notifier {
    pub fn new(publisher: Arc<dyn Publisher>, topic: impl Into<String>) -> Self {
        Self {
            publisher,
            topic: topic.into(),
        }
    }

    /// Publish a notice for a newly accepted client
    pub async fn notify(&self, client: &Client) -> AppResult<()> {
        let notice = SubmissionNotice::from(client);
        let payload = serde_json::to_vec(&notice)?;
        self.publisher
            .publish(&self.topic, &notice.key(), &payload)
            .await
    }
}

/// A record captured by `RecordingPublisher`
#[derive(Debug, Clone)]
pub struct PublishedRecord {
    pub topic: String,
    pub key: String,
    pub payload: Vec<u8>,
}

impl PublishedRecord {
    pub fn notice(&self) -> serde_json::Result<SubmissionNotice> {
        serde_json::from_slice(&self.payload)
    }
}

/// In-memory publisher for tests and broker-less local runs
#[derive(Clone, Default)]
pub struct RecordingPublisher {
    records: Arc<Mutex<Vec<PublishedRecord>>>,
    failing: Arc<AtomicBool>,
}

impl RecordingPublisher {
    pub fn new() -> Self {
        Self::default()
    }

    /// While set, every publish fails with a publish error
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn records(&self) -> Vec<PublishedRecord> {
        self.records
            .lock()
            .map(|records| records.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl Publisher for RecordingPublisher {
    async fn publish(&self, topic: &str, key: &str, payload: &[u8]) -> AppResult<()> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(AppError::publish("Broker unavailable"));
        }

        let mut records = self
            .records
            .lock()
            .map_err(|_| AppError::internal("publisher lock poisoned"))?;
        records.push(PublishedRecord {
            topic: topic.to_string(),
            key: key.to_string(),
            payload: payload.to_vec(),
        });
        Ok(())
    }
}
