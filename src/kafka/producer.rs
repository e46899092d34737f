use anyhow::{Context, Result};
use async_trait::async_trait;
use intake_config::KafkaConfig;
use intake_error::{AppError, AppResult};
use rdkafka::producer::{FutureProducer, FutureRecord, Producer};
use rdkafka::util::Timeout;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{error, info};

use super::config::create_client_config;
use crate::notifier::Publisher;

/// Kafka publisher for submission notices
///
/// Configured for:
/// - acknowledgement level from `KAFKA_PRODUCER_ACKS` (default `all`)
/// - idempotent writes within a producer session
/// - a short linger so a lone notice is not held back
///
/// When disabled, `publish` logs the record and reports success.
#[derive(Clone)]
pub struct KafkaPublisher {
    producer: Arc<FutureProducer>,
    send_timeout: Duration,
    enabled: bool,
}

impl KafkaPublisher {
    pub fn new(config: &KafkaConfig) -> Result<Self> {
        let send_timeout = Duration::from_millis(config.send_timeout_ms);

        if !config.enabled {
            info!("Kafka producer disabled (KAFKA_ENABLED=false)");
            let producer = create_client_config(config)?
                .create()
                .context("Failed to create disabled Kafka producer")?;

            return Ok(Self {
                producer: Arc::new(producer),
                send_timeout,
                enabled: false,
            });
        }

        info!("Initializing Kafka producer...");
        let mut client_config = create_client_config(config)?;

        let producer: FutureProducer = client_config
            .set("acks", &config.producer_acks)
            .set("enable.idempotence", (config.producer_acks == "all").to_string())
            .set("linger.ms", config.producer_linger_ms.to_string())
            .set(
                "request.timeout.ms",
                config.producer_request_timeout_ms.to_string(),
            )
            .set(
                "delivery.timeout.ms",
                config.producer_delivery_timeout_ms.to_string(),
            )
            .create()
            .context("Failed to create Kafka producer")?;

        info!(topic = %config.topic, "Kafka producer initialized");

        Ok(Self {
            producer: Arc::new(producer),
            send_timeout,
            enabled: true,
        })
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Wait for in-flight notices to be acknowledged (graceful shutdown)
    pub fn flush(&self, timeout: Duration) -> Result<()> {
        if !self.enabled {
            return Ok(());
        }

        info!("Flushing Kafka producer (timeout: {:?})", timeout);
        self.producer
            .flush(Timeout::After(timeout))
            .context("Failed to flush Kafka producer")?;
        info!("Kafka producer flushed successfully");
        Ok(())
    }
}

#[async_trait]
impl Publisher for KafkaPublisher {
    async fn publish(&self, topic: &str, key: &str, payload: &[u8]) -> AppResult<()> {
        if !self.enabled {
            info!(topic = %topic, key = %key, bytes = payload.len(), "Kafka disabled, notice not sent");
            return Ok(());
        }

        let record = FutureRecord::to(topic).key(key).payload(payload);
        let start = Instant::now();

        match self
            .producer
            .send(record, Timeout::After(self.send_timeout))
            .await
        {
            Ok((partition, offset)) => {
                info!(
                    partition = partition,
                    offset = offset,
                    key = %key,
                    latency_ms = start.elapsed().as_millis(),
                    "Notice published to Kafka"
                );
                Ok(())
            }
            Err((kafka_err, _)) => {
                error!(
                    error = %kafka_err,
                    topic = %topic,
                    key = %key,
                    latency_ms = start.elapsed().as_millis(),
                    "Failed to publish notice to Kafka"
                );
                Err(AppError::publish(format!("Kafka send failed: {}", kafka_err)))
            }
        }
    }
}
