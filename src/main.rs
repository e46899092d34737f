use anyhow::{Context, Result};
use intake_config::Config;
use intake_redis::RedisClient;
use intake_server::admission::AdmissionService;
use intake_server::context::AppContext;
use intake_server::db::{self, IdentityStore, PgIdentityStore};
use intake_server::kafka::KafkaPublisher;
use intake_server::models::SpamPolicy;
use intake_server::notifier::Notifier;
use intake_server::rate_limit::{RateLimiter, RedisTimestampStore};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tracing::{error, info};

const KAFKA_FLUSH_TIMEOUT: Duration = Duration::from_secs(5);

#[tokio::main]
async fn main() -> Result<()> {
    let config = Arc::new(Config::from_env()?);
    intake_server::init_tracing(&config);

    info!("=== Form Intake Server Starting ===");
    info!("Bind address: {}", config.bind_address);
    if config.debug {
        info!("Debug mode enabled");
    }

    info!("Connecting to database...");
    let db_pool = db::create_pool(&config.database_url, &config.db)
        .await
        .context("Failed to connect to database")?;

    info!("Applying database migrations...");
    sqlx::migrate!()
        .run(&db_pool)
        .await
        .context("Failed to apply database migrations")?;

    info!("Connecting to Redis...");
    let redis = RedisClient::connect(&config.redis_url)
        .await
        .context("Failed to connect to Redis")?;

    let kafka = KafkaPublisher::new(&config.kafka)?;

    let store: Arc<dyn IdentityStore> = Arc::new(PgIdentityStore::new(db_pool.clone()));
    let notifier = Notifier::new(Arc::new(kafka.clone()), config.kafka.topic.clone());
    let admission = AdmissionService::new(
        store.clone(),
        notifier,
        SpamPolicy::from(&config.spam),
        config.secret_key.clone(),
    );
    let rate_limiter = RateLimiter::new(
        Arc::new(RedisTimestampStore::new(redis)),
        config.rate_limit.clone(),
        config.secret_key.clone(),
    );

    let app_context = Arc::new(AppContext::new(
        config.clone(),
        store,
        admission,
        rate_limiter,
    ));

    let listener = TcpListener::bind(&config.bind_address)
        .await
        .with_context(|| format!("Failed to bind to {}", config.bind_address))?;
    info!("Listening on {}", config.bind_address);

    intake_server::serve(app_context, listener, intake_server::shutdown_signal()).await?;

    if let Err(e) = kafka.flush(KAFKA_FLUSH_TIMEOUT) {
        error!(error = %e, "Kafka flush failed during shutdown");
    }
    db_pool.close().await;

    info!("Shutdown complete");
    Ok(())
}
