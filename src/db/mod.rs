// ============================================================================
// Identity Store
// ============================================================================
//
// All mutations of a single submission go through one `IdentityTx`. Dropping
// a transaction without `commit` discards everything it did.
//
// Implementations:
// - `postgres::PgIdentityStore` - production, unique indexes + ON CONFLICT
// - `memory::MemoryIdentityStore` - tests and local runs without Postgres
//
// ============================================================================

pub mod memory;
pub mod postgres;

use anyhow::Result;
use async_trait::async_trait;
use intake_config::DbConfig;
use intake_error::AppResult;
use sqlx::postgres::PgPoolOptions;
use sqlx::{Pool, Postgres};
use std::time::Duration;
use uuid::Uuid;

use crate::models::{Address, Client, ClientCreation, ClientListing, NewClient};

pub use memory::MemoryIdentityStore;
pub use postgres::PgIdentityStore;

pub type DbPool = Pool<Postgres>;

pub async fn create_pool(database_url: &str, db_config: &DbConfig) -> Result<DbPool> {
    let pool = PgPoolOptions::new()
        .max_connections(db_config.max_connections)
        .acquire_timeout(Duration::from_secs(db_config.acquire_timeout_secs))
        .idle_timeout(Some(Duration::from_secs(db_config.idle_timeout_secs)))
        .test_before_acquire(true)
        .connect(database_url)
        .await?;

    Ok(pool)
}

/// Entry point to client/address storage
#[async_trait]
pub trait IdentityStore: Send + Sync {
    /// Open a unit of work
    async fn begin(&self) -> AppResult<Box<dyn IdentityTx>>;

    /// Clients ordered by creation time, with the IPs each one used
    async fn list_clients(&self, skip: i64, limit: i64) -> AppResult<Vec<ClientListing>>;
}

/// One transaction over the identity tables
#[async_trait]
pub trait IdentityTx: Send {
    /// Phone match wins; email is only consulted when phone finds nothing
    async fn find_client_by_phone_or_email(
        &mut self,
        phone: Option<&str>,
        email: Option<&str>,
    ) -> AppResult<Option<Client>>;

    /// Insert with `submission_amount = 1`. Yields `AlreadyExists` instead of
    /// an error when the phone or email is taken.
    async fn create_client(&mut self, new_client: &NewClient) -> AppResult<ClientCreation>;

    /// Bump `submission_amount` and return the updated row
    async fn increment_client(&mut self, client_id: Uuid) -> AppResult<Client>;

    async fn flag_client_spam(&mut self, client_id: Uuid) -> AppResult<()>;

    /// Insert the IP with count 1, or bump the existing row's count
    async fn create_or_increment_address(&mut self, ip: &str) -> AppResult<Address>;

    async fn flag_address_spam(&mut self, address_id: Uuid) -> AppResult<()>;

    /// Returns true if a new link row was written
    async fn link_if_absent(&mut self, client_id: Uuid, address_id: Uuid) -> AppResult<bool>;

    async fn commit(self: Box<Self>) -> AppResult<()>;
}
