use async_trait::async_trait;
use intake_error::{AppError, AppResult};
use sqlx::{Postgres, Transaction};
use uuid::Uuid;

use super::{DbPool, IdentityStore, IdentityTx};
use crate::models::{Address, Client, ClientCreation, ClientListing, NewClient};

const CLIENT_COLUMNS: &str =
    "id, created_at, name, phone, email, message, submission_amount, is_spam";

/// PostgreSQL implementation of IdentityStore
#[derive(Clone)]
pub struct PgIdentityStore {
    pool: DbPool,
}

impl PgIdentityStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl IdentityStore for PgIdentityStore {
    async fn begin(&self) -> AppResult<Box<dyn IdentityTx>> {
        let tx = self.pool.begin().await?;
        Ok(Box::new(PgIdentityTx { tx }))
    }

    async fn list_clients(&self, skip: i64, limit: i64) -> AppResult<Vec<ClientListing>> {
        let rows = sqlx::query_as::<_, ClientListing>(
            r#"
            SELECT c.id, c.created_at, c.name, c.phone, c.email, c.message,
                   c.submission_amount, c.is_spam,
                   COALESCE(
                       array_agg(a.ip::text ORDER BY a.ip) FILTER (WHERE a.ip IS NOT NULL),
                       ARRAY[]::text[]
                   ) AS ips
            FROM clients c
            LEFT JOIN client_addresses ca ON ca.client_id = c.id
            LEFT JOIN addresses a ON a.id = ca.address_id
            GROUP BY c.id
            ORDER BY c.created_at, c.id
            OFFSET $1
            LIMIT $2
            "#,
        )
        .bind(skip)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }
}

pub struct PgIdentityTx {
    tx: Transaction<'static, Postgres>,
}

impl PgIdentityTx {
    async fn client_by(&mut self, column: &str, value: &str) -> AppResult<Option<Client>> {
        // `column` is always one of our own literals
        let sql = format!("SELECT {CLIENT_COLUMNS} FROM clients WHERE {column} = $1");
        let client = sqlx::query_as::<_, Client>(&sql)
            .bind(value)
            .fetch_optional(&mut *self.tx)
            .await?;
        Ok(client)
    }
}

#[async_trait]
impl IdentityTx for PgIdentityTx {
    async fn find_client_by_phone_or_email(
        &mut self,
        phone: Option<&str>,
        email: Option<&str>,
    ) -> AppResult<Option<Client>> {
        if let Some(phone) = phone {
            if let Some(client) = self.client_by("phone", phone).await? {
                return Ok(Some(client));
            }
        }
        match email {
            Some(email) => self.client_by("email", email).await,
            None => Ok(None),
        }
    }

    async fn create_client(&mut self, new_client: &NewClient) -> AppResult<ClientCreation> {
        // No conflict target: a clash on either unique index means the
        // submitter is already known.
        let sql = format!(
            r#"
            INSERT INTO clients (id, name, phone, email, message, submission_amount, is_spam)
            VALUES ($1, $2, $3, $4, $5, 1, FALSE)
            ON CONFLICT DO NOTHING
            RETURNING {CLIENT_COLUMNS}
            "#
        );
        let created = sqlx::query_as::<_, Client>(&sql)
            .bind(Uuid::new_v4())
            .bind(&new_client.name)
            .bind(&new_client.phone)
            .bind(&new_client.email)
            .bind(&new_client.message)
            .fetch_optional(&mut *self.tx)
            .await?;

        Ok(match created {
            Some(client) => ClientCreation::Created(client),
            None => ClientCreation::AlreadyExists,
        })
    }

    async fn increment_client(&mut self, client_id: Uuid) -> AppResult<Client> {
        let sql = format!(
            r#"
            UPDATE clients
            SET submission_amount = submission_amount + 1
            WHERE id = $1
            RETURNING {CLIENT_COLUMNS}
            "#
        );
        sqlx::query_as::<_, Client>(&sql)
            .bind(client_id)
            .fetch_optional(&mut *self.tx)
            .await?
            .ok_or_else(|| AppError::internal(format!("client {} vanished", client_id)))
    }

    async fn flag_client_spam(&mut self, client_id: Uuid) -> AppResult<()> {
        sqlx::query("UPDATE clients SET is_spam = TRUE WHERE id = $1")
            .bind(client_id)
            .execute(&mut *self.tx)
            .await?;
        Ok(())
    }

    async fn create_or_increment_address(&mut self, ip: &str) -> AppResult<Address> {
        let address = sqlx::query_as::<_, Address>(
            r#"
            INSERT INTO addresses (id, ip, submission_amount, is_spam)
            VALUES ($1, $2, 1, FALSE)
            ON CONFLICT (ip) DO UPDATE
                SET submission_amount = addresses.submission_amount + 1
            RETURNING id, created_at, ip, submission_amount, is_spam
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(ip)
        .fetch_one(&mut *self.tx)
        .await?;

        Ok(address)
    }

    async fn flag_address_spam(&mut self, address_id: Uuid) -> AppResult<()> {
        sqlx::query("UPDATE addresses SET is_spam = TRUE WHERE id = $1")
            .bind(address_id)
            .execute(&mut *self.tx)
            .await?;
        Ok(())
    }

    async fn link_if_absent(&mut self, client_id: Uuid, address_id: Uuid) -> AppResult<bool> {
        let result = sqlx::query(
            r#"
            INSERT INTO client_addresses (client_id, address_id)
            VALUES ($1, $2)
            ON CONFLICT (client_id, address_id) DO NOTHING
            "#,
        )
        .bind(client_id)
        .bind(address_id)
        .execute(&mut *self.tx)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    async fn commit(self: Box<Self>) -> AppResult<()> {
        self.tx.commit().await?;
        Ok(())
    }
}
