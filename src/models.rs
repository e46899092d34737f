// ============================================================================
// Identity Data Model
// ============================================================================
//
// Clients (form submitters) and Addresses (submitting IPs) are created lazily,
// never deleted, and their counters only grow. The many-to-many link lives in
// `client_addresses`, keyed by the (client_id, address_id) pair.
//
// ============================================================================

use chrono::{DateTime, Utc};
use intake_config::SpamConfig;
use serde::Serialize;
use uuid::Uuid;

/// A form submitter, identified by phone and/or email
#[derive(Debug, Clone, PartialEq, Serialize, sqlx::FromRow)]
pub struct Client {
    pub id: Uuid,
    pub created_at: DateTime<Utc>,
    pub name: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub message: Option<String>,
    pub submission_amount: i32,
    pub is_spam: bool,
}

/// A submitting IP, tracked independently of clients for abuse correlation
#[derive(Debug, Clone, PartialEq, Serialize, sqlx::FromRow)]
pub struct Address {
    pub id: Uuid,
    pub created_at: DateTime<Utc>,
    pub ip: String,
    pub submission_amount: i32,
    pub is_spam: bool,
}

/// Normalized fields of a submission that passed validation.
/// At least one of `phone` / `email` is always present.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewClient {
    pub name: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub message: Option<String>,
}

/// Outcome of inserting a client under the phone/email uniqueness rules
#[derive(Debug, Clone, PartialEq)]
pub enum ClientCreation {
    Created(Client),
    /// Another row already owns this phone or email
    AlreadyExists,
}

/// Client row joined with the IPs it has submitted from (admin listing)
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct ClientListing {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub client: Client,
    pub ips: Vec<String>,
}

/// Threshold rule shared by clients and addresses
#[derive(Debug, Clone, Copy)]
pub struct SpamPolicy {
    threshold: i32,
}

impl SpamPolicy {
    pub fn new(threshold: i32) -> Self {
        Self { threshold }
    }

    /// A counter strictly above the threshold is spam
    pub fn exceeded(&self, submission_amount: i32) -> bool {
        submission_amount > self.threshold
    }
}

impl From<&SpamConfig> for SpamPolicy {
    fn from(config: &SpamConfig) -> Self {
        Self::new(config.threshold)
    }
}

impl Default for SpamPolicy {
    fn default() -> Self {
        Self::from(&SpamConfig::default())
    }
}
