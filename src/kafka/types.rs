use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::Client;

/// Message consumed by the notification bot for every accepted submission.
///
/// Field names match the form payload so the bot can render it as-is.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubmissionNotice {
    pub client_id: Uuid,
    pub name: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub message: Option<String>,
    pub submitted_at: DateTime<Utc>,
}

impl From<&Client> for SubmissionNotice {
    fn from(client: &Client) -> Self {
        Self {
            client_id: client.id,
            name: client.name.clone(),
            phone: client.phone.clone(),
            email: client.email.clone(),
            message: client.message.clone(),
            submitted_at: client.created_at,
        }
    }
}

impl SubmissionNotice {
    /// Partition key; keeps notices about one client in order
    pub fn key(&self) -> String {
        self.client_id.to_string()
    }
}
