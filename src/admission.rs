// ============================================================================
// Admission Workflow
// ============================================================================
//
// validate -> find submitter -> count -> track IP -> flag spam -> link ->
// commit -> publish (new submitters only)
//
// Identity changes are committed before publishing, so a failed publish
// still leaves the counters updated.
//
// ============================================================================

use intake_error::{AppError, AppResult};
use std::sync::Arc;
use tracing::{info, warn};

use crate::db::{IdentityStore, IdentityTx};
use crate::models::{Client, ClientCreation, NewClient, SpamPolicy};
use crate::notifier::Notifier;
use crate::utils::log_safe_id;
use crate::validation::SubmissionForm;

/// What happened to a submission that passed validation
#[derive(Debug, Clone, PartialEq)]
pub enum Admission {
    /// First time this submitter is seen; a notice was published
    Accepted(Client),
    /// Known submitter; counters were bumped, nothing was published
    Duplicate(Client),
}

impl Admission {
    pub fn client(&self) -> &Client {
        match self {
            Admission::Accepted(client) | Admission::Duplicate(client) => client,
        }
    }
}

#[derive(Clone)]
pub struct AdmissionService {
    store: Arc<dyn IdentityStore>,
    notifier: Notifier,
    policy: SpamPolicy,
    log_salt: String,
}

impl AdmissionService {
    pub fn new(
        store: Arc<dyn IdentityStore>,
        notifier: Notifier,
        policy: SpamPolicy,
        log_salt: impl Into<String>,
    ) -> Self {
        Self {
            store,
            notifier,
            policy,
            log_salt: log_salt.into(),
        }
    }

    pub async fn submit(&self, form: SubmissionForm, ip: &str) -> AppResult<Admission> {
        let new_client = form.normalize()?;
        let admission = self.resolve(&new_client, ip).await?;

        if let Admission::Accepted(client) = &admission {
            self.notifier.notify(client).await.map_err(|e| {
                warn!(
                    client_id = %client.id,
                    error = %e,
                    "Submission stored but notification failed"
                );
                match e {
                    AppError::Publish(_) => e,
                    other => AppError::publish(other.to_string()),
                }
            })?;
        }

        Ok(admission)
    }

    /// Runs the identity mutations as one transaction
    async fn resolve(&self, new_client: &NewClient, ip: &str) -> AppResult<Admission> {
        let mut tx = self.store.begin().await?;
        let phone = new_client.phone.as_deref();
        let email = new_client.email.as_deref();

        let admission = match tx.find_client_by_phone_or_email(phone, email).await? {
            Some(existing) => Admission::Duplicate(self.record_repeat(&mut tx, existing).await?),
            None => match tx.create_client(new_client).await? {
                ClientCreation::Created(client) => Admission::Accepted(client),
                ClientCreation::AlreadyExists => {
                    // Lost the insert race; the winner's row is visible now
                    let existing = tx
                        .find_client_by_phone_or_email(phone, email)
                        .await?
                        .ok_or_else(|| {
                            AppError::internal("client reported as existing but not found")
                        })?;
                    Admission::Duplicate(self.record_repeat(&mut tx, existing).await?)
                }
            },
        };

        let client = admission.client();

        let address = tx.create_or_increment_address(ip).await?;
        if self.policy.exceeded(address.submission_amount) && !address.is_spam {
            tx.flag_address_spam(address.id).await?;
            warn!(
                ip_hash = %log_safe_id(ip, &self.log_salt),
                submissions = address.submission_amount,
                "Address flagged as spam"
            );
        }

        tx.link_if_absent(client.id, address.id).await?;
        tx.commit().await?;

        match &admission {
            Admission::Accepted(client) => info!(
                client_id = %client.id,
                ip_hash = %log_safe_id(ip, &self.log_salt),
                "New submitter accepted"
            ),
            Admission::Duplicate(client) => info!(
                client_id = %client.id,
                ip_hash = %log_safe_id(ip, &self.log_salt),
                submissions = client.submission_amount,
                "Repeat submission"
            ),
        }

        Ok(admission)
    }

    async fn record_repeat(
        &self,
        tx: &mut Box<dyn IdentityTx>,
        existing: Client,
    ) -> AppResult<Client> {
        let mut client = tx.increment_client(existing.id).await?;
        if self.policy.exceeded(client.submission_amount) && !client.is_spam {
            tx.flag_client_spam(client.id).await?;
            client.is_spam = true;
            warn!(
                client_id = %client.id,
                submissions = client.submission_amount,
                "Client flagged as spam"
            );
        }
        Ok(client)
    }
}
