//! In-memory identity store.
//!
//! A transaction holds the store lock from `begin` to commit/drop and works
//! on a staged copy, so transactions are serialized and an uncommitted one
//! leaves no trace.

use async_trait::async_trait;
use chrono::Utc;
use intake_error::{AppError, AppResult};
use std::collections::BTreeSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::{Mutex, OwnedMutexGuard};
use uuid::Uuid;

use super::{IdentityStore, IdentityTx};
use crate::models::{Address, Client, ClientCreation, ClientListing, NewClient};

/// Committed contents of the store
#[derive(Debug, Clone, Default)]
pub struct MemoryState {
    pub clients: Vec<Client>,
    pub addresses: Vec<Address>,
    pub links: BTreeSet<(Uuid, Uuid)>,
}

impl MemoryState {
    pub fn client_by_phone(&self, phone: &str) -> Option<&Client> {
        self.clients.iter().find(|c| c.phone.as_deref() == Some(phone))
    }

    pub fn client_by_email(&self, email: &str) -> Option<&Client> {
        self.clients.iter().find(|c| c.email.as_deref() == Some(email))
    }

    pub fn address_by_ip(&self, ip: &str) -> Option<&Address> {
        self.addresses.iter().find(|a| a.ip == ip)
    }

    fn client_mut(&mut self, client_id: Uuid) -> AppResult<&mut Client> {
        self.clients
            .iter_mut()
            .find(|c| c.id == client_id)
            .ok_or_else(|| AppError::internal(format!("client {} not found", client_id)))
    }

    fn address_mut(&mut self, address_id: Uuid) -> AppResult<&mut Address> {
        self.addresses
            .iter_mut()
            .find(|a| a.id == address_id)
            .ok_or_else(|| AppError::internal(format!("address {} not found", address_id)))
    }

    fn conflicts(&self, new_client: &NewClient) -> bool {
        new_client
            .phone
            .as_deref()
            .is_some_and(|p| self.client_by_phone(p).is_some())
            || new_client
                .email
                .as_deref()
                .is_some_and(|e| self.client_by_email(e).is_some())
    }

    fn insert_client(&mut self, new_client: &NewClient) -> Client {
        let client = Client {
            id: Uuid::new_v4(),
            created_at: Utc::now(),
            name: new_client.name.clone(),
            phone: new_client.phone.clone(),
            email: new_client.email.clone(),
            message: new_client.message.clone(),
            submission_amount: 1,
            is_spam: false,
        };
        self.clients.push(client.clone());
        client
    }
}

#[derive(Clone, Default)]
pub struct MemoryIdentityStore {
    state: Arc<Mutex<MemoryState>>,
    fail_links: Arc<AtomicBool>,
    preempt_create: Arc<AtomicBool>,
}

impl MemoryIdentityStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of the committed state
    pub async fn snapshot(&self) -> MemoryState {
        self.state.lock().await.clone()
    }

    /// Make every `link_if_absent` fail, to exercise rollback
    pub fn fail_links(&self, fail: bool) {
        self.fail_links.store(fail, Ordering::SeqCst);
    }

    /// The next `create_client` behaves as if a concurrent writer inserted
    /// the same identity just before it: the row appears and the call
    /// reports `AlreadyExists`.
    pub fn preempt_next_create(&self) {
        self.preempt_create.store(true, Ordering::SeqCst);
    }
}

#[async_trait]
impl IdentityStore for MemoryIdentityStore {
    async fn begin(&self) -> AppResult<Box<dyn IdentityTx>> {
        let guard = Arc::clone(&self.state).lock_owned().await;
        let staged = guard.clone();
        Ok(Box::new(MemoryIdentityTx {
            guard,
            staged,
            fail_links: self.fail_links.load(Ordering::SeqCst),
            preempt_create: Arc::clone(&self.preempt_create),
        }))
    }

    async fn list_clients(&self, skip: i64, limit: i64) -> AppResult<Vec<ClientListing>> {
        let state = self.state.lock().await;

        let mut clients = state.clients.clone();
        clients.sort_by_key(|c| (c.created_at, c.id));

        let listings = clients
            .into_iter()
            .skip(skip.max(0) as usize)
            .take(limit.max(0) as usize)
            .map(|client| {
                let mut ips: Vec<String> = state
                    .links
                    .iter()
                    .filter(|(client_id, _)| *client_id == client.id)
                    .filter_map(|(_, address_id)| {
                        state.addresses.iter().find(|a| a.id == *address_id)
                    })
                    .map(|a| a.ip.clone())
                    .collect();
                ips.sort();
                ClientListing { client, ips }
            })
            .collect();

        Ok(listings)
    }
}

pub struct MemoryIdentityTx {
    guard: OwnedMutexGuard<MemoryState>,
    staged: MemoryState,
    fail_links: bool,
    preempt_create: Arc<AtomicBool>,
}

#[async_trait]
impl IdentityTx for MemoryIdentityTx {
    async fn find_client_by_phone_or_email(
        &mut self,
        phone: Option<&str>,
        email: Option<&str>,
    ) -> AppResult<Option<Client>> {
        let by_phone = phone.and_then(|p| self.staged.client_by_phone(p));
        let found = by_phone.or_else(|| email.and_then(|e| self.staged.client_by_email(e)));
        Ok(found.cloned())
    }

    async fn create_client(&mut self, new_client: &NewClient) -> AppResult<ClientCreation> {
        if self.preempt_create.swap(false, Ordering::SeqCst) {
            self.staged.insert_client(new_client);
            return Ok(ClientCreation::AlreadyExists);
        }

        if self.staged.conflicts(new_client) {
            return Ok(ClientCreation::AlreadyExists);
        }

        Ok(ClientCreation::Created(self.staged.insert_client(new_client)))
    }

    async fn increment_client(&mut self, client_id: Uuid) -> AppResult<Client> {
        let client = self.staged.client_mut(client_id)?;
        client.submission_amount += 1;
        Ok(client.clone())
    }

    async fn flag_client_spam(&mut self, client_id: Uuid) -> AppResult<()> {
        self.staged.client_mut(client_id)?.is_spam = true;
        Ok(())
    }

    async fn create_or_increment_address(&mut self, ip: &str) -> AppResult<Address> {
        if let Some(address) = self.staged.addresses.iter_mut().find(|a| a.ip == ip) {
            address.submission_amount += 1;
            return Ok(address.clone());
        }

        let address = Address {
            id: Uuid::new_v4(),
            created_at: Utc::now(),
            ip: ip.to_string(),
            submission_amount: 1,
            is_spam: false,
        };
        self.staged.addresses.push(address.clone());
        Ok(address)
    }

    async fn flag_address_spam(&mut self, address_id: Uuid) -> AppResult<()> {
        self.staged.address_mut(address_id)?.is_spam = true;
        Ok(())
    }

    async fn link_if_absent(&mut self, client_id: Uuid, address_id: Uuid) -> AppResult<bool> {
        if self.fail_links {
            return Err(AppError::internal("link write failed"));
        }
        Ok(self.staged.links.insert((client_id, address_id)))
    }

    async fn commit(self: Box<Self>) -> AppResult<()> {
        let MemoryIdentityTx {
            mut guard, staged, ..
        } = *self;
        *guard = staged;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_client(phone: Option<&str>, email: Option<&str>) -> NewClient {
        NewClient {
            name: Some("Ivan".to_string()),
            phone: phone.map(str::to_string),
            email: email.map(str::to_string),
            message: None,
        }
    }

    #[tokio::test]
    async fn test_uncommitted_changes_are_discarded() {
        let store = MemoryIdentityStore::new();

        let mut tx = store.begin().await.unwrap();
        tx.create_client(&new_client(Some("79991234567"), None))
            .await
            .unwrap();
        tx.create_or_increment_address("10.0.0.1").await.unwrap();
        drop(tx);

        let state = store.snapshot().await;
        assert!(state.clients.is_empty());
        assert!(state.addresses.is_empty());
    }

    #[tokio::test]
    async fn test_unique_phone_and_email() {
        let store = MemoryIdentityStore::new();
        let mut tx = store.begin().await.unwrap();

        let first = tx
            .create_client(&new_client(Some("79991234567"), Some("a@example.com")))
            .await
            .unwrap();
        assert!(matches!(first, ClientCreation::Created(_)));

        let same_phone = tx
            .create_client(&new_client(Some("79991234567"), None))
            .await
            .unwrap();
        assert_eq!(same_phone, ClientCreation::AlreadyExists);

        let same_email = tx
            .create_client(&new_client(None, Some("a@example.com")))
            .await
            .unwrap();
        assert_eq!(same_email, ClientCreation::AlreadyExists);

        tx.commit().await.unwrap();
        assert_eq!(store.snapshot().await.clients.len(), 1);
    }

    #[tokio::test]
    async fn test_phone_lookup_preferred_over_email() {
        let store = MemoryIdentityStore::new();
        let mut tx = store.begin().await.unwrap();

        tx.create_client(&new_client(Some("79990000001"), Some("first@example.com")))
            .await
            .unwrap();
        tx.create_client(&new_client(Some("79990000002"), Some("second@example.com")))
            .await
            .unwrap();

        let found = tx
            .find_client_by_phone_or_email(Some("79990000002"), Some("first@example.com"))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(found.phone.as_deref(), Some("79990000002"));

        let found = tx
            .find_client_by_phone_or_email(Some("79990000009"), Some("first@example.com"))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(found.phone.as_deref(), Some("79990000001"));
    }

    #[tokio::test]
    async fn test_address_upsert_and_links() {
        let store = MemoryIdentityStore::new();
        let mut tx = store.begin().await.unwrap();

        let ClientCreation::Created(client) = tx
            .create_client(&new_client(Some("79991234567"), None))
            .await
            .unwrap()
        else {
            panic!("expected a new client");
        };

        let first = tx.create_or_increment_address("10.0.0.1").await.unwrap();
        let second = tx.create_or_increment_address("10.0.0.1").await.unwrap();
        assert_eq!(first.id, second.id);
        assert_eq!(second.submission_amount, 2);

        assert!(tx.link_if_absent(client.id, first.id).await.unwrap());
        assert!(!tx.link_if_absent(client.id, first.id).await.unwrap());
        tx.commit().await.unwrap();

        let listing = store.list_clients(0, 100).await.unwrap();
        assert_eq!(listing.len(), 1);
        assert_eq!(listing[0].ips, vec!["10.0.0.1".to_string()]);
    }

    #[tokio::test]
    async fn test_list_clients_paging() {
        let store = MemoryIdentityStore::new();
        let mut tx = store.begin().await.unwrap();
        for i in 0..5 {
            tx.create_client(&new_client(Some(&format!("7999000000{}", i)), None))
                .await
                .unwrap();
        }
        tx.commit().await.unwrap();

        assert_eq!(store.list_clients(0, 100).await.unwrap().len(), 5);
        assert_eq!(store.list_clients(3, 100).await.unwrap().len(), 2);
        assert_eq!(store.list_clients(1, 2).await.unwrap().len(), 2);
        assert!(store.list_clients(10, 100).await.unwrap().is_empty());
    }
}
