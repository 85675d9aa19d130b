//! Persistence for accounts, orders and challenges.
//!
//! Two implementations are provided: [`MemoryStore`] for tests and embedding,
//! and [`FileStore`], which keeps a JSON snapshot on disk and rewrites it
//! atomically under a file lock after every change.

use crate::error::StoreError;
use crate::model::{Account, CertificateOrder, DnsChallenge};
use async_trait::async_trait;
use fs2::FileExt;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;
use uuid::Uuid;

pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Storage backend for issuance state.
///
/// Implement this trait to keep certdesk state somewhere other than memory
/// or a local JSON file.
#[async_trait]
pub trait CertificateStore: Send + Sync {
    /// Find the account registered for `email` at `directory_url`.
    async fn find_account(&self, email: &str, directory_url: &str)
    -> StoreResult<Option<Account>>;

    async fn get_account(&self, id: Uuid) -> StoreResult<Option<Account>>;

    /// Insert or replace an account.
    async fn save_account(&self, account: &Account) -> StoreResult<()>;

    async fn get_order(&self, id: Uuid) -> StoreResult<Option<CertificateOrder>>;

    /// All orders, newest first.
    async fn list_orders(&self) -> StoreResult<Vec<CertificateOrder>>;

    /// Insert or replace an order.
    async fn save_order(&self, order: &CertificateOrder) -> StoreResult<()>;

    /// Delete an order and its challenges. Returns whether it existed.
    async fn delete_order(&self, id: Uuid) -> StoreResult<bool>;

    /// Challenges of an order, in domain order.
    async fn list_challenges(&self, order_id: Uuid) -> StoreResult<Vec<DnsChallenge>>;

    /// Replace every challenge of an order.
    async fn save_challenges(&self, order_id: Uuid, challenges: &[DnsChallenge])
    -> StoreResult<()>;

    /// Update a single existing challenge.
    async fn save_challenge(&self, challenge: &DnsChallenge) -> StoreResult<()>;
}

/// Store contents, shared by both implementations.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct StoreState {
    #[serde(default)]
    accounts: HashMap<Uuid, Account>,
    #[serde(default)]
    orders: HashMap<Uuid, CertificateOrder>,
    #[serde(default)]
    challenges: HashMap<Uuid, Vec<DnsChallenge>>,
}

impl StoreState {
    fn find_account(&self, email: &str, directory_url: &str) -> Option<Account> {
        self.accounts
            .values()
            .find(|a| a.email == email && a.directory_url == directory_url)
            .cloned()
    }

    fn list_orders(&self) -> Vec<CertificateOrder> {
        let mut orders: Vec<_> = self.orders.values().cloned().collect();
        orders.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        orders
    }

    fn delete_order(&mut self, id: Uuid) -> bool {
        self.challenges.remove(&id);
        self.orders.remove(&id).is_some()
    }

    fn save_challenge(&mut self, challenge: &DnsChallenge) -> StoreResult<()> {
        let slot = self
            .challenges
            .get_mut(&challenge.order_id)
            .and_then(|list| list.iter_mut().find(|c| c.id == challenge.id))
            .ok_or_else(|| StoreError::Missing(format!("challenge {}", challenge.id)))?;
        *slot = challenge.clone();
        Ok(())
    }
}

/// In-memory store
#[derive(Debug, Default)]
pub struct MemoryStore {
    state: RwLock<StoreState>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CertificateStore for MemoryStore {
    async fn find_account(
        &self,
        email: &str,
        directory_url: &str,
    ) -> StoreResult<Option<Account>> {
        Ok(self.state.read().find_account(email, directory_url))
    }

    async fn get_account(&self, id: Uuid) -> StoreResult<Option<Account>> {
        Ok(self.state.read().accounts.get(&id).cloned())
    }

    async fn save_account(&self, account: &Account) -> StoreResult<()> {
        self.state
            .write()
            .accounts
            .insert(account.id, account.clone());
        Ok(())
    }

    async fn get_order(&self, id: Uuid) -> StoreResult<Option<CertificateOrder>> {
        Ok(self.state.read().orders.get(&id).cloned())
    }

    async fn list_orders(&self) -> StoreResult<Vec<CertificateOrder>> {
        Ok(self.state.read().list_orders())
    }

    async fn save_order(&self, order: &CertificateOrder) -> StoreResult<()> {
        self.state.write().orders.insert(order.id, order.clone());
        Ok(())
    }

    async fn delete_order(&self, id: Uuid) -> StoreResult<bool> {
        Ok(self.state.write().delete_order(id))
    }

    async fn list_challenges(&self, order_id: Uuid) -> StoreResult<Vec<DnsChallenge>> {
        Ok(self
            .state
            .read()
            .challenges
            .get(&order_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn save_challenges(
        &self,
        order_id: Uuid,
        challenges: &[DnsChallenge],
    ) -> StoreResult<()> {
        self.state
            .write()
            .challenges
            .insert(order_id, challenges.to_vec());
        Ok(())
    }

    async fn save_challenge(&self, challenge: &DnsChallenge) -> StoreResult<()> {
        self.state.write().save_challenge(challenge)
    }
}

/// JSON file store.
///
/// The whole state lives in one file that is re-read on every call, so
/// several processes can share a data directory. Writers hold an exclusive
/// lock on a sibling `.lock` file while they reload, change and rewrite the
/// state; the new state goes to a temporary file that is renamed over the
/// original.
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    lock_path: PathBuf,
    writer: Mutex<()>,
}

impl FileStore {
    /// Default file name inside a data directory.
    pub const FILE_NAME: &'static str = "certdesk.json";

    /// Open the store at `path`, starting empty if the file does not exist.
    pub async fn open(path: impl AsRef<Path>) -> StoreResult<Self> {
        let path = path.as_ref().to_path_buf();
        let store = Self {
            lock_path: path.with_extension("json.lock"),
            path,
            writer: Mutex::new(()),
        };

        store.load().await?;
        tracing::debug!(path = %store.path.display(), "Opened certificate store");
        Ok(store)
    }

    /// Open `certdesk.json` inside `data_dir`, creating the directory.
    pub async fn open_dir(data_dir: impl AsRef<Path>) -> StoreResult<Self> {
        let dir = data_dir.as_ref();
        tokio::fs::create_dir_all(dir).await?;
        Self::open(dir.join(Self::FILE_NAME)).await
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn load(&self) -> StoreResult<StoreState> {
        match tokio::fs::read(&self.path).await {
            Ok(bytes) => Ok(serde_json::from_slice(&bytes)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(StoreState::default()),
            Err(e) => Err(e.into()),
        }
    }

    async fn persist(&self, state: &StoreState) -> StoreResult<()> {
        let bytes = serde_json::to_vec_pretty(state)?;
        let tmp = self.path.with_extension("json.tmp");

        tokio::fs::write(&tmp, &bytes).await?;
        tokio::fs::rename(&tmp, &self.path).await?;
        Ok(())
    }

    /// Take the cross-process write lock. Released when the file is dropped.
    async fn lock_file(&self) -> StoreResult<std::fs::File> {
        let lock_path = self.lock_path.clone();
        let locked = tokio::task::spawn_blocking(move || -> std::io::Result<std::fs::File> {
            let file = std::fs::OpenOptions::new()
                .read(true)
                .write(true)
                .create(true)
                .truncate(false)
                .open(&lock_path)?;
            file.lock_exclusive()?;
            Ok(file)
        })
        .await
        .map_err(|e| StoreError::Io(std::io::Error::other(e)))?;
        Ok(locked?)
    }

    async fn update<T>(
        &self,
        change: impl FnOnce(&mut StoreState) -> StoreResult<T> + Send,
    ) -> StoreResult<T> {
        let _writer = self.writer.lock().await;
        let lock = self.lock_file().await?;

        let result = self.apply(change).await;

        if let Err(e) = FileExt::unlock(&lock) {
            tracing::warn!(path = %self.lock_path.display(), error = %e, "Failed to release store lock");
        }
        result
    }

    /// Reload from disk, apply `change`, write back. Caller holds the lock.
    async fn apply<T>(
        &self,
        change: impl FnOnce(&mut StoreState) -> StoreResult<T> + Send,
    ) -> StoreResult<T> {
        let mut state = self.load().await?;
        let value = change(&mut state)?;
        self.persist(&state).await?;
        Ok(value)
    }
}

#[async_trait]
impl CertificateStore for FileStore {
    async fn find_account(
        &self,
        email: &str,
        directory_url: &str,
    ) -> StoreResult<Option<Account>> {
        Ok(self.load().await?.find_account(email, directory_url))
    }

    async fn get_account(&self, id: Uuid) -> StoreResult<Option<Account>> {
        Ok(self.load().await?.accounts.remove(&id))
    }

    async fn save_account(&self, account: &Account) -> StoreResult<()> {
        self.update(|state| {
            state.accounts.insert(account.id, account.clone());
            Ok(())
        })
        .await
    }

    async fn get_order(&self, id: Uuid) -> StoreResult<Option<CertificateOrder>> {
        Ok(self.load().await?.orders.remove(&id))
    }

    async fn list_orders(&self) -> StoreResult<Vec<CertificateOrder>> {
        Ok(self.load().await?.list_orders())
    }

    async fn save_order(&self, order: &CertificateOrder) -> StoreResult<()> {
        self.update(|state| {
            state.orders.insert(order.id, order.clone());
            Ok(())
        })
        .await
    }

    async fn delete_order(&self, id: Uuid) -> StoreResult<bool> {
        self.update(|state| Ok(state.delete_order(id))).await
    }

    async fn list_challenges(&self, order_id: Uuid) -> StoreResult<Vec<DnsChallenge>> {
        Ok(self
            .load()
            .await?
            .challenges
            .remove(&order_id)
            .unwrap_or_default())
    }

    async fn save_challenges(
        &self,
        order_id: Uuid,
        challenges: &[DnsChallenge],
    ) -> StoreResult<()> {
        self.update(|state| {
            state.challenges.insert(order_id, challenges.to_vec());
            Ok(())
        })
        .await
    }

    async fn save_challenge(&self, challenge: &DnsChallenge) -> StoreResult<()> {
        self.update(|state| state.save_challenge(challenge)).await
    }
}
