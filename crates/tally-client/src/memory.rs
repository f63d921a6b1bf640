//! In-memory [`DocumentStore`] for tests, demos, and offline use.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use indexmap::IndexMap;
use parking_lot::RwLock;
use tally_types::{ConfigDocument, HistoryEntry, HistoryId, List, ListId, OwnerId, StoreSnapshot};
use tokio::sync::watch;
use tracing::{debug, trace};

use crate::store::{Ack, DocumentStore, Mutation};
use crate::subscriptions::Subscription;
use crate::sync::SyncError;

/// Everything stored for one owner.
struct OwnerDocs {
    lists: IndexMap<ListId, List>,
    config: Option<ConfigDocument>,
    history: IndexMap<HistoryId, HistoryEntry>,
    revision: u64,
    tx: watch::Sender<Arc<StoreSnapshot>>,
}

impl OwnerDocs {
    fn new() -> Self {
        let (tx, _) = watch::channel(Arc::new(StoreSnapshot::default()));
        Self {
            lists: IndexMap::new(),
            config: None,
            history: IndexMap::new(),
            revision: 0,
            tx,
        }
    }

    fn snapshot(&self) -> StoreSnapshot {
        StoreSnapshot {
            lists: self.lists.values().cloned().collect(),
            config: self.config.clone(),
            history: self.history.values().cloned().collect(),
        }
    }

    fn publish(&mut self) {
        self.revision += 1;
        self.tx.send_replace(Arc::new(self.snapshot()));
    }
}

/// Store that keeps every owner's documents in a map and publishes a new
/// snapshot after each write.
///
/// Failure injection: [`set_read_only`](Self::set_read_only) rejects every
/// write, [`set_offline`](Self::set_offline) fails writes and subscriptions
/// as unavailable.
#[derive(Default)]
pub struct MemoryStore {
    owners: RwLock<HashMap<OwnerId, OwnerDocs>>,
    read_only: AtomicBool,
    offline: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace an owner's documents wholesale.
    pub fn seed(&self, owner: OwnerId, snapshot: StoreSnapshot) {
        let mut owners = self.owners.write();
        let docs = owners.entry(owner).or_insert_with(OwnerDocs::new);
        docs.lists = snapshot.lists.into_iter().map(|l| (l.id, l)).collect();
        docs.config = snapshot.config;
        docs.history = snapshot.history.into_iter().map(|h| (h.id, h)).collect();
        docs.publish();
    }

    /// Current documents for `owner` (empty if never written).
    pub fn snapshot(&self, owner: OwnerId) -> StoreSnapshot {
        self.owners
            .read()
            .get(&owner)
            .map(OwnerDocs::snapshot)
            .unwrap_or_default()
    }

    pub fn revision(&self, owner: OwnerId) -> u64 {
        self.owners.read().get(&owner).map(|d| d.revision).unwrap_or(0)
    }

    pub fn set_read_only(&self, read_only: bool) {
        self.read_only.store(read_only, Ordering::SeqCst);
    }

    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    /// End every open subscription for `owner`, as a dropped connection would.
    pub fn disconnect(&self, owner: OwnerId) {
        if let Some(docs) = self.owners.write().get_mut(&owner) {
            let (tx, _) = watch::channel(Arc::new(docs.snapshot()));
            docs.tx = tx;
            debug!(%owner, "subscriptions closed");
        }
    }

    fn check_writable(&self, mutation: &Mutation) -> Result<(), SyncError> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(SyncError::Unavailable("store offline".to_string()));
        }
        if self.read_only.load(Ordering::SeqCst) {
            return Err(SyncError::Rejected {
                what: mutation.describe(),
                reason: "store is read-only".to_string(),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn subscribe(&self, owner: OwnerId) -> Result<Subscription, SyncError> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(SyncError::Unavailable("store offline".to_string()));
        }
        let mut owners = self.owners.write();
        // Every write publishes, so the channel already holds current
        // documents. Subscribing must not wake existing subscribers.
        let docs = owners.entry(owner).or_insert_with(OwnerDocs::new);
        Ok(Subscription::new(owner, docs.tx.subscribe()))
    }

    async fn mutate(&self, mutation: Mutation) -> Result<Ack, SyncError> {
        self.check_writable(&mutation)?;
        let owner = mutation.owner();
        let mut owners = self.owners.write();
        let docs = owners.entry(owner).or_insert_with(OwnerDocs::new);

        match mutation {
            Mutation::PutList(list) => {
                docs.lists.insert(list.id, list);
            }
            Mutation::DeleteList { id, .. } => {
                docs.lists.shift_remove(&id);
            }
            Mutation::PutConfig { config, .. } => {
                docs.config = Some(config);
            }
            Mutation::PutHistory { entry, .. } => {
                docs.history.insert(entry.id, entry);
            }
            Mutation::DeleteHistory { entry, .. } => {
                docs.history.shift_remove(&entry.id);
            }
        }
        docs.publish();
        trace!(%owner, revision = docs.revision, "mutation stored");
        Ok(Ack { revision: docs.revision })
    }
}
