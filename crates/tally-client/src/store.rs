//! The sync boundary: an opaque document store with snapshot subscription.
//!
//! ```text
//!   Session ── Mutation ──▶ DocumentStore::mutate ──▶ Ack | SyncError
//!      ▲                          │
//!      └──── StoreSnapshot ◀──────┘  (Subscription, on every change)
//! ```
//!
//! The store holds one document per list, one config document per owner,
//! and the owner's name history. It is last-write-wins per document.

use async_trait::async_trait;
use tally_types::{ConfigDocument, HistoryEntry, HistoryId, List, ListId, OwnerId};

use crate::subscriptions::Subscription;
use crate::sync::SyncError;

/// A write to the store.
#[derive(Clone, Debug, PartialEq)]
pub enum Mutation {
    /// Create or replace a list document.
    PutList(List),
    DeleteList { owner: OwnerId, id: ListId },
    /// Create or replace the owner's config document.
    PutConfig { owner: OwnerId, config: ConfigDocument },
    PutHistory { owner: OwnerId, entry: HistoryEntry },
    /// Carries the whole entry so a failed delete can be put back.
    DeleteHistory { owner: OwnerId, entry: HistoryEntry },
}

/// Identity of the document a mutation writes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum DocumentKey {
    List(ListId),
    Config(OwnerId),
    History(HistoryId),
}

impl Mutation {
    pub fn owner(&self) -> OwnerId {
        match self {
            Mutation::PutList(list) => list.owner_id,
            Mutation::DeleteList { owner, .. }
            | Mutation::PutConfig { owner, .. }
            | Mutation::PutHistory { owner, .. }
            | Mutation::DeleteHistory { owner, .. } => *owner,
        }
    }

    pub fn document_key(&self) -> DocumentKey {
        match self {
            Mutation::PutList(list) => DocumentKey::List(list.id),
            Mutation::DeleteList { id, .. } => DocumentKey::List(*id),
            Mutation::PutConfig { owner, .. } => DocumentKey::Config(*owner),
            Mutation::PutHistory { entry, .. } | Mutation::DeleteHistory { entry, .. } => {
                DocumentKey::History(entry.id)
            }
        }
    }

    /// Whether a failure of this mutation is undone locally.
    pub fn is_reversible(&self) -> bool {
        matches!(self, Mutation::DeleteHistory { .. })
    }

    /// Short human description for notices and logs.
    pub fn describe(&self) -> String {
        match self {
            Mutation::PutList(list) => format!("list \"{}\"", list.name),
            Mutation::DeleteList { id, .. } => format!("deletion of list {}", id.short()),
            Mutation::PutConfig { .. } => "workflow settings".to_string(),
            Mutation::PutHistory { entry, .. } => format!("history entry \"{}\"", entry.name),
            Mutation::DeleteHistory { entry, .. } => format!("history entry \"{}\"", entry.name),
        }
    }
}

/// Store acknowledgement of a write.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Ack {
    /// Owner revision after the write.
    pub revision: u64,
}

/// An external, eventually consistent document store.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Open a snapshot stream for `owner`. The first pull yields the current
    /// state; later pulls wait for changes. Dropping the subscription
    /// cancels it; calling `subscribe` again restarts it.
    async fn subscribe(&self, owner: OwnerId) -> Result<Subscription, SyncError>;

    /// Apply one write.
    async fn mutate(&self, mutation: Mutation) -> Result<Ack, SyncError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use tally_types::{OrderKey, StatusGroupId};

    #[test]
    fn test_only_history_delete_is_reversible() {
        let owner = OwnerId::new();
        let entry = HistoryEntry::new("Milk", 0);
        let list = List::new(owner, "A", OrderKey::new(0.0), StatusGroupId::new());
        assert!(Mutation::DeleteHistory { owner, entry: entry.clone() }.is_reversible());
        assert!(!Mutation::PutHistory { owner, entry }.is_reversible());
        assert!(!Mutation::PutList(list.clone()).is_reversible());
        assert!(!Mutation::DeleteList { owner, id: list.id }.is_reversible());
    }

    #[test]
    fn test_owner_and_key() {
        let owner = OwnerId::new();
        let list = List::new(owner, "A", OrderKey::new(0.0), StatusGroupId::new());
        let put = Mutation::PutList(list.clone());
        assert_eq!(put.owner(), owner);
        assert_eq!(put.document_key(), DocumentKey::List(list.id));
        assert_eq!(put.describe(), "list \"A\"");
    }
}
