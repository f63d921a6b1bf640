//! Snapshot subscriptions and session events.
//!
//! A [`Subscription`] is a lazy, cancelable stream of whole-owner snapshots
//! backed by a `tokio::sync::watch` channel: nothing is read until the first
//! pull, intermediate states may be skipped (only the latest matters because
//! every snapshot is authoritative), and dropping it cancels.

use std::sync::Arc;

use futures::Stream;
use tally_types::{OwnerId, StoreSnapshot};
use tokio::sync::watch;

use crate::sync::Notice;

/// Stream of snapshots for one owner.
pub struct Subscription {
    owner: OwnerId,
    rx: watch::Receiver<Arc<StoreSnapshot>>,
    primed: bool,
}

impl Subscription {
    pub fn new(owner: OwnerId, rx: watch::Receiver<Arc<StoreSnapshot>>) -> Self {
        Self {
            owner,
            rx,
            primed: false,
        }
    }

    pub fn owner(&self) -> OwnerId {
        self.owner
    }

    /// The next snapshot. The first call returns the current state at once;
    /// later calls wait for a change. `None` once the store closed the
    /// stream (resubscribe to restart).
    pub async fn next(&mut self) -> Option<Arc<StoreSnapshot>> {
        if !self.primed {
            self.primed = true;
            return Some(self.rx.borrow_and_update().clone());
        }
        self.rx.changed().await.ok()?;
        Some(self.rx.borrow_and_update().clone())
    }

    /// Adapt into a `futures::Stream`.
    pub fn into_stream(self) -> impl Stream<Item = Arc<StoreSnapshot>> {
        futures::stream::unfold(self, |mut sub| async move {
            let snapshot = sub.next().await?;
            Some((snapshot, sub))
        })
    }
}

/// Connection lifecycle of a session's snapshot stream.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ConnectionStatus {
    Connected,
    Disconnected,
    Reconnecting { attempt: u32 },
}

/// Broadcast to everyone watching a session.
#[derive(Clone, Debug, PartialEq)]
pub enum SessionEvent {
    /// Session state changed; re-render. `version` increases monotonically.
    Changed { version: u64 },
    /// A write failed. Show `notice.message()` briefly.
    Notice(Notice),
    Connection(ConnectionStatus),
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::StreamExt;

    #[tokio::test]
    async fn test_first_pull_is_current_state() {
        let (tx, rx) = watch::channel(Arc::new(StoreSnapshot::default()));
        let mut sub = Subscription::new(OwnerId::new(), rx);
        let first = sub.next().await.unwrap();
        assert!(first.lists.is_empty());

        let mut next = StoreSnapshot::default();
        next.config = Some(tally_types::ConfigDocument::builtin());
        tx.send_replace(Arc::new(next));
        assert!(sub.next().await.unwrap().config.is_some());
    }

    #[tokio::test]
    async fn test_closed_sender_ends_stream() {
        let (tx, rx) = watch::channel(Arc::new(StoreSnapshot::default()));
        let mut stream = Box::pin(Subscription::new(OwnerId::new(), rx).into_stream());
        assert!(stream.next().await.is_some());
        drop(tx);
        assert!(stream.next().await.is_none());
    }
}
