//! Outbound side of the sync boundary: pending mutations and failures.
//!
//! Mutations are applied to the session first and queued here; the actor
//! drains the queue to a writer task after every command. The store is
//! last-write-wins per document, so a queued `PutList` is superseded by a
//! later `PutList` for the same list before it is sent.
//!
//! # Failure policy
//!
//! ```text
//!   mutate() ─▶ Ok(ack)  ─▶ nothing (the next snapshot confirms)
//!           └─▶ Err(e)  ─▶ reversible?  ─yes─▶ undo locally, Notice::Reverted
//!                                       └no──▶ keep optimistic, Notice::Unconfirmed
//! ```
//!
//! Nothing is retried automatically.

use std::collections::VecDeque;

use tally_core::StaleReference;
use thiserror::Error;

use crate::store::Mutation;

/// Error crossing the sync boundary.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SyncError {
    /// The store refused the write (permissions, validation, read-only).
    #[error("store rejected {what}: {reason}")]
    Rejected { what: String, reason: String },
    /// The store could not be reached.
    #[error("store unavailable: {0}")]
    Unavailable(String),
    /// The snapshot stream ended.
    #[error("subscription closed")]
    SubscriptionClosed,
}

/// A transient, user-facing message produced by a sync failure.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Notice {
    /// The change stays on screen but the store does not have it.
    Unconfirmed { what: String, error: String },
    /// The change was undone locally because the store refused it.
    Reverted { what: String, error: String },
}

impl Notice {
    pub fn message(&self) -> String {
        match self {
            Notice::Unconfirmed { what, error } => format!("could not save {what}: {error}"),
            Notice::Reverted { what, error } => format!("{what} was restored: {error}"),
        }
    }
}

/// What applying a store snapshot did to the session.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SnapshotApplied {
    pub list_count: usize,
    /// References that no longer resolve and the fallbacks chosen for them.
    pub stale: Vec<StaleReference>,
    /// The owner had no config document; defaults were written.
    pub config_initialized: bool,
    /// A drag in progress lost its list or item and was discarded.
    pub drag_discarded: bool,
}

/// Queue of mutations not yet handed to the writer.
#[derive(Debug, Default)]
pub struct Outbox {
    pending: VecDeque<Mutation>,
}

impl Outbox {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a mutation, replacing a pending write of the same document.
    pub fn push(&mut self, mutation: Mutation) {
        let key = mutation.document_key();
        if let Some(slot) = self.pending.iter_mut().find(|m| m.document_key() == key) {
            *slot = mutation;
            return;
        }
        self.pending.push_back(mutation);
    }

    pub fn drain(&mut self) -> Vec<Mutation> {
        self.pending.drain(..).collect()
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}
