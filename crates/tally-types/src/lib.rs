//! Shared identity, list, and workflow types for Tally.
//!
//! This crate is the data foundation: typed IDs, lists and their items,
//! workflows and statuses, and the documents exchanged with the store. It
//! has **no internal tally dependencies**.
//!
//! # Entity-Relationship Overview
//!
//! ```text
//! Owner (OwnerId)
//!     └── owns List (ListId, ordered among siblings by OrderKey)
//!     │       └── contains Item (ItemId, ordered by array position)
//!     │       └── uses StatusGroup (StatusGroupId) ← the list's workflow
//!     └── owns ConfigDocument
//!             └── StatusGroup (StatusGroupId)
//!                     └── Status (StatusId) ← referenced by Item.status
//! ```
//!
//! # Key Types
//!
//! |--------------------|---------------------------------------------|
//! | Type               | Purpose                                     |
//! |--------------------|---------------------------------------------|
//! | [`List`]           | List document (name, items, order key)      |
//! | [`Item`]           | Entry in a list (name, quantity, status)    |
//! | [`OrderKey`]       | Sibling position of a list                  |
//! | [`StatusGroup`]    | Workflow: ordered, non-empty statuses       |
//! | [`Status`]         | One workflow step (name, icon, color)       |
//! | [`StatusKind`]     | Interpreted icon, with an `Unknown` default |
//! | [`ConfigDocument`] | Per-owner workflows                         |
//! | [`StoreSnapshot`]  | Full owner state from one store delivery    |
//! |--------------------|---------------------------------------------|

pub mod document;
pub mod ids;
pub mod list;
pub mod status;

pub use document::{ConfigDocument, HistoryEntry, StoreSnapshot};
pub use ids::{
    HistoryId, ItemId, ListId, OwnerId, PrefixError, PrefixResolvable, StatusGroupId, StatusId,
    resolve_prefix,
};
pub use list::{Item, List, OrderKey};
pub use status::{Status, StatusGroup, StatusKind, default_workflows};

/// Current time in milliseconds since Unix epoch.
pub fn now_millis() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}
