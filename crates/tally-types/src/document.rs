//! Store-side documents other than lists: the per-owner config document,
//! name history, and the full snapshot delivered by a subscription.

use serde::{Deserialize, Serialize};

use crate::ids::HistoryId;
use crate::list::List;
use crate::status::{StatusGroup, default_workflows};

/// Per-owner configuration: the workflows available to that owner's lists.
///
/// Absent on first access; initialised lazily with [`ConfigDocument::builtin`].
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigDocument {
    #[serde(default)]
    pub status_groups: Vec<StatusGroup>,
}

impl ConfigDocument {
    /// Config with the built-in workflows.
    pub fn builtin() -> Self {
        Self {
            status_groups: default_workflows(),
        }
    }
}

/// A previously entered item name (backs name suggestions).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryEntry {
    pub id: HistoryId,
    pub name: String,
    /// Unix millis of the last time this name was used.
    #[serde(default)]
    pub used_at: u64,
}

impl HistoryEntry {
    pub fn new(name: impl Into<String>, used_at: u64) -> Self {
        Self {
            id: HistoryId::new(),
            name: name.into(),
            used_at,
        }
    }
}

/// Everything the store holds for one owner, as delivered on each change.
///
/// `config: None` means the owner has no config document yet.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoreSnapshot {
    #[serde(default)]
    pub lists: Vec<List>,
    #[serde(default)]
    pub config: Option<ConfigDocument>,
    #[serde(default)]
    pub history: Vec<HistoryEntry>,
}
