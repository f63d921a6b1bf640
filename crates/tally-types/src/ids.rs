//! Typed identifiers for owners, lists, items, workflows, and statuses.
//!
//! Generated IDs are UUIDv7 (time-ordered). The built-in workflows and their
//! statuses use UUIDv5 derived from a fixed namespace, so two owners that
//! were lazily initialised with the default config agree on every id.
//! `short()` (first 8 hex chars) is for human-facing output only.

use std::fmt;

use serde::{Deserialize, Serialize};

/// The user that owns a set of lists and one config document.
#[derive(Clone, Copy, Hash, Eq, PartialEq, Ord, PartialOrd, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OwnerId(uuid::Uuid);

/// A top-level list (one store document per list).
#[derive(Clone, Copy, Hash, Eq, PartialEq, Ord, PartialOrd, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ListId(uuid::Uuid);

/// An item inside a list.
#[derive(Clone, Copy, Hash, Eq, PartialEq, Ord, PartialOrd, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ItemId(uuid::Uuid);

/// A workflow (status group).
#[derive(Clone, Copy, Hash, Eq, PartialEq, Ord, PartialOrd, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StatusGroupId(uuid::Uuid);

/// A status within a workflow.
#[derive(Clone, Copy, Hash, Eq, PartialEq, Ord, PartialOrd, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StatusId(uuid::Uuid);

/// A remembered item name in an owner's history.
#[derive(Clone, Copy, Hash, Eq, PartialEq, Ord, PartialOrd, Serialize, Deserialize)]
#[serde(transparent)]
pub struct HistoryId(uuid::Uuid);

/// Types that can be looked up by hex prefix.
pub trait PrefixResolvable: Copy {
    fn short(&self) -> String;
    fn matches_hex_prefix(&self, prefix: &str) -> bool;
}

// ── Shared behavior ─────────────────────────────────────────────────────────

macro_rules! impl_typed_id {
    ($T:ident, $name:literal) => {
        impl $T {
            /// Create a new time-ordered ID (UUIDv7).
            pub fn new() -> Self {
                Self(uuid::Uuid::now_v7())
            }

            /// First 8 hex characters, for display only (not for lookup).
            pub fn short(&self) -> String {
                self.0.as_simple().to_string()[..8].to_string()
            }

            /// Full 32-character hex string (no hyphens).
            pub fn to_hex(&self) -> String {
                self.0.as_simple().to_string()
            }

            /// Parse from a hex string (32 chars, no hyphens) or standard UUID format.
            pub fn parse(s: &str) -> Result<Self, uuid::Error> {
                uuid::Uuid::parse_str(s).map(Self)
            }

            /// Check if a query string matches this ID by hex prefix.
            pub fn matches_hex_prefix(&self, prefix: &str) -> bool {
                self.to_hex().starts_with(&prefix.to_ascii_lowercase())
            }

            /// The nil (all-zero) id, used as a sentinel.
            pub fn nil() -> Self {
                Self(uuid::Uuid::nil())
            }

            pub fn is_nil(&self) -> bool {
                self.0.is_nil()
            }
        }

        impl Default for $T {
            fn default() -> Self {
                Self::new()
            }
        }

        impl From<uuid::Uuid> for $T {
            fn from(u: uuid::Uuid) -> Self {
                Self(u)
            }
        }

        impl From<$T> for uuid::Uuid {
            fn from(id: $T) -> uuid::Uuid {
                id.0
            }
        }

        impl PrefixResolvable for $T {
            fn short(&self) -> String {
                $T::short(self)
            }

            fn matches_hex_prefix(&self, prefix: &str) -> bool {
                $T::matches_hex_prefix(self, prefix)
            }
        }

        impl fmt::Display for $T {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl fmt::Debug for $T {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}({})", $name, self.short())
            }
        }
    };
}

impl_typed_id!(OwnerId, "OwnerId");
impl_typed_id!(ListId, "ListId");
impl_typed_id!(ItemId, "ItemId");
impl_typed_id!(StatusGroupId, "StatusGroupId");
impl_typed_id!(StatusId, "StatusId");
impl_typed_id!(HistoryId, "HistoryId");

// ── Built-in workflow ids ───────────────────────────────────────────────────

/// Fixed namespace for the ids of built-in workflows and statuses.
const TALLY_BUILTIN_NS: uuid::Uuid = uuid::uuid!("5b0f3c2e-9d41-4a7e-8c16-2f7a90d4e1b3");

impl StatusGroupId {
    /// Deterministic id for a built-in workflow (UUIDv5 of `workflow/<key>`).
    pub fn builtin(key: &str) -> Self {
        let name = format!("workflow/{key}");
        Self(uuid::Uuid::new_v5(&TALLY_BUILTIN_NS, name.as_bytes()))
    }
}

impl StatusId {
    /// Deterministic id for a status of a built-in workflow.
    pub fn builtin(workflow: &str, key: &str) -> Self {
        let name = format!("status/{workflow}/{key}");
        Self(uuid::Uuid::new_v5(&TALLY_BUILTIN_NS, name.as_bytes()))
    }
}

// ── Prefix resolution ───────────────────────────────────────────────────────

/// Error from ambiguous prefix resolution.
#[derive(Debug, thiserror::Error)]
pub enum PrefixError {
    #[error("no match for '{0}'")]
    NoMatch(String),
    #[error("ambiguous '{prefix}': matches {candidates:?}")]
    Ambiguous {
        prefix: String,
        candidates: Vec<String>,
    },
}

/// Resolve a query against ids with labels (list names, item names).
///
/// Resolution order:
/// 1. Exact label match (case-insensitive)
/// 2. Unique label prefix match
/// 3. Unique hex prefix match
/// 4. Error (no match or ambiguous)
pub fn resolve_prefix<'a, T: PrefixResolvable>(
    entries: impl Iterator<Item = (T, &'a str)>,
    query: &str,
) -> Result<T, PrefixError> {
    let entries: Vec<(T, &str)> = entries.collect();
    let needle = query.to_lowercase();

    // 1. Exact label match
    let exact: Vec<T> = entries
        .iter()
        .filter(|(_, label)| label.to_lowercase() == needle)
        .map(|(id, _)| *id)
        .collect();
    if exact.len() == 1 {
        return Ok(exact[0]);
    }

    // 2. Unique label prefix match
    let label_matches: Vec<(T, &str)> = entries
        .iter()
        .filter(|(_, label)| label.to_lowercase().starts_with(&needle))
        .copied()
        .collect();
    if label_matches.len() == 1 {
        return Ok(label_matches[0].0);
    }
    if label_matches.len() > 1 {
        return Err(PrefixError::Ambiguous {
            prefix: query.to_string(),
            candidates: label_matches.iter().map(|(_, l)| l.to_string()).collect(),
        });
    }

    // 3. Unique hex prefix match
    let hex_matches: Vec<T> = entries
        .iter()
        .filter(|(id, _)| id.matches_hex_prefix(query))
        .map(|(id, _)| *id)
        .collect();

    match hex_matches.len() {
        0 => Err(PrefixError::NoMatch(query.to_string())),
        1 => Ok(hex_matches[0]),
        _ => Err(PrefixError::Ambiguous {
            prefix: query.to_string(),
            candidates: hex_matches.iter().map(|id| id.short()).collect(),
        }),
    }
}

// ============================================================================
// Tests
// ============================================================================
