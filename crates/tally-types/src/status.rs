//! Workflows (status groups) and the statuses they order.
//!
//! A workflow is a named, ordered, non-empty sequence of statuses. The order
//! is both the cycling sequence and the status-sort priority. Items refer to
//! statuses by id only, so a status id that no longer resolves is a stale
//! reference that callers recover from (see `tally-core::workflow`).

use std::str::FromStr;

use serde::{Deserialize, Serialize};
use strum::EnumString;

use crate::ids::{StatusGroupId, StatusId};

/// Known symbolic icons a status can carry.
///
/// The store keeps the raw icon string on [`Status`]; this enum is the
/// interpreted form. Unrecognised icon names map to [`StatusKind::Unknown`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default, EnumString)]
#[strum(ascii_case_insensitive)]
pub enum StatusKind {
    #[strum(serialize = "listed", serialize = "list")]
    Listed,
    #[strum(serialize = "ordered", serialize = "cart")]
    Ordered,
    #[strum(serialize = "received", serialize = "package")]
    Received,
    #[strum(serialize = "returned", serialize = "undo")]
    Returned,
    #[strum(serialize = "todo", serialize = "needed", serialize = "circle")]
    Todo,
    #[strum(serialize = "done", serialize = "check", serialize = "complete")]
    Done,
    #[strum(serialize = "pending", serialize = "clock")]
    Pending,
    #[strum(serialize = "cancelled", serialize = "canceled", serialize = "cross")]
    Cancelled,
    /// Icon string not recognised; rendered with a neutral marker.
    #[default]
    Unknown,
}

impl StatusKind {
    /// Interpret an icon string, falling back to [`StatusKind::Unknown`].
    pub fn from_icon(icon: &str) -> Self {
        <Self as FromStr>::from_str(icon.trim()).unwrap_or_default()
    }

    /// Canonical icon name.
    pub fn as_str(&self) -> &'static str {
        match self {
            StatusKind::Listed => "listed",
            StatusKind::Ordered => "ordered",
            StatusKind::Received => "received",
            StatusKind::Returned => "returned",
            StatusKind::Todo => "todo",
            StatusKind::Done => "done",
            StatusKind::Pending => "pending",
            StatusKind::Cancelled => "cancelled",
            StatusKind::Unknown => "unknown",
        }
    }

    /// Single-character marker for text rendering.
    pub fn glyph(&self) -> char {
        match self {
            StatusKind::Listed => '•',
            StatusKind::Ordered => '→',
            StatusKind::Received => '✓',
            StatusKind::Returned => '↩',
            StatusKind::Todo => '○',
            StatusKind::Done => '●',
            StatusKind::Pending => '…',
            StatusKind::Cancelled => '✗',
            StatusKind::Unknown => '·',
        }
    }
}

/// A single status of a workflow.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Status {
    pub id: StatusId,
    pub name: String,
    /// Symbolic icon reference, kept verbatim for round-tripping.
    #[serde(default)]
    pub icon: String,
    /// Display color (opaque to the engine).
    #[serde(default)]
    pub color: String,
}

impl Status {
    pub fn new(name: impl Into<String>, icon: impl Into<String>, color: impl Into<String>) -> Self {
        Self {
            id: StatusId::new(),
            name: name.into(),
            icon: icon.into(),
            color: color.into(),
        }
    }

    pub fn kind(&self) -> StatusKind {
        StatusKind::from_icon(&self.icon)
    }
}

/// A workflow: a named, ordered sequence of statuses.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusGroup {
    pub id: StatusGroupId,
    pub name: String,
    #[serde(default)]
    pub statuses: Vec<Status>,
}

impl StatusGroup {
    pub fn new(name: impl Into<String>, statuses: Vec<Status>) -> Self {
        Self {
            id: StatusGroupId::new(),
            name: name.into(),
            statuses,
        }
    }

    /// The status new items start in. `None` only for a malformed (empty) group.
    pub fn first_status(&self) -> Option<&Status> {
        self.statuses.first()
    }

    /// Position of a status in workflow order.
    pub fn index_of(&self, id: StatusId) -> Option<usize> {
        self.statuses.iter().position(|s| s.id == id)
    }

    pub fn status(&self, id: StatusId) -> Option<&Status> {
        self.statuses.iter().find(|s| s.id == id)
    }

    pub fn contains(&self, id: StatusId) -> bool {
        self.index_of(id).is_some()
    }

    pub fn len(&self) -> usize {
        self.statuses.len()
    }

    pub fn is_empty(&self) -> bool {
        self.statuses.is_empty()
    }
}

// ── Built-in workflows ──────────────────────────────────────────────────────

fn builtin_status(workflow: &str, name: &str, icon: &str, color: &str) -> Status {
    Status {
        id: StatusId::builtin(workflow, &name.to_lowercase()),
        name: name.to_string(),
        icon: icon.to_string(),
        color: color.to_string(),
    }
}

/// The workflows a fresh config document is initialised with: a minimal
/// two-status checklist and a four-status purchasing flow.
pub fn default_workflows() -> Vec<StatusGroup> {
    vec![
        StatusGroup {
            id: StatusGroupId::builtin("simple"),
            name: "Simple".to_string(),
            statuses: vec![
                builtin_status("simple", "Needed", "todo", "#9e9e9e"),
                builtin_status("simple", "Done", "done", "#4caf50"),
            ],
        },
        StatusGroup {
            id: StatusGroupId::builtin("purchasing"),
            name: "Purchasing".to_string(),
            statuses: vec![
                builtin_status("purchasing", "Listed", "listed", "#9e9e9e"),
                builtin_status("purchasing", "Ordered", "ordered", "#2196f3"),
                builtin_status("purchasing", "Received", "received", "#4caf50"),
                builtin_status("purchasing", "Returned", "returned", "#ff9800"),
            ],
        },
    ]
}
