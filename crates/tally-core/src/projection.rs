//! Read model: what a list looks like on screen.
//!
//! Canonical state is the item array as stored. The displayed sequence is
//! derived from it by the view's [`SortMode`], except for one render right
//! after a status cycle in status sort:
//!
//! ```text
//!   render() ─▶ transitional? ──yes──▶ take it (cleared)
//!                     │
//!                     no
//!                     ▼
//!               project(canonical, sort)
//! ```
//!
//! Cycling a status while sorted by status would move the item the user just
//! touched. Instead the current status order is frozen into the canonical
//! array, the change is applied in place, the sort switches to `Custom`, and
//! the frozen sequence is kept as a one-render override. The override
//! outlives store snapshots so a lagging snapshot cannot make the row jump.

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use strum::EnumString;
use tally_types::{Item, ItemId, List, StatusGroup, StatusId};
use tracing::debug;

use crate::error::{CoreError, ValidationError};
use crate::workflow::next_status;
use crate::Result;

/// How a list's items are ordered for display.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize, EnumString)]
#[serde(rename_all = "kebab-case")]
#[strum(ascii_case_insensitive)]
pub enum SortMode {
    /// Stored array order. The only mode that allows dragging.
    #[default]
    Custom,
    /// RON spells this `r#name-ascending`, or `name_ascending` as a plain
    /// identifier.
    #[serde(alias = "name_ascending")]
    #[strum(serialize = "name-ascending", serialize = "name_ascending", serialize = "name", serialize = "az")]
    NameAscending,
    #[serde(alias = "name_descending")]
    #[strum(serialize = "name-descending", serialize = "name_descending", serialize = "za")]
    NameDescending,
    /// Workflow order, then name.
    Status,
}

impl SortMode {
    /// Parse from string (case-insensitive, with aliases).
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Option<Self> {
        <Self as FromStr>::from_str(s).ok()
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SortMode::Custom => "custom",
            SortMode::NameAscending => "name-ascending",
            SortMode::NameDescending => "name-descending",
            SortMode::Status => "status",
        }
    }

    pub fn allows_drag(&self) -> bool {
        matches!(self, SortMode::Custom)
    }
}

impl fmt::Display for SortMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Case-insensitive name comparison.
pub fn compare_names(a: &str, b: &str) -> Ordering {
    a.to_lowercase().cmp(&b.to_lowercase())
}

/// Display order of `items` as indices into the slice.
///
/// All sorts are stable. In status sort, statuses outside `workflow` sort
/// after every known status.
pub fn display_order(items: &[Item], mode: SortMode, workflow: &StatusGroup) -> Vec<usize> {
    let mut order: Vec<usize> = (0..items.len()).collect();
    match mode {
        SortMode::Custom => {}
        SortMode::NameAscending => {
            order.sort_by(|&a, &b| compare_names(&items[a].name, &items[b].name));
        }
        SortMode::NameDescending => {
            order.sort_by(|&a, &b| compare_names(&items[b].name, &items[a].name));
        }
        SortMode::Status => {
            let rank = |status: StatusId| workflow.index_of(status).unwrap_or(usize::MAX);
            order.sort_by(|&a, &b| {
                rank(items[a].status)
                    .cmp(&rank(items[b].status))
                    .then_with(|| compare_names(&items[a].name, &items[b].name))
            });
        }
    }
    order
}

/// Items in display order.
pub fn project(items: &[Item], mode: SortMode, workflow: &StatusGroup) -> Vec<Item> {
    display_order(items, mode, workflow)
        .into_iter()
        .map(|i| items[i].clone())
        .collect()
}

/// Per-list view state: the sort mode and the one-render override.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ListView {
    sort: SortMode,
    transitional: Option<Vec<Item>>,
}

impl ListView {
    pub fn new(sort: SortMode) -> Self {
        Self { sort, transitional: None }
    }

    pub fn sort_mode(&self) -> SortMode {
        self.sort
    }

    /// Choose a sort mode. Any pending override is dropped: the user's
    /// choice wins immediately.
    pub fn set_sort_mode(&mut self, sort: SortMode) {
        self.sort = sort;
        self.transitional = None;
    }

    /// Follow a local edit of the list's items. The override is only ever
    /// set in custom sort, so it always mirrors the canonical array; a later
    /// edit replaces it rather than leaving the pre-edit rows on screen.
    /// Store snapshots do not come through here.
    pub fn refreeze(&mut self, canonical: &[Item]) {
        if let Some(frozen) = self.transitional.as_mut() {
            *frozen = canonical.to_vec();
        }
    }

    pub fn has_transitional(&self) -> bool {
        self.transitional.is_some()
    }

    /// Produce the displayed sequence for this render. Consumes the
    /// transitional override if one is set.
    pub fn render(&mut self, canonical: &[Item], workflow: &StatusGroup) -> Vec<Item> {
        match self.transitional.take() {
            Some(frozen) => frozen,
            None => project(canonical, self.sort, workflow),
        }
    }

    /// The sequence `render` would produce, without consuming anything.
    pub fn peek(&self, canonical: &[Item], workflow: &StatusGroup) -> Vec<Item> {
        match &self.transitional {
            Some(frozen) => frozen.clone(),
            None => project(canonical, self.sort, workflow),
        }
    }

    /// Reject item drags unless in custom sort.
    pub fn ensure_draggable(&self) -> Result<()> {
        if self.sort.allows_drag() {
            Ok(())
        } else {
            Err(ValidationError::ReorderRequiresCustomSort(self.sort).into())
        }
    }

    /// Advance an item's status.
    ///
    /// In status sort the list's items are first rewritten into their
    /// displayed order (the freeze), the view switches to custom, and the
    /// frozen sequence becomes the next render. Otherwise the status changes
    /// in place.
    pub fn cycle_status(&mut self, list: &mut List, item: ItemId, workflow: &StatusGroup) -> Result<StatusId> {
        let current = list.item(item).ok_or(CoreError::ItemNotFound(item))?.status;
        let next = next_status(workflow, current)?;

        if self.sort == SortMode::Status {
            let mut frozen = project(&list.items, SortMode::Status, workflow);
            if let Some(entry) = frozen.iter_mut().find(|i| i.id == item) {
                entry.status = next;
            }
            list.items = frozen.clone();
            self.sort = SortMode::Custom;
            self.transitional = Some(frozen);
            debug!(list = %list.id, %item, "status cycled with freeze");
        } else if let Some(entry) = list.item_mut(item) {
            entry.status = next;
            self.refreeze(&list.items);
        }

        Ok(next)
    }
}
