//! Index-based reordering of items inside a list.
//!
//! Items have no order key: their index is their order. A drag runs in two
//! phases:
//!
//! ```text
//!   begin ──▶ hover* ──▶ finish ──▶ Some((from, to)) | None
//!                   └──▶ cancel
//! ```
//!
//! While hovering, the pointer's vertical position within the hovered item
//! picks a [`DropIndicator`]:
//!
//! ```text
//!   ┌──────────────┐  0.00
//!   │   Before(i)  │
//!   ├──────────────┤  hover_before (0.35)
//!   │  (keep last) │  hysteresis band
//!   ├──────────────┤  1 - hover_after (0.65)
//!   │   After(i)   │
//!   └──────────────┘  1.00
//! ```
//!
//! The indicator only drives rendering. Canonical state changes once, on
//! finish, and not at all when the item is dropped next to itself.

use tally_types::{ItemId, ListId};
use tracing::trace;

use crate::config::EngineConfig;

/// Where a dragged item would land, relative to a hovered item.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DropIndicator {
    Before(usize),
    After(usize),
}

impl DropIndicator {
    /// The gap this indicator points at: 0 is before the first item,
    /// `len` is after the last.
    pub fn gap(&self) -> usize {
        match self {
            DropIndicator::Before(i) => *i,
            DropIndicator::After(i) => i + 1,
        }
    }
}

/// Band of the hovered item the pointer is in.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HoverZone {
    Top,
    Middle,
    Bottom,
}

/// Classify a pointer position given as a fraction of the item's extent
/// (0.0 = top edge, 1.0 = bottom edge).
pub fn hover_zone(fraction: f64, config: &EngineConfig) -> HoverZone {
    let fraction = if fraction.is_nan() { 0.5 } else { fraction.clamp(0.0, 1.0) };
    if fraction < config.hover_before {
        HoverZone::Top
    } else if fraction > 1.0 - config.hover_after {
        HoverZone::Bottom
    } else {
        HoverZone::Middle
    }
}

/// Indicator after hovering item `index`; the middle band keeps `previous`.
pub fn hover_indicator(
    previous: Option<DropIndicator>,
    index: usize,
    fraction: f64,
    config: &EngineConfig,
) -> Option<DropIndicator> {
    match hover_zone(fraction, config) {
        HoverZone::Top => Some(DropIndicator::Before(index)),
        HoverZone::Bottom => Some(DropIndicator::After(index)),
        HoverZone::Middle => previous,
    }
}

/// Final index for an item taken from `from` and dropped at `indicator`.
///
/// `None` when the drop lands in either gap adjacent to the item itself, or
/// the indicator points past the end of a `len`-item sequence.
pub fn resolve_drop(from: usize, indicator: DropIndicator, len: usize) -> Option<usize> {
    let gap = indicator.gap();
    if from >= len || gap > len {
        return None;
    }
    if gap == from || gap == from + 1 {
        return None;
    }
    // Removing the item first shifts every later gap down by one.
    Some(if gap > from { gap - 1 } else { gap })
}

/// Move the element at `from` so it ends up at `to`.
pub fn move_within<T>(items: &mut Vec<T>, from: usize, to: usize) {
    if from == to || from >= items.len() || to >= items.len() {
        return;
    }
    let item = items.remove(from);
    items.insert(to, item);
}

/// An in-progress item drag. Session-local: never persisted and never
/// replaced by a store snapshot.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DragSession {
    pub list: ListId,
    pub item: ItemId,
    /// Index of the dragged item when the drag began.
    pub origin: usize,
    indicator: Option<DropIndicator>,
}

impl DragSession {
    pub fn begin(list: ListId, item: ItemId, origin: usize) -> Self {
        trace!(%list, %item, origin, "drag begin");
        Self {
            list,
            item,
            origin,
            indicator: None,
        }
    }

    pub fn indicator(&self) -> Option<DropIndicator> {
        self.indicator
    }

    /// Update the indicator for the pointer over item `index`.
    pub fn hover(&mut self, index: usize, fraction: f64, config: &EngineConfig) -> Option<DropIndicator> {
        self.indicator = hover_indicator(self.indicator, index, fraction, config);
        self.indicator
    }

    /// End the drag. Returns `(from, to)` when the drop changes the order.
    pub fn finish(self, len: usize) -> Option<(usize, usize)> {
        let to = self.indicator.and_then(|ind| resolve_drop(self.origin, ind, len));
        trace!(item = %self.item, from = self.origin, ?to, "drag end");
        to.map(|to| (self.origin, to))
    }
}
