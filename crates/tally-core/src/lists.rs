//! The sibling collection of lists: display order and move planning.

use tally_types::{List, ListId, OrderKey};
use tracing::{debug, warn};

use crate::config::EngineConfig;
use crate::error::CoreError;
use crate::order::{KeyDirection, allocate_key, renormalized_keys, tail_key};
use crate::Result;

/// What persisting a list move requires.
#[derive(Clone, Debug, PartialEq)]
pub enum ListMovePlan {
    /// Same position; nothing to write.
    NoOp,
    /// Only the moved list changes key.
    Keyed { id: ListId, key: OrderKey },
    /// Keys ran out; every list gets a fresh, evenly spaced key.
    /// Entries are in the new display order.
    Renormalized { keys: Vec<(ListId, OrderKey)> },
}

impl ListMovePlan {
    /// Apply the new keys to an in-memory collection.
    pub fn apply(&self, lists: &mut [List]) {
        match self {
            ListMovePlan::NoOp => {}
            ListMovePlan::Keyed { id, key } => {
                if let Some(list) = lists.iter_mut().find(|l| l.id == *id) {
                    list.order_key = *key;
                }
            }
            ListMovePlan::Renormalized { keys } => {
                for (id, key) in keys {
                    if let Some(list) = lists.iter_mut().find(|l| l.id == *id) {
                        list.order_key = *key;
                    }
                }
            }
        }
    }

    /// Ids of lists whose key changes.
    pub fn touched(&self) -> Vec<ListId> {
        match self {
            ListMovePlan::NoOp => Vec::new(),
            ListMovePlan::Keyed { id, .. } => vec![*id],
            ListMovePlan::Renormalized { keys } => keys.iter().map(|(id, _)| *id).collect(),
        }
    }
}

/// Sort lists into display order: by key, ties broken by id.
pub fn sort_lists(lists: &mut [List], direction: KeyDirection) {
    lists.sort_by(|a, b| direction.compare(a.order_key, b.order_key).then_with(|| a.id.cmp(&b.id)));
}

/// References to `lists` in display order.
pub fn ordered(lists: &[List], direction: KeyDirection) -> Vec<&List> {
    let mut refs: Vec<&List> = lists.iter().collect();
    refs.sort_by(|a, b| direction.compare(a.order_key, b.order_key).then_with(|| a.id.cmp(&b.id)));
    refs
}

/// Plan moving the list at display index `from` to display index `to`
/// (its index after the move).
pub fn plan_list_move(lists: &[List], from: usize, to: usize, config: &EngineConfig) -> Result<ListMovePlan> {
    let len = lists.len();
    for index in [from, to] {
        if index >= len {
            return Err(CoreError::IndexOutOfBounds { index, len });
        }
    }
    if from == to || len < 2 {
        return Ok(ListMovePlan::NoOp);
    }

    let mut order = ordered(lists, config.key_direction);
    let moved = order.remove(from);
    let prev = to.checked_sub(1).map(|i| order[i].order_key);
    let next = order.get(to).map(|l| l.order_key);

    match allocate_key(prev, next, config.order_step, config.key_direction) {
        Ok(Some(key)) => {
            debug!(list = %moved.id, from, to, %key, "list moved");
            Ok(ListMovePlan::Keyed { id: moved.id, key })
        }
        Ok(None) => Ok(ListMovePlan::NoOp),
        Err(CoreError::ReorderExhausted { .. }) => {
            warn!(list = %moved.id, from, to, ?prev, ?next, "order keys exhausted, renormalizing");
            order.insert(to, moved);
            let ids: Vec<ListId> = order.iter().map(|l| l.id).collect();
            renormalize(&ids, config)
        }
        Err(other) => Err(other),
    }
}

/// Evenly spaced keys for `ids`, given in the desired display order.
pub fn renormalize(ids: &[ListId], config: &EngineConfig) -> Result<ListMovePlan> {
    let keys = renormalized_keys(ids.len(), config.order_step, config.key_direction)?;
    Ok(ListMovePlan::Renormalized {
        keys: ids.iter().copied().zip(keys).collect(),
    })
}

/// Key for a newly created list, placed at the tail.
pub fn key_for_new_list(lists: &[List], config: &EngineConfig) -> Result<OrderKey> {
    let last = ordered(lists, config.key_direction).last().map(|l| l.order_key);
    tail_key(last, config.order_step, config.key_direction)
}
