//! Error types for engine operations.

use tally_types::{HistoryId, ItemId, ListId, OrderKey, StatusGroupId, StatusId};
use thiserror::Error;

use crate::projection::SortMode;

/// Errors that can occur while computing a mutation.
///
/// No variant leaves partial state behind: operations validate before they
/// touch the list or config they were given.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CoreError {
    /// No distinguishable key fits between the neighbours.
    ///
    /// The caller must renormalise the sibling sequence or reject the move.
    #[error("order keys exhausted between {prev:?} and {next:?}")]
    ReorderExhausted {
        prev: Option<OrderKey>,
        next: Option<OrderKey>,
    },

    /// Local input rejected before any mutation was attempted.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("list not found: {0:?}")]
    ListNotFound(ListId),

    #[error("item not found: {0:?}")]
    ItemNotFound(ItemId),

    #[error("workflow not found: {0:?}")]
    WorkflowNotFound(StatusGroupId),

    #[error("status not found: {0:?}")]
    StatusNotFound(StatusId),

    #[error("history entry not found: {0:?}")]
    HistoryNotFound(HistoryId),

    /// A workflow with no statuses reached the engine.
    #[error("workflow {0:?} has no statuses")]
    EmptyWorkflow(StatusGroupId),

    #[error("index {index} out of bounds for {len} entries")]
    IndexOutOfBounds { index: usize, len: usize },
}

/// Input the engine refuses to act on.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("name must not be empty")]
    EmptyName,

    #[error("quantity must be at least 1, got {0}")]
    NonPositiveQuantity(i64),

    #[error("quantity {0} is too large")]
    QuantityTooLarge(i64),

    #[error("cannot delete the last status of workflow {0:?}")]
    LastStatus(StatusGroupId),

    #[error("cannot delete the last workflow")]
    LastWorkflow,

    #[error("a workflow needs at least one status")]
    NoStatuses,

    #[error("items can only be reordered in custom sort (current: {0})")]
    ReorderRequiresCustomSort(SortMode),

    #[error("changing a list's workflow resets every item and must be confirmed")]
    UnconfirmedWorkflowChange,

    #[error("no drag in progress")]
    NoDragInProgress,

    #[error("a drag is already in progress")]
    DragAlreadyActive,
}
