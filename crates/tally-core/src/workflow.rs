//! The status model: cycling, workflow changes, and stale-reference
//! recovery.
//!
//! References to workflows and statuses are weak. A list whose workflow was
//! deleted falls back to the owner's first workflow, and an item whose
//! status is not in its list's workflow cycles to the first status. Neither
//! case is an error; both are reported as a [`StaleReference`].

use tally_types::{Item, ItemId, List, ListId, Status, StatusGroup, StatusGroupId, StatusId};
use tracing::debug;

use crate::error::{CoreError, ValidationError};
use crate::items::validate_name;
use crate::Result;

/// A reference that no longer resolves, and how it was recovered.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StaleReference {
    /// The list's workflow is gone; `fallback` is used instead.
    Workflow {
        list: ListId,
        missing: StatusGroupId,
        fallback: StatusGroupId,
    },
    /// The item's status is not part of its list's workflow.
    Status {
        list: ListId,
        item: ItemId,
        missing: StatusId,
    },
}

/// The status after `current`, wrapping around at the end.
///
/// An unknown `current` is treated as index -1, so the first status comes
/// back. Only a malformed empty workflow is an error.
pub fn next_status(workflow: &StatusGroup, current: StatusId) -> Result<StatusId> {
    if workflow.is_empty() {
        return Err(CoreError::EmptyWorkflow(workflow.id));
    }
    let next = match workflow.index_of(current) {
        Some(i) => (i + 1) % workflow.len(),
        None => {
            debug!(workflow = %workflow.id, status = %current, "unknown status, restarting cycle");
            0
        }
    };
    Ok(workflow.statuses[next].id)
}

/// Move `list` onto `workflow`, resetting every item to its first status.
///
/// Destructive for all items; the caller is responsible for having the user
/// confirm. Switching to the workflow the list already uses changes nothing.
pub fn change_workflow(list: &List, workflow: &StatusGroup) -> Result<List> {
    let first = workflow
        .first_status()
        .ok_or(CoreError::EmptyWorkflow(workflow.id))?
        .id;
    let mut changed = list.clone();
    if list.status_group_id == workflow.id {
        return Ok(changed);
    }
    changed.status_group_id = workflow.id;
    for item in &mut changed.items {
        item.status = first;
    }
    debug!(list = %list.id, workflow = %workflow.id, items = changed.items.len(), "workflow changed");
    Ok(changed)
}

/// Resolve a list's workflow, falling back to the first available one.
///
/// `None` only when the owner has no workflows at all.
pub fn resolve_workflow<'a>(
    groups: &'a [StatusGroup],
    list: &List,
) -> Option<(&'a StatusGroup, Option<StaleReference>)> {
    if let Some(group) = groups.iter().find(|g| g.id == list.status_group_id) {
        return Some((group, None));
    }
    let fallback = groups.first()?;
    Some((
        fallback,
        Some(StaleReference::Workflow {
            list: list.id,
            missing: list.status_group_id,
            fallback: fallback.id,
        }),
    ))
}

/// Items whose status is not part of `workflow`.
pub fn stale_statuses(list: &List, workflow: &StatusGroup) -> Vec<StaleReference> {
    list.items
        .iter()
        .filter(|item| !workflow.contains(item.status))
        .map(|item| StaleReference::Status {
            list: list.id,
            item: item.id,
            missing: item.status,
        })
        .collect()
}

// ============================================================================
// Workflow management
// ============================================================================

/// A new workflow. Names are trimmed; at least one status is required.
pub fn new_workflow(name: &str, statuses: Vec<Status>) -> Result<StatusGroup> {
    let name = validate_name(name)?;
    if statuses.is_empty() {
        return Err(ValidationError::NoStatuses.into());
    }
    for status in &statuses {
        validate_name(&status.name)?;
    }
    Ok(StatusGroup::new(name, statuses))
}

pub fn rename_workflow(group: &mut StatusGroup, name: &str) -> Result<()> {
    group.name = validate_name(name)?;
    Ok(())
}

/// Remove a workflow. The last remaining workflow cannot be removed.
pub fn remove_workflow(groups: &mut Vec<StatusGroup>, id: StatusGroupId) -> Result<StatusGroup> {
    let index = groups
        .iter()
        .position(|g| g.id == id)
        .ok_or(CoreError::WorkflowNotFound(id))?;
    if groups.len() == 1 {
        return Err(ValidationError::LastWorkflow.into());
    }
    Ok(groups.remove(index))
}

/// Append a status to the end of a workflow.
pub fn add_status(group: &mut StatusGroup, name: &str, icon: &str, color: &str) -> Result<StatusId> {
    let status = Status::new(validate_name(name)?, icon, color);
    let id = status.id;
    group.statuses.push(status);
    Ok(id)
}

pub fn rename_status(group: &mut StatusGroup, id: StatusId, name: &str) -> Result<()> {
    let name = validate_name(name)?;
    let status = group
        .statuses
        .iter_mut()
        .find(|s| s.id == id)
        .ok_or(CoreError::StatusNotFound(id))?;
    status.name = name;
    Ok(())
}

/// Remove a status. The last status of a workflow cannot be removed.
pub fn remove_status(group: &mut StatusGroup, id: StatusId) -> Result<Status> {
    let index = group.index_of(id).ok_or(CoreError::StatusNotFound(id))?;
    if group.len() == 1 {
        return Err(ValidationError::LastStatus(group.id).into());
    }
    Ok(group.statuses.remove(index))
}

/// Point items that use a removed status at the workflow's first status.
/// Returns how many items moved.
pub fn migrate_removed_status(list: &mut List, group: &StatusGroup, removed: StatusId) -> Result<usize> {
    let first = group.first_status().ok_or(CoreError::EmptyWorkflow(group.id))?.id;
    let mut moved = 0;
    for item in list.items.iter_mut().filter(|i| i.status == removed) {
        item.status = first;
        moved += 1;
    }
    Ok(moved)
}

/// Status an item should start in under `workflow`.
pub fn initial_status(workflow: &StatusGroup) -> Result<StatusId> {
    workflow
        .first_status()
        .map(|s| s.id)
        .ok_or(CoreError::EmptyWorkflow(workflow.id))
}

/// Whether every item's status belongs to `workflow`.
pub fn items_consistent(items: &[Item], workflow: &StatusGroup) -> bool {
    items.iter().all(|i| workflow.contains(i.status))
}
