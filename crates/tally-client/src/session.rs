//! One owner's working state: canonical lists, workflows, view state, and
//! the queue of writes not yet sent.
//!
//! [`Session`] is a plain synchronous state machine. Every gesture validates,
//! updates canonical state optimistically, and queues the [`Mutation`]s the
//! store needs; nothing here waits on the store. The actor in
//! [`crate::actor`] owns a session and feeds it commands and snapshots from
//! a single event queue.
//!
//! # State ownership
//!
//! ```text
//!   replaced by every snapshot          session-local, survives snapshots
//!   ───────────────────────────         ─────────────────────────────────
//!   lists (canonical)                   views (sort mode + transitional)
//!   workflows                           drag
//!   history                             outbox
//! ```

use std::collections::HashMap;

use tally_core::items::{self, validate_name};
use tally_core::lists::{self, ListMovePlan};
use tally_core::position::{self, DragSession, DropIndicator};
use tally_core::projection::{ListView, SortMode};
use tally_core::workflow::{self, StaleReference};
use tally_core::{CoreError, EngineConfig, Result, ValidationError, export_text};
use tally_types::{
    ConfigDocument, HistoryEntry, HistoryId, Item, ItemId, List, ListId, OwnerId, Status,
    StatusGroup, StatusGroupId, StatusId, StoreSnapshot, default_workflows, now_millis,
};
use tracing::{debug, info, warn};

use crate::store::Mutation;
use crate::sync::{Notice, Outbox, SnapshotApplied, SyncError};

/// Whether the owner's config document is known to exist.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum ConfigState {
    /// No snapshot seen yet; built-in workflows are used meanwhile.
    Unknown,
    /// The store had no config; defaults were written and not yet echoed.
    Initializing,
    Loaded,
}

/// Resolve a list's workflow with fallback to the owner's first workflow.
fn workflow_for<'a>(groups: &'a [StatusGroup], list: &List) -> Result<&'a StatusGroup> {
    workflow::resolve_workflow(groups, list)
        .map(|(group, _)| group)
        .ok_or(CoreError::WorkflowNotFound(list.status_group_id))
}

pub struct Session {
    owner: OwnerId,
    config: EngineConfig,
    /// Canonical lists, kept in display order.
    lists: Vec<List>,
    workflows: Vec<StatusGroup>,
    config_state: ConfigState,
    history: Vec<HistoryEntry>,
    views: HashMap<ListId, ListView>,
    drag: Option<DragSession>,
    outbox: Outbox,
    /// Bumped on every observable change.
    version: u64,
}

impl Session {
    pub fn new(owner: OwnerId, config: EngineConfig) -> Self {
        Self {
            owner,
            config,
            lists: Vec::new(),
            workflows: default_workflows(),
            config_state: ConfigState::Unknown,
            history: Vec::new(),
            views: HashMap::new(),
            drag: None,
            outbox: Outbox::new(),
            version: 0,
        }
    }

    // =========================================================================
    // Read accessors
    // =========================================================================

    pub fn owner(&self) -> OwnerId {
        self.owner
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Lists in display order.
    pub fn lists(&self) -> &[List] {
        &self.lists
    }

    pub fn list(&self, id: ListId) -> Option<&List> {
        self.lists.iter().find(|l| l.id == id)
    }

    pub fn workflows(&self) -> &[StatusGroup] {
        &self.workflows
    }

    /// The workflow a list uses (after fallback).
    pub fn workflow_of(&self, list: ListId) -> Result<&StatusGroup> {
        let list = self.list(list).ok_or(CoreError::ListNotFound(list))?;
        workflow_for(&self.workflows, list)
    }

    pub fn history(&self) -> &[HistoryEntry] {
        &self.history
    }

    pub fn drag(&self) -> Option<&DragSession> {
        self.drag.as_ref()
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    /// Writes queued since the last call.
    pub fn take_mutations(&mut self) -> Vec<Mutation> {
        self.outbox.drain()
    }

    pub fn pending_mutations(&self) -> usize {
        self.outbox.len()
    }

    // =========================================================================
    // Internal helpers
    // =========================================================================

    fn list_mut(&mut self, id: ListId) -> Result<&mut List> {
        self.lists
            .iter_mut()
            .find(|l| l.id == id)
            .ok_or(CoreError::ListNotFound(id))
    }

    fn view_mut(&mut self, id: ListId) -> &mut ListView {
        let sort = self.config.default_sort;
        self.views.entry(id).or_insert_with(|| ListView::new(sort))
    }

    /// Queue the current state of a list and bump the version.
    fn touch_list(&mut self, id: ListId) {
        if let Some(list) = self.list(id) {
            self.outbox.push(Mutation::PutList(list.clone()));
        }
        self.version += 1;
    }

    /// A local edit changed a list's items: keep any one-render override in
    /// step with them, then queue the list.
    fn touch_items(&mut self, id: ListId) {
        if let (Some(list), Some(view)) = (
            self.lists.iter().find(|l| l.id == id),
            self.views.get_mut(&id),
        ) {
            view.refreeze(&list.items);
        }
        self.touch_list(id);
    }

    fn touch_config(&mut self) {
        self.outbox.push(Mutation::PutConfig {
            owner: self.owner,
            config: ConfigDocument {
                status_groups: self.workflows.clone(),
            },
        });
        self.version += 1;
    }

    fn workflow_mut(&mut self, id: StatusGroupId) -> Result<&mut StatusGroup> {
        self.workflows
            .iter_mut()
            .find(|g| g.id == id)
            .ok_or(CoreError::WorkflowNotFound(id))
    }

    fn resort_lists(&mut self) {
        lists::sort_lists(&mut self.lists, self.config.key_direction);
    }

    /// Give every list an evenly spaced key in the current display order.
    fn renormalize_lists(&mut self) -> Result<()> {
        let ids: Vec<ListId> = self.lists.iter().map(|l| l.id).collect();
        let plan = lists::renormalize(&ids, &self.config)?;
        self.apply_list_plan(&plan);
        Ok(())
    }

    fn apply_list_plan(&mut self, plan: &ListMovePlan) {
        plan.apply(&mut self.lists);
        self.resort_lists();
        for id in plan.touched() {
            self.touch_list(id);
        }
    }

    fn record_history(&mut self, name: &str) {
        let now = now_millis();
        let entry = match self
            .history
            .iter_mut()
            .find(|h| h.name.to_lowercase() == name.to_lowercase())
        {
            Some(existing) => {
                existing.used_at = now;
                existing.clone()
            }
            None => {
                let entry = HistoryEntry::new(name, now);
                self.history.push(entry.clone());
                entry
            }
        };
        self.outbox.push(Mutation::PutHistory {
            owner: self.owner,
            entry,
        });
    }

    fn discard_drag_on(&mut self, list: ListId, item: Option<ItemId>) {
        let hit = self
            .drag
            .as_ref()
            .is_some_and(|d| d.list == list && item.is_none_or(|i| d.item == i));
        if hit {
            debug!(%list, "drag discarded");
            self.drag = None;
        }
    }

    // =========================================================================
    // Lists
    // =========================================================================

    /// Create a list at the tail. Uses the owner's first workflow unless one
    /// is given.
    pub fn create_list(&mut self, name: &str, workflow: Option<StatusGroupId>) -> Result<ListId> {
        let name = validate_name(name)?;
        let group = match workflow {
            Some(id) => self
                .workflows
                .iter()
                .find(|g| g.id == id)
                .ok_or(CoreError::WorkflowNotFound(id))?
                .id,
            None => self
                .workflows
                .first()
                .ok_or(CoreError::WorkflowNotFound(StatusGroupId::nil()))?
                .id,
        };

        let key = match lists::key_for_new_list(&self.lists, &self.config) {
            Ok(key) => key,
            Err(CoreError::ReorderExhausted { .. }) => {
                warn!("no tail key left for new list, renormalizing");
                self.renormalize_lists()?;
                lists::key_for_new_list(&self.lists, &self.config)?
            }
            Err(other) => return Err(other),
        };

        let list = List::new(self.owner, name, key, group);
        let id = list.id;
        info!(list = %id, %key, "list created");
        self.lists.push(list);
        self.resort_lists();
        self.touch_list(id);
        Ok(id)
    }

    pub fn rename_list(&mut self, id: ListId, name: &str) -> Result<()> {
        items::rename_list(self.list_mut(id)?, name)?;
        self.touch_list(id);
        Ok(())
    }

    pub fn delete_list(&mut self, id: ListId) -> Result<List> {
        let index = self
            .lists
            .iter()
            .position(|l| l.id == id)
            .ok_or(CoreError::ListNotFound(id))?;
        let removed = self.lists.remove(index);
        self.views.remove(&id);
        self.discard_drag_on(id, None);
        self.outbox.push(Mutation::DeleteList {
            owner: self.owner,
            id,
        });
        self.version += 1;
        info!(list = %id, "list deleted");
        Ok(removed)
    }

    /// Move the list at display index `from` to display index `to`.
    pub fn move_list(&mut self, from: usize, to: usize) -> Result<ListMovePlan> {
        let plan = lists::plan_list_move(&self.lists, from, to, &self.config)?;
        self.apply_list_plan(&plan);
        Ok(plan)
    }

    // =========================================================================
    // Items
    // =========================================================================

    /// Append a new item in the list's first status and remember its name.
    pub fn add_item(&mut self, list: ListId, name: &str, quantity: i64) -> Result<ItemId> {
        let target = self
            .lists
            .iter_mut()
            .find(|l| l.id == list)
            .ok_or(CoreError::ListNotFound(list))?;
        let workflow = workflow_for(&self.workflows, target)?;
        let item = items::new_item(name, quantity, workflow)?;
        let (id, name) = (item.id, item.name.clone());
        target.items.push(item);
        self.touch_items(list);
        self.record_history(&name);
        Ok(id)
    }

    pub fn rename_item(&mut self, list: ListId, item: ItemId, name: &str) -> Result<()> {
        items::rename_item(self.list_mut(list)?, item, name)?;
        self.touch_items(list);
        Ok(())
    }

    pub fn set_quantity(&mut self, list: ListId, item: ItemId, quantity: i64) -> Result<()> {
        items::set_quantity(self.list_mut(list)?, item, quantity)?;
        self.touch_items(list);
        Ok(())
    }

    pub fn delete_item(&mut self, list: ListId, item: ItemId) -> Result<Item> {
        let (_, removed) = items::delete_item(self.list_mut(list)?, item)?;
        self.discard_drag_on(list, Some(item));
        self.touch_items(list);
        Ok(removed)
    }

    /// Advance an item to the next status of its list's workflow.
    ///
    /// In status sort this freezes the displayed order (see
    /// [`ListView::cycle_status`]) and switches the list to custom sort.
    pub fn cycle_status(&mut self, list: ListId, item: ItemId) -> Result<StatusId> {
        let sort = self.config.default_sort;
        let target = self
            .lists
            .iter_mut()
            .find(|l| l.id == list)
            .ok_or(CoreError::ListNotFound(list))?;
        let workflow = workflow_for(&self.workflows, target)?;
        let view = self.views.entry(list).or_insert_with(|| ListView::new(sort));
        let next = view.cycle_status(target, item, workflow)?;
        self.touch_items(list);
        Ok(next)
    }

    /// Switch a list to another workflow, resetting every item to the new
    /// workflow's first status. Requires `confirmed`.
    pub fn change_workflow(&mut self, list: ListId, workflow: StatusGroupId, confirmed: bool) -> Result<()> {
        if !confirmed {
            return Err(ValidationError::UnconfirmedWorkflowChange.into());
        }
        let group = self
            .workflows
            .iter()
            .find(|g| g.id == workflow)
            .ok_or(CoreError::WorkflowNotFound(workflow))?;
        let target = self
            .lists
            .iter_mut()
            .find(|l| l.id == list)
            .ok_or(CoreError::ListNotFound(list))?;
        *target = workflow::change_workflow(target, group)?;
        self.touch_items(list);
        Ok(())
    }

    // =========================================================================
    // Views
    // =========================================================================

    pub fn sort_mode(&self, list: ListId) -> SortMode {
        self.views
            .get(&list)
            .map(ListView::sort_mode)
            .unwrap_or(self.config.default_sort)
    }

    pub fn set_sort_mode(&mut self, list: ListId, sort: SortMode) -> Result<()> {
        if self.list(list).is_none() {
            return Err(CoreError::ListNotFound(list));
        }
        self.view_mut(list).set_sort_mode(sort);
        if !sort.allows_drag() {
            self.discard_drag_on(list, None);
        }
        self.version += 1;
        Ok(())
    }

    /// Items as displayed this render. Consumes a pending transitional
    /// override.
    pub fn render(&mut self, list: ListId) -> Result<Vec<Item>> {
        let sort = self.config.default_sort;
        let target = self
            .lists
            .iter()
            .find(|l| l.id == list)
            .ok_or(CoreError::ListNotFound(list))?;
        let workflow = workflow_for(&self.workflows, target)?;
        let view = self.views.entry(list).or_insert_with(|| ListView::new(sort));
        Ok(view.render(&target.items, workflow))
    }

    /// Items as `render` would display them, without consuming anything.
    pub fn peek(&self, list: ListId) -> Result<Vec<Item>> {
        let target = self.list(list).ok_or(CoreError::ListNotFound(list))?;
        let workflow = workflow_for(&self.workflows, target)?;
        Ok(match self.views.get(&list) {
            Some(view) => view.peek(&target.items, workflow),
            None => ListView::new(self.config.default_sort).peek(&target.items, workflow),
        })
    }

    pub fn export(&self, list: ListId) -> Result<String> {
        let target = self.list(list).ok_or(CoreError::ListNotFound(list))?;
        Ok(export_text(target, workflow_for(&self.workflows, target)?))
    }

    // =========================================================================
    // Item drag
    // =========================================================================

    pub fn begin_drag(&mut self, list: ListId, item: ItemId) -> Result<()> {
        if self.drag.is_some() {
            return Err(ValidationError::DragAlreadyActive.into());
        }
        let target = self.list(list).ok_or(CoreError::ListNotFound(list))?;
        let origin = target.item_index(item).ok_or(CoreError::ItemNotFound(item))?;
        let sort = self.sort_mode(list);
        if !sort.allows_drag() {
            return Err(ValidationError::ReorderRequiresCustomSort(sort).into());
        }
        self.drag = Some(DragSession::begin(list, item, origin));
        Ok(())
    }

    /// Pointer over displayed item `index` at `fraction` of its height.
    pub fn hover(&mut self, index: usize, fraction: f64) -> Result<Option<DropIndicator>> {
        let drag = self.drag.as_mut().ok_or(ValidationError::NoDragInProgress)?;
        Ok(drag.hover(index, fraction, &self.config))
    }

    /// Commit the drag. Returns whether the order changed.
    pub fn end_drag(&mut self) -> Result<bool> {
        let mut drag = self.drag.take().ok_or(ValidationError::NoDragInProgress)?;
        let list_id = drag.list;
        let Some(target) = self.lists.iter_mut().find(|l| l.id == list_id) else {
            debug!(list = %list_id, "drag target list vanished");
            return Ok(false);
        };
        // A snapshot may have shifted the item since the drag began.
        let Some(origin) = target.item_index(drag.item) else {
            return Ok(false);
        };
        drag.origin = origin;
        let Some((from, to)) = drag.finish(target.items.len()) else {
            return Ok(false);
        };
        position::move_within(&mut target.items, from, to);
        debug!(list = %list_id, from, to, "item moved");
        self.touch_items(list_id);
        Ok(true)
    }

    pub fn cancel_drag(&mut self) -> bool {
        self.drag.take().is_some()
    }

    // =========================================================================
    // Workflow management
    // =========================================================================

    pub fn add_workflow(&mut self, name: &str, statuses: Vec<Status>) -> Result<StatusGroupId> {
        let group = workflow::new_workflow(name, statuses)?;
        let id = group.id;
        self.workflows.push(group);
        self.touch_config();
        Ok(id)
    }

    pub fn rename_workflow(&mut self, id: StatusGroupId, name: &str) -> Result<()> {
        workflow::rename_workflow(self.workflow_mut(id)?, name)?;
        self.touch_config();
        Ok(())
    }

    /// Delete a workflow. Lists that used it move to the first remaining
    /// workflow with every item reset. That includes lists whose own
    /// workflow id is stale and which fell back to the removed one.
    pub fn remove_workflow(&mut self, id: StatusGroupId) -> Result<()> {
        let affected: Vec<ListId> = self
            .lists
            .iter()
            .filter(|l| workflow_for(&self.workflows, l).is_ok_and(|g| g.id == id))
            .map(|l| l.id)
            .collect();
        workflow::remove_workflow(&mut self.workflows, id)?;
        let fallback = self
            .workflows
            .first()
            .ok_or(ValidationError::LastWorkflow)?;

        for list in self.lists.iter_mut().filter(|l| affected.contains(&l.id)) {
            *list = workflow::change_workflow(list, fallback)?;
        }
        for list in affected {
            self.touch_items(list);
        }
        self.touch_config();
        Ok(())
    }

    pub fn add_status(&mut self, workflow: StatusGroupId, name: &str, icon: &str, color: &str) -> Result<StatusId> {
        let id = workflow::add_status(self.workflow_mut(workflow)?, name, icon, color)?;
        self.touch_config();
        Ok(id)
    }

    pub fn rename_status(&mut self, workflow: StatusGroupId, status: StatusId, name: &str) -> Result<()> {
        workflow::rename_status(self.workflow_mut(workflow)?, status, name)?;
        self.touch_config();
        Ok(())
    }

    /// Delete a status. Items in it move to the workflow's first status.
    pub fn remove_status(&mut self, workflow: StatusGroupId, status: StatusId) -> Result<()> {
        let group = self
            .workflows
            .iter_mut()
            .find(|g| g.id == workflow)
            .ok_or(CoreError::WorkflowNotFound(workflow))?;
        workflow::remove_status(group, status)?;

        let mut migrated = Vec::new();
        for list in self.lists.iter_mut() {
            let Ok(current) = workflow_for(&self.workflows, list) else {
                continue;
            };
            if current.id != workflow {
                continue;
            }
            if workflow::migrate_removed_status(list, current, status)? > 0 {
                migrated.push(list.id);
            }
        }
        for list in migrated {
            self.touch_items(list);
        }
        self.touch_config();
        Ok(())
    }

    // =========================================================================
    // History
    // =========================================================================

    /// Forget a remembered name. Restored if the store refuses the delete.
    pub fn delete_history(&mut self, id: HistoryId) -> Result<()> {
        let index = self
            .history
            .iter()
            .position(|h| h.id == id)
            .ok_or(CoreError::HistoryNotFound(id))?;
        let entry = self.history.remove(index);
        self.outbox.push(Mutation::DeleteHistory {
            owner: self.owner,
            entry,
        });
        self.version += 1;
        Ok(())
    }

    // =========================================================================
    // Sync boundary
    // =========================================================================

    /// Replace canonical state with a store snapshot.
    ///
    /// Lists, workflows, and history are replaced, not merged. View state and
    /// an in-progress drag are kept, except that a drag whose list or item
    /// disappeared is discarded. A missing config document is initialised
    /// with the current (default) workflows.
    pub fn apply_snapshot(&mut self, snapshot: &StoreSnapshot) -> SnapshotApplied {
        let mut applied = SnapshotApplied::default();

        self.lists = snapshot
            .lists
            .iter()
            .filter(|l| l.owner_id == self.owner)
            .cloned()
            .collect();
        if self.lists.len() != snapshot.lists.len() {
            warn!(
                owner = %self.owner,
                dropped = snapshot.lists.len() - self.lists.len(),
                "snapshot contained lists of another owner"
            );
        }
        self.resort_lists();

        let usable: Vec<StatusGroup> = snapshot
            .config
            .iter()
            .flat_map(|c| c.status_groups.iter())
            .filter(|g| {
                if g.is_empty() {
                    warn!(workflow = %g.id, "ignoring workflow without statuses");
                }
                !g.is_empty()
            })
            .cloned()
            .collect();
        if usable.is_empty() {
            if self.config_state != ConfigState::Initializing {
                if self.workflows.is_empty() {
                    self.workflows = default_workflows();
                }
                info!(owner = %self.owner, "no config document, writing defaults");
                self.touch_config();
                self.config_state = ConfigState::Initializing;
                applied.config_initialized = true;
            }
        } else {
            self.workflows = usable;
            self.config_state = ConfigState::Loaded;
        }

        self.history = snapshot.history.clone();

        let live: Vec<ListId> = self.lists.iter().map(|l| l.id).collect();
        self.views.retain(|id, _| live.contains(id));

        if let Some(drag) = &self.drag {
            let still_there = self.list(drag.list).and_then(|l| l.item_index(drag.item)).is_some();
            if !still_there {
                self.drag = None;
                applied.drag_discarded = true;
                debug!("drag target removed by snapshot");
            }
        }

        for list in &self.lists {
            match workflow::resolve_workflow(&self.workflows, list) {
                Some((group, stale)) => {
                    applied.stale.extend(stale);
                    applied.stale.extend(workflow::stale_statuses(list, group));
                }
                None => warn!(list = %list.id, "no workflow available"),
            }
        }
        for stale in &applied.stale {
            match stale {
                StaleReference::Workflow { list, missing, fallback } => {
                    warn!(%list, %missing, %fallback, "list references missing workflow")
                }
                StaleReference::Status { list, item, missing } => {
                    debug!(%list, %item, %missing, "item references status outside its workflow")
                }
            }
        }

        applied.list_count = self.lists.len();
        self.version += 1;
        applied
    }

    /// React to a write the store did not accept.
    ///
    /// Reversible writes are undone locally; everything else stays as the
    /// user's working state.
    pub fn on_sync_failure(&mut self, mutation: &Mutation, error: &SyncError) -> Notice {
        let what = mutation.describe();
        let error = error.to_string();
        match mutation {
            Mutation::DeleteHistory { entry, .. } if mutation.is_reversible() => {
                if !self.history.iter().any(|h| h.id == entry.id) {
                    self.history.push(entry.clone());
                    self.version += 1;
                }
                warn!(entry = %entry.id, %error, "history delete failed, restored");
                Notice::Reverted { what, error }
            }
            _ => {
                warn!(%what, %error, "write not confirmed");
                Notice::Unconfirmed { what, error }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tally_core::KeyDirection;
    use tally_types::OrderKey;

    fn test_session() -> Session {
        let mut session = Session::new(OwnerId::new(), EngineConfig::default());
        let snapshot = StoreSnapshot {
            config: Some(ConfigDocument::builtin()),
            ..Default::default()
        };
        session.apply_snapshot(&snapshot);
        session.take_mutations();
        session
    }

    fn purchasing(session: &Session) -> StatusGroup {
        session.workflows()[1].clone()
    }

    fn list_with_items(session: &mut Session, names: &[&str]) -> ListId {
        let workflow = purchasing(session).id;
        let list = session.create_list("Hardware", Some(workflow)).unwrap();
        for name in names {
            session.add_item(list, name, 1).unwrap();
        }
        session.take_mutations();
        list
    }

    fn item_ids(items: &[Item]) -> Vec<ItemId> {
        items.iter().map(|i| i.id).collect()
    }

    fn snapshot_of(session: &Session) -> StoreSnapshot {
        StoreSnapshot {
            lists: session.lists().to_vec(),
            config: Some(ConfigDocument {
                status_groups: session.workflows().to_vec(),
            }),
            history: session.history().to_vec(),
        }
    }

    // ── Lists ───────────────────────────────────────────────────────────

    #[test]
    fn test_drag_list_to_front() {
        let mut session = test_session();
        let owner = session.owner();
        let group = session.workflows()[0].id;
        let lists: Vec<List> = [("A", 10.0), ("B", 20.0), ("C", 30.0)]
            .iter()
            .map(|(name, key)| List::new(owner, *name, OrderKey::new(*key), group))
            .collect();
        session.apply_snapshot(&StoreSnapshot {
            lists,
            config: Some(ConfigDocument::builtin()),
            history: vec![],
        });

        let plan = session.move_list(2, 0).unwrap();
        let c = session.lists()[0].id;
        assert_eq!(plan, ListMovePlan::Keyed { id: c, key: OrderKey::new(-990.0) });
        let names: Vec<&str> = session.lists().iter().map(|l| l.name.as_str()).collect();
        assert_eq!(names, ["C", "A", "B"]);

        let writes = session.take_mutations();
        assert_eq!(writes.len(), 1);
        assert!(matches!(&writes[0], Mutation::PutList(l) if l.name == "C" && l.order_key == OrderKey::new(-990.0)));
    }

    #[test]
    fn test_move_to_same_position_writes_nothing() {
        let mut session = test_session();
        session.create_list("A", None).unwrap();
        session.create_list("B", None).unwrap();
        session.take_mutations();
        assert_eq!(session.move_list(1, 1).unwrap(), ListMovePlan::NoOp);
        assert_eq!(session.pending_mutations(), 0);
    }

    #[test]
    fn test_new_lists_append() {
        let mut session = test_session();
        let a = session.create_list("A", None).unwrap();
        let b = session.create_list("B", None).unwrap();
        let ids: Vec<ListId> = session.lists().iter().map(|l| l.id).collect();
        assert_eq!(ids, [a, b]);
        assert!(session.create_list("  ", None).is_err());
    }

    #[test]
    fn test_delete_only_list() {
        let mut session = test_session();
        let list = list_with_items(&mut session, &["Nails", "Screws"]);
        session.set_sort_mode(list, SortMode::Status).unwrap();
        session.delete_list(list).unwrap();
        assert!(session.lists().is_empty());
        assert_eq!(session.sort_mode(list), SortMode::Custom);
        assert_eq!(
            session.take_mutations(),
            vec![Mutation::DeleteList { owner: session.owner(), id: list }]
        );
    }

    // ── Items and statuses ──────────────────────────────────────────────

    #[test]
    fn test_add_item_records_history_once() {
        let mut session = test_session();
        let list = list_with_items(&mut session, &["Milk"]);
        session.add_item(list, "milk", 2).unwrap();
        assert_eq!(session.history().len(), 1);
        assert!(session.add_item(list, "Eggs", 0).is_err());
        assert_eq!(session.list(list).unwrap().items.len(), 2);
    }

    #[test]
    fn test_cycle_four_times_returns() {
        let mut session = test_session();
        let list = list_with_items(&mut session, &["Nails"]);
        let item = session.list(list).unwrap().items[0].id;
        let wf = purchasing(&session);
        assert_eq!(session.cycle_status(list, item).unwrap(), wf.statuses[1].id);
        for _ in 0..3 {
            session.cycle_status(list, item).unwrap();
        }
        assert_eq!(session.list(list).unwrap().items[0].status, wf.statuses[0].id);
    }

    #[test]
    fn test_freeze_while_status_sorted() {
        let mut session = test_session();
        let list = list_with_items(&mut session, &["1", "2"]);
        let ids = item_ids(&session.list(list).unwrap().items);
        // Item 2 is one step ahead.
        session.cycle_status(list, ids[1]).unwrap();
        session.set_sort_mode(list, SortMode::Status).unwrap();
        assert_eq!(item_ids(&session.render(list).unwrap()), ids);

        session.cycle_status(list, ids[0]).unwrap();
        assert_eq!(session.sort_mode(list), SortMode::Custom);
        assert_eq!(item_ids(&session.render(list).unwrap()), ids);
        assert_eq!(item_ids(&session.list(list).unwrap().items), ids);
    }

    #[test]
    fn test_second_cycle_before_render_is_shown() {
        let mut session = test_session();
        let list = list_with_items(&mut session, &["1", "2"]);
        let ids = item_ids(&session.list(list).unwrap().items);
        let received = purchasing(&session).statuses[2].id;
        session.set_sort_mode(list, SortMode::Status).unwrap();

        session.cycle_status(list, ids[0]).unwrap();
        session.cycle_status(list, ids[0]).unwrap();
        let rendered = session.render(list).unwrap();
        assert_eq!(rendered[0].status, received);
        assert_eq!(rendered, session.list(list).unwrap().items);
    }

    #[test]
    fn test_edits_after_freeze_are_shown() {
        let mut session = test_session();
        let list = list_with_items(&mut session, &["1", "2"]);
        let ids = item_ids(&session.list(list).unwrap().items);
        session.set_sort_mode(list, SortMode::Status).unwrap();
        session.cycle_status(list, ids[0]).unwrap();

        let added = session.add_item(list, "3", 1).unwrap();
        session.rename_item(list, ids[1], "two").unwrap();
        session.set_quantity(list, ids[0], 4).unwrap();
        let rendered = session.render(list).unwrap();
        assert_eq!(item_ids(&rendered), [ids[0], ids[1], added]);
        assert_eq!(rendered[0].quantity, 4);
        assert_eq!(rendered[1].name, "two");
        assert_eq!(rendered, session.list(list).unwrap().items);
    }

    #[test]
    fn test_transitional_survives_stale_snapshot() {
        let mut session = test_session();
        let list = list_with_items(&mut session, &["b", "a"]);
        let stale = snapshot_of(&session);
        session.set_sort_mode(list, SortMode::Status).unwrap();
        let ids = item_ids(&session.list(list).unwrap().items);

        session.cycle_status(list, ids[0]).unwrap();
        let frozen = session.peek(list).unwrap();
        session.apply_snapshot(&stale);

        // The pre-change snapshot replaced canonical state, but this render
        // still shows the frozen sequence.
        assert_eq!(session.render(list).unwrap(), frozen);
        assert_ne!(session.render(list).unwrap(), frozen);
    }

    #[test]
    fn test_change_workflow_requires_confirmation() {
        let mut session = test_session();
        let list = list_with_items(&mut session, &["Nails", "Screws"]);
        let item = session.list(list).unwrap().items[0].id;
        session.cycle_status(list, item).unwrap();
        session.take_mutations();
        let simple = session.workflows()[0].clone();

        let err = session.change_workflow(list, simple.id, false).unwrap_err();
        assert_eq!(err, CoreError::Validation(ValidationError::UnconfirmedWorkflowChange));
        assert_eq!(session.pending_mutations(), 0);

        session.change_workflow(list, simple.id, true).unwrap();
        let changed = session.list(list).unwrap();
        assert_eq!(changed.status_group_id, simple.id);
        assert!(changed.items.iter().all(|i| i.status == simple.statuses[0].id));
    }

    #[test]
    fn test_stale_workflow_falls_back() {
        let mut session = test_session();
        let owner = session.owner();
        let mut list = List::new(owner, "Orphan", OrderKey::new(0.0), StatusGroupId::new());
        list.items.push(Item::new("x", 1, StatusId::new()));
        let list_id = list.id;
        let item = list.items[0].id;
        let applied = session.apply_snapshot(&StoreSnapshot {
            lists: vec![list],
            config: Some(ConfigDocument::builtin()),
            history: vec![],
        });
        assert_eq!(applied.stale.len(), 2);

        let first = session.workflows()[0].clone();
        assert_eq!(session.workflow_of(list_id).unwrap().id, first.id);
        // Unknown status cycles to the fallback's first status.
        assert_eq!(session.cycle_status(list_id, item).unwrap(), first.statuses[0].id);
    }

    // ── Drag ────────────────────────────────────────────────────────────

    #[test]
    fn test_item_drag_moves_once() {
        let mut session = test_session();
        let list = list_with_items(&mut session, &["a", "b", "c", "d"]);
        let ids = item_ids(&session.list(list).unwrap().items);

        session.begin_drag(list, ids[0]).unwrap();
        session.hover(1, 0.2).unwrap();
        session.hover(2, 0.9).unwrap();
        session.hover(2, 0.5).unwrap();
        assert_eq!(session.pending_mutations(), 0);
        assert!(session.end_drag().unwrap());

        assert_eq!(item_ids(&session.list(list).unwrap().items), [ids[1], ids[2], ids[0], ids[3]]);
        assert_eq!(session.take_mutations().len(), 1);
    }

    #[test]
    fn test_drop_on_own_gap_is_noop() {
        let mut session = test_session();
        let list = list_with_items(&mut session, &["a", "b", "c"]);
        let before = session.list(list).unwrap().clone();
        let item = before.items[1].id;

        session.begin_drag(list, item).unwrap();
        session.hover(2, 0.1).unwrap();
        assert!(!session.end_drag().unwrap());
        assert_eq!(session.list(list).unwrap(), &before);
        assert_eq!(session.pending_mutations(), 0);
    }

    #[test]
    fn test_drag_rejected_outside_custom_sort() {
        let mut session = test_session();
        let list = list_with_items(&mut session, &["a", "b"]);
        let item = session.list(list).unwrap().items[0].id;
        session.set_sort_mode(list, SortMode::NameDescending).unwrap();
        assert_eq!(
            session.begin_drag(list, item).unwrap_err(),
            CoreError::Validation(ValidationError::ReorderRequiresCustomSort(SortMode::NameDescending))
        );
    }

    #[test]
    fn test_drag_survives_snapshot() {
        let mut session = test_session();
        let list = list_with_items(&mut session, &["a", "b", "c"]);
        let ids = item_ids(&session.list(list).unwrap().items);
        session.begin_drag(list, ids[2]).unwrap();
        session.hover(0, 0.1).unwrap();

        let applied = session.apply_snapshot(&snapshot_of(&session));
        assert!(!applied.drag_discarded);
        assert_eq!(session.drag().and_then(|d| d.indicator()), Some(DropIndicator::Before(0)));
        assert!(session.end_drag().unwrap());
        assert_eq!(item_ids(&session.list(list).unwrap().items), [ids[2], ids[0], ids[1]]);
    }

    #[test]
    fn test_drag_discarded_when_item_removed_remotely() {
        let mut session = test_session();
        let list = list_with_items(&mut session, &["a", "b"]);
        let ids = item_ids(&session.list(list).unwrap().items);
        session.begin_drag(list, ids[0]).unwrap();

        let mut remote = snapshot_of(&session);
        remote.lists[0].items.remove(0);
        assert!(session.apply_snapshot(&remote).drag_discarded);
        assert!(session.drag().is_none());
        assert!(session.end_drag().is_err());
    }

    #[test]
    fn test_random_drags_keep_items() {
        use rand::rngs::StdRng;
        use rand::{Rng, SeedableRng};

        let mut session = test_session();
        let names: Vec<String> = (0..8).map(|i| format!("item {i}")).collect();
        let refs: Vec<&str> = names.iter().map(String::as_str).collect();
        let list = list_with_items(&mut session, &refs);
        let mut expected = item_ids(&session.list(list).unwrap().items);
        expected.sort();

        let mut rng = StdRng::seed_from_u64(42);
        for _ in 0..200 {
            let items = session.list(list).unwrap().items.clone();
            let dragged = items[rng.gen_range(0..items.len())].id;
            session.begin_drag(list, dragged).unwrap();
            session.hover(rng.gen_range(0..items.len()), rng.gen_range(0.0..1.0)).unwrap();
            session.end_drag().unwrap();
            let mut now = item_ids(&session.list(list).unwrap().items);
            now.sort();
            assert_eq!(now, expected);
        }
    }

    // ── Workflow management ─────────────────────────────────────────────

    #[test]
    fn test_remove_status_migrates_items() {
        let mut session = test_session();
        let list = list_with_items(&mut session, &["a"]);
        let item = session.list(list).unwrap().items[0].id;
        let ordered = session.cycle_status(list, item).unwrap();
        let wf = purchasing(&session);

        session.remove_status(wf.id, ordered).unwrap();
        assert_eq!(session.list(list).unwrap().items[0].status, wf.statuses[0].id);
        assert_eq!(session.workflows()[1].len(), 3);
    }

    #[test]
    fn test_remove_last_status_and_workflow_rejected() {
        let mut session = test_session();
        let solo = session
            .add_workflow("Solo", vec![Status::new("Only", "todo", "")])
            .unwrap();
        let only = session.workflows()[2].statuses[0].id;
        assert!(matches!(
            session.remove_status(solo, only),
            Err(CoreError::Validation(ValidationError::LastStatus(_)))
        ));

        let ids: Vec<StatusGroupId> = session.workflows().iter().map(|g| g.id).collect();
        session.remove_workflow(ids[0]).unwrap();
        session.remove_workflow(ids[1]).unwrap();
        assert_eq!(
            session.remove_workflow(solo).unwrap_err(),
            CoreError::Validation(ValidationError::LastWorkflow)
        );
    }

    #[test]
    fn test_remove_workflow_moves_lists() {
        let mut session = test_session();
        let list = list_with_items(&mut session, &["a", "b"]);
        let purchasing = purchasing(&session).id;
        session.remove_workflow(purchasing).unwrap();
        let simple = session.workflows()[0].clone();
        let moved = session.list(list).unwrap();
        assert_eq!(moved.status_group_id, simple.id);
        assert!(moved.items.iter().all(|i| i.status == simple.statuses[0].id));
        let writes = session.take_mutations();
        assert!(writes.iter().any(|m| matches!(m, Mutation::PutConfig { .. })));
        assert!(writes.iter().any(|m| matches!(m, Mutation::PutList(l) if l.id == list)));
    }

    #[test]
    fn test_remove_workflow_migrates_fallback_lists() {
        let mut session = test_session();
        let owner = session.owner();
        let simple = session.workflows()[0].clone();
        let purchasing = purchasing(&session);
        let done = simple.statuses.last().unwrap().id;

        // The list's own workflow is gone, so it runs on the first one.
        let mut orphan = List::new(owner, "Orphan", OrderKey::new(0.0), StatusGroupId::new());
        orphan.items.push(Item::new("x", 1, done));
        let orphan_id = orphan.id;
        session.apply_snapshot(&StoreSnapshot {
            lists: vec![orphan],
            config: Some(ConfigDocument::builtin()),
            history: vec![],
        });
        session.take_mutations();
        assert_eq!(session.workflow_of(orphan_id).unwrap().id, simple.id);

        session.remove_workflow(simple.id).unwrap();
        let moved = session.list(orphan_id).unwrap();
        assert_eq!(moved.status_group_id, purchasing.id);
        assert!(moved.items.iter().all(|i| i.status == purchasing.statuses[0].id));
        let writes = session.take_mutations();
        assert!(writes.iter().any(|m| matches!(m, Mutation::PutList(l) if l.id == orphan_id)));
    }

    // ── Sync boundary ───────────────────────────────────────────────────

    #[test]
    fn test_missing_config_initialized_once() {
        let mut session = Session::new(OwnerId::new(), EngineConfig::default());
        let empty = StoreSnapshot::default();
        assert!(session.apply_snapshot(&empty).config_initialized);
        let writes = session.take_mutations();
        assert!(matches!(
            &writes[..],
            [Mutation::PutConfig { config, .. }] if config.status_groups == default_workflows()
        ));
        // Our write has not come back yet.
        assert!(!session.apply_snapshot(&empty).config_initialized);
        assert_eq!(session.pending_mutations(), 0);
    }

    #[test]
    fn test_snapshot_replaces_not_merges() {
        let mut session = test_session();
        let list = list_with_items(&mut session, &["a"]);
        session.add_item(list, "optimistic", 1).unwrap();
        let mut remote = snapshot_of(&session);
        remote.lists[0].items.truncate(1);
        session.apply_snapshot(&remote);
        assert_eq!(session.list(list).unwrap().items.len(), 1);
    }

    #[test]
    fn test_snapshot_orders_lists_by_key() {
        let mut session = Session::new(
            OwnerId::new(),
            EngineConfig::default().with_key_direction(KeyDirection::Descending),
        );
        let owner = session.owner();
        let group = session.workflows()[0].id;
        session.apply_snapshot(&StoreSnapshot {
            lists: vec![
                List::new(owner, "old", OrderKey::new(1.0), group),
                List::new(owner, "new", OrderKey::new(2.0), group),
            ],
            config: None,
            history: vec![],
        });
        assert_eq!(session.lists()[0].name, "new");
    }

    #[test]
    fn test_failed_history_delete_is_restored() {
        let mut session = test_session();
        list_with_items(&mut session, &["Milk"]);
        let entry = session.history()[0].clone();
        session.delete_history(entry.id).unwrap();
        assert!(session.history().is_empty());

        let writes = session.take_mutations();
        let notice = session.on_sync_failure(&writes[0], &SyncError::Unavailable("offline".into()));
        assert!(matches!(notice, Notice::Reverted { .. }));
        assert_eq!(session.history(), &[entry]);
    }

    #[test]
    fn test_failed_list_write_stays_optimistic() {
        let mut session = test_session();
        let list = list_with_items(&mut session, &["a"]);
        session.rename_list(list, "Renamed").unwrap();
        let writes = session.take_mutations();
        let notice = session.on_sync_failure(
            &writes[0],
            &SyncError::Rejected { what: "list".into(), reason: "denied".into() },
        );
        assert!(matches!(notice, Notice::Unconfirmed { .. }));
        assert_eq!(session.list(list).unwrap().name, "Renamed");
    }
}
