//! Session actor: one task owns the [`Session`] and serializes everything
//! that touches it.
//!
//! ```text
//!   SessionHandle (Clone, Send)   mpsc       SessionActor (tokio task)
//!   ┌──────────────────────┐  ─────────▶  ┌───────────────────────────┐
//!   │ .create_list()       │              │ Session                   │
//!   │ .cycle_status()      │  ◀─────────  │ snapshot subscription     │
//!   │ .end_drag()          │   oneshot    │ resubscribe with backoff  │
//!   └──────────────────────┘              └─────────────┬─────────────┘
//!            ▲                                          │ Mutation
//!            │ broadcast SessionEvent                   ▼
//!            └──────────────────────────────  writer task ─▶ DocumentStore
//! ```
//!
//! Commands, snapshots, and write failures arrive on one `select!` loop, so
//! a gesture and a snapshot never interleave. Writes go to a separate task
//! and are sent in order; a failure comes back to the actor as an event.

use std::sync::Arc;
use std::time::Duration;

use tally_core::lists::ListMovePlan;
use tally_core::position::{DragSession, DropIndicator};
use tally_core::projection::SortMode;
use tally_core::{CoreError, EngineConfig};
use tally_types::{
    HistoryEntry, HistoryId, Item, ItemId, List, ListId, OwnerId, Status, StatusGroup, StatusGroupId,
    StatusId, StoreSnapshot,
};
use tokio::sync::{broadcast, mpsc, oneshot};
use tokio::time::Instant;
use tracing::{debug, info, trace, warn};

use crate::constants::{EVENT_CHANNEL_CAPACITY, RESUBSCRIBE_INITIAL_BACKOFF, RESUBSCRIBE_MAX_BACKOFF};
use crate::session::Session;
use crate::store::{DocumentStore, Mutation};
use crate::subscriptions::{ConnectionStatus, SessionEvent, Subscription};
use crate::sync::SyncError;

// ============================================================================
// Error Type
// ============================================================================

/// Errors from a session handle.
#[derive(Debug, thiserror::Error)]
pub enum ActorError {
    /// The session refused the operation.
    #[error(transparent)]
    Core(#[from] CoreError),
    #[error("session shut down")]
    Shutdown,
}

// ============================================================================
// Commands (internal)
// ============================================================================

type Reply<T> = oneshot::Sender<Result<T, CoreError>>;

/// Internal command sent from SessionHandle to SessionActor.
enum SessionCommand {
    // Reads
    Lists { reply: Reply<Vec<List>> },
    Workflows { reply: Reply<Vec<StatusGroup>> },
    History { reply: Reply<Vec<HistoryEntry>> },
    Render { list: ListId, reply: Reply<Vec<Item>> },
    Peek { list: ListId, reply: Reply<Vec<Item>> },
    Export { list: ListId, reply: Reply<String> },
    SortMode { list: ListId, reply: Reply<SortMode> },
    Drag { reply: Reply<Option<DragSession>> },
    Version { reply: Reply<u64> },

    // Lists
    CreateList { name: String, workflow: Option<StatusGroupId>, reply: Reply<ListId> },
    RenameList { list: ListId, name: String, reply: Reply<()> },
    DeleteList { list: ListId, reply: Reply<List> },
    MoveList { from: usize, to: usize, reply: Reply<ListMovePlan> },

    // Items
    AddItem { list: ListId, name: String, quantity: i64, reply: Reply<ItemId> },
    RenameItem { list: ListId, item: ItemId, name: String, reply: Reply<()> },
    SetQuantity { list: ListId, item: ItemId, quantity: i64, reply: Reply<()> },
    DeleteItem { list: ListId, item: ItemId, reply: Reply<Item> },
    CycleStatus { list: ListId, item: ItemId, reply: Reply<StatusId> },
    ChangeWorkflow { list: ListId, workflow: StatusGroupId, confirmed: bool, reply: Reply<()> },
    SetSortMode { list: ListId, sort: SortMode, reply: Reply<()> },

    // Drag
    BeginDrag { list: ListId, item: ItemId, reply: Reply<()> },
    Hover { index: usize, fraction: f64, reply: Reply<Option<DropIndicator>> },
    EndDrag { reply: Reply<bool> },
    CancelDrag { reply: Reply<bool> },

    // Workflows
    AddWorkflow { name: String, statuses: Vec<Status>, reply: Reply<StatusGroupId> },
    RenameWorkflow { workflow: StatusGroupId, name: String, reply: Reply<()> },
    RemoveWorkflow { workflow: StatusGroupId, reply: Reply<()> },
    AddStatus { workflow: StatusGroupId, name: String, icon: String, color: String, reply: Reply<StatusId> },
    RenameStatus { workflow: StatusGroupId, status: StatusId, name: String, reply: Reply<()> },
    RemoveStatus { workflow: StatusGroupId, status: StatusId, reply: Reply<()> },

    // History
    DeleteHistory { entry: HistoryId, reply: Reply<()> },
}

// ============================================================================
// SessionHandle (public API)
// ============================================================================

/// Cloneable handle to a running session actor.
///
/// Each method sends a command and awaits the reply. The actor stops when
/// the last handle is dropped.
#[derive(Clone)]
pub struct SessionHandle {
    owner: OwnerId,
    tx: mpsc::UnboundedSender<SessionCommand>,
    events: broadcast::Sender<SessionEvent>,
}

impl SessionHandle {
    async fn request<T>(&self, build: impl FnOnce(Reply<T>) -> SessionCommand) -> Result<T, ActorError> {
        let (reply, rx) = oneshot::channel();
        self.tx.send(build(reply)).map_err(|_| ActorError::Shutdown)?;
        Ok(rx.await.map_err(|_| ActorError::Shutdown)??)
    }

    pub fn owner(&self) -> OwnerId {
        self.owner
    }

    /// Receive change, notice, and connection events.
    pub fn subscribe_events(&self) -> broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }

    // ── Reads ────────────────────────────────────────────────────────────

    /// Lists in display order.
    pub async fn lists(&self) -> Result<Vec<List>, ActorError> {
        self.request(|reply| SessionCommand::Lists { reply }).await
    }

    pub async fn workflows(&self) -> Result<Vec<StatusGroup>, ActorError> {
        self.request(|reply| SessionCommand::Workflows { reply }).await
    }

    pub async fn history(&self) -> Result<Vec<HistoryEntry>, ActorError> {
        self.request(|reply| SessionCommand::History { reply }).await
    }

    /// Items as displayed; consumes a pending transitional override.
    pub async fn render(&self, list: ListId) -> Result<Vec<Item>, ActorError> {
        self.request(|reply| SessionCommand::Render { list, reply }).await
    }

    pub async fn peek(&self, list: ListId) -> Result<Vec<Item>, ActorError> {
        self.request(|reply| SessionCommand::Peek { list, reply }).await
    }

    pub async fn export(&self, list: ListId) -> Result<String, ActorError> {
        self.request(|reply| SessionCommand::Export { list, reply }).await
    }

    pub async fn sort_mode(&self, list: ListId) -> Result<SortMode, ActorError> {
        self.request(|reply| SessionCommand::SortMode { list, reply }).await
    }

    pub async fn drag(&self) -> Result<Option<DragSession>, ActorError> {
        self.request(|reply| SessionCommand::Drag { reply }).await
    }

    pub async fn version(&self) -> Result<u64, ActorError> {
        self.request(|reply| SessionCommand::Version { reply }).await
    }

    // ── Lists ────────────────────────────────────────────────────────────

    pub async fn create_list(&self, name: &str, workflow: Option<StatusGroupId>) -> Result<ListId, ActorError> {
        let name = name.to_string();
        self.request(|reply| SessionCommand::CreateList { name, workflow, reply }).await
    }

    pub async fn rename_list(&self, list: ListId, name: &str) -> Result<(), ActorError> {
        let name = name.to_string();
        self.request(|reply| SessionCommand::RenameList { list, name, reply }).await
    }

    pub async fn delete_list(&self, list: ListId) -> Result<List, ActorError> {
        self.request(|reply| SessionCommand::DeleteList { list, reply }).await
    }

    /// Move the list at display index `from` to `to`.
    pub async fn move_list(&self, from: usize, to: usize) -> Result<ListMovePlan, ActorError> {
        self.request(|reply| SessionCommand::MoveList { from, to, reply }).await
    }

    // ── Items ────────────────────────────────────────────────────────────

    pub async fn add_item(&self, list: ListId, name: &str, quantity: i64) -> Result<ItemId, ActorError> {
        let name = name.to_string();
        self.request(|reply| SessionCommand::AddItem { list, name, quantity, reply }).await
    }

    pub async fn rename_item(&self, list: ListId, item: ItemId, name: &str) -> Result<(), ActorError> {
        let name = name.to_string();
        self.request(|reply| SessionCommand::RenameItem { list, item, name, reply }).await
    }

    pub async fn set_quantity(&self, list: ListId, item: ItemId, quantity: i64) -> Result<(), ActorError> {
        self.request(|reply| SessionCommand::SetQuantity { list, item, quantity, reply }).await
    }

    pub async fn delete_item(&self, list: ListId, item: ItemId) -> Result<Item, ActorError> {
        self.request(|reply| SessionCommand::DeleteItem { list, item, reply }).await
    }

    pub async fn cycle_status(&self, list: ListId, item: ItemId) -> Result<StatusId, ActorError> {
        self.request(|reply| SessionCommand::CycleStatus { list, item, reply }).await
    }

    /// Resets every item of the list. `confirmed` must be true.
    pub async fn change_workflow(
        &self,
        list: ListId,
        workflow: StatusGroupId,
        confirmed: bool,
    ) -> Result<(), ActorError> {
        self.request(|reply| SessionCommand::ChangeWorkflow { list, workflow, confirmed, reply }).await
    }

    pub async fn set_sort_mode(&self, list: ListId, sort: SortMode) -> Result<(), ActorError> {
        self.request(|reply| SessionCommand::SetSortMode { list, sort, reply }).await
    }

    // ── Drag ─────────────────────────────────────────────────────────────

    pub async fn begin_drag(&self, list: ListId, item: ItemId) -> Result<(), ActorError> {
        self.request(|reply| SessionCommand::BeginDrag { list, item, reply }).await
    }

    pub async fn hover(&self, index: usize, fraction: f64) -> Result<Option<DropIndicator>, ActorError> {
        self.request(|reply| SessionCommand::Hover { index, fraction, reply }).await
    }

    pub async fn end_drag(&self) -> Result<bool, ActorError> {
        self.request(|reply| SessionCommand::EndDrag { reply }).await
    }

    pub async fn cancel_drag(&self) -> Result<bool, ActorError> {
        self.request(|reply| SessionCommand::CancelDrag { reply }).await
    }

    // ── Workflows ────────────────────────────────────────────────────────

    pub async fn add_workflow(&self, name: &str, statuses: Vec<Status>) -> Result<StatusGroupId, ActorError> {
        let name = name.to_string();
        self.request(|reply| SessionCommand::AddWorkflow { name, statuses, reply }).await
    }

    pub async fn rename_workflow(&self, workflow: StatusGroupId, name: &str) -> Result<(), ActorError> {
        let name = name.to_string();
        self.request(|reply| SessionCommand::RenameWorkflow { workflow, name, reply }).await
    }

    pub async fn remove_workflow(&self, workflow: StatusGroupId) -> Result<(), ActorError> {
        self.request(|reply| SessionCommand::RemoveWorkflow { workflow, reply }).await
    }

    pub async fn add_status(
        &self,
        workflow: StatusGroupId,
        name: &str,
        icon: &str,
        color: &str,
    ) -> Result<StatusId, ActorError> {
        let (name, icon, color) = (name.to_string(), icon.to_string(), color.to_string());
        self.request(|reply| SessionCommand::AddStatus { workflow, name, icon, color, reply }).await
    }

    pub async fn rename_status(&self, workflow: StatusGroupId, status: StatusId, name: &str) -> Result<(), ActorError> {
        let name = name.to_string();
        self.request(|reply| SessionCommand::RenameStatus { workflow, status, name, reply }).await
    }

    pub async fn remove_status(&self, workflow: StatusGroupId, status: StatusId) -> Result<(), ActorError> {
        self.request(|reply| SessionCommand::RemoveStatus { workflow, status, reply }).await
    }

    // ── History ──────────────────────────────────────────────────────────

    pub async fn delete_history(&self, entry: HistoryId) -> Result<(), ActorError> {
        self.request(|reply| SessionCommand::DeleteHistory { entry, reply }).await
    }
}

// ============================================================================
// SessionActor (internal)
// ============================================================================

struct SessionActor {
    session: Session,
    store: Arc<dyn DocumentStore>,
    events: broadcast::Sender<SessionEvent>,
    writes: mpsc::UnboundedSender<Mutation>,
    /// Last version announced as `Changed`.
    published: u64,
}

/// Backoff before resubscribe attempt `attempt` (1-based).
fn resubscribe_delay(attempt: u32) -> Duration {
    let factor = 1u32 << attempt.saturating_sub(1).min(16);
    RESUBSCRIBE_INITIAL_BACKOFF
        .saturating_mul(factor)
        .min(RESUBSCRIBE_MAX_BACKOFF)
}

/// Next snapshot from the live subscription; pending forever without one.
async fn next_snapshot(subscription: &mut Option<Subscription>) -> Option<Arc<StoreSnapshot>> {
    match subscription {
        Some(sub) => sub.next().await,
        None => std::future::pending().await,
    }
}

impl SessionActor {
    fn emit(&self, event: SessionEvent) {
        // No receivers is fine.
        let _ = self.events.send(event);
    }

    /// Hand queued writes to the writer and announce a new version.
    fn flush(&mut self) {
        for mutation in self.session.take_mutations() {
            trace!(what = %mutation.describe(), "queueing write");
            if self.writes.send(mutation).is_err() {
                warn!("writer task gone, dropping write");
            }
        }
        let version = self.session.version();
        if version != self.published {
            self.published = version;
            self.emit(SessionEvent::Changed { version });
        }
    }

    async fn run(
        mut self,
        mut commands: mpsc::UnboundedReceiver<SessionCommand>,
        mut failures: mpsc::UnboundedReceiver<(Mutation, SyncError)>,
    ) {
        let owner = self.session.owner();
        let mut subscription: Option<Subscription> = None;
        let mut attempt: u32 = 0;
        let retry = tokio::time::sleep(Duration::ZERO);
        tokio::pin!(retry);

        loop {
            tokio::select! {
                cmd = commands.recv() => match cmd {
                    Some(cmd) => self.handle_command(cmd),
                    None => break,
                },
                Some((mutation, error)) = failures.recv() => {
                    let notice = self.session.on_sync_failure(&mutation, &error);
                    self.emit(SessionEvent::Notice(notice));
                }
                snapshot = next_snapshot(&mut subscription), if subscription.is_some() => match snapshot {
                    Some(snapshot) => {
                        let applied = self.session.apply_snapshot(&snapshot);
                        debug!(%owner, lists = applied.list_count, stale = applied.stale.len(), "snapshot applied");
                    }
                    None => {
                        warn!(%owner, "snapshot stream ended, resubscribing");
                        subscription = None;
                        attempt = 0;
                        self.emit(SessionEvent::Connection(ConnectionStatus::Disconnected));
                        retry.as_mut().reset(Instant::now() + RESUBSCRIBE_INITIAL_BACKOFF);
                    }
                },
                () = &mut retry, if subscription.is_none() => {
                    match self.store.subscribe(owner).await {
                        Ok(sub) => {
                            info!(%owner, "subscribed");
                            subscription = Some(sub);
                            attempt = 0;
                            self.emit(SessionEvent::Connection(ConnectionStatus::Connected));
                        }
                        Err(e) => {
                            attempt = attempt.saturating_add(1);
                            let delay = resubscribe_delay(attempt);
                            warn!(%owner, attempt, ?delay, "subscribe failed: {e}");
                            self.emit(SessionEvent::Connection(ConnectionStatus::Reconnecting { attempt }));
                            retry.as_mut().reset(Instant::now() + delay);
                        }
                    }
                }
            }
            self.flush();
        }
        debug!(%owner, "session actor shutting down: all handles dropped");
    }

    fn handle_command(&mut self, cmd: SessionCommand) {
        let s = &mut self.session;
        match cmd {
            // ── Reads ────────────────────────────────────────────────
            SessionCommand::Lists { reply } => {
                let _ = reply.send(Ok(s.lists().to_vec()));
            }
            SessionCommand::Workflows { reply } => {
                let _ = reply.send(Ok(s.workflows().to_vec()));
            }
            SessionCommand::History { reply } => {
                let _ = reply.send(Ok(s.history().to_vec()));
            }
            SessionCommand::Render { list, reply } => {
                let _ = reply.send(s.render(list));
            }
            SessionCommand::Peek { list, reply } => {
                let _ = reply.send(s.peek(list));
            }
            SessionCommand::Export { list, reply } => {
                let _ = reply.send(s.export(list));
            }
            SessionCommand::SortMode { list, reply } => {
                let _ = reply.send(Ok(s.sort_mode(list)));
            }
            SessionCommand::Drag { reply } => {
                let _ = reply.send(Ok(s.drag().cloned()));
            }
            SessionCommand::Version { reply } => {
                let _ = reply.send(Ok(s.version()));
            }

            // ── Lists ────────────────────────────────────────────────
            SessionCommand::CreateList { name, workflow, reply } => {
                let _ = reply.send(s.create_list(&name, workflow));
            }
            SessionCommand::RenameList { list, name, reply } => {
                let _ = reply.send(s.rename_list(list, &name));
            }
            SessionCommand::DeleteList { list, reply } => {
                let _ = reply.send(s.delete_list(list));
            }
            SessionCommand::MoveList { from, to, reply } => {
                let _ = reply.send(s.move_list(from, to));
            }

            // ── Items ────────────────────────────────────────────────
            SessionCommand::AddItem { list, name, quantity, reply } => {
                let _ = reply.send(s.add_item(list, &name, quantity));
            }
            SessionCommand::RenameItem { list, item, name, reply } => {
                let _ = reply.send(s.rename_item(list, item, &name));
            }
            SessionCommand::SetQuantity { list, item, quantity, reply } => {
                let _ = reply.send(s.set_quantity(list, item, quantity));
            }
            SessionCommand::DeleteItem { list, item, reply } => {
                let _ = reply.send(s.delete_item(list, item));
            }
            SessionCommand::CycleStatus { list, item, reply } => {
                let _ = reply.send(s.cycle_status(list, item));
            }
            SessionCommand::ChangeWorkflow { list, workflow, confirmed, reply } => {
                let _ = reply.send(s.change_workflow(list, workflow, confirmed));
            }
            SessionCommand::SetSortMode { list, sort, reply } => {
                let _ = reply.send(s.set_sort_mode(list, sort));
            }

            // ── Drag ─────────────────────────────────────────────────
            SessionCommand::BeginDrag { list, item, reply } => {
                let _ = reply.send(s.begin_drag(list, item));
            }
            SessionCommand::Hover { index, fraction, reply } => {
                let _ = reply.send(s.hover(index, fraction));
            }
            SessionCommand::EndDrag { reply } => {
                let _ = reply.send(s.end_drag());
            }
            SessionCommand::CancelDrag { reply } => {
                let _ = reply.send(Ok(s.cancel_drag()));
            }

            // ── Workflows ────────────────────────────────────────────
            SessionCommand::AddWorkflow { name, statuses, reply } => {
                let _ = reply.send(s.add_workflow(&name, statuses));
            }
            SessionCommand::RenameWorkflow { workflow, name, reply } => {
                let _ = reply.send(s.rename_workflow(workflow, &name));
            }
            SessionCommand::RemoveWorkflow { workflow, reply } => {
                let _ = reply.send(s.remove_workflow(workflow));
            }
            SessionCommand::AddStatus { workflow, name, icon, color, reply } => {
                let _ = reply.send(s.add_status(workflow, &name, &icon, &color));
            }
            SessionCommand::RenameStatus { workflow, status, name, reply } => {
                let _ = reply.send(s.rename_status(workflow, status, &name));
            }
            SessionCommand::RemoveStatus { workflow, status, reply } => {
                let _ = reply.send(s.remove_status(workflow, status));
            }

            // ── History ──────────────────────────────────────────────
            SessionCommand::DeleteHistory { entry, reply } => {
                let _ = reply.send(s.delete_history(entry));
            }
        }
    }
}

/// Send writes to the store one at a time, reporting failures back.
async fn run_writer(
    store: Arc<dyn DocumentStore>,
    mut writes: mpsc::UnboundedReceiver<Mutation>,
    failures: mpsc::UnboundedSender<(Mutation, SyncError)>,
) {
    while let Some(mutation) = writes.recv().await {
        match store.mutate(mutation.clone()).await {
            Ok(ack) => trace!(what = %mutation.describe(), revision = ack.revision, "write acknowledged"),
            Err(error) => {
                if failures.send((mutation, error)).is_err() {
                    break;
                }
            }
        }
    }
    debug!("writer shutting down");
}

// ============================================================================
// Public spawn function
// ============================================================================

/// Spawn a session for `owner` on the current tokio runtime.
///
/// The actor subscribes immediately and keeps resubscribing with backoff
/// whenever the snapshot stream ends.
pub fn spawn_session(store: Arc<dyn DocumentStore>, owner: OwnerId, config: EngineConfig) -> SessionHandle {
    let (tx, commands) = mpsc::unbounded_channel();
    let (writes, write_rx) = mpsc::unbounded_channel();
    let (failure_tx, failures) = mpsc::unbounded_channel();
    let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);

    let actor = SessionActor {
        session: Session::new(owner, config),
        store: store.clone(),
        events: events.clone(),
        writes,
        published: 0,
    };
    tokio::spawn(run_writer(store, write_rx, failure_tx));
    tokio::spawn(actor.run(commands, failures));
    SessionHandle { owner, tx, events }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resubscribe_delay_grows_and_caps() {
        assert_eq!(resubscribe_delay(1), RESUBSCRIBE_INITIAL_BACKOFF);
        assert_eq!(resubscribe_delay(2), RESUBSCRIBE_INITIAL_BACKOFF * 2);
        assert_eq!(resubscribe_delay(4), RESUBSCRIBE_INITIAL_BACKOFF * 8);
        assert_eq!(resubscribe_delay(60), RESUBSCRIBE_MAX_BACKOFF);
    }
}
