//! Tally session client.
//!
//! Holds one owner's working state ([`Session`]), talks to an opaque
//! document store through [`DocumentStore`], and runs both behind a
//! cloneable [`SessionHandle`]. [`MemoryStore`] is an in-process store for
//! tests and offline use.

pub mod actor;
pub mod constants;
pub mod memory;
pub mod session;
pub mod store;
pub mod subscriptions;
pub mod sync;

pub use actor::{ActorError, SessionHandle, spawn_session};
pub use memory::MemoryStore;
pub use session::Session;
pub use store::{Ack, DocumentKey, DocumentStore, Mutation};
pub use subscriptions::{ConnectionStatus, SessionEvent, Subscription};
pub use sync::{Notice, Outbox, SnapshotApplied, SyncError};
