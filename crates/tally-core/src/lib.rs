//! Ordering, workflow, and read-model engine for Tally.
//!
//! Everything here is synchronous and pure: functions take the current
//! state and return the new state (or a plan for it). Persistence and the
//! session event loop live in `tally-client`.
//!
//! # Components
//!
//! - [`workflow`]: status cycling, workflow changes, stale-reference
//!   fallbacks, and workflow/status management
//! - [`order`]: fractional order keys for the sibling list collection
//! - [`lists`]: list display order and move planning (with renormalization)
//! - [`position`]: index-based item reordering with hover hysteresis
//! - [`projection`]: sort modes and the one-render transitional override
//! - [`items`]: validated item and list edits
//! - [`export`]: grouped text export
//!
//! # Two orderings
//!
//! Lists and items are ordered differently on purpose. Lists are separate
//! store documents, so moving one rewrites only its [`OrderKey`]. Items live
//! inside their list's document, so their order is simply their index.
//!
//! [`OrderKey`]: tally_types::OrderKey

pub mod config;
pub mod error;
pub mod export;
pub mod items;
pub mod lists;
pub mod order;
pub mod position;
pub mod projection;
pub mod workflow;

pub use config::{ConfigError, EngineConfig};
pub use error::{CoreError, ValidationError};
pub use export::export_text;
pub use lists::{ListMovePlan, plan_list_move};
pub use order::{KeyDirection, allocate_key};
pub use position::{DragSession, DropIndicator};
pub use projection::{ListView, SortMode};
pub use workflow::{StaleReference, change_workflow, next_status};

/// Result type for engine operations.
pub type Result<T> = std::result::Result<T, CoreError>;
