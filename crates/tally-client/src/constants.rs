//! Session tuning constants.

use std::time::Duration;

/// Capacity of the per-session event broadcast. Slow listeners that fall
/// further behind than this see `Lagged` and should re-read state.
pub const EVENT_CHANNEL_CAPACITY: usize = 64;

/// First delay before re-subscribing after the snapshot stream ends.
pub const RESUBSCRIBE_INITIAL_BACKOFF: Duration = Duration::from_millis(100);

/// Upper bound for the re-subscribe backoff.
pub const RESUBSCRIBE_MAX_BACKOFF: Duration = Duration::from_secs(10);

