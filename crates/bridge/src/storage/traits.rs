//! Storage trait definitions

use crate::models::{OrderCursor, SyncTime, TrackingState};
use anyhow::Result;

/// Trait for persisted sync-checkpoint storage
///
/// Abstracts over different storage backends (in-memory for tests, SQLite
/// for production). Each record is scoped to one account: cursors by
/// account name, sync times and tracking states by destination store id.
pub trait StateStore: Send + Sync {
    /// Get the pagination cursor for a marketplace account
    fn get_cursor(&self, account: &str) -> Result<Option<OrderCursor>>;

    /// Save the pagination cursor for a marketplace account (upsert)
    fn save_cursor(&self, account: &str, cursor: OrderCursor) -> Result<()>;

    /// Get the last-successful-sync watermark for a destination store
    fn get_sync_time(&self, store_id: &str) -> Result<Option<SyncTime>>;

    /// Save the last-successful-sync watermark (upsert)
    fn save_sync_time(&self, store_id: &str, time: SyncTime) -> Result<()>;

    /// Get the in-progress tracking batch state for a destination store
    fn get_tracking_state(&self, store_id: &str) -> Result<Option<TrackingState>>;

    /// Save the in-progress tracking batch state (upsert)
    fn save_tracking_state(&self, store_id: &str, state: TrackingState) -> Result<()>;

    /// Clear the tracking batch state once a full batch completes
    fn clear_tracking_state(&self, store_id: &str) -> Result<()>;
}
