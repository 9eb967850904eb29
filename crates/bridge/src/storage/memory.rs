//! In-memory storage implementation
//!
//! Used for testing and as a stub where durable state is not required.

use anyhow::Result;
use std::collections::HashMap;
use std::sync::RwLock;

use super::StateStore;
use crate::models::{OrderCursor, SyncTime, TrackingState};

/// In-memory implementation of StateStore
///
/// Uses HashMaps protected by RwLocks for thread-safe access.
pub struct InMemoryStateStore {
    cursors: RwLock<HashMap<String, OrderCursor>>,
    sync_times: RwLock<HashMap<String, SyncTime>>,
    tracking_states: RwLock<HashMap<String, TrackingState>>,
}

impl InMemoryStateStore {
    /// Create a new empty in-memory store
    pub fn new() -> Self {
        Self {
            cursors: RwLock::new(HashMap::new()),
            sync_times: RwLock::new(HashMap::new()),
            tracking_states: RwLock::new(HashMap::new()),
        }
    }
}

impl Default for InMemoryStateStore {
    fn default() -> Self {
        Self::new()
    }
}

impl StateStore for InMemoryStateStore {
    fn get_cursor(&self, account: &str) -> Result<Option<OrderCursor>> {
        let cursors = self.cursors.read().unwrap();
        Ok(cursors.get(account).cloned())
    }

    fn save_cursor(&self, account: &str, cursor: OrderCursor) -> Result<()> {
        let mut cursors = self.cursors.write().unwrap();
        cursors.insert(account.to_string(), cursor);
        Ok(())
    }

    fn get_sync_time(&self, store_id: &str) -> Result<Option<SyncTime>> {
        let times = self.sync_times.read().unwrap();
        Ok(times.get(store_id).cloned())
    }

    fn save_sync_time(&self, store_id: &str, time: SyncTime) -> Result<()> {
        let mut times = self.sync_times.write().unwrap();
        times.insert(store_id.to_string(), time);
        Ok(())
    }

    fn get_tracking_state(&self, store_id: &str) -> Result<Option<TrackingState>> {
        let states = self.tracking_states.read().unwrap();
        Ok(states.get(store_id).cloned())
    }

    fn save_tracking_state(&self, store_id: &str, state: TrackingState) -> Result<()> {
        let mut states = self.tracking_states.write().unwrap();
        states.insert(store_id.to_string(), state);
        Ok(())
    }

    fn clear_tracking_state(&self, store_id: &str) -> Result<()> {
        let mut states = self.tracking_states.write().unwrap();
        states.remove(store_id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cursor_crud() {
        let store = InMemoryStateStore::new();

        assert!(store.get_cursor("acct").unwrap().is_none());

        store
            .save_cursor("acct", OrderCursor::new("cursor-1"))
            .unwrap();
        let cursor = store.get_cursor("acct").unwrap().unwrap();
        assert_eq!(cursor.cursor, "cursor-1");

        // Upsert replaces
        store
            .save_cursor("acct", cursor.advanced("cursor-2"))
            .unwrap();
        assert_eq!(store.get_cursor("acct").unwrap().unwrap().cursor, "cursor-2");
    }

    #[test]
    fn test_cursor_scoped_per_account() {
        let store = InMemoryStateStore::new();
        store.save_cursor("a", OrderCursor::new("ca")).unwrap();
        store.save_cursor("b", OrderCursor::new("cb")).unwrap();

        assert_eq!(store.get_cursor("a").unwrap().unwrap().cursor, "ca");
        assert_eq!(store.get_cursor("b").unwrap().unwrap().cursor, "cb");
    }

    #[test]
    fn test_sync_time_crud() {
        let store = InMemoryStateStore::new();
        assert!(store.get_sync_time("store-1").unwrap().is_none());

        let time = SyncTime::new(chrono::Utc::now());
        store.save_sync_time("store-1", time.clone()).unwrap();
        assert_eq!(
            store.get_sync_time("store-1").unwrap().unwrap().last_sync,
            time.last_sync
        );
    }

    #[test]
    fn test_tracking_state_crud_and_clear() {
        let store = InMemoryStateStore::new();

        let mut state = TrackingState::default();
        state.record("s1");
        store.save_tracking_state("store-1", state).unwrap();

        let loaded = store.get_tracking_state("store-1").unwrap().unwrap();
        assert!(loaded.contains("s1"));

        store.clear_tracking_state("store-1").unwrap();
        assert!(store.get_tracking_state("store-1").unwrap().is_none());
    }
}
