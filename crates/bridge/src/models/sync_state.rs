//! Persisted checkpoints that make both pipelines resumable
//!
//! Three records, each scoped to one account:
//! - [`OrderCursor`]: pagination position in the marketplace order feed
//! - [`SyncTime`]: watermark bounding the tracking fetch window
//! - [`TrackingState`]: mid-batch progress of the tracking pipeline

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Pagination checkpoint for one marketplace account
///
/// Written after every fetched page, before the next page is requested.
/// A cursor is never rolled back; `advanced` enforces that the timestamp
/// can only move forward even if the clock misbehaves.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderCursor {
    /// Opaque pagination token from the marketplace
    pub cursor: String,
    pub updated_at: DateTime<Utc>,
}

impl OrderCursor {
    pub fn new(cursor: impl Into<String>) -> Self {
        Self {
            cursor: cursor.into(),
            updated_at: Utc::now(),
        }
    }

    /// Advance to a newer cursor position. Never rewinds `updated_at`.
    pub fn advanced(self, cursor: impl Into<String>) -> Self {
        Self {
            cursor: cursor.into(),
            updated_at: Utc::now().max(self.updated_at),
        }
    }
}

/// Last successful tracking sync for one destination store
///
/// Advances only when a tracking-update batch completes with no
/// unprocessed remainder.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyncTime {
    pub last_sync: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl SyncTime {
    pub fn new(last_sync: DateTime<Utc>) -> Self {
        Self {
            last_sync,
            updated_at: Utc::now(),
        }
    }
}

/// Mid-batch progress of the tracking-update pipeline for one store
///
/// Every id in `processed_shipment_ids` was attempted (pushed, found
/// already tracked, or permanently skipped) in this or a prior run. The
/// set is cleared only when a full batch completes.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TrackingState {
    pub last_processed_shipment_id: Option<String>,
    pub processed_shipment_ids: Vec<String>,
    pub last_sync: Option<DateTime<Utc>>,
}

impl TrackingState {
    /// Record one attempted shipment
    pub fn record(&mut self, shipment_id: &str) {
        if !self.contains(shipment_id) {
            self.processed_shipment_ids.push(shipment_id.to_string());
        }
        self.last_processed_shipment_id = Some(shipment_id.to_string());
    }

    pub fn contains(&self, shipment_id: &str) -> bool {
        self.processed_shipment_ids.iter().any(|id| id == shipment_id)
    }

    pub fn is_empty(&self) -> bool {
        self.processed_shipment_ids.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_cursor_advanced_keeps_timestamp_monotonic() {
        let mut cursor = OrderCursor::new("abc");
        // Simulate a clock that jumped ahead of wall time
        cursor.updated_at = Utc::now() + Duration::hours(1);
        let future = cursor.updated_at;

        let advanced = cursor.advanced("def");
        assert_eq!(advanced.cursor, "def");
        assert!(advanced.updated_at >= future);
    }

    #[test]
    fn test_cursor_advanced_moves_forward() {
        let cursor = OrderCursor::new("abc");
        let before = cursor.updated_at;
        let advanced = cursor.advanced("def");
        assert!(advanced.updated_at >= before);
    }

    #[test]
    fn test_tracking_state_record() {
        let mut state = TrackingState::default();
        assert!(state.is_empty());

        state.record("s1");
        state.record("s2");
        assert!(state.contains("s1"));
        assert!(state.contains("s2"));
        assert!(!state.contains("s3"));
        assert_eq!(state.last_processed_shipment_id, Some("s2".to_string()));
    }

    #[test]
    fn test_tracking_state_record_is_idempotent() {
        let mut state = TrackingState::default();
        state.record("s1");
        state.record("s1");
        assert_eq!(state.processed_shipment_ids.len(), 1);
    }

    #[test]
    fn test_serialization() {
        let mut state = TrackingState::default();
        state.record("s1");
        let json = serde_json::to_string(&state).unwrap();
        let parsed: TrackingState = serde_json::from_str(&json).unwrap();
        assert_eq!(state, parsed);
    }
}
