//! SQLite-based checkpoint storage

use std::path::Path;
use std::sync::Mutex;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use rusqlite::{Connection, OptionalExtension, params};
use rusqlite_migration::{M, Migrations};

use super::StateStore;
use crate::models::{OrderCursor, SyncTime, TrackingState};

/// Database migrations
///
/// Each migration is applied in order. The user_version pragma tracks which
/// migrations have been applied.
fn migrations() -> Migrations<'static> {
    Migrations::new(vec![
        // Migration 1: Initial schema
        M::up(
            r#"
            -- Pagination cursor per marketplace account
            CREATE TABLE order_cursors (
                account TEXT PRIMARY KEY,
                cursor TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );

            -- Tracking watermark per destination store
            CREATE TABLE sync_times (
                store_id TEXT PRIMARY KEY,
                last_sync TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );

            -- In-progress tracking batch per destination store
            CREATE TABLE tracking_states (
                store_id TEXT PRIMARY KEY,
                last_processed_shipment_id TEXT,
                processed_shipment_ids TEXT NOT NULL DEFAULT '[]',
                last_sync TEXT
            );
            "#,
        ),
    ])
}

/// SQLite-backed implementation of StateStore
///
/// One row per account (or store) per table; the processed-shipment set is
/// stored as a JSON array in a TEXT column.
pub struct SqliteStateStore {
    conn: Mutex<Connection>,
}

impl SqliteStateStore {
    /// Open (or create) the database at `db_path` and run migrations
    pub fn new(db_path: impl AsRef<Path>) -> Result<Self> {
        let mut conn = Connection::open(db_path.as_ref())
            .with_context(|| format!("Failed to open database at {:?}", db_path.as_ref()))?;

        // WAL keeps readers unblocked during the per-shipment checkpoint
        // writes; NORMAL sync is safe in combination with WAL.
        conn.execute_batch(
            r#"
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA foreign_keys = ON;
            "#,
        )?;

        migrations()
            .to_latest(&mut conn)
            .context("Failed to run database migrations")?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }
}

fn parse_timestamp(s: &str) -> Result<DateTime<Utc>> {
    Ok(DateTime::parse_from_rfc3339(s)
        .with_context(|| format!("Invalid timestamp in database: {}", s))?
        .with_timezone(&Utc))
}

impl StateStore for SqliteStateStore {
    fn get_cursor(&self, account: &str) -> Result<Option<OrderCursor>> {
        let conn = self.conn.lock().unwrap();
        let row = conn
            .query_row(
                "SELECT cursor, updated_at FROM order_cursors WHERE account = ?1",
                params![account],
                |row| Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?)),
            )
            .optional()?;

        match row {
            Some((cursor, updated_at)) => Ok(Some(OrderCursor {
                cursor,
                updated_at: parse_timestamp(&updated_at)?,
            })),
            None => Ok(None),
        }
    }

    fn save_cursor(&self, account: &str, cursor: OrderCursor) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO order_cursors (account, cursor, updated_at)
             VALUES (?1, ?2, ?3)
             ON CONFLICT(account) DO UPDATE SET cursor = ?2, updated_at = ?3",
            params![account, cursor.cursor, cursor.updated_at.to_rfc3339()],
        )?;
        Ok(())
    }

    fn get_sync_time(&self, store_id: &str) -> Result<Option<SyncTime>> {
        let conn = self.conn.lock().unwrap();
        let row = conn
            .query_row(
                "SELECT last_sync, updated_at FROM sync_times WHERE store_id = ?1",
                params![store_id],
                |row| Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?)),
            )
            .optional()?;

        match row {
            Some((last_sync, updated_at)) => Ok(Some(SyncTime {
                last_sync: parse_timestamp(&last_sync)?,
                updated_at: parse_timestamp(&updated_at)?,
            })),
            None => Ok(None),
        }
    }

    fn save_sync_time(&self, store_id: &str, time: SyncTime) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO sync_times (store_id, last_sync, updated_at)
             VALUES (?1, ?2, ?3)
             ON CONFLICT(store_id) DO UPDATE SET last_sync = ?2, updated_at = ?3",
            params![
                store_id,
                time.last_sync.to_rfc3339(),
                time.updated_at.to_rfc3339()
            ],
        )?;
        Ok(())
    }

    fn get_tracking_state(&self, store_id: &str) -> Result<Option<TrackingState>> {
        let conn = self.conn.lock().unwrap();
        let row = conn
            .query_row(
                "SELECT last_processed_shipment_id, processed_shipment_ids, last_sync
                 FROM tracking_states WHERE store_id = ?1",
                params![store_id],
                |row| {
                    Ok((
                        row.get::<_, Option<String>>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, Option<String>>(2)?,
                    ))
                },
            )
            .optional()?;

        match row {
            Some((last_id, processed_json, last_sync)) => {
                let processed: Vec<String> = serde_json::from_str(&processed_json)
                    .context("Invalid processed-shipment list in database")?;
                let last_sync = match last_sync {
                    Some(s) => Some(parse_timestamp(&s)?),
                    None => None,
                };
                Ok(Some(TrackingState {
                    last_processed_shipment_id: last_id,
                    processed_shipment_ids: processed,
                    last_sync,
                }))
            }
            None => Ok(None),
        }
    }

    fn save_tracking_state(&self, store_id: &str, state: TrackingState) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        let processed_json = serde_json::to_string(&state.processed_shipment_ids)?;
        conn.execute(
            "INSERT INTO tracking_states
                 (store_id, last_processed_shipment_id, processed_shipment_ids, last_sync)
             VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT(store_id) DO UPDATE SET
                 last_processed_shipment_id = ?2,
                 processed_shipment_ids = ?3,
                 last_sync = ?4",
            params![
                store_id,
                state.last_processed_shipment_id,
                processed_json,
                state.last_sync.map(|t| t.to_rfc3339())
            ],
        )?;
        Ok(())
    }

    fn clear_tracking_state(&self, store_id: &str) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "DELETE FROM tracking_states WHERE store_id = ?1",
            params![store_id],
        )?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn open_store(dir: &TempDir) -> SqliteStateStore {
        SqliteStateStore::new(dir.path().join("state.db")).unwrap()
    }

    #[test]
    fn test_cursor_roundtrip() {
        let dir = TempDir::new().unwrap();
        let store = open_store(&dir);

        assert!(store.get_cursor("acct").unwrap().is_none());

        let cursor = OrderCursor::new("page-token-1");
        store.save_cursor("acct", cursor.clone()).unwrap();

        let loaded = store.get_cursor("acct").unwrap().unwrap();
        assert_eq!(loaded.cursor, "page-token-1");
        // RFC 3339 roundtrip keeps sub-second precision
        assert_eq!(loaded.updated_at, cursor.updated_at);
    }

    #[test]
    fn test_cursor_upsert() {
        let dir = TempDir::new().unwrap();
        let store = open_store(&dir);

        store.save_cursor("acct", OrderCursor::new("one")).unwrap();
        store.save_cursor("acct", OrderCursor::new("two")).unwrap();

        assert_eq!(store.get_cursor("acct").unwrap().unwrap().cursor, "two");
    }

    #[test]
    fn test_sync_time_roundtrip() {
        let dir = TempDir::new().unwrap();
        let store = open_store(&dir);

        let time = SyncTime::new(Utc::now());
        store.save_sync_time("store-1", time.clone()).unwrap();

        let loaded = store.get_sync_time("store-1").unwrap().unwrap();
        assert_eq!(loaded.last_sync, time.last_sync);
    }

    #[test]
    fn test_tracking_state_roundtrip_and_clear() {
        let dir = TempDir::new().unwrap();
        let store = open_store(&dir);

        let mut state = TrackingState::default();
        state.record("s1");
        state.record("s2");
        state.last_sync = Some(Utc::now());

        store.save_tracking_state("store-1", state.clone()).unwrap();
        let loaded = store.get_tracking_state("store-1").unwrap().unwrap();
        assert_eq!(loaded, state);

        store.clear_tracking_state("store-1").unwrap();
        assert!(store.get_tracking_state("store-1").unwrap().is_none());
    }

    #[test]
    fn test_reopen_preserves_state() {
        let dir = TempDir::new().unwrap();
        let db_path = dir.path().join("state.db");

        {
            let store = SqliteStateStore::new(&db_path).unwrap();
            store.save_cursor("acct", OrderCursor::new("kept")).unwrap();
        }

        let store = SqliteStateStore::new(&db_path).unwrap();
        assert_eq!(store.get_cursor("acct").unwrap().unwrap().cursor, "kept");
    }
}
