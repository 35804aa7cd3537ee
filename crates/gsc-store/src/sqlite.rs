//! SQLite-based store implementation

use gsc_util::UnitKind;
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use tracing::{debug, warn};

use crate::{CounterRecord, CounterStore, StoreError, StoreResult};

/// SQLite-based store
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Open or create a store at the given path
    pub fn open(path: impl AsRef<Path>) -> StoreResult<Self> {
        let conn = Connection::open(path)?;
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.init_schema()?;
        Ok(store)
    }

    /// Create an in-memory store (for testing)
    pub fn in_memory() -> StoreResult<Self> {
        let conn = Connection::open_in_memory()?;
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.init_schema()?;
        Ok(store)
    }

    fn lock(&self) -> StoreResult<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|_| StoreError::Poisoned)
    }

    fn init_schema(&self) -> StoreResult<()> {
        let conn = self.lock()?;

        conn.execute_batch(
            r#"
            -- One row per entity name and unit
            CREATE TABLE IF NOT EXISTS counters (
                name TEXT NOT NULL,
                unit TEXT NOT NULL,
                record_json TEXT NOT NULL,
                PRIMARY KEY (name, unit)
            );
            "#,
        )?;

        debug!("Store schema initialized");
        Ok(())
    }
}

/// Decode a stored record, treating anything unreadable as absent.
fn decode(name: &str, unit: &str, json: &str) -> Option<CounterRecord> {
    match serde_json::from_str::<CounterRecord>(json) {
        Ok(record) if record.unit.as_str() == unit => Some(record),
        Ok(record) => {
            warn!(
                name = %name,
                row_unit = %unit,
                record_unit = %record.unit,
                "Counter record unit mismatch, ignoring"
            );
            None
        }
        Err(e) => {
            warn!(name = %name, unit = %unit, error = %e, "Corrupt counter record, ignoring");
            None
        }
    }
}

impl CounterStore for SqliteStore {
    fn load_counter(&self, name: &str, unit: UnitKind) -> StoreResult<Option<CounterRecord>> {
        let conn = self.lock()?;

        let json: Option<String> = conn
            .query_row(
                "SELECT record_json FROM counters WHERE name = ? AND unit = ?",
                params![name, unit.as_str()],
                |row| row.get(0),
            )
            .optional()?;

        Ok(json.and_then(|json| decode(name, unit.as_str(), &json)))
    }

    fn save_counter(&self, name: &str, record: &CounterRecord) -> StoreResult<()> {
        let conn = self.lock()?;
        let json = serde_json::to_string(record)?;

        conn.execute(
            r#"
            INSERT INTO counters (name, unit, record_json)
            VALUES (?, ?, ?)
            ON CONFLICT(name, unit)
            DO UPDATE SET record_json = excluded.record_json
            "#,
            params![name, record.unit.as_str(), json],
        )?;

        debug!(name = %name, unit = %record.unit, active_secs = record.active, "Counter saved");
        Ok(())
    }

    fn load_all(&self) -> StoreResult<Vec<(String, CounterRecord)>> {
        let conn = self.lock()?;

        let mut stmt =
            conn.prepare("SELECT name, unit, record_json FROM counters ORDER BY name, unit")?;

        let rows = stmt.query_map([], |row| {
            let name: String = row.get(0)?;
            let unit: String = row.get(1)?;
            let json: String = row.get(2)?;
            Ok((name, unit, json))
        })?;

        let mut counters = Vec::new();
        for row in rows {
            let (name, unit, json) = row?;
            if let Some(record) = decode(&name, &unit, &json) {
                counters.push((name, record));
            }
        }

        Ok(counters)
    }

    fn remove_counter(&self, name: &str, unit: UnitKind) -> StoreResult<()> {
        let conn = self.lock()?;
        conn.execute(
            "DELETE FROM counters WHERE name = ? AND unit = ?",
            params![name, unit.as_str()],
        )?;
        debug!(name = %name, unit = %unit, "Counter removed");
        Ok(())
    }

    fn is_healthy(&self) -> bool {
        match self.conn.lock() {
            Ok(conn) => conn.query_row("SELECT 1", [], |_| Ok(())).is_ok(),
            Err(_) => {
                warn!("Store lock poisoned");
                false
            }
        }
    }
}
