//! Persistence store
//!
//! An append-only log of neuron-state snapshots and the prompt/response
//! pairs that produced them, backed by SQLite.

mod schema;

use schema::SCHEMA;

use crate::state::NeuroState;
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection};
use std::path::Path;
use std::sync::{Arc, Mutex};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("no state snapshot recorded yet")]
    NoSnapshot,
    #[error("database error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("failed to serialize neuron state: {0}")]
    Serialize(serde_json::Error),
    #[error("stored neuron state is malformed: {0}")]
    Deserialize(serde_json::Error),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Thread-safe store handle
#[derive(Clone)]
pub struct Store {
    conn: Arc<Mutex<Connection>>,
}

impl Store {
    /// Open or create the store at the given path
    pub fn open<P: AsRef<Path>>(path: P) -> StoreResult<Self> {
        Self::from_connection(Connection::open(path)?)
    }

    /// Open an in-memory store (for testing)
    #[allow(dead_code)] // Used in tests
    pub fn open_in_memory() -> StoreResult<Self> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(conn: Connection) -> StoreResult<Self> {
        // SQLite ships with foreign keys off; prompt rows must reference a
        // real snapshot.
        conn.pragma_update(None, "foreign_keys", true)?;

        let store = Self {
            conn: Arc::new(Mutex::new(conn)),
        };
        store.init_schema()?;
        Ok(store)
    }

    /// Idempotent schema creation
    fn init_schema(&self) -> StoreResult<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute_batch(SCHEMA)?;
        Ok(())
    }

    /// Append a snapshot of the given state and return its generated id
    pub fn save_state(&self, state: &NeuroState) -> StoreResult<i64> {
        let motor =
            serde_json::to_string(&state.motor_neurons).map_err(StoreError::Serialize)?;
        let sensory =
            serde_json::to_string(&state.sensory_neurons).map_err(StoreError::Serialize)?;

        let conn = self.conn.lock().unwrap();
        let id = conn.query_row(
            "INSERT INTO neural_states (state_count, updated_at, motor_neurons, sensory_neurons)
             VALUES (?1, ?2, ?3, ?4)
             RETURNING id",
            params![
                state.state_count,
                state.updated_at.to_rfc3339(),
                motor,
                sensory
            ],
            |row| row.get(0),
        )?;

        Ok(id)
    }

    /// Append one prompt/response pair tied to the snapshot it produced,
    /// stamped with the current time
    pub fn save_prompt(&self, snapshot_id: i64, question: &str, response: &str) -> StoreResult<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO prompts (neural_state_id, question, response, completed_at)
             VALUES (?1, ?2, ?3, ?4)",
            params![snapshot_id, question, response, Utc::now().to_rfc3339()],
        )?;

        Ok(())
    }

    /// Load the most recently updated snapshot
    pub fn latest_state(&self) -> StoreResult<NeuroState> {
        let conn = self.conn.lock().unwrap();
        let row = conn
            .query_row(
                "SELECT state_count, updated_at, motor_neurons, sensory_neurons
                 FROM neural_states
                 ORDER BY updated_at DESC, id DESC
                 LIMIT 1",
                [],
                |row| {
                    Ok((
                        row.get::<_, u64>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, String>(2)?,
                        row.get::<_, String>(3)?,
                    ))
                },
            )
            .map_err(|e| match e {
                rusqlite::Error::QueryReturnedNoRows => StoreError::NoSnapshot,
                other => StoreError::Sqlite(other),
            })?;

        let (state_count, updated_at, motor_json, sensory_json) = row;

        Ok(NeuroState {
            state_count,
            updated_at: parse_datetime(&updated_at),
            motor_neurons: serde_json::from_str(&motor_json).map_err(StoreError::Deserialize)?,
            sensory_neurons: serde_json::from_str(&sensory_json)
                .map_err(StoreError::Deserialize)?,
        })
    }

    #[cfg(test)]
    pub(crate) fn snapshot_rows(&self) -> i64 {
        let conn = self.conn.lock().unwrap();
        conn.query_row("SELECT COUNT(*) FROM neural_states", [], |row| row.get(0))
            .unwrap()
    }

    #[cfg(test)]
    pub(crate) fn prompt_rows(&self) -> i64 {
        let conn = self.conn.lock().unwrap();
        conn.query_row("SELECT COUNT(*) FROM prompts", [], |row| row.get(0))
            .unwrap()
    }

    #[cfg(test)]
    pub(crate) fn execute_raw(&self, sql: &str) {
        let conn = self.conn.lock().unwrap();
        conn.execute_batch(sql).unwrap();
    }

    #[cfg(test)]
    pub(crate) fn last_prompt(&self) -> (i64, String, String) {
        let conn = self.conn.lock().unwrap();
        conn.query_row(
            "SELECT neural_state_id, question, response FROM prompts ORDER BY id DESC LIMIT 1",
            [],
            |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
        )
        .unwrap()
    }
}

fn parse_datetime(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s).map_or_else(|_| Utc::now(), |dt| dt.with_timezone(&Utc))
}
