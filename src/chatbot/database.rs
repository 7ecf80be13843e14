//! Persistent SQLite chat history.

use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::{Connection, params};
use std::fmt;
use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use tracing::info;

use crate::chatbot::turn::{ConversationTurn, Role};

/// Failure reading or writing the history.
#[derive(Debug)]
pub enum StorageError {
    Sqlite(rusqlite::Error),
    /// A stored row could not be turned back into a turn.
    Corrupt(String),
}

impl fmt::Display for StorageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StorageError::Sqlite(e) => write!(f, "database error: {e}"),
            StorageError::Corrupt(msg) => write!(f, "corrupt history row: {msg}"),
        }
    }
}

impl std::error::Error for StorageError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            StorageError::Sqlite(e) => Some(e),
            StorageError::Corrupt(_) => None,
        }
    }
}

impl From<rusqlite::Error> for StorageError {
    fn from(e: rusqlite::Error) -> Self {
        StorageError::Sqlite(e)
    }
}

/// Fixed-width UTC timestamp so text order matches time order.
fn timestamp_key(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// Chat history keyed by user id.
pub struct Database {
    conn: Mutex<Connection>,
}

impl Database {
    /// Create a new in-memory database.
    pub fn in_memory() -> Result<Self, StorageError> {
        Self::init(Connection::open_in_memory()?)
    }

    /// Open (or create) the database file at `path`.
    pub fn open(path: &Path) -> Result<Self, StorageError> {
        let db = Self::init(Connection::open(path)?)?;
        info!("Opened history database {:?} ({} turns)", path, db.total_turns()?);
        Ok(db)
    }

    fn init(conn: Connection) -> Result<Self, StorageError> {
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS chat_history (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                user_id INTEGER NOT NULL,
                role TEXT NOT NULL CHECK (role IN ('user', 'assistant')),
                message TEXT NOT NULL,
                created_at TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_chat_history_user ON chat_history(user_id, created_at);
        "#,
        )?;
        Ok(Self { conn: Mutex::new(conn) })
    }

    fn lock(&self) -> MutexGuard<'_, Connection> {
        // SQLite state survives a panicked lock holder.
        self.conn.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn append_turn(&self, user_id: i64, turn: &ConversationTurn) -> Result<(), StorageError> {
        let conn = self.lock();
        conn.execute(
            "INSERT INTO chat_history (user_id, role, message, created_at) VALUES (?1, ?2, ?3, ?4)",
            params![user_id, turn.role.as_str(), turn.text, timestamp_key(&turn.timestamp)],
        )?;
        Ok(())
    }

    /// All turns of one user, oldest first.
    pub fn list_turns(&self, user_id: i64) -> Result<Vec<ConversationTurn>, StorageError> {
        let conn = self.lock();
        let mut stmt = conn.prepare(
            "SELECT role, message, created_at FROM chat_history
             WHERE user_id = ?1 ORDER BY created_at ASC, id ASC",
        )?;
        let rows = stmt.query_map(params![user_id], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
            ))
        })?;

        let mut turns = Vec::new();
        for row in rows {
            let (role, text, created_at) = row?;
            let role: Role = role.parse().map_err(StorageError::Corrupt)?;
            let timestamp = DateTime::parse_from_rfc3339(&created_at)
                .map_err(|e| StorageError::Corrupt(format!("bad timestamp '{created_at}': {e}")))?
                .with_timezone(&Utc);
            turns.push(ConversationTurn { role, text, timestamp });
        }
        Ok(turns)
    }

    pub fn turn_count(&self, user_id: i64) -> Result<usize, StorageError> {
        let conn = self.lock();
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM chat_history WHERE user_id = ?1",
            params![user_id],
            |row| row.get(0),
        )?;
        Ok(count as usize)
    }

    fn total_turns(&self) -> Result<usize, StorageError> {
        let conn = self.lock();
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM chat_history", [], |row| row.get(0))?;
        Ok(count as usize)
    }
}
