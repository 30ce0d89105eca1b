use chrono::{DateTime, Utc};
use rusqlite::{Result as SqlResult, Row, params};
use std::path::Path;
use uuid::Uuid;

use super::database::Database;
use crate::common::Message;

/// Append-only message log. `rowid` doubles as the push-channel cursor.
pub struct MessageDatabase {
    db: Database,
}

impl MessageDatabase {
    pub fn with_path<P: AsRef<Path>>(path: P) -> SqlResult<Self> {
        let db = Database::new(path)?;
        let message_db = Self { db };
        message_db.init_schema()?;
        Ok(message_db)
    }

    pub fn in_memory() -> SqlResult<Self> {
        let message_db = Self {
            db: Database::in_memory()?,
        };
        message_db.init_schema()?;
        Ok(message_db)
    }

    fn init_schema(&self) -> SqlResult<()> {
        let conn = self.db.connection();

        conn.execute(
            "CREATE TABLE IF NOT EXISTS messages (
                id TEXT PRIMARY KEY,
                sender TEXT NOT NULL,
                content TEXT NOT NULL,
                created_at TEXT NOT NULL
            )",
            [],
        )?;

        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_messages_created_at ON messages(created_at)",
            [],
        )?;

        Ok(())
    }

    /// Store a new message; id and timestamp are assigned here.
    pub fn insert_message(&self, sender: &str, content: &str) -> SqlResult<Message> {
        self.insert_message_at(sender, content, Utc::now())
    }

    pub fn insert_message_at(
        &self,
        sender: &str,
        content: &str,
        created_at: DateTime<Utc>,
    ) -> SqlResult<Message> {
        let message = Message {
            id: Uuid::new_v4().to_string(),
            sender: sender.to_string(),
            content: content.to_string(),
            created_at,
        };

        let conn = self.db.connection();
        conn.execute(
            "INSERT INTO messages (id, sender, content, created_at)
             VALUES (?1, ?2, ?3, ?4)",
            params![
                message.id,
                message.sender,
                message.content,
                message.created_at
            ],
        )?;
        Ok(message)
    }

    /// Whole history, oldest first
    pub fn all_messages(&self) -> SqlResult<Vec<Message>> {
        let conn = self.db.connection();
        let mut stmt = conn.prepare(
            "SELECT id, sender, content, created_at
             FROM messages
             ORDER BY created_at ASC, rowid ASC",
        )?;

        let messages = stmt
            .query_map([], message_from_row)?
            .collect::<SqlResult<Vec<_>>>()?;

        Ok(messages)
    }

    /// Rows appended after `cursor`, with their rowid
    pub fn messages_after(&self, cursor: i64) -> SqlResult<Vec<(i64, Message)>> {
        let conn = self.db.connection();
        let mut stmt = conn.prepare(
            "SELECT id, sender, content, created_at, rowid
             FROM messages
             WHERE rowid > ?1
             ORDER BY rowid ASC",
        )?;

        let rows = stmt
            .query_map(params![cursor], |row| {
                Ok((row.get::<_, i64>(4)?, message_from_row(row)?))
            })?
            .collect::<SqlResult<Vec<_>>>()?;

        Ok(rows)
    }

    pub fn last_rowid(&self) -> SqlResult<i64> {
        let conn = self.db.connection();
        conn.query_row("SELECT COALESCE(MAX(rowid), 0) FROM messages", [], |row| {
            row.get(0)
        })
    }

    pub fn message_count(&self) -> SqlResult<usize> {
        let conn = self.db.connection();
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM messages", [], |row| row.get(0))?;
        Ok(count as usize)
    }
}

fn message_from_row(row: &Row<'_>) -> SqlResult<Message> {
    Ok(Message {
        id: row.get(0)?,
        sender: row.get(1)?,
        content: row.get(2)?,
        created_at: row.get(3)?,
    })
}
