#[cfg(test)]
#[path = "sqlite_test.rs"]
mod tests;

use std::path::Path;
use std::path::PathBuf;
use std::sync::Mutex;
use std::sync::MutexGuard;

use anyhow::anyhow;
use anyhow::Context;
use anyhow::Result;
use async_trait::async_trait;
use rusqlite::params;
use rusqlite::Connection;
use rusqlite::OpenFlags;
use rusqlite::OptionalExtension;

use crate::domain::models::ContentKind;
use crate::domain::models::Message;
use crate::domain::models::Role;
use crate::domain::models::Session;
use crate::domain::models::SessionMode;
use crate::domain::models::SessionStore;
use crate::domain::models::SessionSummary;

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS sessions (
    id            TEXT PRIMARY KEY,
    title         TEXT NOT NULL,
    mode          TEXT NOT NULL,
    project_path  TEXT,
    created_at_ms INTEGER NOT NULL,
    updated_at_ms INTEGER NOT NULL,
    plan          TEXT
);

CREATE TABLE IF NOT EXISTS messages (
    session_id   TEXT NOT NULL REFERENCES sessions(id) ON DELETE CASCADE,
    seq          INTEGER NOT NULL,
    id           TEXT NOT NULL,
    role         TEXT NOT NULL,
    kind         TEXT NOT NULL,
    content      TEXT NOT NULL,
    timestamp_ms INTEGER NOT NULL,
    metadata     TEXT,
    PRIMARY KEY (session_id, seq)
);

CREATE INDEX IF NOT EXISTS idx_sessions_updated_at ON sessions(updated_at_ms DESC);
";

/// Embedded-database backend. The whole store is one file so the sync engine
/// can transport it as an opaque blob.
pub struct SqliteStore {
    path: PathBuf,
    conn: Mutex<Connection>,
}

struct SessionRow {
    id: String,
    title: String,
    mode: String,
    project_path: Option<String>,
    created_at_ms: i64,
    updated_at_ms: i64,
    plan: Option<String>,
}

struct MessageRow {
    id: String,
    role: String,
    kind: String,
    content: String,
    seq: i64,
    timestamp_ms: i64,
    metadata: Option<String>,
}

fn configure(conn: &Connection) -> Result<()> {
    conn.pragma_update(None, "foreign_keys", "ON")?;
    // A rollback journal that truncates keeps the store a single file between
    // transactions, which the sync engine relies on.
    conn.pragma_update(None, "journal_mode", "TRUNCATE")?;
    conn.pragma_update(None, "synchronous", "FULL")?;
    return Ok(());
}

impl SqliteStore {
    pub fn open(path: &Path) -> Result<SqliteStore> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }

        let conn = Connection::open(path)
            .with_context(|| format!("Failed to open session database at {}", path.display()))?;
        configure(&conn)?;
        conn.execute_batch(SCHEMA)?;

        return Ok(SqliteStore {
            path: path.to_path_buf(),
            conn: Mutex::new(conn),
        });
    }

    /// Opens an existing store without touching it. Used to read a downloaded
    /// peer snapshot during merge. Fails if the file is missing, not a
    /// database, or has a foreign schema.
    pub fn open_read_only(path: &Path) -> Result<SqliteStore> {
        let conn = Connection::open_with_flags(path, OpenFlags::SQLITE_OPEN_READ_ONLY)
            .with_context(|| format!("Failed to open peer database at {}", path.display()))?;

        // Probe the schema so corrupt or unrelated files fail here, not later.
        conn.query_row("SELECT COUNT(*) FROM sessions", [], |row| {
            return row.get::<_, i64>(0);
        })
        .context("Peer database is missing the sessions table")?;

        return Ok(SqliteStore {
            path: path.to_path_buf(),
            conn: Mutex::new(conn),
        });
    }

    fn conn(&self) -> MutexGuard<'_, Connection> {
        return self.conn.lock().expect("session database mutex poisoned");
    }

    /// Every session id in the store, no cap. Used for merge enumeration.
    pub fn session_ids(&self) -> Result<Vec<String>> {
        let conn = self.conn();
        let mut stmt = conn.prepare("SELECT id FROM sessions")?;
        let ids = stmt
            .query_map([], |row| {
                return row.get::<_, String>(0);
            })?
            .collect::<rusqlite::Result<Vec<String>>>()?;
        return Ok(ids);
    }

    fn load_session_sync(&self, id: &str) -> Result<Option<Session>> {
        let conn = self.conn();
        let row = conn
            .query_row(
                "SELECT id, title, mode, project_path, created_at_ms, updated_at_ms, plan \
                 FROM sessions WHERE id = ?1",
                params![id],
                |row| {
                    return Ok(SessionRow {
                        id: row.get(0)?,
                        title: row.get(1)?,
                        mode: row.get(2)?,
                        project_path: row.get(3)?,
                        created_at_ms: row.get(4)?,
                        updated_at_ms: row.get(5)?,
                        plan: row.get(6)?,
                    });
                },
            )
            .optional()?;

        let Some(row) = row else {
            return Ok(None);
        };

        let mut stmt = conn.prepare(
            "SELECT id, role, kind, content, seq, timestamp_ms, metadata \
             FROM messages WHERE session_id = ?1 ORDER BY seq ASC",
        )?;
        let message_rows = stmt
            .query_map(params![id], |row| {
                return Ok(MessageRow {
                    id: row.get(0)?,
                    role: row.get(1)?,
                    kind: row.get(2)?,
                    content: row.get(3)?,
                    seq: row.get(4)?,
                    timestamp_ms: row.get(5)?,
                    metadata: row.get(6)?,
                });
            })?
            .collect::<rusqlite::Result<Vec<MessageRow>>>()?;

        let mut messages: Vec<Message> = vec![];
        for message_row in message_rows {
            messages.push(Message {
                id: message_row.id,
                role: message_row
                    .role
                    .parse::<Role>()
                    .map_err(|err| return anyhow!("Invalid message role: {err}"))?,
                kind: message_row
                    .kind
                    .parse::<ContentKind>()
                    .map_err(|err| return anyhow!("Invalid message kind: {err}"))?,
                content: message_row.content,
                seq: message_row.seq,
                timestamp_ms: message_row.timestamp_ms,
                metadata: match message_row.metadata {
                    Some(raw) => Some(serde_json::from_str(&raw)?),
                    None => None,
                },
            });
        }

        return Ok(Some(Session {
            id: row.id,
            title: row.title,
            mode: row
                .mode
                .parse::<SessionMode>()
                .map_err(|err| return anyhow!("Invalid session mode: {err}"))?,
            project_path: row.project_path,
            created_at_ms: row.created_at_ms,
            updated_at_ms: row.updated_at_ms,
            messages,
            plan: match row.plan {
                Some(raw) => Some(serde_json::from_str(&raw)?),
                None => None,
            },
        }));
    }
}

#[async_trait]
impl SessionStore for SqliteStore {
    async fn save_session(&self, session: &Session) -> Result<()> {
        let plan = match &session.plan {
            Some(plan) => Some(serde_json::to_string(plan)?),
            None => None,
        };

        let mut conn = self.conn();
        let tx = conn.transaction()?;

        tx.execute(
            "INSERT INTO sessions (id, title, mode, project_path, created_at_ms, updated_at_ms, plan) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7) \
             ON CONFLICT(id) DO UPDATE SET \
               title = excluded.title, \
               mode = excluded.mode, \
               project_path = excluded.project_path, \
               created_at_ms = excluded.created_at_ms, \
               updated_at_ms = excluded.updated_at_ms, \
               plan = excluded.plan",
            params![
                session.id,
                session.title,
                session.mode.to_string(),
                session.project_path,
                session.created_at_ms,
                session.updated_at_ms,
                plan,
            ],
        )?;

        tx.execute(
            "DELETE FROM messages WHERE session_id = ?1",
            params![session.id],
        )?;
        for message in &session.messages {
            let metadata = match &message.metadata {
                Some(metadata) => Some(serde_json::to_string(metadata)?),
                None => None,
            };
            tx.execute(
                "INSERT INTO messages (session_id, seq, id, role, kind, content, timestamp_ms, metadata) \
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                params![
                    session.id,
                    message.seq,
                    message.id,
                    message.role.to_string(),
                    message.kind.to_string(),
                    message.content,
                    message.timestamp_ms,
                    metadata,
                ],
            )?;
        }

        tx.commit()?;
        return Ok(());
    }

    async fn load_session(&self, id: &str) -> Result<Option<Session>> {
        return self.load_session_sync(id);
    }

    async fn list_sessions(&self, limit: usize) -> Result<Vec<SessionSummary>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(
            "SELECT s.id, s.title, s.mode, s.project_path, s.created_at_ms, s.updated_at_ms, \
                    COUNT(m.seq) \
             FROM sessions s LEFT JOIN messages m ON m.session_id = s.id \
             GROUP BY s.id \
             ORDER BY s.updated_at_ms DESC \
             LIMIT ?1",
        )?;

        let rows = stmt
            .query_map(params![limit as i64], |row| {
                return Ok((
                    SessionRow {
                        id: row.get(0)?,
                        title: row.get(1)?,
                        mode: row.get(2)?,
                        project_path: row.get(3)?,
                        created_at_ms: row.get(4)?,
                        updated_at_ms: row.get(5)?,
                        plan: None,
                    },
                    row.get::<_, i64>(6)?,
                ));
            })?
            .collect::<rusqlite::Result<Vec<(SessionRow, i64)>>>()?;

        let mut summaries: Vec<SessionSummary> = vec![];
        for (row, message_count) in rows {
            summaries.push(SessionSummary {
                id: row.id,
                title: row.title,
                mode: row
                    .mode
                    .parse::<SessionMode>()
                    .map_err(|err| return anyhow!("Invalid session mode: {err}"))?,
                project_path: row.project_path,
                created_at_ms: row.created_at_ms,
                updated_at_ms: row.updated_at_ms,
                message_count: message_count as usize,
            });
        }

        return Ok(summaries);
    }

    async fn delete_session(&self, id: &str) -> Result<()> {
        // Messages go with the session via ON DELETE CASCADE.
        self.conn()
            .execute("DELETE FROM sessions WHERE id = ?1", params![id])?;
        return Ok(());
    }

    async fn clear_all(&self) -> Result<()> {
        let mut conn = self.conn();
        let tx = conn.transaction()?;
        tx.execute("DELETE FROM messages", [])?;
        tx.execute("DELETE FROM sessions", [])?;
        tx.commit()?;
        return Ok(());
    }

    async fn is_empty(&self) -> Result<bool> {
        let count = self
            .conn()
            .query_row("SELECT COUNT(*) FROM sessions", [], |row| {
                return row.get::<_, i64>(0);
            })?;
        return Ok(count == 0);
    }

    fn backing_file(&self) -> Option<PathBuf> {
        return Some(self.path.clone());
    }

    async fn replace_backing(&self, bytes: &[u8]) -> Result<()> {
        let mut conn = self.conn();

        // Swap the file under the lock, then reopen. The old connection still
        // references the previous inode until it is dropped below.
        let tmp_path = self.path.with_extension("db.swap");
        std::fs::write(&tmp_path, bytes)
            .with_context(|| format!("Failed to write {}", tmp_path.display()))?;
        std::fs::rename(&tmp_path, &self.path)
            .with_context(|| format!("Failed to replace {}", self.path.display()))?;

        let fresh = Connection::open(&self.path)?;
        configure(&fresh)?;
        fresh.execute_batch(SCHEMA)?;
        *conn = fresh;

        return Ok(());
    }
}
