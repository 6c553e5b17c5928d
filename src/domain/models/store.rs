use std::path::PathBuf;

use anyhow::Result;
use async_trait::async_trait;

use super::Session;
use super::SessionSummary;

pub type SessionStoreBox = Box<dyn SessionStore + Send + Sync>;

/// Durable, process-local persistence of sessions. Implemented by the embedded
/// database backend and the flat-file fallback; callers pick one at startup
/// and hold it behind this trait from then on.
#[async_trait]
pub trait SessionStore {
    /// Idempotent upsert keyed by session id. Overwrites the session row and
    /// its full message set in one step; no reader observes a partial write.
    async fn save_session(&self, session: &Session) -> Result<()>;

    /// Missing ids are a `None`, not an error.
    async fn load_session(&self, id: &str) -> Result<Option<Session>>;

    /// Summaries ordered by `updated_at_ms` descending, capped at `limit`.
    async fn list_sessions(&self, limit: usize) -> Result<Vec<SessionSummary>>;

    async fn delete_session(&self, id: &str) -> Result<()>;

    async fn clear_all(&self) -> Result<()>;

    async fn is_empty(&self) -> Result<bool>;

    /// The single durable file backing this store, when the whole store can be
    /// transported as one opaque blob. `None` for backends that spread state
    /// across many files.
    fn backing_file(&self) -> Option<PathBuf>;

    /// Replaces the backing file with `bytes` and reopens. Only supported by
    /// blob-transportable backends.
    async fn replace_backing(&self, bytes: &[u8]) -> Result<()>;
}
