#[cfg(test)]
#[path = "flatfile_test.rs"]
mod tests;

use std::path::Path;
use std::path::PathBuf;

use anyhow::Context;
use anyhow::Result;
use async_trait::async_trait;
use tokio::fs;
use tokio::io::AsyncWriteExt;

use crate::domain::models::Session;
use crate::domain::models::SessionStore;
use crate::domain::models::SessionSummary;

/// Plain-file fallback used when the embedded database cannot be opened. One
/// JSON file per session plus an index file of summaries. Satisfies the same
/// contract as the database backend, but is not blob-transportable: it has no
/// single backing file, so sync skips it.
pub struct FlatFileStore {
    pub sessions_dir: PathBuf,
}

impl FlatFileStore {
    pub fn open(sessions_dir: &Path) -> Result<FlatFileStore> {
        std::fs::create_dir_all(sessions_dir)
            .with_context(|| format!("Failed to create {}", sessions_dir.display()))?;
        return Ok(FlatFileStore {
            sessions_dir: sessions_dir.to_path_buf(),
        });
    }

    fn session_path(&self, id: &str) -> PathBuf {
        return self.sessions_dir.join(format!("{id}.json"));
    }

    fn index_path(&self) -> PathBuf {
        return self.sessions_dir.join("index.json");
    }

    async fn read_index(&self) -> Result<Vec<SessionSummary>> {
        let index_path = self.index_path();
        if !index_path.exists() {
            return Ok(vec![]);
        }

        let payload = fs::read_to_string(index_path).await?;
        let summaries: Vec<SessionSummary> = serde_json::from_str(&payload)?;
        return Ok(summaries);
    }

    async fn write_index(&self, summaries: &[SessionSummary]) -> Result<()> {
        let payload = serde_json::to_string_pretty(summaries)?;
        let tmp_path = self.sessions_dir.join("index.json.tmp");

        let mut file = fs::File::create(&tmp_path).await?;
        file.write_all(payload.as_bytes()).await?;
        file.flush().await?;
        drop(file);

        fs::rename(&tmp_path, self.index_path()).await?;
        return Ok(());
    }
}

#[async_trait]
impl SessionStore for FlatFileStore {
    async fn save_session(&self, session: &Session) -> Result<()> {
        let payload = serde_json::to_string_pretty(session)?;
        let session_path = self.session_path(&session.id);
        let tmp_path = session_path.with_extension("json.tmp");

        let mut file = fs::File::create(&tmp_path).await?;
        file.write_all(payload.as_bytes()).await?;
        file.flush().await?;
        drop(file);
        fs::rename(&tmp_path, &session_path).await?;

        let mut summaries = self.read_index().await?;
        summaries.retain(|summary| {
            return summary.id != session.id;
        });
        summaries.push(session.summary());
        summaries.sort_by_key(|summary| {
            return std::cmp::Reverse(summary.updated_at_ms);
        });
        self.write_index(&summaries).await?;

        return Ok(());
    }

    async fn load_session(&self, id: &str) -> Result<Option<Session>> {
        let session_path = self.session_path(id);
        if !session_path.exists() {
            return Ok(None);
        }

        let payload = fs::read_to_string(session_path).await?;
        let session: Session = serde_json::from_str(&payload)?;
        return Ok(Some(session));
    }

    async fn list_sessions(&self, limit: usize) -> Result<Vec<SessionSummary>> {
        let mut summaries = self.read_index().await?;
        summaries.truncate(limit);
        return Ok(summaries);
    }

    async fn delete_session(&self, id: &str) -> Result<()> {
        // Index first: a reader must never see an indexed session whose file
        // is already gone.
        let mut summaries = self.read_index().await?;
        summaries.retain(|summary| {
            return summary.id != id;
        });
        self.write_index(&summaries).await?;

        let session_path = self.session_path(id);
        if session_path.exists() {
            fs::remove_file(session_path).await?;
        }
        return Ok(());
    }

    async fn clear_all(&self) -> Result<()> {
        fs::remove_dir_all(&self.sessions_dir).await?;
        fs::create_dir_all(&self.sessions_dir).await?;
        return Ok(());
    }

    async fn is_empty(&self) -> Result<bool> {
        return Ok(self.read_index().await?.is_empty());
    }

    fn backing_file(&self) -> Option<PathBuf> {
        return None;
    }

    async fn replace_backing(&self, _bytes: &[u8]) -> Result<()> {
        anyhow::bail!("The flat-file backend cannot be replaced from a blob");
    }
}
