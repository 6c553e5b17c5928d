#[cfg(test)]
#[path = "sync_test.rs"]
mod tests;

use std::path::Path;
use std::sync::atomic::AtomicI64;
use std::sync::atomic::AtomicU64;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use tokio::fs;

use crate::domain::models::create_id;
use crate::domain::models::now_ms;
use crate::domain::models::BlobChannel;
use crate::domain::models::BlobChannelBox;
use crate::domain::models::RemoteIndexEntry;
use crate::domain::models::SessionStore;
use crate::domain::models::SessionStoreBox;
use crate::infrastructure::storage::sqlite::SqliteStore;

/// Well-known names inside the app-private remote namespace.
pub const BLOB_NAME: &str = "granary.db";
pub const INDEX_NAME: &str = "granary-index.json";

/// How many of the most-recently-updated sessions make it into the remote
/// JSON index.
pub const REMOTE_INDEX_LIMIT: usize = 50;

const DB_MIME: &str = "application/octet-stream";
const INDEX_MIME: &str = "application/json";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PullOutcome {
    /// The remote snapshot became the local store wholesale (new device).
    Replaced,
    /// Newer peer sessions were imported; everything else stayed put.
    Merged { imported: usize },
    /// Nothing to do, or the peer snapshot was unusable. Never an error.
    Skipped,
}

/// Drives push/pull cycles between the local store and the remote blob
/// channel. The whole local store travels as one blob so a push is atomic with
/// respect to the store's internal consistency; an index blob rides along for
/// cheap remote listings.
pub struct SyncEngine {
    store: Arc<SessionStoreBox>,
    channel: BlobChannelBox,
    /// Debounce generation. Each schedule supersedes the pending one; only
    /// the sleeper holding the latest generation actually pushes.
    generation: AtomicU64,
    last_push_ms: AtomicI64,
}

impl SyncEngine {
    pub fn new(store: Arc<SessionStoreBox>, channel: BlobChannelBox) -> SyncEngine {
        return SyncEngine {
            store,
            channel,
            generation: AtomicU64::new(0),
            last_push_ms: AtomicI64::new(0),
        };
    }

    /// Unix millis of the last completed push, 0 when none has happened.
    pub fn last_push_ms(&self) -> i64 {
        return self.last_push_ms.load(Ordering::SeqCst);
    }

    /// Coalesces bursts of local writes into one push: each call resets the
    /// pending deadline instead of enqueueing another push. Fire-and-forget;
    /// failures are logged, never surfaced to the write path that scheduled
    /// them.
    pub fn schedule_push(self: &Arc<Self>, delay_ms: u64) {
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let engine = Arc::clone(self);

        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(delay_ms)).await;
            if engine.generation.load(Ordering::SeqCst) != generation {
                // Superseded by a later schedule.
                return;
            }
            if let Err(err) = engine.push().await {
                tracing::warn!(error = ?err, "Scheduled push failed");
            }
        });
    }

    /// Pushes immediately in the background, bypassing the debounce. Used for
    /// destructive operations that must not sit in a coalescing window.
    pub fn push_detached(self: &Arc<Self>) {
        // Invalidate any pending debounced push; this one covers it.
        self.generation.fetch_add(1, Ordering::SeqCst);
        let engine = Arc::clone(self);
        tokio::spawn(async move {
            if let Err(err) = engine.push().await {
                tracing::warn!(error = ?err, "Push failed");
            }
        });
    }

    /// Uploads the local store's backing bytes under the well-known blob
    /// name, then the JSON index under its own name.
    pub async fn push(&self) -> Result<()> {
        let Some(backing) = self.store.backing_file() else {
            tracing::debug!("Active store has no backing file, skipping push");
            return Ok(());
        };

        let bytes = fs::read(&backing).await?;
        let existing = self.channel.find_by_name(BLOB_NAME).await?;
        self.channel
            .upload(BLOB_NAME, &bytes, DB_MIME, existing.as_deref())
            .await?;

        let summaries = self.store.list_sessions(REMOTE_INDEX_LIMIT).await?;
        let index = summaries
            .iter()
            .map(|summary| {
                return RemoteIndexEntry::from_summary(summary);
            })
            .collect::<Vec<RemoteIndexEntry>>();
        let index_bytes = serde_json::to_vec(&index)?;

        let existing_index = self.channel.find_by_name(INDEX_NAME).await?;
        self.channel
            .upload(INDEX_NAME, &index_bytes, INDEX_MIME, existing_index.as_deref())
            .await?;

        self.last_push_ms.store(now_ms(), Ordering::SeqCst);
        tracing::debug!(bytes = bytes.len(), sessions = index.len(), "Pushed store snapshot");
        return Ok(());
    }

    /// Reconciles the remote snapshot into the local store. Merge-only: a
    /// pull never deletes a local session and never replaces one with an
    /// older copy.
    pub async fn pull(&self) -> Result<PullOutcome> {
        if self.store.backing_file().is_none() {
            tracing::debug!("Active store has no backing file, skipping pull");
            return Ok(PullOutcome::Skipped);
        }

        let Some(blob_id) = self.channel.find_by_name(BLOB_NAME).await? else {
            return Ok(PullOutcome::Skipped);
        };
        let bytes = self.channel.download(&blob_id).await?;

        if self.store.is_empty().await? {
            // Fast bootstrap for a fresh device: adopt the remote snapshot
            // byte for byte.
            self.store.replace_backing(&bytes).await?;
            return Ok(PullOutcome::Replaced);
        }

        let peer_path = std::env::temp_dir().join(format!("granary-peer-{}.db", create_id()));
        fs::write(&peer_path, &bytes).await?;
        let res = self.merge_from_peer(&peer_path).await;
        fs::remove_file(&peer_path).await.ok();
        return res;
    }

    async fn merge_from_peer(&self, peer_path: &Path) -> Result<PullOutcome> {
        let peer = match SqliteStore::open_read_only(peer_path) {
            Ok(peer) => peer,
            Err(err) => {
                tracing::warn!(error = ?err, "Peer snapshot unreadable, skipping merge");
                return Ok(PullOutcome::Skipped);
            }
        };

        let ids = match peer.session_ids() {
            Ok(ids) => ids,
            Err(err) => {
                tracing::warn!(error = ?err, "Peer snapshot unreadable, skipping merge");
                return Ok(PullOutcome::Skipped);
            }
        };

        let mut imported = 0;
        for id in ids {
            let Some(peer_session) = peer.load_session(&id).await.unwrap_or(None) else {
                continue;
            };

            let keep_local = match self.store.load_session(&id).await? {
                // Ties keep the local copy untouched.
                Some(local) => local.updated_at_ms >= peer_session.updated_at_ms,
                None => false,
            };
            if keep_local {
                continue;
            }

            self.store.save_session(&peer_session).await?;
            imported += 1;
        }

        tracing::debug!(imported = imported, "Merged peer snapshot");
        return Ok(PullOutcome::Merged { imported });
    }

    /// Background pull for startup: outcome is logged, errors never escape.
    pub fn pull_detached(self: &Arc<Self>) {
        let engine = Arc::clone(self);
        tokio::spawn(async move {
            match engine.pull().await {
                Ok(outcome) => {
                    tracing::debug!(outcome = ?outcome, "Startup pull finished");
                }
                Err(err) => {
                    tracing::warn!(error = ?err, "Startup pull failed");
                }
            }
        });
    }
}
