#[cfg(test)]
#[path = "orchestrator_test.rs"]
mod tests;

use std::sync::Arc;

use anyhow::bail;
use anyhow::Result;

use super::SyncEngine;
use crate::domain::models::ContentKind;
use crate::domain::models::Message;
use crate::domain::models::Role;
use crate::domain::models::Session;
use crate::domain::models::SessionMode;
use crate::domain::models::SessionStore;
use crate::domain::models::SessionStoreBox;
use crate::domain::models::SessionSummary;

const AUTO_TITLE_MAX_CHARS: usize = 64;

/// Derives a session title from the first user message: its first line,
/// truncated on a character boundary.
fn auto_title(content: &str) -> String {
    let line = content.split('\n').next().unwrap_or("").trim();
    if line.chars().count() <= AUTO_TITLE_MAX_CHARS {
        return line.to_string();
    }
    return line.chars().take(AUTO_TITLE_MAX_CHARS).collect();
}

/// The single entry point consumers use for session lifecycle. Mutations hit
/// the local store synchronously; mirroring to the remote happens behind a
/// debounce, except for destructive operations which push immediately so they
/// cannot be lost to coalescing on process exit.
///
/// Holds no ambient "current session": callers own their `Session` values, so
/// independent conversation contexts can share one orchestrator.
pub struct SessionOrchestrator {
    store: Arc<SessionStoreBox>,
    sync: Option<Arc<SyncEngine>>,
    debounce_ms: u64,
    list_limit: usize,
}

impl SessionOrchestrator {
    pub fn new(
        store: Arc<SessionStoreBox>,
        sync: Option<Arc<SyncEngine>>,
        debounce_ms: u64,
        list_limit: usize,
    ) -> SessionOrchestrator {
        return SessionOrchestrator {
            store,
            sync,
            debounce_ms,
            list_limit,
        };
    }

    /// Best-effort bootstrap: when signed in and the local store is empty,
    /// kick off a background pull. Never blocks and never fails startup.
    pub async fn startup(&self) -> Result<()> {
        if let Some(sync) = &self.sync {
            if self.store.is_empty().await? {
                sync.pull_detached();
            }
        }
        return Ok(());
    }

    pub async fn create_session(
        &self,
        mode: SessionMode,
        project_path: Option<String>,
        title: Option<String>,
    ) -> Result<Session> {
        let mut session = Session::new(mode, project_path);
        if let Some(title) = title {
            session.title = title;
        }

        self.store.save_session(&session).await?;
        self.schedule_push();
        return Ok(session);
    }

    /// Appends a message and persists the session. The first user message
    /// titles an untitled session.
    pub async fn add_message(
        &self,
        session: &mut Session,
        role: Role,
        kind: ContentKind,
        content: &str,
    ) -> Result<Message> {
        let message = session.push_message(role, kind, content).clone();
        if session.title.is_empty() && role == Role::User {
            session.title = auto_title(content);
        }

        self.store.save_session(session).await?;
        self.schedule_push();
        return Ok(message);
    }

    pub async fn rename_session(&self, id: &str, title: &str) -> Result<Session> {
        let Some(mut session) = self.store.load_session(id).await? else {
            bail!("No session found for id {id}");
        };

        session.title = title.to_string();
        session.touch();
        self.store.save_session(&session).await?;
        self.schedule_push();
        return Ok(session);
    }

    pub async fn delete_session(&self, id: &str) -> Result<()> {
        self.store.delete_session(id).await?;
        self.push_now();
        return Ok(());
    }

    pub async fn clear_history(&self) -> Result<()> {
        self.store.clear_all().await?;
        self.push_now();
        return Ok(());
    }

    pub async fn load_session(&self, id: &str) -> Result<Option<Session>> {
        return self.store.load_session(id).await;
    }

    pub async fn list_sessions(&self) -> Result<Vec<SessionSummary>> {
        return self.store.list_sessions(self.list_limit).await;
    }

    pub fn sync_engine(&self) -> Option<&Arc<SyncEngine>> {
        return self.sync.as_ref();
    }

    fn schedule_push(&self) {
        if let Some(sync) = &self.sync {
            sync.schedule_push(self.debounce_ms);
        }
    }

    /// Destructive operations bypass the debounce window entirely.
    fn push_now(&self) {
        if let Some(sync) = &self.sync {
            sync.push_detached();
        }
    }
}
