#[cfg(test)]
#[path = "session_test.rs"]
mod tests;

use serde_derive::Deserialize;
use serde_derive::Serialize;
use strum::Display;
use strum::EnumString;
use strum::EnumVariantNames;

use super::now_ms;
use super::ContentKind;
use super::Message;
use super::Role;

/// What a session is for. Closed set, persisted as kebab-case text.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, Display, EnumString, EnumVariantNames,
)]
#[strum(serialize_all = "kebab-case")]
#[serde(rename_all = "kebab-case")]
pub enum SessionMode {
    Chat,
    Plan,
    Build,
    Review,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub id: String,
    pub title: String,
    pub mode: SessionMode,
    pub project_path: Option<String>,
    pub created_at_ms: i64,
    pub updated_at_ms: i64,
    pub messages: Vec<Message>,
    pub plan: Option<serde_json::Value>,
}

impl Session {
    pub fn new(mode: SessionMode, project_path: Option<String>) -> Session {
        let now = now_ms();
        return Session {
            id: super::create_id(),
            title: "".to_string(),
            mode,
            project_path,
            created_at_ms: now,
            updated_at_ms: now,
            messages: vec![],
            plan: None,
        };
    }

    /// Bumps `updated_at_ms`. Always advances, even when the wall clock steps
    /// backwards, so merge comparisons stay monotonic.
    pub fn touch(&mut self) {
        self.updated_at_ms = now_ms().max(self.updated_at_ms + 1);
    }

    /// Appends a message, assigning the next contiguous sequence number, and
    /// bumps `updated_at_ms`.
    pub fn push_message(&mut self, role: Role, kind: ContentKind, content: &str) -> &Message {
        let mut message = Message::new(role, kind, content);
        message.seq = self.next_seq();
        self.messages.push(message);
        self.touch();
        return self.messages.last().unwrap();
    }

    pub fn next_seq(&self) -> i64 {
        return self.messages.last().map_or(1, |message| {
            return message.seq + 1;
        });
    }

    pub fn summary(&self) -> SessionSummary {
        return SessionSummary {
            id: self.id.to_string(),
            title: self.title.to_string(),
            mode: self.mode,
            project_path: self.project_path.clone(),
            created_at_ms: self.created_at_ms,
            updated_at_ms: self.updated_at_ms,
            message_count: self.messages.len(),
        };
    }
}

/// Listing projection. Cheap to build from either storage backend without
/// hydrating full message bodies.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SessionSummary {
    pub id: String,
    pub title: String,
    pub mode: SessionMode,
    pub project_path: Option<String>,
    pub created_at_ms: i64,
    pub updated_at_ms: i64,
    pub message_count: usize,
}

/// One row of the remote JSON index: a deliberately lossy projection used to
/// answer "what exists remotely" without downloading the full store blob.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RemoteIndexEntry {
    pub id: String,
    pub title: String,
    pub mode: SessionMode,
    #[serde(rename = "updatedAt")]
    pub updated_at_ms: i64,
}

impl RemoteIndexEntry {
    pub fn from_summary(summary: &SessionSummary) -> RemoteIndexEntry {
        return RemoteIndexEntry {
            id: summary.id.to_string(),
            title: summary.title.to_string(),
            mode: summary.mode,
            updated_at_ms: summary.updated_at_ms,
        };
    }
}
