#[cfg(test)]
#[path = "message_test.rs"]
mod tests;

use serde_derive::Deserialize;
use serde_derive::Serialize;
use strum::Display;
use strum::EnumString;
use strum::EnumVariantNames;

#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, Display, EnumString, EnumVariantNames,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
    System,
}

/// What a message body holds. Stored next to the content so consumers can
/// render diffs, build output, and plans differently from plain prose.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, Display, EnumString, EnumVariantNames,
)]
#[strum(serialize_all = "kebab-case")]
#[serde(rename_all = "kebab-case")]
pub enum ContentKind {
    Text,
    Plan,
    Code,
    Diff,
    BuildResult,
    Error,
    Progress,
    Interview,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub id: String,
    pub role: Role,
    pub kind: ContentKind,
    pub content: String,
    /// Position within the owning session. Assigned by the session on append,
    /// strictly increasing and contiguous. Never reassigned afterwards.
    pub seq: i64,
    pub timestamp_ms: i64,
    pub metadata: Option<serde_json::Value>,
}

impl Message {
    pub fn new(role: Role, kind: ContentKind, content: &str) -> Message {
        return Message {
            id: super::create_id(),
            role,
            kind,
            content: content.to_string(),
            seq: 0,
            timestamp_ms: super::now_ms(),
            metadata: None,
        };
    }

    pub fn with_metadata(mut self, metadata: serde_json::Value) -> Message {
        self.metadata = Some(metadata);
        return self;
    }

    pub fn first_line(&self) -> &str {
        return self.content.split('\n').next().unwrap_or("");
    }
}
