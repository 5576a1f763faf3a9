//! Stored records
//!
//! Field names are camelCase on the wire and in storage so snapshots and
//! Redis blobs stay readable by other tools.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use uuid::Uuid;

/// Title every conversation starts with
pub const NEW_CHAT_TITLE: &str = "New chat";

/// Trim a RAG tag; blank tags are treated as absent
#[must_use]
pub fn normalize_rag_tag(tag: Option<&str>) -> Option<&str> {
    tag.map(str::trim).filter(|t| !t.is_empty())
}

/// Partition a conversation lives in
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Bucket {
    /// Plain chat, no retrieval scope
    #[default]
    Chat,
    /// Retrieval-augmented chat scoped by a RAG tag
    Rag,
}

impl Bucket {
    /// Both buckets, in lookup order
    pub const ALL: [Bucket; 2] = [Bucket::Chat, Bucket::Rag];

    /// `Rag` iff the tag is non-blank
    #[must_use]
    pub fn for_rag_tag(tag: Option<&str>) -> Self {
        if normalize_rag_tag(tag).is_some() {
            Self::Rag
        } else {
            Self::Chat
        }
    }

    /// Parse a list scope; anything other than `rag` means chat
    #[must_use]
    pub fn from_scope(scope: Option<&str>) -> Self {
        match scope.map(str::trim) {
            Some(s) if s.eq_ignore_ascii_case("rag") => Self::Rag,
            _ => Self::Chat,
        }
    }

    /// Key segment and wire name
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Chat => "chat",
            Self::Rag => "rag",
        }
    }
}

impl fmt::Display for Bucket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A conversation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Conversation {
    /// Unique id
    pub id: String,
    /// Display title
    pub title: String,
    /// Retrieval scope, if any
    #[serde(default)]
    pub rag_tag: Option<String>,
    /// Chat pipeline, if chosen
    #[serde(default)]
    pub pipeline_id: Option<String>,
    /// Creation time
    pub created_at: DateTime<Utc>,
    /// Derived from `rag_tag`
    #[serde(default)]
    pub bucket: Bucket,
}

impl Conversation {
    /// Create a conversation with a fresh id
    #[must_use]
    pub fn new(rag_tag: Option<&str>, pipeline_id: Option<&str>) -> Self {
        let rag_tag = normalize_rag_tag(rag_tag);
        Self {
            id: Uuid::new_v4().to_string(),
            title: NEW_CHAT_TITLE.to_string(),
            rag_tag: rag_tag.map(str::to_string),
            pipeline_id: pipeline_id
                .map(str::trim)
                .filter(|p| !p.is_empty())
                .map(str::to_string),
            created_at: Utc::now(),
            bucket: Bucket::for_rag_tag(rag_tag),
        }
    }

    /// Whether the title was never changed
    #[must_use]
    pub fn has_default_title(&self) -> bool {
        self.title == NEW_CHAT_TITLE
    }

    /// Recompute `bucket` from `rag_tag`
    pub fn rederive_bucket(&mut self) {
        self.bucket = Bucket::for_rag_tag(self.rag_tag.as_deref());
    }
}

/// Newest first; ties broken by id so the order is stable
pub(crate) fn sort_newest_first(list: &mut [Conversation]) {
    list.sort_by(|a, b| b.created_at.cmp(&a.created_at).then_with(|| a.id.cmp(&b.id)));
}

/// Who wrote a message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    /// The person chatting
    User,
    /// The pipeline's reply
    Assistant,
}

impl MessageRole {
    /// Wire name
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Assistant => "assistant",
        }
    }
}

impl fmt::Display for MessageRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A message in a conversation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    /// Unique id
    pub id: String,
    /// Author
    pub role: MessageRole,
    /// Text
    pub content: String,
    /// Creation time
    pub created_at: DateTime<Utc>,
}

impl Message {
    /// Create a message with a fresh id
    pub fn new(role: MessageRole, content: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            role,
            content: content.into(),
            created_at: Utc::now(),
        }
    }
}

/// Whole memory-backend state as written to the snapshot file
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    /// All conversations, oldest first
    #[serde(default)]
    pub conversations: Vec<Conversation>,
    /// Messages by conversation id
    #[serde(default)]
    pub messages: BTreeMap<String, Vec<Message>>,
    /// Registered RAG tags
    #[serde(default)]
    pub rag_tags: Vec<String>,
}

/// Result of wiping the store
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClearOutcome {
    /// Whether anything was wiped (false on the memory backend)
    pub cleared: bool,
    /// Number of keys removed
    pub keys_deleted: u64,
}

/// Which backend is serving requests
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    /// Redis
    Redis,
    /// Process memory (optionally snapshotted)
    Memory,
}

impl BackendKind {
    /// Wire name
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Redis => "redis",
            Self::Memory => "memory",
        }
    }
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests;
