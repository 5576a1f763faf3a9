//! In-memory conversation store
//!
//! State lives in process memory behind a single `RwLock`. With a snapshot
//! path configured, every mutation serializes the whole state as pretty JSON
//! under the write lock, then releases the lock and writes the file through
//! a temp file and rename. Each serialized state carries a generation number
//! and an older generation never replaces a newer one on disk. Snapshot
//! failures are logged and otherwise ignored.

use crate::error::Result;
use crate::model::{
    normalize_rag_tag, sort_newest_first, BackendKind, Bucket, ClearOutcome, Conversation,
    Message, MessageRole, Snapshot,
};
use crate::store::ConversationStore;
use async_trait::async_trait;
use std::collections::{BTreeSet, HashMap};
use std::path::{Path, PathBuf};
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info, warn};

#[derive(Debug, Default)]
struct MemoryState {
    conversations: HashMap<String, Conversation>,
    messages: HashMap<String, Vec<Message>>,
    rag_tags: BTreeSet<String>,
    generation: u64,
}

/// Serialized state waiting to be written
struct PendingSnapshot {
    generation: u64,
    json: String,
}

impl MemoryState {
    fn from_snapshot(snapshot: Snapshot) -> Self {
        let conversations = snapshot
            .conversations
            .into_iter()
            .map(|mut conv| {
                conv.rederive_bucket();
                (conv.id.clone(), conv)
            })
            .collect();
        let rag_tags = snapshot
            .rag_tags
            .iter()
            .filter_map(|tag| normalize_rag_tag(Some(tag)).map(str::to_string))
            .collect();

        Self {
            conversations,
            messages: snapshot.messages.into_iter().collect(),
            rag_tags,
            generation: 0,
        }
    }

    fn to_snapshot(&self) -> Snapshot {
        let mut conversations: Vec<Conversation> = self.conversations.values().cloned().collect();
        sort_newest_first(&mut conversations);
        conversations.reverse();

        Snapshot {
            conversations,
            messages: self
                .messages
                .iter()
                .map(|(id, list)| (id.clone(), list.clone()))
                .collect(),
            rag_tags: self.rag_tags.iter().cloned().collect(),
        }
    }
}

/// Conversation store in process memory, optionally snapshotted to a file
pub struct MemoryStore {
    state: RwLock<MemoryState>,
    snapshot_path: Option<PathBuf>,
    /// Generation of the last snapshot on disk
    written: Mutex<u64>,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    /// Create an empty store without snapshots
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: RwLock::new(MemoryState::default()),
            snapshot_path: None,
            written: Mutex::new(0),
        }
    }

    /// Create a store snapshotted to `path`, restoring from it when present
    pub async fn with_snapshot(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let state = match load_snapshot(&path).await {
            Ok(Some(snapshot)) => {
                info!(
                    path = %path.display(),
                    conversations = snapshot.conversations.len(),
                    "Restored store snapshot"
                );
                MemoryState::from_snapshot(snapshot)
            }
            Ok(None) => MemoryState::default(),
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Store snapshot unreadable, starting empty");
                MemoryState::default()
            }
        };

        Self {
            state: RwLock::new(state),
            snapshot_path: Some(path),
            written: Mutex::new(0),
        }
    }

    /// Create a store from an optional snapshot path
    pub async fn open(snapshot_path: Option<PathBuf>) -> Self {
        match snapshot_path {
            Some(path) => Self::with_snapshot(path).await,
            None => Self::new(),
        }
    }

    /// Snapshot file, if configured
    #[must_use]
    pub fn snapshot_path(&self) -> Option<&Path> {
        self.snapshot_path.as_deref()
    }

    /// Serialize the state for the snapshot; call with the write lock held
    fn stage(&self, state: &mut MemoryState) -> Option<PendingSnapshot> {
        self.snapshot_path.as_ref()?;
        state.generation += 1;
        match serde_json::to_string_pretty(&state.to_snapshot()) {
            Ok(json) => Some(PendingSnapshot {
                generation: state.generation,
                json,
            }),
            Err(e) => {
                warn!(error = %e, "Store snapshot serialization failed");
                None
            }
        }
    }

    /// Write a staged snapshot unless a newer one is already on disk
    async fn flush(&self, pending: Option<PendingSnapshot>) {
        let (Some(path), Some(pending)) = (&self.snapshot_path, pending) else {
            return;
        };
        let mut written = self.written.lock().await;
        if pending.generation <= *written {
            return;
        }
        match save_snapshot(path, &pending.json).await {
            Ok(()) => *written = pending.generation,
            Err(e) => warn!(path = %path.display(), error = %e, "Store snapshot write failed"),
        }
    }
}

async fn load_snapshot(path: &Path) -> Result<Option<Snapshot>> {
    if !tokio::fs::try_exists(path).await? {
        return Ok(None);
    }
    let json = tokio::fs::read_to_string(path).await?;
    Ok(Some(serde_json::from_str(&json)?))
}

fn temp_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(".tmp");
    path.with_file_name(name)
}

async fn save_snapshot(path: &Path, json: &str) -> Result<()> {
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(dir).await?;
    }
    let temp = temp_path(path);
    tokio::fs::write(&temp, json).await?;
    tokio::fs::rename(&temp, path).await?;
    Ok(())
}

#[async_trait]
impl ConversationStore for MemoryStore {
    async fn list_conversations(&self, bucket: Bucket) -> Result<Vec<Conversation>> {
        let state = self.state.read().await;
        let mut list: Vec<Conversation> = state
            .conversations
            .values()
            .filter(|c| Bucket::for_rag_tag(c.rag_tag.as_deref()) == bucket)
            .cloned()
            .collect();
        sort_newest_first(&mut list);
        Ok(list)
    }

    async fn get_conversation(&self, id: &str) -> Result<Option<Conversation>> {
        Ok(self.state.read().await.conversations.get(id).cloned())
    }

    async fn create_conversation(
        &self,
        rag_tag: Option<&str>,
        pipeline_id: Option<&str>,
    ) -> Result<Conversation> {
        let conv = Conversation::new(rag_tag, pipeline_id);

        let mut state = self.state.write().await;
        state.conversations.insert(conv.id.clone(), conv.clone());
        state.messages.insert(conv.id.clone(), Vec::new());
        let pending = self.stage(&mut state);
        drop(state);
        self.flush(pending).await;

        debug!(id = %conv.id, bucket = %conv.bucket, "Conversation created");
        Ok(conv)
    }

    async fn update_conversation_title(
        &self,
        id: &str,
        title: &str,
    ) -> Result<Option<Conversation>> {
        let mut state = self.state.write().await;
        let Some(conv) = state.conversations.get_mut(id) else {
            return Ok(None);
        };
        conv.title = title.to_string();
        let updated = conv.clone();
        let pending = self.stage(&mut state);
        drop(state);
        self.flush(pending).await;
        Ok(Some(updated))
    }

    async fn get_messages(&self, conversation_id: &str) -> Result<Vec<Message>> {
        Ok(self
            .state
            .read()
            .await
            .messages
            .get(conversation_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn add_message(
        &self,
        conversation_id: &str,
        role: MessageRole,
        content: &str,
    ) -> Result<Option<Message>> {
        let mut state = self.state.write().await;
        if !state.conversations.contains_key(conversation_id) {
            return Ok(None);
        }
        let message = Message::new(role, content);
        state
            .messages
            .entry(conversation_id.to_string())
            .or_default()
            .push(message.clone());
        let pending = self.stage(&mut state);
        drop(state);
        self.flush(pending).await;
        Ok(Some(message))
    }

    async fn register_rag_tag(&self, tag: &str) -> Result<()> {
        let Some(tag) = normalize_rag_tag(Some(tag)) else {
            return Ok(());
        };
        let mut state = self.state.write().await;
        if state.rag_tags.insert(tag.to_string()) {
            let pending = self.stage(&mut state);
            drop(state);
            self.flush(pending).await;
        }
        Ok(())
    }

    async fn list_rag_tags(&self) -> Result<Vec<String>> {
        Ok(self.state.read().await.rag_tags.iter().cloned().collect())
    }

    async fn delete_conversation(&self, id: &str) -> Result<bool> {
        let mut state = self.state.write().await;
        let existed = state.conversations.remove(id).is_some();
        state.messages.remove(id);
        if existed {
            let pending = self.stage(&mut state);
            drop(state);
            self.flush(pending).await;
        }
        Ok(existed)
    }

    async fn clear_all(&self) -> Result<ClearOutcome> {
        Ok(ClearOutcome {
            cleared: false,
            keys_deleted: 0,
        })
    }

    fn backend_kind(&self) -> BackendKind {
        BackendKind::Memory
    }
}
