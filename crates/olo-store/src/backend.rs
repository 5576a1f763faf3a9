//! Startup backend selection

use crate::config::StoreConfig;
use crate::error::Result;
use crate::memory::MemoryStore;
use crate::model::{BackendKind, Bucket, ClearOutcome, Conversation, Message, MessageRole};
use crate::redis_store::RedisStore;
use crate::store::ConversationStore;
use async_trait::async_trait;
use tracing::{info, warn};

/// Backend chosen once at startup
pub enum StoreBackend {
    /// Redis storage
    Redis(RedisStore),
    /// In-memory storage with optional snapshot
    Memory(MemoryStore),
}

impl StoreBackend {
    /// Pick a backend: Redis when configured and answering PING, memory otherwise
    ///
    /// The choice holds for the life of the process.
    pub async fn select(config: &StoreConfig) -> Self {
        if let Some(url) = config.redis_url() {
            match Self::connect_redis(url, &config.namespace).await {
                Ok(store) => {
                    info!(namespace = %config.namespace, "Using Redis conversation store");
                    return Self::Redis(store);
                }
                Err(e) => {
                    warn!(error = %e, "Redis unavailable, using memory store");
                }
            }
        }

        let store = MemoryStore::open(config.snapshot_file.clone()).await;
        match store.snapshot_path() {
            Some(path) => info!(snapshot = %path.display(), "Using memory conversation store"),
            None => info!("Using memory conversation store without snapshot"),
        }
        Self::Memory(store)
    }

    async fn connect_redis(url: &str, namespace: &str) -> Result<RedisStore> {
        let store = RedisStore::new(url, namespace)?;
        store.ping().await?;
        Ok(store)
    }
}

#[async_trait]
impl ConversationStore for StoreBackend {
    async fn list_conversations(&self, bucket: Bucket) -> Result<Vec<Conversation>> {
        match self {
            Self::Redis(store) => store.list_conversations(bucket).await,
            Self::Memory(store) => store.list_conversations(bucket).await,
        }
    }

    async fn get_conversation(&self, id: &str) -> Result<Option<Conversation>> {
        match self {
            Self::Redis(store) => store.get_conversation(id).await,
            Self::Memory(store) => store.get_conversation(id).await,
        }
    }

    async fn create_conversation(
        &self,
        rag_tag: Option<&str>,
        pipeline_id: Option<&str>,
    ) -> Result<Conversation> {
        match self {
            Self::Redis(store) => store.create_conversation(rag_tag, pipeline_id).await,
            Self::Memory(store) => store.create_conversation(rag_tag, pipeline_id).await,
        }
    }

    async fn update_conversation_title(
        &self,
        id: &str,
        title: &str,
    ) -> Result<Option<Conversation>> {
        match self {
            Self::Redis(store) => store.update_conversation_title(id, title).await,
            Self::Memory(store) => store.update_conversation_title(id, title).await,
        }
    }

    async fn get_messages(&self, conversation_id: &str) -> Result<Vec<Message>> {
        match self {
            Self::Redis(store) => store.get_messages(conversation_id).await,
            Self::Memory(store) => store.get_messages(conversation_id).await,
        }
    }

    async fn add_message(
        &self,
        conversation_id: &str,
        role: MessageRole,
        content: &str,
    ) -> Result<Option<Message>> {
        match self {
            Self::Redis(store) => store.add_message(conversation_id, role, content).await,
            Self::Memory(store) => store.add_message(conversation_id, role, content).await,
        }
    }

    async fn register_rag_tag(&self, tag: &str) -> Result<()> {
        match self {
            Self::Redis(store) => store.register_rag_tag(tag).await,
            Self::Memory(store) => store.register_rag_tag(tag).await,
        }
    }

    async fn list_rag_tags(&self) -> Result<Vec<String>> {
        match self {
            Self::Redis(store) => store.list_rag_tags().await,
            Self::Memory(store) => store.list_rag_tags().await,
        }
    }

    async fn delete_conversation(&self, id: &str) -> Result<bool> {
        match self {
            Self::Redis(store) => store.delete_conversation(id).await,
            Self::Memory(store) => store.delete_conversation(id).await,
        }
    }

    async fn clear_all(&self) -> Result<ClearOutcome> {
        match self {
            Self::Redis(store) => store.clear_all().await,
            Self::Memory(store) => store.clear_all().await,
        }
    }

    fn backend_kind(&self) -> BackendKind {
        match self {
            Self::Redis(store) => store.backend_kind(),
            Self::Memory(store) => store.backend_kind(),
        }
    }
}

#[cfg(test)]
mod tests;
