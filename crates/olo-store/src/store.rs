//! Conversation store contract
//!
//! Implemented by [`MemoryStore`](crate::MemoryStore) and
//! [`RedisStore`](crate::RedisStore); [`StoreBackend`](crate::StoreBackend)
//! picks one at startup.
//!
//! Lookups by id search both buckets. A missing conversation is never an
//! error: it comes back as `None`, `false` or an empty list.

use crate::error::Result;
use crate::model::{BackendKind, Bucket, ClearOutcome, Conversation, Message, MessageRole};
use async_trait::async_trait;

/// Storage for conversations, messages and RAG tags
#[async_trait]
pub trait ConversationStore: Send + Sync {
    /// Conversations in a bucket, newest first
    async fn list_conversations(&self, bucket: Bucket) -> Result<Vec<Conversation>>;

    /// Get a conversation from whichever bucket holds it
    async fn get_conversation(&self, id: &str) -> Result<Option<Conversation>>;

    /// Create a conversation with an empty message list
    async fn create_conversation(
        &self,
        rag_tag: Option<&str>,
        pipeline_id: Option<&str>,
    ) -> Result<Conversation>;

    /// Rewrite the title only
    async fn update_conversation_title(&self, id: &str, title: &str)
        -> Result<Option<Conversation>>;

    /// Messages in append order
    async fn get_messages(&self, conversation_id: &str) -> Result<Vec<Message>>;

    /// Append a message to an existing conversation
    async fn add_message(
        &self,
        conversation_id: &str,
        role: MessageRole,
        content: &str,
    ) -> Result<Option<Message>>;

    /// Register a RAG tag; blank tags are ignored
    async fn register_rag_tag(&self, tag: &str) -> Result<()>;

    /// Registered tags, sorted
    async fn list_rag_tags(&self) -> Result<Vec<String>>;

    /// Delete a conversation and its messages; false if it did not exist
    async fn delete_conversation(&self, id: &str) -> Result<bool>;

    /// Wipe everything the application owns
    async fn clear_all(&self) -> Result<ClearOutcome>;

    /// Backend serving this store
    fn backend_kind(&self) -> BackendKind;
}
