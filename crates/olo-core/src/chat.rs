//! Chat turns
//!
//! One turn: store the user's message, send the whole history to the chat
//! pipeline, store whatever comes back as the assistant's message. A failed
//! dispatch is still stored, as `[Pipeline error: ...]`, so the user's own
//! message is never left without an answer.

use crate::error::ChatError;
use olo_dispatch::{ChatMessage, CommandOptions, DispatchStatus, WorkflowDispatcher};
use olo_store::{ConversationStore, MessageRole, NEW_CHAT_TITLE};
use serde::Serialize;
use std::sync::Arc;
use tracing::{info, warn};

/// Assistant message when the pipeline reported neither a reply nor an error
pub const NO_REPLY_APOLOGY: &str = "Sorry, I could not generate a response. Check that Temporal and your LLM/RAG workers are running.";

/// Pipeline id reported for conversations without one
pub const DEFAULT_REPORTED_PIPELINE: &str = "llm";

/// Longest automatic title, in characters
const TITLE_MAX_CHARS: usize = 50;

/// Outcome of a chat turn
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatTurn {
    /// Stored assistant message text
    pub reply: String,
    /// Conversation's pipeline, or `"llm"`
    pub pipeline_id: String,
    /// Conversation's RAG tag
    pub rag_tag: Option<String>,
    /// How the dispatch ended
    pub status: DispatchStatus,
}

/// Runs chat turns against a store and a dispatcher
#[derive(Clone)]
pub struct ChatService {
    store: Arc<dyn ConversationStore>,
    dispatcher: Arc<WorkflowDispatcher>,
}

impl ChatService {
    /// Create a chat service
    #[must_use]
    pub fn new(store: Arc<dyn ConversationStore>, dispatcher: Arc<WorkflowDispatcher>) -> Self {
        Self { store, dispatcher }
    }

    /// Run one turn of a conversation
    pub async fn send_message(
        &self,
        conversation_id: &str,
        content: &str,
        options: &CommandOptions,
    ) -> Result<ChatTurn, ChatError> {
        let content = content.trim();
        if conversation_id.trim().is_empty() || content.is_empty() {
            return Err(ChatError::InvalidInput(
                "conversationId and content required".to_string(),
            ));
        }

        let conv = self
            .store
            .get_conversation(conversation_id)
            .await?
            .ok_or_else(|| ChatError::ConversationNotFound(conversation_id.to_string()))?;

        self.store
            .add_message(conversation_id, MessageRole::User, content)
            .await?;

        let history: Vec<ChatMessage> = self
            .store
            .get_messages(conversation_id)
            .await?
            .into_iter()
            .map(|m| ChatMessage::new(m.role.as_str(), m.content))
            .collect();

        let outcome = self
            .dispatcher
            .dispatch_chat(
                conv.pipeline_id.as_deref(),
                conv.rag_tag.as_deref(),
                &history,
                options,
            )
            .await;

        let reply = match (&outcome.reply, &outcome.error) {
            (Some(reply), _) if outcome.success && !reply.is_empty() => reply.clone(),
            (_, Some(error)) => format!("[Pipeline error: {error}]"),
            _ => NO_REPLY_APOLOGY.to_string(),
        };
        if !outcome.success {
            warn!(conversation_id, status = ?outcome.status, "Chat turn failed");
        }

        self.store
            .add_message(conversation_id, MessageRole::Assistant, &reply)
            .await?;

        if conv.has_default_title() && history.len() <= 1 {
            let title = title_from(content);
            self.store
                .update_conversation_title(conversation_id, &title)
                .await?;
        }

        info!(conversation_id, status = ?outcome.status, "Chat turn complete");
        Ok(ChatTurn {
            reply,
            pipeline_id: conv
                .pipeline_id
                .unwrap_or_else(|| DEFAULT_REPORTED_PIPELINE.to_string()),
            rag_tag: conv.rag_tag,
            status: outcome.status,
        })
    }
}

/// First line of the message, at most 50 characters
#[must_use]
pub fn title_from(content: &str) -> String {
    let title: String = content
        .lines()
        .next()
        .unwrap_or_default()
        .chars()
        .take(TITLE_MAX_CHARS)
        .collect();
    if title.is_empty() {
        NEW_CHAT_TITLE.to_string()
    } else {
        title
    }
}
