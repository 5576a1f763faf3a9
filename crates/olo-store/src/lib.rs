//! Olo Store - conversation persistence
//!
//! Conversations, their messages and the RAG tag registry, behind one
//! [`ConversationStore`] trait with two backends:
//! - [`RedisStore`] for shared, durable storage
//! - [`MemoryStore`] for single-process use, with an optional JSON snapshot
//!
//! [`StoreBackend::select`] probes Redis once at startup and falls back to
//! memory for the rest of the process when it is unavailable.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod backend;
pub mod config;
pub mod error;
pub mod memory;
pub mod model;
/// Redis backend
pub mod redis_store;
pub mod store;

pub use backend::StoreBackend;
pub use config::StoreConfig;
pub use error::{Error, Result};
pub use memory::MemoryStore;
pub use model::{
    BackendKind, Bucket, ClearOutcome, Conversation, Message, MessageRole, Snapshot,
    NEW_CHAT_TITLE,
};
pub use redis_store::RedisStore;
pub use store::ConversationStore;
