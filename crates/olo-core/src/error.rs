//! Error types for olo-core

use thiserror::Error;

/// Chat turn error
#[derive(Debug, Error)]
pub enum ChatError {
    /// Request was missing something it needs
    #[error("{0}")]
    InvalidInput(String),

    /// No conversation with this id
    #[error("Conversation not found")]
    ConversationNotFound(String),

    /// Store failure
    #[error("store error: {0}")]
    Store(#[from] olo_store::Error),
}

/// Document upload error
#[derive(Debug, Error)]
pub enum UploadError {
    /// Tag missing or blank
    #[error("ragTag (or tag) is required")]
    MissingTag,

    /// No files in the upload
    #[error("At least one file is required")]
    NoFiles,

    /// Ingestion workflow was not started
    #[error("Document ingestion could not be started.")]
    DispatchFailed {
        /// Backend error text
        detail: String,
    },

    /// Store failure
    #[error("store error: {0}")]
    Store(#[from] olo_store::Error),
}
