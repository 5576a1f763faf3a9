//! Olo Core - conversation services
//!
//! Wires the conversation store and the workflow dispatcher together:
//! - [`ChatService`]: one chat turn, end to end
//! - [`DocumentService`]: upload acceptance and ingestion dispatch
//! - [`PipelineCatalog`]: the selectable chat and RAG pipelines

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod chat;
pub mod documents;
pub mod error;
pub mod pipelines;

pub use chat::{title_from, ChatService, ChatTurn};
pub use documents::{DocumentService, UploadAccepted, MAX_UPLOAD_FILES};
pub use error::{ChatError, UploadError};
pub use pipelines::{PipelineCatalog, PipelineOption, PipelinesConfig};
