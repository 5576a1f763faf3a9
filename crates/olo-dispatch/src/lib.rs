//! Olo Dispatch - workflow payloads, addressing and submission
//!
//! This crate turns a chat turn or a document upload into a unit of work for
//! the Temporal orchestration backend:
//! - [`template`]: file-based payload templates with `{{name}}` placeholders
//! - [`command`]: the `ExecutionCommand` payload workers consume
//! - [`addressing`]: workflow name, id and task queue resolution
//! - [`dispatcher`]: lazy connection, submission and the bounded chat wait
//! - [`extract`]: reply text from heterogeneous worker results
//! - [`temporal`]: the Temporal HTTP API client

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod addressing;
pub mod command;
pub mod config;
pub mod dispatcher;
pub mod error;
pub mod extract;
pub mod temporal;
pub mod template;

pub use addressing::{
    build_search_attributes, normalize_workflow_name, sanitize_identifier, Addressing,
    AttributeValues, DispatchAddress, SearchAttributes,
};
pub use command::{
    ChatMessage, CommandBuilder, CommandDefaults, CommandOptions, ExecutionCommand,
};
pub use config::DispatchConfig;
pub use dispatcher::{
    ChatOutcome, DispatchStatus, IngestionOutcome, StartWorkflowRequest, WorkflowClient,
    WorkflowConnector, WorkflowDispatcher, WorkflowHandle,
};
pub use error::{Error, Result};
pub use extract::extract_reply;
pub use temporal::{TemporalClient, TemporalConnector};
pub use template::{fill_template, TemplateKind, TemplateRenderer, TemplateValue, TemplateVars};
