//! Signflow Core Library
//!
//! Domain models, error types, configuration, the pure workflow rules
//! (status aggregation and sequencing) and the collaborator traits shared by
//! every Signflow component.

pub mod config;
pub mod error;
pub mod hooks;
pub mod models;
pub mod validation;
pub mod workflow;

pub use config::{Config, LogFormat, SignflowConfig};
pub use error::{AppError, ErrorMetadata, LogLevel};
pub use hooks::{AuditSink, NoOpAuditSink, NoOpSignerPageSync, SignerPageSync};
pub use workflow::{check_sequence, derive_document_status, SequenceCheck, SignatureCounts};
