//! Signflow Services Layer
//!
//! Orchestration on top of the repositories, storage and PDF processing:
//! the sequential signing workflow engine, document upload and the per-user
//! inbox views. Callers (the CLI, or any transport placed in front of it)
//! supply the acting user and map [`signflow_core::AppError`] to their surface.

pub mod engine;
pub mod inbox;
pub mod locks;
pub mod upload;

pub use engine::WorkflowEngine;
pub use inbox::InboxService;
pub use locks::DocumentLocks;
pub use upload::{UploadOptions, UploadService, UploadedFile, MAX_MERGE_FILES};

pub use signflow_processing::{LopdfSignerPageSync, PdfValidator};
pub use signflow_storage::{create_storage, LocalStorage, Storage, StorageError, StorageResult};
