//! Signflow Storage Library
//!
//! Storage abstraction for uploaded PDFs and its local filesystem implementation.
//!
//! # Storage key format
//!
//! Documents record their location as `uploads/{user}/{group}/{file}`. Storage
//! keys are that path with the `uploads/` prefix removed, resolved against the
//! configured upload directory. Use [`storage_key`] to convert.
//!
//! Keys must not contain `..` or a leading `/`.

pub mod factory;
pub mod local;
pub mod traits;

pub use factory::create_storage;
pub use local::LocalStorage;
pub use traits::{Storage, StorageError, StorageResult};

/// Storage key for a stored document path.
pub fn storage_key(file_path: &str) -> &str {
    signflow_core::validation::strip_uploads_prefix(file_path)
}
