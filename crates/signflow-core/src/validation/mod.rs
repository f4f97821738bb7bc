//! Validation modules

pub mod naming;
pub mod signing;

pub use naming::{normalize_name, strip_uploads_prefix, upload_relative_path, UPLOADS_PREFIX};
pub use signing::{validate_rejection_reason, validate_signer_ids, MAX_SIGNERS_PER_DOCUMENT};
