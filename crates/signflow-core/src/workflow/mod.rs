//! Pure workflow rules: status aggregation and signing order.

pub mod sequencing;
pub mod status;

pub use sequencing::{check_sequence, SequenceCheck};
pub use status::{derive_document_status, SignatureCounts};
