//! Collaborator traits the workflow engine calls into
//!
//! Implementations live in other crates (`signflow-processing` for the signer
//! page, `signflow-db` for the audit log). Both are best-effort from the
//! engine's point of view: failures are logged and never undo a ledger change.

use async_trait::async_trait;

use crate::error::AppError;
use crate::models::{AuditEntry, SignerPageDocument, SignerStatus};

/// Rewrites the trailing signer summary page of a stored PDF.
///
/// After every call the file ends with exactly one summary page reflecting
/// `signers`, whether the call appended a new page or replaced an old one.
#[async_trait]
pub trait SignerPageSync: Send + Sync {
    async fn sync(
        &self,
        file_path: &str,
        signers: &[SignerStatus],
        document: &SignerPageDocument,
    ) -> Result<(), AppError>;
}

/// Append-only audit sink
#[async_trait]
pub trait AuditSink: Send + Sync {
    async fn record(&self, entry: AuditEntry) -> Result<(), AppError>;
}

/// Signer page sync that does nothing, for deployments that keep PDFs untouched
pub struct NoOpSignerPageSync;

#[async_trait]
impl SignerPageSync for NoOpSignerPageSync {
    async fn sync(
        &self,
        _file_path: &str,
        _signers: &[SignerStatus],
        _document: &SignerPageDocument,
    ) -> Result<(), AppError> {
        Ok(())
    }
}

/// Audit sink that discards entries
pub struct NoOpAuditSink;

#[async_trait]
impl AuditSink for NoOpAuditSink {
    async fn record(&self, _entry: AuditEntry) -> Result<(), AppError> {
        Ok(())
    }
}
