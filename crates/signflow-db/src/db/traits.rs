use async_trait::async_trait;
use signflow_core::{
    models::{Document, DocumentStatus, NewDocument, Signature, SignerPageDocument, SignerStatus, User, UserRole},
    AppError, SignatureCounts,
};
use uuid::Uuid;

/// Document rows
#[async_trait]
pub trait DocumentStore: Send + Sync {
    async fn create(&self, new: NewDocument) -> Result<Document, AppError>;

    async fn get(&self, id: Uuid) -> Result<Option<Document>, AppError>;

    /// Title, creation date and uploader name for the signer page
    async fn signer_page_info(&self, id: Uuid) -> Result<Option<SignerPageDocument>, AppError>;

    /// Move the document to `archived`. Returns `false` when it does not exist.
    async fn archive(&self, id: Uuid) -> Result<bool, AppError>;

    /// Delete the document row and, by cascade, its roster and ledger.
    /// Returns `false` when it does not exist.
    async fn delete(&self, id: Uuid) -> Result<bool, AppError>;
}

/// Signer roster and signature ledger
///
/// Resolution methods are atomic with the sequencing guard: an entry moves out
/// of `pending` only if it was still pending and its predecessor was signed at
/// the moment of the write.
#[async_trait]
pub trait SignatureLedger: Send + Sync {
    /// Add roster and ledger entries for `user_ids`, position `index + 1`.
    /// Pairs already present are left untouched. Returns how many were added.
    async fn assign(&self, document_id: Uuid, user_ids: &[Uuid]) -> Result<usize, AppError>;

    /// Roster joined with ledger state, ordered by position
    async fn roster(&self, document_id: Uuid) -> Result<Vec<SignerStatus>, AppError>;

    async fn counts(&self, document_id: Uuid) -> Result<SignatureCounts, AppError>;

    async fn get_signature(
        &self,
        document_id: Uuid,
        signer_id: Uuid,
    ) -> Result<Option<Signature>, AppError>;

    /// Fails with `NotAssigned`, `OutOfOrder` or `Conflict` (already resolved).
    async fn record_signature(
        &self,
        document_id: Uuid,
        signer_id: Uuid,
        signature_data: &str,
    ) -> Result<Signature, AppError>;

    /// Same failure modes as [`SignatureLedger::record_signature`].
    async fn record_rejection(
        &self,
        document_id: Uuid,
        signer_id: Uuid,
        reason: &str,
    ) -> Result<Signature, AppError>;

    /// Re-derive the document status from current ledger counts and persist it.
    ///
    /// Archived documents are left as they are. Returns `None` when the document
    /// does not exist.
    async fn recompute_status(&self, document_id: Uuid) -> Result<Option<DocumentStatus>, AppError>;
}

/// User directory
#[async_trait]
pub trait UserDirectory: Send + Sync {
    /// All users ordered by name
    async fn list_users(&self) -> Result<Vec<User>, AppError>;

    async fn create_user(&self, name: &str, email: &str, role: UserRole) -> Result<User, AppError>;

    async fn get_user(&self, id: Uuid) -> Result<Option<User>, AppError>;

    async fn get_user_by_email(&self, email: &str) -> Result<Option<User>, AppError>;

    /// Active users, the acting user first, then by name
    async fn available_signers(&self, acting_user_id: Uuid) -> Result<Vec<User>, AppError>;
}
