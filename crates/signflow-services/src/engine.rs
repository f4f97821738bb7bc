//! Workflow engine
//!
//! The externally callable document operations. Each one checks the acting
//! user, mutates the roster or ledger, recomputes the document status and then
//! runs the best-effort side effects (audit record, signer page sync, file
//! delete). Side effect failures are logged and never undo the mutation.
//!
//! Mutations of one document are serialized through [`DocumentLocks`]; the
//! ledger's conditional updates cover concurrent writers in other processes.

use std::sync::Arc;
use std::time::Instant;

use serde_json::json;
use signflow_core::{
    check_sequence,
    models::{ActingUser, AuditAction, AuditEntry, Document, Signature},
    AppError, AuditSink, SequenceCheck, SignerPageSync,
};
use signflow_db::{DocumentStore, SignatureLedger};
use signflow_storage::{storage_key, Storage};
use uuid::Uuid;

use crate::locks::DocumentLocks;

pub(crate) fn require_user(acting: Option<ActingUser>) -> Result<ActingUser, AppError> {
    acting.ok_or(AppError::NotAuthenticated)
}

pub struct WorkflowEngine {
    documents: Arc<dyn DocumentStore>,
    ledger: Arc<dyn SignatureLedger>,
    storage: Arc<dyn Storage>,
    signer_page: Arc<dyn SignerPageSync>,
    audit: Arc<dyn AuditSink>,
    locks: DocumentLocks,
}

impl WorkflowEngine {
    pub fn new(
        documents: Arc<dyn DocumentStore>,
        ledger: Arc<dyn SignatureLedger>,
        storage: Arc<dyn Storage>,
        signer_page: Arc<dyn SignerPageSync>,
        audit: Arc<dyn AuditSink>,
    ) -> Self {
        Self {
            documents,
            ledger,
            storage,
            signer_page,
            audit,
            locks: DocumentLocks::new(),
        }
    }

    async fn load_document(&self, document_id: Uuid) -> Result<Document, AppError> {
        self.documents
            .get(document_id)
            .await?
            .ok_or_else(|| AppError::not_found("Document", document_id))
    }

    async fn load_managed_document(
        &self,
        document_id: Uuid,
        acting: &ActingUser,
    ) -> Result<Document, AppError> {
        let document = self.load_document(document_id).await?;
        if !acting.can_manage(document.uploaded_by) {
            return Err(AppError::Forbidden(
                "Only the uploader or an administrator can manage this document".to_string(),
            ));
        }
        Ok(document)
    }

    /// Add `user_ids` to the document's roster in the given order.
    ///
    /// Users already on the roster keep their position and ledger state.
    #[tracing::instrument(skip(self, user_ids, acting), fields(document_id = %document_id, signers = user_ids.len()))]
    pub async fn assign_signers(
        &self,
        document_id: Uuid,
        user_ids: &[Uuid],
        acting: Option<ActingUser>,
    ) -> Result<bool, AppError> {
        let acting = require_user(acting)?;

        let _guard = self.locks.acquire(document_id).await;
        let document = self.load_managed_document(document_id, &acting).await?;
        signflow_core::validation::validate_signer_ids(user_ids)?;

        let added = self.ledger.assign(document_id, user_ids).await?;
        let status = self.ledger.recompute_status(document_id).await?;

        tracing::info!(
            document_id = %document_id,
            added,
            status = ?status,
            "Signers assigned"
        );

        self.record_audit(
            AuditEntry::document(acting.id, AuditAction::AssignSigners, document_id)
                .with_details(json!({ "user_ids": user_ids })),
        )
        .await;
        self.sync_signer_page(&document).await;

        Ok(true)
    }

    /// Record the acting user's signature.
    #[tracing::instrument(skip(self, signature_data, acting), fields(document_id = %document_id))]
    pub async fn sign(
        &self,
        document_id: Uuid,
        signature_data: &str,
        acting: Option<ActingUser>,
    ) -> Result<Signature, AppError> {
        let acting = require_user(acting)?;

        let _guard = self.locks.acquire(document_id).await;
        let document = self.load_document(document_id).await?;
        self.ensure_turn(document_id, acting.id).await?;

        let signature = self
            .ledger
            .record_signature(document_id, acting.id, signature_data)
            .await?;
        let status = self.ledger.recompute_status(document_id).await?;

        tracing::info!(
            document_id = %document_id,
            signer_id = %acting.id,
            status = ?status,
            "Document signed"
        );

        self.record_audit(AuditEntry::document(acting.id, AuditAction::Sign, document_id))
            .await;
        self.sync_signer_page(&document).await;

        Ok(signature)
    }

    /// Record the acting user's rejection.
    ///
    /// Only a non-blank reason is required here; minimum length is enforced by callers.
    #[tracing::instrument(skip(self, reason, acting), fields(document_id = %document_id))]
    pub async fn reject(
        &self,
        document_id: Uuid,
        reason: &str,
        acting: Option<ActingUser>,
    ) -> Result<bool, AppError> {
        let acting = require_user(acting)?;
        let reason = reason.trim();
        if reason.is_empty() {
            return Err(AppError::InvalidInput(
                "A rejection reason is required".to_string(),
            ));
        }

        let _guard = self.locks.acquire(document_id).await;
        let document = self.load_document(document_id).await?;
        self.ensure_turn(document_id, acting.id).await?;

        self.ledger
            .record_rejection(document_id, acting.id, reason)
            .await?;
        let status = self.ledger.recompute_status(document_id).await?;

        tracing::info!(
            document_id = %document_id,
            signer_id = %acting.id,
            status = ?status,
            "Document rejected"
        );

        self.record_audit(
            AuditEntry::document(acting.id, AuditAction::Reject, document_id)
                .with_details(json!({ "reason": reason })),
        )
        .await;
        self.sync_signer_page(&document).await;

        Ok(true)
    }

    /// Move the document to `archived`. Later recomputes leave it there.
    #[tracing::instrument(skip(self, acting), fields(document_id = %document_id))]
    pub async fn archive_document(
        &self,
        document_id: Uuid,
        acting: Option<ActingUser>,
    ) -> Result<bool, AppError> {
        let acting = require_user(acting)?;

        let _guard = self.locks.acquire(document_id).await;
        self.load_managed_document(document_id, &acting).await?;

        if !self.documents.archive(document_id).await? {
            return Err(AppError::not_found("Document", document_id));
        }

        tracing::info!(document_id = %document_id, "Document archived");
        self.record_audit(AuditEntry::document(
            acting.id,
            AuditAction::Archive,
            document_id,
        ))
        .await;

        Ok(true)
    }

    /// Delete the stored file (best-effort) and the document with its roster and ledger.
    #[tracing::instrument(skip(self, acting), fields(document_id = %document_id))]
    pub async fn delete_document(
        &self,
        document_id: Uuid,
        acting: Option<ActingUser>,
    ) -> Result<bool, AppError> {
        let acting = require_user(acting)?;

        let guard = self.locks.acquire(document_id).await;
        let document = self.load_managed_document(document_id, &acting).await?;

        self.record_audit(
            AuditEntry::document(acting.id, AuditAction::Delete, document_id)
                .with_details(json!({ "title": document.title })),
        )
        .await;

        let key = storage_key(&document.file_path);
        if let Err(e) = self.storage.delete(key).await {
            tracing::warn!(
                error = %e,
                document_id = %document_id,
                key = %key,
                "Failed to delete document file, removing record anyway"
            );
        }

        let deleted = self.documents.delete(document_id).await?;
        drop(guard);
        self.locks.forget(document_id);

        tracing::info!(document_id = %document_id, deleted, "Document deleted");
        Ok(deleted)
    }

    /// Evaluate whether the acting user may sign or reject right now.
    pub async fn can_act(
        &self,
        document_id: Uuid,
        acting: Option<ActingUser>,
    ) -> Result<SequenceCheck, AppError> {
        let acting = require_user(acting)?;
        let roster = self.ledger.roster(document_id).await?;
        check_sequence(&roster, acting.id)
    }

    async fn ensure_turn(&self, document_id: Uuid, signer_id: Uuid) -> Result<(), AppError> {
        let roster = self.ledger.roster(document_id).await?;
        let check = check_sequence(&roster, signer_id)?;
        if !check.allowed {
            tracing::debug!(
                document_id = %document_id,
                signer_id = %signer_id,
                blocking_order_position = ?check.blocking_order_position,
                "Signer acted out of order"
            );
        }
        check.into_result().map(|_| ())
    }

    async fn record_audit(&self, entry: AuditEntry) {
        let action = entry.action;
        let entity_id = entry.entity_id;
        if let Err(e) = self.audit.record(entry).await {
            tracing::warn!(
                error = %e,
                action = action.as_str(),
                document_id = %entity_id,
                "Failed to write audit record"
            );
        }
    }

    async fn sync_signer_page(&self, document: &Document) {
        let start = Instant::now();
        let result = async {
            let roster = self.ledger.roster(document.id).await?;
            let info = self
                .documents
                .signer_page_info(document.id)
                .await?
                .ok_or_else(|| AppError::not_found("Document", document.id))?;
            self.signer_page
                .sync(&document.file_path, &roster, &info)
                .await
        }
        .await;

        match result {
            Ok(()) => tracing::debug!(
                document_id = %document.id,
                duration_ms = start.elapsed().as_secs_f64() * 1000.0,
                "Signer page synchronized"
            ),
            Err(e) => tracing::error!(
                error = %e,
                document_id = %document.id,
                file_path = %document.file_path,
                "Failed to synchronize signer page"
            ),
        }
    }
}
