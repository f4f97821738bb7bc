//! Read-only inbox queries
//!
//! These joins back the per-user document views. They never write and are not
//! part of the workflow engine's contract, so they live on the Postgres side only.

use signflow_core::{
    models::{
        Document, DocumentStatus, DocumentWithCounts, PendingDocument, RejectedDocument,
        SignatureWithDocument, SignatureWithSigner, SignedDocument,
    },
    AppError,
};
use sqlx::{PgPool, Postgres};
use uuid::Uuid;

/// Repository for inbox listings
#[derive(Clone)]
pub struct ListingRepository {
    pool: PgPool,
}

impl ListingRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Every document, newest first
    #[tracing::instrument(skip(self), fields(db.table = "documents", db.operation = "select"))]
    pub async fn all_documents(&self) -> Result<Vec<Document>, AppError> {
        let documents = sqlx::query_as::<Postgres, Document>(
            "SELECT d.* FROM documents d ORDER BY d.created_at DESC",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(documents)
    }

    /// Documents in one status, newest first
    #[tracing::instrument(skip(self), fields(db.table = "documents", db.operation = "select"))]
    pub async fn documents_by_status(
        &self,
        status: DocumentStatus,
    ) -> Result<Vec<Document>, AppError> {
        let documents = sqlx::query_as::<Postgres, Document>(
            "SELECT d.* FROM documents d WHERE d.status = $1 ORDER BY d.created_at DESC",
        )
        .bind(status)
        .fetch_all(&self.pool)
        .await?;

        Ok(documents)
    }

    /// Documents uploaded by the user with roster progress
    #[tracing::instrument(skip(self), fields(db.table = "documents", db.operation = "select"))]
    pub async fn my_documents(&self, user_id: Uuid) -> Result<Vec<DocumentWithCounts>, AppError> {
        let documents = sqlx::query_as::<Postgres, DocumentWithCounts>(
            r#"
            SELECT d.*,
                   COUNT(DISTINCT ds.user_id) AS total_signers,
                   COUNT(DISTINCT CASE WHEN s.status = 'signed' THEN s.signer_id END) AS signed_count,
                   COUNT(DISTINCT CASE WHEN s.status = 'pending' THEN s.signer_id END) AS pending_count
            FROM documents d
            LEFT JOIN document_signers ds ON ds.document_id = d.id
            LEFT JOIN signatures s ON s.document_id = d.id AND s.signer_id = ds.user_id
            WHERE d.uploaded_by = $1
            GROUP BY d.id
            ORDER BY d.created_at DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(documents)
    }

    /// Documents where the user's entry is still pending and the document is
    /// neither completed nor archived.
    ///
    /// `pending_previous_signers` counts every earlier position not yet signed,
    /// so a value of zero means it is the user's turn.
    #[tracing::instrument(skip(self), fields(db.table = "document_signers", db.operation = "select"))]
    pub async fn pending_documents(&self, user_id: Uuid) -> Result<Vec<PendingDocument>, AppError> {
        let documents = sqlx::query_as::<Postgres, PendingDocument>(
            r#"
            SELECT d.*,
                   u.name AS uploaded_by_name,
                   ds.order_position,
                   CASE WHEN ds.order_position > 1 THEN (
                       SELECT COUNT(*)
                       FROM document_signers ds_prev
                       LEFT JOIN signatures s_prev
                              ON s_prev.document_id = ds_prev.document_id
                             AND s_prev.signer_id = ds_prev.user_id
                       WHERE ds_prev.document_id = d.id
                         AND ds_prev.order_position < ds.order_position
                         AND COALESCE(s_prev.status, 'pending') <> 'signed'
                   ) ELSE 0 END AS pending_previous_signers,
                   CASE WHEN ds.order_position > 1 THEN (
                       SELECT u_prev.name
                       FROM document_signers ds_prev
                       JOIN users u_prev ON u_prev.id = ds_prev.user_id
                       WHERE ds_prev.document_id = d.id
                         AND ds_prev.order_position = ds.order_position - 1
                       ORDER BY ds_prev.created_at ASC
                       LIMIT 1
                   ) END AS previous_signer_name
            FROM document_signers ds
            JOIN documents d ON d.id = ds.document_id
            JOIN users u ON u.id = d.uploaded_by
            LEFT JOIN signatures s ON s.document_id = d.id AND s.signer_id = ds.user_id
            WHERE ds.user_id = $1
              AND COALESCE(s.status, 'pending') = 'pending'
              AND d.status NOT IN ('completed', 'archived')
            ORDER BY d.created_at DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(documents)
    }

    /// Documents the user has signed, most recent signature first
    #[tracing::instrument(skip(self), fields(db.table = "signatures", db.operation = "select"))]
    pub async fn signed_documents(&self, user_id: Uuid) -> Result<Vec<SignedDocument>, AppError> {
        let documents = sqlx::query_as::<Postgres, SignedDocument>(
            r#"
            SELECT d.*,
                   u.name AS uploaded_by_name,
                   s.signed_at,
                   s.signature_type
            FROM signatures s
            JOIN documents d ON d.id = s.document_id
            JOIN users u ON u.id = d.uploaded_by
            WHERE s.signer_id = $1
              AND s.status = 'signed'
            ORDER BY s.signed_at DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(documents)
    }

    /// Documents the user rejected
    #[tracing::instrument(skip(self), fields(db.table = "signatures", db.operation = "select"))]
    pub async fn rejected_by_me(&self, user_id: Uuid) -> Result<Vec<RejectedDocument>, AppError> {
        let documents = sqlx::query_as::<Postgres, RejectedDocument>(
            r#"
            SELECT d.*,
                   u.name AS uploaded_by_name,
                   me.id AS rejected_by_id,
                   me.name AS rejected_by_name,
                   s.rejection_reason,
                   s.rejected_at
            FROM signatures s
            JOIN documents d ON d.id = s.document_id
            JOIN users u ON u.id = d.uploaded_by
            JOIN users me ON me.id = s.signer_id
            WHERE s.signer_id = $1
              AND s.status = 'rejected'
            ORDER BY COALESCE(s.rejected_at, s.signed_at, s.created_at) DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(documents)
    }

    /// Rejected documents the user is a signer on, where someone else rejected
    /// and the user is not the uploader
    #[tracing::instrument(skip(self), fields(db.table = "signatures", db.operation = "select"))]
    pub async fn rejected_by_others(
        &self,
        user_id: Uuid,
    ) -> Result<Vec<RejectedDocument>, AppError> {
        let documents = sqlx::query_as::<Postgres, RejectedDocument>(
            r#"
            SELECT d.*,
                   u.name AS uploaded_by_name,
                   rejector.id AS rejected_by_id,
                   rejector.name AS rejected_by_name,
                   rs.rejection_reason,
                   rs.rejected_at
            FROM documents d
            JOIN users u ON u.id = d.uploaded_by
            JOIN signatures my_sig ON my_sig.document_id = d.id AND my_sig.signer_id = $1
            JOIN signatures rs ON rs.document_id = d.id
                              AND rs.status = 'rejected'
                              AND rs.signer_id <> $1
            JOIN users rejector ON rejector.id = rs.signer_id
            WHERE d.status = 'rejected'
              AND d.uploaded_by <> $1
            ORDER BY COALESCE(rs.rejected_at, rs.signed_at, rs.created_at) DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(documents)
    }

    /// Ledger entries of one document with signer names
    #[tracing::instrument(skip(self), fields(db.table = "signatures", db.operation = "select"))]
    pub async fn document_signatures(
        &self,
        document_id: Uuid,
    ) -> Result<Vec<SignatureWithSigner>, AppError> {
        let signatures = sqlx::query_as::<Postgres, SignatureWithSigner>(
            r#"
            SELECT s.*, u.name AS signer_name, u.email AS signer_email
            FROM signatures s
            JOIN users u ON u.id = s.signer_id
            WHERE s.document_id = $1
            ORDER BY s.created_at DESC
            "#,
        )
        .bind(document_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(signatures)
    }

    /// Every ledger entry of the user with document titles
    #[tracing::instrument(skip(self), fields(db.table = "signatures", db.operation = "select"))]
    pub async fn my_signatures(&self, user_id: Uuid) -> Result<Vec<SignatureWithDocument>, AppError> {
        let signatures = sqlx::query_as::<Postgres, SignatureWithDocument>(
            r#"
            SELECT s.*, d.title AS document_title
            FROM signatures s
            JOIN documents d ON d.id = s.document_id
            WHERE s.signer_id = $1
            ORDER BY s.created_at DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(signatures)
    }
}
