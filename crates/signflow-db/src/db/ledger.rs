//! Signer roster and signature ledger repository
//!
//! Every write runs in a transaction holding the document row lock. Sign and
//! reject are single conditional updates: the row changes only if it is still
//! `pending` and the entry at the previous position is `signed`. When nothing
//! changes, the roster is read inside the same transaction to report why.

use async_trait::async_trait;
use chrono::Utc;
use signflow_core::{
    check_sequence,
    models::{DocumentStatus, Signature, SignerStatus, DEFAULT_SIGNATURE_TYPE},
    AppError, SignatureCounts,
};
use sqlx::{PgConnection, PgPool, Postgres};
use uuid::Uuid;

use super::traits::SignatureLedger;
use super::transaction::TransactionGuard;

const SIGNATURE_COLUMNS: &str = "id, document_id, signer_id, signature_data, signature_type, status, \
     signed_at, rejection_reason, rejected_at, created_at, updated_at";

/// Predecessor condition shared by the sign and reject updates. `ds` is the
/// acting signer's roster row.
const PREDECESSOR_SIGNED: &str = r#"
    (
        ds.order_position <= 1
        OR EXISTS (
            SELECT 1
            FROM document_signers prev
            JOIN signatures ps ON ps.document_id = prev.document_id AND ps.signer_id = prev.user_id
            WHERE prev.document_id = ds.document_id
              AND prev.order_position = ds.order_position - 1
              AND ps.status = 'signed'
        )
    )
"#;

enum Resolution<'a> {
    Sign { signature_data: &'a str },
    Reject { reason: &'a str },
}

/// Repository for `document_signers` and `signatures`
#[derive(Clone)]
pub struct SignatureRepository {
    pool: PgPool,
}

impl SignatureRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn roster_on(
        conn: &mut PgConnection,
        document_id: Uuid,
    ) -> Result<Vec<SignerStatus>, AppError> {
        let roster = sqlx::query_as::<Postgres, SignerStatus>(
            r#"
            SELECT ds.user_id, u.name, u.email, ds.order_position,
                   COALESCE(s.status, 'pending') AS status,
                   s.signed_at, s.rejected_at
            FROM document_signers ds
            JOIN users u ON u.id = ds.user_id
            LEFT JOIN signatures s ON s.document_id = ds.document_id AND s.signer_id = ds.user_id
            WHERE ds.document_id = $1
            ORDER BY ds.order_position ASC, ds.created_at ASC
            "#,
        )
        .bind(document_id)
        .fetch_all(conn)
        .await?;

        Ok(roster)
    }

    async fn counts_on(
        conn: &mut PgConnection,
        document_id: Uuid,
    ) -> Result<SignatureCounts, AppError> {
        let counts = sqlx::query_as::<Postgres, SignatureCounts>(
            r#"
            SELECT COUNT(*) AS total,
                   COALESCE(SUM(CASE WHEN status = 'signed' THEN 1 ELSE 0 END), 0) AS signed,
                   COALESCE(SUM(CASE WHEN status = 'pending' THEN 1 ELSE 0 END), 0) AS pending,
                   COALESCE(SUM(CASE WHEN status = 'rejected' THEN 1 ELSE 0 END), 0) AS rejected
            FROM signatures
            WHERE document_id = $1
            "#,
        )
        .bind(document_id)
        .fetch_one(conn)
        .await?;

        Ok(counts)
    }

    async fn resolve(
        &self,
        document_id: Uuid,
        signer_id: Uuid,
        resolution: Resolution<'_>,
    ) -> Result<Signature, AppError> {
        let mut tx = TransactionGuard::begin(&self.pool).await?;
        if !tx.lock_document(document_id).await? {
            tx.rollback().await?;
            return Err(AppError::not_found("Document", document_id));
        }

        let now = Utc::now();
        let updated = match resolution {
            Resolution::Sign { signature_data } => {
                sqlx::query_as::<Postgres, Signature>(&format!(
                    r#"
                    UPDATE signatures s
                    SET status = 'signed', signature_data = $3, signed_at = $4, updated_at = $4
                    FROM document_signers ds
                    WHERE s.document_id = $1 AND s.signer_id = $2 AND s.status = 'pending'
                      AND ds.document_id = s.document_id AND ds.user_id = s.signer_id
                      AND {}
                    RETURNING s.id, s.document_id, s.signer_id, s.signature_data, s.signature_type,
                              s.status, s.signed_at, s.rejection_reason, s.rejected_at,
                              s.created_at, s.updated_at
                    "#,
                    PREDECESSOR_SIGNED
                ))
                .bind(document_id)
                .bind(signer_id)
                .bind(signature_data)
                .bind(now)
                .fetch_optional(tx.conn()?)
                .await?
            }
            Resolution::Reject { reason } => {
                sqlx::query_as::<Postgres, Signature>(&format!(
                    r#"
                    UPDATE signatures s
                    SET status = 'rejected', rejection_reason = $3, rejected_at = $4,
                        signed_at = $4, updated_at = $4
                    FROM document_signers ds
                    WHERE s.document_id = $1 AND s.signer_id = $2 AND s.status = 'pending'
                      AND ds.document_id = s.document_id AND ds.user_id = s.signer_id
                      AND {}
                    RETURNING s.id, s.document_id, s.signer_id, s.signature_data, s.signature_type,
                              s.status, s.signed_at, s.rejection_reason, s.rejected_at,
                              s.created_at, s.updated_at
                    "#,
                    PREDECESSOR_SIGNED
                ))
                .bind(document_id)
                .bind(signer_id)
                .bind(reason)
                .bind(now)
                .fetch_optional(tx.conn()?)
                .await?
            }
        };

        if let Some(signature) = updated {
            tx.commit().await?;
            return Ok(signature);
        }

        let roster = Self::roster_on(tx.conn()?, document_id).await?;
        tx.rollback().await?;
        Err(refusal(&roster, signer_id))
    }
}

/// Classify a conditional update that changed nothing.
fn refusal(roster: &[SignerStatus], signer_id: Uuid) -> AppError {
    let entry = match roster.iter().find(|s| s.user_id == signer_id) {
        Some(entry) => entry,
        None => return AppError::NotAssigned,
    };

    if entry.status.is_terminal() {
        return AppError::Conflict(format!(
            "Signature already {}",
            entry.status.as_str()
        ));
    }

    match check_sequence(roster, signer_id).and_then(|check| check.into_result()) {
        Err(err) => err,
        // The guard passes on a fresh read, so the roster moved under us.
        Ok(_) => AppError::Conflict("Signature state changed, retry".to_string()),
    }
}

#[async_trait]
impl SignatureLedger for SignatureRepository {
    #[tracing::instrument(skip(self, user_ids), fields(db.table = "document_signers", db.operation = "insert", signer_count = user_ids.len()))]
    async fn assign(&self, document_id: Uuid, user_ids: &[Uuid]) -> Result<usize, AppError> {
        let mut tx = TransactionGuard::begin(&self.pool).await?;
        if !tx.lock_document(document_id).await? {
            tx.rollback().await?;
            return Err(AppError::not_found("Document", document_id));
        }

        let mut added = 0;
        for (index, user_id) in user_ids.iter().enumerate() {
            let order_position = index as i32 + 1;

            let inserted = sqlx::query(
                r#"
                INSERT INTO document_signers (document_id, user_id, order_position, is_required)
                VALUES ($1, $2, $3, TRUE)
                ON CONFLICT (document_id, user_id) DO NOTHING
                "#,
            )
            .bind(document_id)
            .bind(user_id)
            .bind(order_position)
            .execute(tx.conn()?)
            .await?;

            sqlx::query(
                r#"
                INSERT INTO signatures (document_id, signer_id, signature_type, status)
                VALUES ($1, $2, $3, 'pending')
                ON CONFLICT (document_id, signer_id) DO NOTHING
                "#,
            )
            .bind(document_id)
            .bind(user_id)
            .bind(DEFAULT_SIGNATURE_TYPE)
            .execute(tx.conn()?)
            .await?;

            added += inserted.rows_affected() as usize;
        }

        tx.commit().await?;
        Ok(added)
    }

    #[tracing::instrument(skip(self), fields(db.table = "document_signers", db.operation = "select"))]
    async fn roster(&self, document_id: Uuid) -> Result<Vec<SignerStatus>, AppError> {
        let mut conn = self.pool.acquire().await?;
        Self::roster_on(&mut *conn, document_id).await
    }

    #[tracing::instrument(skip(self), fields(db.table = "signatures", db.operation = "select"))]
    async fn counts(&self, document_id: Uuid) -> Result<SignatureCounts, AppError> {
        let mut conn = self.pool.acquire().await?;
        Self::counts_on(&mut *conn, document_id).await
    }

    #[tracing::instrument(skip(self), fields(db.table = "signatures", db.operation = "select"))]
    async fn get_signature(
        &self,
        document_id: Uuid,
        signer_id: Uuid,
    ) -> Result<Option<Signature>, AppError> {
        let signature = sqlx::query_as::<Postgres, Signature>(&format!(
            "SELECT {} FROM signatures WHERE document_id = $1 AND signer_id = $2",
            SIGNATURE_COLUMNS
        ))
        .bind(document_id)
        .bind(signer_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(signature)
    }

    #[tracing::instrument(skip(self, signature_data), fields(db.table = "signatures", db.operation = "update"))]
    async fn record_signature(
        &self,
        document_id: Uuid,
        signer_id: Uuid,
        signature_data: &str,
    ) -> Result<Signature, AppError> {
        self.resolve(document_id, signer_id, Resolution::Sign { signature_data })
            .await
    }

    #[tracing::instrument(skip(self, reason), fields(db.table = "signatures", db.operation = "update"))]
    async fn record_rejection(
        &self,
        document_id: Uuid,
        signer_id: Uuid,
        reason: &str,
    ) -> Result<Signature, AppError> {
        self.resolve(document_id, signer_id, Resolution::Reject { reason })
            .await
    }

    #[tracing::instrument(skip(self), fields(db.table = "documents", db.operation = "update"))]
    async fn recompute_status(&self, document_id: Uuid) -> Result<Option<DocumentStatus>, AppError> {
        let mut tx = TransactionGuard::begin(&self.pool).await?;

        let current = sqlx::query_scalar::<Postgres, DocumentStatus>(
            "SELECT status FROM documents WHERE id = $1 FOR UPDATE",
        )
        .bind(document_id)
        .fetch_optional(tx.conn()?)
        .await?;

        let current = match current {
            Some(status) => status,
            None => {
                tx.rollback().await?;
                return Ok(None);
            }
        };

        if current == DocumentStatus::Archived {
            tx.rollback().await?;
            return Ok(Some(current));
        }

        let counts = Self::counts_on(tx.conn()?, document_id).await?;
        let status = counts.status();

        sqlx::query(
            r#"
            UPDATE documents
            SET status = $2,
                completed_at = CASE WHEN $2 = 'completed'::document_status
                                    THEN COALESCE(completed_at, NOW())
                                    ELSE completed_at END,
                updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(document_id)
        .bind(status)
        .execute(tx.conn()?)
        .await?;

        tx.commit().await?;

        if status != current {
            tracing::debug!(
                document_id = %document_id,
                from = %current,
                to = %status,
                "Document status changed"
            );
        }

        Ok(Some(status))
    }
}
