//! Database transaction utilities
//!
//! Multi-step ledger writes (assignment, sign, reject, status refresh) run inside
//! a transaction that first locks the document row, so concurrent writers on
//! the same document are serialized by Postgres.

use signflow_core::AppError;
use sqlx::{PgConnection, PgPool, Postgres, Transaction};
use uuid::Uuid;

/// A database transaction wrapper that tracks commit/rollback
///
/// # Example
///
/// ```ignore
/// use signflow_db::db::transaction::TransactionGuard;
///
/// async fn example(pool: &sqlx::PgPool, id: uuid::Uuid) -> Result<(), signflow_core::AppError> {
///     let mut tx = TransactionGuard::begin(pool).await?;
///     tx.lock_document(id).await?;
///     sqlx::query("UPDATE ...").execute(tx.conn()?).await?;
///     tx.commit().await
/// }
/// ```
pub struct TransactionGuard {
    transaction: Option<Transaction<'static, Postgres>>,
}

impl TransactionGuard {
    /// Begin a new database transaction
    pub async fn begin(pool: &PgPool) -> Result<Self, AppError> {
        let transaction = pool.begin().await?;
        Ok(Self {
            transaction: Some(transaction),
        })
    }

    /// Connection of the open transaction
    pub fn conn(&mut self) -> Result<&mut PgConnection, AppError> {
        self.transaction
            .as_deref_mut()
            .ok_or_else(|| AppError::Internal("Transaction already finished".to_string()))
    }

    /// Take a row lock on the document for the rest of the transaction.
    ///
    /// Returns `false` when the document does not exist.
    pub async fn lock_document(&mut self, document_id: Uuid) -> Result<bool, AppError> {
        let locked = sqlx::query_scalar::<Postgres, Uuid>(
            "SELECT id FROM documents WHERE id = $1 FOR UPDATE",
        )
        .bind(document_id)
        .fetch_optional(self.conn()?)
        .await?;

        Ok(locked.is_some())
    }

    /// Commit the transaction
    pub async fn commit(mut self) -> Result<(), AppError> {
        if let Some(tx) = self.transaction.take() {
            tx.commit().await?;
        }
        Ok(())
    }

    /// Roll the transaction back
    pub async fn rollback(mut self) -> Result<(), AppError> {
        if let Some(tx) = self.transaction.take() {
            tx.rollback().await?;
        }
        Ok(())
    }
}

impl Drop for TransactionGuard {
    fn drop(&mut self) {
        if self.transaction.is_some() {
            // sqlx rolls back a dropped transaction when its connection returns to the pool
            tracing::warn!("Transaction was dropped without explicit commit or rollback");
        }
    }
}
