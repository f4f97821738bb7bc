use async_trait::async_trait;
use chrono::{DateTime, Utc};
use signflow_core::{
    models::{Document, NewDocument, SignerPageDocument},
    AppError,
};
use sqlx::{FromRow, PgPool, Postgres};
use uuid::Uuid;

use super::traits::DocumentStore;

const DOCUMENT_COLUMNS: &str = "id, title, description, file_name, file_path, file_size, mime_type, \
     status, uploaded_by, created_at, updated_at, completed_at";

/// Repository for document rows
#[derive(Clone)]
pub struct DocumentRepository {
    pool: PgPool,
}

#[derive(FromRow)]
struct SignerPageRow {
    title: String,
    created_at: DateTime<Utc>,
    uploaded_by_name: Option<String>,
}

impl DocumentRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl DocumentStore for DocumentRepository {
    #[tracing::instrument(skip(self, new), fields(db.table = "documents", db.operation = "insert"))]
    async fn create(&self, new: NewDocument) -> Result<Document, AppError> {
        let document = sqlx::query_as::<Postgres, Document>(&format!(
            r#"
            INSERT INTO documents (title, description, file_name, file_path, file_size, mime_type, uploaded_by)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING {}
            "#,
            DOCUMENT_COLUMNS
        ))
        .bind(&new.title)
        .bind(&new.description)
        .bind(&new.file_name)
        .bind(&new.file_path)
        .bind(new.file_size)
        .bind(&new.mime_type)
        .bind(new.uploaded_by)
        .fetch_one(&self.pool)
        .await?;

        Ok(document)
    }

    #[tracing::instrument(skip(self), fields(db.table = "documents", db.operation = "select", db.record_id = %id))]
    async fn get(&self, id: Uuid) -> Result<Option<Document>, AppError> {
        let document = sqlx::query_as::<Postgres, Document>(&format!(
            "SELECT {} FROM documents WHERE id = $1",
            DOCUMENT_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(document)
    }

    #[tracing::instrument(skip(self), fields(db.table = "documents", db.operation = "select", db.record_id = %id))]
    async fn signer_page_info(&self, id: Uuid) -> Result<Option<SignerPageDocument>, AppError> {
        let row = sqlx::query_as::<Postgres, SignerPageRow>(
            r#"
            SELECT d.title, d.created_at, u.name AS uploaded_by_name
            FROM documents d
            LEFT JOIN users u ON u.id = d.uploaded_by
            WHERE d.id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|r| SignerPageDocument {
            title: r.title,
            created_at: r.created_at,
            uploaded_by_name: r.uploaded_by_name,
        }))
    }

    #[tracing::instrument(skip(self), fields(db.table = "documents", db.operation = "update", db.record_id = %id))]
    async fn archive(&self, id: Uuid) -> Result<bool, AppError> {
        let result = sqlx::query(
            "UPDATE documents SET status = 'archived', updated_at = NOW() WHERE id = $1",
        )
        .bind(id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    #[tracing::instrument(skip(self), fields(db.table = "documents", db.operation = "delete", db.record_id = %id))]
    async fn delete(&self, id: Uuid) -> Result<bool, AppError> {
        let result = sqlx::query("DELETE FROM documents WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}
