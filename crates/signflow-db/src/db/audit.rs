use async_trait::async_trait;
use signflow_core::{
    models::{AuditEntry, AuditRecord},
    AppError, AuditSink,
};
use sqlx::{PgPool, Postgres};
use uuid::Uuid;

/// Repository for the append-only audit log
#[derive(Clone)]
pub struct AuditRepository {
    pool: PgPool,
}

impl AuditRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Audit trail for one entity, oldest first
    #[tracing::instrument(skip(self), fields(db.table = "audit_log", db.operation = "select"))]
    pub async fn list_for_entity(
        &self,
        entity_type: &str,
        entity_id: Uuid,
    ) -> Result<Vec<AuditRecord>, AppError> {
        let records = sqlx::query_as::<Postgres, AuditRecord>(
            r#"
            SELECT id, user_id, action, entity_type, entity_id, details, ip_address, created_at
            FROM audit_log
            WHERE entity_type = $1 AND entity_id = $2
            ORDER BY created_at ASC
            "#,
        )
        .bind(entity_type)
        .bind(entity_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(records)
    }
}

#[async_trait]
impl AuditSink for AuditRepository {
    #[tracing::instrument(skip(self, entry), fields(db.table = "audit_log", db.operation = "insert", action = entry.action.as_str()))]
    async fn record(&self, entry: AuditEntry) -> Result<(), AppError> {
        sqlx::query(
            r#"
            INSERT INTO audit_log (user_id, action, entity_type, entity_id, details)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(entry.user_id)
        .bind(entry.action.as_str())
        .bind(&entry.entity_type)
        .bind(entry.entity_id)
        .bind(&entry.details)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}
