use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Kind of action recorded in the audit log
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditAction {
    Upload,
    AssignSigners,
    Sign,
    Reject,
    Archive,
    Delete,
}

impl AuditAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuditAction::Upload => "upload",
            AuditAction::AssignSigners => "assign_signers",
            AuditAction::Sign => "sign",
            AuditAction::Reject => "reject",
            AuditAction::Archive => "archive",
            AuditAction::Delete => "delete",
        }
    }
}

/// Entity type for document-scoped audit records
pub const AUDIT_ENTITY_DOCUMENT: &str = "document";

/// Append-only audit entry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEntry {
    pub user_id: Uuid,
    pub action: AuditAction,
    pub entity_type: String,
    pub entity_id: Uuid,
    pub details: Option<serde_json::Value>,
}

impl AuditEntry {
    pub fn document(user_id: Uuid, action: AuditAction, document_id: Uuid) -> Self {
        Self {
            user_id,
            action,
            entity_type: AUDIT_ENTITY_DOCUMENT.to_string(),
            entity_id: document_id,
            details: None,
        }
    }

    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.details = Some(details);
        self
    }
}

/// Audit log row
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct AuditRecord {
    pub id: Uuid,
    pub user_id: Uuid,
    pub action: String,
    pub entity_type: String,
    pub entity_id: Uuid,
    pub details: Option<serde_json::Value>,
    pub ip_address: Option<String>,
    pub created_at: DateTime<Utc>,
}
