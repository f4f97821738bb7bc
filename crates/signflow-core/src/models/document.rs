//! Document models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter, Result as FmtResult};
use std::str::FromStr;
use uuid::Uuid;
use validator::Validate;

/// Document-level status (matches database enum)
///
/// Every value except `Archived` is derived from the signature ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(
    feature = "sqlx",
    sqlx(type_name = "document_status", rename_all = "snake_case")
)]
#[serde(rename_all = "snake_case")]
pub enum DocumentStatus {
    Pending,
    InProgress,
    Completed,
    Rejected,
    Archived,
}

impl DocumentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            DocumentStatus::Pending => "pending",
            DocumentStatus::InProgress => "in_progress",
            DocumentStatus::Completed => "completed",
            DocumentStatus::Rejected => "rejected",
            DocumentStatus::Archived => "archived",
        }
    }
}

impl FromStr for DocumentStatus {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "pending" => Ok(DocumentStatus::Pending),
            "in_progress" => Ok(DocumentStatus::InProgress),
            "completed" => Ok(DocumentStatus::Completed),
            "rejected" => Ok(DocumentStatus::Rejected),
            "archived" => Ok(DocumentStatus::Archived),
            _ => Err(anyhow::anyhow!("Invalid document status: {}", s)),
        }
    }
}

impl Display for DocumentStatus {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.write_str(self.as_str())
    }
}

/// Document (database row)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Document {
    pub id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub file_name: String,
    /// Relative path, always prefixed with `uploads/`
    pub file_path: String,
    pub file_size: i64,
    pub mime_type: String,
    pub status: DocumentStatus,
    pub uploaded_by: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

/// Input for creating a document row once its file is stored
#[derive(Debug, Clone, Validate)]
pub struct NewDocument {
    #[validate(length(min = 1, max = 255))]
    pub title: String,
    #[validate(length(max = 2000))]
    pub description: Option<String>,
    #[validate(length(min = 1, max = 255))]
    pub file_name: String,
    #[validate(length(min = 1, max = 1024))]
    pub file_path: String,
    #[validate(range(min = 0))]
    pub file_size: i64,
    pub mime_type: String,
    pub uploaded_by: Uuid,
}

/// Document with roster progress counts (uploader's view)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct DocumentWithCounts {
    #[cfg_attr(feature = "sqlx", sqlx(flatten))]
    #[serde(flatten)]
    pub document: Document,
    pub total_signers: i64,
    pub signed_count: i64,
    pub pending_count: i64,
}

/// Document awaiting the acting user's signature
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct PendingDocument {
    #[cfg_attr(feature = "sqlx", sqlx(flatten))]
    #[serde(flatten)]
    pub document: Document,
    pub uploaded_by_name: String,
    pub order_position: i32,
    /// Earlier signers whose entry is not yet `signed`
    pub pending_previous_signers: i64,
    pub previous_signer_name: Option<String>,
}

impl PendingDocument {
    /// Whether the acting user may sign right now.
    pub fn is_my_turn(&self) -> bool {
        self.pending_previous_signers == 0
    }
}

/// Document signed by the acting user
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct SignedDocument {
    #[cfg_attr(feature = "sqlx", sqlx(flatten))]
    #[serde(flatten)]
    pub document: Document,
    pub uploaded_by_name: String,
    pub signed_at: Option<DateTime<Utc>>,
    pub signature_type: String,
}

/// Rejected document with the rejecting signer
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct RejectedDocument {
    #[cfg_attr(feature = "sqlx", sqlx(flatten))]
    #[serde(flatten)]
    pub document: Document,
    pub uploaded_by_name: String,
    pub rejected_by_id: Uuid,
    pub rejected_by_name: String,
    pub rejection_reason: Option<String>,
    pub rejected_at: Option<DateTime<Utc>>,
}

/// Metadata printed on the signer summary page
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignerPageDocument {
    pub title: String,
    pub created_at: DateTime<Utc>,
    pub uploaded_by_name: Option<String>,
}
