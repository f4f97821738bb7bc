//! Signer roster and signature ledger models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Default `signature_type` for ledger entries created at assignment time
pub const DEFAULT_SIGNATURE_TYPE: &str = "digital";

/// Ledger entry status (matches database enum)
///
/// `Signed` and `Rejected` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(
    feature = "sqlx",
    sqlx(type_name = "signature_status", rename_all = "lowercase")
)]
#[serde(rename_all = "lowercase")]
pub enum SignatureStatus {
    Pending,
    Signed,
    Rejected,
}

impl SignatureStatus {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, SignatureStatus::Pending)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SignatureStatus::Pending => "pending",
            SignatureStatus::Signed => "signed",
            SignatureStatus::Rejected => "rejected",
        }
    }
}

/// Roster entry: one per (document, user)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct SignerRosterEntry {
    pub id: Uuid,
    pub document_id: Uuid,
    pub user_id: Uuid,
    /// 1-based, assigned as `index + 1` and never renumbered
    pub order_position: i32,
    pub is_required: bool,
    pub notified_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

/// Ledger entry: one per roster entry
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Signature {
    pub id: Uuid,
    pub document_id: Uuid,
    pub signer_id: Uuid,
    pub signature_data: Option<String>,
    pub signature_type: String,
    pub status: SignatureStatus,
    /// Also set on rejection so consumers have a single resolved-at timestamp
    pub signed_at: Option<DateTime<Utc>>,
    pub rejection_reason: Option<String>,
    pub rejected_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Roster entry joined with its ledger state and the signer's directory entry,
/// ordered by position.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct SignerStatus {
    pub user_id: Uuid,
    pub name: String,
    pub email: String,
    pub order_position: i32,
    pub status: SignatureStatus,
    pub signed_at: Option<DateTime<Utc>>,
    pub rejected_at: Option<DateTime<Utc>>,
}

/// Ledger entry with the signer's name (document signatures listing)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct SignatureWithSigner {
    #[cfg_attr(feature = "sqlx", sqlx(flatten))]
    #[serde(flatten)]
    pub signature: Signature,
    pub signer_name: String,
    pub signer_email: String,
}

/// Ledger entry with its document title (acting user's signatures listing)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct SignatureWithDocument {
    #[cfg_attr(feature = "sqlx", sqlx(flatten))]
    #[serde(flatten)]
    pub signature: Signature,
    pub document_title: String,
}
