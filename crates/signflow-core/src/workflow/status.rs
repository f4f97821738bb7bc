//! Document status derivation from ledger counts

use serde::{Deserialize, Serialize};

use crate::models::{DocumentStatus, SignatureStatus, SignerStatus};

/// Ledger entry counts for one document
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct SignatureCounts {
    pub total: i64,
    pub signed: i64,
    pub pending: i64,
    pub rejected: i64,
}

impl SignatureCounts {
    pub fn new(total: i64, signed: i64, pending: i64, rejected: i64) -> Self {
        Self {
            total,
            signed,
            pending,
            rejected,
        }
    }

    pub fn from_statuses<'a>(statuses: impl IntoIterator<Item = &'a SignatureStatus>) -> Self {
        statuses
            .into_iter()
            .fold(SignatureCounts::default(), |mut acc, s| {
                acc.total += 1;
                match s {
                    SignatureStatus::Pending => acc.pending += 1,
                    SignatureStatus::Signed => acc.signed += 1,
                    SignatureStatus::Rejected => acc.rejected += 1,
                }
                acc
            })
    }

    pub fn from_roster(roster: &[SignerStatus]) -> Self {
        Self::from_statuses(roster.iter().map(|s| &s.status))
    }

    /// Status these counts imply. See [`derive_document_status`].
    pub fn status(&self) -> DocumentStatus {
        derive_document_status(self)
    }
}

/// Derive document status from ledger counts.
///
/// Priority: any rejection, then all signed, then some signed, else pending.
/// Never yields `Archived`.
pub fn derive_document_status(counts: &SignatureCounts) -> DocumentStatus {
    if counts.rejected > 0 {
        DocumentStatus::Rejected
    } else if counts.total > 0 && counts.signed == counts.total {
        DocumentStatus::Completed
    } else if counts.signed > 0 && counts.signed < counts.total {
        DocumentStatus::InProgress
    } else {
        DocumentStatus::Pending
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejection_wins_over_everything() {
        let counts = SignatureCounts::new(3, 1, 1, 1);
        assert_eq!(derive_document_status(&counts), DocumentStatus::Rejected);
        let counts = SignatureCounts::new(1, 0, 0, 1);
        assert_eq!(derive_document_status(&counts), DocumentStatus::Rejected);
    }

    #[test]
    fn all_signed_is_completed() {
        let counts = SignatureCounts::new(3, 3, 0, 0);
        assert_eq!(derive_document_status(&counts), DocumentStatus::Completed);
    }

    #[test]
    fn partially_signed_is_in_progress() {
        let counts = SignatureCounts::new(3, 1, 2, 0);
        assert_eq!(derive_document_status(&counts), DocumentStatus::InProgress);
    }

    #[test]
    fn nothing_signed_is_pending() {
        let counts = SignatureCounts::new(3, 0, 3, 0);
        assert_eq!(derive_document_status(&counts), DocumentStatus::Pending);
    }

    #[test]
    fn empty_ledger_is_pending() {
        assert_eq!(
            derive_document_status(&SignatureCounts::default()),
            DocumentStatus::Pending
        );
    }

    #[test]
    fn counts_from_statuses() {
        let statuses = [
            SignatureStatus::Signed,
            SignatureStatus::Pending,
            SignatureStatus::Rejected,
            SignatureStatus::Signed,
        ];
        let counts = SignatureCounts::from_statuses(statuses.iter());
        assert_eq!(counts, SignatureCounts::new(4, 2, 1, 1));
        assert_eq!(counts.status(), DocumentStatus::Rejected);
    }
}
