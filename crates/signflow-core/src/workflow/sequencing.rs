//! Sequencing guard
//!
//! A signer at position k > 1 may sign or reject only when the entry at
//! position k - 1 is `signed`. A rejection upstream blocks everyone after it.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::AppError;
use crate::models::{SignatureStatus, SignerStatus};

/// Outcome of a guard evaluation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SequenceCheck {
    pub allowed: bool,
    pub order_position: i32,
    pub blocking_signer_name: Option<String>,
    pub blocking_order_position: Option<i32>,
}

impl SequenceCheck {
    fn allowed(order_position: i32) -> Self {
        Self {
            allowed: true,
            order_position,
            blocking_signer_name: None,
            blocking_order_position: None,
        }
    }

    /// Convert a denial into the user-facing `OutOfOrder` error.
    pub fn into_result(self) -> Result<i32, AppError> {
        if self.allowed {
            return Ok(self.order_position);
        }
        Err(AppError::OutOfOrder {
            signer_name: self
                .blocking_signer_name
                .unwrap_or_else(|| "the previous signer".to_string()),
            order_position: self
                .blocking_order_position
                .unwrap_or(self.order_position - 1),
        })
    }
}

/// Evaluate whether `signer_id` may act on a document with the given roster.
///
/// Fails with `NotAssigned` when the signer has no roster entry. When several
/// entries share the predecessor position the first one in roster order decides.
pub fn check_sequence(roster: &[SignerStatus], signer_id: Uuid) -> Result<SequenceCheck, AppError> {
    let me = roster
        .iter()
        .find(|s| s.user_id == signer_id)
        .ok_or(AppError::NotAssigned)?;

    if me.order_position <= 1 {
        return Ok(SequenceCheck::allowed(me.order_position));
    }

    let previous_position = me.order_position - 1;
    let previous = roster
        .iter()
        .find(|s| s.order_position == previous_position);

    match previous {
        Some(prev) if prev.status == SignatureStatus::Signed => {
            Ok(SequenceCheck::allowed(me.order_position))
        }
        Some(prev) => Ok(SequenceCheck {
            allowed: false,
            order_position: me.order_position,
            blocking_signer_name: Some(prev.name.clone()),
            blocking_order_position: Some(prev.order_position),
        }),
        // A gap in positions cannot be verified, so the signer stays blocked.
        None => Ok(SequenceCheck {
            allowed: false,
            order_position: me.order_position,
            blocking_signer_name: None,
            blocking_order_position: Some(previous_position),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn signer(name: &str, pos: i32, status: SignatureStatus) -> SignerStatus {
        SignerStatus {
            user_id: Uuid::new_v4(),
            name: name.to_string(),
            email: format!("{}@example.com", name.to_lowercase()),
            order_position: pos,
            status,
            signed_at: None,
            rejected_at: None,
        }
    }

    #[test]
    fn first_signer_always_allowed() {
        let a = signer("A", 1, SignatureStatus::Pending);
        let id = a.user_id;
        let check = check_sequence(&[a], id).unwrap();
        assert!(check.allowed);
        assert_eq!(check.order_position, 1);
    }

    #[test]
    fn unassigned_signer_fails() {
        let a = signer("A", 1, SignatureStatus::Pending);
        let err = check_sequence(&[a], Uuid::new_v4()).unwrap_err();
        assert!(matches!(err, AppError::NotAssigned));
    }

    #[test]
    fn blocked_until_previous_signed() {
        let a = signer("Ana", 1, SignatureStatus::Pending);
        let b = signer("Bruno", 2, SignatureStatus::Pending);
        let b_id = b.user_id;
        let check = check_sequence(&[a, b], b_id).unwrap();
        assert!(!check.allowed);
        assert_eq!(check.blocking_signer_name.as_deref(), Some("Ana"));
        assert_eq!(check.blocking_order_position, Some(1));

        match check.into_result() {
            Err(AppError::OutOfOrder {
                signer_name,
                order_position,
            }) => {
                assert_eq!(signer_name, "Ana");
                assert_eq!(order_position, 1);
            }
            other => panic!("expected OutOfOrder, got {:?}", other),
        }
    }

    #[test]
    fn allowed_after_previous_signed() {
        let a = signer("Ana", 1, SignatureStatus::Signed);
        let b = signer("Bruno", 2, SignatureStatus::Pending);
        let b_id = b.user_id;
        assert!(check_sequence(&[a, b], b_id).unwrap().allowed);
    }

    #[test]
    fn rejection_does_not_unblock_next_signer() {
        let a = signer("Ana", 1, SignatureStatus::Signed);
        let b = signer("Bruno", 2, SignatureStatus::Rejected);
        let c = signer("Carla", 3, SignatureStatus::Pending);
        let c_id = c.user_id;
        let check = check_sequence(&[a, b, c], c_id).unwrap();
        assert!(!check.allowed);
        assert_eq!(check.blocking_signer_name.as_deref(), Some("Bruno"));
    }

    #[test]
    fn only_immediate_predecessor_is_checked() {
        let a = signer("Ana", 1, SignatureStatus::Pending);
        let b = signer("Bruno", 2, SignatureStatus::Signed);
        let c = signer("Carla", 3, SignatureStatus::Pending);
        let c_id = c.user_id;
        assert!(check_sequence(&[a, b, c], c_id).unwrap().allowed);
    }

    #[test]
    fn gap_in_positions_blocks() {
        let a = signer("Ana", 1, SignatureStatus::Signed);
        let c = signer("Carla", 3, SignatureStatus::Pending);
        let c_id = c.user_id;
        let check = check_sequence(&[a, c], c_id).unwrap();
        assert!(!check.allowed);
        assert_eq!(check.blocking_signer_name, None);
        assert_eq!(check.blocking_order_position, Some(2));
    }
}
