use std::collections::HashSet;

use uuid::Uuid;

use crate::error::AppError;

pub const MAX_SIGNERS_PER_DOCUMENT: usize = 50;

/// Caller-side check on a rejection reason. The engine only requires the
/// reason to be present; the minimum length is a convention of the layer above.
pub fn validate_rejection_reason(reason: &str, min_len: usize) -> Result<(), AppError> {
    let trimmed = reason.trim();
    if trimmed.is_empty() {
        return Err(AppError::InvalidInput(
            "A rejection reason is required".to_string(),
        ));
    }
    if trimmed.chars().count() < min_len {
        return Err(AppError::InvalidInput(format!(
            "Rejection reason must be at least {} characters",
            min_len
        )));
    }
    Ok(())
}

/// Reject empty, oversized or duplicated signer lists.
pub fn validate_signer_ids(user_ids: &[Uuid]) -> Result<(), AppError> {
    if user_ids.is_empty() {
        return Err(AppError::InvalidInput(
            "At least one signer is required".to_string(),
        ));
    }
    if user_ids.len() > MAX_SIGNERS_PER_DOCUMENT {
        return Err(AppError::InvalidInput(format!(
            "A document may have at most {} signers",
            MAX_SIGNERS_PER_DOCUMENT
        )));
    }
    let mut seen = HashSet::with_capacity(user_ids.len());
    if !user_ids.iter().all(|id| seen.insert(*id)) {
        return Err(AppError::InvalidInput(
            "Signer list contains duplicates".to_string(),
        ));
    }
    Ok(())
}
