//! Error reporting for binaries
//!
//! Turns an [`AppError`] into a log line at the level its metadata asks for and
//! into a serializable body a caller can print or return.

use serde::Serialize;
use signflow_core::{AppError, ErrorMetadata, LogLevel};

/// Serializable error body
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_type: Option<String>,
    /// Machine-readable error code, e.g. `OUT_OF_ORDER`
    pub code: String,
    pub recoverable: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggested_action: Option<String>,
}

impl ErrorResponse {
    /// Details and the error type are hidden in production and for sensitive errors.
    pub fn from_error(error: &AppError, is_production: bool) -> Self {
        let expose = !is_production && !error.is_sensitive();
        Self {
            error: error.client_message(),
            details: expose.then(|| error.detailed_message()),
            error_type: expose.then(|| error.error_type().to_string()),
            code: error.error_code().to_string(),
            recoverable: error.is_recoverable(),
            suggested_action: error.suggested_action().map(String::from),
        }
    }

    /// Process exit code for command-line callers
    pub fn exit_code(error: &AppError) -> i32 {
        match error.http_status_code() {
            400..=499 => 2,
            _ => 1,
        }
    }
}

pub fn log_error(error: &AppError) {
    let error_type = error.error_type();
    match error.log_level() {
        LogLevel::Debug => {
            tracing::debug!(error = %error, error_type = error_type, "Operation failed");
        }
        LogLevel::Warn => {
            tracing::warn!(error = %error, error_type = error_type, "Operation failed");
        }
        LogLevel::Error => {
            tracing::error!(error = %error, error_type = error_type, "Operation failed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn out_of_order_body_names_blocking_signer() {
        let err = AppError::OutOfOrder {
            signer_name: "Ana".to_string(),
            order_position: 1,
        };
        let body = ErrorResponse::from_error(&err, false);

        assert_eq!(body.code, "OUT_OF_ORDER");
        assert!(body.error.contains("Ana"));
        assert_eq!(body.error_type.as_deref(), Some("OutOfOrder"));
        assert_eq!(ErrorResponse::exit_code(&err), 2);
    }

    #[test]
    fn production_hides_details() {
        let err = AppError::NotAssigned;
        let body = ErrorResponse::from_error(&err, true);
        assert!(body.details.is_none());

        let json = serde_json::to_value(&body).unwrap();
        assert!(json.get("details").is_none());
        assert_eq!(json["code"], "NOT_ASSIGNED");
    }

    #[test]
    fn sensitive_errors_hide_details() {
        let err = AppError::Internal("pool exhausted".to_string());
        let body = ErrorResponse::from_error(&err, false);
        assert!(body.details.is_none());
        assert_eq!(ErrorResponse::exit_code(&err), 1);
    }
}
