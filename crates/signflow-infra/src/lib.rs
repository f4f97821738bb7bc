//! Signflow Infrastructure Library
//!
//! Shared plumbing for binaries built on Signflow:
//! - Telemetry initialization (tracing subscriber, pretty or JSON output)
//! - Error reporting (log level from error metadata, serializable error body)

pub mod error;
pub mod telemetry;

pub use error::{log_error, ErrorResponse};
pub use telemetry::{init_telemetry, shutdown_telemetry};
