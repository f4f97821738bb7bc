//! Data models for the signature workflow
//!
//! Each sub-module represents one table or one read model built from joins.

mod audit;
mod document;
mod signature;
mod user;

pub use audit::*;
pub use document::*;
pub use signature::*;
pub use user::*;
