//! Database repositories for the data access layer
//!
//! Postgres repositories each own a `PgPool` clone and cover one table or one
//! family of read queries. `InMemoryStore` implements the same traits over a
//! single mutex-guarded state for tests and embedded use.
//
// Repository traits consumed by the workflow engine
pub mod traits;
//
// Postgres repositories
pub mod audit;
pub mod document;
pub mod ledger;
pub mod listing;
pub mod user;
//
// In-memory implementation
pub mod memory;
//
// Transaction utilities
pub mod transaction;

pub use audit::AuditRepository;
pub use document::DocumentRepository;
pub use ledger::SignatureRepository;
pub use listing::ListingRepository;
pub use memory::InMemoryStore;
pub use traits::{DocumentStore, SignatureLedger, UserDirectory};
pub use transaction::TransactionGuard;
pub use user::UserRepository;
