//! PostgreSQL repositories
//!
//! `appraisal/` holds the collateral photo and property coordinate writes plus the
//! read-only client directory queries.
//
// Appraisal repositories
pub mod appraisal;
//
// Transaction utilities
pub mod transaction;
//
pub use appraisal::{ClientRepository, CollateralRepository};
pub use transaction::TransactionGuard;
