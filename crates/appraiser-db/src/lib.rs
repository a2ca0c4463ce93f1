//! Appraiser persistence
//!
//! The [`CollateralRecordStore`] trait is what the capture session writes through.
//! [`CollateralRepository`] implements it on PostgreSQL; [`InMemoryCollateralStore`]
//! implements it without a database for tests and offline runs. Client listing and
//! collateral classification lookups live behind [`ClientDirectory`].

pub mod db;
pub mod memory;
pub mod setup;
pub mod store;

pub use db::{ClientRepository, CollateralRepository, TransactionGuard};
pub use memory::{InMemoryClientDirectory, InMemoryCollateralStore, StoredPhoto};
pub use setup::{migrate, setup_database};
pub use store::{ClientDirectory, CollateralRecordStore, SaveOutcome, StoreError, StoreResult};
