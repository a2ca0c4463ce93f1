//! Persistence seams for the capture workflow
//!
//! Both traits are object safe so sessions can hold `Arc<dyn CollateralRecordStore>`
//! regardless of the backend.

use appraiser_core::models::{
    ClientRecord, CollateralClass, NewCollateralPhoto, PropertyCoordinateRecord,
};
use appraiser_core::AppraisalError;
use async_trait::async_trait;
use thiserror::Error;

/// What a successful write call did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveOutcome {
    /// A new row was written
    Created,
    /// A row for the same key was already present; nothing was written
    AlreadyExists,
}

impl SaveOutcome {
    /// Treat an existing row as a conflict.
    pub fn require_created(self) -> Result<(), AppraisalError> {
        match self {
            SaveOutcome::Created => Ok(()),
            SaveOutcome::AlreadyExists => Err(AppraisalError::PersistenceConflict),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SaveOutcome::Created => "created",
            SaveOutcome::AlreadyExists => "already_exists",
        }
    }
}

/// Store operation errors
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Unsupported collateral class: {0}")]
    UnsupportedClass(String),

    #[error("Insert into {0} affected no rows")]
    NoRowsAffected(&'static str),

    #[error("Database error: {0}")]
    Transport(#[from] sqlx::Error),
}

/// Result type for store operations
pub type StoreResult<T> = Result<T, StoreError>;

impl From<StoreError> for AppraisalError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::UnsupportedClass(tag) => AppraisalError::PersistenceRejected(format!(
                "Photos cannot be saved for collateral class '{}'",
                tag
            )),
            StoreError::NoRowsAffected(table) => {
                AppraisalError::PersistenceRejected(format!("Nothing was written to {}", table))
            }
            StoreError::Transport(e) => AppraisalError::TransportFailure(e.to_string()),
        }
    }
}

/// Downstream persistence for collateral photos and property coordinates
#[async_trait]
pub trait CollateralRecordStore: Send + Sync {
    /// Persist a photo row in the table matching its collateral class.
    ///
    /// `REM` photos go to the zonal table with their coordinates, `CM` photos to the
    /// attachment table without them. Any other class fails with
    /// [`StoreError::UnsupportedClass`] before anything is written.
    async fn save_photo(&self, photo: &NewCollateralPhoto) -> StoreResult<SaveOutcome>;

    /// Record the property coordinate unless one exists for the same client and
    /// control number, in which case nothing is written and `AlreadyExists` is returned.
    async fn save_coordinate(
        &self,
        individual_id: &str,
        control_number: &str,
        employee_id: &str,
        latitude: Option<f64>,
        longitude: Option<f64>,
    ) -> StoreResult<SaveOutcome>;

    async fn find_coordinate(
        &self,
        individual_id: &str,
        control_number: &str,
    ) -> StoreResult<Option<PropertyCoordinateRecord>>;
}

/// Read-only upstream queries: who is due for appraisal and what their collateral is
#[async_trait]
pub trait ClientDirectory: Send + Sync {
    /// Clients currently at the given workflow stage, ordered by name.
    async fn list_clients(&self, step_status: &str) -> StoreResult<Vec<ClientRecord>>;

    /// Collateral class registered for a control number, if any.
    async fn collateral_class(&self, control_number: &str)
        -> StoreResult<Option<CollateralClass>>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use appraiser_core::ErrorMetadata;

    #[test]
    fn already_exists_is_a_conflict_when_required() {
        assert!(SaveOutcome::Created.require_created().is_ok());
        assert_eq!(
            SaveOutcome::AlreadyExists.require_created(),
            Err(AppraisalError::PersistenceConflict)
        );
    }

    #[test]
    fn store_errors_map_to_taxonomy() {
        let rejected: AppraisalError = StoreError::UnsupportedClass("LAND".into()).into();
        assert_eq!(rejected.error_code(), "PERSISTENCE_REJECTED");
        assert!(rejected.client_message().contains("LAND"));

        let transport: AppraisalError = StoreError::Transport(sqlx::Error::PoolTimedOut).into();
        assert_eq!(transport.error_code(), "TRANSPORT_FAILURE");
    }

    #[test]
    fn outcome_tags() {
        assert_eq!(SaveOutcome::Created.as_str(), "created");
        assert_eq!(SaveOutcome::AlreadyExists.as_str(), "already_exists");
    }
}
