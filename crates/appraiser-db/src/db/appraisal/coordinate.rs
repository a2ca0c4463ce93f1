use appraiser_core::models::PropertyCoordinateRecord;
use sqlx::Postgres;

use super::{CollateralRepository, PROPERTY_LOCATION_TABLE};
use crate::db::TransactionGuard;
use crate::store::{SaveOutcome, StoreError, StoreResult};

impl CollateralRepository {
    /// Insert the property coordinate unless the case already has one
    ///
    /// The existence check and the insert share one transaction. A unique violation
    /// from a concurrent insert is reported the same way as a row found by the check.
    #[tracing::instrument(
        skip(self),
        fields(db.table = "apr_property_location", db.operation = "insert")
    )]
    pub(crate) async fn insert_coordinate_once(
        &self,
        individual_id: &str,
        control_number: &str,
        employee_id: &str,
        latitude: Option<f64>,
        longitude: Option<f64>,
    ) -> StoreResult<SaveOutcome> {
        let result = self
            .try_insert_coordinate(individual_id, control_number, employee_id, latitude, longitude)
            .await;

        match result {
            Err(StoreError::Transport(sqlx::Error::Database(db_err)))
                if db_err.is_unique_violation() =>
            {
                tracing::debug!("Property coordinate inserted concurrently; treating as existing");
                Ok(SaveOutcome::AlreadyExists)
            }
            Err(StoreError::Transport(e)) => {
                tracing::error!(error = %e, "Error saving property coordinate");
                Err(StoreError::Transport(e))
            }
            other => other,
        }
    }

    async fn try_insert_coordinate(
        &self,
        individual_id: &str,
        control_number: &str,
        employee_id: &str,
        latitude: Option<f64>,
        longitude: Option<f64>,
    ) -> StoreResult<SaveOutcome> {
        let mut tx = TransactionGuard::begin(&self.pool, "save_property_coordinate").await?;

        let exists = sqlx::query_scalar::<Postgres, bool>(
            r#"
            SELECT EXISTS(
                SELECT 1 FROM apr_property_location WHERE iiid = $1 AND control_no = $2
            )
            "#,
        )
        .bind(individual_id)
        .bind(control_number)
        .fetch_one(tx.conn())
        .await?;

        if exists {
            tx.rollback().await?;
            tracing::debug!(
                individual_id,
                control_number,
                "Property coordinate already recorded"
            );
            return Ok(SaveOutcome::AlreadyExists);
        }

        // NULL coordinates stay NULL; they are never coerced to 0.0.
        let rows = sqlx::query::<Postgres>(
            r#"
            INSERT INTO apr_property_location (iiid, control_no, employee_id, latitude, longitude)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(individual_id)
        .bind(control_number)
        .bind(employee_id)
        .bind(latitude)
        .bind(longitude)
        .execute(tx.conn())
        .await?
        .rows_affected();

        if rows == 0 {
            tx.rollback().await?;
            return Err(StoreError::NoRowsAffected(PROPERTY_LOCATION_TABLE));
        }

        tx.commit().await?;
        tracing::info!(individual_id, control_number, "Property coordinate recorded");
        Ok(SaveOutcome::Created)
    }

    /// Get the recorded property coordinate for a case
    #[tracing::instrument(
        skip(self),
        fields(db.table = "apr_property_location", db.operation = "select")
    )]
    pub(crate) async fn get_coordinate(
        &self,
        individual_id: &str,
        control_number: &str,
    ) -> StoreResult<Option<PropertyCoordinateRecord>> {
        let record = sqlx::query_as::<Postgres, PropertyCoordinateRecord>(
            r#"
            SELECT iiid AS individual_id, control_no AS control_number, employee_id,
                   latitude, longitude
            FROM apr_property_location
            WHERE iiid = $1 AND control_no = $2
            "#,
        )
        .bind(individual_id)
        .bind(control_number)
        .fetch_optional(&self.pool)
        .await?;

        Ok(record)
    }
}
