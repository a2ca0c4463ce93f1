use appraiser_core::models::{CollateralClass, NewCollateralPhoto};
use sqlx::Postgres;

use super::{CollateralRepository, ATTACHMENT_TABLE, ZONAL_PHOTO_TABLE};
use crate::store::{SaveOutcome, StoreError, StoreResult};

impl CollateralRepository {
    /// Insert a photo into the table for its collateral class
    #[tracing::instrument(
        skip(self, photo),
        fields(
            db.operation = "insert",
            collateral.class = %photo.class,
            photo.filename = %photo.filename,
            photo.bytes = photo.image_bytes.len()
        )
    )]
    pub(crate) async fn insert_photo(
        &self,
        photo: &NewCollateralPhoto,
    ) -> StoreResult<SaveOutcome> {
        let (table, result) = match &photo.class {
            CollateralClass::Rem => {
                let result = sqlx::query::<Postgres>(
                    r#"
                    INSERT INTO apr_bir_zonal (
                        iiid, control_no, filename, title, description, ext, image_data,
                        latitude, longitude
                    ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
                    "#,
                )
                .bind(&photo.individual_id)
                .bind(&photo.control_number)
                .bind(&photo.filename)
                .bind(&photo.title)
                .bind(&photo.description)
                .bind(&photo.extension)
                .bind(&photo.image_bytes[..])
                .bind(photo.latitude)
                .bind(photo.longitude)
                .execute(&self.pool)
                .await;
                (ZONAL_PHOTO_TABLE, result)
            }
            CollateralClass::Cm => {
                let result = sqlx::query::<Postgres>(
                    r#"
                    INSERT INTO apr_cm_attachment (
                        iiid, control_no, filename, title, description, ext, image_data
                    ) VALUES ($1, $2, $3, $4, $5, $6, $7)
                    "#,
                )
                .bind(&photo.individual_id)
                .bind(&photo.control_number)
                .bind(&photo.filename)
                .bind(&photo.title)
                .bind(&photo.description)
                .bind(&photo.extension)
                .bind(&photo.image_bytes[..])
                .execute(&self.pool)
                .await;
                (ATTACHMENT_TABLE, result)
            }
            CollateralClass::Other(tag) => {
                tracing::warn!(
                    class = %tag,
                    "Refusing to save photo for unsupported collateral class"
                );
                return Err(StoreError::UnsupportedClass(tag.clone()));
            }
        };

        let rows = result
            .map_err(|e| {
                tracing::error!(error = %e, db.table = table, "Error saving collateral photo");
                StoreError::Transport(e)
            })?
            .rows_affected();

        if rows == 0 {
            return Err(StoreError::NoRowsAffected(table));
        }

        tracing::debug!(db.table = table, "Collateral photo saved");
        Ok(SaveOutcome::Created)
    }

    /// Number of stored photos for a client case in the table of the given class
    #[tracing::instrument(skip(self), fields(db.operation = "select"))]
    pub async fn count_photos(
        &self,
        class: &CollateralClass,
        individual_id: &str,
        control_number: &str,
    ) -> StoreResult<i64> {
        let sql = match class {
            CollateralClass::Rem => {
                "SELECT COUNT(*) FROM apr_bir_zonal WHERE iiid = $1 AND control_no = $2"
            }
            CollateralClass::Cm => {
                "SELECT COUNT(*) FROM apr_cm_attachment WHERE iiid = $1 AND control_no = $2"
            }
            CollateralClass::Other(tag) => return Err(StoreError::UnsupportedClass(tag.clone())),
        };

        let count = sqlx::query_scalar::<Postgres, i64>(sql)
            .bind(individual_id)
            .bind(control_number)
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }
}
