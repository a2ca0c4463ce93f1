mod coordinate;
mod directory;
mod photo;

use appraiser_core::models::{NewCollateralPhoto, PropertyCoordinateRecord};
use async_trait::async_trait;
use sqlx::PgPool;

use crate::store::{CollateralRecordStore, SaveOutcome, StoreResult};

pub use directory::ClientRepository;

pub(crate) const ZONAL_PHOTO_TABLE: &str = "apr_bir_zonal";
pub(crate) const ATTACHMENT_TABLE: &str = "apr_cm_attachment";
pub(crate) const PROPERTY_LOCATION_TABLE: &str = "apr_property_location";

/// Repository for collateral photos and property coordinates
#[derive(Clone)]
pub struct CollateralRepository {
    pool: PgPool,
}

impl CollateralRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CollateralRecordStore for CollateralRepository {
    async fn save_photo(&self, photo: &NewCollateralPhoto) -> StoreResult<SaveOutcome> {
        self.insert_photo(photo).await
    }

    async fn save_coordinate(
        &self,
        individual_id: &str,
        control_number: &str,
        employee_id: &str,
        latitude: Option<f64>,
        longitude: Option<f64>,
    ) -> StoreResult<SaveOutcome> {
        self.insert_coordinate_once(
            individual_id,
            control_number,
            employee_id,
            latitude,
            longitude,
        )
        .await
    }

    async fn find_coordinate(
        &self,
        individual_id: &str,
        control_number: &str,
    ) -> StoreResult<Option<PropertyCoordinateRecord>> {
        self.get_coordinate(individual_id, control_number).await
    }
}
