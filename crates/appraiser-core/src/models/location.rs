use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::AppraisalError;

/// A device position fix taken at a point in time
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawLocationSample")]
pub struct LocationSample {
    pub latitude: f64,
    pub longitude: f64,
    pub timestamp: DateTime<Utc>,
}

impl LocationSample {
    /// Create a sample, rejecting coordinates outside the WGS84 range.
    pub fn new(
        latitude: f64,
        longitude: f64,
        timestamp: DateTime<Utc>,
    ) -> Result<Self, AppraisalError> {
        if !latitude.is_finite() || !(-90.0..=90.0).contains(&latitude) {
            return Err(AppraisalError::ValidationFailed(format!(
                "latitude {} is outside [-90, 90]",
                latitude
            )));
        }
        if !longitude.is_finite() || !(-180.0..=180.0).contains(&longitude) {
            return Err(AppraisalError::ValidationFailed(format!(
                "longitude {} is outside [-180, 180]",
                longitude
            )));
        }

        Ok(Self {
            latitude,
            longitude,
            timestamp,
        })
    }

    pub fn now(latitude: f64, longitude: f64) -> Result<Self, AppraisalError> {
        Self::new(latitude, longitude, Utc::now())
    }
}

/// Unchecked wire form, range checked on the way into [`LocationSample`]
#[derive(Deserialize)]
struct RawLocationSample {
    latitude: f64,
    longitude: f64,
    timestamp: DateTime<Utc>,
}

impl TryFrom<RawLocationSample> for LocationSample {
    type Error = AppraisalError;

    fn try_from(raw: RawLocationSample) -> Result<Self, Self::Error> {
        Self::new(raw.latitude, raw.longitude, raw.timestamp)
    }
}
