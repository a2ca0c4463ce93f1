use serde::{Deserialize, Serialize};

/// The single surveyed position of a client's property
///
/// At most one row exists per `(individual_id, control_number)`. Missing coordinates
/// are stored as NULL rather than zero.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct PropertyCoordinateRecord {
    pub individual_id: String,
    pub control_number: String,
    pub employee_id: String,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
}
