use serde::{Deserialize, Serialize};

/// A client whose collateral is being appraised, as listed by the client directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct ClientRecord {
    pub individual_id: String,
    pub control_number: String,
    pub full_name: String,
}

impl ClientRecord {
    pub fn new(
        individual_id: impl Into<String>,
        control_number: impl Into<String>,
        full_name: impl Into<String>,
    ) -> Self {
        Self {
            individual_id: individual_id.into(),
            control_number: control_number.into(),
            full_name: full_name.into(),
        }
    }
}
