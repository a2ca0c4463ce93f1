use std::fmt::{Display, Formatter, Result as FmtResult};

use serde::{Deserialize, Serialize};

/// Device capabilities the capture workflow needs the user to have granted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Permission {
    Camera,
    FineLocation,
}

impl Display for Permission {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            Permission::Camera => write!(f, "camera"),
            Permission::FineLocation => write!(f, "fine location"),
        }
    }
}
