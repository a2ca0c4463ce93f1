use std::fmt::{Display, Formatter, Result as FmtResult};

use serde::{Deserialize, Serialize};

/// Collateral classification tag
///
/// Decides which table a photo is written to and whether the walked perimeter is
/// tracked. Tags other than `REM` and `CM` are kept verbatim so they can be reported,
/// but the record store refuses to persist photos for them.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum CollateralClass {
    /// Real Estate Mortgage
    Rem,
    /// Chattel Mortgage
    Cm,
    Other(String),
}

impl CollateralClass {
    /// Tag used when the upstream lookup has no row for a control number.
    pub const UNKNOWN: &'static str = "Unknown";

    pub fn parse(raw: &str) -> Self {
        let trimmed = raw.trim();
        match trimmed.to_uppercase().as_str() {
            "REM" => CollateralClass::Rem,
            "CM" => CollateralClass::Cm,
            _ => CollateralClass::Other(trimmed.to_string()),
        }
    }

    pub fn unknown() -> Self {
        CollateralClass::Other(Self::UNKNOWN.to_string())
    }

    pub fn tag(&self) -> &str {
        match self {
            CollateralClass::Rem => "REM",
            CollateralClass::Cm => "CM",
            CollateralClass::Other(tag) => tag,
        }
    }

    /// Only real-estate collateral has its perimeter walked and a property coordinate.
    pub fn tracks_perimeter(&self) -> bool {
        matches!(self, CollateralClass::Rem)
    }

    /// Photos of this class are never taken without a location fix.
    pub fn requires_geotag(&self) -> bool {
        self.tracks_perimeter()
    }

    pub fn is_persistable(&self) -> bool {
        matches!(self, CollateralClass::Rem | CollateralClass::Cm)
    }
}

impl From<String> for CollateralClass {
    fn from(value: String) -> Self {
        CollateralClass::parse(&value)
    }
}

impl From<&str> for CollateralClass {
    fn from(value: &str) -> Self {
        CollateralClass::parse(value)
    }
}

impl From<CollateralClass> for String {
    fn from(value: CollateralClass) -> Self {
        value.tag().to_string()
    }
}

impl Display for CollateralClass {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(f, "{}", self.tag())
    }
}
