//! Appraiser Core Library
//!
//! Domain models, the error taxonomy, configuration, geodesy and filename rules shared
//! by every appraiser component.

pub mod config;
pub mod error;
pub mod geo;
pub mod models;
pub mod naming;

// Re-export commonly used types
pub use config::{AppraiserConfig, LogFormat};
pub use error::{AppraisalError, ErrorMetadata, LocationUnavailable, LogLevel, SessionNotice};
pub use geo::{add_sample, haversine_distance, DistanceAccumulator, EARTH_RADIUS_METERS};
pub use models::{
    ClientRecord, CollateralClass, LocationSample, NewCollateralPhoto, Permission,
    PhotoCaptureEvent, PhotoDetails, PropertyCoordinateRecord,
};
pub use naming::{derive_photo_filename, extension_for_content_type, normalize_extension};
