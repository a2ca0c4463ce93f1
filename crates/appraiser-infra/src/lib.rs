//! Appraiser Infrastructure Library
//!
//! Process-level plumbing shared by the appraiser binaries:
//! - Telemetry initialization

#[cfg(feature = "observability-basic")]
pub mod telemetry;
