//! Error types module
//!
//! Every failure the capture workflow can hit is a variant of [`AppraisalError`].
//! None of them are fatal: the session boundary turns each one into a
//! [`SessionNotice`] for the user and the attempt can be retried by hand.

use std::fmt::{Display, Formatter, Result as FmtResult};
use std::time::Duration;

use serde::Serialize;

use crate::models::Permission;

/// Log level for error reporting
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    /// Debug level - for expected outcomes like validation failures or user cancellation
    Debug,
    /// Warning level - for recoverable device or data issues
    Warn,
    /// Error level - for unexpected failures
    Error,
}

/// Metadata describing how an error is presented to the appraiser
pub trait ErrorMetadata {
    /// Machine-readable error code (e.g., "LOCATION_UNAVAILABLE")
    fn error_code(&self) -> &'static str;

    /// Whether retrying the same action by hand can succeed
    fn is_recoverable(&self) -> bool;

    /// Suggested action for the user
    fn suggested_action(&self) -> Option<&'static str>;

    /// User-facing message (may differ from the internal error message)
    fn client_message(&self) -> String;

    /// Log level for this error
    fn log_level(&self) -> LogLevel;
}

/// Why no location fix could be produced
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LocationUnavailable {
    /// Neither a cached nor a fresh fix exists
    NoFix,
    /// The platform provider reported an error
    ProviderFailed(String),
    /// Acquisition did not finish within the configured bound
    TimedOut(Duration),
}

impl Display for LocationUnavailable {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            LocationUnavailable::NoFix => write!(f, "no location fix available"),
            LocationUnavailable::ProviderFailed(msg) => {
                write!(f, "location provider failed: {}", msg)
            }
            LocationUnavailable::TimedOut(timeout) => {
                write!(f, "location request timed out after {:?}", timeout)
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum AppraisalError {
    #[error("Permission denied: {0}")]
    PermissionDenied(Permission),

    #[error("Location unavailable: {0}")]
    LocationUnavailable(LocationUnavailable),

    #[error("Capture cancelled by user")]
    CaptureCancelled,

    #[error("Capture failed: {0}")]
    CaptureFailed(String),

    #[error("Validation failed: {0}")]
    ValidationFailed(String),

    #[error("Persistence rejected: {0}")]
    PersistenceRejected(String),

    #[error("Property coordinate already recorded")]
    PersistenceConflict,

    #[error("Transport failure: {0}")]
    TransportFailure(String),

    #[error("Cannot {action} while {state}")]
    InvalidTransition {
        state: &'static str,
        action: &'static str,
    },

    #[error("Session cancelled")]
    SessionCancelled,

    #[error("Configuration error: {0}")]
    Configuration(String),
}

impl From<validator::ValidationErrors> for AppraisalError {
    fn from(err: validator::ValidationErrors) -> Self {
        AppraisalError::ValidationFailed(err.to_string())
    }
}

impl From<LocationUnavailable> for AppraisalError {
    fn from(reason: LocationUnavailable) -> Self {
        AppraisalError::LocationUnavailable(reason)
    }
}

/// Static metadata for each variant: (error_code, recoverable, suggested_action, log_level).
fn appraisal_error_static_metadata(
    err: &AppraisalError,
) -> (&'static str, bool, Option<&'static str>, LogLevel) {
    match err {
        AppraisalError::PermissionDenied(_) => (
            "PERMISSION_DENIED",
            true,
            Some("Grant the permission in device settings and try again"),
            LogLevel::Warn,
        ),
        AppraisalError::LocationUnavailable(_) => (
            "LOCATION_UNAVAILABLE",
            true,
            Some("Move to open sky or enable location services and try again"),
            LogLevel::Warn,
        ),
        AppraisalError::CaptureCancelled => ("CAPTURE_CANCELLED", true, None, LogLevel::Debug),
        AppraisalError::CaptureFailed(_) => (
            "CAPTURE_FAILED",
            true,
            Some("Retake the photo"),
            LogLevel::Error,
        ),
        AppraisalError::ValidationFailed(_) => (
            "VALIDATION_FAILED",
            true,
            Some("Fill in the title and description"),
            LogLevel::Debug,
        ),
        AppraisalError::PersistenceRejected(_) => (
            "PERSISTENCE_REJECTED",
            false,
            Some("Check the collateral classification of this client"),
            LogLevel::Warn,
        ),
        AppraisalError::PersistenceConflict => (
            "PERSISTENCE_CONFLICT",
            false,
            None,
            LogLevel::Debug,
        ),
        AppraisalError::TransportFailure(_) => (
            "TRANSPORT_FAILURE",
            true,
            Some("Check the network connection and save again"),
            LogLevel::Error,
        ),
        AppraisalError::InvalidTransition { .. } => {
            ("INVALID_TRANSITION", false, None, LogLevel::Warn)
        }
        AppraisalError::SessionCancelled => ("SESSION_CANCELLED", false, None, LogLevel::Debug),
        AppraisalError::Configuration(_) => (
            "CONFIGURATION_ERROR",
            false,
            Some("Contact support"),
            LogLevel::Error,
        ),
    }
}

impl ErrorMetadata for AppraisalError {
    fn error_code(&self) -> &'static str {
        appraisal_error_static_metadata(self).0
    }

    fn is_recoverable(&self) -> bool {
        appraisal_error_static_metadata(self).1
    }

    fn suggested_action(&self) -> Option<&'static str> {
        appraisal_error_static_metadata(self).2
    }

    fn log_level(&self) -> LogLevel {
        appraisal_error_static_metadata(self).3
    }

    fn client_message(&self) -> String {
        match self {
            AppraisalError::PermissionDenied(permission) => {
                format!("{} permission is required", capitalize(&permission.to_string()))
            }
            AppraisalError::LocationUnavailable(_) => "Failed to get current location".to_string(),
            AppraisalError::CaptureCancelled => "Photo capture cancelled".to_string(),
            AppraisalError::CaptureFailed(_) => "Failed to capture photo".to_string(),
            AppraisalError::ValidationFailed(_) => {
                "Title and description are required".to_string()
            }
            AppraisalError::PersistenceRejected(ref msg) => msg.clone(),
            AppraisalError::PersistenceConflict => {
                "Property location was already recorded".to_string()
            }
            AppraisalError::TransportFailure(_) => "Failed to reach the database".to_string(),
            AppraisalError::InvalidTransition { .. } => "Action not available now".to_string(),
            AppraisalError::SessionCancelled => "Session closed".to_string(),
            AppraisalError::Configuration(_) => "Application is misconfigured".to_string(),
        }
    }
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Transient message shown to the user when an action fails
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionNotice {
    pub code: &'static str,
    pub message: String,
    pub suggested_action: Option<&'static str>,
    pub retryable: bool,
}

impl From<&AppraisalError> for SessionNotice {
    fn from(err: &AppraisalError) -> Self {
        SessionNotice {
            code: err.error_code(),
            message: err.client_message(),
            suggested_action: err.suggested_action(),
            retryable: err.is_recoverable(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_metadata_permission_denied() {
        let err = AppraisalError::PermissionDenied(Permission::Camera);
        assert_eq!(err.error_code(), "PERMISSION_DENIED");
        assert!(err.is_recoverable());
        assert_eq!(err.client_message(), "Camera permission is required");
        assert_eq!(err.log_level(), LogLevel::Warn);
    }

    #[test]
    fn test_error_metadata_transport_failure_hides_details() {
        let err = AppraisalError::TransportFailure("connection refused on 10.0.0.4".into());
        assert_eq!(err.error_code(), "TRANSPORT_FAILURE");
        assert_eq!(err.client_message(), "Failed to reach the database");
        assert_eq!(err.log_level(), LogLevel::Error);
        assert!(err.to_string().contains("10.0.0.4"));
    }

    #[test]
    fn test_location_timeout_message() {
        let err: AppraisalError =
            LocationUnavailable::TimedOut(Duration::from_secs(15)).into();
        assert!(err.to_string().contains("timed out after 15s"));
        assert_eq!(err.error_code(), "LOCATION_UNAVAILABLE");
    }

    #[test]
    fn test_notice_from_error() {
        let err = AppraisalError::ValidationFailed("title: must not be blank".into());
        let notice = SessionNotice::from(&err);
        assert_eq!(notice.code, "VALIDATION_FAILED");
        assert_eq!(notice.message, "Title and description are required");
        assert_eq!(
            notice.suggested_action,
            Some("Fill in the title and description")
        );
        assert!(notice.retryable);
    }

    #[test]
    fn test_invalid_transition_display() {
        let err = AppraisalError::InvalidTransition {
            state: "idle",
            action: "save",
        };
        assert_eq!(err.to_string(), "Cannot save while idle");
    }
}
