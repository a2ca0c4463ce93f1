use bytes::Bytes;
use chrono::{DateTime, Local, NaiveDate, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError};

use crate::models::{CollateralClass, LocationSample};

const MAX_TITLE_LENGTH: u64 = 255;
const MAX_DESCRIPTION_LENGTH: u64 = 2000;

/// Title and description typed by the appraiser before taking a photo
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, Validate)]
pub struct PhotoDetails {
    #[validate(
        length(max = MAX_TITLE_LENGTH, message = "Title must be at most 255 characters"),
        custom(function = "not_blank")
    )]
    pub title: String,
    #[validate(
        length(
            max = MAX_DESCRIPTION_LENGTH,
            message = "Description must be at most 2000 characters"
        ),
        custom(function = "not_blank")
    )]
    pub description: String,
}

fn not_blank(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::new("blank").with_message("must not be blank".into()));
    }
    Ok(())
}

impl PhotoDetails {
    pub fn new(title: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            description: description.into(),
        }
    }

    /// Cheap pre-check mirroring the validator rules, used to gate the capture action.
    pub fn is_complete(&self) -> bool {
        !self.title.trim().is_empty()
            && !self.description.trim().is_empty()
            && self.title.chars().count() as u64 <= MAX_TITLE_LENGTH
            && self.description.chars().count() as u64 <= MAX_DESCRIPTION_LENGTH
    }

    pub fn clear(&mut self) {
        self.title.clear();
        self.description.clear();
    }
}

/// A successful camera capture held in session memory until it is saved or discarded
#[derive(Debug, Clone)]
pub struct PhotoCaptureEvent {
    pub title: String,
    pub description: String,
    pub image_bytes: Bytes,
    pub extension: String,
    pub associated_location: Option<LocationSample>,
    /// Position of this capture within the session, starting at 0
    pub sequence_index: u32,
    pub captured_at: DateTime<Utc>,
}

impl PhotoCaptureEvent {
    /// Calendar day of the capture on the device clock, used in filenames.
    pub fn local_capture_date(&self) -> NaiveDate {
        self.capture_date_in(&Local)
    }

    pub fn capture_date_in<Tz: TimeZone>(&self, tz: &Tz) -> NaiveDate {
        self.captured_at.with_timezone(tz).date_naive()
    }
}

/// Write model for a collateral photo row
#[derive(Debug, Clone)]
pub struct NewCollateralPhoto {
    pub class: CollateralClass,
    pub individual_id: String,
    pub control_number: String,
    pub filename: String,
    pub title: String,
    pub description: String,
    pub extension: String,
    pub image_bytes: Bytes,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_fields_fail_validation() {
        let details = PhotoDetails::new("", "x");
        assert!(details.validate().is_err());
        assert!(!details.is_complete());

        let details = PhotoDetails::new("Front gate", "   ");
        assert!(details.validate().is_err());
        assert!(!details.is_complete());
    }

    #[test]
    fn complete_details_pass() {
        let details = PhotoDetails::new("Front gate", "North-facing entrance");
        assert!(details.validate().is_ok());
        assert!(details.is_complete());
    }

    #[test]
    fn overlong_title_is_rejected() {
        let details = PhotoDetails::new("t".repeat(256), "ok");
        assert!(details.validate().is_err());
        assert!(!details.is_complete());
    }

    #[test]
    fn length_limits_match_the_completeness_check() {
        let at_limit = PhotoDetails::new(
            "t".repeat(MAX_TITLE_LENGTH as usize),
            "d".repeat(MAX_DESCRIPTION_LENGTH as usize),
        );
        assert!(at_limit.validate().is_ok());
        assert!(at_limit.is_complete());

        let long_description =
            PhotoDetails::new("ok", "d".repeat(MAX_DESCRIPTION_LENGTH as usize + 1));
        assert!(long_description.validate().is_err());
        assert!(!long_description.is_complete());
    }

    #[test]
    fn capture_date_follows_the_local_offset() {
        let event = PhotoCaptureEvent {
            title: "Front gate".to_string(),
            description: "North".to_string(),
            image_bytes: Bytes::from_static(b"jpeg"),
            extension: "jpg".to_string(),
            associated_location: None,
            sequence_index: 0,
            captured_at: Utc.with_ymd_and_hms(2025, 3, 6, 23, 30, 0).unwrap(),
        };
        let manila = chrono::FixedOffset::east_opt(8 * 3600).unwrap();

        assert_eq!(
            event.capture_date_in(&manila),
            NaiveDate::from_ymd_opt(2025, 3, 7).unwrap()
        );
        assert_eq!(
            event.capture_date_in(&Utc),
            NaiveDate::from_ymd_opt(2025, 3, 6).unwrap()
        );
    }

    #[test]
    fn clear_empties_both_fields() {
        let mut details = PhotoDetails::new("a", "b");
        details.clear();
        assert_eq!(details, PhotoDetails::default());
    }
}
