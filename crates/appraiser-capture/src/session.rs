//! The capture state machine
//!
//! A session moves `Idle -> AwaitingLocation -> Capturing -> Captured` on
//! [`PhotoCaptureSession::capture`] and back to `Idle` on a successful
//! [`PhotoCaptureSession::save`] or on [`PhotoCaptureSession::discard`]. Any failure
//! before `Captured` drops the attempt and returns to `Idle`; a failed save keeps the
//! captured photo and the form so the appraiser can try again.
//!
//! Every device or database await races the session's cancellation token. Once the
//! token fires the in-flight step is abandoned and every later call fails with
//! [`AppraisalError::SessionCancelled`].

use std::future::Future;
use std::sync::Arc;

use appraiser_core::{
    derive_photo_filename, AppraisalError, CollateralClass, DistanceAccumulator,
    ErrorMetadata, LocationSample, LogLevel, NewCollateralPhoto, Permission,
    PhotoCaptureEvent, PhotoDetails, SessionNotice,
};
use appraiser_db::{CollateralRecordStore, SaveOutcome};
use chrono::Utc;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;
use validator::Validate;

use crate::camera::ImageSource;
use crate::location::LocationSampler;
use crate::permissions::PermissionGate;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    AwaitingLocation,
    Capturing,
    Captured,
}

impl SessionState {
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionState::Idle => "idle",
            SessionState::AwaitingLocation => "awaiting location",
            SessionState::Capturing => "capturing",
            SessionState::Captured => "captured",
        }
    }
}

/// Who and what is being appraised
#[derive(Debug, Clone)]
pub struct SessionContext {
    pub individual_id: String,
    pub control_number: String,
    /// Acting appraiser, recorded with the property coordinate
    pub employee_id: String,
    pub class: CollateralClass,
}

/// Device capabilities the session drives
#[derive(Clone)]
pub struct CaptureDevices {
    pub location: LocationSampler,
    pub camera: Arc<dyn ImageSource>,
    pub permissions: Arc<dyn PermissionGate>,
}

/// Result of a successful save
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SaveReport {
    pub filename: String,
    pub photo: SaveOutcome,
    /// `None` when the class has no property coordinate
    pub coordinate: Option<SaveOutcome>,
}

pub struct PhotoCaptureSession {
    id: Uuid,
    context: SessionContext,
    store: Arc<dyn CollateralRecordStore>,
    devices: CaptureDevices,
    state: SessionState,
    details: PhotoDetails,
    captured: Option<PhotoCaptureEvent>,
    // Set once the photo row is written, so a retried save only redoes the coordinate.
    persisted_photo: Option<SaveOutcome>,
    accumulator: DistanceAccumulator,
    property_location: Option<LocationSample>,
    captures_taken: u32,
    notice: Option<SessionNotice>,
    cancel: CancellationToken,
}

impl PhotoCaptureSession {
    pub fn new(
        context: SessionContext,
        store: Arc<dyn CollateralRecordStore>,
        devices: CaptureDevices,
    ) -> Self {
        let id = Uuid::new_v4();
        tracing::info!(
            session.id = %id,
            individual_id = %context.individual_id,
            control_number = %context.control_number,
            collateral.class = %context.class,
            "Capture session started"
        );

        Self {
            id,
            context,
            store,
            devices,
            state: SessionState::Idle,
            details: PhotoDetails::default(),
            captured: None,
            persisted_photo: None,
            accumulator: DistanceAccumulator::new(),
            property_location: None,
            captures_taken: 0,
            notice: None,
            cancel: CancellationToken::new(),
        }
    }

    /// Share an externally owned token, e.g. one cancelled on process shutdown.
    pub fn with_cancellation_token(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn context(&self) -> &SessionContext {
        &self.context
    }

    pub fn details(&self) -> &PhotoDetails {
        &self.details
    }

    pub fn set_title(&mut self, title: impl Into<String>) {
        self.details.title = title.into();
    }

    pub fn set_description(&mut self, description: impl Into<String>) {
        self.details.description = description.into();
    }

    pub fn set_details(&mut self, details: PhotoDetails) {
        self.details = details;
    }

    /// Whether the capture action should be offered right now.
    pub fn can_capture(&self) -> bool {
        self.state == SessionState::Idle && self.details.is_complete() && !self.is_cancelled()
    }

    pub fn captured(&self) -> Option<&PhotoCaptureEvent> {
        self.captured.as_ref()
    }

    pub fn accumulator(&self) -> &DistanceAccumulator {
        &self.accumulator
    }

    pub fn total_distance_meters(&self) -> f64 {
        self.accumulator.total_distance_meters()
    }

    pub fn property_location(&self) -> Option<LocationSample> {
        self.property_location
    }

    /// Notice left by the most recent failed action, cleared by the next success.
    pub fn notice(&self) -> Option<&SessionNotice> {
        self.notice.as_ref()
    }

    pub fn take_notice(&mut self) -> Option<SessionNotice> {
        self.notice.take()
    }

    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    pub fn set_property_location(&mut self, sample: LocationSample) {
        self.property_location = Some(sample);
    }

    /// Sample the device position and record it as the property location.
    #[tracing::instrument(skip(self), fields(session.id = %self.id))]
    pub async fn capture_property_location(&mut self) -> Result<LocationSample, AppraisalError> {
        let result = self.try_capture_property_location().await;
        self.settle(result)
    }

    async fn try_capture_property_location(&mut self) -> Result<LocationSample, AppraisalError> {
        self.ensure_open()?;
        self.require_permission(Permission::FineLocation)?;

        let sample = self
            .until_cancelled(self.devices.location.current_location())
            .await??;
        self.property_location = Some(sample);
        tracing::info!(
            latitude = sample.latitude,
            longitude = sample.longitude,
            "Property location set"
        );
        Ok(sample)
    }

    /// Take one photo.
    ///
    /// Requires a complete form and the camera permission. `REM` collateral also needs
    /// the location permission and a fix; other classes attach a fix when one can be
    /// had. On success the session is `Captured` and, for `REM`, the capture position
    /// has been added to the walked distance.
    #[tracing::instrument(
        skip(self),
        fields(session.id = %self.id, collateral.class = %self.context.class)
    )]
    pub async fn capture(&mut self) -> Result<PhotoCaptureEvent, AppraisalError> {
        let result = self.try_capture().await;
        self.settle(result)
    }

    async fn try_capture(&mut self) -> Result<PhotoCaptureEvent, AppraisalError> {
        self.ensure_open()?;
        self.ensure_state(SessionState::Idle, "capture")?;
        self.details.validate()?;

        self.require_permission(Permission::Camera)?;
        let geotag = self.context.class.requires_geotag();
        if geotag {
            self.require_permission(Permission::FineLocation)?;
        }

        self.state = SessionState::AwaitingLocation;
        let result = self.run_capture(geotag).await;
        if result.is_err() {
            self.state = SessionState::Idle;
        }
        result
    }

    async fn run_capture(&mut self, geotag: bool) -> Result<PhotoCaptureEvent, AppraisalError> {
        let location = self.sample_capture_location(geotag).await?;

        self.state = SessionState::Capturing;
        let image = match self.until_cancelled(self.devices.camera.acquire()).await? {
            Ok(Some(image)) => image,
            Ok(None) => return Err(AppraisalError::CaptureCancelled),
            Err(e) => return Err(AppraisalError::CaptureFailed(format!("{:#}", e))),
        };
        if image.bytes.is_empty() {
            return Err(AppraisalError::CaptureFailed(
                "camera returned an empty image".to_string(),
            ));
        }

        let event = PhotoCaptureEvent {
            title: self.details.title.clone(),
            description: self.details.description.clone(),
            image_bytes: image.bytes,
            extension: image.extension,
            associated_location: location,
            sequence_index: self.captures_taken,
            captured_at: Utc::now(),
        };
        self.captures_taken += 1;

        if self.context.class.tracks_perimeter() {
            if let Some(sample) = location {
                let delta = self.accumulator.record(sample);
                tracing::debug!(
                    delta_meters = delta,
                    total_meters = self.accumulator.total_distance_meters(),
                    "Walked distance updated"
                );
            }
        }

        self.captured = Some(event.clone());
        self.persisted_photo = None;
        self.state = SessionState::Captured;
        tracing::info!(
            sequence_index = event.sequence_index,
            bytes = event.image_bytes.len(),
            "Photo captured"
        );
        Ok(event)
    }

    async fn sample_capture_location(
        &self,
        required: bool,
    ) -> Result<Option<LocationSample>, AppraisalError> {
        if !required && !self.devices.permissions.is_granted(Permission::FineLocation) {
            return Ok(None);
        }

        match self
            .until_cancelled(self.devices.location.current_location())
            .await?
        {
            Ok(sample) => Ok(Some(sample)),
            Err(reason) if required => Err(reason.into()),
            Err(reason) => {
                tracing::debug!(%reason, "Capturing without a location");
                Ok(None)
            }
        }
    }

    /// Persist the captured photo and, for `REM`, the property coordinate.
    ///
    /// The form is validated again first. On success the session returns to `Idle`
    /// with the form and captured photo cleared; on failure nothing changes.
    #[tracing::instrument(
        skip(self),
        fields(session.id = %self.id, collateral.class = %self.context.class)
    )]
    pub async fn save(&mut self) -> Result<SaveReport, AppraisalError> {
        let result = self.try_save().await;
        self.settle(result)
    }

    async fn try_save(&mut self) -> Result<SaveReport, AppraisalError> {
        self.ensure_open()?;
        self.ensure_state(SessionState::Captured, "save")?;
        self.details.validate()?;

        let Some(event) = self.captured.as_ref() else {
            return Err(AppraisalError::InvalidTransition {
                state: self.state.as_str(),
                action: "save",
            });
        };

        let filename = derive_photo_filename(
            &self.context.individual_id,
            &self.context.class,
            event.local_capture_date(),
            &self.details.title,
            &event.extension,
        );
        let capture_fix = event.associated_location;

        let photo_outcome = match self.persisted_photo {
            Some(outcome) => {
                tracing::debug!("Photo already persisted, retrying remaining writes");
                outcome
            }
            None => {
                let photo = NewCollateralPhoto {
                    class: self.context.class.clone(),
                    individual_id: self.context.individual_id.clone(),
                    control_number: self.context.control_number.clone(),
                    filename: filename.clone(),
                    title: self.details.title.trim().to_string(),
                    description: self.details.description.trim().to_string(),
                    extension: event.extension.clone(),
                    image_bytes: event.image_bytes.clone(),
                    latitude: event.associated_location.map(|l| l.latitude),
                    longitude: event.associated_location.map(|l| l.longitude),
                };
                let outcome = self.until_cancelled(self.store.save_photo(&photo)).await??;
                self.persisted_photo = Some(outcome);
                outcome
            }
        };

        let coordinate_outcome = if self.context.class.tracks_perimeter() {
            Some(self.save_property_coordinate(capture_fix).await?)
        } else {
            None
        };

        let report = SaveReport {
            filename,
            photo: photo_outcome,
            coordinate: coordinate_outcome,
        };

        self.details.clear();
        self.captured = None;
        self.persisted_photo = None;
        self.state = SessionState::Idle;
        tracing::info!(
            filename = %report.filename,
            coordinate = report.coordinate.map(|o| o.as_str()),
            "Photo saved"
        );
        Ok(report)
    }

    /// Without a property location the fix taken with this photo is written instead;
    /// the row is insert-once per case.
    async fn save_property_coordinate(
        &self,
        capture_fix: Option<LocationSample>,
    ) -> Result<SaveOutcome, AppraisalError> {
        let position = match (self.property_location, capture_fix) {
            (Some(property), _) => Some(property),
            (None, Some(fix)) => {
                tracing::info!("No property location set, using the capture position");
                Some(fix)
            }
            (None, None) => {
                tracing::warn!("No position available, coordinate will be stored empty");
                None
            }
        };
        let latitude = position.map(|l| l.latitude);
        let longitude = position.map(|l| l.longitude);

        let outcome = self
            .until_cancelled(self.store.save_coordinate(
                &self.context.individual_id,
                &self.context.control_number,
                &self.context.employee_id,
                latitude,
                longitude,
            ))
            .await??;

        if outcome == SaveOutcome::AlreadyExists {
            tracing::info!("Property coordinate already recorded for this case");
        }
        Ok(outcome)
    }

    /// Drop the captured photo without saving it. The form and walked distance stay.
    pub fn discard(&mut self) -> Result<(), AppraisalError> {
        let result = self.try_discard();
        self.settle(result)
    }

    fn try_discard(&mut self) -> Result<(), AppraisalError> {
        self.ensure_open()?;
        self.ensure_state(SessionState::Captured, "discard")?;
        self.captured = None;
        self.persisted_photo = None;
        self.state = SessionState::Idle;
        tracing::debug!(session.id = %self.id, "Captured photo discarded");
        Ok(())
    }

    fn ensure_open(&self) -> Result<(), AppraisalError> {
        if self.is_cancelled() {
            return Err(AppraisalError::SessionCancelled);
        }
        Ok(())
    }

    fn ensure_state(
        &self,
        expected: SessionState,
        action: &'static str,
    ) -> Result<(), AppraisalError> {
        if self.state != expected {
            return Err(AppraisalError::InvalidTransition {
                state: self.state.as_str(),
                action,
            });
        }
        Ok(())
    }

    fn require_permission(&self, permission: Permission) -> Result<(), AppraisalError> {
        if !self.devices.permissions.is_granted(permission) {
            return Err(AppraisalError::PermissionDenied(permission));
        }
        Ok(())
    }

    async fn until_cancelled<F: Future>(&self, future: F) -> Result<F::Output, AppraisalError> {
        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => Err(AppraisalError::SessionCancelled),
            output = future => Ok(output),
        }
    }

    fn settle<T>(&mut self, result: Result<T, AppraisalError>) -> Result<T, AppraisalError> {
        match &result {
            Ok(_) => self.notice = None,
            Err(err) => {
                let code = err.error_code();
                match err.log_level() {
                    LogLevel::Debug => {
                        tracing::debug!(error = %err, code, "Session action failed")
                    }
                    LogLevel::Warn => tracing::warn!(error = %err, code, "Session action failed"),
                    LogLevel::Error => {
                        tracing::error!(error = %err, code, "Session action failed")
                    }
                }
                self.notice = Some(SessionNotice::from(err));
            }
        }
        result
    }
}
