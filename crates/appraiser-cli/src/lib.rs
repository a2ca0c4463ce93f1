use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use appraiser_capture::{
    CaptureDevices, FileImageSource, LocationSampler, PhotoCaptureSession,
    ReplayLocationProvider, SessionContext, StaticPermissions,
};
use appraiser_core::{
    AppraiserConfig, ClientRecord, CollateralClass, LocationSample, Permission, PhotoDetails,
    SessionNotice,
};
use appraiser_db::{
    setup_database, ClientDirectory, ClientRepository, CollateralRecordStore,
    CollateralRepository, InMemoryCollateralStore, SaveOutcome,
};
use serde::Serialize;
use tokio_util::sync::CancellationToken;

/// Truncate a string to max_len characters, appending "..." if truncated.
pub fn truncate_string(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}

/// Parse a `lat,lon` pair given on the command line.
pub fn parse_fix(raw: &str) -> Result<LocationSample> {
    let (lat, lon) = raw
        .split_once(',')
        .with_context(|| format!("Expected `lat,lon`, got `{}`", raw))?;
    let latitude: f64 = lat
        .trim()
        .parse()
        .with_context(|| format!("Invalid latitude `{}`", lat.trim()))?;
    let longitude: f64 = lon
        .trim()
        .parse()
        .with_context(|| format!("Invalid longitude `{}`", lon.trim()))?;
    Ok(LocationSample::now(latitude, longitude)?)
}

pub fn client_table_row(client: &ClientRecord) -> String {
    format!(
        "{:<12} {:<16} {}",
        truncate_string(&client.individual_id, 12),
        truncate_string(&client.control_number, 16),
        truncate_string(&client.full_name, 48)
    )
}

/// Outcome of one photo in a `capture` run
#[derive(Debug, Serialize)]
pub struct PhotoResult {
    pub index: usize,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filename: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub photo: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub coordinate: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notice: Option<SessionNotice>,
}

impl PhotoResult {
    pub fn failed(index: usize, title: &str, notice: Option<SessionNotice>) -> Self {
        Self {
            index,
            title: title.to_string(),
            filename: None,
            photo: None,
            coordinate: None,
            notice,
        }
    }

    pub fn saved(
        index: usize,
        title: &str,
        filename: String,
        photo: SaveOutcome,
        coordinate: Option<SaveOutcome>,
    ) -> Self {
        Self {
            index,
            title: title.to_string(),
            filename: Some(filename),
            photo: Some(photo.as_str()),
            coordinate: coordinate.map(|o| o.as_str()),
            notice: None,
        }
    }
}

/// Everything the `capture` command needs, already parsed
#[derive(Debug, Clone, Default)]
pub struct CaptureRequest {
    pub individual_id: String,
    pub control_number: String,
    pub employee_id: String,
    /// Looked up from the database when omitted, unless this is a dry run
    pub class: Option<String>,
    pub photos: Vec<PathBuf>,
    pub titles: Vec<String>,
    pub description: String,
    pub fixes: Vec<LocationSample>,
    pub property: Option<LocationSample>,
    pub no_location: bool,
    /// Keep writes in memory; no database is opened
    pub dry_run: bool,
}

#[derive(Debug, Serialize)]
pub struct CaptureSummary {
    pub session_id: String,
    pub class: String,
    pub total_distance_meters: f64,
    pub photos: Vec<PhotoResult>,
}

/// Run one capture session over the request's image files.
pub async fn run_capture(
    request: CaptureRequest,
    config: &AppraiserConfig,
    cancel: CancellationToken,
) -> Result<CaptureSummary> {
    if request.titles.len() != request.photos.len() {
        bail!(
            "Got {} photo(s) but {} title(s); pass one --title per --photo",
            request.photos.len(),
            request.titles.len()
        );
    }

    let (store, class) = open_store(&request, config).await?;

    let mut permissions = StaticPermissions::all_granted();
    if request.no_location {
        permissions = permissions.revoke(Permission::FineLocation);
    }
    let devices = CaptureDevices {
        location: LocationSampler::from_config(
            Arc::new(ReplayLocationProvider::new(request.fixes)),
            config,
        ),
        camera: Arc::new(FileImageSource::new(request.photos)),
        permissions: Arc::new(permissions),
    };
    let context = SessionContext {
        individual_id: request.individual_id,
        control_number: request.control_number,
        employee_id: request.employee_id,
        class,
    };

    let mut session =
        PhotoCaptureSession::new(context, store, devices).with_cancellation_token(cancel);
    if let Some(sample) = request.property {
        session.set_property_location(sample);
    }

    let photos = capture_photos(&mut session, &request.titles, &request.description).await?;

    Ok(CaptureSummary {
        session_id: session.id().to_string(),
        class: session.context().class.to_string(),
        total_distance_meters: session.total_distance_meters(),
        photos,
    })
}

async fn open_store(
    request: &CaptureRequest,
    config: &AppraiserConfig,
) -> Result<(Arc<dyn CollateralRecordStore>, CollateralClass)> {
    if request.dry_run {
        let class = request
            .class
            .as_deref()
            .map(CollateralClass::parse)
            .unwrap_or_else(CollateralClass::unknown);
        tracing::info!(collateral.class = %class, "Dry run, writes stay in memory");
        return Ok((Arc::new(InMemoryCollateralStore::new()), class));
    }

    let pool = setup_database(config, false).await?;
    let class = match request.class.as_deref() {
        Some(raw) => CollateralClass::parse(raw),
        None => ClientRepository::new(pool.clone())
            .collateral_class(&request.control_number)
            .await?
            .unwrap_or_else(CollateralClass::unknown),
    };
    Ok((Arc::new(CollateralRepository::new(pool)), class))
}

/// Capture and save one photo per title, in order.
///
/// A failed capture or save is recorded and the run moves on; a failed save drops
/// its photo first. Cancellation ends the run early.
pub async fn capture_photos(
    session: &mut PhotoCaptureSession,
    titles: &[String],
    description: &str,
) -> Result<Vec<PhotoResult>> {
    let mut results = Vec::with_capacity(titles.len());
    for (index, title) in titles.iter().enumerate() {
        session.set_details(PhotoDetails::new(title.as_str(), description));

        if session.capture().await.is_err() {
            results.push(PhotoResult::failed(index, title, session.take_notice()));
            if session.is_cancelled() {
                break;
            }
            continue;
        }

        match session.save().await {
            Ok(report) => results.push(PhotoResult::saved(
                index,
                title,
                report.filename,
                report.photo,
                report.coordinate,
            )),
            Err(_) => {
                results.push(PhotoResult::failed(index, title, session.take_notice()));
                if session.is_cancelled() {
                    break;
                }
                session.discard()?;
            }
        }
    }
    Ok(results)
}
