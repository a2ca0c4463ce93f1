//! In-memory store implementations
//!
//! These back the capture session in tests and offline runs. They follow the same
//! routing and idempotency rules as the PostgreSQL repositories and can be told to
//! fail or stall writes so error paths can be exercised.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use appraiser_core::models::{
    ClientRecord, CollateralClass, NewCollateralPhoto, PropertyCoordinateRecord,
};
use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};

use crate::store::{
    ClientDirectory, CollateralRecordStore, SaveOutcome, StoreError, StoreResult,
};

/// A photo row as held by [`InMemoryCollateralStore`]
#[derive(Debug, Clone, PartialEq)]
pub struct StoredPhoto {
    pub table: &'static str,
    pub individual_id: String,
    pub control_number: String,
    pub filename: String,
    pub title: String,
    pub description: String,
    pub extension: String,
    pub image_bytes: Bytes,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub stored_at: DateTime<Utc>,
}

#[derive(Default)]
struct StoreState {
    photos: Vec<StoredPhoto>,
    coordinates: HashMap<(String, String), PropertyCoordinateRecord>,
    failing_photo_writes: u32,
    failing_coordinate_writes: u32,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Collateral record store without a database
#[derive(Clone, Default)]
pub struct InMemoryCollateralStore {
    state: Arc<Mutex<StoreState>>,
    write_delay: Option<Duration>,
}

impl InMemoryCollateralStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Delay every write, to observe a session while it awaits persistence.
    pub fn with_write_delay(mut self, delay: Duration) -> Self {
        self.write_delay = Some(delay);
        self
    }

    /// Make the next `count` photo writes fail with a transport error.
    pub fn fail_next_photo_writes(&self, count: u32) {
        lock(&self.state).failing_photo_writes = count;
    }

    /// Make the next `count` coordinate writes fail with a transport error.
    pub fn fail_next_coordinate_writes(&self, count: u32) {
        lock(&self.state).failing_coordinate_writes = count;
    }

    pub fn photos(&self) -> Vec<StoredPhoto> {
        lock(&self.state).photos.clone()
    }

    pub fn photo_count(&self) -> usize {
        lock(&self.state).photos.len()
    }

    pub fn coordinate_count(&self) -> usize {
        lock(&self.state).coordinates.len()
    }

    async fn stall(&self) {
        if let Some(delay) = self.write_delay {
            tokio::time::sleep(delay).await;
        }
    }
}

fn injected_transport_failure(counter: &mut u32) -> Option<StoreError> {
    if *counter == 0 {
        return None;
    }
    *counter -= 1;
    Some(StoreError::Transport(sqlx::Error::PoolTimedOut))
}

#[async_trait]
impl CollateralRecordStore for InMemoryCollateralStore {
    async fn save_photo(&self, photo: &NewCollateralPhoto) -> StoreResult<SaveOutcome> {
        let table = match &photo.class {
            CollateralClass::Rem => "apr_bir_zonal",
            CollateralClass::Cm => "apr_cm_attachment",
            CollateralClass::Other(tag) => return Err(StoreError::UnsupportedClass(tag.clone())),
        };

        self.stall().await;

        let mut state = lock(&self.state);
        if let Some(err) = injected_transport_failure(&mut state.failing_photo_writes) {
            tracing::error!(error = %err, "Error saving collateral photo");
            return Err(err);
        }

        let (latitude, longitude) = match photo.class {
            CollateralClass::Rem => (photo.latitude, photo.longitude),
            _ => (None, None),
        };

        state.photos.push(StoredPhoto {
            table,
            individual_id: photo.individual_id.clone(),
            control_number: photo.control_number.clone(),
            filename: photo.filename.clone(),
            title: photo.title.clone(),
            description: photo.description.clone(),
            extension: photo.extension.clone(),
            image_bytes: photo.image_bytes.clone(),
            latitude,
            longitude,
            stored_at: Utc::now(),
        });

        Ok(SaveOutcome::Created)
    }

    async fn save_coordinate(
        &self,
        individual_id: &str,
        control_number: &str,
        employee_id: &str,
        latitude: Option<f64>,
        longitude: Option<f64>,
    ) -> StoreResult<SaveOutcome> {
        self.stall().await;

        let mut state = lock(&self.state);
        if let Some(err) = injected_transport_failure(&mut state.failing_coordinate_writes) {
            tracing::error!(error = %err, "Error saving property coordinate");
            return Err(err);
        }

        let key = (individual_id.to_string(), control_number.to_string());
        if state.coordinates.contains_key(&key) {
            tracing::debug!(individual_id, control_number, "Property coordinate already recorded");
            return Ok(SaveOutcome::AlreadyExists);
        }

        state.coordinates.insert(
            key,
            PropertyCoordinateRecord {
                individual_id: individual_id.to_string(),
                control_number: control_number.to_string(),
                employee_id: employee_id.to_string(),
                latitude,
                longitude,
            },
        );

        Ok(SaveOutcome::Created)
    }

    async fn find_coordinate(
        &self,
        individual_id: &str,
        control_number: &str,
    ) -> StoreResult<Option<PropertyCoordinateRecord>> {
        let key = (individual_id.to_string(), control_number.to_string());
        Ok(lock(&self.state).coordinates.get(&key).cloned())
    }
}

/// Client directory backed by fixed data
#[derive(Clone, Default)]
pub struct InMemoryClientDirectory {
    clients: Vec<(String, ClientRecord)>,
    classes: HashMap<String, CollateralClass>,
}

impl InMemoryClientDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_client(mut self, step_status: &str, client: ClientRecord) -> Self {
        self.clients.push((step_status.to_string(), client));
        self
    }

    pub fn with_class(mut self, control_number: &str, class: CollateralClass) -> Self {
        self.classes.insert(control_number.to_string(), class);
        self
    }
}

#[async_trait]
impl ClientDirectory for InMemoryClientDirectory {
    async fn list_clients(&self, step_status: &str) -> StoreResult<Vec<ClientRecord>> {
        let mut clients: Vec<ClientRecord> = self
            .clients
            .iter()
            .filter(|(status, _)| status == step_status)
            .map(|(_, client)| client.clone())
            .collect();
        clients.sort_by(|a, b| {
            a.full_name
                .cmp(&b.full_name)
                .then_with(|| a.individual_id.cmp(&b.individual_id))
        });
        Ok(clients)
    }

    async fn collateral_class(
        &self,
        control_number: &str,
    ) -> StoreResult<Option<CollateralClass>> {
        Ok(self.classes.get(control_number).cloned())
    }
}
