//! Best-effort device position

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use anyhow::Result;
use appraiser_core::{AppraiserConfig, LocationSample, LocationUnavailable};
use async_trait::async_trait;

/// Source of position fixes
#[async_trait]
pub trait LocationProvider: Send + Sync {
    /// The most recent fix the provider already holds, if any.
    async fn last_known(&self) -> Result<Option<LocationSample>>;

    /// Ask for a new high-accuracy fix.
    async fn request_fresh(&self) -> Result<Option<LocationSample>>;
}

/// Produces one location sample on demand
///
/// The cached fix is preferred; when there is none, or the cache query fails, a fresh
/// fix is requested. The whole acquisition is bounded by `timeout`.
#[derive(Clone)]
pub struct LocationSampler {
    provider: Arc<dyn LocationProvider>,
    timeout: Duration,
}

impl LocationSampler {
    pub fn new(provider: Arc<dyn LocationProvider>, timeout: Duration) -> Self {
        Self { provider, timeout }
    }

    pub fn from_config(provider: Arc<dyn LocationProvider>, config: &AppraiserConfig) -> Self {
        Self::new(provider, config.location_timeout())
    }

    pub async fn current_location(&self) -> Result<LocationSample, LocationUnavailable> {
        match tokio::time::timeout(self.timeout, self.acquire()).await {
            Ok(result) => result,
            Err(_) => {
                tracing::warn!(timeout = ?self.timeout, "Location request timed out");
                Err(LocationUnavailable::TimedOut(self.timeout))
            }
        }
    }

    async fn acquire(&self) -> Result<LocationSample, LocationUnavailable> {
        match self.provider.last_known().await {
            Ok(Some(sample)) => {
                tracing::debug!("Using last known location");
                return Ok(sample);
            }
            Ok(None) => tracing::debug!("No cached location, requesting a fresh fix"),
            Err(e) => tracing::warn!(error = %e, "Cached location query failed"),
        }

        match self.provider.request_fresh().await {
            Ok(Some(sample)) => Ok(sample),
            Ok(None) => Err(LocationUnavailable::NoFix),
            Err(e) => {
                tracing::warn!(error = %e, "Fresh location request failed");
                Err(LocationUnavailable::ProviderFailed(e.to_string()))
            }
        }
    }
}

/// Always reports the same fix, or never reports one
#[derive(Debug, Clone, Default)]
pub struct FixedLocationProvider {
    fix: Option<LocationSample>,
    delay: Option<Duration>,
}

impl FixedLocationProvider {
    pub fn new(sample: LocationSample) -> Self {
        Self {
            fix: Some(sample),
            delay: None,
        }
    }

    pub fn unavailable() -> Self {
        Self::default()
    }

    /// Hold every answer back by `delay`.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    async fn answer(&self) -> Result<Option<LocationSample>> {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        Ok(self.fix)
    }
}

#[async_trait]
impl LocationProvider for FixedLocationProvider {
    async fn last_known(&self) -> Result<Option<LocationSample>> {
        self.answer().await
    }

    async fn request_fresh(&self) -> Result<Option<LocationSample>> {
        self.answer().await
    }
}

/// Replays recorded fixes, one per fresh request
///
/// It never holds a cached fix, so every sample request advances the recording.
#[derive(Debug, Default)]
pub struct ReplayLocationProvider {
    fixes: Mutex<VecDeque<LocationSample>>,
}

impl ReplayLocationProvider {
    pub fn new(fixes: impl IntoIterator<Item = LocationSample>) -> Self {
        Self {
            fixes: Mutex::new(fixes.into_iter().collect()),
        }
    }

    pub fn remaining(&self) -> usize {
        self.lock().len()
    }

    fn lock(&self) -> MutexGuard<'_, VecDeque<LocationSample>> {
        self.fixes
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[async_trait]
impl LocationProvider for ReplayLocationProvider {
    async fn last_known(&self) -> Result<Option<LocationSample>> {
        Ok(None)
    }

    async fn request_fresh(&self) -> Result<Option<LocationSample>> {
        Ok(self.lock().pop_front())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn sample(lat: f64, lon: f64) -> LocationSample {
        LocationSample::now(lat, lon).unwrap()
    }

    struct CacheFailsProvider {
        fresh_requests: AtomicUsize,
    }

    #[async_trait]
    impl LocationProvider for CacheFailsProvider {
        async fn last_known(&self) -> Result<Option<LocationSample>> {
            anyhow::bail!("location cache unavailable")
        }

        async fn request_fresh(&self) -> Result<Option<LocationSample>> {
            self.fresh_requests.fetch_add(1, Ordering::SeqCst);
            Ok(Some(sample(14.6, 120.98)))
        }
    }

    struct BrokenProvider;

    #[async_trait]
    impl LocationProvider for BrokenProvider {
        async fn last_known(&self) -> Result<Option<LocationSample>> {
            Ok(None)
        }

        async fn request_fresh(&self) -> Result<Option<LocationSample>> {
            anyhow::bail!("gps disabled")
        }
    }

    #[tokio::test]
    async fn cached_fix_is_preferred() {
        let sampler = LocationSampler::new(
            Arc::new(FixedLocationProvider::new(sample(14.6, 120.98))),
            Duration::from_secs(1),
        );
        let fix = sampler.current_location().await.unwrap();
        assert_eq!(fix.latitude, 14.6);
    }

    #[tokio::test]
    async fn failed_cache_falls_through_to_fresh_request() {
        let provider = Arc::new(CacheFailsProvider {
            fresh_requests: AtomicUsize::new(0),
        });
        let sampler = LocationSampler::new(provider.clone(), Duration::from_secs(1));

        assert!(sampler.current_location().await.is_ok());
        assert_eq!(provider.fresh_requests.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn no_fix_anywhere_is_unavailable() {
        let sampler = LocationSampler::new(
            Arc::new(FixedLocationProvider::unavailable()),
            Duration::from_secs(1),
        );
        assert_eq!(
            sampler.current_location().await.unwrap_err(),
            LocationUnavailable::NoFix
        );
    }

    #[tokio::test]
    async fn provider_error_is_reported() {
        let sampler = LocationSampler::new(Arc::new(BrokenProvider), Duration::from_secs(1));
        assert_eq!(
            sampler.current_location().await.unwrap_err(),
            LocationUnavailable::ProviderFailed("gps disabled".to_string())
        );
    }

    #[tokio::test(start_paused = true)]
    async fn slow_provider_times_out() {
        let provider = FixedLocationProvider::new(sample(14.6, 120.98))
            .with_delay(Duration::from_secs(60));
        let sampler = LocationSampler::new(Arc::new(provider), Duration::from_secs(15));

        assert_eq!(
            sampler.current_location().await.unwrap_err(),
            LocationUnavailable::TimedOut(Duration::from_secs(15))
        );
    }

    #[tokio::test]
    async fn replay_advances_one_fix_per_request() {
        let provider = Arc::new(ReplayLocationProvider::new([
            sample(14.6, 120.98),
            sample(14.6005, 120.9805),
        ]));
        let sampler = LocationSampler::new(provider.clone(), Duration::from_secs(1));

        assert_eq!(sampler.current_location().await.unwrap().latitude, 14.6);
        assert_eq!(sampler.current_location().await.unwrap().latitude, 14.6005);
        assert_eq!(provider.remaining(), 0);
        assert_eq!(
            sampler.current_location().await.unwrap_err(),
            LocationUnavailable::NoFix
        );
    }
}
