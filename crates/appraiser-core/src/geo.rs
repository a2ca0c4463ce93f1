//! Great-circle distance and the walked-perimeter accumulator

use crate::models::LocationSample;

/// Mean Earth radius used by the haversine formula
pub const EARTH_RADIUS_METERS: f64 = 6_371_000.0;

/// Haversine distance in meters between two samples.
pub fn haversine_distance(a: &LocationSample, b: &LocationSample) -> f64 {
    let lat1 = a.latitude.to_radians();
    let lat2 = b.latitude.to_radians();
    let d_lat = lat2 - lat1;
    let d_lon = (b.longitude - a.longitude).to_radians();

    let h = (d_lat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (d_lon / 2.0).sin().powi(2);
    2.0 * EARTH_RADIUS_METERS * h.sqrt().min(1.0).asin()
}

/// Append `new_sample` to `history` and return the distance it adds.
///
/// The increment is measured only against the previous last sample, so feeding the
/// same sequence always reproduces the same running total.
pub fn add_sample(
    mut history: Vec<LocationSample>,
    new_sample: LocationSample,
) -> (Vec<LocationSample>, f64) {
    let delta = history
        .last()
        .map(|previous| haversine_distance(previous, &new_sample))
        .unwrap_or(0.0);
    history.push(new_sample);
    (history, delta)
}

/// Running total of the distance walked between photo captures
#[derive(Debug, Clone, Default)]
pub struct DistanceAccumulator {
    samples: Vec<LocationSample>,
    total_distance_meters: f64,
}

impl DistanceAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a capture-time sample and return the increment added to the total.
    pub fn record(&mut self, sample: LocationSample) -> f64 {
        let history = std::mem::take(&mut self.samples);
        let (history, delta) = add_sample(history, sample);
        self.samples = history;
        self.total_distance_meters += delta;
        delta
    }

    pub fn total_distance_meters(&self) -> f64 {
        self.total_distance_meters
    }

    pub fn samples(&self) -> &[LocationSample] {
        &self.samples
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use proptest::prelude::*;

    fn sample(lat: f64, lon: f64) -> LocationSample {
        LocationSample::new(lat, lon, Utc.with_ymd_and_hms(2025, 3, 1, 8, 0, 0).unwrap())
            .unwrap()
    }

    #[test]
    fn first_sample_adds_nothing() {
        let (history, delta) = add_sample(Vec::new(), sample(14.6, 120.98));
        assert_eq!(history.len(), 1);
        assert_eq!(delta, 0.0);
    }

    #[test]
    fn haversine_matches_known_distance() {
        // Roughly 55.6 m per 0.0005 degree of latitude, 53.8 m of longitude at 14.6 N.
        let d = haversine_distance(&sample(14.6000, 120.9800), &sample(14.6005, 120.9805));
        assert!((d - 77.37).abs() < 0.05, "got {}", d);
    }

    #[test]
    fn same_point_is_zero() {
        let p = sample(-33.86, 151.21);
        assert_eq!(haversine_distance(&p, &p), 0.0);
    }

    #[test]
    fn accumulator_adds_only_latest_increment() {
        let mut acc = DistanceAccumulator::new();
        let a = sample(14.6000, 120.9800);
        let b = sample(14.6005, 120.9805);
        let c = sample(14.6010, 120.9805);

        assert_eq!(acc.record(a), 0.0);
        let ab = acc.record(b);
        assert!((acc.total_distance_meters() - ab).abs() < 1e-9);

        let bc = acc.record(c);
        assert!((bc - haversine_distance(&b, &c)).abs() < 1e-9);
        assert!((acc.total_distance_meters() - (ab + bc)).abs() < 1e-9);
        assert_eq!(acc.len(), 3);
    }

    fn coordinate() -> impl Strategy<Value = (f64, f64)> {
        (-89.0f64..89.0, -179.0f64..179.0)
    }

    proptest! {
        #[test]
        fn total_equals_sum_of_consecutive_pairs(
            points in prop::collection::vec(coordinate(), 0..24)
        ) {
            let samples: Vec<LocationSample> =
                points.iter().map(|(lat, lon)| sample(*lat, *lon)).collect();

            let mut acc = DistanceAccumulator::new();
            for s in &samples {
                acc.record(*s);
            }

            let expected: f64 = samples
                .windows(2)
                .map(|pair| haversine_distance(&pair[0], &pair[1]))
                .sum();

            if samples.len() <= 1 {
                prop_assert_eq!(acc.total_distance_meters(), 0.0);
            }
            let error = (acc.total_distance_meters() - expected).abs();
            prop_assert!(error <= 1e-6 * expected.max(1.0));
        }

        #[test]
        fn replay_is_deterministic(points in prop::collection::vec(coordinate(), 1..16)) {
            let run = || {
                points.iter().fold((Vec::new(), 0.0), |(history, total), (lat, lon)| {
                    let (history, delta) = add_sample(history, sample(*lat, *lon));
                    (history, total + delta)
                })
            };
            let (h1, t1) = run();
            let (h2, t2) = run();
            prop_assert_eq!(h1.len(), h2.len());
            prop_assert_eq!(t1, t2);
        }
    }
}
