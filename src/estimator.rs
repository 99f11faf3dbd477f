//! Heuristic stress estimation
//!
//! Maps a heart rate to a stress probability using a banded base score,
//! per-band uniform jitter and Gaussian noise, then classifies the result
//! against a threshold. The caller supplies the random source so runs can be
//! reproduced with a seeded RNG.

use crate::config::EstimatorConfig;
use crate::types::{HrRecord, Sample, StressEstimate, StressStatus};
use rand::Rng;
use rand_distr::StandardNormal;

/// Stress estimator configured with a default threshold and noise level
#[derive(Debug, Clone)]
pub struct StressEstimator {
    config: EstimatorConfig,
}

impl Default for StressEstimator {
    fn default() -> Self {
        Self::new(EstimatorConfig::default())
    }
}

impl StressEstimator {
    pub fn new(config: EstimatorConfig) -> Self {
        Self { config }
    }

    /// Estimate stress using the configured threshold
    pub fn estimate<R: Rng + ?Sized>(&self, hr: i32, rng: &mut R) -> StressEstimate {
        self.estimate_with_threshold(hr, self.config.threshold, rng)
    }

    /// Estimate stress against an explicit threshold
    pub fn estimate_with_threshold<R: Rng + ?Sized>(
        &self,
        hr: i32,
        threshold: f64,
        rng: &mut R,
    ) -> StressEstimate {
        let base = base_probability(hr, rng);
        let z: f64 = rng.sample(StandardNormal);
        let stress_probability = (base + z * self.config.noise_sigma).clamp(0.0, 1.0);
        let is_stress = stress_probability >= threshold;

        StressEstimate {
            hr,
            stress_probability,
            is_stress,
            threshold,
            status: if is_stress {
                StressStatus::Stress
            } else {
                StressStatus::Normal
            },
        }
    }

    /// Estimate every value in order
    pub fn estimate_batch<R: Rng + ?Sized>(
        &self,
        hr_values: &[i32],
        threshold: Option<f64>,
        rng: &mut R,
    ) -> Vec<StressEstimate> {
        let threshold = threshold.unwrap_or(self.config.threshold);
        hr_values
            .iter()
            .map(|&hr| self.estimate_with_threshold(hr, threshold, rng))
            .collect()
    }

    /// Score timestamped records, producing samples in the same order
    pub fn annotate<R: Rng + ?Sized>(
        &self,
        records: &[HrRecord],
        threshold: Option<f64>,
        rng: &mut R,
    ) -> Vec<Sample> {
        let threshold = threshold.unwrap_or(self.config.threshold);
        records
            .iter()
            .map(|record| {
                let estimate = self.estimate_with_threshold(record.hr, threshold, rng);
                Sample::from_estimate(record.timestamp, &estimate)
            })
            .collect()
    }
}

/// Banded base probability before Gaussian noise.
///
/// Bradycardic rates (< 60) score high deterministically; every other band
/// adds a uniform jitter whose width depends on the band.
pub fn base_probability<R: Rng + ?Sized>(hr: i32, rng: &mut R) -> f64 {
    let hr_f = f64::from(hr);
    if hr < 60 {
        0.6 + (60.0 - hr_f) * 0.01
    } else if hr <= 70 {
        0.05 + rng.gen_range(0.0..0.15)
    } else if hr <= 90 {
        0.1 + rng.gen_range(0.0..0.25)
    } else if hr <= 110 {
        0.3 + (hr_f - 90.0) * 0.015 + rng.gen_range(0.0..0.3)
    } else if hr <= 130 {
        0.5 + (hr_f - 110.0) * 0.02 + rng.gen_range(0.0..0.2)
    } else {
        0.7 + ((hr_f - 130.0) * 0.01).min(0.25) + rng.gen_range(0.0..0.15)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_probability_bounded_and_consistent() {
        let estimator = StressEstimator::default();
        let mut rng = StdRng::seed_from_u64(42);

        for hr in 50..=150 {
            for step in 0..=10 {
                let threshold = step as f64 / 10.0;
                let est = estimator.estimate_with_threshold(hr, threshold, &mut rng);
                assert!((0.0..=1.0).contains(&est.stress_probability));
                assert_eq!(est.is_stress, est.stress_probability >= threshold);
                assert_eq!(est.status == StressStatus::Stress, est.is_stress);
                assert_eq!(est.hr, hr);
                assert_eq!(est.threshold, threshold);
            }
        }
    }

    #[test]
    fn test_low_hr_band_dominates() {
        let mut rng = StdRng::seed_from_u64(1);
        let base = base_probability(59, &mut rng);
        assert!(base >= 0.6);
        assert!((base - 0.61).abs() < 1e-9);

        // Deterministic band draws nothing from the RNG
        assert!((base_probability(40, &mut rng) - 0.8).abs() < 1e-9);
    }

    #[test]
    fn test_band_ranges() {
        let mut rng = StdRng::seed_from_u64(9);
        for _ in 0..200 {
            let b = base_probability(65, &mut rng);
            assert!((0.05..0.20).contains(&b));

            let b = base_probability(80, &mut rng);
            assert!((0.10..0.35).contains(&b));

            let b = base_probability(100, &mut rng);
            assert!((0.45..0.75).contains(&b));

            let b = base_probability(120, &mut rng);
            assert!((0.70..0.90).contains(&b));

            // Capped tachycardia bonus: 0.7 + 0.25 + U(0, 0.15)
            let b = base_probability(200, &mut rng);
            assert!((0.95..1.10).contains(&b));
        }
    }

    #[test]
    fn test_band_edges_are_inclusive_above() {
        let mut rng = StdRng::seed_from_u64(3);
        for _ in 0..100 {
            // 70 still belongs to the low-normal band
            assert!(base_probability(70, &mut rng) < 0.20);
            // 90 belongs to the normal band, not the elevated one
            assert!(base_probability(90, &mut rng) < 0.35);
        }
    }

    #[test]
    fn test_seeded_estimates_are_reproducible() {
        let estimator = StressEstimator::default();
        let mut a = StdRng::seed_from_u64(77);
        let mut b = StdRng::seed_from_u64(77);

        let first = estimator.estimate_batch(&[55, 72, 95, 118, 140], None, &mut a);
        let second = estimator.estimate_batch(&[55, 72, 95, 118, 140], None, &mut b);
        assert_eq!(first, second);
        assert!(first.iter().all(|e| e.threshold == 0.35));
    }

    #[test]
    fn test_zero_noise_low_hr_is_exact() {
        let estimator = StressEstimator::new(EstimatorConfig {
            threshold: 0.35,
            noise_sigma: 0.0,
        });
        let mut rng = StdRng::seed_from_u64(5);
        let est = estimator.estimate(50, &mut rng);
        assert!((est.stress_probability - 0.7).abs() < 1e-9);
        assert!(est.is_stress);
    }

    #[test]
    fn test_annotate_preserves_order_and_timestamps() {
        let estimator = StressEstimator::default();
        let mut rng = StdRng::seed_from_u64(11);
        let records = vec![
            HrRecord {
                timestamp: Utc.with_ymd_and_hms(2024, 1, 15, 9, 0, 0).unwrap(),
                hr: 72,
            },
            HrRecord {
                timestamp: Utc.with_ymd_and_hms(2024, 1, 15, 9, 0, 1).unwrap(),
                hr: 128,
            },
        ];

        let samples = estimator.annotate(&records, Some(0.9), &mut rng);
        assert_eq!(samples.len(), 2);
        assert_eq!(samples[0].timestamp, records[0].timestamp);
        assert_eq!(samples[1].heart_rate, 128);
        for s in &samples {
            assert_eq!(s.is_stress, s.stress_probability >= 0.9);
        }
    }
}
