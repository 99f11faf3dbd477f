//! Configuration
//!
//! All tunables of the monitor live in one serde-backed tree. Every section
//! has defaults matching the demo deployment, so a partial JSON file only
//! needs to name what it overrides.

use crate::error::PulseError;
use crate::types::WorkerProfile;
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;
use std::time::Duration;

/// Default stress classification threshold
pub const DEFAULT_THRESHOLD: f64 = 0.35;
/// Simulated heart-rate ranges must lie within this band
pub const HR_CONFIG_LIMITS: (i32, i32) = (0, 300);
/// Largest accepted `simulation.noise_level`
pub const MAX_NOISE_LEVEL: i32 = 100;
/// Longest accepted tick interval, in seconds
pub const MAX_UPDATE_INTERVAL_SECS: f64 = 3600.0;

/// Stress estimator settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EstimatorConfig {
    /// Probability at or above which a sample counts as stress
    pub threshold: f64,
    /// Standard deviation of the Gaussian noise added to every probability
    pub noise_sigma: f64,
}

impl Default for EstimatorConfig {
    fn default() -> Self {
        Self {
            threshold: DEFAULT_THRESHOLD,
            noise_sigma: 0.1,
        }
    }
}

/// Heart-rate simulator settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    /// Inclusive range a worker's resting heart rate is drawn from
    pub hr_base_range: (i32, i32),
    /// Inclusive range of target heart rates while stressed
    pub hr_stress_range: (i32, i32),
    /// Symmetric integer noise added to every target
    pub noise_level: i32,
    /// Per-tick chance of entering the stress regime
    pub stress_probability: f64,
    /// Inclusive range of stress episode lengths, in ticks
    pub stress_duration: (u64, u64),
    /// Optional RNG seed for reproducible runs
    pub seed: Option<u64>,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            hr_base_range: (70, 90),
            hr_stress_range: (90, 130),
            noise_level: 5,
            stress_probability: 0.15,
            stress_duration: (5, 20),
            seed: None,
        }
    }
}

impl SimulationConfig {
    /// Random source for a run: seeded when `seed` is set, entropy otherwise
    pub fn make_rng(&self) -> StdRng {
        match self.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        }
    }
}

/// Live monitor settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DashboardConfig {
    /// Seconds between simulation ticks
    pub update_interval_secs: f64,
    /// Samples retained per worker
    pub max_data_points: usize,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            update_interval_secs: 1.0,
            max_data_points: 100,
        }
    }
}

/// Uploaded file settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UploadConfig {
    pub required_columns: Vec<String>,
    /// chrono formats tried in order before the permissive fallback
    pub timestamp_formats: Vec<String>,
    /// Lowest plausible heart rate (inclusive)
    pub hr_min: f64,
    /// Highest plausible heart rate (inclusive)
    pub hr_max: f64,
    pub max_file_size_mb: u64,
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            required_columns: vec!["timestamp".to_string(), "HR".to_string()],
            timestamp_formats: vec![
                "%Y-%m-%d %H:%M:%S".to_string(),
                "%Y/%m/%d %H:%M:%S".to_string(),
                "%d/%m/%Y %H:%M:%S".to_string(),
                "%Y-%m-%d %H:%M:%S%.f".to_string(),
            ],
            hr_min: 30.0,
            hr_max: 200.0,
            max_file_size_mb: 50,
        }
    }
}

impl UploadConfig {
    pub fn max_file_size_bytes(&self) -> u64 {
        self.max_file_size_mb.saturating_mul(1024 * 1024)
    }
}

impl DashboardConfig {
    /// Tick interval as a `Duration`, falling back to one second when the
    /// configured value is not representable
    pub fn update_interval(&self) -> Duration {
        Duration::try_from_secs_f64(self.update_interval_secs).unwrap_or(Duration::from_secs(1))
    }
}

/// Root configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitorConfig {
    pub estimator: EstimatorConfig,
    pub simulation: SimulationConfig,
    pub dashboard: DashboardConfig,
    pub upload: UploadConfig,
    pub workers: Vec<WorkerProfile>,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            estimator: EstimatorConfig::default(),
            simulation: SimulationConfig::default(),
            dashboard: DashboardConfig::default(),
            upload: UploadConfig::default(),
            workers: default_workers(),
        }
    }
}

/// The four demo workers
pub fn default_workers() -> Vec<WorkerProfile> {
    vec![
        WorkerProfile::new("worker_1", "Worker A", "#1f77b4"),
        WorkerProfile::new("worker_2", "Worker B", "#ff7f0e"),
        WorkerProfile::new("worker_3", "Worker C", "#2ca02c"),
        WorkerProfile::new("worker_4", "Worker D", "#d62728"),
    ]
}

impl MonitorConfig {
    /// Load configuration from JSON and validate it
    pub fn from_json(json: &str) -> Result<Self, PulseError> {
        let config: MonitorConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a JSON file
    pub fn from_path(path: &Path) -> Result<Self, PulseError> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }

    /// Serialize configuration to pretty JSON
    pub fn to_json(&self) -> Result<String, PulseError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Check every section
    pub fn validate(&self) -> Result<(), PulseError> {
        self.estimator.validate()?;
        self.simulation.validate()?;
        self.dashboard.validate()?;
        self.upload.validate()?;

        if self.workers.is_empty() {
            return Err(invalid("at least one worker is required"));
        }
        let mut seen = HashSet::new();
        for worker in &self.workers {
            if !seen.insert(worker.id.as_str()) {
                return Err(invalid(&format!("duplicate worker id '{}'", worker.id)));
            }
        }
        Ok(())
    }
}

impl EstimatorConfig {
    pub fn validate(&self) -> Result<(), PulseError> {
        if !(0.0..=1.0).contains(&self.threshold) {
            return Err(invalid("estimator.threshold must be within [0, 1]"));
        }
        if !self.noise_sigma.is_finite() || self.noise_sigma < 0.0 {
            return Err(invalid("estimator.noise_sigma must be a non-negative number"));
        }
        Ok(())
    }
}

impl SimulationConfig {
    pub fn validate(&self) -> Result<(), PulseError> {
        check_hr_range("simulation.hr_base_range", self.hr_base_range)?;
        check_hr_range("simulation.hr_stress_range", self.hr_stress_range)?;
        if !(0..=MAX_NOISE_LEVEL).contains(&self.noise_level) {
            return Err(invalid(&format!(
                "simulation.noise_level must be within [0, {MAX_NOISE_LEVEL}]"
            )));
        }
        if !(0.0..=1.0).contains(&self.stress_probability) {
            return Err(invalid("simulation.stress_probability must be within [0, 1]"));
        }
        let (dur_lo, dur_hi) = self.stress_duration;
        if dur_lo > dur_hi {
            return Err(invalid("simulation.stress_duration is empty"));
        }
        Ok(())
    }
}

impl DashboardConfig {
    pub fn validate(&self) -> Result<(), PulseError> {
        let secs = self.update_interval_secs;
        if !(secs > 0.0 && secs <= MAX_UPDATE_INTERVAL_SECS) {
            return Err(invalid(&format!(
                "dashboard.update_interval_secs must be within (0, {MAX_UPDATE_INTERVAL_SECS}]"
            )));
        }
        if self.max_data_points == 0 {
            return Err(invalid("dashboard.max_data_points must be positive"));
        }
        Ok(())
    }
}

impl UploadConfig {
    pub fn validate(&self) -> Result<(), PulseError> {
        if !self.hr_min.is_finite() || !self.hr_max.is_finite() {
            return Err(invalid("upload.hr_min and upload.hr_max must be finite"));
        }
        if self.hr_min > self.hr_max {
            return Err(invalid("upload.hr_min exceeds upload.hr_max"));
        }
        for column in ["timestamp", "HR"] {
            if !self.required_columns.iter().any(|c| c == column) {
                return Err(invalid(&format!(
                    "upload.required_columns must include '{column}'"
                )));
            }
        }
        Ok(())
    }
}

fn check_hr_range(name: &str, (lo, hi): (i32, i32)) -> Result<(), PulseError> {
    let (min, max) = HR_CONFIG_LIMITS;
    if lo > hi {
        return Err(invalid(&format!("{name} is empty")));
    }
    if lo < min || hi > max {
        return Err(invalid(&format!("{name} must lie within [{min}, {max}]")));
    }
    Ok(())
}

fn invalid(msg: &str) -> PulseError {
    PulseError::InvalidConfig(msg.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_defaults_are_valid() {
        let config = MonitorConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.workers.len(), 4);
        assert_eq!(config.estimator.threshold, 0.35);
        assert_eq!(config.dashboard.max_data_points, 100);
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config = MonitorConfig::from_json(
            r#"{ "estimator": { "threshold": 0.5 }, "simulation": { "seed": 7 } }"#,
        )
        .unwrap();

        assert_eq!(config.estimator.threshold, 0.5);
        assert_eq!(config.estimator.noise_sigma, 0.1);
        assert_eq!(config.simulation.seed, Some(7));
        assert_eq!(config.simulation.hr_stress_range, (90, 130));
        assert_eq!(config.workers, default_workers());
    }

    #[test]
    fn test_json_round_trip() {
        let mut config = MonitorConfig::default();
        config.simulation.stress_duration = (3, 4);
        let json = config.to_json().unwrap();
        let loaded = MonitorConfig::from_json(&json).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_rejects_inverted_ranges() {
        let mut config = MonitorConfig::default();
        config.simulation.hr_stress_range = (130, 90);
        assert!(matches!(
            config.validate(),
            Err(PulseError::InvalidConfig(_))
        ));

        let mut config = MonitorConfig::default();
        config.simulation.stress_duration = (20, 5);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_rejects_bad_threshold_and_duplicates() {
        let mut config = MonitorConfig::default();
        config.estimator.threshold = 1.5;
        assert!(config.validate().is_err());

        let mut config = MonitorConfig::default();
        config.workers.push(WorkerProfile::new("worker_1", "Again", "#000000"));
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("duplicate worker id"));
    }

    #[test]
    fn test_rejects_unbounded_simulation_values() {
        let mut config = MonitorConfig::default();
        config.simulation.hr_base_range = (i32::MAX - 1, i32::MAX);
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("hr_base_range"));

        let mut config = MonitorConfig::default();
        config.simulation.hr_stress_range = (-20, 130);
        assert!(config.validate().is_err());

        let mut config = MonitorConfig::default();
        config.simulation.noise_level = i32::MAX;
        assert!(config.validate().is_err());

        let mut config = MonitorConfig::default();
        config.simulation.hr_base_range = (0, 300);
        config.simulation.noise_level = MAX_NOISE_LEVEL;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_rejects_nan_upload_bounds() {
        let mut config = MonitorConfig::default();
        config.upload.hr_min = f64::NAN;
        assert!(matches!(
            config.validate(),
            Err(PulseError::InvalidConfig(_))
        ));

        let mut config = MonitorConfig::default();
        config.upload.hr_max = f64::INFINITY;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_file_size_limit_saturates() {
        let upload = UploadConfig {
            max_file_size_mb: u64::MAX / 2,
            ..Default::default()
        };
        assert_eq!(upload.max_file_size_bytes(), u64::MAX);
        assert_eq!(UploadConfig::default().max_file_size_bytes(), 50 * 1024 * 1024);
    }

    #[test]
    fn test_update_interval_bounded() {
        let mut config = MonitorConfig::default();
        config.dashboard.update_interval_secs = 1e30;
        assert!(config.validate().is_err());

        config.dashboard.update_interval_secs = f64::NAN;
        assert!(config.validate().is_err());

        config.dashboard.update_interval_secs = 0.25;
        assert!(config.validate().is_ok());
        assert_eq!(config.dashboard.update_interval(), Duration::from_millis(250));

        let huge = DashboardConfig {
            update_interval_secs: 1e30,
            ..Default::default()
        };
        assert_eq!(huge.update_interval(), Duration::from_secs(1));
    }

    #[test]
    fn test_seeded_rng_is_reproducible() {
        use rand::Rng;

        let config = SimulationConfig {
            seed: Some(99),
            ..Default::default()
        };
        let mut first = config.make_rng();
        let mut second = config.make_rng();
        for _ in 0..4 {
            assert_eq!(first.gen::<u64>(), second.gen::<u64>());
        }
    }

    #[test]
    fn test_rejects_empty_workers() {
        let err = MonitorConfig::from_json(r#"{ "workers": [] }"#).unwrap_err();
        assert!(matches!(err, PulseError::InvalidConfig(_)));
    }
}
