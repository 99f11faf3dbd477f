//! Core types for worker-pulse
//!
//! This module defines the values that flow between the simulator, the
//! estimator and the monitor: samples, estimates, readings and frames.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Worker identifier (e.g. `worker_1`)
pub type WorkerId = String;

/// Behavioural mode of a simulated worker
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Regime {
    Normal,
    Stress,
}

/// Classification attached to an estimate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StressStatus {
    Normal,
    Stress,
}

/// Result of estimating stress for a single heart-rate value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StressEstimate {
    /// Heart rate that was scored (bpm)
    pub hr: i32,
    /// Stress probability (0-1)
    pub stress_probability: f64,
    /// Whether the probability reached the threshold
    pub is_stress: bool,
    /// Threshold applied
    pub threshold: f64,
    pub status: StressStatus,
}

/// One scored heart-rate observation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    pub timestamp: DateTime<Utc>,
    /// Heart rate (bpm)
    pub heart_rate: i32,
    /// Stress probability (0-1)
    pub stress_probability: f64,
    pub is_stress: bool,
}

impl Sample {
    /// Build a sample from an estimate taken at `timestamp`
    pub fn from_estimate(timestamp: DateTime<Utc>, estimate: &StressEstimate) -> Self {
        Self {
            timestamp,
            heart_rate: estimate.hr,
            stress_probability: estimate.stress_probability,
            is_stress: estimate.is_stress,
        }
    }
}

/// Raw heart-rate row, from an uploaded file or the demo generator
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HrRecord {
    pub timestamp: DateTime<Utc>,
    /// Heart rate (bpm)
    #[serde(rename = "HR")]
    pub hr: i32,
}

/// Static description of a monitored worker
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkerProfile {
    pub id: WorkerId,
    /// Display name
    pub name: String,
    /// Chart colour (hex)
    pub color: String,
}

impl WorkerProfile {
    pub fn new(id: &str, name: &str, color: &str) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            color: color.to_string(),
        }
    }
}

/// One worker's output for a single simulation tick
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkerReading {
    pub worker_name: String,
    pub sample: Sample,
    /// Regime the simulator was in when the reading was produced
    pub regime: Regime,
}

/// Everything published for one tick of the multi-worker driver
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationFrame {
    pub timestamp: DateTime<Utc>,
    pub readings: BTreeMap<WorkerId, WorkerReading>,
}

/// Snapshot of a simulated worker's internal state
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkerStatus {
    pub worker_name: String,
    pub current_hr: i32,
    pub regime: Regime,
    pub base_hr: i32,
    pub is_stressed: bool,
}

/// Alert level shown for a worker in the overview
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertLevel {
    NoData,
    Normal,
    Stress,
}

/// Overview card for one worker
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkerOverview {
    pub worker_id: WorkerId,
    pub worker_name: String,
    pub color: String,
    pub latest: Option<Sample>,
    pub alert: AlertLevel,
}

/// Summary of what an upload parse kept and dropped
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadReport {
    pub total_rows: usize,
    pub kept_rows: usize,
    pub invalid_timestamps: usize,
    pub invalid_hr: usize,
    pub out_of_range_hr: usize,
}
