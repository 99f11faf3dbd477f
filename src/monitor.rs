//! Live monitor state
//!
//! Holds the per-worker sample history and alert flags that a front end
//! renders. Samples arrive either from simulation frames or from an
//! analysed upload, which replaces that worker's history.

use crate::buffer::SampleBuffer;
use crate::config::MonitorConfig;
use crate::error::PulseError;
use crate::types::{AlertLevel, Sample, SimulationFrame, WorkerOverview, WorkerProfile};
use log::warn;
use std::collections::BTreeMap;

#[derive(Debug, Clone)]
struct WorkerTrack {
    profile: WorkerProfile,
    history: SampleBuffer,
    alert: bool,
}

/// Per-worker histories and alert state
#[derive(Debug, Clone)]
pub struct Monitor {
    tracks: BTreeMap<String, WorkerTrack>,
}

impl Monitor {
    pub fn new(config: &MonitorConfig) -> Self {
        let tracks = config
            .workers
            .iter()
            .map(|profile| {
                (
                    profile.id.clone(),
                    WorkerTrack {
                        profile: profile.clone(),
                        history: SampleBuffer::new(config.dashboard.max_data_points),
                        alert: false,
                    },
                )
            })
            .collect();

        Self { tracks }
    }

    /// Append one sample and update the worker's alert flag
    pub fn record(&mut self, worker_id: &str, sample: Sample) -> Result<(), PulseError> {
        let track = self.track_mut(worker_id)?;
        track.alert = sample.is_stress;
        track.history.push(sample);
        Ok(())
    }

    /// Record every reading in a simulation frame.
    ///
    /// Readings for workers this monitor does not know are skipped.
    pub fn apply_frame(&mut self, frame: &SimulationFrame) {
        for (worker_id, reading) in &frame.readings {
            if let Err(e) = self.record(worker_id, reading.sample.clone()) {
                warn!("skipping reading: {}", e);
            }
        }
    }

    /// Replace a worker's history with analysed upload samples
    pub fn load_history(&mut self, worker_id: &str, samples: Vec<Sample>) -> Result<(), PulseError> {
        let track = self.track_mut(worker_id)?;
        track.alert = samples.last().map(|s| s.is_stress).unwrap_or(false);
        track.history.replace(samples);
        Ok(())
    }

    pub fn history(&self, worker_id: &str) -> Result<Vec<Sample>, PulseError> {
        self.tracks
            .get(worker_id)
            .map(|t| t.history.to_vec())
            .ok_or_else(|| PulseError::UnknownWorker(worker_id.to_string()))
    }

    pub fn is_alert(&self, worker_id: &str) -> bool {
        self.tracks.get(worker_id).map(|t| t.alert).unwrap_or(false)
    }

    /// One overview card per worker, in worker id order
    pub fn overview(&self) -> Vec<WorkerOverview> {
        self.tracks
            .iter()
            .map(|(id, track)| {
                let latest = track.history.latest().cloned();
                let alert = match (&latest, track.alert) {
                    (None, _) => AlertLevel::NoData,
                    (Some(_), true) => AlertLevel::Stress,
                    (Some(_), false) => AlertLevel::Normal,
                };
                WorkerOverview {
                    worker_id: id.clone(),
                    worker_name: track.profile.name.clone(),
                    color: track.profile.color.clone(),
                    latest,
                    alert,
                }
            })
            .collect()
    }

    fn track_mut(&mut self, worker_id: &str) -> Result<&mut WorkerTrack, PulseError> {
        self.tracks
            .get_mut(worker_id)
            .ok_or_else(|| PulseError::UnknownWorker(worker_id.to_string()))
    }
}
