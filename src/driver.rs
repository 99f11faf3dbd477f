//! Multi-worker simulation driver
//!
//! Advances one simulator per worker, scores each emitted heart rate and
//! publishes the whole tick as a single [`SimulationFrame`]. The driver can
//! be stepped manually or moved onto a background thread that ticks at a
//! fixed interval until stopped.

use crate::config::MonitorConfig;
use crate::error::PulseError;
use crate::estimator::StressEstimator;
use crate::simulator::{HeartRateSimulator, WorkerSimulator};
use crate::types::{Sample, SimulationFrame, WorkerId, WorkerReading, WorkerStatus};
use chrono::{DateTime, Utc};
use log::{debug, info};
use rand::rngs::StdRng;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

/// Simulates every configured worker in lockstep
pub struct MultiWorkerSimulator {
    simulator: HeartRateSimulator,
    estimator: StressEstimator,
    workers: Vec<WorkerSimulator>,
    rng: StdRng,
}

impl MultiWorkerSimulator {
    /// Build from config, seeding from `simulation.seed` when present
    pub fn new(config: &MonitorConfig) -> Result<Self, PulseError> {
        Self::with_rng(config, config.simulation.make_rng())
    }

    /// Build from config with an explicit random source
    pub fn with_rng(config: &MonitorConfig, mut rng: StdRng) -> Result<Self, PulseError> {
        config.validate()?;
        let simulator = HeartRateSimulator::new(config.simulation.clone())?;
        let estimator = StressEstimator::new(config.estimator.clone());

        let workers = config
            .workers
            .iter()
            .map(|profile| WorkerSimulator::new(profile.clone(), simulator.init_state(&mut rng)))
            .collect();

        Ok(Self {
            simulator,
            estimator,
            workers,
            rng,
        })
    }

    pub fn workers(&self) -> &[WorkerSimulator] {
        &self.workers
    }

    /// Advance every worker by one tick and score the result
    pub fn tick(&mut self, timestamp: DateTime<Utc>) -> SimulationFrame {
        let mut readings = BTreeMap::new();
        for worker in &mut self.workers {
            let hr = worker.generate_next_hr(&self.simulator, &mut self.rng);
            let estimate = self.estimator.estimate(hr, &mut self.rng);
            readings.insert(
                worker.profile().id.clone(),
                WorkerReading {
                    worker_name: worker.profile().name.clone(),
                    sample: Sample::from_estimate(timestamp, &estimate),
                    regime: worker.state().regime,
                },
            );
        }
        SimulationFrame {
            timestamp,
            readings,
        }
    }

    /// Current internal state of every worker
    pub fn current_status(&self) -> BTreeMap<WorkerId, WorkerStatus> {
        self.workers
            .iter()
            .map(|w| (w.profile().id.clone(), w.status()))
            .collect()
    }

    /// Move the driver onto a background thread ticking every `interval`.
    ///
    /// `on_frame` runs on that thread once per tick and should return quickly.
    pub fn start<F>(self, interval: Duration, on_frame: F) -> SimulationHandle
    where
        F: FnMut(&SimulationFrame) + Send + 'static,
    {
        let running = Arc::new(AtomicBool::new(true));
        let flag = Arc::clone(&running);
        info!(
            "starting simulation of {} workers every {:?}",
            self.workers.len(),
            interval
        );
        let thread = thread::spawn(move || self.run(interval, &flag, on_frame));

        SimulationHandle {
            running,
            thread: Some(thread),
        }
    }

    fn run<F>(mut self, interval: Duration, running: &AtomicBool, mut on_frame: F) -> Self
    where
        F: FnMut(&SimulationFrame),
    {
        while running.load(Ordering::Acquire) {
            let frame = self.tick(Utc::now());
            on_frame(&frame);

            let deadline = Instant::now() + interval;
            loop {
                if !running.load(Ordering::Acquire) {
                    break;
                }
                let now = Instant::now();
                if now >= deadline {
                    break;
                }
                thread::park_timeout(deadline - now);
            }
        }
        debug!("simulation loop exited");
        self
    }
}

/// Handle to a driver running on a background thread
pub struct SimulationHandle {
    running: Arc<AtomicBool>,
    thread: Option<JoinHandle<MultiWorkerSimulator>>,
}

impl SimulationHandle {
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    /// Signal the loop to stop, wait for the in-flight tick, and hand the
    /// driver back.
    pub fn stop(mut self) -> Result<MultiWorkerSimulator, PulseError> {
        let driver = self.shutdown()?;
        info!("simulation stopped");
        driver.ok_or(PulseError::DriverPanicked)
    }

    fn shutdown(&mut self) -> Result<Option<MultiWorkerSimulator>, PulseError> {
        self.running.store(false, Ordering::Release);
        match self.thread.take() {
            Some(thread) => {
                thread.thread().unpark();
                thread
                    .join()
                    .map(Some)
                    .map_err(|_| PulseError::DriverPanicked)
            }
            None => Ok(None),
        }
    }
}

impl Drop for SimulationHandle {
    fn drop(&mut self) {
        let _ = self.shutdown();
    }
}
