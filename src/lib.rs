//! worker-pulse - Simulated and uploaded worker heart-rate streams with
//! heuristic stress flagging
//!
//! Two independent components do the real work:
//!
//! - **Stress estimator**: scores one heart rate into a stress probability and
//!   classifies it against a threshold.
//! - **Heart-rate simulator**: a per-worker normal/stress state machine that
//!   emits a bounded, rate-limited synthetic heart rate each tick.
//!
//! Around them sit the pieces a monitoring front end needs: configuration,
//! a multi-worker driver with a background loop, CSV upload analysis, bounded
//! per-worker history and demo file export.
//!
//! Every function that draws random numbers takes the RNG as an argument;
//! seed a [`rand::rngs::StdRng`] for reproducible runs.

pub mod buffer;
pub mod config;
pub mod demo;
pub mod driver;
pub mod error;
pub mod estimator;
pub mod monitor;
pub mod pipeline;
pub mod simulator;
pub mod types;
pub mod upload;

pub use config::MonitorConfig;
pub use driver::{MultiWorkerSimulator, SimulationHandle};
pub use error::PulseError;
pub use estimator::StressEstimator;
pub use monitor::Monitor;
pub use pipeline::{AnalyzedUpload, UploadAnalyzer};
pub use simulator::{HeartRateSimulator, SimulatorState, WorkerSimulator};

/// Crate version reported by the CLI
pub const PULSE_VERSION: &str = env!("CARGO_PKG_VERSION");
