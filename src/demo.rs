//! Demo data export
//!
//! Writes one CSV file per worker with a second-by-second simulated heart
//! rate, in the same `timestamp,HR` layout the upload parser accepts.

use crate::error::PulseError;
use crate::simulator::{HeartRateSimulator, WorkerSimulator};
use crate::types::{HrRecord, WorkerProfile};
use chrono::{DateTime, Duration, Utc};
use log::info;
use rand::Rng;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

/// Timestamp layout used in exported files
pub const DEMO_TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Simulate `duration_minutes` of one-second ticks ending at `end`
pub fn generate_demo_records<R: Rng + ?Sized>(
    simulator: &HeartRateSimulator,
    profile: &WorkerProfile,
    end: DateTime<Utc>,
    duration_minutes: u32,
    rng: &mut R,
) -> Vec<HrRecord> {
    let ticks = i64::from(duration_minutes) * 60;
    let start = end - Duration::minutes(i64::from(duration_minutes));
    let mut worker = WorkerSimulator::new(profile.clone(), simulator.init_state(rng));

    (0..ticks)
        .map(|i| HrRecord {
            timestamp: start + Duration::seconds(i),
            hr: worker.generate_next_hr(simulator, rng),
        })
        .collect()
}

/// Write records as `timestamp,HR` CSV
pub fn write_demo_csv<W: Write>(records: &[HrRecord], out: W) -> Result<(), PulseError> {
    let mut writer = csv::Writer::from_writer(out);
    writer.write_record(["timestamp", "HR"])?;
    for record in records {
        writer.write_record([
            record.timestamp.format(DEMO_TIMESTAMP_FORMAT).to_string(),
            record.hr.to_string(),
        ])?;
    }
    writer.flush()?;
    Ok(())
}

/// File name for a worker's demo export
pub fn demo_file_name(profile: &WorkerProfile) -> String {
    format!(
        "{}_{}_demo.csv",
        file_name_part(&profile.id),
        file_name_part(&profile.name)
    )
}

// Config-supplied names must not steer the file outside the output directory
fn file_name_part(raw: &str) -> String {
    raw.chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' { c } else { '_' })
        .collect()
}

/// Generate and write one demo file per worker, returning the paths written
pub fn save_demo_csv_files<R: Rng + ?Sized>(
    simulator: &HeartRateSimulator,
    workers: &[WorkerProfile],
    output_dir: &Path,
    duration_minutes: u32,
    end: DateTime<Utc>,
    rng: &mut R,
) -> Result<Vec<PathBuf>, PulseError> {
    fs::create_dir_all(output_dir)?;

    let mut written = Vec::with_capacity(workers.len());
    for profile in workers {
        let records = generate_demo_records(simulator, profile, end, duration_minutes, rng);
        let path = output_dir.join(demo_file_name(profile));
        let file = fs::File::create(&path)?;
        write_demo_csv(&records, file)?;
        info!("wrote {} ({} rows)", path.display(), records.len());
        written.push(path);
    }
    Ok(written)
}
