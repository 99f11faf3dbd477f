//! Uploaded heart-rate file ingestion
//!
//! Reads a CSV table with `timestamp` and `HR` columns into time-ordered
//! records. Rows are dropped rather than failing the whole file when the
//! timestamp cannot be read or the heart rate is implausible.

use crate::config::UploadConfig;
use crate::error::PulseError;
use crate::types::{HrRecord, UploadReport};
use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};
use log::{debug, warn};
use std::fs;
use std::io::Read;
use std::path::Path;

const TIMESTAMP_COLUMN: &str = "timestamp";
const HR_COLUMN: &str = "HR";

/// Formats tried after the configured ones
const FALLBACK_DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
    "%Y/%m/%d %H:%M",
    "%m/%d/%Y %H:%M:%S",
    "%d.%m.%Y %H:%M:%S",
];

const FALLBACK_DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%Y/%m/%d"];

/// Parser for uploaded CSV files
#[derive(Debug, Clone, Default)]
pub struct UploadParser {
    config: UploadConfig,
}

impl UploadParser {
    pub fn new(config: UploadConfig) -> Self {
        Self { config }
    }

    /// Parse a CSV file, rejecting it up front if it exceeds the size limit
    pub fn parse_path(&self, path: &Path) -> Result<(Vec<HrRecord>, UploadReport), PulseError> {
        let size_bytes = fs::metadata(path)?.len();
        let limit_bytes = self.config.max_file_size_bytes();
        if size_bytes > limit_bytes {
            return Err(PulseError::FileTooLarge {
                size_bytes,
                limit_bytes,
            });
        }
        let file = fs::File::open(path)?;
        self.parse_reader(file)
    }

    /// Parse CSV text
    pub fn parse_str(&self, input: &str) -> Result<(Vec<HrRecord>, UploadReport), PulseError> {
        self.parse_reader(input.as_bytes())
    }

    /// Parse CSV from any reader
    pub fn parse_reader<R: Read>(
        &self,
        input: R,
    ) -> Result<(Vec<HrRecord>, UploadReport), PulseError> {
        let mut reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .flexible(true)
            .from_reader(input);

        let headers = reader.headers()?.clone();
        let missing: Vec<String> = self
            .config
            .required_columns
            .iter()
            .filter(|col| !headers.iter().any(|h| h == col.as_str()))
            .cloned()
            .collect();
        if !missing.is_empty() {
            return Err(PulseError::MissingColumns(missing));
        }

        let column = |name: &str| {
            headers
                .iter()
                .position(|h| h == name)
                .ok_or_else(|| PulseError::MissingColumns(vec![name.to_string()]))
        };
        let ts_idx = column(TIMESTAMP_COLUMN)?;
        let hr_idx = column(HR_COLUMN)?;

        let mut report = UploadReport::default();
        let mut records = Vec::new();

        for result in reader.records() {
            let row = result?;
            report.total_rows += 1;

            let timestamp = match row
                .get(ts_idx)
                .and_then(|raw| parse_timestamp(raw, &self.config.timestamp_formats))
            {
                Some(ts) => ts,
                None => {
                    report.invalid_timestamps += 1;
                    continue;
                }
            };

            let hr = match row.get(hr_idx).and_then(|raw| raw.parse::<f64>().ok()) {
                Some(hr) if hr.is_finite() => hr,
                _ => {
                    report.invalid_hr += 1;
                    continue;
                }
            };
            if hr < self.config.hr_min || hr > self.config.hr_max {
                report.out_of_range_hr += 1;
                continue;
            }

            records.push(HrRecord {
                timestamp,
                hr: hr.round() as i32,
            });
        }

        if report.invalid_timestamps > 0 {
            warn!(
                "dropped {} rows with unreadable timestamps",
                report.invalid_timestamps
            );
        }
        if report.invalid_hr > 0 {
            warn!("dropped {} rows with non-numeric HR", report.invalid_hr);
        }
        if report.out_of_range_hr > 0 {
            debug!(
                "dropped {} rows with HR outside [{}, {}]",
                report.out_of_range_hr, self.config.hr_min, self.config.hr_max
            );
        }

        records.sort_by_key(|r| r.timestamp);
        report.kept_rows = records.len();
        Ok((records, report))
    }
}

/// Parse a timestamp with the given formats first, then a permissive fallback.
///
/// Zone-less timestamps are read as UTC.
pub fn parse_timestamp(raw: &str, formats: &[String]) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }

    for fmt in formats {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, fmt) {
            return Some(Utc.from_utc_datetime(&naive));
        }
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(dt) = DateTime::parse_from_rfc2822(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    for fmt in FALLBACK_DATETIME_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, fmt) {
            return Some(Utc.from_utc_datetime(&naive));
        }
    }
    for fmt in FALLBACK_DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(raw, fmt) {
            return date
                .and_hms_opt(0, 0, 0)
                .map(|naive| Utc.from_utc_datetime(&naive));
        }
    }
    None
}
