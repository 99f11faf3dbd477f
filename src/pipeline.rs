//! Upload analysis pipeline
//!
//! Orchestrates the path from an uploaded heart-rate file to scored samples:
//! CSV parsing → validation and sorting → stress estimation.

use crate::config::MonitorConfig;
use crate::error::PulseError;
use crate::estimator::StressEstimator;
use crate::types::{HrRecord, Sample, UploadReport};
use crate::upload::UploadParser;
use log::info;
use rand::Rng;
use std::path::Path;

/// Scored samples together with what the parser kept and dropped
#[derive(Debug, Clone)]
pub struct AnalyzedUpload {
    pub samples: Vec<Sample>,
    pub report: UploadReport,
}

/// Parses uploads and scores them with one estimator
#[derive(Debug, Clone)]
pub struct UploadAnalyzer {
    parser: UploadParser,
    estimator: StressEstimator,
}

impl Default for UploadAnalyzer {
    fn default() -> Self {
        Self::new(&MonitorConfig::default())
    }
}

impl UploadAnalyzer {
    pub fn new(config: &MonitorConfig) -> Self {
        Self {
            parser: UploadParser::new(config.upload.clone()),
            estimator: StressEstimator::new(config.estimator.clone()),
        }
    }

    /// Analyze CSV text.
    ///
    /// `threshold` overrides the configured classification threshold.
    pub fn analyze_str<R: Rng + ?Sized>(
        &self,
        csv: &str,
        threshold: Option<f64>,
        rng: &mut R,
    ) -> Result<AnalyzedUpload, PulseError> {
        let (records, report) = self.parser.parse_str(csv)?;
        Ok(self.score(records, report, threshold, rng))
    }

    /// Analyze a CSV file on disk
    pub fn analyze_path<R: Rng + ?Sized>(
        &self,
        path: &Path,
        threshold: Option<f64>,
        rng: &mut R,
    ) -> Result<AnalyzedUpload, PulseError> {
        let (records, report) = self.parser.parse_path(path)?;
        Ok(self.score(records, report, threshold, rng))
    }

    fn score<R: Rng + ?Sized>(
        &self,
        records: Vec<HrRecord>,
        report: UploadReport,
        threshold: Option<f64>,
        rng: &mut R,
    ) -> AnalyzedUpload {
        let samples = self.estimator.annotate(&records, threshold, rng);
        let stressed = samples.iter().filter(|s| s.is_stress).count();
        info!(
            "analyzed {} of {} rows, {} flagged as stress",
            report.kept_rows, report.total_rows, stressed
        );
        AnalyzedUpload { samples, report }
    }
}
