//! Pulse CLI - Command-line interface for worker-pulse
//!
//! Commands:
//! - simulate: Run the multi-worker simulation and print each tick
//! - analyze: Score an uploaded heart-rate CSV
//! - estimate: Score a single heart rate
//! - demo: Write demo CSV files for every worker
//! - config: Print or validate configuration

use clap::{Parser, Subcommand, ValueEnum};
use log::info;
use serde::Serialize;
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::mpsc;
use std::time::Duration;

use chrono::Utc;
use worker_pulse::demo::save_demo_csv_files;
use worker_pulse::types::SimulationFrame;
use worker_pulse::{
    HeartRateSimulator, Monitor, MonitorConfig, MultiWorkerSimulator, PulseError,
    StressEstimator, UploadAnalyzer, PULSE_VERSION,
};

/// Pulse - worker heart-rate simulation and stress flagging
#[derive(Parser)]
#[command(name = "pulse")]
#[command(version = PULSE_VERSION)]
#[command(about = "Simulate or analyze worker heart rate and flag stress", long_about = None)]
struct Cli {
    /// Configuration file (JSON); defaults are used when omitted
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// RNG seed for reproducible output
    #[arg(long, global = true)]
    seed: Option<u64>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the multi-worker simulation and print each tick
    Simulate {
        /// Number of ticks to produce
        #[arg(short, long, default_value = "10")]
        ticks: usize,

        /// Tick on the background driver at the configured interval
        #[arg(long)]
        realtime: bool,

        /// Override the tick interval in milliseconds (realtime only)
        #[arg(long)]
        interval_ms: Option<u64>,

        /// Stress threshold
        #[arg(long)]
        threshold: Option<f64>,

        /// Output format
        #[arg(long, default_value = "ndjson")]
        output_format: OutputFormat,

        /// Print the per-worker overview after the last tick
        #[arg(long)]
        overview: bool,
    },

    /// Score an uploaded heart-rate CSV
    Analyze {
        /// Input file path (use - for stdin)
        #[arg(short, long)]
        input: PathBuf,

        /// Stress threshold
        #[arg(long)]
        threshold: Option<f64>,

        /// Output format
        #[arg(long, default_value = "ndjson")]
        output_format: OutputFormat,

        /// Print the upload report to stderr
        #[arg(long)]
        report: bool,
    },

    /// Score a single heart rate
    Estimate {
        /// Heart rate in bpm
        #[arg(long)]
        hr: i32,

        /// Stress threshold
        #[arg(long)]
        threshold: Option<f64>,

        /// Number of independent estimates to draw
        #[arg(long, default_value = "1")]
        count: usize,
    },

    /// Write demo CSV files for every worker
    Demo {
        /// Output directory
        #[arg(short, long, default_value = "demo_data")]
        output_dir: PathBuf,

        /// Minutes of one-second samples per worker
        #[arg(long, default_value = "15")]
        minutes: u32,
    },

    /// Print the effective configuration, or validate a file
    Config {
        /// Validate this file instead of printing
        #[arg(long)]
        validate: Option<PathBuf>,
    },
}

#[derive(Clone, ValueEnum)]
enum OutputFormat {
    /// Newline-delimited JSON (one record per line)
    Ndjson,
    /// JSON array
    Json,
    /// Pretty-printed JSON
    JsonPretty,
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let cli = Cli::parse();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!(
                "{}",
                serde_json::to_string(&CliError::from(e))
                    .unwrap_or_else(|_| "Unknown error".to_string())
            );
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<(), PulseCliError> {
    let mut config = load_config(cli.config.as_deref())?;
    if let Some(seed) = cli.seed {
        config.simulation.seed = Some(seed);
    }

    match cli.command {
        Commands::Simulate {
            ticks,
            realtime,
            interval_ms,
            threshold,
            output_format,
            overview,
        } => {
            apply_threshold(&mut config, threshold)?;
            cmd_simulate(&config, ticks, realtime, interval_ms, &output_format, overview)
        }

        Commands::Analyze {
            input,
            threshold,
            output_format,
            report,
        } => {
            apply_threshold(&mut config, threshold)?;
            cmd_analyze(&config, &input, &output_format, report)
        }

        Commands::Estimate { hr, threshold, count } => {
            apply_threshold(&mut config, threshold)?;
            cmd_estimate(&config, hr, count)
        }

        Commands::Demo {
            output_dir,
            minutes,
        } => cmd_demo(&config, &output_dir, minutes),

        Commands::Config { validate } => cmd_config(&config, validate.as_deref()),
    }
}

fn load_config(path: Option<&Path>) -> Result<MonitorConfig, PulseCliError> {
    match path {
        Some(path) => Ok(MonitorConfig::from_path(path)?),
        None => Ok(MonitorConfig::default()),
    }
}

fn apply_threshold(config: &mut MonitorConfig, threshold: Option<f64>) -> Result<(), PulseCliError> {
    if let Some(threshold) = threshold {
        config.estimator.threshold = threshold;
        config.estimator.validate()?;
    }
    Ok(())
}

fn cmd_simulate(
    config: &MonitorConfig,
    ticks: usize,
    realtime: bool,
    interval_ms: Option<u64>,
    output_format: &OutputFormat,
    overview: bool,
) -> Result<(), PulseCliError> {
    let mut driver = MultiWorkerSimulator::new(config)?;
    let mut monitor = Monitor::new(config);
    let mut stdout = io::stdout();
    let mut frames: Vec<SimulationFrame> = Vec::with_capacity(ticks);

    let mut emit = |frame: SimulationFrame, stdout: &mut io::Stdout| -> Result<(), PulseCliError> {
        monitor.apply_frame(&frame);
        match output_format {
            OutputFormat::Ndjson => {
                writeln!(stdout, "{}", serde_json::to_string(&frame)?)?;
                stdout.flush()?;
            }
            _ => frames.push(frame),
        }
        Ok(())
    };

    if realtime {
        let interval = interval_ms
            .map(Duration::from_millis)
            .unwrap_or_else(|| config.dashboard.update_interval());
        let (tx, rx) = mpsc::channel();
        let handle = driver.start(interval, move |frame| {
            let _ = tx.send(frame.clone());
        });

        for _ in 0..ticks {
            match rx.recv() {
                Ok(frame) => emit(frame, &mut stdout)?,
                Err(_) => break,
            }
        }
        handle.stop()?;
    } else {
        for _ in 0..ticks {
            let frame = driver.tick(Utc::now());
            emit(frame, &mut stdout)?;
        }
    }

    if !matches!(output_format, OutputFormat::Ndjson) {
        print!("{}", format_output(&frames, output_format)?);
    }

    if overview {
        eprintln!("{}", serde_json::to_string_pretty(&monitor.overview())?);
    }

    Ok(())
}

fn cmd_analyze(
    config: &MonitorConfig,
    input: &Path,
    output_format: &OutputFormat,
    report: bool,
) -> Result<(), PulseCliError> {
    let analyzer = UploadAnalyzer::new(config);
    let mut rng = config.simulation.make_rng();

    let analyzed = if input.to_string_lossy() == "-" {
        let mut buffer = String::new();
        io::stdin().read_to_string(&mut buffer)?;
        analyzer.analyze_str(&buffer, None, &mut rng)?
    } else {
        analyzer.analyze_path(input, None, &mut rng)?
    };

    if analyzed.samples.is_empty() {
        return Err(PulseCliError::NoSamples);
    }

    if report {
        eprintln!("{}", serde_json::to_string_pretty(&analyzed.report)?);
    }

    print!("{}", format_output(&analyzed.samples, output_format)?);
    Ok(())
}

fn cmd_estimate(config: &MonitorConfig, hr: i32, count: usize) -> Result<(), PulseCliError> {
    let estimator = StressEstimator::new(config.estimator.clone());
    let mut rng = config.simulation.make_rng();
    let rates = vec![hr; count];
    let estimates = estimator.estimate_batch(&rates, None, &mut rng);
    print!("{}", format_output(&estimates, &OutputFormat::Ndjson)?);
    Ok(())
}

fn cmd_demo(config: &MonitorConfig, output_dir: &Path, minutes: u32) -> Result<(), PulseCliError> {
    let simulator = HeartRateSimulator::new(config.simulation.clone())?;
    let mut rng = config.simulation.make_rng();
    let paths = save_demo_csv_files(
        &simulator,
        &config.workers,
        output_dir,
        minutes,
        Utc::now(),
        &mut rng,
    )?;

    for path in &paths {
        println!("{}", path.display());
    }
    info!("wrote {} demo files", paths.len());
    Ok(())
}

fn cmd_config(config: &MonitorConfig, validate: Option<&Path>) -> Result<(), PulseCliError> {
    match validate {
        Some(path) => {
            let loaded = MonitorConfig::from_path(path)?;
            println!(
                "{}: valid ({} workers, threshold {})",
                path.display(),
                loaded.workers.len(),
                loaded.estimator.threshold
            );
        }
        None => println!("{}", config.to_json()?),
    }
    Ok(())
}

// Helper functions

fn format_output<T: Serialize>(items: &[T], format: &OutputFormat) -> Result<String, PulseCliError> {
    match format {
        OutputFormat::Ndjson => {
            let mut lines: Vec<String> = Vec::new();
            for item in items {
                lines.push(serde_json::to_string(item)?);
            }
            Ok(lines.join("\n") + "\n")
        }
        OutputFormat::Json => Ok(serde_json::to_string(items)? + "\n"),
        OutputFormat::JsonPretty => Ok(serde_json::to_string_pretty(items)? + "\n"),
    }
}

// Error types

#[derive(Debug)]
enum PulseCliError {
    Io(io::Error),
    Pulse(PulseError),
    Json(serde_json::Error),
    NoSamples,
}

impl From<io::Error> for PulseCliError {
    fn from(e: io::Error) -> Self {
        PulseCliError::Io(e)
    }
}

impl From<PulseError> for PulseCliError {
    fn from(e: PulseError) -> Self {
        PulseCliError::Pulse(e)
    }
}

impl From<serde_json::Error> for PulseCliError {
    fn from(e: serde_json::Error) -> Self {
        PulseCliError::Json(e)
    }
}

#[derive(Serialize)]
struct CliError {
    code: String,
    message: String,
    hint: Option<String>,
}

impl From<PulseCliError> for CliError {
    fn from(e: PulseCliError) -> Self {
        match e {
            PulseCliError::Io(e) => CliError {
                code: "IO_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Check file paths and permissions".to_string()),
            },
            PulseCliError::Json(e) => CliError {
                code: "JSON_ERROR".to_string(),
                message: e.to_string(),
                hint: None,
            },
            PulseCliError::NoSamples => CliError {
                code: "NO_SAMPLES".to_string(),
                message: "No usable rows found in input".to_string(),
                hint: Some("Rows need a readable timestamp and an HR between 30 and 200".to_string()),
            },
            PulseCliError::Pulse(e) => {
                let (code, hint) = match &e {
                    PulseError::Csv(_) => ("CSV_ERROR", Some("Check CSV syntax")),
                    PulseError::Io(_) => ("IO_ERROR", Some("Check file paths and permissions")),
                    PulseError::Json(_) => ("JSON_ERROR", Some("Check JSON syntax")),
                    PulseError::MissingColumns(_) => (
                        "MISSING_COLUMNS",
                        Some("Input needs 'timestamp' and 'HR' columns"),
                    ),
                    PulseError::FileTooLarge { .. } => {
                        ("FILE_TOO_LARGE", Some("Split the file or raise upload.max_file_size_mb"))
                    }
                    PulseError::InvalidConfig(_) => {
                        ("INVALID_CONFIG", Some("Run 'pulse config' to see a valid configuration"))
                    }
                    PulseError::UnknownWorker(_) => ("UNKNOWN_WORKER", None),
                    PulseError::DriverPanicked => ("DRIVER_PANICKED", None),
                };
                CliError {
                    code: code.to_string(),
                    message: e.to_string(),
                    hint: hint.map(str::to_string),
                }
            }
        }
    }
}
