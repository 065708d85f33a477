//! Gauge Readout CLI
//!
//! `extract` prints the JSON result for one photo, `batch` processes a
//! directory into CSV and JSONL files, and `setup` fetches OCR trained data.

use clap::{Parser, Subcommand};
use serde_json::json;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::{error, info};

use gauge_readout::batch::run_batch;
use gauge_readout::config::{get_config, init_config};
use gauge_readout::error::ExtractError;
use gauge_readout::logging::{init_logging, install_panic_hook};
use gauge_readout::ocr::ensure_tesseract;
use gauge_readout::paths::{ensure_directories, get_config_path, get_logs_dir};

#[derive(Parser)]
#[command(name = "gauge-readout", version, about = "Read depth, temperature and angle from gauge photos")]
struct Cli {
    /// Config file (defaults to config.json next to the executable)
    #[arg(long, global = true, env = "GAUGE_READOUT_CONFIG")]
    config: Option<PathBuf>,

    /// Log level when RUST_LOG is unset
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Extract readings from one photo and print them as JSON
    Extract {
        image: PathBuf,
        #[arg(long)]
        pretty: bool,
    },
    /// Extract readings from every photo in a directory
    Batch {
        dir: PathBuf,
        /// Output directory for readings.csv and readings.jsonl
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Locate Tesseract and download trained data if missing
    Setup,
}

fn exit_code(err: &ExtractError) -> ExitCode {
    match err.http_status() {
        400 => ExitCode::from(2),
        _ => ExitCode::FAILURE,
    }
}

fn print_json(value: &serde_json::Value, pretty: bool) {
    let body = if pretty {
        serde_json::to_string_pretty(value)
    } else {
        serde_json::to_string(value)
    };
    match body {
        Ok(body) => println!("{}", body),
        Err(e) => error!("Failed to serialize output: {}", e),
    }
}

fn run_extract(image: &Path, pretty: bool) -> ExitCode {
    let bytes = match fs::read(image) {
        Ok(bytes) => Some(bytes),
        Err(e) => {
            error!("Failed to read {}: {}", image.display(), e);
            None
        }
    };

    match gauge_readout::extract_readings(bytes.as_deref()) {
        Ok(output) => match serde_json::to_value(&output) {
            Ok(value) => {
                print_json(&value, pretty);
                ExitCode::SUCCESS
            }
            Err(e) => {
                error!("Failed to serialize output: {}", e);
                ExitCode::FAILURE
            }
        },
        Err(e) => {
            error!("Extraction failed: {}", e);
            print_json(&json!({ "error": e.public_message() }), pretty);
            exit_code(&e)
        }
    }
}

fn run_batch_command(dir: &Path, output: Option<PathBuf>) -> ExitCode {
    let output = output.unwrap_or_else(|| dir.join("readings"));
    let extractor = match gauge_readout::shared_extractor() {
        Ok(x) => x,
        Err(e) => {
            error!("{}", e);
            return ExitCode::FAILURE;
        }
    };

    match run_batch(dir, &output, extractor) {
        Ok(summary) => {
            println!(
                "{} processed, {} failed. Results in {}",
                summary.processed,
                summary.failed,
                output.display()
            );
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("Batch failed: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

fn run_setup() -> ExitCode {
    match ensure_tesseract(&get_config().tesseract) {
        Ok(paths) => {
            info!("Executable: {}", paths.executable.display());
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("Setup failed: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

fn main() -> ExitCode {
    install_panic_hook();
    let cli = Cli::parse();

    if let Err(e) = ensure_directories() {
        eprintln!("Failed to create directories: {}", e);
    }
    init_logging(&get_logs_dir(), &cli.log_level);

    let config_path = cli.config.clone().unwrap_or_else(get_config_path);
    init_config(&config_path);

    match cli.command {
        Command::Extract { image, pretty } => run_extract(&image, pretty),
        Command::Batch { dir, output } => run_batch_command(&dir, output),
        Command::Setup => run_setup(),
    }
}
