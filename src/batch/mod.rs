//! Batch extraction over a directory of photos.
//!
//! The calling thread scans the directory and queues each photo; a worker
//! thread runs the pipeline and appends results to `readings.csv` and
//! `readings.jsonl` in the output directory.

pub mod csv_writer;
pub mod queue;
pub mod worker;

pub use queue::{WorkItem, create_work_queue};
pub use worker::{BatchSummary, run_batch_worker};

use anyhow::{Context, Result, anyhow};
use std::fs;
use std::path::{Path, PathBuf};
use std::thread;
use tracing::{info, warn};

use crate::ocr::Extractor;
use csv_writer::init_csv;

const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "webp", "bmp", "tif", "tiff"];

pub const CSV_FILE: &str = "readings.csv";
pub const JSONL_FILE: &str = "readings.jsonl";

fn is_image(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| IMAGE_EXTENSIONS.contains(&e.to_ascii_lowercase().as_str()))
        .unwrap_or(false)
}

/// Lists image files directly inside `dir`, sorted by path.
pub fn collect_images(dir: &Path) -> Result<Vec<PathBuf>> {
    let entries =
        fs::read_dir(dir).with_context(|| format!("Failed to read directory {}", dir.display()))?;

    let mut images: Vec<PathBuf> = entries
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| path.is_file() && is_image(path))
        .collect();
    images.sort();

    Ok(images)
}

/// Extracts readings from every image in `dir`.
pub fn run_batch(dir: &Path, output_dir: &Path, extractor: &Extractor) -> Result<BatchSummary> {
    let images = collect_images(dir)?;
    info!("Found {} images in {}", images.len(), dir.display());

    fs::create_dir_all(output_dir)
        .with_context(|| format!("Failed to create {}", output_dir.display()))?;
    let csv_path = output_dir.join(CSV_FILE);
    let jsonl_path = output_dir.join(JSONL_FILE);
    init_csv(&csv_path)?;

    let (sender, receiver) = create_work_queue();
    let (csv, jsonl) = (&csv_path, &jsonl_path);

    let summary = thread::scope(|s| {
        let worker = s.spawn(move || run_batch_worker(receiver, csv, jsonl, extractor));

        for (i, path) in images.into_iter().enumerate() {
            if sender.send(WorkItem::new(path, i as u32 + 1)).is_err() {
                warn!("Batch worker stopped early; remaining images not queued");
                break;
            }
        }
        drop(sender);

        worker.join().map_err(|_| anyhow!("Batch worker panicked"))
    })?;

    info!(
        "Batch complete: {} processed, {} failed. Results in {}",
        summary.processed,
        summary.failed,
        output_dir.display()
    );
    Ok(summary)
}
