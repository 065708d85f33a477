//! Extraction worker for batch runs.
//!
//! Receives photo paths from the work queue, runs the pipeline on each and
//! appends the readings to the CSV and JSONL outputs.

use std::fs;
use std::path::Path;
use std::sync::mpsc::Receiver;
use tracing::{info, warn};

use crate::batch::csv_writer::{append_to_csv, append_to_jsonl};
use crate::batch::queue::WorkItem;
use crate::ocr::Extractor;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchSummary {
    pub processed: u32,
    pub failed: u32,
}

/// Runs the worker loop until the channel closes (sender dropped).
///
/// A photo that cannot be read or decoded is logged and skipped; the rest of
/// the batch continues.
pub fn run_batch_worker(
    receiver: Receiver<WorkItem>,
    csv_path: &Path,
    jsonl_path: &Path,
    extractor: &Extractor,
) -> BatchSummary {
    info!("Batch worker started");
    let mut summary = BatchSummary::default();

    loop {
        match receiver.recv() {
            Ok(item) => {
                info!(
                    "Batch worker: processing #{} ({})",
                    item.index,
                    item.image_path.display()
                );

                let bytes = match fs::read(&item.image_path) {
                    Ok(bytes) => bytes,
                    Err(e) => {
                        warn!("Batch worker: failed to read {}: {}", item.image_path.display(), e);
                        summary.failed += 1;
                        continue;
                    }
                };

                let output = match extractor.extract(Some(bytes.as_slice())) {
                    Ok(output) => output,
                    Err(e) => {
                        warn!("Batch worker: extraction failed for #{}: {}", item.index, e);
                        summary.failed += 1;
                        continue;
                    }
                };

                info!(
                    "#{}: depth={:?} temperature={:?} angle={:?}",
                    item.index, output.depth.value, output.temperature.value, output.angle.value
                );

                if let Err(e) = append_to_csv(csv_path, &item, &output) {
                    warn!("Batch worker: failed to write CSV for #{}: {}", item.index, e);
                }
                if let Err(e) = append_to_jsonl(jsonl_path, &item, &output) {
                    warn!("Batch worker: failed to write JSONL for #{}: {}", item.index, e);
                }

                summary.processed += 1;
            }
            Err(_) => {
                info!("Batch worker: channel closed, exiting");
                break;
            }
        }
    }

    info!(
        "Batch worker finished ({} processed, {} failed)",
        summary.processed, summary.failed
    );
    summary
}
