//! Append-only result files for batch runs.
//!
//! Each write reopens the file in append mode, so rows already written
//! survive a crash partway through a batch.

use anyhow::{Context, Result};
use serde_json::json;
use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::Path;

use crate::batch::queue::WorkItem;
use crate::ocr::{ExtractionOutput, FieldResult};

pub const CSV_HEADER: &str = "index,timestamp,image,depth,temperature,angle";

/// Writes the header unless the file already has content.
pub fn init_csv(path: &Path) -> Result<()> {
    if path.exists() {
        let file = File::open(path).context("Failed to open existing CSV")?;
        if BufReader::new(file).lines().next().is_some() {
            return Ok(());
        }
    }

    let mut file = File::create(path).context("Failed to create CSV file")?;
    writeln!(file, "{}", CSV_HEADER).context("Failed to write CSV header")?;
    Ok(())
}

fn cell(result: &FieldResult) -> String {
    result.value.map(|v| v.to_string()).unwrap_or_default()
}

/// Quotes a path cell when it contains a separator or quote.
fn escape(field: &str) -> String {
    if field.contains([',', '"', '\n']) {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}

/// Appends one row. Absent readings are empty cells.
pub fn append_to_csv(path: &Path, item: &WorkItem, output: &ExtractionOutput) -> Result<()> {
    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .context("Failed to open CSV for append")?;

    let line = format!(
        "{},{},{},{},{},{}",
        item.index,
        item.queued_at.format("%Y-%m-%dT%H:%M:%S"),
        escape(&item.image_path.display().to_string()),
        cell(&output.depth),
        cell(&output.temperature),
        cell(&output.angle),
    );

    writeln!(file, "{}", line).context("Failed to write CSV row")?;
    Ok(())
}

/// Appends the full output, raw text included, as one JSON line.
pub fn append_to_jsonl(path: &Path, item: &WorkItem, output: &ExtractionOutput) -> Result<()> {
    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .context("Failed to open JSONL for append")?;

    let record = json!({
        "index": item.index,
        "timestamp": item.queued_at.to_rfc3339(),
        "image": item.image_path.display().to_string(),
        "result": output,
    });

    writeln!(file, "{}", serde_json::to_string(&record)?).context("Failed to write JSONL row")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use tempfile::tempdir;

    fn sample_output() -> ExtractionOutput {
        ExtractionOutput {
            depth: FieldResult::resolved(-1.25, true, "roi-anchored"),
            temperature: FieldResult::resolved(32.0, true, "roi-anchored"),
            angle: FieldResult::absent(),
            ..ExtractionOutput::default()
        }
    }

    #[test]
    fn test_init_csv_creates_header() {
        let dir = tempdir().unwrap();
        let csv_path = dir.path().join("results.csv");

        init_csv(&csv_path).unwrap();

        let content = std::fs::read_to_string(&csv_path).unwrap();
        assert!(content.starts_with(CSV_HEADER));
    }

    #[test]
    fn test_init_csv_preserves_existing() {
        let dir = tempdir().unwrap();
        let csv_path = dir.path().join("results.csv");
        std::fs::write(&csv_path, "existing,data\n1,2,3\n").unwrap();

        init_csv(&csv_path).unwrap();

        let content = std::fs::read_to_string(&csv_path).unwrap();
        assert!(content.starts_with("existing,data"));
    }

    #[test]
    fn test_absent_reading_is_empty_cell() {
        let dir = tempdir().unwrap();
        let csv_path = dir.path().join("results.csv");
        init_csv(&csv_path).unwrap();

        let item = WorkItem::new(PathBuf::from("photos/001.jpg"), 1);
        append_to_csv(&csv_path, &item, &sample_output()).unwrap();

        let content = std::fs::read_to_string(&csv_path).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[1].starts_with("1,"));
        assert!(lines[1].ends_with("photos/001.jpg,-1.25,32,"));
    }

    #[test]
    fn test_path_with_comma_is_quoted() {
        assert_eq!(escape("a,b.jpg"), "\"a,b.jpg\"");
        assert_eq!(escape("plain.jpg"), "plain.jpg");
        assert_eq!(escape("x,\"y\".jpg"), "\"x,\"\"y\"\".jpg\"");
    }

    #[test]
    fn test_jsonl_keeps_full_output() {
        let dir = tempdir().unwrap();
        let jsonl_path = dir.path().join("results.jsonl");

        for i in 1..=2 {
            let item = WorkItem::new(PathBuf::from(format!("{}.png", i)), i);
            append_to_jsonl(&jsonl_path, &item, &sample_output()).unwrap();
        }

        let content = std::fs::read_to_string(&jsonl_path).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 2);

        let record: serde_json::Value = serde_json::from_str(lines[1]).unwrap();
        assert_eq!(record["index"], 2);
        assert_eq!(record["result"]["depth"], -1.25);
        assert!(record["result"]["angle"].is_null());
        assert_eq!(record["result"]["raw"]["txtTemp"], "");
    }
}
