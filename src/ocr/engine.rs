use anyhow::{Context, Result, anyhow};
use image::GrayImage;
use std::path::PathBuf;
use std::process::Command;
use tempfile::NamedTempFile;

use super::setup::{TesseractPaths, locate_tesseract};
use crate::config::TesseractConfig;

/// Represents a line of OCR text with confidence score
#[derive(Debug, Clone, PartialEq)]
pub struct OcrLine {
    pub text: String,
    pub words: Vec<OcrWord>,
    pub confidence: f32,
}

/// Represents a single word from OCR with confidence score
#[derive(Debug, Clone, PartialEq)]
pub struct OcrWord {
    pub text: String,
    pub confidence: f32,
}

/// Tesseract page segmentation modes used by the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageSegMode {
    /// Assume a single uniform block of text
    SingleBlock,
    /// Treat the image as a single text line
    SingleLine,
}

impl PageSegMode {
    fn as_arg(self) -> &'static str {
        match self {
            PageSegMode::SingleBlock => "6",
            PageSegMode::SingleLine => "7",
        }
    }
}

/// Per-call recognition settings.
#[derive(Debug, Clone, PartialEq)]
pub struct RecognitionParams {
    pub mode: PageSegMode,
    /// Restricts the characters the engine may output
    pub whitelist: Option<String>,
}

impl RecognitionParams {
    /// Single text line limited to one field's characters.
    pub fn field(whitelist: &str) -> Self {
        Self {
            mode: PageSegMode::SingleLine,
            whitelist: Some(whitelist.to_string()),
        }
    }

    /// Unrestricted block recognition for the full-frame fallback.
    pub fn full_frame() -> Self {
        Self {
            mode: PageSegMode::SingleBlock,
            whitelist: None,
        }
    }
}

/// Every OCR backend implements this.
///
/// Implementations must be callable from several branch threads at once.
/// A returned error only fails the single rotation attempt that made the call.
pub trait TextRecognizer: Send + Sync {
    fn name(&self) -> &str;
    fn recognize(&self, img: &GrayImage, params: &RecognitionParams) -> Result<Vec<OcrLine>>;
}

/// Joins recognized lines into one string.
pub fn lines_to_text(lines: &[OcrLine]) -> String {
    lines
        .iter()
        .map(|l| l.text.as_str())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Mean confidence over all words, `None` when nothing was recognized.
pub fn mean_confidence(lines: &[OcrLine]) -> Option<f32> {
    let confidences: Vec<f32> = lines
        .iter()
        .flat_map(|l| l.words.iter().map(|w| w.confidence))
        .collect();
    if confidences.is_empty() {
        None
    } else {
        Some(confidences.iter().sum::<f32>() / confidences.len() as f32)
    }
}

/// Runs the Tesseract executable once per recognition call.
#[derive(Debug, Clone)]
pub struct TesseractCli {
    executable: PathBuf,
    tessdata: Option<PathBuf>,
    language: String,
}

impl TesseractCli {
    pub fn new(paths: TesseractPaths, language: impl Into<String>) -> Self {
        Self {
            executable: paths.executable,
            tessdata: paths.tessdata,
            language: language.into(),
        }
    }

    /// Locates the executable and trained data according to `config`.
    pub fn from_config(config: &TesseractConfig) -> Result<Self> {
        let paths = locate_tesseract(config)?;
        Ok(Self::new(paths, config.language.clone()))
    }

    fn build_command(&self, input: &std::path::Path, params: &RecognitionParams) -> Command {
        let mut cmd = Command::new(&self.executable);
        cmd.arg(input).arg("stdout");
        if let Some(tessdata) = &self.tessdata {
            cmd.arg("--tessdata-dir").arg(tessdata);
        }
        cmd.arg("-l").arg(&self.language);
        cmd.arg("--psm").arg(params.mode.as_arg());
        if let Some(whitelist) = &params.whitelist {
            cmd.arg("-c")
                .arg(format!("tessedit_char_whitelist={}", whitelist));
        }
        cmd.arg("tsv");
        cmd
    }
}

impl TextRecognizer for TesseractCli {
    fn name(&self) -> &str {
        "tesseract"
    }

    /// Runs Tesseract on a preprocessed grayscale image.
    /// Returns structured output with lines and confidence scores.
    fn recognize(&self, img: &GrayImage, params: &RecognitionParams) -> Result<Vec<OcrLine>> {
        if img.width() == 0 || img.height() == 0 {
            return Ok(Vec::new());
        }

        // Save image to temporary file
        let temp_input = NamedTempFile::with_suffix(".png")?;
        img.save(temp_input.path())
            .context("Failed to write OCR input image")?;

        let output = self
            .build_command(temp_input.path(), params)
            .output()
            .with_context(|| format!("Failed to run {}", self.executable.display()))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(anyhow!("Tesseract failed: {}", stderr.trim()));
        }

        parse_tsv_output(&String::from_utf8_lossy(&output.stdout))
    }
}

/// Parses Tesseract TSV output into structured OcrLine data
pub fn parse_tsv_output(tsv: &str) -> Result<Vec<OcrLine>> {
    let mut lines: Vec<OcrLine> = Vec::new();
    let mut current_key: Option<(i32, i32, i32)> = None;
    let mut current_words: Vec<OcrWord> = Vec::new();

    for line in tsv.lines().skip(1) {
        // Skip header
        let fields: Vec<&str> = line.split('\t').collect();
        if fields.len() < 12 {
            continue;
        }

        // TSV fields: level, page_num, block_num, par_num, line_num, word_num,
        //             left, top, width, height, conf, text
        let level: i32 = fields[0].parse().unwrap_or(-1);
        let block_num: i32 = fields[2].parse().unwrap_or(-1);
        let par_num: i32 = fields[3].parse().unwrap_or(-1);
        let line_num: i32 = fields[4].parse().unwrap_or(-1);
        let conf: f32 = fields[10].trim().parse().unwrap_or(-1.0);
        let text = fields[11].trim();

        // Level 5 = word
        if level != 5 || text.is_empty() {
            continue;
        }

        // Line numbers restart in every block and paragraph
        let key = (block_num, par_num, line_num);
        if current_key != Some(key) {
            flush_line(&mut lines, &mut current_words);
            current_key = Some(key);
        }

        if conf >= 0.0 {
            current_words.push(OcrWord {
                text: text.to_string(),
                confidence: conf,
            });
        }
    }

    // Don't forget the last line
    flush_line(&mut lines, &mut current_words);

    Ok(lines)
}

fn flush_line(lines: &mut Vec<OcrLine>, words: &mut Vec<OcrWord>) {
    if words.is_empty() {
        return;
    }
    let words = std::mem::take(words);
    let confidence = words.iter().map(|w| w.confidence).sum::<f32>() / words.len() as f32;
    let text = words
        .iter()
        .map(|w| w.text.as_str())
        .collect::<Vec<_>>()
        .join(" ");
    lines.push(OcrLine {
        text,
        words,
        confidence,
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    const HEADER: &str =
        "level\tpage_num\tblock_num\tpar_num\tline_num\tword_num\tleft\ttop\twidth\theight\tconf\ttext";

    fn row(level: i32, block: i32, line: i32, word: i32, conf: f32, text: &str) -> String {
        format!(
            "{}\t1\t{}\t1\t{}\t{}\t0\t0\t10\t10\t{}\t{}",
            level, block, line, word, conf, text
        )
    }

    #[test]
    fn test_parse_tsv_single_line() {
        let tsv = [
            HEADER.to_string(),
            row(1, 0, 0, 0, -1.0, ""),
            row(4, 1, 1, 0, -1.0, ""),
            row(5, 1, 1, 1, 91.0, "32°C"),
            row(5, 1, 1, 2, 85.0, "12%"),
        ]
        .join("\n");

        let lines = parse_tsv_output(&tsv).unwrap();
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].text, "32°C 12%");
        assert_eq!(lines[0].words.len(), 2);
        assert!((lines[0].confidence - 88.0).abs() < 0.01);
    }

    #[test]
    fn test_parse_tsv_splits_lines_and_blocks() {
        let tsv = [
            HEADER.to_string(),
            row(5, 1, 1, 1, 90.0, "DEPTH"),
            row(5, 1, 2, 1, 80.0, "1.25m"),
            // New block restarts line numbering at 1
            row(5, 2, 1, 1, 70.0, "-3.5°"),
        ]
        .join("\n");

        let lines = parse_tsv_output(&tsv).unwrap();
        let texts: Vec<&str> = lines.iter().map(|l| l.text.as_str()).collect();
        assert_eq!(texts, vec!["DEPTH", "1.25m", "-3.5°"]);
    }

    #[test]
    fn test_parse_tsv_skips_empty_and_negative_confidence() {
        let tsv = [
            HEADER.to_string(),
            row(5, 1, 1, 1, -1.0, "ghost"),
            row(5, 1, 1, 2, 77.0, " "),
            row(5, 1, 1, 3, 66.0, "45"),
            "garbage row".to_string(),
        ]
        .join("\n");

        let lines = parse_tsv_output(&tsv).unwrap();
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].text, "45");
    }

    #[test]
    fn test_parse_tsv_empty_output() {
        assert!(parse_tsv_output("").unwrap().is_empty());
        assert!(parse_tsv_output(HEADER).unwrap().is_empty());
    }

    #[test]
    fn test_lines_to_text_and_confidence() {
        let lines = vec![
            OcrLine {
                text: "a b".into(),
                words: vec![
                    OcrWord { text: "a".into(), confidence: 50.0 },
                    OcrWord { text: "b".into(), confidence: 70.0 },
                ],
                confidence: 60.0,
            },
            OcrLine {
                text: "c".into(),
                words: vec![OcrWord { text: "c".into(), confidence: 90.0 }],
                confidence: 90.0,
            },
        ];
        assert_eq!(lines_to_text(&lines), "a b c");
        assert_eq!(mean_confidence(&lines), Some(70.0));
        assert_eq!(mean_confidence(&[]), None);
    }

    #[test]
    fn test_build_command_arguments() {
        let cli = TesseractCli::new(
            TesseractPaths {
                executable: PathBuf::from("tesseract"),
                tessdata: Some(PathBuf::from("/data/tessdata")),
            },
            "eng",
        );
        let cmd = cli.build_command(
            std::path::Path::new("in.png"),
            &RecognitionParams::field("0123456789.-m"),
        );
        let args: Vec<String> = cmd
            .get_args()
            .map(|a| a.to_string_lossy().into_owned())
            .collect();

        assert_eq!(args[0], "in.png");
        assert_eq!(args[1], "stdout");
        assert!(args.windows(2).any(|w| w == ["--psm", "7"]));
        assert!(args.windows(2).any(|w| w == ["--tessdata-dir", "/data/tessdata"]));
        assert!(args.contains(&"tessedit_char_whitelist=0123456789.-m".to_string()));
        assert_eq!(args.last().unwrap(), "tsv");
    }

    #[test]
    fn test_empty_image_skips_engine() {
        let cli = TesseractCli::new(
            TesseractPaths {
                executable: PathBuf::from("/nonexistent/tesseract"),
                tessdata: None,
            },
            "eng",
        );
        let img = GrayImage::new(0, 0);
        assert!(cli.recognize(&img, &RecognitionParams::full_frame()).unwrap().is_empty());
    }
}
