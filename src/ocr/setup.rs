use anyhow::{Context, Result, anyhow};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::Command;
use tracing::{debug, info};

use crate::config::TesseractConfig;
use crate::paths::get_tessdata_dir;

const TESSDATA_REPO: &str = "https://github.com/tesseract-ocr/tessdata/raw/main";

/// Environment variable naming the tesseract executable.
pub const TESSERACT_CMD_ENV: &str = "TESSERACT_CMD";

const COMMON_EXECUTABLE_PATHS: &[&str] = &[
    "/usr/bin/tesseract",
    "/usr/local/bin/tesseract",
    "/opt/homebrew/bin/tesseract",
    r"C:\Program Files\Tesseract-OCR\tesseract.exe",
    r"C:\Program Files (x86)\Tesseract-OCR\tesseract.exe",
];

#[derive(Debug, Clone, PartialEq)]
pub struct TesseractPaths {
    pub executable: PathBuf,
    /// `None` lets the engine use its compiled-in tessdata location
    pub tessdata: Option<PathBuf>,
}

fn traineddata_file(language: &str) -> String {
    format!("{}.traineddata", language)
}

/// Returns true if `exe --version` runs successfully.
fn responds_to_version(exe: &Path) -> bool {
    Command::new(exe)
        .arg("--version")
        .output()
        .map(|output| output.status.success())
        .unwrap_or(false)
}

/// Finds the Tesseract executable: config, then `TESSERACT_CMD`, then PATH,
/// then common install locations.
pub fn find_tesseract_executable(config: &TesseractConfig) -> Result<PathBuf> {
    if let Some(exe) = &config.executable {
        if exe.exists() {
            return Ok(exe.clone());
        }
        return Err(anyhow!(
            "Configured tesseract executable not found: {}",
            exe.display()
        ));
    }

    if let Some(exe) = std::env::var_os(TESSERACT_CMD_ENV).filter(|v| !v.is_empty()) {
        return Ok(PathBuf::from(exe));
    }

    let on_path = PathBuf::from("tesseract");
    if responds_to_version(&on_path) {
        return Ok(on_path);
    }

    for path in COMMON_EXECUTABLE_PATHS {
        let p = PathBuf::from(path);
        if p.exists() {
            return Ok(p);
        }
    }

    Err(anyhow!("Tesseract not found. Please install Tesseract-OCR."))
}

/// Finds a tessdata directory holding `<language>.traineddata`.
///
/// Checks the configured directory, the local data directory and
/// `TESSDATA_PREFIX`. Returns `None` when none of them has the file, in
/// which case the engine falls back to its own default location.
pub fn find_tessdata_dir(config: &TesseractConfig) -> Option<PathBuf> {
    let file = traineddata_file(&config.language);

    let mut candidates: Vec<PathBuf> = Vec::new();
    if let Some(dir) = &config.tessdata_dir {
        candidates.push(dir.clone());
    }
    candidates.push(get_tessdata_dir());
    if let Ok(prefix) = std::env::var("TESSDATA_PREFIX") {
        let prefix = PathBuf::from(prefix);
        candidates.push(prefix.join("tessdata"));
        candidates.push(prefix);
    }

    candidates.into_iter().find(|dir| dir.join(&file).exists())
}

/// Resolves everything needed to run the engine.
pub fn locate_tesseract(config: &TesseractConfig) -> Result<TesseractPaths> {
    let executable = find_tesseract_executable(config)?;
    let tessdata = find_tessdata_dir(config);
    debug!(
        "Using tesseract at {} (tessdata: {:?})",
        executable.display(),
        tessdata
    );
    Ok(TesseractPaths {
        executable,
        tessdata,
    })
}

/// Ensures Tesseract is usable and the trained data for the configured
/// language is present. Downloads the trained data if necessary.
pub fn ensure_tesseract(config: &TesseractConfig) -> Result<TesseractPaths> {
    let executable = find_tesseract_executable(config)?;
    info!("Tesseract found at: {}", executable.display());

    let tessdata = match find_tessdata_dir(config) {
        Some(dir) => dir,
        None => {
            let dir = get_tessdata_dir();
            download_tessdata(&dir, &config.language)?;
            dir
        }
    };

    info!("Tesseract ready (tessdata: {})", tessdata.display());

    Ok(TesseractPaths {
        executable,
        tessdata: Some(tessdata),
    })
}

/// Downloads `<language>.traineddata` into `tessdata_dir`.
pub fn download_tessdata(tessdata_dir: &Path, language: &str) -> Result<()> {
    let file = traineddata_file(language);
    let url = format!("{}/{}", TESSDATA_REPO, file);
    let target = tessdata_dir.join(&file);

    fs::create_dir_all(tessdata_dir)
        .with_context(|| format!("Failed to create {}", tessdata_dir.display()))?;

    info!("Downloading {}...", file);

    let client = reqwest::blocking::Client::builder()
        .timeout(std::time::Duration::from_secs(300))
        .build()?;

    let response = client
        .get(&url)
        .header("User-Agent", "gauge-readout")
        .send()?;

    if !response.status().is_success() {
        return Err(anyhow!(
            "Failed to download {}: HTTP {}",
            file,
            response.status()
        ));
    }

    let bytes = response.bytes()?;
    let mut out = fs::File::create(&target)
        .with_context(|| format!("Failed to create {}", target.display()))?;
    out.write_all(&bytes)?;

    info!("Downloaded {} ({} bytes)", file, bytes.len());

    Ok(())
}
