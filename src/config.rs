//! Extractor configuration.
//!
//! Loads settings from config.json at startup. Provides the ROI table for the
//! supported device display, per-field character whitelists, preprocessing
//! parameters, rotation search sets and Tesseract settings.
//!
//! The configuration is installed once into a process-wide `OnceLock` and is
//! read-only afterwards, so concurrent extractions share it without locking.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use tracing::{info, warn};

use crate::ocr::orientation::Rotation;

/// Global configuration instance, initialized once at startup.
static CONFIG: OnceLock<ExtractorConfig> = OnceLock::new();

/// One of the three readings shown on the device display.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldKind {
    Temperature,
    Angle,
    Depth,
}

impl FieldKind {
    /// All fields, in the order their branches are spawned.
    pub const ALL: [FieldKind; 3] = [FieldKind::Temperature, FieldKind::Angle, FieldKind::Depth];

    pub fn name(self) -> &'static str {
        match self {
            FieldKind::Temperature => "temperature",
            FieldKind::Angle => "angle",
            FieldKind::Depth => "depth",
        }
    }

    /// Inclusive physical range a reading must fall in to be reported.
    pub fn range(self) -> (f64, f64) {
        match self {
            FieldKind::Temperature => (10.0, 60.0),
            FieldKind::Angle => (-15.0, 15.0),
            FieldKind::Depth => (-30.0, 30.0),
        }
    }

    pub fn in_range(self, value: f64) -> bool {
        let (min, max) = self.range();
        value.is_finite() && value >= min && value <= max
    }

    /// Character whitelist used when the field's config entry has none.
    pub fn default_whitelist(self) -> &'static str {
        match self {
            FieldKind::Temperature => "0123456789.-°C",
            FieldKind::Angle => "0123456789.-%°",
            FieldKind::Depth => "0123456789.-m",
        }
    }
}

impl fmt::Display for FieldKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A rectangle in relative coordinates (0.0 to 1.0).
/// Used for defining display regions that scale with photo size.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct RelativeRect {
    /// X position of top-left corner (0.0 = left edge, 1.0 = right edge)
    pub x: f32,
    /// Y position of top-left corner (0.0 = top edge, 1.0 = bottom edge)
    pub y: f32,
    /// Width as fraction of frame width
    pub width: f32,
    /// Height as fraction of frame height
    pub height: f32,
}

impl RelativeRect {
    pub const fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self { x, y, width, height }
    }
}

/// Region of the display that holds one field's digits.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RoiBox {
    pub field: FieldKind,
    pub rect: RelativeRect,
    /// Characters the engine may emit for this field
    #[serde(default)]
    pub whitelist: Option<String>,
}

impl RoiBox {
    pub fn whitelist(&self) -> &str {
        self.whitelist
            .as_deref()
            .unwrap_or_else(|| self.field.default_whitelist())
    }
}

/// Settings for the Tesseract command line engine.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct TesseractConfig {
    /// Explicit path to the tesseract executable
    pub executable: Option<PathBuf>,
    /// Explicit tessdata directory
    pub tessdata_dir: Option<PathBuf>,
    /// Trained data language
    pub language: String,
}

impl Default for TesseractConfig {
    fn default() -> Self {
        Self {
            executable: None,
            tessdata_dir: None,
            language: "eng".to_string(),
        }
    }
}

/// Complete extractor configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractorConfig {
    /// ROI table, one entry per field
    pub regions: Vec<RoiBox>,
    /// Rotations tried for every ROI crop
    pub roi_rotations: Vec<Rotation>,
    /// Rotations tried for the full-frame fallback
    pub full_frame_rotations: Vec<Rotation>,
    /// ROI crops narrower than this are upscaled
    pub roi_min_width: u32,
    /// Full frame narrower than this is upscaled
    pub full_frame_min_width: u32,
    /// Gray level at or above which a pixel becomes white background
    pub binarize_threshold: u8,
    pub tesseract: TesseractConfig,
}

impl Default for ExtractorConfig {
    fn default() -> Self {
        Self {
            regions: vec![
                RoiBox {
                    field: FieldKind::Temperature,
                    rect: RelativeRect::new(0.08, 0.16, 0.42, 0.16),
                    whitelist: None,
                },
                RoiBox {
                    field: FieldKind::Angle,
                    rect: RelativeRect::new(0.52, 0.16, 0.40, 0.16),
                    whitelist: None,
                },
                RoiBox {
                    field: FieldKind::Depth,
                    rect: RelativeRect::new(0.15, 0.38, 0.70, 0.22),
                    whitelist: None,
                },
            ],
            roi_rotations: vec![Rotation::Deg0, Rotation::Deg90, Rotation::Deg270],
            full_frame_rotations: vec![
                Rotation::Deg0,
                Rotation::Deg90,
                Rotation::Deg180,
                Rotation::Deg270,
            ],
            roi_min_width: 600,
            full_frame_min_width: 1400,
            binarize_threshold: 160,
            tesseract: TesseractConfig::default(),
        }
    }
}

impl ExtractorConfig {
    /// Returns the ROI entry for a field, if the table has one.
    pub fn region(&self, field: FieldKind) -> Option<&RoiBox> {
        self.regions.iter().find(|r| r.field == field)
    }
}

/// Loads configuration from `path` or returns defaults.
pub fn load_config(path: &Path) -> ExtractorConfig {
    info!("Looking for config at: {}", path.display());

    if !path.exists() {
        info!("{} not found. Using default config.", path.display());
        return ExtractorConfig::default();
    }

    match fs::read_to_string(path) {
        Ok(contents) => match serde_json::from_str(&contents) {
            Ok(config) => {
                info!("Config loaded from {}", path.display());
                config
            }
            Err(e) => {
                warn!("Failed to parse {}: {}. Using defaults.", path.display(), e);
                ExtractorConfig::default()
            }
        },
        Err(e) => {
            warn!("Failed to read {}: {}. Using defaults.", path.display(), e);
            ExtractorConfig::default()
        }
    }
}

/// Initializes the global configuration. Call once at startup.
///
/// Later calls, and calls after `get_config()` installed the defaults, are
/// ignored so every request keeps seeing the same table.
pub fn init_config(path: &Path) {
    if CONFIG.set(load_config(path)).is_err() {
        warn!("Config already initialized; ignoring {}", path.display());
    }
}

/// Returns a reference to the global configuration, installing defaults
/// if `init_config()` was never called.
pub fn get_config() -> &'static ExtractorConfig {
    CONFIG.get_or_init(ExtractorConfig::default)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_default_table_covers_every_field() {
        let config = ExtractorConfig::default();
        for field in FieldKind::ALL {
            let region = config.region(field).expect("missing region");
            assert!(region.rect.x + region.rect.width <= 1.0);
            assert!(region.rect.y + region.rect.height <= 1.0);
        }
    }

    #[test]
    fn test_field_ranges() {
        assert!(FieldKind::Temperature.in_range(10.0));
        assert!(FieldKind::Temperature.in_range(60.0));
        assert!(!FieldKind::Temperature.in_range(9.9));
        assert!(FieldKind::Angle.in_range(-15.0));
        assert!(!FieldKind::Angle.in_range(15.1));
        assert!(FieldKind::Depth.in_range(-30.0));
        assert!(!FieldKind::Depth.in_range(30.5));
        assert!(!FieldKind::Depth.in_range(f64::NAN));
    }

    #[test]
    fn test_whitelist_falls_back_to_field_default() {
        let config = ExtractorConfig::default();
        let depth = config.region(FieldKind::Depth).unwrap();
        assert_eq!(depth.whitelist(), "0123456789.-m");

        let custom = RoiBox {
            field: FieldKind::Depth,
            rect: RelativeRect::new(0.0, 0.0, 1.0, 1.0),
            whitelist: Some("0123456789".to_string()),
        };
        assert_eq!(custom.whitelist(), "0123456789");
    }

    #[test]
    fn test_load_config_missing_file_uses_defaults() {
        let dir = tempdir().unwrap();
        let config = load_config(&dir.path().join("config.json"));
        assert_eq!(config.roi_min_width, 600);
        assert_eq!(config.regions.len(), 3);
    }

    #[test]
    fn test_load_config_partial_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(
            &path,
            r#"{ "binarize_threshold": 140, "roi_rotations": [0, 180], "tesseract": { "language": "deu" } }"#,
        )
        .unwrap();

        let config = load_config(&path);
        assert_eq!(config.binarize_threshold, 140);
        assert_eq!(config.roi_rotations, vec![Rotation::Deg0, Rotation::Deg180]);
        assert_eq!(config.tesseract.language, "deu");
        // Untouched fields keep their defaults
        assert_eq!(config.full_frame_rotations.len(), 4);
        assert_eq!(config.roi_min_width, 600);
    }

    #[test]
    fn test_load_config_malformed_file_uses_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, "{ not json").unwrap();

        let config = load_config(&path);
        assert_eq!(config.binarize_threshold, 160);
    }

    #[test]
    fn test_load_config_rejects_unknown_rotation() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{ "roi_rotations": [45] }"#).unwrap();

        let config = load_config(&path);
        assert_eq!(config.roi_rotations, ExtractorConfig::default().roi_rotations);
    }
}
