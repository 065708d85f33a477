//! Gauge Readout
//!
//! Reads depth, temperature and tilt angle from a photo of a handheld gauge
//! display. The photo is normalized, three fixed display regions are read
//! under several rotations alongside a full-frame fallback, and each field is
//! reconstructed through a cascade of increasingly permissive patterns gated
//! by the field's physical range.

pub mod batch;
pub mod config;
pub mod error;
pub mod frame;
pub mod logging;
pub mod ocr;
pub mod paths;

use std::sync::OnceLock;

pub use config::{ExtractorConfig, FieldKind, get_config, init_config};
pub use error::ExtractError;
pub use ocr::{ExtractionOutput, Extractor, FieldResult, TesseractCli, TextRecognizer};

static RECOGNIZER: OnceLock<TesseractCli> = OnceLock::new();
static EXTRACTOR: OnceLock<Extractor<'static>> = OnceLock::new();

/// Returns the process-wide extractor, locating Tesseract and compiling the
/// extraction patterns on first use. A failed lookup is not cached, so a
/// later call retries it.
pub fn shared_extractor() -> Result<&'static Extractor<'static>, ExtractError> {
    if let Some(extractor) = EXTRACTOR.get() {
        return Ok(extractor);
    }

    let config = get_config();
    let recognizer = match RECOGNIZER.get() {
        Some(recognizer) => recognizer,
        None => {
            let located = TesseractCli::from_config(&config.tesseract)
                .map_err(|e| ExtractError::EngineUnavailable(e.to_string()))?;
            RECOGNIZER.get_or_init(|| located)
        }
    };

    let extractor = Extractor::new(config, recognizer)?;
    Ok(EXTRACTOR.get_or_init(|| extractor))
}

/// Runs the pipeline with the process-wide config and the Tesseract CLI.
///
/// Missing input is rejected before the engine is located.
pub fn extract_readings(bytes: Option<&[u8]>) -> Result<ExtractionOutput, ExtractError> {
    let bytes = match bytes {
        Some(b) if !b.is_empty() => b,
        _ => return Err(ExtractError::MissingInput),
    };

    shared_extractor()?.extract(Some(bytes))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_input_needs_no_engine() {
        assert!(matches!(extract_readings(None), Err(ExtractError::MissingInput)));
        assert!(matches!(
            extract_readings(Some(&[0u8; 0][..])),
            Err(ExtractError::MissingInput)
        ));
    }

    #[test]
    fn test_shared_extractor_is_built_once() {
        match (shared_extractor(), shared_extractor()) {
            (Ok(first), Ok(second)) => assert!(std::ptr::eq(first, second)),
            // No Tesseract on this machine: nothing may be cached
            (Err(ExtractError::EngineUnavailable(_)), Err(ExtractError::EngineUnavailable(_))) => {
                assert!(EXTRACTOR.get().is_none());
                assert!(RECOGNIZER.get().is_none());
            }
            (first, second) => panic!(
                "inconsistent results: {:?} / {:?}",
                first.err(),
                second.err()
            ),
        }
    }
}
