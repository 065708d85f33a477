pub mod cleaner;
pub mod engine;
pub mod extract;
pub mod orientation;
pub mod preprocess;
pub mod result;
pub mod setup;

pub use cleaner::clean_text;
pub use engine::{OcrLine, OcrWord, RecognitionParams, TesseractCli, TextRecognizer};
pub use extract::{FieldCascade, NumericReconstructor};
pub use orientation::{CandidateRanker, EngineConfidence, LongestText, OcrCandidate, Rotation};
pub use result::{ExtractionOutput, FieldResult, RawText};
pub use setup::ensure_tesseract;

use image::{GrayImage, ImageBuffer, Rgba};
use std::thread;
use tracing::{debug, error, info, warn};

use crate::config::{ExtractorConfig, FieldKind};
use crate::error::ExtractError;
use crate::frame::{RawFrame, normalize};
use engine::{lines_to_text, mean_confidence};
use orientation::select_best;
use preprocess::{crop_region, prepare_for_ocr};

/// Photo → three readings.
///
/// Holds only shared read-only state, so one extractor can serve concurrent
/// requests. Each call owns its frame and branch images.
pub struct Extractor<'a> {
    config: &'a ExtractorConfig,
    recognizer: &'a dyn TextRecognizer,
    ranker: &'a dyn CandidateRanker,
    reconstructor: NumericReconstructor,
}

impl<'a> Extractor<'a> {
    pub fn new(
        config: &'a ExtractorConfig,
        recognizer: &'a dyn TextRecognizer,
    ) -> Result<Self, ExtractError> {
        Ok(Self {
            config,
            recognizer,
            ranker: &LongestText,
            reconstructor: NumericReconstructor::new()?,
        })
    }

    /// Replaces the rule that picks one candidate per branch.
    pub fn with_ranker(mut self, ranker: &'a dyn CandidateRanker) -> Self {
        self.ranker = ranker;
        self
    }

    /// Runs the whole pipeline on uploaded bytes.
    ///
    /// `None` or an empty buffer is rejected before any decoding. Every
    /// successful run returns all three fields, possibly absent.
    pub fn extract(&self, bytes: Option<&[u8]>) -> Result<ExtractionOutput, ExtractError> {
        let bytes = match bytes {
            Some(b) if !b.is_empty() => b,
            _ => return Err(ExtractError::MissingInput),
        };

        let frame = normalize(bytes)?;
        Ok(self.extract_frame(&frame))
    }

    /// Runs ROI and full-frame branches concurrently, then reconstructs
    /// each field from its branch text plus the full-frame text.
    pub fn extract_frame(&self, frame: &RawFrame) -> ExtractionOutput {
        info!(
            "Extracting readings from {}x{} frame (ranker: {})",
            frame.width,
            frame.height,
            self.ranker.name()
        );

        let (roi_texts, full_text) = thread::scope(|s| {
            let full_handle = s.spawn(|| self.read_full_frame(frame));
            let roi_handles: Vec<_> = FieldKind::ALL
                .iter()
                .map(|&field| (field, s.spawn(move || self.read_field(frame, field))))
                .collect();

            let roi_texts: Vec<(FieldKind, String)> = roi_handles
                .into_iter()
                .map(|(field, handle)| {
                    let text = handle.join().unwrap_or_else(|_| {
                        error!("{} branch panicked; treating as unreadable", field);
                        String::new()
                    });
                    (field, text)
                })
                .collect();

            let full_text = full_handle.join().unwrap_or_else(|_| {
                error!("Full-frame branch panicked; continuing without fallback text");
                String::new()
            });

            (roi_texts, full_text)
        });

        let text_for = |field: FieldKind| -> String {
            roi_texts
                .iter()
                .find(|(f, _)| *f == field)
                .map(|(_, t)| t.clone())
                .unwrap_or_default()
        };
        let txt_temp = text_for(FieldKind::Temperature);
        let txt_angle = text_for(FieldKind::Angle);
        let txt_depth = text_for(FieldKind::Depth);

        let temperature = self.resolve(FieldKind::Temperature, &txt_temp, &full_text);
        let angle = self.resolve(FieldKind::Angle, &txt_angle, &full_text);
        let depth = self.resolve(FieldKind::Depth, &txt_depth, &full_text);

        let output = result::assemble(
            temperature,
            angle,
            depth,
            RawText {
                txt_temp,
                txt_angle,
                txt_depth,
                full_text,
            },
        );

        info!(
            "Extraction complete: depth={:?} temperature={:?} angle={:?}",
            output.depth.value, output.temperature.value, output.angle.value
        );

        output
    }

    fn resolve(&self, field: FieldKind, roi_text: &str, full_text: &str) -> FieldResult {
        let result = self.reconstructor.resolve(field, roi_text, full_text);
        if !result.is_present() {
            warn!(
                "{} unresolved (roi text {:?}, full text {} chars)",
                field,
                roi_text,
                full_text.chars().count()
            );
        }
        result
    }

    /// ROI branch: crop the field's region and read it.
    fn read_field(&self, frame: &RawFrame, field: FieldKind) -> String {
        let Some(region) = self.config.region(field) else {
            warn!("No ROI configured for {}", field);
            return String::new();
        };

        let crop = crop_region(&frame.image, &region.rect);
        self.read_roi(&crop, field)
    }

    /// Reads one ROI crop under every configured rotation and returns the
    /// cleaned text of the best candidate.
    pub fn read_roi(&self, crop: &ImageBuffer<Rgba<u8>, Vec<u8>>, field: FieldKind) -> String {
        if crop.width() == 0 || crop.height() == 0 {
            debug!("{}: empty ROI crop", field);
            return String::new();
        }

        let whitelist = self
            .config
            .region(field)
            .map(|r| r.whitelist().to_string())
            .unwrap_or_else(|| field.default_whitelist().to_string());
        let params = RecognitionParams::field(&whitelist);

        let prepared = prepare_for_ocr(crop, self.config.roi_min_width, self.config.binarize_threshold);
        let candidates =
            self.recognize_rotations(&prepared, &self.config.roi_rotations, &params, field.name());

        self.best_text(&candidates, field.name())
    }

    /// Full-frame fallback branch, independent of ROI geometry.
    fn read_full_frame(&self, frame: &RawFrame) -> String {
        if frame.image.width() == 0 || frame.image.height() == 0 {
            return String::new();
        }

        let prepared = prepare_for_ocr(
            &frame.image,
            self.config.full_frame_min_width,
            self.config.binarize_threshold,
        );
        let candidates = self.recognize_rotations(
            &prepared,
            &self.config.full_frame_rotations,
            &RecognitionParams::full_frame(),
            "full-frame",
        );

        self.best_text(&candidates, "full-frame")
    }

    /// Tries each rotation in order. A failed engine call drops only that
    /// rotation's candidate.
    fn recognize_rotations(
        &self,
        img: &GrayImage,
        rotations: &[Rotation],
        params: &RecognitionParams,
        branch: &str,
    ) -> Vec<OcrCandidate> {
        let mut candidates = Vec::with_capacity(rotations.len());

        for &rotation in rotations {
            let rotated = rotation.apply(img);
            match self.recognizer.recognize(&rotated, params) {
                Ok(lines) => {
                    let candidate = OcrCandidate {
                        rotation,
                        text: lines_to_text(&lines),
                        confidence: mean_confidence(&lines),
                    };
                    debug!(
                        "{} @ {}: {:?} (conf {:?})",
                        branch, rotation, candidate.text, candidate.confidence
                    );
                    candidates.push(candidate);
                }
                Err(e) => {
                    warn!(
                        "{} @ {}: {} recognition failed: {}",
                        branch,
                        rotation,
                        self.recognizer.name(),
                        e
                    );
                }
            }
        }

        candidates
    }

    fn best_text(&self, candidates: &[OcrCandidate], branch: &str) -> String {
        match select_best(candidates, self.ranker) {
            Some(best) => {
                debug!("{}: selected {} candidate", branch, best.rotation);
                clean_text(&best.text)
            }
            None => String::new(),
        }
    }
}
