//! Rotation hypotheses and candidate selection.
//!
//! Each branch recognizes its image under several rotations and keeps one
//! candidate. Which one is "best" is decided by a `CandidateRanker`, so the
//! text-length proxy can be replaced by a real engine confidence without
//! touching the pipeline.

use image::{GrayImage, imageops};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A clockwise quarter-turn applied before recognition.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u16", into = "u16")]
pub enum Rotation {
    Deg0,
    Deg90,
    Deg180,
    Deg270,
}

impl Rotation {
    pub fn degrees(self) -> u16 {
        match self {
            Rotation::Deg0 => 0,
            Rotation::Deg90 => 90,
            Rotation::Deg180 => 180,
            Rotation::Deg270 => 270,
        }
    }

    /// Rotates `img` clockwise by this amount.
    pub fn apply(self, img: &GrayImage) -> GrayImage {
        match self {
            Rotation::Deg0 => img.clone(),
            Rotation::Deg90 => imageops::rotate90(img),
            Rotation::Deg180 => imageops::rotate180(img),
            Rotation::Deg270 => imageops::rotate270(img),
        }
    }
}

impl TryFrom<u16> for Rotation {
    type Error = String;

    fn try_from(degrees: u16) -> Result<Self, Self::Error> {
        match degrees {
            0 => Ok(Rotation::Deg0),
            90 => Ok(Rotation::Deg90),
            180 => Ok(Rotation::Deg180),
            270 => Ok(Rotation::Deg270),
            other => Err(format!("unsupported rotation {} (expected 0, 90, 180 or 270)", other)),
        }
    }
}

impl From<Rotation> for u16 {
    fn from(rotation: Rotation) -> u16 {
        rotation.degrees()
    }
}

impl fmt::Display for Rotation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}°", self.degrees())
    }
}

/// Text recognized under one rotation hypothesis.
#[derive(Debug, Clone, PartialEq)]
pub struct OcrCandidate {
    pub rotation: Rotation,
    pub text: String,
    /// Mean word confidence reported by the engine (0-100), if any words were found
    pub confidence: Option<f32>,
}

impl OcrCandidate {
    pub fn trimmed(&self) -> &str {
        self.text.trim()
    }
}

/// Orders candidates of one branch. Higher scores win.
pub trait CandidateRanker: Send + Sync {
    fn name(&self) -> &str;

    /// Score for a candidate with non-empty trimmed text.
    fn score(&self, candidate: &OcrCandidate) -> f32;
}

/// Ranks by trimmed text length.
///
/// This is a confidence proxy only: a longer string is not a more accurate
/// one, it just means the engine found more glyphs under that rotation.
#[derive(Debug, Clone, Copy, Default)]
pub struct LongestText;

impl CandidateRanker for LongestText {
    fn name(&self) -> &str {
        "longest-text"
    }

    fn score(&self, candidate: &OcrCandidate) -> f32 {
        candidate.trimmed().chars().count() as f32
    }
}

/// Ranks by the engine's mean word confidence.
#[derive(Debug, Clone, Copy, Default)]
pub struct EngineConfidence;

impl CandidateRanker for EngineConfidence {
    fn name(&self) -> &str {
        "engine-confidence"
    }

    fn score(&self, candidate: &OcrCandidate) -> f32 {
        candidate.confidence.unwrap_or(0.0)
    }
}

/// Picks the best candidate with non-empty trimmed text.
///
/// Candidates are expected in configured rotation order; on equal scores the
/// earlier one is kept.
pub fn select_best<'a>(
    candidates: &'a [OcrCandidate],
    ranker: &dyn CandidateRanker,
) -> Option<&'a OcrCandidate> {
    let mut best: Option<(&OcrCandidate, f32)> = None;

    for candidate in candidates.iter().filter(|c| !c.trimmed().is_empty()) {
        let score = ranker.score(candidate);
        match best {
            Some((_, best_score)) if score <= best_score => {}
            _ => best = Some((candidate, score)),
        }
    }

    best.map(|(candidate, _)| candidate)
}
