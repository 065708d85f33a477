//! Errors surfaced by the extraction pipeline.
//!
//! Only these abort a request. Unreadable fields are not errors; they come
//! back as absent values in the `ExtractionOutput`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ExtractError {
    /// No image bytes were supplied; nothing was decoded.
    #[error("No image provided")]
    MissingInput,

    #[error("Failed to decode image: {0}")]
    Decode(#[from] image::ImageError),

    #[error("OCR engine unavailable: {0}")]
    EngineUnavailable(String),

    #[error("Invalid extraction pattern: {0}")]
    Pattern(#[from] regex::Error),
}

impl ExtractError {
    /// Status an HTTP collaborator should answer with.
    pub fn http_status(&self) -> u16 {
        match self {
            ExtractError::MissingInput => 400,
            _ => 500,
        }
    }

    /// Message safe to hand back to a client.
    pub fn public_message(&self) -> &'static str {
        match self {
            ExtractError::MissingInput => "No image provided",
            _ => "Failed to process image",
        }
    }
}
