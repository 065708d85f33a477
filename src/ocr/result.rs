//! Extraction results and their JSON shape.

use serde::Serialize;

/// Outcome for one field. Serializes as the bare number or `null`.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
#[serde(into = "Option<f64>")]
pub struct FieldResult {
    /// Always inside the field's physical range when present
    pub value: Option<f64>,
    /// True when the value was read next to its unit marker
    pub unit_validated: bool,
    /// Cascade stage that produced the value
    pub resolved_by: Option<&'static str>,
}

impl FieldResult {
    pub fn absent() -> Self {
        Self::default()
    }

    pub fn resolved(value: f64, unit_validated: bool, stage: &'static str) -> Self {
        Self {
            value: Some(value),
            unit_validated,
            resolved_by: Some(stage),
        }
    }

    pub fn is_present(&self) -> bool {
        self.value.is_some()
    }
}

impl From<FieldResult> for Option<f64> {
    fn from(result: FieldResult) -> Self {
        result.value
    }
}

/// Cleaned text kept for operator debugging.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RawText {
    pub txt_temp: String,
    pub txt_angle: String,
    pub txt_depth: String,
    pub full_text: String,
}

/// Everything returned for one photo. Absent readings are `null`, never
/// omitted.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct ExtractionOutput {
    pub depth: FieldResult,
    pub temperature: FieldResult,
    pub angle: FieldResult,
    pub raw: RawText,
}

impl ExtractionOutput {
    /// Number of fields that produced a value.
    pub fn resolved_count(&self) -> usize {
        [&self.depth, &self.temperature, &self.angle]
            .iter()
            .filter(|f| f.is_present())
            .count()
    }
}

/// Combines the per-field results and diagnostic text.
pub fn assemble(
    temperature: FieldResult,
    angle: FieldResult,
    depth: FieldResult,
    raw: RawText,
) -> ExtractionOutput {
    ExtractionOutput {
        depth,
        temperature,
        angle,
        raw,
    }
}
