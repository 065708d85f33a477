use regex::Regex;
use tracing::{debug, info};

use super::result::FieldResult;
use crate::config::FieldKind;

/// Anchored patterns: a whole number immediately followed by the field's
/// unit. The leading group keeps a match from starting inside a longer
/// digit run, so `125m` is not read as `25m`. Signs are detected from the
/// surrounding text, as for every other strategy.
const TEMPERATURE_ANCHORED: &str = r"(?:^|[^0-9.])(\d{1,2}(?:\.\d{1,2})?)°C";
const ANGLE_ANCHORED: &str = r"(?:^|[^0-9.])(\d{1,2}(?:\.\d{1,2})?)[%°]";
const DEPTH_ANCHORED: &str = r"(?:^|[^0-9.])(\d{1,2}(?:\.\d{1,3})?)m";

/// Broad patterns: optional whitespace before the unit and alternate unit
/// glyphs. `0` is accepted as a degree glyph and `de9` as `deg` because the
/// cleaner has already turned `o` and `g` into digits.
const TEMPERATURE_BROAD: &str = r#"(?:^|[^0-9.])(\d{1,2}(?:\.\d{1,2})?)\s*(?:°|0|\*|'|")?\s*[Cc]"#;
const ANGLE_BROAD: &str = r"(?:^|[^0-9.])(\d{1,2}(?:\.\d{1,2})?)\s*(?:%|°|\*|de[g9])";
const DEPTH_BROAD: &str = r"(?:^|[^0-9.])(\d{1,2}(?:\.\d{1,3})?)\s*[mM]";

/// Characters accepted as a minus sign in front of a number.
const MINUS_LIKE: &[char] = &['-', '~', '_'];

/// How far before a number a minus sign may sit, in characters.
const SIGN_LOOKBEHIND: usize = 2;

/// Digit-count convention of the display for one field.
///
/// The first `digits` digits of the text are taken; the first `int_digits`
/// of those form the integer part and the rest the fraction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DigitLayout {
    pub digits: usize,
    pub int_digits: usize,
}

impl DigitLayout {
    pub fn for_field(field: FieldKind) -> Self {
        match field {
            // "45" -> 45
            FieldKind::Temperature => DigitLayout { digits: 2, int_digits: 2 },
            // "035" -> 3.5, "125" -> 12.5
            FieldKind::Angle => DigitLayout { digits: 3, int_digits: 2 },
            // "125" -> 1.25
            FieldKind::Depth => DigitLayout { digits: 3, int_digits: 1 },
        }
    }

    /// Rebuilds an unsigned value from a digit-only string.
    pub fn reconstruct(&self, digits: &str) -> Option<f64> {
        if digits.len() < self.digits || !digits.chars().all(|c| c.is_ascii_digit()) {
            return None;
        }
        let run = &digits[..self.digits];
        let (int_part, frac_part) = run.split_at(self.int_digits);
        let literal = if frac_part.is_empty() {
            int_part.to_string()
        } else {
            format!("{}.{}", int_part, frac_part)
        };
        literal.parse().ok()
    }
}

/// True when a minus-like character sits just before `byte_index`,
/// ignoring whitespace in between.
fn minus_precedes(text: &str, byte_index: usize) -> bool {
    text[..byte_index]
        .chars()
        .rev()
        .filter(|c| !c.is_whitespace())
        .take(SIGN_LOOKBEHIND)
        .any(|c| MINUS_LIKE.contains(&c))
}

fn apply_sign(text: &str, byte_index: usize, value: f64, signed: bool) -> f64 {
    if signed && minus_precedes(text, byte_index) { -value } else { value }
}

fn normalize_zero(value: f64) -> f64 {
    if value == 0.0 { 0.0 } else { value }
}

/// One way of turning text into a candidate value.
#[derive(Debug, Clone)]
pub enum Strategy {
    /// First whole number directly adjacent to the unit marker
    Anchored { pattern: Regex, signed: bool },
    /// Digits only, decimal point placed by the display convention
    FixedWidth { layout: DigitLayout, signed: bool },
    /// Every loose unit match, scanned left to right
    BroadScan { pattern: Regex, signed: bool },
}

impl Strategy {
    /// Returns a candidate for `field`, or `None` when this strategy finds
    /// nothing usable.
    ///
    /// `Anchored` and `FixedWidth` produce a single candidate which the
    /// cascade range-checks. `BroadScan` keeps looking past out-of-range
    /// matches since it is the last resort.
    pub fn try_extract(&self, text: &str, field: FieldKind) -> Option<f64> {
        match self {
            Strategy::Anchored { pattern, signed } => {
                let m = pattern.captures(text)?.get(1)?;
                let value: f64 = m.as_str().parse().ok()?;
                Some(apply_sign(text, m.start(), value, *signed))
            }

            Strategy::FixedWidth { layout, signed } => {
                let first_digit = text.find(|c: char| c.is_ascii_digit())?;
                let digits: String = text.chars().filter(|c| c.is_ascii_digit()).collect();
                let value = layout.reconstruct(&digits)?;
                Some(apply_sign(text, first_digit, value, *signed))
            }

            Strategy::BroadScan { pattern, signed } => {
                pattern.captures_iter(text).find_map(|caps| {
                    let m = caps.get(1)?;
                    let value: f64 = m.as_str().parse().ok()?;
                    let value = apply_sign(text, m.start(), value, *signed);
                    field.in_range(value).then_some(value)
                })
            }
        }
    }

    /// Whether a value from this strategy was read next to its unit.
    pub fn checks_unit(&self) -> bool {
        !matches!(self, Strategy::FixedWidth { .. })
    }
}

/// Which text a stage reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextPool {
    /// Cleaned text of the field's own ROI
    Roi,
    /// ROI text followed by the full-frame fallback text
    Combined,
}

#[derive(Debug, Clone)]
pub struct Stage {
    pub name: &'static str,
    pub pool: TextPool,
    pub strategy: Strategy,
}

/// Ordered extraction stages for one field.
#[derive(Debug, Clone)]
pub struct FieldCascade {
    field: FieldKind,
    stages: Vec<Stage>,
}

impl FieldCascade {
    pub fn for_field(field: FieldKind) -> Result<Self, regex::Error> {
        let (anchored, broad, signed) = match field {
            FieldKind::Temperature => (TEMPERATURE_ANCHORED, TEMPERATURE_BROAD, false),
            FieldKind::Angle => (ANGLE_ANCHORED, ANGLE_BROAD, true),
            FieldKind::Depth => (DEPTH_ANCHORED, DEPTH_BROAD, true),
        };
        let anchored = Regex::new(anchored)?;
        let broad = Regex::new(broad)?;
        let layout = DigitLayout::for_field(field);

        let stages = vec![
            Stage {
                name: "roi-anchored",
                pool: TextPool::Roi,
                strategy: Strategy::Anchored {
                    pattern: anchored.clone(),
                    signed,
                },
            },
            Stage {
                name: "roi-fixed-width",
                pool: TextPool::Roi,
                strategy: Strategy::FixedWidth { layout, signed },
            },
            Stage {
                name: "combined-anchored",
                pool: TextPool::Combined,
                strategy: Strategy::Anchored {
                    pattern: anchored,
                    signed,
                },
            },
            Stage {
                name: "combined-fixed-width",
                pool: TextPool::Combined,
                strategy: Strategy::FixedWidth { layout, signed },
            },
            Stage {
                name: "broad-scan",
                pool: TextPool::Combined,
                strategy: Strategy::BroadScan { pattern: broad, signed },
            },
        ];

        Ok(Self { field, stages })
    }

    pub fn field(&self) -> FieldKind {
        self.field
    }

    pub fn stages(&self) -> &[Stage] {
        &self.stages
    }

    /// Runs the stages in order and returns the first in-range value.
    ///
    /// Both texts are expected to be cleaned already. Exhausting every stage
    /// gives an absent result, not an error.
    pub fn resolve(&self, roi_text: &str, full_text: &str) -> FieldResult {
        let combined = format!("{} {}", roi_text, full_text);
        let combined = combined.trim();

        for stage in &self.stages {
            let text = match stage.pool {
                TextPool::Roi => roi_text,
                TextPool::Combined => combined,
            };
            if text.is_empty() {
                continue;
            }

            let Some(value) = stage.strategy.try_extract(text, self.field) else {
                continue;
            };

            if !self.field.in_range(value) {
                debug!(
                    "{}: {} produced {} outside {:?}, discarded",
                    self.field,
                    stage.name,
                    value,
                    self.field.range()
                );
                continue;
            }

            let value = normalize_zero(value);
            info!("{}: {} resolved {}", self.field, stage.name, value);
            return FieldResult::resolved(value, stage.strategy.checks_unit(), stage.name);
        }

        FieldResult::absent()
    }
}

/// Cascades for all three fields, built once per extractor.
#[derive(Debug, Clone)]
pub struct NumericReconstructor {
    temperature: FieldCascade,
    angle: FieldCascade,
    depth: FieldCascade,
}

impl NumericReconstructor {
    pub fn new() -> Result<Self, regex::Error> {
        Ok(Self {
            temperature: FieldCascade::for_field(FieldKind::Temperature)?,
            angle: FieldCascade::for_field(FieldKind::Angle)?,
            depth: FieldCascade::for_field(FieldKind::Depth)?,
        })
    }

    pub fn cascade(&self, field: FieldKind) -> &FieldCascade {
        match field {
            FieldKind::Temperature => &self.temperature,
            FieldKind::Angle => &self.angle,
            FieldKind::Depth => &self.depth,
        }
    }

    pub fn resolve(&self, field: FieldKind, roi_text: &str, full_text: &str) -> FieldResult {
        self.cascade(field).resolve(roi_text, full_text)
    }
}
