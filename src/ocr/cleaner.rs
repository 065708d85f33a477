//! OCR text cleanup.
//!
//! The display font is a seven-segment style face that Tesseract regularly
//! reads as letters. The substitution table maps those confusions back to
//! digits and normalizes sign and degree glyphs before numeric parsing.
//! The same table is applied to every field and to the full-frame text.

/// Ordered substitutions, applied first to last.
///
/// Unit letters that the extraction patterns rely on (`C`, `m`, `%`, `°`)
/// are deliberately absent.
pub const SUBSTITUTIONS: &[(char, char)] = &[
    ('O', '0'),
    ('o', '0'),
    ('D', '0'),
    ('Q', '0'),
    ('l', '1'),
    ('I', '1'),
    ('i', '1'),
    ('|', '1'),
    ('!', '1'),
    ('Z', '2'),
    ('z', '2'),
    ('S', '5'),
    ('s', '5'),
    ('G', '6'),
    ('b', '6'),
    ('T', '7'),
    ('B', '8'),
    ('g', '9'),
    ('q', '9'),
    (',', '.'),
    ('\u{2212}', '-'), // minus sign −
    ('\u{2013}', '-'), // en-dash –
    ('\u{2014}', '-'), // em-dash —
    ('\u{2010}', '-'), // hyphen ‐
    ('\u{00BA}', '°'), // masculine ordinal º
    ('\u{02DA}', '°'), // ring above ˚
];

fn substitute(c: char) -> char {
    SUBSTITUTIONS
        .iter()
        .find(|(from, _)| *from == c)
        .map(|(_, to)| *to)
        .unwrap_or(c)
}

/// Applies the substitution table and trims surrounding whitespace.
pub fn clean_text(text: &str) -> String {
    let mut cleaned = String::with_capacity(text.len());
    for c in text.chars() {
        // Single-glyph ℃ expands to the two-character marker
        if c == '\u{2103}' {
            cleaned.push_str("°C");
        } else {
            cleaned.push(substitute(c));
        }
    }
    cleaned.trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_letter_confusions() {
        assert_eq!(clean_text("3O°C"), "30°C");
        assert_eq!(clean_text("l2.5%"), "12.5%");
        assert_eq!(clean_text("I.S5m"), "1.55m");
        assert_eq!(clean_text("|8"), "18");
        assert_eq!(clean_text("Z7,4"), "27.4");
    }

    #[test]
    fn test_unit_markers_survive() {
        assert_eq!(clean_text("32°C"), "32°C");
        assert_eq!(clean_text("4.5%"), "4.5%");
        assert_eq!(clean_text("1.20m"), "1.20m");
    }

    #[test]
    fn test_sign_and_degree_glyphs() {
        assert_eq!(clean_text("\u{2212}3.5º"), "-3.5°");
        assert_eq!(clean_text("\u{2014}12˚"), "-12°");
        assert_eq!(clean_text("28\u{2103}"), "28°C");
    }

    #[test]
    fn test_trims_whitespace() {
        assert_eq!(clean_text("  45 \n"), "45");
        assert_eq!(clean_text(""), "");
    }
}
