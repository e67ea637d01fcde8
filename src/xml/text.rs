//! Text sanitation for metadata values.
//!
//! Catalog text arrives with two recurring defects: control characters that
//! are illegal in XML 1.0, and UTF-8 sequences that were read as Latin-1
//! somewhere upstream (mojibake). Both are repaired here before any value
//! reaches a metadata writer.

/// Mojibake sequences seen in upstream catalogs, with their intended
/// characters. Ordered longest-first so multi-byte sequences win.
const MOJIBAKE_REPAIRS: &[(&str, &str)] = &[
    ("\u{00e2}\u{20ac}\u{2122}", "\u{2019}"), // â€™ right single quote
    ("\u{00e2}\u{20ac}\u{0153}", "\u{201c}"), // â€œ left double quote
    ("\u{00e2}\u{20ac}\u{009d}", "\u{201d}"), // â€\x9d right double quote
    ("\u{00e2}\u{20ac}\u{201c}", "\u{2013}"), // â€“ en dash
    ("\u{00e2}\u{20ac}\u{201d}", "\u{2014}"), // â€” em dash
    ("\u{00e2}\u{20ac}\u{00a6}", "\u{2026}"), // â€¦ ellipsis
    ("\u{00c3}\u{00a9}", "\u{00e9}"),         // Ã© e acute
    ("\u{00c3}\u{00a8}", "\u{00e8}"),         // Ã¨ e grave
    ("\u{00c3}\u{00a4}", "\u{00e4}"),         // Ã¤ a umlaut
    ("\u{00c3}\u{00b6}", "\u{00f6}"),         // Ã¶ o umlaut
    ("\u{00c3}\u{00bc}", "\u{00fc}"),         // Ã¼ u umlaut
    ("\u{00c3}\u{00a7}", "\u{00e7}"),         // Ã§ c cedilla
    ("\u{00c3}\u{00b1}", "\u{00f1}"),         // Ã± n tilde
];

/// Check whether a character is legal in XML 1.0.
fn is_xml_char(c: char) -> bool {
    matches!(c,
        '\u{09}' | '\u{0A}' | '\u{0D}'
        | '\u{20}'..='\u{D7FF}'
        | '\u{E000}'..='\u{FFFD}'
        | '\u{10000}'..='\u{10FFFF}')
}

/// Strip characters outside the XML-legal ranges.
#[must_use]
pub fn strip_illegal_chars(text: &str) -> String {
    text.chars().filter(|c| is_xml_char(*c)).collect()
}

/// Repair common UTF-8-read-as-Latin-1 corruption.
#[must_use]
pub fn repair_mojibake(text: &str) -> String {
    // Cheap pre-check: every corrupt sequence starts with â or Ã.
    if !text.contains('\u{00e2}') && !text.contains('\u{00c3}') {
        return text.to_string();
    }

    let mut result = text.to_string();
    for (corrupt, intended) in MOJIBAKE_REPAIRS {
        if result.contains(corrupt) {
            result = result.replace(corrupt, intended);
        }
    }
    result
}

/// Full sanitation pass applied to every text value before writing.
#[must_use]
pub fn sanitize(text: &str) -> String {
    repair_mojibake(&strip_illegal_chars(text))
}
