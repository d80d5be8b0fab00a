//! Name normalization for geographic lookup
//!
//! - `normalize_name`: lowercase, trimmed, single-spaced (exact index key)
//! - `strip_matras`: Devanagari dependent vowel signs and modifiers removed
//! - `transliterate`: small static Devanagari → Latin table; unknown names
//!   pass through unchanged
//! - `fuzzy_variants`: the three forms above, de-duplicated

use once_cell::sync::Lazy;
use regex::Regex;
use sha2::{Digest, Sha256};

/// Substrings that mark a unit as urban
///
/// Approximation with no ground truth: "रामनगर" is classified urban too.
pub const URBAN_KEYWORDS: &[&str] = &[
    "नगर", "निगम", "पालिका", "वार्ड", "शहर", "nagar", "ward", "municipal", "city",
];

/// Upper bound for hash-derived ward numbers
pub const HASHED_WARD_COUNT: u32 = 70;

const TRANSLITERATIONS: &[(&str, &str)] = &[
    ("रायपुर", "raipur"),
    ("बिलासपुर", "bilaspur"),
    ("दुर्ग", "durg"),
    ("भिलाई", "bhilai"),
    ("कोरबा", "korba"),
    ("राजनांदगांव", "rajnandgaon"),
    ("अंबिकापुर", "ambikapur"),
    ("जगदलपुर", "jagdalpur"),
    ("रायगढ़", "raigarh"),
    ("धमतरी", "dhamtari"),
    ("महासमुंद", "mahasamund"),
    ("कवर्धा", "kawardha"),
    ("अभनपुर", "abhanpur"),
    ("आरंग", "arang"),
    ("तिल्दा", "tilda"),
    ("खरोरा", "kharora"),
    ("सोनपुर", "sonpur"),
];

static WARD_MARKER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)(?:वार्ड|ward)\s*(?:क्रमांक|नं\.?|no\.?)?\s*(?P<n>[0-9०-९]+)")
        .expect("ward marker pattern is valid")
});

/// Lowercase, trim and collapse internal whitespace
pub fn normalize_name(name: &str) -> String {
    name.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// Devanagari dependent sign (matra, virama, nukta, bindu, visarga)
fn is_devanagari_sign(c: char) -> bool {
    matches!(c,
        '\u{0900}'..='\u{0903}'
        | '\u{093A}'..='\u{094F}'
        | '\u{0951}'..='\u{0957}'
        | '\u{0962}'..='\u{0963}')
}

/// Character that continues a word (letters, digits, Devanagari signs)
pub fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || is_devanagari_sign(c)
}

/// Drop Devanagari dependent signs from a normalized name
pub fn strip_matras(name: &str) -> String {
    name.chars().filter(|c| !is_devanagari_sign(*c)).collect()
}

/// Latin spelling for a known Devanagari name
pub fn transliterate(name: &str) -> Option<&'static str> {
    let normalized = normalize_name(name);
    TRANSLITERATIONS
        .iter()
        .find(|(deva, _)| *deva == normalized)
        .map(|(_, latin)| *latin)
}

/// Loose spellings of `name`: normalized, matra-stripped, transliterated
pub fn fuzzy_variants(name: &str) -> Vec<String> {
    let normalized = normalize_name(name);
    let mut variants = vec![normalized.clone()];

    let stripped = strip_matras(&normalized);
    if !stripped.is_empty() && !variants.contains(&stripped) {
        variants.push(stripped);
    }

    if let Some(latin) = transliterate(&normalized) {
        let latin = latin.to_string();
        if !variants.contains(&latin) {
            variants.push(latin);
        }
    }

    variants
}

/// Whether a village (or its parent unit) looks urban
///
/// Urban when the village name equals the parent unit name, or either name
/// contains an urban keyword substring.
pub fn is_urban_unit(village: &str, parent: &str) -> bool {
    let village = normalize_name(village);
    let parent = normalize_name(parent);
    village == parent
        || URBAN_KEYWORDS
            .iter()
            .any(|k| village.contains(k) || parent.contains(k))
}

/// Parse ASCII or Devanagari digits
pub fn parse_number(digits: &str) -> Option<u32> {
    let ascii: String = digits
        .trim()
        .chars()
        .map(|c| match c {
            '०'..='९' => char::from_digit(c as u32 - '०' as u32, 10).unwrap_or(c),
            other => other,
        })
        .collect();
    ascii.parse().ok()
}

/// Ward number written in a unit name ("वार्ड 12", "Ward No. 4")
pub fn explicit_ward_number(name: &str) -> Option<u32> {
    WARD_MARKER
        .captures(name)
        .and_then(|caps| caps.name("n"))
        .and_then(|m| parse_number(m.as_str()))
}

/// Stable ward number derived from the name
///
/// First four bytes of SHA-256 over the normalized name, mod
/// `HASHED_WARD_COUNT`, plus one. Arbitrary but reproducible; not a source of
/// truth.
pub fn hashed_ward_number(name: &str) -> u32 {
    let digest = Sha256::digest(normalize_name(name).as_bytes());
    let prefix = u32::from_be_bytes([digest[0], digest[1], digest[2], digest[3]]);
    prefix % HASHED_WARD_COUNT + 1
}
