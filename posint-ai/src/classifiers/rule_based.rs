//! Rule-Based Classifier (Layer C)
//!
//! Deterministic pattern/dictionary matcher. Always available, no network.
//!
//! # Event type
//! Ordered pattern list; the first matching pattern wins. No match yields
//! "other".
//!
//! # Confidence
//! Base 0.3, +0.2 each when locations, people or schemes are found, +0.1 when
//! organizations are found, capped at 1.0.

use super::clean_list;
use crate::error::ClassifierError;
use crate::geo::normalize::is_word_char;
use crate::types::{event_types, Classifier, ClassifierOutput, LayerKind};
use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;

const SOURCE_ID: &str = "rule_based";

/// One Devanagari word (danda excluded)
const DEVA_WORD: &str = r"[\p{Devanagari}--[\x{0964}\x{0965}]]+";

/// One capitalized Latin word
const LATIN_WORD: &str = r"[A-Z][a-zA-Z]+";

/// Particles that end a captured name
const STOP_WORDS: &[&str] = &[
    "ने", "जी", "को", "का", "की", "के", "से", "में", "द्वारा", "भी", "और", "एवं", "तथा", "पर",
    "हेतु", "लिए", "साथ", "ji", "and", "at", "in", "the",
];

static EVENT_PATTERNS: Lazy<Vec<(&'static str, Regex)>> = Lazy::new(|| {
    [
        (
            event_types::FOUNDATION_STONE,
            r"(?i)शिलान्यास|भूमिपूजन|भूमि पूजन|foundation stone",
        ),
        (
            event_types::INAUGURATION,
            r"(?i)लोकार्पण|उद्घाटन|inaugurat",
        ),
        (
            event_types::CONDOLENCE,
            r"(?i)श्रद्धांजलि|शोक संवेदना|निधन|condolence|passed away|\brip\b",
        ),
        (
            event_types::GREETINGS,
            r"(?i)शुभकामना|बधाई|जन्मदिन|greetings|best wishes|happy birthday",
        ),
        (
            event_types::SCHEME_ANNOUNCEMENT,
            r"(?i)(?:योजना|yojana|scheme).*(?:घोषणा|शुभारंभ|राशि|अंतरित|launch|announc)|(?:घोषणा|शुभारंभ|launch|announc).*(?:योजना|yojana|scheme)",
        ),
        (
            event_types::PROTEST,
            r"(?i)धरना|विरोध प्रदर्शन|आंदोलन|\bprotest",
        ),
        (
            event_types::RALLY,
            r"(?i)रैली|जनसभा|आमसभा|रोड शो|\brally\b|roadshow",
        ),
        (
            event_types::MEETING,
            r"(?i)बैठक|समीक्षा|\bmeeting\b|चौपाल",
        ),
        (
            event_types::VISIT,
            r"(?i)दौरा|दौरे|भ्रमण|पहुंचे|पहुँचे|\bvisit",
        ),
    ]
    .into_iter()
    .map(|(label, pattern)| (label, Regex::new(pattern).expect("event pattern is valid")))
    .collect()
});

static LOCATION_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        // "रायपुर वार्ड 7", "भिलाई सेक्टर 6" - whole phrase kept
        format!(
            r"(?P<loc>{w}\s+(?:वार्ड|वार्ड क्रमांक|वार्ड नं\.?|सेक्टर)\s*[0-9०-९]+)",
            w = DEVA_WORD
        ),
        format!(
            r"(?i)(?P<loc>{w}\s+(?:ward|sector)\s*(?:no\.?\s*)?[0-9]+)",
            w = LATIN_WORD
        ),
        format!(
            r"(?:ग्राम पंचायत|नगर पंचायत|ग्राम|विकासखंड|जिला)\s+(?P<loc>{w})",
            w = DEVA_WORD
        ),
        format!(r"(?P<loc>{w})\s+(?:जिले|गांव|गाँव)", w = DEVA_WORD),
        format!(
            r"\b(?:village|district|block|in|at)\s+(?P<loc>{w}(?:\s{w})?)",
            w = LATIN_WORD
        ),
    ]
    .iter()
    .map(|p| Regex::new(p).expect("location pattern is valid"))
    .collect()
});

static PERSON_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(
        r"(?:श्रीमती|श्री|माननीय|डॉ\.?|Shri|Smt\.?|Dr\.?|Mr\.?|Mrs\.?)\s+(?P<name>(?:{d})(?:\s(?:{d})){{0,3}}|{l}(?:\s{l}){{0,2}})",
        d = DEVA_WORD,
        l = LATIN_WORD
    ))
    .expect("person pattern is valid")
});

static ORGANIZATION_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(
        r"(?P<org>{w}\s+(?:नगर निगम|नगर पालिका|जनपद पंचायत|समिति|मोर्चा))",
        w = DEVA_WORD
    ))
    .expect("organization pattern is valid")
});

static SCHEME_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        format!(
            r"(?P<scheme>(?:{w}\s){{1,3}}(?:योजना|मिशन|अभियान))",
            w = DEVA_WORD
        ),
        format!(
            r"(?P<scheme>(?:{w}\s){{1,3}}(?:Yojana|Scheme|Mission|Abhiyan))",
            w = LATIN_WORD
        ),
    ]
    .iter()
    .map(|p| Regex::new(p).expect("scheme pattern is valid"))
    .collect()
});

const KNOWN_ORGANIZATIONS: &[&str] = &[
    "भाजपा",
    "बीजेपी",
    "भारतीय जनता पार्टी",
    "कांग्रेस",
    "आम आदमी पार्टी",
    "बसपा",
    "जिला प्रशासन",
    "BJP",
    "INC",
    "Congress",
    "AAP",
];

const KNOWN_SCHEMES: &[&str] = &[
    "आयुष्मान भारत",
    "उज्ज्वला",
    "पीएम किसान",
    "महतारी वंदन",
    "Ayushman Bharat",
    "PM Kisan",
    "Ujjwala",
];

/// Deterministic layer
#[derive(Debug, Clone, Default)]
pub struct RuleBasedClassifier {
    /// Known place names, longest first
    gazetteer: Vec<String>,
}

impl RuleBasedClassifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed with known place names (e.g. villages from the geo index)
    pub fn with_gazetteer<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut names: Vec<String> = names
            .into_iter()
            .map(Into::into)
            .map(|n| n.trim().to_string())
            .filter(|n| n.chars().count() >= 2)
            .collect();
        names.sort_by(|a, b| b.len().cmp(&a.len()).then_with(|| a.cmp(b)));
        names.dedup();
        self.gazetteer = names;
        self
    }

    /// Number of gazetteer entries
    pub fn gazetteer_len(&self) -> usize {
        self.gazetteer.len()
    }

    /// Pure classification over `text`
    pub fn classify_text(&self, text: &str) -> ClassifierOutput {
        let event_type = EVENT_PATTERNS
            .iter()
            .find(|(_, re)| re.is_match(text))
            .map(|(label, _)| *label)
            .unwrap_or(event_types::OTHER);

        let locations = self.extract_locations(text);
        let people = extract_people(text);
        let organizations = extract_organizations(text);
        let schemes = extract_schemes(text);

        let mut confidence: f64 = 0.3;
        if !locations.is_empty() {
            confidence += 0.2;
        }
        if !people.is_empty() {
            confidence += 0.2;
        }
        if !schemes.is_empty() {
            confidence += 0.2;
        }
        if !organizations.is_empty() {
            confidence += 0.1;
        }

        ClassifierOutput {
            source_id: SOURCE_ID.to_string(),
            event_type: event_type.to_string(),
            confidence: confidence.min(1.0),
            locations,
            people,
            organizations,
            schemes,
            error: None,
        }
    }

    fn extract_locations(&self, text: &str) -> Vec<String> {
        let mut spans: Vec<(usize, usize)> = Vec::new();

        for re in LOCATION_PATTERNS.iter() {
            for caps in re.captures_iter(text) {
                if let Some(m) = caps.name("loc") {
                    let (start, end) = trim_span(text, m.start(), m.end());
                    if start < end && !STOP_WORDS.contains(&&text[start..end]) {
                        spans.push((start, end));
                    }
                }
            }
        }

        for name in &self.gazetteer {
            for (start, _) in text.match_indices(name.as_str()) {
                let end = start + name.len();
                if is_bounded(text, start, end) {
                    spans.push((start, end));
                }
            }
        }

        // Text order; a span inside a longer one is dropped
        spans.sort_by(|a, b| a.0.cmp(&b.0).then_with(|| b.1.cmp(&a.1)));
        let mut kept: Vec<(usize, usize)> = Vec::new();
        for span in spans {
            if kept.iter().any(|k| k.0 <= span.0 && span.1 <= k.1) {
                continue;
            }
            kept.push(span);
        }

        clean_list(
            kept.into_iter()
                .map(|(s, e)| text[s..e].to_string())
                .collect(),
        )
    }
}

fn extract_people(text: &str) -> Vec<String> {
    let names = PERSON_PATTERN
        .captures_iter(text)
        .filter_map(|caps| caps.name("name"))
        .filter_map(|m| truncate_at_stop_word(m.as_str()))
        .collect();
    clean_list(names)
}

fn extract_organizations(text: &str) -> Vec<String> {
    let mut found: Vec<(usize, String)> = ORGANIZATION_PATTERN
        .captures_iter(text)
        .filter_map(|caps| caps.name("org"))
        .map(|m| (m.start(), m.as_str().to_string()))
        .collect();
    found.extend(dictionary_hits(text, KNOWN_ORGANIZATIONS));
    found.sort_by_key(|(pos, _)| *pos);
    clean_list(found.into_iter().map(|(_, s)| s).collect())
}

fn extract_schemes(text: &str) -> Vec<String> {
    let mut found: Vec<(usize, String)> = Vec::new();
    for re in SCHEME_PATTERNS.iter() {
        for caps in re.captures_iter(text) {
            if let Some(m) = caps.name("scheme") {
                if let Some(scheme) = strip_leading_stop_words(m.as_str()) {
                    found.push((m.start(), scheme));
                }
            }
        }
    }
    found.extend(dictionary_hits(text, KNOWN_SCHEMES));
    found.sort_by_key(|(pos, _)| *pos);

    // "आयुष्मान भारत" is dropped when "आयुष्मान भारत योजना" was also found
    let all: Vec<String> = found.into_iter().map(|(_, s)| s).collect();
    let kept = all
        .iter()
        .filter(|s| !all.iter().any(|o| o != *s && o.contains(s.as_str())))
        .cloned()
        .collect();
    clean_list(kept)
}

fn dictionary_hits(text: &str, dictionary: &[&str]) -> Vec<(usize, String)> {
    dictionary
        .iter()
        .filter_map(|entry| {
            text.match_indices(entry)
                .find(|(start, _)| is_bounded(text, *start, start + entry.len()))
                .map(|(start, _)| (start, entry.to_string()))
        })
        .collect()
}

/// Match does not sit inside a longer word
fn is_bounded(text: &str, start: usize, end: usize) -> bool {
    let before = text[..start].chars().next_back();
    let after = text[end..].chars().next();
    !before.is_some_and(is_word_char) && !after.is_some_and(is_word_char)
}

fn trim_span(text: &str, start: usize, end: usize) -> (usize, usize) {
    let slice = &text[start..end];
    let lead = slice.len() - slice.trim_start().len();
    let trail = slice.len() - slice.trim_end().len();
    (start + lead, end - trail)
}

fn truncate_at_stop_word(name: &str) -> Option<String> {
    let words: Vec<&str> = name
        .split_whitespace()
        .take_while(|w| !STOP_WORDS.contains(&w.to_lowercase().as_str()))
        .collect();
    (!words.is_empty()).then(|| words.join(" "))
}

fn strip_leading_stop_words(phrase: &str) -> Option<String> {
    let words: Vec<&str> = phrase
        .split_whitespace()
        .skip_while(|w| STOP_WORDS.contains(&w.to_lowercase().as_str()))
        .collect();
    // Suffix alone ("योजना") is not a scheme name
    (words.len() >= 2).then(|| words.join(" "))
}

#[async_trait]
impl Classifier for RuleBasedClassifier {
    fn source_id(&self) -> &'static str {
        SOURCE_ID
    }

    fn kind(&self) -> LayerKind {
        LayerKind::Deterministic
    }

    async fn classify(&self, text: &str) -> Result<ClassifierOutput, ClassifierError> {
        Ok(self.classify_text(text))
    }
}
