//! Classifier Layers
//!
//! Three independently pluggable strategies sharing the `Classifier` contract
//! from `types`:
//! 1. **remote_client** - hosted high-accuracy model (weight 3)
//! 2. **local_client** - self-hosted model (weight 2)
//! 3. **rule_based** - ordered pattern/dictionary matcher (weight 1, never fails)
//!
//! Model layers share the prompt and the tolerant JSON parsing in this module.

pub mod local_client;
pub mod remote_client;
pub mod rule_based;

pub use local_client::LocalModelClassifier;
pub use remote_client::RemoteModelClassifier;
pub use rule_based::RuleBasedClassifier;

use crate::error::ClassifierError;
use crate::types::{event_types, ClassifierOutput};
use serde::Deserialize;

/// Instruction sent to both model layers
pub(crate) fn build_prompt(text: &str) -> String {
    format!(
        "Extract structured facts from this Hindi/English political social-media post.\n\
         Respond with a single JSON object and nothing else:\n\
         {{\"event_type\": one of [{labels}],\n \
         \"confidence\": number between 0 and 1,\n \
         \"locations\": [place names exactly as written],\n \
         \"people\": [person names],\n \
         \"organizations\": [organization or party names],\n \
         \"schemes\": [government scheme names]}}\n\n\
         Post:\n{text}",
        labels = event_types::ALL
            .iter()
            .map(|l| format!("\"{}\"", l))
            .collect::<Vec<_>>()
            .join(", "),
        text = text
    )
}

/// Structured answer expected from a model layer
#[derive(Debug, Deserialize)]
struct ModelExtraction {
    #[serde(default)]
    event_type: Option<String>,
    #[serde(default)]
    confidence: Option<f64>,
    #[serde(default)]
    locations: Vec<String>,
    #[serde(default, alias = "people_mentioned")]
    people: Vec<String>,
    #[serde(default)]
    organizations: Vec<String>,
    #[serde(default, alias = "schemes_mentioned")]
    schemes: Vec<String>,
}

/// Remove a surrounding Markdown code fence (```json ... ```)
pub fn strip_code_fences(raw: &str) -> &str {
    let trimmed = raw.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    // Drop the info string ("json", "JSON", ...) on the opening line
    let body = match rest.find('\n') {
        Some(idx) => &rest[idx + 1..],
        None => rest,
    };
    body.trim_end().trim_end_matches("```").trim()
}

/// Parse a model answer into a `ClassifierOutput`
///
/// # Errors
/// `ClassifierError::Parse` when the payload is not the expected JSON object
/// or lacks an event type.
pub fn parse_model_output(
    source_id: &str,
    raw: &str,
) -> Result<ClassifierOutput, ClassifierError> {
    let body = strip_code_fences(raw);
    let extraction: ModelExtraction = serde_json::from_str(body).map_err(|e| {
        ClassifierError::Parse(format!("{} returned invalid JSON: {}", source_id, e))
    })?;

    let event_type = extraction
        .event_type
        .map(|e| e.trim().to_lowercase())
        .filter(|e| !e.is_empty())
        .ok_or_else(|| ClassifierError::Parse(format!("{} omitted event_type", source_id)))?;

    Ok(ClassifierOutput {
        source_id: source_id.to_string(),
        event_type,
        confidence: extraction.confidence.unwrap_or(0.0),
        locations: clean_list(extraction.locations),
        people: clean_list(extraction.people),
        organizations: clean_list(extraction.organizations),
        schemes: clean_list(extraction.schemes),
        error: None,
    }
    .with_clamped_confidence())
}

/// Trim entries, drop blanks and exact duplicates (first occurrence wins)
pub(crate) fn clean_list(items: Vec<String>) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(items.len());
    for item in items {
        let item = item.trim();
        if !item.is_empty() && !out.iter().any(|o| o == item) {
            out.push(item.to_string());
        }
    }
    out
}
