//! Core Types and Trait Definitions for posint-ai
//!
//! Defines the contract shared by all classifier layers and the consensus
//! output handed to downstream collaborators:
//! - **Layers:** `Classifier` (remote model, local model, rule-based)
//! - **Per-layer output:** `ClassifierOutput`
//! - **Consensus output:** `ParsingResult`

use crate::error::ClassifierError;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

// ============================================================================
// Event types
// ============================================================================

/// Event type labels emitted by the classifiers
///
/// Model layers may return labels outside this list; they still take part in
/// voting as plain strings.
pub mod event_types {
    pub const INAUGURATION: &str = "inauguration";
    pub const FOUNDATION_STONE: &str = "foundation_stone";
    pub const RALLY: &str = "rally";
    pub const MEETING: &str = "meeting";
    pub const VISIT: &str = "visit";
    pub const SCHEME_ANNOUNCEMENT: &str = "scheme_announcement";
    pub const CONDOLENCE: &str = "condolence";
    pub const GREETINGS: &str = "greetings";
    pub const PROTEST: &str = "protest";
    pub const OTHER: &str = "other";

    /// All known labels, used in model prompts
    pub const ALL: &[&str] = &[
        INAUGURATION,
        FOUNDATION_STONE,
        RALLY,
        MEETING,
        VISIT,
        SCHEME_ANNOUNCEMENT,
        CONDOLENCE,
        GREETINGS,
        PROTEST,
        OTHER,
    ];
}

// ============================================================================
// Layer contract
// ============================================================================

/// Cost/fallibility tier of a classifier layer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LayerKind {
    /// Hosted high-accuracy model (rate-limited, network-fallible)
    Remote,
    /// Self-hosted model (rate-limited, network-fallible)
    Local,
    /// Pattern/dictionary matcher (always available)
    Deterministic,
}

impl LayerKind {
    /// Default voting weight for this tier
    pub fn default_weight(self) -> f64 {
        match self {
            Self::Remote => 3.0,
            Self::Local => 2.0,
            Self::Deterministic => 1.0,
        }
    }

    /// Whether calls leave the process (and pass through a rate limiter)
    pub fn uses_network(self) -> bool {
        !matches!(self, Self::Deterministic)
    }
}

/// Classifier layer trait
///
/// All layers implement this trait so the consensus engine can treat them
/// uniformly. A returned error excludes the layer from voting for that item.
///
/// # Example
/// ```rust,ignore
/// use posint_ai::types::{Classifier, ClassifierOutput, LayerKind};
///
/// struct Keyword;
///
/// #[async_trait::async_trait]
/// impl Classifier for Keyword {
///     fn source_id(&self) -> &'static str { "keyword" }
///     fn kind(&self) -> LayerKind { LayerKind::Deterministic }
///
///     async fn classify(&self, text: &str) -> Result<ClassifierOutput, ClassifierError> {
///         Ok(ClassifierOutput::empty(self.source_id()))
///     }
/// }
/// ```
#[async_trait::async_trait]
pub trait Classifier: Send + Sync {
    /// Layer identifier for provenance (`layers_used`)
    fn source_id(&self) -> &'static str;

    /// Tier of this layer
    fn kind(&self) -> LayerKind;

    /// Classify one post
    ///
    /// # Errors
    /// Returns `ClassifierError` on transport or parse failure. Deterministic
    /// layers never fail.
    async fn classify(&self, text: &str) -> Result<ClassifierOutput, ClassifierError>;
}

/// Output of a single classifier layer for one post
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassifierOutput {
    pub source_id: String,
    pub event_type: String,
    /// Layer confidence (0.0-1.0)
    pub confidence: f64,
    pub locations: Vec<String>,
    pub people: Vec<String>,
    pub organizations: Vec<String>,
    pub schemes: Vec<String>,
    /// Set when the layer produced output but flagged it as unusable
    pub error: Option<String>,
}

impl ClassifierOutput {
    /// Output with no findings and `event_type = "other"`
    pub fn empty(source_id: impl Into<String>) -> Self {
        Self {
            source_id: source_id.into(),
            event_type: event_types::OTHER.to_string(),
            confidence: 0.0,
            locations: Vec::new(),
            people: Vec::new(),
            organizations: Vec::new(),
            schemes: Vec::new(),
            error: None,
        }
    }

    /// Clamp confidence into [0, 1] (NaN becomes 0)
    pub fn with_clamped_confidence(mut self) -> Self {
        self.confidence = clamp_unit(self.confidence);
        self
    }
}

// ============================================================================
// Consensus output
// ============================================================================

/// Consensus result for one post
///
/// Created once per input text. A re-parse produces a new instance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParsingResult {
    pub item_id: String,
    pub reference_date: NaiveDate,
    pub event_type: String,
    pub event_type_confidence: f64,
    pub locations: Vec<String>,
    pub people_mentioned: Vec<String>,
    pub organizations: Vec<String>,
    pub schemes_mentioned: Vec<String>,
    /// Always within [0, 1]
    pub overall_confidence: f64,
    pub needs_review: bool,
    /// Layers agreeing with the winning event type at acceptable confidence
    pub consensus_score: u32,
    pub layers_used: Vec<String>,
    pub reasoning: String,
    pub parsed_at: DateTime<Utc>,
}

/// Review gate
///
/// `true` whenever confidence is below the review threshold, the consensus
/// score is below the consensus threshold, or the event type is "other".
pub fn review_required(
    overall_confidence: f64,
    consensus_score: u32,
    event_type: &str,
    review_threshold: f64,
    consensus_threshold: u32,
) -> bool {
    overall_confidence < review_threshold
        || consensus_score < consensus_threshold
        || event_type == event_types::OTHER
}

/// Clamp to [0, 1], mapping NaN to 0
pub fn clamp_unit(value: f64) -> f64 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, 1.0)
    }
}
