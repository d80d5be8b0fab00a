//! Post ingest: consensus extraction followed by geo resolution
//!
//! Every location kept by the vote is resolved with the post text as
//! context. A strict-mode `NoMatch` is recorded on that location and the
//! remaining locations still resolve.

use crate::consensus::ConsensusEngine;
use crate::geo::{GeoResolver, ResolutionHints, ResolutionOutcome};
use crate::types::ParsingResult;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Resolution result for one extracted location
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeoLink {
    pub mention: String,
    pub outcome: Option<ResolutionOutcome>,
    pub error: Option<String>,
}

impl GeoLink {
    /// Resolved to exactly one node without review
    pub fn is_resolved(&self) -> bool {
        self.outcome
            .as_ref()
            .is_some_and(|o| !o.needs_review && o.hierarchy.is_some())
    }
}

/// Parsed post with its resolved locations
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IngestedPost {
    pub parsing: ParsingResult,
    pub geo: Vec<GeoLink>,
}

impl IngestedPost {
    /// Any part of the post needs a human
    pub fn needs_review(&self) -> bool {
        self.parsing.needs_review || self.geo.iter().any(|link| !link.is_resolved())
    }
}

/// Parse one post, then resolve each extracted location
pub async fn ingest_post(
    engine: &ConsensusEngine,
    resolver: &GeoResolver,
    text: &str,
    item_id: &str,
    reference_date: NaiveDate,
) -> IngestedPost {
    let parsing = engine.parse_tweet(text, item_id, reference_date).await;
    let geo = resolve_locations(resolver, &parsing.locations, text);

    debug!(
        item_id = %item_id,
        locations = geo.len(),
        resolved = geo.iter().filter(|l| l.is_resolved()).count(),
        "Post ingested"
    );

    IngestedPost { parsing, geo }
}

/// Resolve mentions with `context` as the disambiguation hint
pub fn resolve_locations(
    resolver: &GeoResolver,
    mentions: &[String],
    context: &str,
) -> Vec<GeoLink> {
    let hints = ResolutionHints::with_context(context);

    mentions
        .iter()
        .map(|mention| match resolver.resolve_deterministic(mention, Some(&hints)) {
            Ok(outcome) => GeoLink {
                mention: mention.clone(),
                outcome: Some(outcome),
                error: None,
            },
            Err(e) => {
                warn!(location = %mention, error = %e, "Location left unresolved");
                GeoLink {
                    mention: mention.clone(),
                    outcome: None,
                    error: Some(e.to_string()),
                }
            }
        })
        .collect()
}
