//! Context-scored disambiguation
//!
//! Greedy and non-probabilistic. Each candidate scores
//! `3·district + 2·assembly + 1·block + 1·sibling` over the names the
//! free-text context mentions; the highest score wins, first candidate on
//! ties.

use super::index::GeoIndex;
use super::normalize::normalize_name;
use super::types::GeoHierarchy;

const DISTRICT_WEIGHT: u32 = 3;
const ASSEMBLY_WEIGHT: u32 = 2;
const BLOCK_WEIGHT: u32 = 1;
const SIBLING_WEIGHT: u32 = 1;

/// Ceiling for context-derived confidence
pub const MAX_CONTEXT_CONFIDENCE: f64 = 0.9;

fn mentions(context: &str, name: &str) -> bool {
    let name = normalize_name(name);
    !name.is_empty() && context.contains(&name)
}

/// Score one candidate against a normalized context
pub fn context_score(index: &GeoIndex, candidate: &GeoHierarchy, context: &str) -> u32 {
    let mut score = 0;
    if mentions(context, &candidate.district) {
        score += DISTRICT_WEIGHT;
    }
    if mentions(context, &candidate.assembly) {
        score += ASSEMBLY_WEIGHT;
    }
    if mentions(context, &candidate.block) {
        score += BLOCK_WEIGHT;
    }
    if index
        .siblings(candidate)
        .iter()
        .any(|sibling| mentions(context, sibling))
    {
        score += SIBLING_WEIGHT;
    }
    score
}

/// `min(0.9, 0.5 + 0.1 × score)`
pub fn context_confidence(score: u32) -> f64 {
    (0.5 + 0.1 * f64::from(score)).min(MAX_CONTEXT_CONFIDENCE)
}

/// Position and score of the best-scoring candidate
///
/// `None` when there are no candidates or nothing in the context matched.
pub fn best_by_context(
    index: &GeoIndex,
    candidates: &[GeoHierarchy],
    context: &str,
) -> Option<(usize, u32)> {
    let context = normalize_name(context);
    if context.is_empty() {
        return None;
    }

    let mut best: Option<(usize, u32)> = None;
    for (position, candidate) in candidates.iter().enumerate() {
        let score = context_score(index, candidate, &context);
        if best.map_or(true, |(_, top)| score > top) {
            best = Some((position, score));
        }
    }

    best.filter(|(_, score)| *score > 0)
}
