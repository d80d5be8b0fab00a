//! Weighted voting over layer outputs
//!
//! Both votes keep candidates in first-seen order so ties resolve to the
//! earliest registered layer's answer. This is deterministic but arbitrary.

use crate::types::{event_types, ClassifierOutput};

/// Tolerance for threshold comparisons on accumulated weights
const WEIGHT_EPSILON: f64 = 1e-9;

/// One successful layer taking part in a vote
#[derive(Debug, Clone, Copy)]
pub struct Ballot<'a> {
    pub output: &'a ClassifierOutput,
    pub weight: f64,
}

/// Winning event type with its accumulated score
#[derive(Debug, Clone, PartialEq)]
pub struct EventVote {
    pub event_type: String,
    pub score: f64,
}

/// Voting key for an event label: trimmed, lowercased, blank counts as "other"
pub fn normalize_event_label(label: &str) -> String {
    let label = label.trim().to_lowercase();
    if label.is_empty() {
        event_types::OTHER.to_string()
    } else {
        label
    }
}

/// Accumulate `weight × confidence` per event type; highest score wins
///
/// Labels are compared via `normalize_event_label`. With no ballots the
/// winner is "other" at score 0.
pub fn vote_event_type(ballots: &[Ballot<'_>]) -> EventVote {
    let mut tally: Vec<(String, f64)> = Vec::new();

    for ballot in ballots {
        let label = normalize_event_label(&ballot.output.event_type);
        let contribution = ballot.weight * ballot.output.confidence;

        match tally.iter_mut().find(|(l, _)| *l == label) {
            Some((_, score)) => *score += contribution,
            None => tally.push((label, contribution)),
        }
    }

    let mut winner: Option<(String, f64)> = None;
    for (label, score) in tally {
        // Strict comparison keeps the first-seen label on ties
        if winner.as_ref().map_or(true, |(_, best)| score > *best) {
            winner = Some((label, score));
        }
    }

    let (event_type, score) = winner.unwrap_or_else(|| (event_types::OTHER.to_string(), 0.0));
    EventVote { event_type, score }
}

/// Keep items whose accumulated layer weight reaches `threshold × total weight`
///
/// Each layer counts once per distinct item (case-insensitive); the first
/// surface form seen is kept.
pub fn vote_items<F>(ballots: &[Ballot<'_>], threshold: f64, field: F) -> Vec<String>
where
    F: Fn(&ClassifierOutput) -> &[String],
{
    let total_weight: f64 = ballots.iter().map(|b| b.weight).sum();
    if total_weight <= 0.0 {
        return Vec::new();
    }

    // (key, surface form, accumulated weight)
    let mut tally: Vec<(String, String, f64)> = Vec::new();

    for ballot in ballots {
        let mut counted: Vec<String> = Vec::new();
        for item in field(ballot.output) {
            let surface = item.trim();
            if surface.is_empty() {
                continue;
            }
            let key = surface.to_lowercase();
            if counted.contains(&key) {
                continue;
            }

            match tally.iter_mut().find(|(k, _, _)| *k == key) {
                Some((_, _, weight)) => *weight += ballot.weight,
                None => tally.push((key.clone(), surface.to_string(), ballot.weight)),
            }
            counted.push(key);
        }
    }

    let required = threshold * total_weight;
    tally
        .into_iter()
        .filter(|(_, _, weight)| *weight + WEIGHT_EPSILON >= required)
        .map(|(_, surface, _)| surface)
        .collect()
}
