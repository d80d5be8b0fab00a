//! Geographic hierarchy resolver
//!
//! Maps a noisy location mention onto nodes of the administrative tree.
//!
//! # Lookup order (`resolve_village`)
//! 1. Alias normalization, then exact lookup
//! 2. `"<base> ward <n>"` → first match of `<base>` as ward `n`
//! 3. `"<city> sector <n>"` → sector table of `<city>` (0.98)
//! 4. Fuzzy containment over loose spellings (0.8)
//!
//! # Deterministic resolution (`resolve_deterministic`)
//! Narrows candidates with district/block hints and free-text context, then
//! applies the confidence policy:
//!
//! | How the single survivor was obtained       | Confidence            |
//! |--------------------------------------------|-----------------------|
//! | exact match, no other candidate anywhere   | 1.0                   |
//! | explicit ward or sector marker             | 0.98                  |
//! | survived hint narrowing from a larger pool | max(0.95, c)          |
//! | context scoring                            | min(0.9, 0.5 + 0.1·s) |
//! | anything else                              | max(c, 0.8)           |
//!
//! The index is built once and shared behind an `Arc`, so resolution calls
//! take `&self` and are safe to run concurrently.

use super::dataset::{GeoDataset, Overlays};
use super::disambiguation::{best_by_context, context_confidence};
use super::index::GeoIndex;
use super::normalize::{normalize_name, parse_number};
use super::types::{GeoHierarchy, LocalBody, ResolutionHints, ResolutionOutcome};
use crate::error::{GeoError, GeoResult};
use once_cell::sync::Lazy;
use posint_common::config::GeoConfig;
use regex::Regex;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Confidence of ward/sector marker matches
pub const MARKER_CONFIDENCE: f64 = 0.98;

/// Floor for a candidate that survived hint narrowing
pub const NARROWED_CONFIDENCE: f64 = 0.95;

/// Floor for any other single survivor
pub const DEFAULT_FLOOR_CONFIDENCE: f64 = 0.8;

/// Cap for the guessed first candidate in non-strict ambiguity
pub const AMBIGUOUS_GUESS_CAP: f64 = 0.85;

static WARD_PHRASE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)^(?P<base>.+?)\s*,?\s*(?:वार्ड|ward)\s*(?:क्रमांक|नं\.?|no\.?)?\s*-?\s*(?P<n>[0-9०-९]+)$",
    )
    .expect("ward phrase pattern is valid")
});

static SECTOR_PHRASE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^(?P<city>.+?)\s*,?\s*(?:सेक्टर|sector)\s*-?\s*(?P<n>[0-9०-९]+)$")
        .expect("sector phrase pattern is valid")
});

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum MatchMethod {
    Exact,
    WardMarker,
    SectorMarker,
    Fuzzy,
}

#[derive(Debug, Clone)]
struct Candidate {
    node: GeoHierarchy,
    method: MatchMethod,
}

/// Resolver over a shared, read-only `GeoIndex`
#[derive(Debug, Clone, Default)]
pub struct GeoResolver {
    index: Option<Arc<GeoIndex>>,
    strict_mode: bool,
}

impl GeoResolver {
    /// Uninitialized resolver; call `initialize` before resolving
    pub fn new(strict_mode: bool) -> Self {
        Self {
            index: None,
            strict_mode,
        }
    }

    /// Resolver over an already built index
    pub fn with_index(index: Arc<GeoIndex>, strict_mode: bool) -> Self {
        Self {
            index: Some(index),
            strict_mode,
        }
    }

    /// Build the index from the configured dataset and overlays
    ///
    /// Replaces any previous index. Missing overlays are not an error.
    ///
    /// # Errors
    /// `GeoError::Dataset` if no dataset path is configured, or the dataset
    /// or an existing overlay cannot be read or parsed.
    pub fn initialize(&mut self, config: &GeoConfig) -> GeoResult<()> {
        let dataset_path = config
            .dataset_path
            .as_deref()
            .ok_or_else(|| GeoError::Dataset("no geography dataset configured".to_string()))?;

        let dataset = GeoDataset::from_file(dataset_path)?;
        let overlays = Overlays::load(
            config.aliases_path.as_deref(),
            config.urban_overlay_path.as_deref(),
        )?;

        self.strict_mode = config.strict_mode;
        self.initialize_from(&dataset, overlays);
        Ok(())
    }

    /// Build the index from in-memory data
    pub fn initialize_from(&mut self, dataset: &GeoDataset, overlays: Overlays) {
        let index = GeoIndex::build(dataset, overlays);
        let stats = index.stats();
        info!(
            nodes = stats.nodes,
            urban_nodes = stats.urban_nodes,
            distinct_names = stats.distinct_names,
            aliases = stats.aliases,
            sector_cities = stats.sector_cities,
            strict_mode = self.strict_mode,
            "Geo index initialized"
        );
        self.index = Some(Arc::new(index));
    }

    /// Drop the index; resolution fails with `NotInitialized` afterwards
    pub fn cleanup(&mut self) {
        if self.index.take().is_some() {
            info!("Geo index cleared");
        }
    }

    pub fn is_initialized(&self) -> bool {
        self.index.is_some()
    }

    pub fn strict_mode(&self) -> bool {
        self.strict_mode
    }

    /// Shared handle to the index
    ///
    /// # Errors
    /// `GeoError::NotInitialized` before `initialize` or after `cleanup`
    pub fn index(&self) -> GeoResult<&Arc<GeoIndex>> {
        self.index.as_ref().ok_or(GeoError::NotInitialized)
    }

    /// All nodes matching `name` (possibly none)
    ///
    /// Does not decide review status; see `resolve_deterministic`.
    pub fn resolve_village(&self, name: &str) -> GeoResult<Vec<GeoHierarchy>> {
        let index = self.index()?;
        Ok(lookup(index, name)
            .into_iter()
            .map(|candidate| candidate.node)
            .collect())
    }

    /// Pick one candidate using free-text context
    ///
    /// Returns the winner with its context-derived confidence, or `None` when
    /// nothing in the context matches any candidate.
    pub fn resolve_ambiguous_location(
        &self,
        candidates: &[GeoHierarchy],
        context: &str,
    ) -> GeoResult<Option<GeoHierarchy>> {
        let index = self.index()?;
        Ok(best_by_context(index, candidates, context).map(|(position, score)| {
            candidates[position].with_confidence(context_confidence(score))
        }))
    }

    /// Resolve `name` to one node, or to an explicit review case
    ///
    /// # Errors
    /// `GeoError::NoMatch` in strict mode when nothing matches;
    /// `GeoError::NotInitialized` without an index.
    pub fn resolve_deterministic(
        &self,
        name: &str,
        hints: Option<&ResolutionHints>,
    ) -> GeoResult<ResolutionOutcome> {
        let index = self.index()?;
        let mut pool = lookup(index, name);
        let total_found = pool.len();
        let mut explanations = Vec::new();

        if pool.is_empty() {
            if self.strict_mode {
                warn!(location = %name, "No geographic match (strict mode)");
                return Err(GeoError::NoMatch(name.to_string()));
            }
            debug!(location = %name, "No geographic match");
            return Ok(ResolutionOutcome {
                hierarchy: None,
                candidates: Vec::new(),
                needs_review: true,
                explanations: vec![format!("No match for '{}' in the geography index", name)],
            });
        }

        let mut narrowed = false;
        let mut context_winner: Option<u32> = None;

        if let Some(hints) = hints {
            if pool.len() > 1 && narrow(&mut pool, &hints.districts, |node| &node.district) {
                narrowed = true;
                explanations.push(format!(
                    "Narrowed by district hint to {} candidate(s)",
                    pool.len()
                ));
            }

            if pool.len() > 1 && narrow(&mut pool, &hints.blocks, |node| &node.block) {
                narrowed = true;
                explanations.push(format!(
                    "Narrowed by block hint to {} candidate(s)",
                    pool.len()
                ));
            }

            if pool.len() > 1 {
                if let Some(context) = hints.context.as_deref() {
                    let nodes: Vec<GeoHierarchy> = pool.iter().map(|c| c.node.clone()).collect();
                    if let Some((position, score)) = best_by_context(index, &nodes, context) {
                        let winner = pool.swap_remove(position);
                        pool = vec![winner];
                        context_winner = Some(score);
                        explanations.push(format!(
                            "Selected by context score {} among {} candidates",
                            score,
                            nodes.len()
                        ));
                    }
                }
            }
        }

        if pool.len() == 1 {
            let candidate = pool.remove(0);
            let confidence = match context_winner {
                Some(score) => context_confidence(score),
                None => policy_confidence(&candidate, total_found, narrowed),
            };
            let node = candidate.node.with_confidence(confidence);

            if matches!(
                candidate.method,
                MatchMethod::WardMarker | MatchMethod::SectorMarker
            ) {
                if let (Some(ulb), Some(ward_no)) = (node.ulb(), node.ward_no()) {
                    if index.ward_registered(ulb, ward_no) == Some(false) {
                        explanations.push(format!(
                            "Ward {} is not registered for {}; check the ward registry",
                            ward_no, ulb
                        ));
                    }
                }
            }

            debug!(
                location = %name,
                village = %node.village,
                district = %node.district,
                confidence = node.confidence,
                "Resolved location"
            );
            return Ok(ResolutionOutcome {
                hierarchy: Some(node.clone()),
                candidates: vec![node],
                needs_review: false,
                explanations,
            });
        }

        let candidates: Vec<GeoHierarchy> = pool.into_iter().map(|c| c.node).collect();
        let listing = candidates
            .iter()
            .enumerate()
            .map(|(i, node)| format!("{}) {}", i + 1, node.describe()))
            .collect::<Vec<_>>()
            .join("; ");
        explanations.push(format!(
            "Ambiguous location '{}': {} candidates: {}",
            name,
            candidates.len(),
            listing
        ));
        warn!(location = %name, candidates = candidates.len(), "Ambiguous geographic match");

        let hierarchy = if self.strict_mode {
            None
        } else {
            let first = &candidates[0];
            explanations.push("Using first candidate pending review".to_string());
            Some(first.with_confidence(first.confidence.min(AMBIGUOUS_GUESS_CAP)))
        };

        Ok(ResolutionOutcome {
            hierarchy,
            candidates,
            needs_review: true,
            explanations,
        })
    }
}

fn policy_confidence(candidate: &Candidate, total_found: usize, narrowed: bool) -> f64 {
    let current = candidate.node.confidence;
    match candidate.method {
        MatchMethod::Exact if total_found == 1 => 1.0,
        MatchMethod::WardMarker | MatchMethod::SectorMarker => MARKER_CONFIDENCE,
        _ if narrowed => current.max(NARROWED_CONFIDENCE),
        _ => current.max(DEFAULT_FLOOR_CONFIDENCE),
    }
}

/// Keep candidates whose field matches a hint, if that strictly narrows the pool
fn narrow<F>(pool: &mut Vec<Candidate>, hints: &[String], field: F) -> bool
where
    F: Fn(&GeoHierarchy) -> &String,
{
    let wanted: Vec<String> = hints.iter().map(|h| normalize_name(h)).collect();
    let kept: Vec<Candidate> = pool
        .iter()
        .filter(|c| wanted.contains(&normalize_name(field(&c.node))))
        .cloned()
        .collect();

    if !kept.is_empty() && kept.len() < pool.len() {
        *pool = kept;
        true
    } else {
        false
    }
}

fn lookup(index: &GeoIndex, name: &str) -> Vec<Candidate> {
    let normalized = normalize_name(name);
    if normalized.is_empty() {
        return Vec::new();
    }

    let key = index.canonical_alias(&normalized).unwrap_or(&normalized);
    let exact = index.exact(key);
    if !exact.is_empty() {
        return exact
            .iter()
            .map(|node| Candidate {
                node: node.clone(),
                method: MatchMethod::Exact,
            })
            .collect();
    }

    if let Some(candidate) = lookup_ward_phrase(index, name) {
        return vec![candidate];
    }

    if let Some(candidate) = lookup_sector_phrase(index, name) {
        return vec![candidate];
    }

    index
        .fuzzy_matches(&normalized)
        .into_iter()
        .map(|node| Candidate {
            node,
            method: MatchMethod::Fuzzy,
        })
        .collect()
}

/// `"<base> ward <n>"`: first base match, re-addressed as ward `n`
fn lookup_ward_phrase(index: &GeoIndex, name: &str) -> Option<Candidate> {
    let caps = WARD_PHRASE.captures(name.trim())?;
    let base = caps.name("base")?.as_str();
    let ward_no = parse_number(caps.name("n")?.as_str())?;

    let base_node = lookup(index, base).into_iter().next()?.node;
    let ulb = match &base_node.local_body {
        LocalBody::Urban { ulb, .. } => ulb.clone(),
        LocalBody::Rural { .. } => index.ulb_for_district(&base_node.district),
    };

    Some(Candidate {
        node: GeoHierarchy {
            village: name.trim().to_string(),
            local_body: LocalBody::Urban { ulb, ward_no },
            confidence: base_node.confidence.min(MARKER_CONFIDENCE),
            ..base_node
        },
        method: MatchMethod::WardMarker,
    })
}

/// `"<city> sector <n>"`: ward from the city's sector table
fn lookup_sector_phrase(index: &GeoIndex, name: &str) -> Option<Candidate> {
    let caps = SECTOR_PHRASE.captures(name.trim())?;
    let table = index.sector_table(caps.name("city")?.as_str())?;
    let label = caps.name("n")?.as_str();

    let ward_no = table.sectors.get(label).copied().or_else(|| {
        parse_number(label).and_then(|n| table.sectors.get(&n.to_string()).copied())
    })?;

    Some(Candidate {
        node: GeoHierarchy {
            village: name.trim().to_string(),
            local_body: LocalBody::Urban {
                ulb: table.ulb.clone(),
                ward_no,
            },
            block: table.block.clone(),
            assembly: table.assembly.clone(),
            district: table.district.clone(),
            confidence: MARKER_CONFIDENCE,
        },
        method: MatchMethod::SectorMarker,
    })
}
