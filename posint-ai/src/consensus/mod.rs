//! Consensus Engine
//!
//! Runs the registered classifier layers for one post, excludes failed layers
//! and merges the rest through weighted voting.
//!
//! # Per-item flow
//! 1. Empty text → fixed "other" result, no layer invoked
//! 2. Layers run sequentially in registration order. A network layer that
//!    follows another network layer waits `inter_layer_delay_ms` first, on top
//!    of its own rate-limiter permit.
//! 3. Failed layers are logged and left out of the vote (never stubbed)
//! 4. Event type: highest accumulated `weight × confidence`
//! 5. List fields: items reaching a share of the total successful weight
//! 6. Overall confidence: mean layer confidence plus a bonus when enough
//!    layers agree, clamped to [0, 1]
//!
//! `parse_tweet` never returns an error; low confidence and total layer
//! failure are expressed through `needs_review`.

pub mod voting;

use crate::classifiers::{LocalModelClassifier, RemoteModelClassifier, RuleBasedClassifier};
use crate::config::build_rate_limiter;
use crate::types::{clamp_unit, event_types, review_required, Classifier, ParsingResult};
use chrono::{NaiveDate, Utc};
use futures::stream::{self, StreamExt};
use posint_common::config::{ConsensusConfig, TomlConfig};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};
use voting::{normalize_event_label, vote_event_type, vote_items, Ballot};

/// A classifier with its voting weight
#[derive(Clone)]
pub struct RegisteredLayer {
    pub classifier: Arc<dyn Classifier>,
    pub weight: f64,
}

impl std::fmt::Debug for RegisteredLayer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RegisteredLayer")
            .field("source_id", &self.classifier.source_id())
            .field("kind", &self.classifier.kind())
            .field("weight", &self.weight)
            .finish()
    }
}

/// One post queued for `parse_batch`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PostInput {
    pub id: String,
    pub text: String,
    pub reference_date: NaiveDate,
}

/// Builder registering layers in voting order
#[derive(Debug)]
pub struct ConsensusEngineBuilder {
    config: ConsensusConfig,
    layers: Vec<RegisteredLayer>,
}

impl ConsensusEngineBuilder {
    /// Register a layer at its tier's default weight
    pub fn layer(self, classifier: Arc<dyn Classifier>) -> Self {
        let weight = classifier.kind().default_weight();
        self.weighted_layer(classifier, weight)
    }

    /// Register a layer with an explicit weight
    pub fn weighted_layer(mut self, classifier: Arc<dyn Classifier>, weight: f64) -> Self {
        debug!(
            layer = classifier.source_id(),
            weight = weight,
            "Registering classifier layer"
        );
        self.layers.push(RegisteredLayer { classifier, weight });
        self
    }

    pub fn build(self) -> ConsensusEngine {
        ConsensusEngine {
            config: self.config,
            layers: self.layers,
        }
    }
}

/// Multi-layer consensus extraction engine
#[derive(Debug, Clone)]
pub struct ConsensusEngine {
    config: ConsensusConfig,
    layers: Vec<RegisteredLayer>,
}

impl ConsensusEngine {
    pub fn builder(config: ConsensusConfig) -> ConsensusEngineBuilder {
        ConsensusEngineBuilder {
            config,
            layers: Vec::new(),
        }
    }

    /// Wire the standard layers from configuration
    ///
    /// Remote and local layers are registered only when enabled; the
    /// rule-based layer is always registered last, seeded with `gazetteer`.
    ///
    /// # Errors
    /// `Error::Config` for a zero rate ceiling, or an enabled remote layer
    /// without an API key.
    pub fn from_config<I, S>(config: &TomlConfig, gazetteer: I) -> posint_common::Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let rate_limiter = Arc::new(build_rate_limiter(config)?);
        let mut builder = Self::builder(config.consensus.clone());

        if config.providers.remote.enabled {
            let remote = RemoteModelClassifier::new(
                &config.providers.remote,
                config.remote_api_key(),
                Arc::clone(&rate_limiter),
            )
            .map_err(|e| posint_common::Error::Config(e.to_string()))?;
            builder = builder.layer(Arc::new(remote));
        }

        if config.providers.local.enabled {
            let local =
                LocalModelClassifier::new(&config.providers.local, Arc::clone(&rate_limiter))
                    .map_err(|e| posint_common::Error::Config(e.to_string()))?;
            builder = builder.layer(Arc::new(local));
        }

        let rules = RuleBasedClassifier::new().with_gazetteer(gazetteer);
        info!(
            gazetteer = rules.gazetteer_len(),
            "Rule-based layer ready"
        );
        builder = builder.layer(Arc::new(rules));

        Ok(builder.build())
    }

    pub fn config(&self) -> &ConsensusConfig {
        &self.config
    }

    /// Registered layer ids in invocation order
    pub fn layer_ids(&self) -> Vec<&'static str> {
        self.layers.iter().map(|l| l.classifier.source_id()).collect()
    }

    /// Extract structured facts from one post
    pub async fn parse_tweet(
        &self,
        text: &str,
        item_id: &str,
        reference_date: NaiveDate,
    ) -> ParsingResult {
        if text.trim().is_empty() {
            debug!(item_id = %item_id, "Empty text, skipping classification");
            return self.fallback_result(
                item_id,
                reference_date,
                "Empty text; no layers invoked".to_string(),
            );
        }

        let delay = Duration::from_millis(self.config.inter_layer_delay_ms);
        let mut outputs = Vec::with_capacity(self.layers.len());
        let mut failed: Vec<String> = Vec::new();
        let mut network_called = false;

        for layer in &self.layers {
            let source_id = layer.classifier.source_id();
            let uses_network = layer.classifier.kind().uses_network();

            if uses_network && network_called && !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
            network_called |= uses_network;

            match layer.classifier.classify(text).await {
                Ok(output) => match output.error.clone() {
                    None => {
                        debug!(
                            item_id = %item_id,
                            layer = source_id,
                            event_type = %output.event_type,
                            confidence = output.confidence,
                            "Layer classified"
                        );
                        outputs.push((output.with_clamped_confidence(), layer.weight, source_id));
                    }
                    Some(reason) => {
                        warn!(
                            item_id = %item_id,
                            layer = source_id,
                            error = %reason,
                            "Layer flagged its output as unusable"
                        );
                        failed.push(format!("{} ({})", source_id, reason));
                    }
                },
                Err(e) => {
                    warn!(
                        item_id = %item_id,
                        layer = source_id,
                        error = %e,
                        "Layer failed, excluded from voting"
                    );
                    failed.push(format!("{} ({})", source_id, e));
                }
            }
        }

        if outputs.is_empty() {
            warn!(item_id = %item_id, "All classifier layers failed");
            return self.fallback_result(
                item_id,
                reference_date,
                format!("All layers failed: {}", failed.join(", ")),
            );
        }

        let ballots: Vec<Ballot<'_>> = outputs
            .iter()
            .map(|(output, weight, _)| Ballot { output, weight: *weight })
            .collect();
        let total_weight: f64 = ballots.iter().map(|b| b.weight).sum();

        let vote = vote_event_type(&ballots);
        let event_type_confidence = if total_weight > 0.0 {
            clamp_unit(vote.score / total_weight)
        } else {
            0.0
        };

        let cfg = &self.config;
        let locations = vote_items(&ballots, cfg.location_threshold, |o| o.locations.as_slice());
        let people_mentioned = vote_items(&ballots, cfg.people_threshold, |o| o.people.as_slice());
        let organizations =
            vote_items(&ballots, cfg.organization_threshold, |o| o.organizations.as_slice());
        let schemes_mentioned =
            vote_items(&ballots, cfg.scheme_threshold, |o| o.schemes.as_slice());

        let consensus_score = outputs
            .iter()
            .filter(|(output, _, _)| {
                output.confidence > cfg.min_layer_confidence
                    && normalize_event_label(&output.event_type) == vote.event_type
            })
            .count() as u32;

        let mean_confidence =
            outputs.iter().map(|(o, _, _)| o.confidence).sum::<f64>() / outputs.len() as f64;
        let bonus = if consensus_score >= cfg.consensus_threshold {
            cfg.consensus_bonus
        } else {
            0.0
        };
        let overall_confidence = clamp_unit(mean_confidence + bonus);

        let needs_review = review_required(
            overall_confidence,
            consensus_score,
            &vote.event_type,
            cfg.review_threshold,
            cfg.consensus_threshold,
        );

        let layers_used: Vec<String> = outputs.iter().map(|(_, _, id)| id.to_string()).collect();

        let mut reasoning = format!(
            "event_type '{}' scored {:.3} of {:.3} total weight; \
             {}/{} layers agree above {:.2}; mean confidence {:.3}{}",
            vote.event_type,
            vote.score,
            total_weight,
            consensus_score,
            outputs.len(),
            cfg.min_layer_confidence,
            mean_confidence,
            if bonus > 0.0 {
                format!(" + consensus bonus {:.2}", bonus)
            } else {
                String::new()
            }
        );
        if !failed.is_empty() {
            reasoning.push_str(&format!("; excluded: {}", failed.join(", ")));
        }

        info!(
            item_id = %item_id,
            event_type = %vote.event_type,
            overall_confidence = overall_confidence,
            consensus_score = consensus_score,
            needs_review = needs_review,
            "Post parsed"
        );

        ParsingResult {
            item_id: item_id.to_string(),
            reference_date,
            event_type: vote.event_type,
            event_type_confidence,
            locations,
            people_mentioned,
            organizations,
            schemes_mentioned,
            overall_confidence,
            needs_review,
            consensus_score,
            layers_used,
            reasoning,
            parsed_at: Utc::now(),
        }
    }

    /// Parse many posts with at most `concurrency` in flight
    ///
    /// Results keep input order. Each post still runs its layers
    /// sequentially; permits come from the shared rate limiter.
    pub async fn parse_batch(
        &self,
        items: Vec<PostInput>,
        concurrency: usize,
    ) -> Vec<ParsingResult> {
        let total = items.len();
        debug!(total = total, concurrency = concurrency, "Starting batch");

        let engine = self;
        let results: Vec<ParsingResult> = stream::iter(items)
            .map(|item| async move {
                engine
                    .parse_tweet(&item.text, &item.id, item.reference_date)
                    .await
            })
            .buffered(concurrency.max(1))
            .collect()
            .await;

        let flagged = results.iter().filter(|r| r.needs_review).count();
        info!(total = total, needs_review = flagged, "Batch complete");
        results
    }

    /// "other" at zero confidence, flagged for review
    fn fallback_result(
        &self,
        item_id: &str,
        reference_date: NaiveDate,
        reasoning: String,
    ) -> ParsingResult {
        ParsingResult {
            item_id: item_id.to_string(),
            reference_date,
            event_type: event_types::OTHER.to_string(),
            event_type_confidence: 0.0,
            locations: Vec::new(),
            people_mentioned: Vec::new(),
            organizations: Vec::new(),
            schemes_mentioned: Vec::new(),
            overall_confidence: 0.0,
            needs_review: true,
            consensus_score: 0,
            layers_used: Vec::new(),
            reasoning,
            parsed_at: Utc::now(),
        }
    }
}
