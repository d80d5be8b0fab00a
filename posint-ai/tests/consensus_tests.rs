//! Consensus engine integration tests
//!
//! Layers are mocked so voting is exercised without network access.

mod helpers;

use helpers::{layer_output, no_delay_config, test_date, MockLayer};
use posint_ai::classifiers::RuleBasedClassifier;
use posint_ai::consensus::{ConsensusEngine, PostInput};
use posint_ai::types::{event_types, review_required, ClassifierOutput, LayerKind, ParsingResult};
use posint_common::config::ConsensusConfig;
use std::sync::Arc;
use std::time::Duration;

fn three_layer_engine(
    a: ClassifierOutput,
    b: ClassifierOutput,
    c: ClassifierOutput,
) -> ConsensusEngine {
    ConsensusEngine::builder(no_delay_config())
        .layer(MockLayer::ok("remote_model", LayerKind::Remote, a).into_arc())
        .layer(MockLayer::ok("local_model", LayerKind::Local, b).into_arc())
        .layer(MockLayer::ok("rule_based", LayerKind::Deterministic, c).into_arc())
        .build()
}

fn assert_review_invariant(result: &ParsingResult, config: &ConsensusConfig) {
    assert!((0.0..=1.0).contains(&result.overall_confidence));
    assert_eq!(
        result.needs_review,
        review_required(
            result.overall_confidence,
            result.consensus_score,
            &result.event_type,
            config.review_threshold,
            config.consensus_threshold,
        ),
        "needs_review must follow from confidence, consensus score and event type"
    );
}

// ============================================================================
// Event type voting
// ============================================================================

#[tokio::test]
async fn test_weighted_layer_wins_three_way_disagreement() {
    let engine = three_layer_engine(
        layer_output("remote_model", "rally", 0.8),
        layer_output("local_model", "meeting", 0.8),
        layer_output("rule_based", "visit", 0.8),
    );

    let result = engine.parse_tweet("आज रायपुर में कार्यक्रम", "p1", test_date()).await;

    assert_eq!(result.event_type, "rally");
    assert_eq!(result.consensus_score, 1);
    assert!(result.needs_review, "Single agreeing layer is below the consensus threshold");
    assert_review_invariant(&result, &no_delay_config());
}

#[tokio::test]
async fn test_weighted_layer_beats_agreeing_weaker_layers() {
    // meeting: 2×0.5 + 1×0.8 = 1.8, rally: 3×0.8 = 2.4
    let engine = three_layer_engine(
        layer_output("remote_model", "rally", 0.8),
        layer_output("local_model", "meeting", 0.5),
        layer_output("rule_based", "meeting", 0.8),
    );

    let result = engine.parse_tweet("सभा", "p2", test_date()).await;

    assert_eq!(result.event_type, "rally");
    assert!((result.event_type_confidence - 2.4 / 6.0).abs() < 1e-9);
}

#[tokio::test]
async fn test_agreement_earns_bonus() {
    let engine = three_layer_engine(
        layer_output("remote_model", "inauguration", 0.9),
        layer_output("local_model", "inauguration", 0.8),
        layer_output("rule_based", "inauguration", 0.5),
    );

    let result = engine.parse_tweet("लोकार्पण", "p3", test_date()).await;

    let expected = (0.9 + 0.8 + 0.5) / 3.0 + 0.15;
    assert_eq!(result.consensus_score, 3);
    assert!((result.overall_confidence - expected).abs() < 1e-9);
    assert!(!result.needs_review);
    assert_eq!(result.layers_used, vec!["remote_model", "local_model", "rule_based"]);
}

#[tokio::test]
async fn test_overall_confidence_is_clamped() {
    let engine = three_layer_engine(
        layer_output("remote_model", "rally", 1.0),
        layer_output("local_model", "rally", 1.0),
        layer_output("rule_based", "rally", 1.0),
    );

    let result = engine.parse_tweet("रैली", "p4", test_date()).await;

    assert_eq!(result.overall_confidence, 1.0);
    assert_review_invariant(&result, &no_delay_config());
}

#[tokio::test]
async fn test_all_other_without_entities_needs_review() {
    let engine = three_layer_engine(
        layer_output("remote_model", event_types::OTHER, 0.9),
        layer_output("local_model", event_types::OTHER, 0.9),
        layer_output("rule_based", event_types::OTHER, 0.9),
    );

    let result = engine.parse_tweet("सुप्रभात", "p5", test_date()).await;

    assert_eq!(result.event_type, event_types::OTHER);
    assert!(result.locations.is_empty());
    assert!(result.needs_review);
}

#[tokio::test]
async fn test_blank_event_type_counts_toward_other_consensus() {
    let engine = three_layer_engine(
        layer_output("remote_model", "  ", 0.9),
        layer_output("local_model", " Other ", 0.8),
        layer_output("rule_based", "rally", 0.5),
    );

    let result = engine.parse_tweet("सुप्रभात", "p5b", test_date()).await;

    assert_eq!(result.event_type, event_types::OTHER);
    assert_eq!(result.consensus_score, 2, "Blank and padded labels both vote for other");
    assert_review_invariant(&result, &no_delay_config());
}

#[tokio::test]
async fn test_voting_is_deterministic() {
    let a = ClassifierOutput {
        locations: vec!["रायपुर".to_string(), "खरोरा".to_string()],
        people: vec!["विष्णु देव साय".to_string()],
        ..layer_output("remote_model", "visit", 0.7)
    };
    let b = ClassifierOutput {
        locations: vec!["खरोरा".to_string()],
        ..layer_output("local_model", "meeting", 0.7)
    };
    let c = layer_output("rule_based", "visit", 0.4);
    let engine = three_layer_engine(a, b, c);

    let first = engine.parse_tweet("दौरा", "p6", test_date()).await;
    let second = engine.parse_tweet("दौरा", "p6", test_date()).await;

    let strip = |r: &ParsingResult| ParsingResult {
        parsed_at: chrono::DateTime::<chrono::Utc>::MIN_UTC,
        ..r.clone()
    };
    assert_eq!(
        serde_json::to_string(&strip(&first)).unwrap(),
        serde_json::to_string(&strip(&second)).unwrap()
    );
}

// ============================================================================
// Field voting
// ============================================================================

#[tokio::test]
async fn test_field_thresholds_drop_weak_items() {
    let a = ClassifierOutput {
        locations: vec!["रायपुर".to_string()],
        organizations: vec!["भाजपा".to_string()],
        ..layer_output("remote_model", "rally", 0.9)
    };
    let b = ClassifierOutput {
        organizations: vec!["भाजपा".to_string()],
        schemes: vec!["महतारी वंदन योजना".to_string()],
        ..layer_output("local_model", "rally", 0.9)
    };
    let c = ClassifierOutput {
        locations: vec!["दुर्ग".to_string()],
        ..layer_output("rule_based", "rally", 0.9)
    };
    let engine = three_layer_engine(a, b, c);

    let result = engine.parse_tweet("रैली", "p7", test_date()).await;

    // Total weight 6: remote alone (3) passes 0.4, rule-based alone (1) does not
    assert_eq!(result.locations, vec!["रायपुर"]);
    // Local alone (2) misses 0.4 × 6 = 2.4
    assert!(result.schemes_mentioned.is_empty());
    // 5 of 6 passes the organization bar of 0.5
    assert_eq!(result.organizations, vec!["भाजपा"]);
}

// ============================================================================
// Layer failures
// ============================================================================

#[tokio::test]
async fn test_failed_layer_is_excluded_not_stubbed() {
    let remote = MockLayer::failing("remote_model", LayerKind::Remote, "connection refused");
    let engine = ConsensusEngine::builder(no_delay_config())
        .layer(remote.clone().into_arc())
        .layer(
            MockLayer::ok(
                "local_model",
                LayerKind::Local,
                layer_output("local_model", "protest", 0.8),
            )
            .into_arc(),
        )
        .layer(
            MockLayer::ok(
                "rule_based",
                LayerKind::Deterministic,
                layer_output("rule_based", "protest", 0.7),
            )
            .into_arc(),
        )
        .build();

    let result = engine.parse_tweet("धरना प्रदर्शन", "p8", test_date()).await;

    assert_eq!(remote.call_count(), 1);
    assert_eq!(result.layers_used, vec!["local_model", "rule_based"]);
    assert_eq!(result.event_type, "protest");
    assert_eq!(result.consensus_score, 2);
    // Mean over successful layers only
    assert!((result.overall_confidence - (0.75 + 0.15)).abs() < 1e-9);
    assert!(result.reasoning.contains("remote_model"));
}

#[tokio::test]
async fn test_all_layers_failing_still_returns_result() {
    let engine = ConsensusEngine::builder(no_delay_config())
        .layer(MockLayer::failing("remote_model", LayerKind::Remote, "timeout").into_arc())
        .layer(MockLayer::failing("local_model", LayerKind::Local, "refused").into_arc())
        .build();

    let result = engine.parse_tweet("रायपुर में रैली", "p9", test_date()).await;

    assert_eq!(result.event_type, event_types::OTHER);
    assert_eq!(result.overall_confidence, 0.0);
    assert!(result.needs_review);
    assert!(result.layers_used.is_empty());
}

#[tokio::test]
async fn test_empty_text_invokes_no_layer() {
    let remote = MockLayer::ok(
        "remote_model",
        LayerKind::Remote,
        layer_output("remote_model", "rally", 0.9),
    );
    let engine = ConsensusEngine::builder(no_delay_config())
        .layer(remote.clone().into_arc())
        .build();

    let result = engine.parse_tweet(" \n\t ", "p10", test_date()).await;

    assert_eq!(remote.call_count(), 0);
    assert!(result.needs_review);
    assert_eq!(result.event_type, event_types::OTHER);
}

// ============================================================================
// Inter-layer delay
// ============================================================================

#[tokio::test(start_paused = true)]
async fn test_delay_between_network_layers() {
    let config = ConsensusConfig {
        inter_layer_delay_ms: 500,
        ..Default::default()
    };
    let remote = MockLayer::ok(
        "remote_model",
        LayerKind::Remote,
        layer_output("remote_model", "rally", 0.9),
    );
    let local = MockLayer::ok(
        "local_model",
        LayerKind::Local,
        layer_output("local_model", "rally", 0.9),
    );
    let rules = MockLayer::ok(
        "rule_based",
        LayerKind::Deterministic,
        layer_output("rule_based", "rally", 0.5),
    );
    let engine = ConsensusEngine::builder(config)
        .layer(remote.clone().into_arc())
        .layer(local.clone().into_arc())
        .layer(rules.clone().into_arc())
        .build();

    engine.parse_tweet("रैली", "p11", test_date()).await;

    let a = remote.call_times()[0];
    let b = local.call_times()[0];
    let c = rules.call_times()[0];
    assert!(b.duration_since(a) >= Duration::from_millis(500));
    assert!(
        c.duration_since(b) < Duration::from_millis(500),
        "No delay before the rule-based layer"
    );
}

#[tokio::test(start_paused = true)]
async fn test_no_delay_without_preceding_network_layer() {
    let config = ConsensusConfig {
        inter_layer_delay_ms: 500,
        ..Default::default()
    };
    let rules = MockLayer::ok(
        "rule_based",
        LayerKind::Deterministic,
        layer_output("rule_based", "rally", 0.5),
    );
    let local = MockLayer::ok(
        "local_model",
        LayerKind::Local,
        layer_output("local_model", "rally", 0.9),
    );
    let engine = ConsensusEngine::builder(config)
        .layer(rules.clone().into_arc())
        .layer(local.clone().into_arc())
        .build();

    let started = tokio::time::Instant::now();
    engine.parse_tweet("रैली", "p12", test_date()).await;

    assert!(local.call_times()[0].duration_since(started) < Duration::from_millis(500));
}

// ============================================================================
// Batch and real rule-based layer
// ============================================================================

#[tokio::test]
async fn test_batch_preserves_input_order() {
    let engine = ConsensusEngine::builder(no_delay_config())
        .layer(Arc::new(RuleBasedClassifier::new()))
        .build();

    let items: Vec<PostInput> = ["रायपुर में रैली", "", "ग्राम खरोरा में भूमिपूजन"]
        .iter()
        .enumerate()
        .map(|(i, text)| PostInput {
            id: format!("b{}", i),
            text: text.to_string(),
            reference_date: test_date(),
        })
        .collect();

    let results = engine.parse_batch(items, 2).await;

    let ids: Vec<&str> = results.iter().map(|r| r.item_id.as_str()).collect();
    assert_eq!(ids, vec!["b0", "b1", "b2"]);
    assert!(results[1].layers_used.is_empty());
    for result in &results {
        assert_review_invariant(result, &no_delay_config());
    }
}

#[tokio::test]
async fn test_rule_based_alone_is_low_confidence_review_case() {
    let engine = ConsensusEngine::builder(no_delay_config())
        .layer(Arc::new(RuleBasedClassifier::new()))
        .build();

    let result = engine
        .parse_tweet("ग्राम खरोरा में भूमिपूजन कार्यक्रम", "p13", test_date())
        .await;

    assert_eq!(result.event_type, event_types::FOUNDATION_STONE);
    assert_eq!(result.locations, vec!["खरोरा"]);
    assert!(result.consensus_score <= 1);
    assert!(result.needs_review);
    assert_review_invariant(&result, &no_delay_config());
}
