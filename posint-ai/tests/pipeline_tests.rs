//! Parse-then-resolve pipeline tests

mod helpers;

use helpers::{fixture_resolver, layer_output, no_delay_config, test_date, MockLayer};
use posint_ai::consensus::ConsensusEngine;
use posint_ai::pipeline::ingest_post;
use posint_ai::types::{ClassifierOutput, LayerKind};

fn engine_reporting(locations: &[&str]) -> ConsensusEngine {
    let output = ClassifierOutput {
        locations: locations.iter().map(|s| s.to_string()).collect(),
        ..layer_output("remote_model", "rally", 0.9)
    };
    ConsensusEngine::builder(no_delay_config())
        .layer(MockLayer::ok("remote_model", LayerKind::Remote, output).into_arc())
        .build()
}

#[tokio::test]
async fn test_locations_resolved_with_post_as_context() {
    let engine = engine_reporting(&["भिलाई सेक्टर 6", "सोनपुर"]);
    let resolver = fixture_resolver(true);
    let text = "भिलाई सेक्टर 6 के बाद पाटन के सोनपुर में रैली";

    let post = ingest_post(&engine, &resolver, text, "x1", test_date()).await;

    assert_eq!(post.geo.len(), 2);
    let ward = post.geo[0].outcome.as_ref().unwrap().hierarchy.as_ref().unwrap();
    assert_eq!(ward.ward_no(), Some(21));

    // पाटन in the post text picks the दुर्ग homonym
    let village = post.geo[1].outcome.as_ref().unwrap().hierarchy.as_ref().unwrap();
    assert_eq!(village.district, "दुर्ग");
    assert!(post.geo.iter().all(|link| link.is_resolved()));
}

#[tokio::test]
async fn test_strict_no_match_is_captured_per_location() {
    let engine = engine_reporting(&["अज्ञातपुर", "खरोरा"]);
    let resolver = fixture_resolver(true);

    let text = "अज्ञातपुर और खरोरा में रैली";
    let post = ingest_post(&engine, &resolver, text, "x2", test_date()).await;

    assert_eq!(post.geo.len(), 2);
    assert!(post.geo[0].outcome.is_none());
    assert!(post.geo[0].error.as_deref().unwrap().contains("अज्ञातपुर"));
    assert!(post.geo[1].is_resolved());
    assert!(post.needs_review());
}

#[tokio::test]
async fn test_uninitialized_resolver_leaves_locations_unresolved() {
    let engine = engine_reporting(&["खरोरा"]);
    let resolver = posint_ai::GeoResolver::new(false);

    let post = ingest_post(&engine, &resolver, "खरोरा में रैली", "x3", test_date()).await;

    assert_eq!(post.parsing.locations, vec!["खरोरा"]);
    assert!(post.geo[0].error.is_some());
}
