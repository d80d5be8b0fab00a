//! Test Helper Utilities
//!
//! Shared utilities for testing posint-ai

#![allow(dead_code)]

pub mod geo_fixture;
pub mod mock_layers;

pub use geo_fixture::{
    fixture_dataset, fixture_index, fixture_overlays, fixture_resolver, write_fixture_files,
};
pub use mock_layers::{layer_output, MockLayer};

use chrono::NaiveDate;
use posint_common::config::ConsensusConfig;

/// Fixed reference date for parse calls
pub fn test_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 3, 8).expect("valid date")
}

/// Consensus defaults without the inter-layer delay
pub fn no_delay_config() -> ConsensusConfig {
    ConsensusConfig {
        inter_layer_delay_ms: 0,
        ..Default::default()
    }
}
