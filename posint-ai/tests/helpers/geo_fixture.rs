//! Small synthetic geography
//!
//! - रायपुर district: urban रायपुर, rural खरोरा, and सोनपुर under सिलतरा
//! - दुर्ग district: a second सोनपुर (homonym in another district), भिलाई
//! - मानिकचौरी appears in two blocks of रायपुर district
//! - Urban overlay: रायपुर wards 1-70 registered, भिलाई sector table
//! - Alias overlay: "Raipur City" → रायपुर

use posint_ai::geo::dataset::{AliasOverlay, SectorTable, UlbWards, UrbanOverlay};
use posint_ai::geo::{GeoDataset, GeoIndex, GeoResolver, Overlays};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

pub const DATASET_JSON: &str = r#"{
  "districts": [
    {
      "name": "रायपुर",
      "assemblies": [
        {
          "name": "रायपुर ग्रामीण",
          "blocks": [
            {
              "name": "धरसींवा",
              "panchayats": [
                { "name": "रायपुर", "villages": ["रायपुर"] },
                { "name": "सिलतरा", "villages": ["सिलतरा", "सोनपुर", "टांडा"] }
              ]
            }
          ]
        },
        {
          "name": "अभनपुर",
          "blocks": [
            {
              "name": "अभनपुर",
              "panchayats": [
                { "name": "खरोरा", "villages": ["खरोरा", "केंद्री", "बेलभाठा"] },
                { "name": "गोबरा", "villages": ["गोबरा", "मानिकचौरी"] }
              ]
            }
          ]
        },
        {
          "name": "आरंग",
          "blocks": [
            {
              "name": "आरंग",
              "panchayats": [
                { "name": "भैंसा", "villages": ["भैंसा", "मानिकचौरी", "कुरुद"] }
              ]
            }
          ]
        }
      ]
    },
    {
      "name": "दुर्ग",
      "assemblies": [
        {
          "name": "पाटन",
          "blocks": [
            {
              "name": "पाटन",
              "panchayats": [
                { "name": "अमलेश्वर", "villages": ["अमलेश्वर", "सोनपुर"] }
              ]
            }
          ]
        },
        {
          "name": "भिलाई नगर",
          "blocks": [
            {
              "name": "दुर्ग",
              "panchayats": [
                { "name": "भिलाई", "villages": ["भिलाई"] }
              ]
            }
          ]
        }
      ]
    }
  ]
}"#;

pub fn fixture_dataset() -> GeoDataset {
    GeoDataset::from_json_str(DATASET_JSON).expect("fixture dataset parses")
}

pub fn fixture_overlays() -> Overlays {
    Overlays {
        aliases: Some(AliasOverlay {
            aliases: HashMap::from([("Raipur City".to_string(), "रायपुर".to_string())]),
        }),
        urban: Some(UrbanOverlay {
            district_ulbs: HashMap::new(),
            ulbs: vec![UlbWards {
                ulb: "रायपुर नगर निगम".to_string(),
                wards: (1..=70).collect(),
            }],
            sectors: vec![SectorTable {
                city: "भिलाई".to_string(),
                ulb: "भिलाई नगर निगम".to_string(),
                district: "दुर्ग".to_string(),
                assembly: "भिलाई नगर".to_string(),
                block: "दुर्ग".to_string(),
                sectors: HashMap::from([("6".to_string(), 21), ("7".to_string(), 22)]),
            }],
        }),
    }
}

/// Index over the fixture, built once and shared by resolvers
pub fn fixture_index() -> Arc<GeoIndex> {
    Arc::new(GeoIndex::build(&fixture_dataset(), fixture_overlays()))
}

/// Resolver over an injected fixture index
pub fn fixture_resolver(strict_mode: bool) -> GeoResolver {
    GeoResolver::with_index(fixture_index(), strict_mode)
}

/// Write dataset and alias overlay into `dir`; returns (dataset, aliases)
pub fn write_fixture_files(dir: &Path) -> (PathBuf, PathBuf) {
    let dataset_path = dir.join("geo.json");
    std::fs::write(&dataset_path, DATASET_JSON).expect("write dataset");

    let aliases_path = dir.join("aliases.json");
    std::fs::write(&aliases_path, r#"{ "aliases": { "Raipur City": "रायपुर" } }"#)
        .expect("write aliases");

    (dataset_path, aliases_path)
}
