//! Static geography dataset and optional overlays
//!
//! The core dataset is a district → assembly → block → panchayat → village
//! tree in JSON. Two overlays may be layered on top:
//! - alias table (free-form alias → canonical village name)
//! - urban table (ULB ward registry and per-city sector → ward maps)
//!
//! A missing overlay file is logged and skipped; a malformed one is an error.

use crate::error::{GeoError, GeoResult};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use tracing::{debug, warn};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GeoDataset {
    #[serde(default)]
    pub districts: Vec<District>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct District {
    pub name: String,
    #[serde(default)]
    pub assemblies: Vec<Assembly>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Assembly {
    pub name: String,
    #[serde(default)]
    pub blocks: Vec<Block>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Block {
    pub name: String,
    #[serde(default)]
    pub panchayats: Vec<Panchayat>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Panchayat {
    pub name: String,
    #[serde(default)]
    pub villages: Vec<String>,
}

impl GeoDataset {
    /// Load the core dataset
    ///
    /// # Errors
    /// `GeoError::Dataset` if the file is missing or malformed
    pub fn from_file(path: &Path) -> GeoResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            GeoError::Dataset(format!("failed to read {}: {}", path.display(), e))
        })?;
        Self::from_json_str(&content)
            .map_err(|e| GeoError::Dataset(format!("{}: {}", path.display(), e)))
    }

    pub fn from_json_str(json: &str) -> GeoResult<Self> {
        serde_json::from_str(json).map_err(|e| GeoError::Dataset(e.to_string()))
    }

    /// Number of leaf villages/wards
    pub fn village_count(&self) -> usize {
        self.districts
            .iter()
            .flat_map(|d| &d.assemblies)
            .flat_map(|a| &a.blocks)
            .flat_map(|b| &b.panchayats)
            .map(|p| p.villages.len())
            .sum()
    }
}

/// Alias overlay: alias → canonical village name
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AliasOverlay {
    #[serde(default)]
    pub aliases: HashMap<String, String>,
}

/// Urban overlay: ULB ward registry and sector tables
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UrbanOverlay {
    /// ULB name keyed by district, replacing the synthesized fallback
    #[serde(default)]
    pub district_ulbs: HashMap<String, String>,
    #[serde(default)]
    pub ulbs: Vec<UlbWards>,
    #[serde(default)]
    pub sectors: Vec<SectorTable>,
}

/// Known ward numbers of one ULB
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UlbWards {
    pub ulb: String,
    #[serde(default)]
    pub wards: Vec<u32>,
}

/// Sector → ward map for one planned city
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SectorTable {
    pub city: String,
    pub ulb: String,
    pub district: String,
    pub assembly: String,
    pub block: String,
    /// Sector label (as written, e.g. "6") → ward number
    #[serde(default)]
    pub sectors: HashMap<String, u32>,
}

/// Overlays loaded after the core index
#[derive(Debug, Clone, Default)]
pub struct Overlays {
    pub aliases: Option<AliasOverlay>,
    pub urban: Option<UrbanOverlay>,
}

impl Overlays {
    /// Load whichever overlay paths are configured
    ///
    /// # Errors
    /// `GeoError::Dataset` if an existing overlay file cannot be parsed
    pub fn load(aliases_path: Option<&Path>, urban_path: Option<&Path>) -> GeoResult<Self> {
        Ok(Self {
            aliases: load_optional(aliases_path, "alias")?,
            urban: load_optional(urban_path, "urban")?,
        })
    }
}

fn load_optional<T>(path: Option<&Path>, label: &str) -> GeoResult<Option<T>>
where
    T: for<'de> Deserialize<'de>,
{
    let Some(path) = path else {
        debug!(overlay = label, "Overlay not configured");
        return Ok(None);
    };

    if !path.exists() {
        warn!(
            overlay = label,
            path = %path.display(),
            "Overlay file not found, continuing without it"
        );
        return Ok(None);
    }

    let content = std::fs::read_to_string(path).map_err(|e| {
        GeoError::Dataset(format!("failed to read {} overlay {}: {}", label, path.display(), e))
    })?;
    let parsed = serde_json::from_str(&content).map_err(|e| {
        GeoError::Dataset(format!("invalid {} overlay {}: {}", label, path.display(), e))
    })?;
    Ok(Some(parsed))
}
