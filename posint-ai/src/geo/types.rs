//! Geographic hierarchy types

use serde::{Deserialize, Serialize};

/// Local-government unit directly above a village or ward
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LocalBody {
    /// Rural village under a gram panchayat
    Rural { gram_panchayat: String },
    /// Urban ward under an urban local body
    Urban { ulb: String, ward_no: u32 },
}

/// One leaf of the administrative tree with its full ancestor chain
///
/// The rural/urban shape is carried by `LocalBody`, so a node can never hold
/// both a gram panchayat and a ULB. Serialized flat, with `is_urban`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(into = "HierarchyRecord", try_from = "HierarchyRecord")]
pub struct GeoHierarchy {
    pub village: String,
    pub local_body: LocalBody,
    pub block: String,
    pub assembly: String,
    pub district: String,
    pub confidence: f64,
}

impl GeoHierarchy {
    pub fn is_urban(&self) -> bool {
        matches!(self.local_body, LocalBody::Urban { .. })
    }

    pub fn gram_panchayat(&self) -> Option<&str> {
        match &self.local_body {
            LocalBody::Rural { gram_panchayat } => Some(gram_panchayat),
            LocalBody::Urban { .. } => None,
        }
    }

    pub fn ulb(&self) -> Option<&str> {
        match &self.local_body {
            LocalBody::Urban { ulb, .. } => Some(ulb),
            LocalBody::Rural { .. } => None,
        }
    }

    pub fn ward_no(&self) -> Option<u32> {
        match &self.local_body {
            LocalBody::Urban { ward_no, .. } => Some(*ward_no),
            LocalBody::Rural { .. } => None,
        }
    }

    /// Copy with a different confidence
    pub fn with_confidence(&self, confidence: f64) -> Self {
        Self {
            confidence,
            ..self.clone()
        }
    }

    /// Short human-readable path for explanations
    pub fn describe(&self) -> String {
        let unit = match &self.local_body {
            LocalBody::Rural { gram_panchayat } => format!("GP {}", gram_panchayat),
            LocalBody::Urban { ulb, ward_no } => format!("{} ward {}", ulb, ward_no),
        };
        format!(
            "{} ({}, block {}, assembly {}, district {})",
            self.village, unit, self.block, self.assembly, self.district
        )
    }
}

/// Flat wire shape of `GeoHierarchy`
#[derive(Debug, Clone, Serialize, Deserialize)]
struct HierarchyRecord {
    village: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    gram_panchayat: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    ulb: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    ward_no: Option<u32>,
    block: String,
    assembly: String,
    district: String,
    is_urban: bool,
    confidence: f64,
}

impl From<GeoHierarchy> for HierarchyRecord {
    fn from(node: GeoHierarchy) -> Self {
        let is_urban = node.is_urban();
        let (gram_panchayat, ulb, ward_no) = match node.local_body {
            LocalBody::Rural { gram_panchayat } => (Some(gram_panchayat), None, None),
            LocalBody::Urban { ulb, ward_no } => (None, Some(ulb), Some(ward_no)),
        };
        Self {
            village: node.village,
            gram_panchayat,
            ulb,
            ward_no,
            block: node.block,
            assembly: node.assembly,
            district: node.district,
            is_urban,
            confidence: node.confidence,
        }
    }
}

impl TryFrom<HierarchyRecord> for GeoHierarchy {
    type Error = String;

    fn try_from(record: HierarchyRecord) -> Result<Self, Self::Error> {
        let shape = (
            record.is_urban,
            record.gram_panchayat,
            record.ulb,
            record.ward_no,
        );
        let local_body = match shape {
            (false, Some(gram_panchayat), None, None) => LocalBody::Rural { gram_panchayat },
            (true, None, Some(ulb), Some(ward_no)) => LocalBody::Urban { ulb, ward_no },
            (is_urban, ..) => {
                return Err(format!(
                    "inconsistent hierarchy shape for '{}' (is_urban = {})",
                    record.village, is_urban
                ))
            }
        };
        Ok(Self {
            village: record.village,
            local_body,
            block: record.block,
            assembly: record.assembly,
            district: record.district,
            confidence: record.confidence,
        })
    }
}

/// Result of one deterministic resolution call
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ResolutionOutcome {
    pub hierarchy: Option<GeoHierarchy>,
    pub candidates: Vec<GeoHierarchy>,
    pub needs_review: bool,
    pub explanations: Vec<String>,
}

/// Caller-supplied disambiguation context
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ResolutionHints {
    #[serde(default)]
    pub districts: Vec<String>,
    #[serde(default)]
    pub blocks: Vec<String>,
    #[serde(default)]
    pub context: Option<String>,
}

impl ResolutionHints {
    pub fn with_context(context: impl Into<String>) -> Self {
        Self {
            context: Some(context.into()),
            ..Default::default()
        }
    }
}
