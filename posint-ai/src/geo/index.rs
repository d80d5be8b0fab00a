//! In-memory geographic index
//!
//! Built once from the static dataset plus overlays, read-only afterwards.
//! Every leaf village/ward becomes one `GeoHierarchy` at confidence 1.0,
//! indexed by normalized name. Homonyms share one exact-index entry.

use super::dataset::{GeoDataset, Overlays, SectorTable};
use super::normalize::{
    explicit_ward_number, fuzzy_variants, hashed_ward_number, is_urban_unit, normalize_name,
};
use super::types::{GeoHierarchy, LocalBody};
use serde::Serialize;
use std::collections::{BTreeSet, HashMap, HashSet};
use tracing::debug;

/// Sibling villages kept per node for context scoring
pub const MAX_SIBLINGS: usize = 5;

/// Minimum length (in chars) of the shorter side of a fuzzy containment hit
pub const MIN_FUZZY_CHARS: usize = 3;

/// Confidence assigned to fuzzy hits
pub const FUZZY_CONFIDENCE: f64 = 0.8;

/// Counts reported after index construction
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct GeoIndexStats {
    pub districts: usize,
    pub assemblies: usize,
    pub blocks: usize,
    pub panchayats: usize,
    pub nodes: usize,
    pub urban_nodes: usize,
    pub distinct_names: usize,
    pub fuzzy_entries: usize,
    pub aliases: usize,
    pub registered_ulbs: usize,
    pub sector_cities: usize,
}

/// Multi-level lookup structure over the administrative tree
#[derive(Debug, Default)]
pub struct GeoIndex {
    /// Normalized village name → every node with that name
    exact: HashMap<String, Vec<GeoHierarchy>>,
    /// (loose variant, canonical normalized name), in insertion order
    fuzzy: Vec<(String, String)>,
    /// Normalized alias → canonical normalized name
    aliases: HashMap<String, String>,
    /// ULB name → known ward numbers (overlay only)
    ulb_wards: HashMap<String, BTreeSet<u32>>,
    /// Normalized district → ULB name from the urban overlay
    district_ulbs: HashMap<String, String>,
    /// Normalized city → sector table
    sectors: HashMap<String, SectorTable>,
    /// Node key → up to `MAX_SIBLINGS` other villages of the same panchayat
    siblings: HashMap<String, Vec<String>>,
    /// Village names as written, first-seen order, no duplicates
    place_names: Vec<String>,
    stats: GeoIndexStats,
}

impl GeoIndex {
    /// Walk the dataset once and build every index
    pub fn build(dataset: &GeoDataset, overlays: Overlays) -> Self {
        let mut index = GeoIndex::default();
        let urban_overlay = overlays.urban.unwrap_or_default();

        index.district_ulbs = urban_overlay
            .district_ulbs
            .iter()
            .map(|(district, ulb)| (normalize_name(district), ulb.clone()))
            .collect();

        let mut seen_fuzzy: HashSet<(String, String)> = HashSet::new();
        let mut seen_places: HashSet<String> = HashSet::new();

        for district in &dataset.districts {
            index.stats.districts += 1;
            let ulb = index.ulb_for_district(&district.name);

            for assembly in &district.assemblies {
                index.stats.assemblies += 1;
                for block in &assembly.blocks {
                    index.stats.blocks += 1;
                    for panchayat in &block.panchayats {
                        index.stats.panchayats += 1;

                        for village in &panchayat.villages {
                            let local_body = if is_urban_unit(village, &panchayat.name) {
                                index.stats.urban_nodes += 1;
                                LocalBody::Urban {
                                    ulb: ulb.clone(),
                                    ward_no: explicit_ward_number(village)
                                        .unwrap_or_else(|| hashed_ward_number(village)),
                                }
                            } else {
                                LocalBody::Rural {
                                    gram_panchayat: panchayat.name.clone(),
                                }
                            };

                            let node = GeoHierarchy {
                                village: village.clone(),
                                local_body,
                                block: block.name.clone(),
                                assembly: assembly.name.clone(),
                                district: district.name.clone(),
                                confidence: 1.0,
                            };

                            let siblings: Vec<String> = panchayat
                                .villages
                                .iter()
                                .filter(|v| *v != village)
                                .take(MAX_SIBLINGS)
                                .cloned()
                                .collect();
                            index.siblings.insert(node_key(&node), siblings);

                            let canonical = normalize_name(village);
                            for variant in fuzzy_variants(village) {
                                let pair = (variant, canonical.clone());
                                if seen_fuzzy.insert(pair.clone()) {
                                    index.fuzzy.push(pair);
                                }
                            }
                            if seen_places.insert(canonical.clone()) {
                                index.place_names.push(village.clone());
                            }

                            index.exact.entry(canonical).or_default().push(node);
                            index.stats.nodes += 1;
                        }
                    }
                }
            }
        }

        if let Some(alias_overlay) = overlays.aliases {
            for (alias, canonical) in alias_overlay.aliases {
                index
                    .aliases
                    .insert(normalize_name(&alias), normalize_name(&canonical));
            }
        }

        for entry in urban_overlay.ulbs {
            index
                .ulb_wards
                .entry(normalize_name(&entry.ulb))
                .or_default()
                .extend(entry.wards);
        }

        for table in urban_overlay.sectors {
            index.sectors.insert(normalize_name(&table.city), table);
        }

        index.stats.distinct_names = index.exact.len();
        index.stats.fuzzy_entries = index.fuzzy.len();
        index.stats.aliases = index.aliases.len();
        index.stats.registered_ulbs = index.ulb_wards.len();
        index.stats.sector_cities = index.sectors.len();

        debug!(stats = ?index.stats, "Geo index built");
        index
    }

    pub fn stats(&self) -> &GeoIndexStats {
        &self.stats
    }

    /// Nodes whose normalized name equals `name` (already normalized)
    pub fn exact(&self, normalized: &str) -> &[GeoHierarchy] {
        self.exact
            .get(normalized)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Canonical name for an alias (both normalized)
    pub fn canonical_alias(&self, normalized: &str) -> Option<&str> {
        self.aliases.get(normalized).map(String::as_str)
    }

    pub fn sector_table(&self, city: &str) -> Option<&SectorTable> {
        self.sectors.get(&normalize_name(city))
    }

    /// ULB of a district: overlay entry, else "<district> नगर निगम"
    pub fn ulb_for_district(&self, district: &str) -> String {
        self.district_ulbs
            .get(&normalize_name(district))
            .cloned()
            .unwrap_or_else(|| format!("{} नगर निगम", district.trim()))
    }

    /// Whether `ward_no` is registered for `ulb`; `None` when the ULB has no registry
    pub fn ward_registered(&self, ulb: &str, ward_no: u32) -> Option<bool> {
        self.ulb_wards
            .get(&normalize_name(ulb))
            .map(|wards| wards.contains(&ward_no))
    }

    /// Other villages of the node's panchayat (at most `MAX_SIBLINGS`)
    pub fn siblings(&self, node: &GeoHierarchy) -> &[String] {
        self.siblings
            .get(&node_key(node))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Distinct village names as written, for dictionary matching
    pub fn place_names(&self) -> impl Iterator<Item = &str> {
        self.place_names.iter().map(String::as_str)
    }

    /// Fuzzy hits for `query` at `FUZZY_CONFIDENCE`
    ///
    /// A hit is a fuzzy entry that contains, or is contained in, one of the
    /// query's loose variants, with the shorter side at least
    /// `MIN_FUZZY_CHARS` long. Canonical names are ordered by best
    /// normalized Levenshtein similarity; the sort is stable so index order
    /// breaks ties.
    pub fn fuzzy_matches(&self, query: &str) -> Vec<GeoHierarchy> {
        let query_variants = fuzzy_variants(query);
        let mut scored: Vec<(String, f64)> = Vec::new();

        for (variant, canonical) in &self.fuzzy {
            for q in &query_variants {
                if !contains_either_way(q, variant) {
                    continue;
                }
                let similarity = strsim::normalized_levenshtein(q, variant);
                match scored.iter_mut().find(|(c, _)| c == canonical) {
                    Some((_, best)) if similarity > *best => *best = similarity,
                    Some(_) => {}
                    None => scored.push((canonical.clone(), similarity)),
                }
            }
        }

        scored.sort_by(|a, b| b.1.total_cmp(&a.1));

        scored
            .iter()
            .flat_map(|(canonical, _)| self.exact(canonical))
            .map(|node| node.with_confidence(FUZZY_CONFIDENCE))
            .collect()
    }
}

fn contains_either_way(a: &str, b: &str) -> bool {
    let (shorter, longer) = if a.chars().count() <= b.chars().count() {
        (a, b)
    } else {
        (b, a)
    };
    shorter.chars().count() >= MIN_FUZZY_CHARS && longer.contains(shorter)
}

fn node_key(node: &GeoHierarchy) -> String {
    let unit = match &node.local_body {
        LocalBody::Rural { gram_panchayat } => normalize_name(gram_panchayat),
        LocalBody::Urban { ulb, ward_no } => format!("{}#{}", normalize_name(ulb), ward_no),
    };
    format!(
        "{}|{}|{}|{}",
        normalize_name(&node.district),
        normalize_name(&node.block),
        unit,
        normalize_name(&node.village)
    )
}
