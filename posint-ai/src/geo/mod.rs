//! Geographic hierarchy resolution
//!
//! district → assembly → block → panchayat/ULB → village/ward
//!
//! - **dataset**: static tree and optional overlays (JSON)
//! - **index**: in-memory lookup structures, built once
//! - **resolver**: lookup, hint narrowing, confidence policy, strict mode
//! - **disambiguation**: context scoring over free text

pub mod dataset;
pub mod disambiguation;
pub mod index;
pub mod normalize;
pub mod resolver;
pub mod types;

pub use dataset::{GeoDataset, Overlays};
pub use index::{GeoIndex, GeoIndexStats};
pub use resolver::GeoResolver;
pub use types::{GeoHierarchy, LocalBody, ResolutionHints, ResolutionOutcome};
