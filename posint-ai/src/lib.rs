//! posint-ai library interface
//!
//! Structured extraction from Hindi/English political posts:
//! - **classifiers**: remote model, local model and rule-based layers
//! - **consensus**: weighted voting over the layers, review gate
//! - **geo**: deterministic mapping of place mentions onto the
//!   administrative hierarchy
//! - **pipeline**: parse a post and resolve its locations

pub mod classifiers;
pub mod config;
pub mod consensus;
pub mod error;
pub mod geo;
pub mod pipeline;
pub mod rate_limiter;
pub mod types;

pub use crate::consensus::{ConsensusEngine, PostInput};
pub use crate::error::{ClassifierError, GeoError, GeoResult};
pub use crate::geo::{GeoHierarchy, GeoResolver, ResolutionHints, ResolutionOutcome};
pub use crate::types::{Classifier, ClassifierOutput, LayerKind, ParsingResult};
