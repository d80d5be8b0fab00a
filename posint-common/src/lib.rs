//! # posint Common Library
//!
//! Shared code for the posint crates:
//! - Error types
//! - TOML configuration model, loading and validation

pub mod config;
pub mod error;

pub use error::{Error, Result};
