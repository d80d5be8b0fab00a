//! Configuration loading and validation
//!
//! Bootstrap configuration is a single TOML file. Every field has a built-in
//! default, so an empty file (or no file at all) yields a working setup that
//! runs only the rule-based layer.
//!
//! # Config file priority
//! 1. Command-line argument (`--config`)
//! 2. Environment variable `POSINT_CONFIG`
//! 3. `<config_dir>/posint/config.toml`
//! 4. Compiled defaults
//!
//! Environment overrides applied after loading:
//! - `POSINT_REMOTE_API_KEY` - remote provider API key
//! - `POSINT_GEO_STRICT` - global strict-mode flag for geo resolution

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Environment variable naming an explicit config file
pub const CONFIG_ENV_VAR: &str = "POSINT_CONFIG";

/// Environment variable carrying the remote provider API key
pub const REMOTE_API_KEY_ENV_VAR: &str = "POSINT_REMOTE_API_KEY";

/// Environment variable toggling geo strict mode
pub const GEO_STRICT_ENV_VAR: &str = "POSINT_GEO_STRICT";

/// Bootstrap configuration loaded from TOML
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TomlConfig {
    #[serde(default)]
    pub logging: LoggingConfig,

    #[serde(default)]
    pub consensus: ConsensusConfig,

    #[serde(default)]
    pub providers: ProvidersConfig,

    #[serde(default)]
    pub geo: GeoConfig,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

/// Consensus voting parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConsensusConfig {
    /// Results below this overall confidence are sent to review
    #[serde(default = "default_review_threshold")]
    pub review_threshold: f64,

    /// Minimum number of agreeing layers for the consensus bonus
    #[serde(default = "default_consensus_threshold")]
    pub consensus_threshold: u32,

    /// A layer only counts toward the consensus score above this confidence
    #[serde(default = "default_min_layer_confidence")]
    pub min_layer_confidence: f64,

    /// Added to the mean layer confidence when consensus is reached
    #[serde(default = "default_consensus_bonus")]
    pub consensus_bonus: f64,

    /// Pause between two network layers of the same item (milliseconds)
    #[serde(default = "default_inter_layer_delay_ms")]
    pub inter_layer_delay_ms: u64,

    /// Share of total layer weight a location needs to be kept
    #[serde(default = "default_entity_threshold")]
    pub location_threshold: f64,

    #[serde(default = "default_entity_threshold")]
    pub people_threshold: f64,

    #[serde(default = "default_organization_threshold")]
    pub organization_threshold: f64,

    #[serde(default = "default_entity_threshold")]
    pub scheme_threshold: f64,
}

impl Default for ConsensusConfig {
    fn default() -> Self {
        Self {
            review_threshold: default_review_threshold(),
            consensus_threshold: default_consensus_threshold(),
            min_layer_confidence: default_min_layer_confidence(),
            consensus_bonus: default_consensus_bonus(),
            inter_layer_delay_ms: default_inter_layer_delay_ms(),
            location_threshold: default_entity_threshold(),
            people_threshold: default_entity_threshold(),
            organization_threshold: default_organization_threshold(),
            scheme_threshold: default_entity_threshold(),
        }
    }
}

/// Classifier provider endpoints
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProvidersConfig {
    #[serde(default)]
    pub remote: RemoteProviderConfig,

    #[serde(default)]
    pub local: LocalProviderConfig,
}

/// High-accuracy hosted model (OpenAI-compatible chat completions)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemoteProviderConfig {
    #[serde(default)]
    pub enabled: bool,

    #[serde(default = "default_remote_base_url")]
    pub base_url: String,

    #[serde(default = "default_remote_model")]
    pub model: String,

    /// API key (overridden by `POSINT_REMOTE_API_KEY`)
    #[serde(default)]
    pub api_key: Option<String>,

    #[serde(default = "default_remote_rpm")]
    pub requests_per_minute: u32,

    #[serde(default = "default_remote_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for RemoteProviderConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            base_url: default_remote_base_url(),
            model: default_remote_model(),
            api_key: None,
            requests_per_minute: default_remote_rpm(),
            timeout_secs: default_remote_timeout_secs(),
        }
    }
}

/// Self-hosted model (Ollama-compatible generate endpoint)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LocalProviderConfig {
    #[serde(default)]
    pub enabled: bool,

    #[serde(default = "default_local_base_url")]
    pub base_url: String,

    #[serde(default = "default_local_model")]
    pub model: String,

    #[serde(default = "default_local_rpm")]
    pub requests_per_minute: u32,

    #[serde(default = "default_local_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for LocalProviderConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            base_url: default_local_base_url(),
            model: default_local_model(),
            requests_per_minute: default_local_rpm(),
            timeout_secs: default_local_timeout_secs(),
        }
    }
}

/// Geography dataset and resolution policy
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GeoConfig {
    /// Static geography tree (JSON)
    #[serde(default)]
    pub dataset_path: Option<PathBuf>,

    /// Optional alias overlay (JSON)
    #[serde(default)]
    pub aliases_path: Option<PathBuf>,

    /// Optional ULB / ward / sector overlay (JSON)
    #[serde(default)]
    pub urban_overlay_path: Option<PathBuf>,

    /// Strict mode: unresolved names are hard errors, ambiguity is never guessed
    #[serde(default)]
    pub strict_mode: bool,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_review_threshold() -> f64 {
    0.6
}

fn default_consensus_threshold() -> u32 {
    2
}

fn default_min_layer_confidence() -> f64 {
    0.4
}

fn default_consensus_bonus() -> f64 {
    0.15
}

fn default_inter_layer_delay_ms() -> u64 {
    500
}

fn default_entity_threshold() -> f64 {
    0.4
}

fn default_organization_threshold() -> f64 {
    0.5
}

fn default_remote_base_url() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_remote_model() -> String {
    "gpt-4o-mini".to_string()
}

fn default_remote_rpm() -> u32 {
    10
}

fn default_remote_timeout_secs() -> u64 {
    30
}

fn default_local_base_url() -> String {
    "http://127.0.0.1:11434".to_string()
}

fn default_local_model() -> String {
    "llama3.1:8b".to_string()
}

fn default_local_rpm() -> u32 {
    60
}

fn default_local_timeout_secs() -> u64 {
    60
}

impl TomlConfig {
    /// Parse configuration from TOML text
    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| Error::Config(format!("Parse TOML failed: {}", e)))
    }

    /// Read configuration from a file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("Read {} failed: {}", path.display(), e)))?;
        Self::from_toml_str(&content)
    }

    /// Load, apply environment overrides and validate
    ///
    /// An explicitly named file (CLI or `POSINT_CONFIG`) must exist. The
    /// per-user default location is optional: absence logs a warning and
    /// falls back to compiled defaults.
    pub fn load(cli_path: Option<&Path>) -> Result<Self> {
        let mut config = match ConfigFileResolver::new(cli_path).resolve() {
            ConfigSource::Explicit(path) => {
                info!("Loading configuration from {}", path.display());
                Self::from_file(&path)?
            }
            ConfigSource::UserDefault(path) => {
                info!("Loading configuration from {}", path.display());
                Self::from_file(&path)?
            }
            ConfigSource::CompiledDefaults => {
                warn!("No configuration file found, using compiled defaults");
                Self::default()
            }
        };

        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Apply `POSINT_REMOTE_API_KEY` and `POSINT_GEO_STRICT`
    pub fn apply_env_overrides(&mut self) {
        if let Some(key) = std::env::var(REMOTE_API_KEY_ENV_VAR)
            .ok()
            .filter(|k| is_valid_key(k))
        {
            if self
                .providers
                .remote
                .api_key
                .as_deref()
                .is_some_and(is_valid_key)
            {
                warn!("Remote API key found in both environment and TOML, using environment");
            }
            self.providers.remote.api_key = Some(key);
        }

        if let Ok(flag) = std::env::var(GEO_STRICT_ENV_VAR) {
            match parse_bool_flag(&flag) {
                Some(strict) => self.geo.strict_mode = strict,
                None => warn!(
                    value = %flag,
                    "Ignoring unrecognized {} value", GEO_STRICT_ENV_VAR
                ),
            }
        }
    }

    /// Fail fast on values that would misbehave at call time
    pub fn validate(&self) -> Result<()> {
        let c = &self.consensus;
        for (name, value) in [
            ("consensus.review_threshold", c.review_threshold),
            ("consensus.min_layer_confidence", c.min_layer_confidence),
            ("consensus.consensus_bonus", c.consensus_bonus),
            ("consensus.location_threshold", c.location_threshold),
            ("consensus.people_threshold", c.people_threshold),
            ("consensus.organization_threshold", c.organization_threshold),
            ("consensus.scheme_threshold", c.scheme_threshold),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(Error::Config(format!(
                    "{} must be within [0, 1], got {}",
                    name, value
                )));
            }
        }

        if self.providers.remote.enabled && self.providers.remote.requests_per_minute == 0 {
            return Err(Error::Config(
                "providers.remote.requests_per_minute must be greater than 0".to_string(),
            ));
        }
        if self.providers.local.enabled && self.providers.local.requests_per_minute == 0 {
            return Err(Error::Config(
                "providers.local.requests_per_minute must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }

    /// Remote API key, if one is configured
    pub fn remote_api_key(&self) -> Option<&str> {
        self.providers
            .remote
            .api_key
            .as_deref()
            .filter(|k| is_valid_key(k))
    }
}

/// Where the configuration came from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigSource {
    /// Named on the command line or via `POSINT_CONFIG`
    Explicit(PathBuf),
    /// Found at the per-user default location
    UserDefault(PathBuf),
    /// No file; use built-in defaults
    CompiledDefaults,
}

/// Resolves which config file to read
pub struct ConfigFileResolver {
    cli_path: Option<PathBuf>,
}

impl ConfigFileResolver {
    pub fn new(cli_path: Option<&Path>) -> Self {
        Self {
            cli_path: cli_path.map(Path::to_path_buf),
        }
    }

    pub fn resolve(&self) -> ConfigSource {
        // Priority 1: command-line argument
        if let Some(path) = &self.cli_path {
            return ConfigSource::Explicit(path.clone());
        }

        // Priority 2: environment variable
        if let Ok(path) = std::env::var(CONFIG_ENV_VAR) {
            if !path.trim().is_empty() {
                return ConfigSource::Explicit(PathBuf::from(path));
            }
        }

        // Priority 3: per-user config directory
        if let Some(path) = default_config_path() {
            if path.exists() {
                return ConfigSource::UserDefault(path);
            }
        }

        // Priority 4: compiled defaults
        ConfigSource::CompiledDefaults
    }
}

/// `<config_dir>/posint/config.toml` for the current platform
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("posint").join("config.toml"))
}

/// Validate an API key (non-empty, non-whitespace)
pub fn is_valid_key(key: &str) -> bool {
    !key.trim().is_empty()
}

fn parse_bool_flag(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_toml_uses_defaults() {
        let config = TomlConfig::from_toml_str("").unwrap();
        assert_eq!(config.logging.level, "info");
        assert_eq!(config.consensus.consensus_threshold, 2);
        assert_eq!(config.consensus.organization_threshold, 0.5);
        assert!(!config.providers.remote.enabled);
        assert!(!config.geo.strict_mode);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_section_keeps_other_defaults() {
        let config = TomlConfig::from_toml_str(
            "[consensus]\nreview_threshold = 0.75\n[providers.remote]\nenabled = true\n",
        )
        .unwrap();
        assert_eq!(config.consensus.review_threshold, 0.75);
        assert_eq!(config.consensus.min_layer_confidence, 0.4);
        assert!(config.providers.remote.enabled);
        assert_eq!(config.providers.remote.requests_per_minute, 10);
    }

    #[test]
    fn test_zero_rpm_rejected_when_enabled() {
        let config = TomlConfig::from_toml_str(
            "[providers.local]\nenabled = true\nrequests_per_minute = 0\n",
        )
        .unwrap();
        assert!(matches!(config.validate(), Err(Error::Config(_))));
    }

    #[test]
    fn test_zero_rpm_ignored_when_disabled() {
        let config =
            TomlConfig::from_toml_str("[providers.local]\nrequests_per_minute = 0\n").unwrap();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_threshold_out_of_range_rejected() {
        let config =
            TomlConfig::from_toml_str("[consensus]\nreview_threshold = 1.5\n").unwrap();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("review_threshold"));
    }

    #[test]
    fn test_malformed_toml_is_config_error() {
        let result = TomlConfig::from_toml_str("[consensus\nreview_threshold = ");
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[test]
    fn test_parse_bool_flag() {
        assert_eq!(parse_bool_flag("TRUE"), Some(true));
        assert_eq!(parse_bool_flag(" 0 "), Some(false));
        assert_eq!(parse_bool_flag("maybe"), None);
    }

    #[test]
    fn test_blank_api_key_is_not_configured() {
        let mut config = TomlConfig::default();
        config.providers.remote.api_key = Some("   ".to_string());
        assert!(config.remote_api_key().is_none());
    }
}
