//! Runtime wiring from configuration
//!
//! Turns a validated `TomlConfig` into the shared rate limiter and the geo
//! resolver. Every failure here is a configuration error raised at startup,
//! never at call time.

use crate::geo::GeoResolver;
use crate::rate_limiter::{ProviderRateLimiter, LOCAL_PROVIDER, REMOTE_PROVIDER};
use posint_common::config::{GeoConfig, TomlConfig};
use posint_common::{Error, Result};
use tracing::{info, warn};

/// Rate limiter with one bucket per enabled network provider
///
/// # Errors
/// `Error::Config` if an enabled provider has a ceiling of 0
pub fn build_rate_limiter(config: &TomlConfig) -> Result<ProviderRateLimiter> {
    let mut limiter = ProviderRateLimiter::new();
    let providers = &config.providers;

    if providers.remote.enabled {
        limiter = limiter
            .with_provider(REMOTE_PROVIDER, providers.remote.requests_per_minute)
            .map_err(|e| Error::Config(e.to_string()))?;
    }
    if providers.local.enabled {
        limiter = limiter
            .with_provider(LOCAL_PROVIDER, providers.local.requests_per_minute)
            .map_err(|e| Error::Config(e.to_string()))?;
    }

    Ok(limiter)
}

/// Resolver initialized from the configured dataset
///
/// Without a dataset path the resolver stays uninitialized and a warning is
/// logged; callers that need geography get `GeoError::NotInitialized`.
///
/// # Errors
/// `Error::Parse` if the dataset or an existing overlay is unreadable
pub fn build_resolver(config: &GeoConfig) -> Result<GeoResolver> {
    let mut resolver = GeoResolver::new(config.strict_mode);

    match &config.dataset_path {
        Some(path) => {
            info!(dataset = %path.display(), "Loading geography dataset");
            resolver.initialize(config)?;
        }
        None => warn!("No geography dataset configured; location resolution disabled"),
    }

    Ok(resolver)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_ceiling_is_config_error() {
        let mut config = TomlConfig::default();
        config.providers.local.enabled = true;
        config.providers.local.requests_per_minute = 0;
        assert!(matches!(build_rate_limiter(&config), Err(Error::Config(_))));
    }

    #[test]
    fn test_disabled_providers_get_no_bucket() {
        let limiter = build_rate_limiter(&TomlConfig::default()).unwrap();
        assert!(!limiter.has_provider(REMOTE_PROVIDER));
        assert!(!limiter.has_provider(LOCAL_PROVIDER));
    }

    #[test]
    fn test_resolver_without_dataset() {
        let resolver = build_resolver(&GeoConfig::default()).unwrap();
        assert!(!resolver.is_initialized());
    }

    #[test]
    fn test_resolver_with_missing_dataset_fails() {
        let config = GeoConfig {
            dataset_path: Some("/nonexistent/geo.json".into()),
            ..Default::default()
        };
        assert!(matches!(build_resolver(&config), Err(Error::Parse(_))));
    }
}
