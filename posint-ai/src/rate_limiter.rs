//! Per-provider request permits
//!
//! Each provider key gets its own requests-per-minute ceiling. Permits are
//! spaced evenly (burst of one), so no 60-second window ever sees more than
//! the ceiling. `acquire_permit` only ever delays; it never rejects. Ceilings
//! are validated when the limiter is built, so a zero ceiling fails at startup
//! instead of stalling a caller.
//!
//! Permit issuance is serialized inside governor's atomic state, so one
//! limiter can be shared (`Arc`) across concurrently processed items.

use governor::{DefaultDirectRateLimiter, Quota, RateLimiter};
use std::collections::HashMap;
use std::num::NonZeroU32;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, trace};

/// Provider key for the remote model
pub const REMOTE_PROVIDER: &str = "remote";

/// Provider key for the local model
pub const LOCAL_PROVIDER: &str = "local";

/// Rate limiter configuration error
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RateLimiterError {
    /// Ceiling of zero requests per minute
    #[error("Provider '{0}' has a requests-per-minute ceiling of 0")]
    ZeroCeiling(String),
}

/// Independent request ceilings keyed by provider
#[derive(Clone, Default)]
pub struct ProviderRateLimiter {
    limiters: HashMap<String, Arc<DefaultDirectRateLimiter>>,
}

impl std::fmt::Debug for ProviderRateLimiter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut providers: Vec<&String> = self.limiters.keys().collect();
        providers.sort();
        f.debug_struct("ProviderRateLimiter")
            .field("providers", &providers)
            .finish()
    }
}

impl ProviderRateLimiter {
    /// Limiter with no providers registered
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a provider ceiling
    ///
    /// # Errors
    /// `RateLimiterError::ZeroCeiling` when `requests_per_minute` is 0
    pub fn with_provider(
        mut self,
        provider: impl Into<String>,
        requests_per_minute: u32,
    ) -> Result<Self, RateLimiterError> {
        let provider = provider.into();
        let rpm = NonZeroU32::new(requests_per_minute)
            .ok_or_else(|| RateLimiterError::ZeroCeiling(provider.clone()))?;

        debug!(
            provider = %provider,
            rpm = requests_per_minute,
            "Registered provider rate limit"
        );
        let quota = Quota::per_minute(rpm).allow_burst(NonZeroU32::MIN);
        self.limiters.insert(provider, Arc::new(RateLimiter::direct(quota)));
        Ok(self)
    }

    /// Wait until `provider` may issue one more request
    ///
    /// Providers without a registered ceiling are unlimited.
    pub async fn acquire_permit(&self, provider: &str) {
        match self.limiters.get(provider) {
            Some(limiter) => {
                limiter.until_ready().await;
                trace!(provider, "Permit granted");
            }
            None => trace!(provider, "No ceiling registered, permit granted"),
        }
    }

    /// Whether a ceiling is registered for `provider`
    pub fn has_provider(&self, provider: &str) -> bool {
        self.limiters.contains_key(provider)
    }
}
