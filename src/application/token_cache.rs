use crate::domain::errors::{DomainError, DomainResult};
use crate::ports::{Clock, PaymentProviderPort};
use chrono::{DateTime, Duration, Utc};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, error, info};

/// Lifetime assumed when the provider does not state one
pub const DEFAULT_TOKEN_LIFETIME_SECS: u64 = 3600;

#[derive(Debug, Clone)]
struct CachedToken {
    token: String,
    expiry: DateTime<Utc>,
}

/// Per-process cache for the provider bearer token.
///
/// The lock is held across the fetch, so concurrent callers wait for a
/// single refresh instead of each authenticating.
pub struct TokenCache<P: PaymentProviderPort> {
    provider: Arc<P>,
    clock: Arc<dyn Clock>,
    refresh_margin: Duration,
    cached: Mutex<Option<CachedToken>>,
}

impl<P: PaymentProviderPort> TokenCache<P> {
    pub fn new(provider: Arc<P>, clock: Arc<dyn Clock>, refresh_margin: Duration) -> Self {
        Self {
            provider,
            clock,
            refresh_margin,
            cached: Mutex::new(None),
        }
    }

    /// Returns a token valid at the time of the call
    pub async fn get_token(&self) -> DomainResult<String> {
        let mut cached = self.cached.lock().await;

        if let Some(entry) = cached.as_ref() {
            if self.clock.now() < entry.expiry {
                debug!("Using cached provider token");
                return Ok(entry.token.clone());
            }
            debug!("Cached provider token expired at {}", entry.expiry);
        }

        *cached = None;

        info!("Requesting new provider token");
        let fetched = self.provider.request_token().await.map_err(|e| {
            error!("Provider token request failed: {}", e);
            match e {
                DomainError::AuthenticationError(_) => e,
                other => DomainError::AuthenticationError(other.to_string()),
            }
        })?;

        let lifetime = Duration::seconds(
            fetched
                .expires_in
                .unwrap_or(DEFAULT_TOKEN_LIFETIME_SECS)
                .min(u64::from(u32::MAX)) as i64,
        );
        let usable = (lifetime - self.refresh_margin).max(Duration::zero());
        let expiry = self.clock.now() + usable;

        *cached = Some(CachedToken {
            token: fetched.token.clone(),
            expiry,
        });

        info!("Provider token cached until {}", expiry);
        Ok(fetched.token)
    }

    /// Drops the cached token so the next call authenticates again
    pub async fn invalidate(&self) {
        let mut cached = self.cached.lock().await;
        if cached.take().is_some() {
            debug!("Provider token invalidated");
        }
    }
}
