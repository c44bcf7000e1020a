use crate::application::PollConfig;
use crate::domain::errors::{DomainError, DomainResult};
use crate::infrastructure::config::campay_config::CampayConfig;
use std::str::FromStr;
use std::time::Duration;

/// Service configuration loaded from the environment
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Postgres URL; the in-memory ledger is used when absent
    pub database_url: Option<String>,
    pub host: String,
    pub port: u16,
    pub poll: PollConfig,
    /// How long before the stated expiry a provider token is refreshed
    pub token_refresh_margin: Duration,
    pub campay: CampayConfig,
}

impl AppConfig {
    pub fn from_env() -> DomainResult<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> DomainResult<Self> {
        let poll = PollConfig {
            interval: Duration::from_secs(parse_or(&lookup, "POLL_INTERVAL_SECS", 3u64)?),
            budget: Duration::from_secs(parse_or(&lookup, "POLL_BUDGET_SECS", 180u64)?),
        };

        if poll.interval.is_zero() || poll.budget < poll.interval {
            return Err(DomainError::ConfigurationError(
                "POLL_INTERVAL_SECS must be positive and not exceed POLL_BUDGET_SECS".to_string(),
            ));
        }

        Ok(Self {
            database_url: lookup("DATABASE_URL").filter(|v| !v.trim().is_empty()),
            host: lookup("SERVER_HOST").unwrap_or_else(|| "0.0.0.0".to_string()),
            port: parse_or(&lookup, "SERVER_PORT", 3000u16)?,
            poll,
            token_refresh_margin: Duration::from_secs(parse_or(
                &lookup,
                "TOKEN_REFRESH_MARGIN_SECS",
                600u64,
            )?),
            campay: CampayConfig::from_lookup(&lookup)?,
        })
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn parse_or<T: FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
    default: T,
) -> DomainResult<T> {
    match lookup(key) {
        Some(raw) => raw.trim().parse::<T>().map_err(|_| {
            DomainError::ConfigurationError(format!("{key} has an invalid value '{raw}'"))
        }),
        None => Ok(default),
    }
}
