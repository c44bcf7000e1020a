use crate::domain::errors::{DomainError, DomainResult};
use serde::{Deserialize, Serialize};

pub const DEFAULT_BASE_URL: &str = "https://demo.campay.net/api";

/// Campay configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CampayConfig {
    /// API base URL, without trailing slash
    pub base_url: String,

    /// Application username
    pub username: String,

    /// Application password
    #[serde(skip_serializing)]
    pub password: String,

    /// Collection currency
    pub currency: String,

    /// Prefix for local payer numbers
    pub country_code: String,

    /// Per-request timeout
    pub timeout_secs: u64,
}

impl CampayConfig {
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> DomainResult<Self> {
        let required = |key: &str| {
            lookup(key)
                .filter(|v| !v.trim().is_empty())
                .ok_or_else(|| DomainError::ConfigurationError(format!("{key} must be set")))
        };

        let timeout_secs = match lookup("CAMPAY_TIMEOUT_SECS") {
            Some(raw) => raw.trim().parse::<u64>().map_err(|_| {
                DomainError::ConfigurationError(format!(
                    "CAMPAY_TIMEOUT_SECS must be a number of seconds, got '{raw}'"
                ))
            })?,
            None => 30,
        };

        Ok(Self {
            base_url: lookup("CAMPAY_BASE_URL")
                .unwrap_or_else(|| DEFAULT_BASE_URL.to_string())
                .trim_end_matches('/')
                .to_string(),
            username: required("CAMPAY_USERNAME")?,
            password: required("CAMPAY_PASSWORD")?,
            currency: lookup("CAMPAY_CURRENCY").unwrap_or_else(|| "XAF".to_string()),
            country_code: lookup("CAMPAY_COUNTRY_CODE").unwrap_or_else(|| "237".to_string()),
            timeout_secs,
        })
    }
}
