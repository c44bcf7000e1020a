use crate::domain::errors::{DomainError, DomainResult};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Ledger status of a payment attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransactionStatus {
    /// Waiting for the payer to confirm on their phone
    Pending,
    /// Money collected
    Successful,
    /// Rejected, cancelled by the payer, or insufficient funds
    Failed,
}

impl TransactionStatus {
    /// Maps a provider status string. Anything the ledger does not know
    /// about yields `None` and must leave the stored status alone.
    pub fn from_provider(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_uppercase().as_str() {
            "PENDING" => Some(Self::Pending),
            "SUCCESSFUL" => Some(Self::Successful),
            "FAILED" => Some(Self::Failed),
            _ => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Successful | Self::Failed)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "PENDING",
            Self::Successful => "SUCCESSFUL",
            Self::Failed => "FAILED",
        }
    }
}

impl fmt::Display for TransactionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TransactionStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_provider(s)
            .ok_or_else(|| DomainError::InternalError(format!("Unknown transaction status: {s}")))
    }
}

/// Amount to collect, in whole XAF units.
///
/// Kept as the caller's string so the ledger stores exactly what was asked
/// for. The provider decides which amounts it can collect.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Amount(String);

impl Amount {
    pub fn parse(raw: &str) -> DomainResult<Self> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(DomainError::ValidationError(
                "Amount is required".to_string(),
            ));
        }
        Ok(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} XAF", self.0)
    }
}

/// Payer's mobile-money number
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhoneNumber(String);

impl PhoneNumber {
    pub fn parse(raw: &str) -> DomainResult<Self> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(DomainError::ValidationError(
                "Payer phone number is required".to_string(),
            ));
        }

        let compact: String = trimmed
            .chars()
            .filter(|c| !c.is_whitespace() && !matches!(c, '+' | '-' | '.' | '(' | ')'))
            .collect();

        if compact.is_empty() {
            return Ok(Self(trimmed.to_string()));
        }
        Ok(Self(compact))
    }

    /// Number in the international form the provider expects. Local
    /// 9-digit numbers get the country prefix.
    pub fn international(&self, country_code: &str) -> String {
        if self.0.len() == 9 && !self.0.starts_with(country_code) {
            format!("{}{}", country_code, self.0)
        } else {
            self.0.clone()
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}
