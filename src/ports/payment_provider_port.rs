use crate::domain::errors::DomainResult;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Access token issued by the provider
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccessToken {
    pub token: String,
    /// Lifetime in seconds as stated by the provider
    pub expires_in: Option<u64>,
}

/// Collection (payment prompt) request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CollectRequest {
    pub amount: String,
    pub currency: String,
    /// Payer number in international form
    pub from: String,
    pub description: String,
    pub external_reference: String,
}

/// Provider answer to an accepted collection request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CollectResponse {
    pub reference: String,
    pub ussd_code: Option<String>,
    pub operator: Option<String>,
}

/// Provider view of a transaction
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransactionStatusResponse {
    pub reference: String,
    /// Raw status string, e.g. `PENDING`, `SUCCESSFUL`, `FAILED`
    pub status: String,
    pub external_reference: Option<String>,
    pub amount: Option<String>,
    pub operator: Option<String>,
    /// Operator transaction code
    pub code: Option<String>,
}

/// Mobile-money provider port
///
/// Calls that need authentication take the bearer token explicitly so the
/// token cache stays in the application layer.
#[async_trait]
pub trait PaymentProviderPort: Send + Sync {
    /// Exchanges the configured application credentials for a token
    async fn request_token(&self) -> DomainResult<AccessToken>;

    /// Prompts the payer's phone for a payment
    async fn collect(&self, token: &str, request: CollectRequest) -> DomainResult<CollectResponse>;

    /// Reads the current status of a transaction
    async fn transaction_status(
        &self,
        token: &str,
        reference: &str,
    ) -> DomainResult<TransactionStatusResponse>;
}
