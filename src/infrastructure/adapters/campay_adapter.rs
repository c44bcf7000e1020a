use crate::domain::errors::{DomainError, DomainResult};
use crate::infrastructure::config::campay_config::CampayConfig;
use crate::ports::payment_provider_port::*;
use async_trait::async_trait;
use reqwest::{Client, Response, StatusCode};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error};

/// Campay HTTP adapter
#[derive(Clone)]
pub struct CampayAdapter {
    config: Arc<CampayConfig>,
    client: Client,
}

#[derive(Debug, Deserialize)]
struct TokenBody {
    token: String,
    expires_in: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct CollectBody {
    reference: Option<String>,
    ussd_code: Option<String>,
    operator: Option<String>,
}

#[derive(Debug, Deserialize)]
struct StatusBody {
    reference: Option<String>,
    status: Option<String>,
    external_reference: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    amount: Option<String>,
    operator: Option<String>,
    code: Option<String>,
}

impl CampayAdapter {
    pub fn new(config: Arc<CampayConfig>) -> DomainResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self { config, client })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.config.base_url, path)
    }

    /// Turns a non-2xx answer into an error, keeping the body for logs
    async fn check(response: Response, operation: &str) -> DomainResult<Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        if status == StatusCode::TOO_MANY_REQUESTS {
            error!("Campay {} rate limited", operation);
            return Err(DomainError::RateLimited);
        }

        let body = response.text().await.unwrap_or_default();
        error!("Campay {} failed: {} - {}", operation, status, body);
        Err(DomainError::ProviderError {
            status: status.as_u16(),
            body,
        })
    }
}

#[async_trait]
impl PaymentProviderPort for CampayAdapter {
    async fn request_token(&self) -> DomainResult<AccessToken> {
        let body = json!({
            "username": self.config.username,
            "password": self.config.password,
        });

        let response = self
            .client
            .post(self.url("token/"))
            .header("Accept", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| DomainError::AuthenticationError(e.to_string()))?;

        let response = Self::check(response, "token")
            .await
            .map_err(|e| DomainError::AuthenticationError(e.to_string()))?;

        let body: TokenBody = response
            .json()
            .await
            .map_err(|e| DomainError::AuthenticationError(format!("Malformed token response: {e}")))?;

        Ok(AccessToken {
            token: body.token,
            expires_in: body.expires_in,
        })
    }

    async fn collect(&self, token: &str, request: CollectRequest) -> DomainResult<CollectResponse> {
        debug!(
            "Campay collect request: {} {} from {}",
            request.amount, request.currency, request.from
        );

        let response = self
            .client
            .post(self.url("collect/"))
            .header("Authorization", format!("Token {token}"))
            .header("Accept", "application/json")
            .json(&request)
            .send()
            .await?;

        let response = Self::check(response, "collect").await?;
        let body: CollectBody = response.json().await?;
        debug!("Campay collect response: {:?}", body);

        let reference = body
            .reference
            .filter(|r| !r.trim().is_empty())
            .ok_or_else(|| {
                DomainError::InitiationError("Campay response is missing the reference".to_string())
            })?;

        Ok(CollectResponse {
            reference,
            ussd_code: body.ussd_code,
            operator: body.operator,
        })
    }

    async fn transaction_status(
        &self,
        token: &str,
        reference: &str,
    ) -> DomainResult<TransactionStatusResponse> {
        let response = self
            .client
            .get(self.url(&format!("transaction/{reference}/")))
            .header("Authorization", format!("Token {token}"))
            .header("Accept", "application/json")
            .send()
            .await?;

        let response = Self::check(response, "status query").await?;
        let body: StatusBody = response.json().await?;

        Ok(TransactionStatusResponse {
            reference: body.reference.unwrap_or_else(|| reference.to_string()),
            status: body.status.unwrap_or_else(|| "UNKNOWN".to_string()),
            external_reference: body.external_reference,
            amount: body.amount,
            operator: body.operator,
            code: body.code,
        })
    }
}

fn lenient_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(serde_json::Value::String(s)) => Some(s),
        Some(serde_json::Value::Number(n)) => Some(n.to_string()),
        _ => None,
    })
}
