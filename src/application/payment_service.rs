use crate::application::confirmation::StatusSource;
use crate::application::dto::{InitiatePaymentRequest, InitiatePaymentResponse};
use crate::application::retry::{retry, RetryPolicy};
use crate::application::token_cache::TokenCache;
use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::{Amount, PhoneNumber, Transaction, TransactionStatus};
use crate::ports::payment_provider_port::{CollectRequest, TransactionStatusResponse};
use crate::ports::{PaymentProviderPort, TransactionRepositoryPort};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

pub const DEFAULT_DESCRIPTION: &str = "Resume download";

/// Collection settings sent with every request
#[derive(Debug, Clone)]
pub struct CollectionSettings {
    pub currency: String,
    /// Prefix added to local payer numbers
    pub country_code: String,
}

impl Default for CollectionSettings {
    fn default() -> Self {
        Self {
            currency: "XAF".to_string(),
            country_code: "237".to_string(),
        }
    }
}

/// Payment service
pub struct PaymentService<P: PaymentProviderPort, R: TransactionRepositoryPort> {
    provider: Arc<P>,
    repository: Arc<R>,
    tokens: Arc<TokenCache<P>>,
    settings: CollectionSettings,
    status_retry: RetryPolicy,
}

impl<P: PaymentProviderPort, R: TransactionRepositoryPort> PaymentService<P, R> {
    pub fn new(
        provider: Arc<P>,
        repository: Arc<R>,
        tokens: Arc<TokenCache<P>>,
        settings: CollectionSettings,
    ) -> Self {
        Self {
            provider,
            repository,
            tokens,
            settings,
            status_retry: RetryPolicy::default(),
        }
    }

    pub fn with_status_retry(mut self, policy: RetryPolicy) -> Self {
        self.status_retry = policy;
        self
    }

    /// Prompts the payer and records a pending transaction.
    ///
    /// Never retried: a second attempt would send the payer a second prompt.
    pub async fn initiate(
        &self,
        request: InitiatePaymentRequest,
    ) -> DomainResult<InitiatePaymentResponse> {
        // 1. Validate before touching the network
        let amount = Amount::parse(&request.amount)?;
        let phone = PhoneNumber::parse(&request.from)?;
        let description = request
            .description
            .map(|d| d.trim().to_string())
            .filter(|d| !d.is_empty())
            .unwrap_or_else(|| DEFAULT_DESCRIPTION.to_string());

        let external_reference = uuid::Uuid::new_v4().to_string();
        info!(
            "Initiating payment of {} from {} (external reference {})",
            amount,
            phone.as_str(),
            external_reference
        );

        // 2. Authenticate
        let token = self.tokens.get_token().await?;

        // 3. Prompt the payer
        let collect_request = CollectRequest {
            amount: amount.as_str().to_string(),
            currency: self.settings.currency.clone(),
            from: phone.international(&self.settings.country_code),
            description,
            external_reference: external_reference.clone(),
        };

        let collected = match self.provider.collect(&token, collect_request).await {
            Ok(collected) => collected,
            Err(e) => {
                error!("Collection request {} failed: {}", external_reference, e);
                if e.is_unauthorized() {
                    self.tokens.invalidate().await;
                }
                return Err(match e {
                    DomainError::InitiationError(_) => e,
                    other => DomainError::InitiationError(other.to_string()),
                });
            }
        };

        // 4. Record the pending transaction
        let transaction = Transaction::pending(
            collected.reference.clone(),
            Some(external_reference),
            amount.as_str().to_string(),
            request.from.trim().to_string(),
            collected.operator.clone(),
        )
        .map_err(|e| DomainError::InitiationError(format!("Provider returned {e}")))?;

        self.repository.upsert(&transaction).await.map_err(|e| {
            error!(
                "Payment {} accepted by provider but not recorded: {}",
                transaction.reference, e
            );
            e
        })?;

        info!("Payment initiated: {}", transaction.reference);

        Ok(InitiatePaymentResponse {
            success: true,
            reference: collected.reference,
            message: "Payment initiated. Confirm the prompt on your phone.".to_string(),
            ussd_code: collected.ussd_code,
            operator: collected.operator,
        })
    }

    /// Reads the provider status and folds it into the ledger.
    ///
    /// Returns `None` for statuses the ledger does not know.
    pub async fn sync_status(&self, reference: &str) -> DomainResult<Option<TransactionStatus>> {
        let reference = reference.trim();
        if reference.is_empty() {
            return Err(DomainError::ValidationError(
                "Transaction reference is required".to_string(),
            ));
        }

        let token = self.tokens.get_token().await?;

        let response = retry(
            &self.status_retry,
            || self.provider.transaction_status(&token, reference),
            |e| matches!(e, DomainError::RateLimited),
        )
        .await;

        let response = match response {
            Ok(response) => response,
            Err(e) => {
                if e.is_unauthorized() {
                    self.tokens.invalidate().await;
                }
                return Err(DomainError::TransientQueryError(e.to_string()));
            }
        };

        let Some(status) = TransactionStatus::from_provider(&response.status) else {
            warn!(
                "Unrecognized provider status '{}' for {}",
                response.status, reference
            );
            return Ok(None);
        };

        self.record_status(reference, status, &response).await?;
        Ok(Some(status))
    }

    async fn record_status(
        &self,
        reference: &str,
        status: TransactionStatus,
        response: &TransactionStatusResponse,
    ) -> DomainResult<()> {
        let (mut transaction, created) = match self.repository.find_by_reference(reference).await? {
            Some(transaction) => (transaction, false),
            None => {
                warn!("No local record for {}, creating one from provider data", reference);
                let transaction = Transaction::pending(
                    reference.to_string(),
                    response.external_reference.clone(),
                    response.amount.clone().unwrap_or_default(),
                    String::new(),
                    None,
                )?;
                (transaction, true)
            }
        };

        let mut changed = match transaction.apply_status(status) {
            Ok(changed) => changed,
            Err(DomainError::InvalidState { expected, actual }) => {
                warn!(
                    "Ignoring {} for {}: expected {}, ledger has {}",
                    status, reference, expected, actual
                );
                false
            }
            Err(e) => return Err(e),
        };
        changed |= transaction.record_operator(response.operator.clone(), response.code.clone());

        if changed || created {
            self.repository.upsert(&transaction).await?;
            debug!("Ledger updated: {} is {}", reference, transaction.status);
        }

        Ok(())
    }
}

#[async_trait]
impl<P: PaymentProviderPort, R: TransactionRepositoryPort> StatusSource for PaymentService<P, R> {
    async fn query_status(&self, reference: &str) -> DomainResult<Option<TransactionStatus>> {
        self.sync_status(reference).await
    }
}
