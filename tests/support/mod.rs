#![allow(dead_code)]

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};

use resume_pay::application::{
    CollectionSettings, ConfirmationRegistry, PaymentService, PollConfig, RetryPolicy, TokenCache,
};
use resume_pay::domain::{DomainError, DomainResult};
use resume_pay::infrastructure::{InMemoryTransactionRepository, SystemClock};
use resume_pay::ports::payment_provider_port::{
    AccessToken, CollectRequest, CollectResponse, TransactionStatusResponse,
};
use resume_pay::ports::PaymentProviderPort;
use resume_pay::AppState;

/// One scripted answer to a status query
#[derive(Debug, Clone)]
pub enum Scripted {
    Status(&'static str),
    NetworkError,
    RateLimited,
    Unauthorized,
}

/// Provider stub with call counters
#[derive(Default)]
pub struct FakeProvider {
    pub token_calls: AtomicU32,
    pub collect_calls: AtomicU32,
    pub status_calls: AtomicU32,
    fixed_reference: Option<String>,
    token_failure: bool,
    collect_failure: Option<u16>,
    statuses: Mutex<VecDeque<Scripted>>,
    collected: Mutex<Vec<CollectRequest>>,
}

impl FakeProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every collection gets this reference
    pub fn with_reference(mut self, reference: &str) -> Self {
        self.fixed_reference = Some(reference.to_string());
        self
    }

    pub fn failing_token(mut self) -> Self {
        self.token_failure = true;
        self
    }

    pub fn failing_collect(mut self, status: u16) -> Self {
        self.collect_failure = Some(status);
        self
    }

    /// Status answers in order; `PENDING` once the script runs out
    pub fn with_statuses(self, script: Vec<Scripted>) -> Self {
        *self.statuses.lock().unwrap() = script.into();
        self
    }

    pub fn collected(&self) -> Vec<CollectRequest> {
        self.collected.lock().unwrap().clone()
    }

    pub fn token_calls(&self) -> u32 {
        self.token_calls.load(Ordering::SeqCst)
    }

    pub fn collect_calls(&self) -> u32 {
        self.collect_calls.load(Ordering::SeqCst)
    }

    pub fn status_calls(&self) -> u32 {
        self.status_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PaymentProviderPort for FakeProvider {
    async fn request_token(&self) -> DomainResult<AccessToken> {
        let n = self.token_calls.fetch_add(1, Ordering::SeqCst) + 1;
        if self.token_failure {
            return Err(DomainError::AuthenticationError(
                "Campay token failed: 400 - bad credentials".to_string(),
            ));
        }
        Ok(AccessToken {
            token: format!("token-{n}"),
            expires_in: Some(3600),
        })
    }

    async fn collect(&self, _token: &str, request: CollectRequest) -> DomainResult<CollectResponse> {
        let n = self.collect_calls.fetch_add(1, Ordering::SeqCst) + 1;
        self.collected.lock().unwrap().push(request);

        if let Some(status) = self.collect_failure {
            return Err(DomainError::ProviderError {
                status,
                body: r#"{"message": "ER101"}"#.to_string(),
            });
        }

        Ok(CollectResponse {
            reference: self
                .fixed_reference
                .clone()
                .unwrap_or_else(|| format!("ref-{n}")),
            ussd_code: Some("*126#".to_string()),
            operator: Some("MTN".to_string()),
        })
    }

    async fn transaction_status(
        &self,
        _token: &str,
        reference: &str,
    ) -> DomainResult<TransactionStatusResponse> {
        self.status_calls.fetch_add(1, Ordering::SeqCst);
        let next = self
            .statuses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(Scripted::Status("PENDING"));

        match next {
            Scripted::Status(status) => Ok(TransactionStatusResponse {
                reference: reference.to_string(),
                status: status.to_string(),
                external_reference: None,
                amount: Some("300".to_string()),
                operator: Some("MTN".to_string()),
                code: Some("CP201027T00005".to_string()),
            }),
            Scripted::NetworkError => Err(DomainError::InternalError(
                "connection reset by peer".to_string(),
            )),
            Scripted::RateLimited => Err(DomainError::RateLimited),
            Scripted::Unauthorized => Err(DomainError::ProviderError {
                status: 401,
                body: "token expired".to_string(),
            }),
        }
    }
}

pub type Service = PaymentService<FakeProvider, InMemoryTransactionRepository>;

pub struct Harness {
    pub provider: Arc<FakeProvider>,
    pub repository: Arc<InMemoryTransactionRepository>,
    pub service: Arc<Service>,
}

pub fn harness(provider: FakeProvider) -> Harness {
    let provider = Arc::new(provider);
    let repository = Arc::new(InMemoryTransactionRepository::new());
    let tokens = Arc::new(TokenCache::new(
        provider.clone(),
        Arc::new(SystemClock),
        chrono::Duration::minutes(10),
    ));
    let service = PaymentService::new(
        provider.clone(),
        repository.clone(),
        tokens,
        CollectionSettings::default(),
    )
    .with_status_retry(RetryPolicy {
        jitter: 0.0,
        ..RetryPolicy::default()
    });

    Harness {
        provider,
        repository,
        service: Arc::new(service),
    }
}

impl Harness {
    pub fn app_state(&self, poll: PollConfig) -> AppState<FakeProvider, InMemoryTransactionRepository> {
        AppState {
            payment_service: self.service.clone(),
            confirmations: Arc::new(ConfirmationRegistry::new(self.service.clone(), poll)),
        }
    }
}
