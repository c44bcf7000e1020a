use thiserror::Error;

/// Domain error type
#[derive(Error, Debug)]
pub enum DomainError {
    /// Bad caller input, surfaced immediately
    #[error("Validation error: {0}")]
    ValidationError(String),

    /// Provider token could not be obtained
    #[error("Authentication with payment provider failed: {0}")]
    AuthenticationError(String),

    /// Provider rejected or never received the collection request
    #[error("Payment initiation failed: {0}")]
    InitiationError(String),

    /// Status query failed; the next poll tick tries again
    #[error("Transient status query error: {0}")]
    TransientQueryError(String),

    /// Poll budget exhausted without a terminal status
    #[error("Payment confirmation timed out after {0}s")]
    Timeout(u64),

    /// Provider reported the payment as failed
    #[error("Payment {0} was declined")]
    PaymentDeclined(String),

    /// Caller abandoned the confirmation before a terminal status
    #[error("Confirmation of payment {0} was cancelled")]
    Cancelled(String),

    /// Attempt to move a terminal transaction to another status
    #[error("Invalid transaction state: expected {expected}, got {actual}")]
    InvalidState { expected: String, actual: String },

    /// Non-2xx answer from the provider
    #[error("Payment provider returned {status}: {body}")]
    ProviderError { status: u16, body: String },

    #[error("Payment provider rate limited the request")]
    RateLimited,

    #[error("Database error: {0}")]
    DatabaseError(#[from] sqlx::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("HTTP request error: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("Configuration error: {0}")]
    ConfigurationError(String),

    #[error("Internal error: {0}")]
    InternalError(String),
}

impl DomainError {
    /// Provider answered 401: the cached token is no longer accepted.
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, DomainError::ProviderError { status: 401, .. })
    }
}

/// Domain result type
pub type DomainResult<T> = Result<T, DomainError>;
