use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::value_objects::TransactionStatus;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One mobile-money payment attempt
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    /// Provider reference, unique lookup key
    pub reference: String,

    /// Locally generated correlation id sent with the collection request
    pub external_reference: Option<String>,

    pub status: TransactionStatus,

    /// Amount as supplied by the caller
    pub amount: String,

    /// Payer phone as supplied by the caller
    pub phone: String,

    /// Mobile network operator reported by the provider
    pub operator: Option<String>,

    /// Operator-side transaction code
    pub operator_code: Option<String>,

    /// Set by push confirmation; reserved, polling is the only writer today
    pub webhook_received: bool,

    pub created_at: DateTime<Utc>,

    pub last_updated: DateTime<Utc>,
}

impl Transaction {
    /// Creates a pending transaction for a freshly accepted collection request
    pub fn pending(
        reference: String,
        external_reference: Option<String>,
        amount: String,
        phone: String,
        operator: Option<String>,
    ) -> DomainResult<Self> {
        if reference.trim().is_empty() {
            return Err(DomainError::ValidationError(
                "Transaction reference must not be empty".to_string(),
            ));
        }

        let now = Utc::now();

        Ok(Self {
            reference,
            external_reference,
            status: TransactionStatus::Pending,
            amount,
            phone,
            operator,
            operator_code: None,
            webhook_received: false,
            created_at: now,
            last_updated: now,
        })
    }

    /// Applies a status reported by the provider.
    ///
    /// Returns `Ok(true)` when the status changed. Re-applying the current
    /// status and reporting `PENDING` on a pending record are no-ops.
    pub fn apply_status(&mut self, status: TransactionStatus) -> DomainResult<bool> {
        if self.status == status {
            return Ok(false);
        }

        if self.status.is_terminal() {
            return Err(DomainError::InvalidState {
                expected: TransactionStatus::Pending.to_string(),
                actual: self.status.to_string(),
            });
        }

        self.status = status;
        self.last_updated = Utc::now();
        Ok(true)
    }

    /// Records operator details; returns whether anything changed
    pub fn record_operator(
        &mut self,
        operator: Option<String>,
        operator_code: Option<String>,
    ) -> bool {
        let mut changed = false;

        if operator.is_some() && self.operator != operator {
            self.operator = operator;
            changed = true;
        }
        if operator_code.is_some() && self.operator_code != operator_code {
            self.operator_code = operator_code;
            changed = true;
        }

        if changed {
            self.last_updated = Utc::now();
        }
        changed
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }
}
