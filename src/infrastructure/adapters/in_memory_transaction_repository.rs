use crate::domain::errors::DomainResult;
use crate::domain::Transaction;
use crate::ports::transaction_repository_port::TransactionRepositoryPort;
use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Process-local transaction ledger.
///
/// Follows the same upsert contract as the Postgres ledger. Used for local
/// runs without `DATABASE_URL` and in tests.
#[derive(Default, Clone)]
pub struct InMemoryTransactionRepository {
    transactions: Arc<RwLock<HashMap<String, Transaction>>>,
}

impl InMemoryTransactionRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.transactions.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.transactions.read().await.is_empty()
    }
}

#[async_trait]
impl TransactionRepositoryPort for InMemoryTransactionRepository {
    async fn upsert(&self, transaction: &Transaction) -> DomainResult<()> {
        let mut transactions = self.transactions.write().await;
        let mut incoming = transaction.clone();
        incoming.last_updated = Utc::now();

        if let Some(stored) = transactions.get(&transaction.reference) {
            if stored.status.is_terminal() {
                incoming.status = stored.status;
            }
            incoming.created_at = stored.created_at;
            incoming.external_reference = incoming
                .external_reference
                .or_else(|| stored.external_reference.clone());
            if incoming.amount.is_empty() {
                incoming.amount = stored.amount.clone();
            }
            if incoming.phone.is_empty() {
                incoming.phone = stored.phone.clone();
            }
            incoming.operator = incoming.operator.or_else(|| stored.operator.clone());
            incoming.operator_code = incoming
                .operator_code
                .or_else(|| stored.operator_code.clone());
            incoming.webhook_received |= stored.webhook_received;
        }

        transactions.insert(incoming.reference.clone(), incoming);
        Ok(())
    }

    async fn find_by_reference(&self, reference: &str) -> DomainResult<Option<Transaction>> {
        let transactions = self.transactions.read().await;
        Ok(transactions.get(reference).cloned())
    }
}
