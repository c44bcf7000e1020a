use crate::domain::errors::DomainResult;
use crate::domain::Transaction;
use async_trait::async_trait;

/// Transaction ledger port
#[async_trait]
pub trait TransactionRepositoryPort: Send + Sync {
    /// Inserts or updates the record keyed by `reference`.
    ///
    /// A stored terminal status is never overwritten; every other column is
    /// last-write-wins and `last_updated` is refreshed.
    async fn upsert(&self, transaction: &Transaction) -> DomainResult<()>;

    /// Finds a transaction by its reference
    async fn find_by_reference(&self, reference: &str) -> DomainResult<Option<Transaction>>;
}
