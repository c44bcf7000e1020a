use crate::domain::errors::DomainResult;
use crate::domain::{Transaction, TransactionStatus};
use crate::ports::transaction_repository_port::TransactionRepositoryPort;
use async_trait::async_trait;
use sqlx::{Executor, PgPool, Pool, Postgres};
use std::sync::Arc;
use tracing::{debug, info};

const SCHEMA: &str = include_str!("../../../migrations/0001_create_transactions.sql");

/// Postgres transaction ledger
#[derive(Clone)]
pub struct PostgresTransactionRepository {
    pool: Arc<Pool<Postgres>>,
}

impl PostgresTransactionRepository {
    pub fn new(pool: Arc<PgPool>) -> Self {
        Self { pool }
    }

    /// Creates the `transactions` table if it does not exist yet
    pub async fn ensure_schema(&self) -> DomainResult<()> {
        self.pool.as_ref().execute(SCHEMA).await?;
        info!("Transaction ledger schema ready");
        Ok(())
    }
}

#[async_trait]
impl TransactionRepositoryPort for PostgresTransactionRepository {
    async fn upsert(&self, transaction: &Transaction) -> DomainResult<()> {
        // A stored terminal status wins over whatever is being written
        let query = r#"
            INSERT INTO transactions (
                reference, external_reference, status, amount, phone,
                operator, operator_code, webhook_received, created_at, last_updated
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, NOW())
            ON CONFLICT (reference) DO UPDATE SET
                external_reference = COALESCE(EXCLUDED.external_reference, transactions.external_reference),
                status = CASE
                    WHEN transactions.status = 'PENDING' THEN EXCLUDED.status
                    ELSE transactions.status
                END,
                amount = CASE WHEN EXCLUDED.amount = '' THEN transactions.amount ELSE EXCLUDED.amount END,
                phone = CASE WHEN EXCLUDED.phone = '' THEN transactions.phone ELSE EXCLUDED.phone END,
                operator = COALESCE(EXCLUDED.operator, transactions.operator),
                operator_code = COALESCE(EXCLUDED.operator_code, transactions.operator_code),
                webhook_received = transactions.webhook_received OR EXCLUDED.webhook_received,
                last_updated = NOW()
        "#;

        sqlx::query(query)
            .bind(&transaction.reference)
            .bind(&transaction.external_reference)
            .bind(transaction.status.as_str())
            .bind(&transaction.amount)
            .bind(&transaction.phone)
            .bind(&transaction.operator)
            .bind(&transaction.operator_code)
            .bind(transaction.webhook_received)
            .bind(transaction.created_at)
            .execute(self.pool.as_ref())
            .await?;

        debug!(
            "Transaction upserted: {} ({})",
            transaction.reference, transaction.status
        );
        Ok(())
    }

    async fn find_by_reference(&self, reference: &str) -> DomainResult<Option<Transaction>> {
        let query = r#"
            SELECT reference, external_reference, status, amount, phone,
                   operator, operator_code, webhook_received, created_at, last_updated
            FROM transactions
            WHERE reference = $1
        "#;

        let row = sqlx::query_as::<_, TransactionRow>(query)
            .bind(reference)
            .fetch_optional(self.pool.as_ref())
            .await?;

        row.map(TransactionRow::into_transaction).transpose()
    }
}

/// Database row
#[derive(Debug, sqlx::FromRow)]
struct TransactionRow {
    reference: String,
    external_reference: Option<String>,
    status: String,
    amount: String,
    phone: String,
    operator: Option<String>,
    operator_code: Option<String>,
    webhook_received: bool,
    created_at: chrono::DateTime<chrono::Utc>,
    last_updated: chrono::DateTime<chrono::Utc>,
}

impl TransactionRow {
    fn into_transaction(self) -> DomainResult<Transaction> {
        Ok(Transaction {
            reference: self.reference,
            external_reference: self.external_reference,
            status: self.status.parse::<TransactionStatus>()?,
            amount: self.amount,
            phone: self.phone,
            operator: self.operator,
            operator_code: self.operator_code,
            webhook_received: self.webhook_received,
            created_at: self.created_at,
            last_updated: self.last_updated,
        })
    }
}
