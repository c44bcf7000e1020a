pub mod campay_adapter;
pub mod in_memory_transaction_repository;
pub mod postgres_transaction_repository;
pub mod system_clock;

pub use campay_adapter::CampayAdapter;
pub use in_memory_transaction_repository::InMemoryTransactionRepository;
pub use postgres_transaction_repository::PostgresTransactionRepository;
pub use system_clock::SystemClock;
