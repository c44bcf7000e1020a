pub mod clock;
pub mod payment_provider_port;
pub mod transaction_repository_port;

pub use clock::Clock;
pub use payment_provider_port::PaymentProviderPort;
pub use transaction_repository_port::TransactionRepositoryPort;
