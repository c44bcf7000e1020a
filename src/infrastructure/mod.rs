pub mod adapters;
pub mod config;
pub mod db;

pub use adapters::{
    CampayAdapter, InMemoryTransactionRepository, PostgresTransactionRepository, SystemClock,
};
pub use config::{AppConfig, CampayConfig};
