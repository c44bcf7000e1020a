pub mod confirmation;
pub mod confirmation_registry;
pub mod dto;
pub mod payment_service;
pub mod retry;
pub mod token_cache;

pub use confirmation::{
    run_confirmation, ConfirmationOutcome, ConfirmationPoller, PollConfig, PollPhase, PollSnapshot,
    StatusSource,
};
pub use confirmation_registry::ConfirmationRegistry;
pub use dto::*;
pub use payment_service::{CollectionSettings, PaymentService};
pub use retry::{retry, RetryPolicy};
pub use token_cache::TokenCache;
