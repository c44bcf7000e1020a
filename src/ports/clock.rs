use chrono::{DateTime, Utc};

/// Wall-clock source, injected so token expiry can be tested without waiting
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}
