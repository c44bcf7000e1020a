pub mod app_config;
pub mod campay_config;

pub use app_config::AppConfig;
pub use campay_config::CampayConfig;
