use resume_pay::api::{self, AppState};
use resume_pay::application::{CollectionSettings, ConfirmationRegistry, PaymentService, TokenCache};
use resume_pay::infrastructure::{
    db, AppConfig, CampayAdapter, InMemoryTransactionRepository, PostgresTransactionRepository,
    SystemClock,
};
use resume_pay::ports::TransactionRepositoryPort;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env before reading any variable
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(false)
        .init();

    info!("Starting payment service...");

    let config = AppConfig::from_env()?;
    info!("Campay configuration loaded for {}", config.campay.base_url);

    match config.database_url.clone() {
        Some(database_url) => {
            let pool = db::create_pool(&database_url).await?;
            let repository = PostgresTransactionRepository::new(Arc::new(pool));
            repository.ensure_schema().await?;
            serve(config, Arc::new(repository)).await
        }
        None => {
            warn!("DATABASE_URL not set, transactions are kept in memory only");
            serve(config, Arc::new(InMemoryTransactionRepository::new())).await
        }
    }
}

async fn serve<R: TransactionRepositoryPort + 'static>(
    config: AppConfig,
    repository: Arc<R>,
) -> anyhow::Result<()> {
    let campay = Arc::new(CampayAdapter::new(Arc::new(config.campay.clone()))?);

    let tokens = Arc::new(TokenCache::new(
        campay.clone(),
        Arc::new(SystemClock),
        chrono::Duration::from_std(config.token_refresh_margin)?,
    ));

    let payment_service = Arc::new(PaymentService::new(
        campay,
        repository,
        tokens,
        CollectionSettings {
            currency: config.campay.currency.clone(),
            country_code: config.campay.country_code.clone(),
        },
    ));

    let confirmations = Arc::new(ConfirmationRegistry::new(
        payment_service.clone(),
        config.poll,
    ));

    let app_state = AppState {
        payment_service,
        confirmations: confirmations.clone(),
    };

    let app = api::create_router(app_state);

    let addr = config.bind_addr();
    info!("Server listening on {}", addr);
    info!("Available endpoints:");
    info!("  GET    /health - Health check");
    info!("  POST   /api/pay - Initiate payment");
    info!("  GET    /api/status/:reference - Query payment status");
    info!("  GET    /api/confirmations/:reference - Confirmation progress");
    info!("  POST   /api/confirmations/:reference - Start confirmation");
    info!("  DELETE /api/confirmations/:reference - Cancel confirmation");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    let cancelled = confirmations.cancel_all();
    info!("Server stopped, {} confirmation watches cancelled", cancelled);

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
