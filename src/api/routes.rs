use super::handlers::*;
use crate::ports::{PaymentProviderPort, TransactionRepositoryPort};
use axum::{
    routing::{get, post},
    Router,
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

pub fn create_router<P, R>(state: AppState<P, R>) -> Router
where
    P: PaymentProviderPort + 'static,
    R: TransactionRepositoryPort + 'static,
{
    Router::new()
        .route("/health", get(health_check))
        .route("/api/pay", post(pay::<P, R>))
        .route("/api/status/:reference", get(transaction_status::<P, R>))
        .route(
            "/api/confirmations/:reference",
            get(get_confirmation::<P, R>)
                .post(start_confirmation::<P, R>)
                .delete(cancel_confirmation::<P, R>),
        )
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
