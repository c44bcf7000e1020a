use crate::application::{
    ConfirmationRegistry, ConfirmationResponse, ErrorResponse, InitiatePaymentRequest,
    PaymentService, PollSnapshot, StatusResponse,
};
use crate::domain::errors::DomainError;
use crate::ports::{PaymentProviderPort, TransactionRepositoryPort};
use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    response::{IntoResponse, Json},
};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

type ApiError = (StatusCode, Json<ErrorResponse>);

/// Application state
pub struct AppState<P: PaymentProviderPort, R: TransactionRepositoryPort> {
    pub payment_service: Arc<PaymentService<P, R>>,
    pub confirmations: Arc<ConfirmationRegistry<PaymentService<P, R>>>,
}

impl<P: PaymentProviderPort, R: TransactionRepositoryPort> Clone for AppState<P, R> {
    fn clone(&self) -> Self {
        Self {
            payment_service: self.payment_service.clone(),
            confirmations: self.confirmations.clone(),
        }
    }
}

fn error_response(e: &DomainError) -> ApiError {
    let status = match e {
        DomainError::ValidationError(_) => StatusCode::BAD_REQUEST,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };
    (status, Json(ErrorResponse::new(e.to_string())))
}

fn confirmation_body(snapshot: PollSnapshot) -> Json<ConfirmationResponse> {
    let message = snapshot.phase.user_message().to_string();
    Json(ConfirmationResponse {
        success: true,
        snapshot,
        message,
    })
}

fn require_reference(reference: &str) -> Result<&str, ApiError> {
    let reference = reference.trim();
    if reference.is_empty() {
        return Err(error_response(&DomainError::ValidationError(
            "Transaction reference is required".to_string(),
        )));
    }
    Ok(reference)
}

/// Starts a payment
pub async fn pay<P: PaymentProviderPort + 'static, R: TransactionRepositoryPort + 'static>(
    State(state): State<AppState<P, R>>,
    payload: Result<Json<InitiatePaymentRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(request) = payload.map_err(|rejection| {
        warn!("Rejected payment request body: {}", rejection.body_text());
        (
            StatusCode::BAD_REQUEST,
            Json(ErrorResponse::new(rejection.body_text())),
        )
    })?;

    info!("Received payment request from {}", request.from);

    let response = state.payment_service.initiate(request).await.map_err(|e| {
        error!("Payment initiation error: {}", e);
        error_response(&e)
    })?;

    Ok((StatusCode::OK, Json(response)))
}

/// Current status, from the confirmation watch when one is running,
/// otherwise from the provider
pub async fn transaction_status<
    P: PaymentProviderPort + 'static,
    R: TransactionRepositoryPort + 'static,
>(
    State(state): State<AppState<P, R>>,
    Path(reference): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let reference = require_reference(&reference)?;

    // A running watch already queries the provider for this reference
    if let Some(status) = state.confirmations.watched_status(reference) {
        debug!("Status of {} answered from its confirmation watch", reference);
        return Ok((
            StatusCode::OK,
            Json(StatusResponse {
                success: true,
                status: status.to_string(),
            }),
        ));
    }

    let status = match state.payment_service.sync_status(reference).await {
        Ok(Some(status)) => status.to_string(),
        Ok(None) => "UNKNOWN".to_string(),
        Err(DomainError::TransientQueryError(e)) => {
            warn!("Status query for {} failed: {}", reference, e);
            "UNKNOWN".to_string()
        }
        Err(e) => {
            error!("Status query for {} could not be made: {}", reference, e);
            return Err(error_response(&e));
        }
    };

    Ok((
        StatusCode::OK,
        Json(StatusResponse {
            success: true,
            status,
        }),
    ))
}

/// Current state of the background confirmation
pub async fn get_confirmation<
    P: PaymentProviderPort + 'static,
    R: TransactionRepositoryPort + 'static,
>(
    State(state): State<AppState<P, R>>,
    Path(reference): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let reference = require_reference(&reference)?;

    state
        .confirmations
        .snapshot(reference)
        .map(confirmation_body)
        .ok_or_else(|| {
            (
                StatusCode::NOT_FOUND,
                Json(ErrorResponse::new(format!(
                    "No confirmation in progress for {reference}"
                ))),
            )
        })
}

/// Starts (or restarts after a timeout) the background confirmation
pub async fn start_confirmation<
    P: PaymentProviderPort + 'static,
    R: TransactionRepositoryPort + 'static,
>(
    State(state): State<AppState<P, R>>,
    Path(reference): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let reference = require_reference(&reference)?;
    info!("Confirmation requested for {}", reference);

    Ok((
        StatusCode::ACCEPTED,
        confirmation_body(state.confirmations.watch(reference)),
    ))
}

/// Stops the background confirmation
pub async fn cancel_confirmation<
    P: PaymentProviderPort + 'static,
    R: TransactionRepositoryPort + 'static,
>(
    State(state): State<AppState<P, R>>,
    Path(reference): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let reference = require_reference(&reference)?;

    if !state.confirmations.cancel(reference) {
        return Err((
            StatusCode::NOT_FOUND,
            Json(ErrorResponse::new(format!(
                "No confirmation in progress for {reference}"
            ))),
        ));
    }

    Ok((
        StatusCode::OK,
        Json(serde_json::json!({
            "success": true,
            "message": "Payment confirmation cancelled."
        })),
    ))
}

/// Health check
pub async fn health_check() -> impl IntoResponse {
    (StatusCode::OK, Json(serde_json::json!({ "status": "ok" })))
}
