use axum::{
    extract::{rejection::JsonRejection, Path, State},
    routing::{get, post},
    Json, Router,
};

use seatline_core::models::{PaymentConfirmationRequest, PaymentDetail, PaymentId};
use seatline_saga::ConfirmationOutcome;

use crate::error::AppError;
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/payment/pay", post(confirm_payment))
        .route("/payment/detail/{id}", get(payment_detail))
}

async fn confirm_payment(
    State(state): State<AppState>,
    payload: Result<Json<PaymentConfirmationRequest>, JsonRejection>,
) -> Result<Json<ConfirmationOutcome>, AppError> {
    let Json(request) = payload?;
    Ok(Json(state.saga.confirmation.confirm(request).await?))
}

async fn payment_detail(
    State(state): State<AppState>,
    Path(id): Path<PaymentId>,
) -> Result<Json<PaymentDetail>, AppError> {
    Ok(Json(state.saga.tickets.payment_detail(id).await?))
}
