use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use tracing::info;

use seatline_core::models::{BookingRequest, PaymentId, Reservation, ReservationId};
use seatline_saga::{BookingOutcome, SagaStep};

use crate::error::AppError;
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct StepWarning {
    pub step: SagaStep,
    pub kind: &'static str,
    pub message: String,
    pub retryable: bool,
}

#[derive(Debug, Serialize)]
pub struct BookingResponse {
    pub reservation: Reservation,
    pub payment_id: PaymentId,
    pub payment_code: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warning: Option<StepWarning>,
}

impl From<BookingOutcome> for BookingResponse {
    fn from(outcome: BookingOutcome) -> Self {
        Self {
            warning: outcome.failure.map(|f| StepWarning {
                step: f.step,
                kind: f.error.kind(),
                message: f.error.to_string(),
                retryable: f.error.is_retryable(),
            }),
            payment_id: outcome.payment.id,
            payment_code: outcome.payment.payment_code,
            reservation: outcome.reservation,
        }
    }
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/bookings", post(create_booking).get(list_bookings))
        .route("/bookings/{id}", get(get_booking))
        .route("/bookings/{id}/workflow", post(resume_workflow))
}

/// 201 when every step ran; 202 with a `warning` when the reservation was
/// stored but a later step failed.
async fn create_booking(
    State(state): State<AppState>,
    payload: Result<Json<BookingRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<BookingResponse>), AppError> {
    let Json(request) = payload?;
    let outcome = state.saga.booking.book(request).await?;

    let status = if outcome.is_complete() {
        StatusCode::CREATED
    } else {
        StatusCode::ACCEPTED
    };
    info!(reservation_id = outcome.reservation.id, status = status.as_u16(), "Booking handled");
    Ok((status, Json(outcome.into())))
}

async fn list_bookings(State(state): State<AppState>) -> Result<Json<Vec<Reservation>>, AppError> {
    Ok(Json(state.saga.list_reservations().await?))
}

async fn get_booking(
    State(state): State<AppState>,
    Path(id): Path<ReservationId>,
) -> Result<Json<Reservation>, AppError> {
    Ok(Json(state.saga.reservation(id).await?))
}

async fn resume_workflow(
    State(state): State<AppState>,
    Path(id): Path<ReservationId>,
) -> Result<Json<Reservation>, AppError> {
    Ok(Json(state.saga.trigger.resume(id).await?))
}
