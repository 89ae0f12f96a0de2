use axum::{
    extract::{Path, State},
    routing::get,
    Json, Router,
};

use seatline_core::models::Ticket;

use crate::error::AppError;
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new().route("/ticket/detail/{booking_code}", get(ticket_by_booking_code))
}

async fn ticket_by_booking_code(
    State(state): State<AppState>,
    Path(booking_code): Path<String>,
) -> Result<Json<Ticket>, AppError> {
    Ok(Json(state.saga.tickets.by_booking_code(&booking_code).await?))
}
