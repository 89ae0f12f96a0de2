use axum::{
    extract::{Path, State},
    routing::get,
    Json, Router,
};

use seatline_core::models::FlightFact;

use crate::error::AppError;
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new().route("/flights/{flight_number}", get(flight_by_number))
}

async fn flight_by_number(
    State(state): State<AppState>,
    Path(flight_number): Path<String>,
) -> Result<Json<FlightFact>, AppError> {
    Ok(Json(state.saga.flight(&flight_number).await?))
}
