use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    routing::post,
    Json, Router,
};
use serde::{Deserialize, Serialize};

use seatline_core::models::ReservationId;
use seatline_core::notifier::NotificationKind;

use crate::error::AppError;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct NotifyRequest {
    pub reservation_id: ReservationId,
}

#[derive(Debug, Serialize)]
pub struct NotifyResponse {
    pub kind: NotificationKind,
    pub recipient: String,
    pub subject: String,
}

/// Called by the reservation process at its notification stages.
pub fn routes() -> Router<AppState> {
    Router::new().route("/notifications/{kind}", post(notify))
}

async fn notify(
    State(state): State<AppState>,
    Path(kind): Path<String>,
    payload: Result<Json<NotifyRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<NotifyResponse>), AppError> {
    let kind: NotificationKind = kind.parse()?;
    let Json(request) = payload?;

    let sent = state.saga.notifications.dispatch(kind, request.reservation_id).await?;
    Ok((
        StatusCode::ACCEPTED,
        Json(NotifyResponse {
            kind: sent.kind,
            recipient: sent.recipient,
            subject: sent.subject,
        }),
    ))
}
