use axum::{extract::State, http::Method, routing::get, Json, Router};
use serde_json::{json, Value};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

pub mod bookings;
pub mod error;
pub mod flights;
pub mod notifications;
pub mod payments;
pub mod state;
pub mod tickets;

pub use error::AppError;
pub use state::AppState;

pub fn app(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(tower_http::cors::Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([axum::http::header::CONTENT_TYPE, axum::http::header::USER_AGENT]);

    Router::new()
        .route("/healthz", get(healthz))
        .merge(bookings::routes())
        .merge(flights::routes())
        .merge(payments::routes())
        .merge(tickets::routes())
        .merge(notifications::routes())
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn healthz(State(state): State<AppState>) -> Json<Value> {
    Json(json!({ "status": "ok", "store": state.store_backend }))
}
