use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use seatline_core::CoreError;
use serde_json::json;

#[derive(Debug)]
pub enum AppError {
    Core(CoreError),
    MalformedBody(String),
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::MalformedBody(_) => StatusCode::BAD_REQUEST,
            AppError::Core(err) => match err {
                CoreError::ValidationError(_) => StatusCode::BAD_REQUEST,
                CoreError::ReservationNotFound(_)
                | CoreError::PaymentNotFound(_)
                | CoreError::DirectoryRecordNotFound(_) => StatusCode::NOT_FOUND,
                CoreError::ConflictError(_) => StatusCode::CONFLICT,
                CoreError::DirectoryUnavailable(_) | CoreError::WorkflowUnreachable(_) => {
                    StatusCode::SERVICE_UNAVAILABLE
                }
                CoreError::DirectoryDecodeError(_)
                | CoreError::WorkflowRejected(_)
                | CoreError::NotificationError(_) => StatusCode::BAD_GATEWAY,
                CoreError::PersistenceError(_) | CoreError::WorkflowDefinitionMissing(_) => {
                    StatusCode::INTERNAL_SERVER_ERROR
                }
            },
        }
    }

    fn kind(&self) -> &'static str {
        match self {
            AppError::MalformedBody(_) => "validation_error",
            AppError::Core(err) => err.kind(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let kind = self.kind();
        let message = match self {
            AppError::MalformedBody(msg) => msg,
            AppError::Core(err) => err.to_string(),
        };

        if status.is_server_error() {
            tracing::error!(kind, "Request failed: {}", message);
        }

        let body = Json(json!({
            "error": message,
            "kind": kind,
        }));

        (status, body).into_response()
    }
}

impl From<CoreError> for AppError {
    fn from(err: CoreError) -> Self {
        AppError::Core(err)
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::MalformedBody(rejection.body_text())
    }
}
