pub mod models;
pub mod repository;
pub mod directory;
pub mod workflow;
pub mod notifier;
pub mod codes;

#[derive(Debug, Clone, thiserror::Error)]
pub enum CoreError {
    #[error("Validation failed: {0}")]
    ValidationError(String),
    #[error("Persistence failure: {0}")]
    PersistenceError(String),
    #[error("Directory unavailable: {0}")]
    DirectoryUnavailable(String),
    #[error("Directory returned a malformed payload: {0}")]
    DirectoryDecodeError(String),
    #[error("Directory has no record of {0}")]
    DirectoryRecordNotFound(String),
    #[error("Workflow engine unreachable: {0}")]
    WorkflowUnreachable(String),
    #[error("Workflow process definition not found: {0}")]
    WorkflowDefinitionMissing(String),
    #[error("Workflow engine rejected the request: {0}")]
    WorkflowRejected(String),
    #[error("Reservation not found: {0}")]
    ReservationNotFound(String),
    #[error("Payment not found: {0}")]
    PaymentNotFound(String),
    #[error("Conflict: {0}")]
    ConflictError(String),
    #[error("Notification delivery failed: {0}")]
    NotificationError(String),
}

impl CoreError {
    /// Stable label used in API bodies and log fields.
    pub fn kind(&self) -> &'static str {
        match self {
            CoreError::ValidationError(_) => "validation_error",
            CoreError::PersistenceError(_) => "persistence_error",
            CoreError::DirectoryUnavailable(_) => "directory_unavailable",
            CoreError::DirectoryDecodeError(_) => "directory_decode_error",
            CoreError::DirectoryRecordNotFound(_) => "directory_record_not_found",
            CoreError::WorkflowUnreachable(_) => "workflow_unreachable",
            CoreError::WorkflowDefinitionMissing(_) => "workflow_definition_missing",
            CoreError::WorkflowRejected(_) => "workflow_rejected",
            CoreError::ReservationNotFound(_) => "reservation_not_found",
            CoreError::PaymentNotFound(_) => "payment_not_found",
            CoreError::ConflictError(_) => "conflict_error",
            CoreError::NotificationError(_) => "notification_error",
        }
    }

    /// Whether repeating the same call later can succeed without operator action.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            CoreError::PersistenceError(_)
                | CoreError::DirectoryUnavailable(_)
                | CoreError::WorkflowUnreachable(_)
                | CoreError::NotificationError(_)
        )
    }

    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            CoreError::ReservationNotFound(_)
                | CoreError::PaymentNotFound(_)
                | CoreError::DirectoryRecordNotFound(_)
        )
    }
}

pub type CoreResult<T> = Result<T, CoreError>;
