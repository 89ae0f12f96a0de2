use std::future::Future;
use std::time::Duration;

use seatline_core::{CoreError, CoreResult};

/// Per-call deadlines for every external boundary a saga step crosses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SagaTimeouts {
    pub store: Duration,
    pub directory: Duration,
    pub workflow: Duration,
    pub notifier: Duration,
}

impl Default for SagaTimeouts {
    fn default() -> Self {
        Self {
            store: Duration::from_secs(5),
            directory: Duration::from_secs(3),
            workflow: Duration::from_secs(10),
            notifier: Duration::from_secs(5),
        }
    }
}

async fn bounded<T, F>(
    limit: Duration,
    op: &str,
    fut: F,
    on_elapsed: fn(String) -> CoreError,
) -> CoreResult<T>
where
    F: Future<Output = CoreResult<T>>,
{
    match tokio::time::timeout(limit, fut).await {
        Ok(result) => result,
        Err(_) => {
            tracing::warn!(op, limit_ms = limit.as_millis() as u64, "External call timed out");
            Err(on_elapsed(format!("{} timed out after {}ms", op, limit.as_millis())))
        }
    }
}

impl SagaTimeouts {
    /// How long a process-start claim stays valid: long enough to cover the
    /// engine call and the key write that follows it, with slack.
    pub fn instance_claim_lease(&self) -> Duration {
        (self.workflow + self.store) * 2
    }

    /// Elapsed store calls surface as `PersistenceError`.
    pub async fn within_store<T, F>(&self, op: &str, fut: F) -> CoreResult<T>
    where
        F: Future<Output = CoreResult<T>>,
    {
        bounded(self.store, op, fut, CoreError::PersistenceError).await
    }

    /// Elapsed directory calls surface as `DirectoryUnavailable`.
    pub async fn within_directory<T, F>(&self, op: &str, fut: F) -> CoreResult<T>
    where
        F: Future<Output = CoreResult<T>>,
    {
        bounded(self.directory, op, fut, CoreError::DirectoryUnavailable).await
    }

    /// Elapsed workflow calls surface as `WorkflowUnreachable`.
    pub async fn within_workflow<T, F>(&self, op: &str, fut: F) -> CoreResult<T>
    where
        F: Future<Output = CoreResult<T>>,
    {
        bounded(self.workflow, op, fut, CoreError::WorkflowUnreachable).await
    }

    pub async fn within_notifier<T, F>(&self, op: &str, fut: F) -> CoreResult<T>
    where
        F: Future<Output = CoreResult<T>>,
    {
        bounded(self.notifier, op, fut, CoreError::NotificationError).await
    }
}
