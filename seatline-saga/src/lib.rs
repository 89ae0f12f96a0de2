use std::sync::Arc;

use seatline_core::codes::CodeGenerator;
use seatline_core::directory::DirectoryClient;
use seatline_core::models::{normalize_flight_number, FlightFact, Reservation, ReservationId};
use seatline_core::notifier::Notifier;
use seatline_core::repository::ReservationStore;
use seatline_core::workflow::WorkflowEngine;
use seatline_core::{CoreError, CoreResult};

pub mod timeout;
pub mod memory;
pub mod trigger;
pub mod booking;
pub mod ticket;
pub mod notifications;
pub mod confirmation;

#[cfg(test)]
pub(crate) mod fakes;

pub use booking::{BookingOutcome, BookingSaga, SagaStep, StepFailure};
pub use confirmation::{ConfirmationOutcome, ConfirmationStatus, DeliveryReport, PaymentConfirmation};
pub use memory::InMemoryReservationStore;
pub use notifications::NotificationDispatcher;
pub use ticket::TicketAssembler;
pub use timeout::SagaTimeouts;
pub use trigger::WorkflowTrigger;

/// Attempts at generating a code the store accepts before giving up with `ConflictError`.
pub const MAX_CODE_ATTEMPTS: usize = 5;

/// Everything a saga step may talk to. Cloned into every service; all members
/// are shared handles.
#[derive(Clone)]
pub struct Collaborators {
    pub store: Arc<dyn ReservationStore>,
    pub directory: Arc<dyn DirectoryClient>,
    pub workflow: Arc<dyn WorkflowEngine>,
    pub notifier: Arc<dyn Notifier>,
    pub codes: Arc<dyn CodeGenerator>,
    pub process_id: String,
    pub timeouts: SagaTimeouts,
}

/// The saga's services wired over one set of collaborators.
#[derive(Clone)]
pub struct SagaServices {
    pub booking: Arc<BookingSaga>,
    pub trigger: Arc<WorkflowTrigger>,
    pub confirmation: Arc<PaymentConfirmation>,
    pub tickets: Arc<TicketAssembler>,
    pub notifications: Arc<NotificationDispatcher>,
    deps: Collaborators,
}

impl SagaServices {
    pub fn new(deps: Collaborators) -> Self {
        Self {
            booking: Arc::new(BookingSaga::new(deps.clone())),
            trigger: Arc::new(WorkflowTrigger::new(deps.clone())),
            confirmation: Arc::new(PaymentConfirmation::new(deps.clone())),
            tickets: Arc::new(TicketAssembler::new(deps.clone())),
            notifications: Arc::new(NotificationDispatcher::new(deps.clone())),
            deps,
        }
    }

    pub async fn list_reservations(&self) -> CoreResult<Vec<Reservation>> {
        self.deps
            .timeouts
            .within_store("list reservations", self.deps.store.list_reservations())
            .await
    }

    pub async fn reservation(&self, id: ReservationId) -> CoreResult<Reservation> {
        self.deps
            .timeouts
            .within_store("load reservation", self.deps.store.get_reservation(id))
            .await?
            .ok_or_else(|| CoreError::ReservationNotFound(id.to_string()))
    }

    /// Flight schedule straight from the directory.
    pub async fn flight(&self, flight_number: &str) -> CoreResult<FlightFact> {
        let flight_number = normalize_flight_number(flight_number)?;
        self.deps
            .timeouts
            .within_directory("flight lookup", self.deps.directory.flight(&flight_number))
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fakes::{Harness, RecordingNotifier, ScriptedWorkflow, StaticDirectory};
    use std::time::{Duration, Instant};

    #[tokio::test]
    async fn test_flight_lookup_normalizes_and_is_bounded() {
        let h = Harness::new();
        let services = SagaServices::new(h.deps());
        assert_eq!(services.flight(" ga123 ").await.unwrap().arrival_airport_code, "DPS");
        assert!(matches!(services.flight("GA-1").await, Err(CoreError::ValidationError(_))));
        assert!(matches!(services.flight("XX9").await, Err(CoreError::DirectoryRecordNotFound(_))));

        let slow = Harness::with(
            StaticDirectory::standard().slow(Duration::from_secs(2)),
            ScriptedWorkflow::new(),
            RecordingNotifier::default(),
        );
        let started = Instant::now();
        let err = SagaServices::new(slow.deps()).flight("GA123").await.unwrap_err();
        assert!(matches!(err, CoreError::DirectoryUnavailable(_)));
        assert!(started.elapsed() < Duration::from_secs(1));
    }

    #[tokio::test]
    async fn test_reservation_reads() {
        let h = Harness::new();
        let services = SagaServices::new(h.deps());
        assert!(services.list_reservations().await.unwrap().is_empty());
        assert!(matches!(services.reservation(1).await, Err(CoreError::ReservationNotFound(_))));
    }
}
