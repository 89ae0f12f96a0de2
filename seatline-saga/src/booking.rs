use serde::Serialize;
use tracing::{info, info_span, warn, Instrument};
use uuid::Uuid;

use seatline_core::models::{BookingRequest, Payment, Reservation};
use seatline_core::{CoreError, CoreResult};

use crate::trigger::WorkflowTrigger;
use crate::{Collaborators, MAX_CODE_ATTEMPTS};

/// Steps after the initial write that may fail without undoing it.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SagaStep {
    DirectoryLookup,
    WorkflowStart,
}

#[derive(Debug, Clone)]
pub struct StepFailure {
    pub step: SagaStep,
    pub error: CoreError,
}

/// What a booking left behind. The reservation and payment always exist; a
/// `failure` means the saga stopped early and can be resumed by reservation id.
#[derive(Debug, Clone)]
pub struct BookingOutcome {
    pub reservation: Reservation,
    pub payment: Payment,
    pub failure: Option<StepFailure>,
}

impl BookingOutcome {
    pub fn is_complete(&self) -> bool {
        self.failure.is_none()
    }
}

pub struct BookingSaga {
    deps: Collaborators,
    trigger: WorkflowTrigger,
}

impl BookingSaga {
    pub fn new(deps: Collaborators) -> Self {
        let trigger = WorkflowTrigger::new(deps.clone());
        Self { deps, trigger }
    }

    /// Persist the reservation and payment, look the passenger up, then start
    /// the reservation process.
    ///
    /// Only validation and the initial write can fail the whole call. Later
    /// failures come back inside the outcome with the rows left in place.
    pub async fn book(&self, request: BookingRequest) -> CoreResult<BookingOutcome> {
        request.validate()?;

        let saga_id = Uuid::new_v4();
        let span = info_span!("booking_saga", saga_id = %saga_id, flight = %request.flight_number.trim());
        self.run(request).instrument(span).await
    }

    async fn run(&self, request: BookingRequest) -> CoreResult<BookingOutcome> {
        let (reservation, payment) = self.persist(request).await?;
        info!(reservation_id = reservation.id, payment_id = payment.id, "Reservation persisted");

        let lookup = self
            .deps
            .timeouts
            .within_directory("passenger lookup", self.deps.directory.passenger(reservation.passenger_id))
            .await;
        let passenger = match lookup {
            Ok(p) => p,
            Err(error) => {
                warn!(reservation_id = reservation.id, kind = error.kind(), "Passenger lookup failed: {}", error);
                return Ok(BookingOutcome {
                    reservation,
                    payment,
                    failure: Some(StepFailure {
                        step: SagaStep::DirectoryLookup,
                        error,
                    }),
                });
            }
        };

        match self.trigger.start_for(&reservation, &passenger).await {
            Ok(reservation) => {
                info!(reservation_id = reservation.id, "Booking saga complete");
                Ok(BookingOutcome {
                    reservation,
                    payment,
                    failure: None,
                })
            }
            Err(error) => Ok(BookingOutcome {
                reservation,
                payment,
                failure: Some(StepFailure {
                    step: SagaStep::WorkflowStart,
                    error,
                }),
            }),
        }
    }

    /// Insert with a fresh payment code, drawing a new one whenever the store
    /// reports a collision.
    async fn persist(&self, request: BookingRequest) -> CoreResult<(Reservation, Payment)> {
        for attempt in 1..=MAX_CODE_ATTEMPTS {
            let new = request.clone().into_new_reservation(self.deps.codes.payment_code());
            match self
                .deps
                .timeouts
                .within_store("create reservation", self.deps.store.create_reservation(&new))
                .await
            {
                Err(CoreError::ConflictError(msg)) => {
                    warn!(attempt, "Payment code collision: {}", msg);
                }
                other => return other,
            }
        }
        Err(CoreError::ConflictError(format!(
            "no unique payment code after {} attempts",
            MAX_CODE_ATTEMPTS
        )))
    }
}
