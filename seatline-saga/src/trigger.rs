use tracing::{error, info, warn};

use seatline_core::models::{PassengerFact, Reservation, ReservationId};
use seatline_core::workflow::ProcessVariables;
use seatline_core::{CoreError, CoreResult};

use crate::Collaborators;

/// Starts the reservation process for a reservation and records the instance key.
pub struct WorkflowTrigger {
    deps: Collaborators,
}

impl WorkflowTrigger {
    pub fn new(deps: Collaborators) -> Self {
        Self { deps }
    }

    /// Start one process instance and persist its key on the reservation.
    ///
    /// The start is claimed in the store first, so overlapping callers for the
    /// same reservation cannot both reach the engine. A caller that loses the
    /// claim gets the recorded reservation if the winner has finished, or a
    /// `ConflictError` while the start is still in flight.
    ///
    /// If the engine call fails or times out the claim is dropped and the
    /// reservation is left without a key, which is the resumable "pending
    /// instance" state.
    pub async fn start_for(&self, reservation: &Reservation, passenger: &PassengerFact) -> CoreResult<Reservation> {
        let id = reservation.id;
        let lease = self.deps.timeouts.instance_claim_lease();
        let claimed = self
            .deps
            .timeouts
            .within_store("claim process start", self.deps.store.claim_instance_start(id, lease))
            .await?;
        if !claimed {
            return self.settled_elsewhere(id).await;
        }

        let variables = ProcessVariables::for_booking(id, passenger);
        let process_id = self.deps.process_id.as_str();

        let started = self
            .deps
            .timeouts
            .within_workflow("start process instance", self.deps.workflow.start_instance(process_id, &variables))
            .await;
        let key = match started {
            Ok(key) => key,
            Err(e) => {
                warn!(reservation_id = id, process_id, kind = e.kind(), "Process start failed: {}", e);
                self.release(id).await;
                return Err(e);
            }
        };

        info!(reservation_id = id, instance_key = key, "Process instance started");

        let recorded = self
            .deps
            .timeouts
            .within_store("record instance key", self.deps.store.set_instance_key(id, key))
            .await;
        match recorded {
            Ok(reservation) => Ok(reservation),
            Err(CoreError::ConflictError(msg)) => {
                // Our claim lapsed and another caller recorded its key first.
                warn!(reservation_id = id, orphaned_instance_key = key, "Instance key superseded: {}", msg);
                self.load(id).await
            }
            Err(e) => {
                // The engine now runs an instance the store does not know about.
                error!(reservation_id = id, instance_key = key, "Instance key could not be recorded: {}", e);
                Err(e)
            }
        }
    }

    async fn settled_elsewhere(&self, id: ReservationId) -> CoreResult<Reservation> {
        let current = self.load(id).await?;
        if current.is_pending_instance() {
            info!(reservation_id = id, "Process start already in flight");
            return Err(CoreError::ConflictError(format!(
                "process start for reservation {} is already in progress",
                id
            )));
        }
        info!(reservation_id = id, "Process instance recorded by a concurrent caller");
        Ok(current)
    }

    async fn release(&self, id: ReservationId) {
        let released = self
            .deps
            .timeouts
            .within_store("release process claim", self.deps.store.release_instance_claim(id))
            .await;
        if let Err(e) = released {
            warn!(reservation_id = id, "Process claim left to lapse: {}", e);
        }
    }

    async fn load(&self, id: ReservationId) -> CoreResult<Reservation> {
        self.deps
            .timeouts
            .within_store("load reservation", self.deps.store.get_reservation(id))
            .await?
            .ok_or_else(|| CoreError::ReservationNotFound(id.to_string()))
    }

    /// Re-run the directory lookup and process start for a reservation still
    /// waiting for its instance. Returns the reservation unchanged when a key is
    /// already recorded.
    pub async fn resume(&self, reservation_id: ReservationId) -> CoreResult<Reservation> {
        let reservation = self.load(reservation_id).await?;

        if !reservation.is_pending_instance() {
            info!(reservation_id, "Process instance already recorded, nothing to resume");
            return Ok(reservation);
        }

        let passenger = self
            .deps
            .timeouts
            .within_directory("passenger lookup", self.deps.directory.passenger(reservation.passenger_id))
            .await?;

        self.start_for(&reservation, &passenger).await
    }
}
