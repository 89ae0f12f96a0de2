use async_trait::async_trait;
use std::time::Duration;

use crate::models::{
    InstanceKey, NewReservation, Payment, PaymentId, Reservation, ReservationId, SettlementOutcome,
};
use crate::CoreResult;

/// Durable record of reservations and their payments.
///
/// Implementations report store outages as `PersistenceError` and uniqueness
/// violations (payment code, booking code) as `ConflictError`.
#[async_trait]
pub trait ReservationStore: Send + Sync {
    /// Insert a reservation and its unpaid payment as one unit.
    async fn create_reservation(&self, new: &NewReservation) -> CoreResult<(Reservation, Payment)>;

    async fn get_reservation(&self, id: ReservationId) -> CoreResult<Option<Reservation>>;

    async fn get_reservation_by_booking_code(&self, booking_code: &str) -> CoreResult<Option<Reservation>>;

    async fn list_reservations(&self) -> CoreResult<Vec<Reservation>>;

    /// Take the exclusive right to start the process instance of a reservation
    /// that has no key yet. The claim lapses after `lease` so a crashed caller
    /// does not block retries forever.
    ///
    /// Returns `false` when a key is already recorded or another caller holds
    /// an unexpired claim.
    async fn claim_instance_start(&self, id: ReservationId, lease: Duration) -> CoreResult<bool>;

    /// Drop a claim after a failed start so the next retry can take it.
    async fn release_instance_claim(&self, id: ReservationId) -> CoreResult<()>;

    /// Record the workflow instance handle and drop any claim. Only succeeds
    /// while the reservation has none; a second write is a `ConflictError`.
    async fn set_instance_key(&self, id: ReservationId, key: InstanceKey) -> CoreResult<Reservation>;

    async fn get_payment(&self, id: PaymentId) -> CoreResult<Option<Payment>>;

    async fn get_payment_by_reservation(&self, reservation_id: ReservationId) -> CoreResult<Option<Payment>>;

    async fn get_payment_by_code(&self, payment_code: &str) -> CoreResult<Option<Payment>>;

    /// Mark the payment addressed by `payment_code` paid and attach `booking_code`
    /// to its reservation, atomically with respect to concurrent callers.
    ///
    /// An already-paid payment yields `AlreadySettled` and writes nothing.
    /// Unknown codes yield `PaymentNotFound`. `ConflictError` is reserved for a
    /// booking code that is already taken, so callers may retry with another.
    async fn settle_payment(
        &self,
        payment_code: &str,
        method: &str,
        booking_code: &str,
    ) -> CoreResult<SettlementOutcome>;
}
