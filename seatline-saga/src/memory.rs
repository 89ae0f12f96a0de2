use async_trait::async_trait;
use chrono::Utc;
use std::collections::BTreeMap;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;

use seatline_core::models::{
    InstanceKey, NewReservation, Payment, PaymentId, Reservation, ReservationId, SettlementOutcome,
};
use seatline_core::repository::ReservationStore;
use seatline_core::{CoreError, CoreResult};

#[derive(Default)]
struct MemoryState {
    reservations: BTreeMap<ReservationId, Reservation>,
    payments: BTreeMap<PaymentId, Payment>,
    /// Instance-start claims and when they lapse.
    claims: BTreeMap<ReservationId, Instant>,
    next_reservation_id: ReservationId,
    next_payment_id: PaymentId,
}

impl MemoryState {
    fn payment_by_code(&self, payment_code: &str) -> Option<&Payment> {
        self.payments.values().find(|p| p.payment_code == payment_code)
    }
}

/// Process-local store with the same uniqueness and atomicity rules as the
/// Postgres store. Every operation holds one lock, so settlement is a single
/// critical section.
#[derive(Default)]
pub struct InMemoryReservationStore {
    state: Mutex<MemoryState>,
}

impl InMemoryReservationStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Puts a reservation into the state a half-applied settlement would leave.
    #[cfg(test)]
    pub(crate) async fn force_booking_code(&self, id: ReservationId, booking_code: &str) {
        if let Some(r) = self.state.lock().await.reservations.get_mut(&id) {
            r.booking_code = Some(booking_code.to_string());
        }
    }
}

#[async_trait]
impl ReservationStore for InMemoryReservationStore {
    async fn create_reservation(&self, new: &NewReservation) -> CoreResult<(Reservation, Payment)> {
        let mut state = self.state.lock().await;

        if state.payment_by_code(&new.payment_code).is_some() {
            return Err(CoreError::ConflictError(format!(
                "payment code {} already issued",
                new.payment_code
            )));
        }

        state.next_reservation_id += 1;
        state.next_payment_id += 1;
        let now = Utc::now();

        let reservation = Reservation {
            id: state.next_reservation_id,
            flight_number: new.flight_number.clone(),
            passenger_id: new.passenger_id,
            seat_number: new.seat_number.clone(),
            price: new.price,
            booking_code: None,
            instance_key: None,
            created_at: now,
        };
        let payment = Payment {
            id: state.next_payment_id,
            reservation_id: reservation.id,
            amount: new.price,
            method: None,
            payment_code: new.payment_code.clone(),
            paid: false,
            created_at: now,
        };

        state.reservations.insert(reservation.id, reservation.clone());
        state.payments.insert(payment.id, payment.clone());
        Ok((reservation, payment))
    }

    async fn get_reservation(&self, id: ReservationId) -> CoreResult<Option<Reservation>> {
        Ok(self.state.lock().await.reservations.get(&id).cloned())
    }

    async fn get_reservation_by_booking_code(&self, booking_code: &str) -> CoreResult<Option<Reservation>> {
        let state = self.state.lock().await;
        Ok(state
            .reservations
            .values()
            .find(|r| r.booking_code.as_deref() == Some(booking_code))
            .cloned())
    }

    async fn list_reservations(&self) -> CoreResult<Vec<Reservation>> {
        Ok(self.state.lock().await.reservations.values().cloned().collect())
    }

    async fn claim_instance_start(&self, id: ReservationId, lease: Duration) -> CoreResult<bool> {
        let mut state = self.state.lock().await;
        let reservation = state
            .reservations
            .get(&id)
            .ok_or_else(|| CoreError::ReservationNotFound(id.to_string()))?;
        if reservation.instance_key.is_some() {
            return Ok(false);
        }

        let now = Instant::now();
        if matches!(state.claims.get(&id), Some(until) if *until > now) {
            return Ok(false);
        }
        state.claims.insert(id, now + lease);
        Ok(true)
    }

    async fn release_instance_claim(&self, id: ReservationId) -> CoreResult<()> {
        self.state.lock().await.claims.remove(&id);
        Ok(())
    }

    async fn set_instance_key(&self, id: ReservationId, key: InstanceKey) -> CoreResult<Reservation> {
        let mut state = self.state.lock().await;
        state.claims.remove(&id);
        let reservation = state
            .reservations
            .get_mut(&id)
            .ok_or_else(|| CoreError::ReservationNotFound(id.to_string()))?;

        if let Some(existing) = reservation.instance_key {
            return Err(CoreError::ConflictError(format!(
                "reservation {} already bound to process instance {}",
                id, existing
            )));
        }
        reservation.instance_key = Some(key);
        Ok(reservation.clone())
    }

    async fn get_payment(&self, id: PaymentId) -> CoreResult<Option<Payment>> {
        Ok(self.state.lock().await.payments.get(&id).cloned())
    }

    async fn get_payment_by_reservation(&self, reservation_id: ReservationId) -> CoreResult<Option<Payment>> {
        let state = self.state.lock().await;
        Ok(state
            .payments
            .values()
            .find(|p| p.reservation_id == reservation_id)
            .cloned())
    }

    async fn get_payment_by_code(&self, payment_code: &str) -> CoreResult<Option<Payment>> {
        Ok(self.state.lock().await.payment_by_code(payment_code).cloned())
    }

    async fn settle_payment(
        &self,
        payment_code: &str,
        method: &str,
        booking_code: &str,
    ) -> CoreResult<SettlementOutcome> {
        let mut state = self.state.lock().await;

        let payment = state
            .payment_by_code(payment_code)
            .cloned()
            .ok_or_else(|| CoreError::PaymentNotFound(format!("payment code {}", payment_code)))?;
        let reservation = state
            .reservations
            .get(&payment.reservation_id)
            .cloned()
            .ok_or_else(|| CoreError::ReservationNotFound(payment.reservation_id.to_string()))?;

        if payment.paid {
            return Ok(SettlementOutcome::AlreadySettled { payment, reservation });
        }
        if reservation.booking_code.is_some() {
            return Err(CoreError::PersistenceError(format!(
                "reservation {} holds a booking code but its payment is unpaid",
                reservation.id
            )));
        }
        if state
            .reservations
            .values()
            .any(|r| r.booking_code.as_deref() == Some(booking_code))
        {
            return Err(CoreError::ConflictError(format!("booking code {} already issued", booking_code)));
        }

        let payment = Payment {
            paid: true,
            method: Some(method.to_string()),
            ..payment
        };
        let reservation = Reservation {
            booking_code: Some(booking_code.to_string()),
            ..reservation
        };
        state.payments.insert(payment.id, payment.clone());
        state.reservations.insert(reservation.id, reservation.clone());

        Ok(SettlementOutcome::Settled { payment, reservation })
    }
}
