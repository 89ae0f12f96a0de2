use tracing::debug;

use seatline_core::codes::is_booking_code;
use seatline_core::models::{
    PassengerFact, Payment, PaymentDetail, PaymentId, Reservation, ReservationId, Ticket,
};
use seatline_core::{CoreError, CoreResult};

use crate::Collaborators;

/// Joins stored reservation data with directory facts. Every method either
/// returns a complete payload or an error, never a partial one.
pub struct TicketAssembler {
    deps: Collaborators,
}

impl TicketAssembler {
    pub fn new(deps: Collaborators) -> Self {
        Self { deps }
    }

    pub async fn by_booking_code(&self, booking_code: &str) -> CoreResult<Ticket> {
        let code = booking_code.trim().to_uppercase();
        if !is_booking_code(&code) {
            return Err(CoreError::ValidationError(format!("'{}' is not a booking code", booking_code)));
        }

        let reservation = self
            .deps
            .timeouts
            .within_store("load reservation by booking code", self.deps.store.get_reservation_by_booking_code(&code))
            .await?
            .ok_or_else(|| CoreError::ReservationNotFound(format!("booking code {}", code)))?;

        Ok(self.ticket_with_passenger(&reservation).await?.0)
    }

    pub async fn for_reservation(&self, reservation_id: ReservationId) -> CoreResult<Ticket> {
        let reservation = self.reservation(reservation_id).await?;
        Ok(self.ticket_with_passenger(&reservation).await?.0)
    }

    pub async fn payment_detail(&self, payment_id: PaymentId) -> CoreResult<PaymentDetail> {
        let payment = self
            .deps
            .timeouts
            .within_store("load payment", self.deps.store.get_payment(payment_id))
            .await?
            .ok_or_else(|| CoreError::PaymentNotFound(payment_id.to_string()))?;
        let reservation = self.reservation(payment.reservation_id).await?;
        let passenger = self.passenger(&reservation).await?;

        Ok(PaymentDetail::assemble(&reservation, &payment, &passenger))
    }

    /// Payment view for a reservation, along with the passenger it was built from.
    pub(crate) async fn payment_detail_for_reservation(
        &self,
        reservation_id: ReservationId,
    ) -> CoreResult<(PaymentDetail, PassengerFact)> {
        let reservation = self.reservation(reservation_id).await?;
        let payment = self.payment_of(&reservation).await?;
        let passenger = self.passenger(&reservation).await?;

        Ok((PaymentDetail::assemble(&reservation, &payment, &passenger), passenger))
    }

    /// Ticket for a settled reservation, along with the passenger it was built from.
    pub(crate) async fn ticket_with_passenger(&self, reservation: &Reservation) -> CoreResult<(Ticket, PassengerFact)> {
        let payment = self.payment_of(reservation).await?;
        let booking_code = match (&reservation.booking_code, payment.paid) {
            (Some(code), true) => code.clone(),
            _ => {
                return Err(CoreError::ConflictError(format!(
                    "reservation {} has no confirmed payment yet",
                    reservation.id
                )))
            }
        };

        let timeouts = &self.deps.timeouts;
        let (passenger, flight) = tokio::try_join!(
            timeouts.within_directory("passenger lookup", self.deps.directory.passenger(reservation.passenger_id)),
            timeouts.within_directory("flight lookup", self.deps.directory.flight(&reservation.flight_number)),
        )?;

        debug!(reservation_id = reservation.id, booking_code = %booking_code, "Ticket assembled");
        Ok((Ticket::assemble(reservation, &booking_code, &passenger, &flight), passenger))
    }

    pub(crate) async fn reservation(&self, reservation_id: ReservationId) -> CoreResult<Reservation> {
        self.deps
            .timeouts
            .within_store("load reservation", self.deps.store.get_reservation(reservation_id))
            .await?
            .ok_or_else(|| CoreError::ReservationNotFound(reservation_id.to_string()))
    }

    async fn payment_of(&self, reservation: &Reservation) -> CoreResult<Payment> {
        self.deps
            .timeouts
            .within_store("load payment", self.deps.store.get_payment_by_reservation(reservation.id))
            .await?
            .ok_or_else(|| CoreError::PaymentNotFound(format!("reservation {}", reservation.id)))
    }

    async fn passenger(&self, reservation: &Reservation) -> CoreResult<PassengerFact> {
        self.deps
            .timeouts
            .within_directory("passenger lookup", self.deps.directory.passenger(reservation.passenger_id))
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fakes::{Harness, RecordingNotifier, ScriptedWorkflow, StaticDirectory};
    use seatline_core::models::NewReservation;
    use seatline_core::repository::ReservationStore;
    use std::time::{Duration, Instant};

    async fn seed(store: &dyn ReservationStore, passenger_id: i64, settle: bool) -> Reservation {
        let (r, p) = store
            .create_reservation(&NewReservation {
                flight_number: "GA123".into(),
                passenger_id,
                seat_number: "12A".into(),
                price: 150.0,
                payment_code: "1000000000000001".into(),
            })
            .await
            .unwrap();
        if settle {
            store.settle_payment(&p.payment_code, "BANK_TRANSFER", "AB12C").await.unwrap();
        }
        store.get_reservation(r.id).await.unwrap().unwrap()
    }

    #[tokio::test]
    async fn test_ticket_by_booking_code_matches_directory() {
        let h = Harness::new();
        seed(h.store.as_ref(), 42, true).await;
        let assembler = TicketAssembler::new(h.deps());

        let ticket = assembler.by_booking_code("ab12c").await.unwrap();
        assert_eq!(ticket.flight_number, "GA123");
        assert_eq!(ticket.seat_number, "12A");
        assert_eq!(ticket.booking_code, "AB12C");
        assert_eq!(ticket.passenger_first_name, "Ayu");
        assert_eq!(ticket.departure_airport_code, "CGK");
        assert_eq!(ticket.arrival_airport_code, "DPS");
    }

    #[tokio::test]
    async fn test_lookup_misses() {
        let h = Harness::new();
        let assembler = TicketAssembler::new(h.deps());

        assert!(matches!(
            assembler.by_booking_code("ZZZZZ").await,
            Err(CoreError::ReservationNotFound(_))
        ));
        assert!(matches!(
            assembler.by_booking_code("ab-1").await,
            Err(CoreError::ValidationError(_))
        ));
        assert!(matches!(
            assembler.for_reservation(9).await,
            Err(CoreError::ReservationNotFound(_))
        ));
        assert!(matches!(
            assembler.payment_detail(9).await,
            Err(CoreError::PaymentNotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_unpaid_reservation_has_no_ticket() {
        let h = Harness::new();
        let r = seed(h.store.as_ref(), 42, false).await;
        let err = TicketAssembler::new(h.deps()).for_reservation(r.id).await.unwrap_err();
        assert!(matches!(err, CoreError::ConflictError(_)));
    }

    #[tokio::test]
    async fn test_directory_failure_yields_no_payload() {
        let directory = StaticDirectory::standard();
        let h = Harness::with(directory, ScriptedWorkflow::new(), RecordingNotifier::default());
        let r = seed(h.store.as_ref(), 42, true).await;
        h.directory
            .fail_with(Some(CoreError::DirectoryDecodeError("expected value at line 1".into())));

        let err = TicketAssembler::new(h.deps()).for_reservation(r.id).await.unwrap_err();
        assert!(matches!(err, CoreError::DirectoryDecodeError(_)));
    }

    #[tokio::test]
    async fn test_directory_lookups_run_concurrently() {
        let h = Harness::with(
            StaticDirectory::standard().slow(Duration::from_millis(80)),
            ScriptedWorkflow::new(),
            RecordingNotifier::default(),
        );
        let r = seed(h.store.as_ref(), 42, true).await;
        let assembler = TicketAssembler::new(h.deps());

        let started = Instant::now();
        assembler.for_reservation(r.id).await.unwrap();
        // Sequential lookups would take at least 160ms.
        assert!(started.elapsed() < Duration::from_millis(150));
    }

    #[tokio::test]
    async fn test_payment_detail_joins_passenger() {
        let h = Harness::new();
        let r = seed(h.store.as_ref(), 42, false).await;
        let payment = h.store.get_payment_by_reservation(r.id).await.unwrap().unwrap();

        let detail = TicketAssembler::new(h.deps()).payment_detail(payment.id).await.unwrap();
        assert_eq!(detail.reservation_id, r.id);
        assert_eq!(detail.passenger_last_name, "Lestari");
        assert!(!detail.payment_status);
        assert_eq!(detail.payment_code, "1000000000000001");
    }
}
