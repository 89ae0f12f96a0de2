use tracing::{info, warn};

use seatline_core::models::ReservationId;
use seatline_core::notifier::{Notification, NotificationKind, NotificationPayload};
use seatline_core::CoreResult;

use crate::ticket::TicketAssembler;
use crate::Collaborators;

/// Builds the payload for a notification kind and hands it to the notifier.
/// Delivery is attempted once; failures are returned, not retried.
pub struct NotificationDispatcher {
    deps: Collaborators,
    tickets: TicketAssembler,
}

impl NotificationDispatcher {
    pub fn new(deps: Collaborators) -> Self {
        let tickets = TicketAssembler::new(deps.clone());
        Self { deps, tickets }
    }

    pub async fn dispatch(&self, kind: NotificationKind, reservation_id: ReservationId) -> CoreResult<Notification> {
        let (payload, passenger) = if kind.wants_ticket() {
            let reservation = self.tickets.reservation(reservation_id).await?;
            let (ticket, passenger) = self.tickets.ticket_with_passenger(&reservation).await?;
            (NotificationPayload::Ticket(ticket), passenger)
        } else {
            let (detail, passenger) = self.tickets.payment_detail_for_reservation(reservation_id).await?;
            (NotificationPayload::PaymentDetail(detail), passenger)
        };

        let notification = Notification::new(kind, passenger.email, payload);
        self.deps
            .timeouts
            .within_notifier("deliver notification", self.deps.notifier.deliver(&notification))
            .await
            .map_err(|e| {
                warn!(reservation_id, kind = kind.as_str(), "Notification not delivered: {}", e);
                e
            })?;

        info!(reservation_id, kind = kind.as_str(), "Notification delivered");
        Ok(notification)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fakes::{Harness, RecordingNotifier, ScriptedWorkflow, StaticDirectory};
    use seatline_core::models::NewReservation;
    use seatline_core::repository::ReservationStore;
    use seatline_core::CoreError;

    async fn seed(h: &Harness) -> ReservationId {
        let (r, _) = h
            .store
            .create_reservation(&NewReservation {
                flight_number: "GA123".into(),
                passenger_id: 42,
                seat_number: "12A".into(),
                price: 150.0,
                payment_code: "1000000000000001".into(),
            })
            .await
            .unwrap();
        r.id
    }

    #[tokio::test]
    async fn test_reminders_carry_payment_detail() {
        let h = Harness::new();
        let id = seed(&h).await;
        let dispatcher = NotificationDispatcher::new(h.deps());

        for kind in [NotificationKind::Confirmation, NotificationKind::Unpaid, NotificationKind::FailedPayment] {
            let sent = dispatcher.dispatch(kind, id).await.unwrap();
            assert_eq!(sent.recipient, "ayu@example.com");
            assert_eq!(sent.subject, kind.subject());
            assert!(matches!(sent.payload, NotificationPayload::PaymentDetail(_)));
        }
        assert_eq!(h.notifier.delivered().len(), 3);
    }

    #[tokio::test]
    async fn test_booking_code_notification_needs_settled_payment() {
        let h = Harness::new();
        let id = seed(&h).await;
        let dispatcher = NotificationDispatcher::new(h.deps());

        let err = dispatcher.dispatch(NotificationKind::BookingCode, id).await.unwrap_err();
        assert!(matches!(err, CoreError::ConflictError(_)));

        h.store.settle_payment("1000000000000001", "CARD", "QW7ER").await.unwrap();
        let sent = dispatcher.dispatch(NotificationKind::BookingCode, id).await.unwrap();
        match sent.payload {
            NotificationPayload::Ticket(ticket) => assert_eq!(ticket.booking_code, "QW7ER"),
            other => panic!("expected ticket payload, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_delivery_failure_is_surfaced() {
        let h = Harness::with(StaticDirectory::standard(), ScriptedWorkflow::new(), RecordingNotifier::failing());
        let id = seed(&h).await;

        let err = NotificationDispatcher::new(h.deps())
            .dispatch(NotificationKind::Unpaid, id)
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::NotificationError(_)));
    }

    #[tokio::test]
    async fn test_unknown_reservation() {
        let h = Harness::new();
        let err = NotificationDispatcher::new(h.deps())
            .dispatch(NotificationKind::Confirmation, 5)
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::ReservationNotFound(_)));
    }
}
