use serde::Serialize;
use tracing::{info, warn};

use seatline_core::models::{PaymentConfirmationRequest, PaymentId, ReservationId, SettlementOutcome};
use seatline_core::notifier::NotificationKind;
use seatline_core::{CoreError, CoreResult};

use crate::notifications::NotificationDispatcher;
use crate::{Collaborators, MAX_CODE_ATTEMPTS};

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ConfirmationStatus {
    /// This call settled the payment and issued the booking code.
    Paid,
    /// The payment had already been settled; the existing code is returned.
    AlreadyPaid,
    /// The gateway reported the payment as not made; nothing changed.
    Unpaid,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum DeliveryReport {
    Delivered,
    Failed { kind: String, message: String },
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ConfirmationOutcome {
    pub status: ConfirmationStatus,
    pub reservation_id: ReservationId,
    pub payment_id: PaymentId,
    pub payment_method: Option<String>,
    pub booking_code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notification: Option<DeliveryReport>,
}

pub struct PaymentConfirmation {
    deps: Collaborators,
    notifications: NotificationDispatcher,
}

impl PaymentConfirmation {
    pub fn new(deps: Collaborators) -> Self {
        let notifications = NotificationDispatcher::new(deps.clone());
        Self { deps, notifications }
    }

    /// Apply a payment gateway result.
    ///
    /// A payment moves to paid once and gets exactly one booking code; repeat
    /// confirmations return that code without writing. Reverting a paid
    /// payment is a `ConflictError`.
    pub async fn confirm(&self, request: PaymentConfirmationRequest) -> CoreResult<ConfirmationOutcome> {
        request.validate()?;
        let payment_code = request.payment_code.trim();

        if !request.paid {
            return self.record_unpaid(payment_code).await;
        }

        let method = request.method();
        let settlement = self.settle(payment_code, &method).await?;
        let reservation = settlement.reservation();
        let payment = settlement.payment();

        let mut outcome = ConfirmationOutcome {
            status: ConfirmationStatus::AlreadyPaid,
            reservation_id: reservation.id,
            payment_id: payment.id,
            payment_method: payment.method.clone(),
            booking_code: reservation.booking_code.clone(),
            notification: None,
        };

        if let SettlementOutcome::Settled { .. } = settlement {
            info!(
                reservation_id = reservation.id,
                booking_code = reservation.booking_code.as_deref().unwrap_or_default(),
                "Payment settled, booking code issued"
            );
            outcome.status = ConfirmationStatus::Paid;
            outcome.notification = Some(self.announce(reservation.id).await);
        } else {
            info!(reservation_id = reservation.id, "Payment already settled, confirmation ignored");
        }

        Ok(outcome)
    }

    async fn settle(&self, payment_code: &str, method: &str) -> CoreResult<SettlementOutcome> {
        for attempt in 1..=MAX_CODE_ATTEMPTS {
            let booking_code = self.deps.codes.booking_code();
            match self
                .deps
                .timeouts
                .within_store(
                    "settle payment",
                    self.deps.store.settle_payment(payment_code, method, &booking_code),
                )
                .await
            {
                // The store only reports a taken booking code as a conflict.
                Err(CoreError::ConflictError(msg)) => {
                    warn!(attempt, "Booking code rejected: {}", msg);
                }
                other => return other,
            }
        }
        Err(CoreError::ConflictError(format!(
            "no unique booking code after {} attempts",
            MAX_CODE_ATTEMPTS
        )))
    }

    async fn record_unpaid(&self, payment_code: &str) -> CoreResult<ConfirmationOutcome> {
        let payment = self
            .deps
            .timeouts
            .within_store("load payment by code", self.deps.store.get_payment_by_code(payment_code))
            .await?
            .ok_or_else(|| CoreError::PaymentNotFound(format!("payment code {}", payment_code)))?;

        if payment.paid {
            return Err(CoreError::ConflictError(format!(
                "payment {} is already settled and cannot be marked unpaid",
                payment.id
            )));
        }

        info!(reservation_id = payment.reservation_id, "Payment reported unpaid");
        Ok(ConfirmationOutcome {
            status: ConfirmationStatus::Unpaid,
            reservation_id: payment.reservation_id,
            payment_id: payment.id,
            payment_method: None,
            booking_code: None,
            notification: None,
        })
    }

    /// The settlement stands whatever happens here.
    async fn announce(&self, reservation_id: ReservationId) -> DeliveryReport {
        match self
            .notifications
            .dispatch(NotificationKind::BookingCode, reservation_id)
            .await
        {
            Ok(_) => DeliveryReport::Delivered,
            Err(e) => DeliveryReport::Failed {
                kind: e.kind().to_string(),
                message: e.to_string(),
            },
        }
    }
}
