use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::models::{PaymentDetail, Ticket};
use crate::{CoreError, CoreResult};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "kebab-case")]
pub enum NotificationKind {
    /// Reservation created, payment pending.
    Confirmation,
    /// Payment window is closing.
    Unpaid,
    /// Payment attempt failed.
    FailedPayment,
    /// Payment confirmed and booking code issued.
    BookingCode,
}

impl NotificationKind {
    pub const ALL: [NotificationKind; 4] = [
        NotificationKind::Confirmation,
        NotificationKind::Unpaid,
        NotificationKind::FailedPayment,
        NotificationKind::BookingCode,
    ];

    pub fn subject(&self) -> &'static str {
        match self {
            NotificationKind::Confirmation => "Reservation Ticket",
            NotificationKind::Unpaid => "Reservation Ticket Unpaid",
            NotificationKind::FailedPayment => "Failed Payment Reservation Ticket",
            NotificationKind::BookingCode => "Booking Ticket Confirmation",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationKind::Confirmation => "confirmation",
            NotificationKind::Unpaid => "unpaid",
            NotificationKind::FailedPayment => "failed-payment",
            NotificationKind::BookingCode => "booking-code",
        }
    }

    /// Only the booking-code notification carries a ticket; the rest carry the payment view.
    pub fn wants_ticket(&self) -> bool {
        matches!(self, NotificationKind::BookingCode)
    }
}

impl FromStr for NotificationKind {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        NotificationKind::ALL
            .into_iter()
            .find(|k| k.as_str() == s)
            .ok_or_else(|| CoreError::ValidationError(format!("unknown notification kind '{}'", s)))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum NotificationPayload {
    Ticket(Ticket),
    PaymentDetail(PaymentDetail),
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Notification {
    pub kind: NotificationKind,
    pub recipient: String,
    pub subject: String,
    pub payload: NotificationPayload,
}

impl Notification {
    pub fn new(kind: NotificationKind, recipient: impl Into<String>, payload: NotificationPayload) -> Self {
        Self {
            kind,
            recipient: recipient.into(),
            subject: kind.subject().to_string(),
            payload,
        }
    }
}

/// Renders and delivers a notification. Rendering is entirely the
/// implementation's concern; callers surface failures and never retry.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn deliver(&self, notification: &Notification) -> CoreResult<()>;
}

/// Logs notifications instead of delivering them. Used in development.
#[derive(Debug, Clone)]
pub struct ConsoleNotifier {
    sender: String,
    region: String,
}

impl ConsoleNotifier {
    pub fn new(sender: impl Into<String>, region: impl Into<String>) -> Self {
        Self {
            sender: sender.into(),
            region: region.into(),
        }
    }
}

#[async_trait]
impl Notifier for ConsoleNotifier {
    async fn deliver(&self, notification: &Notification) -> CoreResult<()> {
        let body = serde_json::to_string(&notification.payload)
            .map_err(|e| CoreError::NotificationError(e.to_string()))?;

        tracing::info!(
            kind = notification.kind.as_str(),
            from = %self.sender,
            to = %notification.recipient,
            region = %self.region,
            subject = %notification.subject,
            "Notification (console delivery): {}",
            body
        );
        Ok(())
    }
}
