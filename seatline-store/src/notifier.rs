use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;

use seatline_core::notifier::{Notification, NotificationPayload, Notifier};
use seatline_core::{CoreError, CoreResult};

/// Posts notifications to a mail relay that owns templating and delivery.
#[derive(Clone)]
pub struct HttpNotifier {
    client: Client,
    endpoint: String,
    sender: String,
    region: String,
}

#[derive(Serialize)]
struct Envelope<'a> {
    from: &'a str,
    to: &'a str,
    region: &'a str,
    subject: &'a str,
    template: &'static str,
    payload: &'a NotificationPayload,
}

impl HttpNotifier {
    pub fn new(endpoint: impl Into<String>, sender: impl Into<String>, region: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            endpoint: endpoint.into(),
            sender: sender.into(),
            region: region.into(),
        }
    }
}

#[async_trait]
impl Notifier for HttpNotifier {
    async fn deliver(&self, notification: &Notification) -> CoreResult<()> {
        let envelope = Envelope {
            from: &self.sender,
            to: &notification.recipient,
            region: &self.region,
            subject: &notification.subject,
            template: notification.kind.as_str(),
            payload: &notification.payload,
        };

        let response = self
            .client
            .post(&self.endpoint)
            .json(&envelope)
            .send()
            .await
            .map_err(|e| CoreError::NotificationError(e.to_string()))?;

        if !response.status().is_success() {
            return Err(CoreError::NotificationError(format!(
                "relay answered {} for {}",
                response.status(),
                notification.kind.as_str()
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use seatline_core::models::Ticket;
    use seatline_core::notifier::NotificationKind;
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn booking_code_notification() -> Notification {
        let ticket = Ticket {
            flight_number: "GA123".into(),
            booking_code: "AB12C".into(),
            passenger_first_name: "Ayu".into(),
            passenger_last_name: "Lestari".into(),
            seat_number: "12A".into(),
            departure_airport_code: "CGK".into(),
            arrival_airport_code: "DPS".into(),
            departure_date_time: Utc::now(),
            arrival_date_time: Utc::now(),
        };
        Notification::new(NotificationKind::BookingCode, "ayu@example.com", NotificationPayload::Ticket(ticket))
    }

    #[tokio::test]
    async fn test_envelope_carries_configured_sender() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/send"))
            .and(body_partial_json(json!({
                "from": "tickets@seatline.test",
                "to": "ayu@example.com",
                "region": "ap-southeast-1",
                "subject": "Booking Ticket Confirmation",
                "template": "booking-code",
                "payload": {"type": "ticket", "data": {"booking_code": "AB12C"}}
            })))
            .respond_with(ResponseTemplate::new(202))
            .expect(1)
            .mount(&server)
            .await;

        let notifier = HttpNotifier::new(format!("{}/send", server.uri()), "tickets@seatline.test", "ap-southeast-1");
        notifier.deliver(&booking_code_notification()).await.unwrap();
    }

    #[tokio::test]
    async fn test_relay_refusal_surfaces() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let notifier = HttpNotifier::new(server.uri(), "tickets@seatline.test", "ap-southeast-1");
        let err = notifier.deliver(&booking_code_notification()).await.unwrap_err();
        assert!(matches!(err, CoreError::NotificationError(_)));
    }
}
