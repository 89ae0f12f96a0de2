use chrono::{DateTime, Utc};
use seatline_shared::Masked;
use serde::{Deserialize, Serialize};

use crate::{CoreError, CoreResult};

pub type ReservationId = i64;
pub type PaymentId = i64;
pub type PassengerId = i64;
/// Correlation key returned by the workflow engine for a started process instance.
pub type InstanceKey = i64;

const MAX_FLIGHT_NUMBER_LEN: usize = 10;
const MAX_SEAT_LEN: usize = 5;

/// Inbound booking request (POST /bookings)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookingRequest {
    pub flight_number: String,
    pub passenger_id: PassengerId,
    pub seat_number: String,
    pub price: f64,
}

/// Trimmed, upper-cased flight number, or `ValidationError` when it is empty
/// or not short and alphanumeric.
pub fn normalize_flight_number(raw: &str) -> CoreResult<String> {
    let flight = raw.trim();
    if flight.is_empty() {
        return Err(CoreError::ValidationError("flight_number is required".into()));
    }
    if flight.len() > MAX_FLIGHT_NUMBER_LEN || !flight.chars().all(|c| c.is_ascii_alphanumeric()) {
        return Err(CoreError::ValidationError(format!(
            "flight_number '{}' must be up to {} alphanumeric characters",
            flight, MAX_FLIGHT_NUMBER_LEN
        )));
    }
    Ok(flight.to_uppercase())
}

impl BookingRequest {
    /// Rejects malformed requests before anything is written.
    pub fn validate(&self) -> CoreResult<()> {
        normalize_flight_number(&self.flight_number)?;
        if self.passenger_id <= 0 {
            return Err(CoreError::ValidationError("passenger_id must be positive".into()));
        }
        let seat = self.seat_number.trim();
        if seat.is_empty() || seat.len() > MAX_SEAT_LEN || !seat.chars().all(|c| c.is_ascii_alphanumeric()) {
            return Err(CoreError::ValidationError(format!(
                "seat_number '{}' must be 1-{} alphanumeric characters",
                seat, MAX_SEAT_LEN
            )));
        }
        if !self.price.is_finite() || self.price < 0.0 {
            return Err(CoreError::ValidationError("price must be a non-negative amount".into()));
        }
        Ok(())
    }

    /// Normalised row to persist, carrying the freshly generated payment code.
    pub fn into_new_reservation(self, payment_code: String) -> NewReservation {
        NewReservation {
            flight_number: self.flight_number.trim().to_uppercase(),
            passenger_id: self.passenger_id,
            seat_number: self.seat_number.trim().to_uppercase(),
            price: self.price,
            payment_code,
        }
    }
}

#[derive(Debug, Clone)]
pub struct NewReservation {
    pub flight_number: String,
    pub passenger_id: PassengerId,
    pub seat_number: String,
    pub price: f64,
    pub payment_code: String,
}

/// A seat hold for a passenger on a flight, the root of the saga.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Reservation {
    pub id: ReservationId,
    pub flight_number: String,
    pub passenger_id: PassengerId,
    pub seat_number: String,
    pub price: f64,
    pub booking_code: Option<String>,
    pub instance_key: Option<InstanceKey>,
    pub created_at: DateTime<Utc>,
}

impl Reservation {
    /// No process instance has been recorded yet; the workflow step can be resumed.
    pub fn is_pending_instance(&self) -> bool {
        self.instance_key.is_none()
    }

    pub fn is_ticketed(&self) -> bool {
        self.booking_code.is_some()
    }
}

/// Monetary record attached 1:1 to a reservation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Payment {
    pub id: PaymentId,
    pub reservation_id: ReservationId,
    pub amount: f64,
    pub method: Option<String>,
    pub payment_code: String,
    pub paid: bool,
    pub created_at: DateTime<Utc>,
}

/// Passenger projection served by the directory.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PassengerFact {
    pub passenger_id: PassengerId,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    #[serde(rename = "ktp", default)]
    pub national_id: Masked<String>,
    #[serde(default)]
    pub phone_number: Masked<String>,
    #[serde(default)]
    pub username: String,
}

impl PassengerFact {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name).trim().to_string()
    }
}

/// Flight projection served by the directory.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FlightFact {
    pub flight_number: String,
    pub departure_airport_code: String,
    pub arrival_airport_code: String,
    pub departure_date_time: DateTime<Utc>,
    pub arrival_date_time: DateTime<Utc>,
}

/// Ticket payload. Derived on demand and never persisted.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Ticket {
    pub flight_number: String,
    pub booking_code: String,
    pub passenger_first_name: String,
    pub passenger_last_name: String,
    pub seat_number: String,
    pub departure_airport_code: String,
    pub arrival_airport_code: String,
    pub departure_date_time: DateTime<Utc>,
    pub arrival_date_time: DateTime<Utc>,
}

impl Ticket {
    pub fn assemble(
        reservation: &Reservation,
        booking_code: &str,
        passenger: &PassengerFact,
        flight: &FlightFact,
    ) -> Self {
        Self {
            flight_number: reservation.flight_number.clone(),
            booking_code: booking_code.to_string(),
            passenger_first_name: passenger.first_name.clone(),
            passenger_last_name: passenger.last_name.clone(),
            seat_number: reservation.seat_number.clone(),
            departure_airport_code: flight.departure_airport_code.clone(),
            arrival_airport_code: flight.arrival_airport_code.clone(),
            departure_date_time: flight.departure_date_time,
            arrival_date_time: flight.arrival_date_time,
        }
    }
}

/// Payment view joined with the passenger's name (GET /payment/detail/{id}).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PaymentDetail {
    pub payment_id: PaymentId,
    pub reservation_id: ReservationId,
    pub flight_number: String,
    pub passenger_first_name: String,
    pub passenger_last_name: String,
    pub seat_number: String,
    pub price: f64,
    pub payment_status: bool,
    pub payment_method: Option<String>,
    pub payment_code: String,
}

impl PaymentDetail {
    pub fn assemble(reservation: &Reservation, payment: &Payment, passenger: &PassengerFact) -> Self {
        Self {
            payment_id: payment.id,
            reservation_id: reservation.id,
            flight_number: reservation.flight_number.clone(),
            passenger_first_name: passenger.first_name.clone(),
            passenger_last_name: passenger.last_name.clone(),
            seat_number: reservation.seat_number.clone(),
            price: payment.amount,
            payment_status: payment.paid,
            payment_method: payment.method.clone(),
            payment_code: payment.payment_code.clone(),
        }
    }
}

fn default_paid() -> bool {
    true
}

/// Inbound payment confirmation (POST /payment/pay)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentConfirmationRequest {
    pub payment_code: String,
    #[serde(default = "default_paid")]
    pub paid: bool,
    #[serde(default)]
    pub payment_method: Option<String>,
}

impl PaymentConfirmationRequest {
    pub const DEFAULT_METHOD: &'static str = "BANK_TRANSFER";

    pub fn validate(&self) -> CoreResult<()> {
        let code = self.payment_code.trim();
        if code.is_empty() || !code.chars().all(|c| c.is_ascii_digit()) {
            return Err(CoreError::ValidationError("payment_code must be a numeric token".into()));
        }
        if let Some(method) = &self.payment_method {
            if method.trim().is_empty() {
                return Err(CoreError::ValidationError("payment_method must not be blank".into()));
            }
        }
        Ok(())
    }

    pub fn method(&self) -> String {
        self.payment_method
            .as_deref()
            .map(|m| m.trim().to_uppercase())
            .unwrap_or_else(|| Self::DEFAULT_METHOD.to_string())
    }
}

/// Result of writing a settlement to the store.
#[derive(Debug, Clone, PartialEq)]
pub enum SettlementOutcome {
    /// This call flipped `paid` and attached the booking code.
    Settled { payment: Payment, reservation: Reservation },
    /// The payment was already paid; nothing was written.
    AlreadySettled { payment: Payment, reservation: Reservation },
}

impl SettlementOutcome {
    pub fn reservation(&self) -> &Reservation {
        match self {
            SettlementOutcome::Settled { reservation, .. } => reservation,
            SettlementOutcome::AlreadySettled { reservation, .. } => reservation,
        }
    }

    pub fn payment(&self) -> &Payment {
        match self {
            SettlementOutcome::Settled { payment, .. } => payment,
            SettlementOutcome::AlreadySettled { payment, .. } => payment,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request() -> BookingRequest {
        BookingRequest {
            flight_number: "GA123".to_string(),
            passenger_id: 42,
            seat_number: "12A".to_string(),
            price: 150.0,
        }
    }

    #[test]
    fn test_valid_booking_request() {
        assert!(request().validate().is_ok());
    }

    #[test]
    fn test_booking_request_rejections() {
        let mut r = request();
        r.flight_number = "  ".into();
        assert!(matches!(r.validate(), Err(CoreError::ValidationError(_))));

        let mut r = request();
        r.passenger_id = 0;
        assert!(matches!(r.validate(), Err(CoreError::ValidationError(_))));

        let mut r = request();
        r.seat_number = "12-A".into();
        assert!(matches!(r.validate(), Err(CoreError::ValidationError(_))));

        let mut r = request();
        r.price = f64::NAN;
        assert!(matches!(r.validate(), Err(CoreError::ValidationError(_))));

        let mut r = request();
        r.price = -1.0;
        assert!(matches!(r.validate(), Err(CoreError::ValidationError(_))));
    }

    #[test]
    fn test_new_reservation_is_normalised() {
        let mut r = request();
        r.flight_number = " ga123 ".into();
        r.seat_number = "12a".into();
        let row = r.into_new_reservation("1234567890123456".into());
        assert_eq!(row.flight_number, "GA123");
        assert_eq!(row.seat_number, "12A");
        assert_eq!(row.payment_code, "1234567890123456");
    }

    #[test]
    fn test_passenger_fact_reads_directory_payload() {
        let body = serde_json::json!({
            "passenger_id": 42,
            "first_name": "Ayu",
            "last_name": "Lestari",
            "email": "ayu@example.com",
            "ktp": "3174012309880001",
            "phone_number": "08123456789",
            "username": "ayul"
        });
        let fact: PassengerFact = serde_json::from_value(body).unwrap();
        assert_eq!(fact.full_name(), "Ayu Lestari");
        assert_eq!(fact.national_id.expose(), "3174012309880001");
        assert!(!format!("{:?}", fact).contains("3174012309880001"));
    }

    #[test]
    fn test_confirmation_request_defaults() {
        let req: PaymentConfirmationRequest =
            serde_json::from_value(serde_json::json!({"payment_code": "1234567890"})).unwrap();
        assert!(req.paid);
        assert_eq!(req.method(), "BANK_TRANSFER");
        assert!(req.validate().is_ok());

        let bad = PaymentConfirmationRequest {
            payment_code: "12AB".into(),
            paid: true,
            payment_method: None,
        };
        assert!(matches!(bad.validate(), Err(CoreError::ValidationError(_))));
    }
}
