use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use std::time::Duration;
use tracing::debug;

use seatline_core::models::{
    InstanceKey, NewReservation, Payment, PaymentId, Reservation, ReservationId, SettlementOutcome,
};
use seatline_core::repository::ReservationStore;
use seatline_core::{CoreError, CoreResult};

const RESERVATION_COLUMNS: &str =
    "id, flight_number, passenger_id, seat_number, price, booking_code, instance_key, created_at";
const PAYMENT_COLUMNS: &str = "id, reservation_id, amount, method, payment_code, paid, created_at";

pub struct PgReservationStore {
    pool: PgPool,
}

impl PgReservationStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn reservation_where(&self, clause: &str, value: ReservationId) -> CoreResult<Option<Reservation>> {
        let sql = format!("SELECT {} FROM reservations WHERE {} = $1", RESERVATION_COLUMNS, clause);
        let row = sqlx::query_as::<_, ReservationRow>(&sql)
            .bind(value)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_error)?;
        Ok(row.map(Into::into))
    }

    async fn payment_where(&self, clause: &str, value: i64) -> CoreResult<Option<Payment>> {
        let sql = format!("SELECT {} FROM payments WHERE {} = $1", PAYMENT_COLUMNS, clause);
        let row = sqlx::query_as::<_, PaymentRow>(&sql)
            .bind(value)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_error)?;
        Ok(row.map(Into::into))
    }
}

#[derive(sqlx::FromRow)]
struct ReservationRow {
    id: i64,
    flight_number: String,
    passenger_id: i64,
    seat_number: String,
    price: f64,
    booking_code: Option<String>,
    instance_key: Option<i64>,
    created_at: DateTime<Utc>,
}

impl From<ReservationRow> for Reservation {
    fn from(row: ReservationRow) -> Self {
        Reservation {
            id: row.id,
            flight_number: row.flight_number,
            passenger_id: row.passenger_id,
            seat_number: row.seat_number,
            price: row.price,
            booking_code: row.booking_code,
            instance_key: row.instance_key,
            created_at: row.created_at,
        }
    }
}

#[derive(sqlx::FromRow)]
struct PaymentRow {
    id: i64,
    reservation_id: i64,
    amount: f64,
    method: Option<String>,
    payment_code: String,
    paid: bool,
    created_at: DateTime<Utc>,
}

impl From<PaymentRow> for Payment {
    fn from(row: PaymentRow) -> Self {
        Payment {
            id: row.id,
            reservation_id: row.reservation_id,
            amount: row.amount,
            method: row.method,
            payment_code: row.payment_code,
            paid: row.paid,
            created_at: row.created_at,
        }
    }
}

/// Unique violations become `ConflictError`; everything else is a store failure.
fn db_error(e: sqlx::Error) -> CoreError {
    if let sqlx::Error::Database(db) = &e {
        if db.is_unique_violation() {
            return CoreError::ConflictError(db.message().to_string());
        }
    }
    CoreError::PersistenceError(e.to_string())
}

#[async_trait]
impl ReservationStore for PgReservationStore {
    async fn create_reservation(&self, new: &NewReservation) -> CoreResult<(Reservation, Payment)> {
        let mut tx = self.pool.begin().await.map_err(db_error)?;

        let reservation: ReservationRow = sqlx::query_as(&format!(
            "INSERT INTO reservations (flight_number, passenger_id, seat_number, price) \
             VALUES ($1, $2, $3, $4) RETURNING {}",
            RESERVATION_COLUMNS
        ))
        .bind(&new.flight_number)
        .bind(new.passenger_id)
        .bind(&new.seat_number)
        .bind(new.price)
        .fetch_one(&mut *tx)
        .await
        .map_err(db_error)?;

        let payment: PaymentRow = sqlx::query_as(&format!(
            "INSERT INTO payments (reservation_id, amount, payment_code) VALUES ($1, $2, $3) RETURNING {}",
            PAYMENT_COLUMNS
        ))
        .bind(reservation.id)
        .bind(new.price)
        .bind(&new.payment_code)
        .fetch_one(&mut *tx)
        .await
        .map_err(db_error)?;

        tx.commit().await.map_err(db_error)?;
        debug!(reservation_id = reservation.id, payment_id = payment.id, "Reservation rows committed");
        Ok((reservation.into(), payment.into()))
    }

    async fn get_reservation(&self, id: ReservationId) -> CoreResult<Option<Reservation>> {
        self.reservation_where("id", id).await
    }

    async fn get_reservation_by_booking_code(&self, booking_code: &str) -> CoreResult<Option<Reservation>> {
        let row = sqlx::query_as::<_, ReservationRow>(&format!(
            "SELECT {} FROM reservations WHERE booking_code = $1",
            RESERVATION_COLUMNS
        ))
        .bind(booking_code)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error)?;
        Ok(row.map(Into::into))
    }

    async fn list_reservations(&self) -> CoreResult<Vec<Reservation>> {
        let rows = sqlx::query_as::<_, ReservationRow>(&format!(
            "SELECT {} FROM reservations ORDER BY id",
            RESERVATION_COLUMNS
        ))
        .fetch_all(&self.pool)
        .await
        .map_err(db_error)?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn claim_instance_start(&self, id: ReservationId, lease: Duration) -> CoreResult<bool> {
        // Check and claim in one statement.
        let claimed: Option<(i64,)> = sqlx::query_as(
            "UPDATE reservations \
             SET instance_claimed_until = NOW() + make_interval(secs => $2) \
             WHERE id = $1 AND instance_key IS NULL \
               AND (instance_claimed_until IS NULL OR instance_claimed_until <= NOW()) \
             RETURNING id",
        )
        .bind(id)
        .bind(lease.as_secs_f64())
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error)?;

        if claimed.is_some() {
            return Ok(true);
        }
        match self.get_reservation(id).await? {
            Some(_) => Ok(false),
            None => Err(CoreError::ReservationNotFound(id.to_string())),
        }
    }

    async fn release_instance_claim(&self, id: ReservationId) -> CoreResult<()> {
        sqlx::query("UPDATE reservations SET instance_claimed_until = NULL WHERE id = $1 AND instance_key IS NULL")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(db_error)?;
        Ok(())
    }

    async fn set_instance_key(&self, id: ReservationId, key: InstanceKey) -> CoreResult<Reservation> {
        let updated = sqlx::query_as::<_, ReservationRow>(&format!(
            "UPDATE reservations SET instance_key = $2, instance_claimed_until = NULL \
             WHERE id = $1 AND instance_key IS NULL RETURNING {}",
            RESERVATION_COLUMNS
        ))
        .bind(id)
        .bind(key)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error)?;

        match updated {
            Some(row) => Ok(row.into()),
            None => match self.get_reservation(id).await? {
                Some(existing) => Err(CoreError::ConflictError(format!(
                    "reservation {} already bound to process instance {}",
                    id,
                    existing.instance_key.unwrap_or_default()
                ))),
                None => Err(CoreError::ReservationNotFound(id.to_string())),
            },
        }
    }

    async fn get_payment(&self, id: PaymentId) -> CoreResult<Option<Payment>> {
        self.payment_where("id", id).await
    }

    async fn get_payment_by_reservation(&self, reservation_id: ReservationId) -> CoreResult<Option<Payment>> {
        self.payment_where("reservation_id", reservation_id).await
    }

    async fn get_payment_by_code(&self, payment_code: &str) -> CoreResult<Option<Payment>> {
        let row = sqlx::query_as::<_, PaymentRow>(&format!(
            "SELECT {} FROM payments WHERE payment_code = $1",
            PAYMENT_COLUMNS
        ))
        .bind(payment_code)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error)?;
        Ok(row.map(Into::into))
    }

    async fn settle_payment(
        &self,
        payment_code: &str,
        method: &str,
        booking_code: &str,
    ) -> CoreResult<SettlementOutcome> {
        let mut tx = self.pool.begin().await.map_err(db_error)?;

        // Concurrent confirmations for the same code queue up on this lock.
        let payment: PaymentRow = sqlx::query_as(&format!(
            "SELECT {} FROM payments WHERE payment_code = $1 FOR UPDATE",
            PAYMENT_COLUMNS
        ))
        .bind(payment_code)
        .fetch_optional(&mut *tx)
        .await
        .map_err(db_error)?
        .ok_or_else(|| CoreError::PaymentNotFound(format!("payment code {}", payment_code)))?;

        let reservation: ReservationRow = sqlx::query_as(&format!(
            "SELECT {} FROM reservations WHERE id = $1 FOR UPDATE",
            RESERVATION_COLUMNS
        ))
        .bind(payment.reservation_id)
        .fetch_optional(&mut *tx)
        .await
        .map_err(db_error)?
        .ok_or_else(|| CoreError::ReservationNotFound(payment.reservation_id.to_string()))?;

        if payment.paid {
            tx.rollback().await.map_err(db_error)?;
            return Ok(SettlementOutcome::AlreadySettled {
                payment: payment.into(),
                reservation: reservation.into(),
            });
        }
        if reservation.booking_code.is_some() {
            return Err(CoreError::PersistenceError(format!(
                "reservation {} holds a booking code but its payment is unpaid",
                reservation.id
            )));
        }

        let payment: PaymentRow = sqlx::query_as(&format!(
            "UPDATE payments SET paid = TRUE, method = $2 WHERE id = $1 AND paid = FALSE RETURNING {}",
            PAYMENT_COLUMNS
        ))
        .bind(payment.id)
        .bind(method)
        .fetch_one(&mut *tx)
        .await
        .map_err(db_error)?;

        let reservation: ReservationRow = sqlx::query_as(&format!(
            "UPDATE reservations SET booking_code = $2 WHERE id = $1 AND booking_code IS NULL RETURNING {}",
            RESERVATION_COLUMNS
        ))
        .bind(reservation.id)
        .bind(booking_code)
        .fetch_one(&mut *tx)
        .await
        .map_err(db_error)?;

        tx.commit().await.map_err(db_error)?;
        Ok(SettlementOutcome::Settled {
            payment: payment.into(),
            reservation: reservation.into(),
        })
    }
}
