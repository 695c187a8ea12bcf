//! Booking persistence operations.
//!
//! All functions take a `&PgPool` and operate on the `bookings` table.
//! The status column stores the canonical SCREAMING_SNAKE string; the
//! booking kind and transition log are JSONB.

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use siaga_core::{AmbulanceId, BookingId, DriverId, Money, UserId};
use siaga_state::{Booking, BookingKind, BookingStatus, TransitionRecord};

fn money_as_i64(m: Money, field: &str) -> Result<i64, sqlx::Error> {
    i64::try_from(m.minor())
        .map_err(|_| sqlx::Error::Protocol(format!("{field} exceeds BIGINT range")))
}

fn to_json<T: serde::Serialize>(value: &T, field: &str) -> Result<serde_json::Value, sqlx::Error> {
    serde_json::to_value(value)
        .map_err(|e| sqlx::Error::Protocol(format!("failed to serialize {field}: {e}")))
}

/// Insert a new booking record.
pub async fn insert(pool: &PgPool, booking: &Booking) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT INTO bookings (id, code, user_id, kind, status, driver_id, ambulance_id,
             base_price, distance_price, total_amount,
             is_downpayment_paid, is_fully_paid,
             dp_payment_deadline, final_payment_deadline,
             requested_at, dispatched_at, arrived_at, completed_at, cancelled_at, updated_at,
             transition_log)
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14,
             $15, $16, $17, $18, $19, $20, $21)",
    )
    .bind(booking.id.as_uuid())
    .bind(&booking.code)
    .bind(booking.user_id.as_uuid())
    .bind(to_json(&booking.kind, "booking kind")?)
    .bind(booking.status.as_str())
    .bind(booking.driver_id.as_ref().map(DriverId::as_uuid))
    .bind(booking.ambulance_id.as_ref().map(AmbulanceId::as_uuid))
    .bind(money_as_i64(booking.base_price, "base_price")?)
    .bind(money_as_i64(booking.distance_price, "distance_price")?)
    .bind(money_as_i64(booking.total_amount, "total_amount")?)
    .bind(booking.is_downpayment_paid)
    .bind(booking.is_fully_paid)
    .bind(booking.dp_payment_deadline)
    .bind(booking.final_payment_deadline)
    .bind(booking.requested_at)
    .bind(booking.dispatched_at)
    .bind(booking.arrived_at)
    .bind(booking.completed_at)
    .bind(booking.cancelled_at)
    .bind(booking.updated_at)
    .bind(to_json(&booking.transition_log, "transition_log")?)
    .execute(pool)
    .await?;

    Ok(())
}

/// Conditionally persist a status transition: the row is updated only if
/// its status still matches `from`. Returns whether a row was updated —
/// `false` means another process already transitioned the booking and
/// the caller should treat the conflict as benign.
pub async fn update_status_cas(
    pool: &PgPool,
    from: BookingStatus,
    booking: &Booking,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        "UPDATE bookings
         SET status = $1, dispatched_at = $2, arrived_at = $3, completed_at = $4,
             cancelled_at = $5, updated_at = $6, transition_log = $7
         WHERE id = $8 AND status = $9",
    )
    .bind(booking.status.as_str())
    .bind(booking.dispatched_at)
    .bind(booking.arrived_at)
    .bind(booking.completed_at)
    .bind(booking.cancelled_at)
    .bind(booking.updated_at)
    .bind(to_json(&booking.transition_log, "transition_log")?)
    .bind(booking.id.as_uuid())
    .bind(from.as_str())
    .execute(pool)
    .await?;

    Ok(result.rows_affected() > 0)
}

/// Persist the payment flags and deadlines after a payment cleared.
pub async fn update_payment_flags(pool: &PgPool, booking: &Booking) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        "UPDATE bookings
         SET is_downpayment_paid = $1, is_fully_paid = $2,
             dp_payment_deadline = $3, final_payment_deadline = $4, updated_at = $5
         WHERE id = $6",
    )
    .bind(booking.is_downpayment_paid)
    .bind(booking.is_fully_paid)
    .bind(booking.dp_payment_deadline)
    .bind(booking.final_payment_deadline)
    .bind(booking.updated_at)
    .bind(booking.id.as_uuid())
    .execute(pool)
    .await?;

    Ok(result.rows_affected() > 0)
}

/// Load all bookings. Undecodable rows are logged and skipped.
pub async fn load_all(pool: &PgPool) -> Result<Vec<Booking>, sqlx::Error> {
    let rows = sqlx::query_as::<_, BookingRow>(
        "SELECT id, code, user_id, kind, status, driver_id, ambulance_id,
             base_price, distance_price, total_amount,
             is_downpayment_paid, is_fully_paid,
             dp_payment_deadline, final_payment_deadline,
             requested_at, dispatched_at, arrived_at, completed_at, cancelled_at, updated_at,
             transition_log
         FROM bookings ORDER BY requested_at",
    )
    .fetch_all(pool)
    .await?;

    Ok(rows.into_iter().filter_map(BookingRow::into_booking).collect())
}

/// Internal row type for SQLx mapping.
#[derive(sqlx::FromRow)]
struct BookingRow {
    id: Uuid,
    code: String,
    user_id: Uuid,
    kind: serde_json::Value,
    status: String,
    driver_id: Option<Uuid>,
    ambulance_id: Option<Uuid>,
    base_price: i64,
    distance_price: i64,
    total_amount: i64,
    is_downpayment_paid: bool,
    is_fully_paid: bool,
    dp_payment_deadline: Option<DateTime<Utc>>,
    final_payment_deadline: Option<DateTime<Utc>>,
    requested_at: DateTime<Utc>,
    dispatched_at: Option<DateTime<Utc>>,
    arrived_at: Option<DateTime<Utc>>,
    completed_at: Option<DateTime<Utc>>,
    cancelled_at: Option<DateTime<Utc>>,
    updated_at: DateTime<Utc>,
    transition_log: serde_json::Value,
}

impl BookingRow {
    fn into_booking(self) -> Option<Booking> {
        let status: BookingStatus =
            match serde_json::from_value(serde_json::Value::String(self.status.clone())) {
                Ok(s) => s,
                Err(e) => {
                    tracing::warn!(
                        id = %self.id,
                        status = %self.status,
                        error = %e,
                        "unknown booking status in database, skipping row"
                    );
                    return None;
                }
            };

        let kind: BookingKind = match serde_json::from_value(self.kind) {
            Ok(k) => k,
            Err(e) => {
                tracing::warn!(id = %self.id, error = %e, "undecodable booking kind, skipping row");
                return None;
            }
        };

        let transition_log: Vec<TransitionRecord> = serde_json::from_value(self.transition_log)
            .unwrap_or_else(|e| {
                tracing::warn!(
                    id = %self.id,
                    error = %e,
                    "failed to deserialize booking transition_log, defaulting to empty"
                );
                Vec::new()
            });

        let as_money = |v: i64, field: &str| -> Option<Money> {
            match u64::try_from(v) {
                Ok(units) => Some(Money::from_minor(units)),
                Err(_) => {
                    tracing::warn!(id = %self.id, field, value = v, "negative amount, skipping row");
                    None
                }
            }
        };

        Some(Booking {
            id: BookingId::from_uuid(self.id),
            code: self.code,
            user_id: UserId::from_uuid(self.user_id),
            kind,
            status,
            driver_id: self.driver_id.map(DriverId::from_uuid),
            ambulance_id: self.ambulance_id.map(AmbulanceId::from_uuid),
            base_price: as_money(self.base_price, "base_price")?,
            distance_price: as_money(self.distance_price, "distance_price")?,
            total_amount: as_money(self.total_amount, "total_amount")?,
            is_downpayment_paid: self.is_downpayment_paid,
            is_fully_paid: self.is_fully_paid,
            dp_payment_deadline: self.dp_payment_deadline,
            final_payment_deadline: self.final_payment_deadline,
            requested_at: self.requested_at,
            dispatched_at: self.dispatched_at,
            arrived_at: self.arrived_at,
            completed_at: self.completed_at,
            cancelled_at: self.cancelled_at,
            updated_at: self.updated_at,
            transition_log,
        })
    }
}
