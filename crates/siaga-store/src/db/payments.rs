//! Payment persistence operations.
//!
//! The expiry and settlement updates are conditional on the row still
//! being `PENDING` — `rows_affected == 0` means another process (a
//! concurrent sweep, or the gateway callback) won the race.

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use siaga_core::{BookingId, Money, PaymentId};
use siaga_state::{Payment, PaymentKind, PaymentStatus};

/// Insert a new payment attempt.
pub async fn insert(pool: &PgPool, payment: &Payment) -> Result<(), sqlx::Error> {
    let amount = i64::try_from(payment.amount.minor())
        .map_err(|_| sqlx::Error::Protocol("payment amount exceeds BIGINT range".to_string()))?;

    sqlx::query(
        "INSERT INTO payments (id, booking_id, kind, status, amount, expires_at,
             last_reminder_at, reminder_count, created_at, paid_at)
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)",
    )
    .bind(payment.id.as_uuid())
    .bind(payment.booking_id.as_uuid())
    .bind(payment.kind.as_str())
    .bind(payment.status.as_str())
    .bind(amount)
    .bind(payment.expires_at)
    .bind(payment.last_reminder_at)
    .bind(i64::from(payment.reminder_count))
    .bind(payment.created_at)
    .bind(payment.paid_at)
    .execute(pool)
    .await?;

    Ok(())
}

/// Expire a payment iff it is still pending. Returns whether this call won.
pub async fn expire_if_pending(pool: &PgPool, id: PaymentId) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        "UPDATE payments SET status = 'EXPIRED' WHERE id = $1 AND status = 'PENDING'",
    )
    .bind(id.as_uuid())
    .execute(pool)
    .await?;

    Ok(result.rows_affected() > 0)
}

/// Settle a payment iff it is still pending. Returns whether this call won.
pub async fn mark_paid_if_pending(
    pool: &PgPool,
    id: PaymentId,
    paid_at: DateTime<Utc>,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        "UPDATE payments SET status = 'PAID', paid_at = $1 WHERE id = $2 AND status = 'PENDING'",
    )
    .bind(paid_at)
    .bind(id.as_uuid())
    .execute(pool)
    .await?;

    Ok(result.rows_affected() > 0)
}

/// Persist a sent reminder (timestamp + counter).
pub async fn record_reminder(
    pool: &PgPool,
    id: PaymentId,
    last_reminder_at: DateTime<Utc>,
    reminder_count: u32,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        "UPDATE payments SET last_reminder_at = $1, reminder_count = $2 WHERE id = $3",
    )
    .bind(last_reminder_at)
    .bind(i64::from(reminder_count))
    .bind(id.as_uuid())
    .execute(pool)
    .await?;

    Ok(result.rows_affected() > 0)
}

/// Load all payments. Undecodable rows are logged and skipped.
pub async fn load_all(pool: &PgPool) -> Result<Vec<Payment>, sqlx::Error> {
    let rows = sqlx::query_as::<_, PaymentRow>(
        "SELECT id, booking_id, kind, status, amount, expires_at,
             last_reminder_at, reminder_count, created_at, paid_at
         FROM payments ORDER BY created_at",
    )
    .fetch_all(pool)
    .await?;

    Ok(rows.into_iter().filter_map(PaymentRow::into_payment).collect())
}

/// Internal row type for SQLx mapping.
#[derive(sqlx::FromRow)]
struct PaymentRow {
    id: Uuid,
    booking_id: Uuid,
    kind: String,
    status: String,
    amount: i64,
    expires_at: Option<DateTime<Utc>>,
    last_reminder_at: Option<DateTime<Utc>>,
    reminder_count: i64,
    created_at: DateTime<Utc>,
    paid_at: Option<DateTime<Utc>>,
}

impl PaymentRow {
    fn into_payment(self) -> Option<Payment> {
        let kind: PaymentKind =
            match serde_json::from_value(serde_json::Value::String(self.kind.clone())) {
                Ok(k) => k,
                Err(e) => {
                    tracing::warn!(id = %self.id, kind = %self.kind, error = %e,
                        "unknown payment kind in database, skipping row");
                    return None;
                }
            };
        let status: PaymentStatus =
            match serde_json::from_value(serde_json::Value::String(self.status.clone())) {
                Ok(s) => s,
                Err(e) => {
                    tracing::warn!(id = %self.id, status = %self.status, error = %e,
                        "unknown payment status in database, skipping row");
                    return None;
                }
            };
        let amount = match u64::try_from(self.amount) {
            Ok(units) => Money::from_minor(units),
            Err(_) => {
                tracing::warn!(id = %self.id, amount = self.amount,
                    "negative payment amount, skipping row");
                return None;
            }
        };

        Some(Payment {
            id: PaymentId::from_uuid(self.id),
            booking_id: BookingId::from_uuid(self.booking_id),
            kind,
            status,
            amount,
            expires_at: self.expires_at,
            last_reminder_at: self.last_reminder_at,
            reminder_count: u32::try_from(self.reminder_count).unwrap_or(0),
            created_at: self.created_at,
            paid_at: self.paid_at,
        })
    }
}
