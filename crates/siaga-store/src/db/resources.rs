//! Driver and ambulance persistence operations.
//!
//! Resource release is conditional on the current status, mirroring the
//! in-memory rule: only `ON_DUTY` flips to `AVAILABLE`, and a repeat
//! release affects zero rows.

use sqlx::PgPool;
use uuid::Uuid;

use siaga_core::{AmbulanceId, DriverId};
use siaga_state::{Ambulance, Driver, ResourceStatus};

/// Insert a driver.
pub async fn insert_driver(pool: &PgPool, driver: &Driver) -> Result<(), sqlx::Error> {
    sqlx::query("INSERT INTO drivers (id, name, status) VALUES ($1, $2, $3)")
        .bind(driver.id.as_uuid())
        .bind(&driver.name)
        .bind(driver.status.as_str())
        .execute(pool)
        .await?;
    Ok(())
}

/// Insert an ambulance.
pub async fn insert_ambulance(pool: &PgPool, ambulance: &Ambulance) -> Result<(), sqlx::Error> {
    sqlx::query("INSERT INTO ambulances (id, plate_number, status) VALUES ($1, $2, $3)")
        .bind(ambulance.id.as_uuid())
        .bind(&ambulance.plate_number)
        .bind(ambulance.status.as_str())
        .execute(pool)
        .await?;
    Ok(())
}

/// Conditionally update a driver's status. Returns whether a row changed.
pub async fn set_driver_status_if(
    pool: &PgPool,
    id: DriverId,
    from: ResourceStatus,
    to: ResourceStatus,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("UPDATE drivers SET status = $1 WHERE id = $2 AND status = $3")
        .bind(to.as_str())
        .bind(id.as_uuid())
        .bind(from.as_str())
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}

/// Conditionally update an ambulance's status. Returns whether a row changed.
pub async fn set_ambulance_status_if(
    pool: &PgPool,
    id: AmbulanceId,
    from: ResourceStatus,
    to: ResourceStatus,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("UPDATE ambulances SET status = $1 WHERE id = $2 AND status = $3")
        .bind(to.as_str())
        .bind(id.as_uuid())
        .bind(from.as_str())
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}

/// Load all drivers. Undecodable rows are logged and skipped.
pub async fn load_all_drivers(pool: &PgPool) -> Result<Vec<Driver>, sqlx::Error> {
    let rows = sqlx::query_as::<_, DriverRow>("SELECT id, name, status FROM drivers")
        .fetch_all(pool)
        .await?;
    Ok(rows.into_iter().filter_map(DriverRow::into_driver).collect())
}

/// Load all ambulances. Undecodable rows are logged and skipped.
pub async fn load_all_ambulances(pool: &PgPool) -> Result<Vec<Ambulance>, sqlx::Error> {
    let rows =
        sqlx::query_as::<_, AmbulanceRow>("SELECT id, plate_number, status FROM ambulances")
            .fetch_all(pool)
            .await?;
    Ok(rows
        .into_iter()
        .filter_map(AmbulanceRow::into_ambulance)
        .collect())
}

fn parse_status(id: Uuid, raw: &str) -> Option<ResourceStatus> {
    match serde_json::from_value(serde_json::Value::String(raw.to_string())) {
        Ok(s) => Some(s),
        Err(e) => {
            tracing::warn!(id = %id, status = %raw, error = %e,
                "unknown resource status in database, skipping row");
            None
        }
    }
}

#[derive(sqlx::FromRow)]
struct DriverRow {
    id: Uuid,
    name: String,
    status: String,
}

impl DriverRow {
    fn into_driver(self) -> Option<Driver> {
        Some(Driver {
            id: DriverId::from_uuid(self.id),
            name: self.name,
            status: parse_status(self.id, &self.status)?,
        })
    }
}

#[derive(sqlx::FromRow)]
struct AmbulanceRow {
    id: Uuid,
    plate_number: String,
    status: String,
}

impl AmbulanceRow {
    fn into_ambulance(self) -> Option<Ambulance> {
        Some(Ambulance {
            id: AmbulanceId::from_uuid(self.id),
            plate_number: self.plate_number,
            status: parse_status(self.id, &self.status)?,
        })
    }
}
