//! Repository layer for database operations
//!
//! Domain methods are spread over one file per aggregate, all implemented on
//! [`Repository`]. Mutations of the ledger run in a single transaction that
//! starts by locking the device row.

pub mod audit;
pub mod custody;
pub mod devices;
pub mod employees;
pub mod history;
pub mod lines;
pub mod maintenance;

use sqlx::{PgConnection, Pool, Postgres};

use crate::{
    error::{AppError, AppResult},
    ledger::{DeviceOccupancy, OpenCustody},
    models::{audit::NewAuditEntry, enums::DeviceCondition, enums::DeviceStatus},
};

/// Partial unique index allowing one open custody record per device
pub(crate) const OPEN_CUSTODY_INDEX: &str = "custody_records_one_open_per_device";
/// Partial unique index allowing one open maintenance order per device
pub(crate) const OPEN_MAINTENANCE_INDEX: &str = "maintenance_orders_one_open_per_device";

/// Main repository struct holding database connection pool
#[derive(Clone)]
pub struct Repository {
    pub pool: Pool<Postgres>,
}

impl Repository {
    /// Create a new repository with the given database pool
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// Round-trip to the database for the readiness check
    pub async fn ping(&self) -> AppResult<()> {
        sqlx::query_scalar::<_, i32>("SELECT 1")
            .fetch_one(&self.pool)
            .await?;
        Ok(())
    }
}

/// Lock a device row for the rest of the transaction and return its condition
pub(crate) async fn lock_device(conn: &mut PgConnection, imei: &str) -> AppResult<DeviceCondition> {
    sqlx::query_scalar::<_, DeviceCondition>(
        "SELECT condition FROM devices WHERE imei1 = $1 FOR UPDATE",
    )
    .bind(imei)
    .fetch_optional(&mut *conn)
    .await?
    .ok_or_else(|| AppError::NotFound(format!("Device {} not found", imei)))
}

/// Open custody record and open maintenance order of a device
pub(crate) async fn device_occupancy(conn: &mut PgConnection, imei: &str) -> AppResult<DeviceOccupancy> {
    let open_custody = sqlx::query_as::<_, OpenCustody>(
        r#"
        SELECT id, employee_matricula, delivery_date, created_at
        FROM custody_records
        WHERE device_imei = $1 AND return_date IS NULL
        "#,
    )
    .bind(imei)
    .fetch_optional(&mut *conn)
    .await?;

    let open_order_id = sqlx::query_scalar::<_, i32>(
        "SELECT id FROM maintenance_orders WHERE device_imei = $1 AND status = 'in_repair'",
    )
    .bind(imei)
    .fetch_optional(&mut *conn)
    .await?;

    Ok(DeviceOccupancy {
        open_custody,
        open_order_id,
    })
}

/// Recompute the stored status of a device from its open aggregates
pub(crate) async fn refresh_device_status(conn: &mut PgConnection, imei: &str) -> AppResult<DeviceStatus> {
    let status = device_occupancy(&mut *conn, imei).await?.status()?;

    sqlx::query("UPDATE devices SET status = $1, updated_at = NOW() WHERE imei1 = $2")
        .bind(status)
        .bind(imei)
        .execute(&mut *conn)
        .await?;

    Ok(status)
}

/// Append an audit entry in the caller's transaction
pub(crate) async fn write_audit(conn: &mut PgConnection, entry: NewAuditEntry<'_>) -> AppResult<()> {
    sqlx::query(
        r#"
        INSERT INTO audit_log (actor_id, actor_name, action, resource, target_id, details)
        VALUES ($1, $2, $3, $4, $5, $6)
        "#,
    )
    .bind(entry.actor.id)
    .bind(&entry.actor.name)
    .bind(entry.action)
    .bind(entry.resource)
    .bind(&entry.target_id)
    .bind(&entry.details)
    .execute(&mut *conn)
    .await?;
    Ok(())
}

/// Name of the constraint behind a unique violation, if that is what `err` is
pub(crate) fn unique_violation(err: &sqlx::Error) -> Option<&str> {
    match err {
        sqlx::Error::Database(db_err) if db_err.is_unique_violation() => db_err.constraint(),
        _ => None,
    }
}

/// Whether `err` is a foreign key violation
pub(crate) fn is_foreign_key_violation(err: &sqlx::Error) -> bool {
    matches!(err, sqlx::Error::Database(db_err) if db_err.is_foreign_key_violation())
}

/// Serialize a value for an audit payload
pub(crate) fn snapshot<T: serde::Serialize>(value: &T) -> AppResult<serde_json::Value> {
    serde_json::to_value(value).map_err(|e| AppError::Internal(format!("audit snapshot: {}", e)))
}
