//! Device domain methods on Repository

use serde_json::json;
use sqlx::PgConnection;

use super::{
    device_occupancy, is_foreign_key_violation, lock_device, snapshot, unique_violation, write_audit,
    Repository,
};
use crate::{
    error::{AppError, AppResult, InvalidTransition},
    models::{
        audit::{Actor, NewAuditEntry},
        device::{CreateDevice, Device, UpdateDevice},
        enums::{AuditAction, AuditResource, DeviceStatus},
    },
};

/// Device columns plus the number of the line currently inserted in it
const DEVICE_SELECT: &str = r#"
    SELECT d.imei1, d.imei2, d.model, d.notes, d.condition, d.status,
           l.numero AS line_numero, d.created_at, d.updated_at
    FROM devices d
    LEFT JOIN lines l ON l.linked_device_imei = d.imei1
"#;

/// Read a device (with its line) on an existing connection
pub(crate) async fn fetch_device(conn: &mut PgConnection, imei: &str) -> AppResult<Device> {
    sqlx::query_as::<_, Device>(&format!("{} WHERE d.imei1 = $1", DEVICE_SELECT))
        .bind(imei)
        .fetch_optional(&mut *conn)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Device {} not found", imei)))
}

impl Repository {
    /// List devices, optionally only those with a given status
    pub async fn devices_list(&self, status: Option<DeviceStatus>) -> AppResult<Vec<Device>> {
        let rows = match status {
            Some(status) => {
                sqlx::query_as::<_, Device>(&format!(
                    "{} WHERE d.status = $1 ORDER BY d.model, d.imei1",
                    DEVICE_SELECT
                ))
                .bind(status)
                .fetch_all(&self.pool)
                .await?
            }
            None => {
                sqlx::query_as::<_, Device>(&format!("{} ORDER BY d.model, d.imei1", DEVICE_SELECT))
                    .fetch_all(&self.pool)
                    .await?
            }
        };
        Ok(rows)
    }

    /// Devices that can be sent to maintenance right now
    pub async fn devices_eligible_for_maintenance(&self) -> AppResult<Vec<Device>> {
        self.devices_list(Some(DeviceStatus::Available)).await
    }

    /// Get device by IMEI
    pub async fn devices_get(&self, imei: &str) -> AppResult<Device> {
        let mut conn = self.pool.acquire().await?;
        fetch_device(&mut conn, imei).await
    }

    /// Whether a device exists
    pub async fn devices_exists(&self, imei: &str) -> AppResult<bool> {
        let exists: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM devices WHERE imei1 = $1)")
            .bind(imei)
            .fetch_one(&self.pool)
            .await?;
        Ok(exists)
    }

    /// Create device; new devices are always available
    pub async fn devices_create(&self, data: &CreateDevice, actor: &Actor) -> AppResult<Device> {
        let imei = data.imei1.trim();
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO devices (imei1, imei2, model, notes, condition, status)
            VALUES ($1, $2, $3, $4, $5, 'available')
            "#,
        )
        .bind(imei)
        .bind(&data.imei2)
        .bind(&data.model)
        .bind(&data.notes)
        .bind(data.condition.unwrap_or_default())
        .execute(&mut *tx)
        .await
        .map_err(|e| match unique_violation(&e) {
            Some(_) => AppError::Duplicate(format!("Device {} already exists", imei)),
            None => e.into(),
        })?;

        let device = fetch_device(&mut tx, imei).await?;

        write_audit(
            &mut tx,
            NewAuditEntry::new(actor, AuditAction::Create, AuditResource::Device, imei, snapshot(&device)?),
        )
        .await?;

        tx.commit().await?;
        Ok(device)
    }

    /// Update device master data.
    ///
    /// The condition of a device out for repair belongs to its maintenance
    /// order and cannot be edited here.
    pub async fn devices_update(&self, imei: &str, data: &UpdateDevice, actor: &Actor) -> AppResult<Device> {
        let mut tx = self.pool.begin().await?;

        lock_device(&mut tx, imei).await?;

        if data.condition.is_some() {
            if let Some(order_id) = device_occupancy(&mut tx, imei).await?.open_order_id {
                return Err(InvalidTransition::OpenMaintenanceExists { order_id }.into());
            }
        }

        let mut sets = vec!["updated_at = NOW()".to_string()];
        let mut idx = 2;

        macro_rules! add_field {
            ($field:expr, $name:expr) => {
                if $field.is_some() {
                    sets.push(format!("{} = ${}", $name, idx));
                    idx += 1;
                }
            };
        }

        add_field!(data.imei2, "imei2");
        add_field!(data.model, "model");
        add_field!(data.notes, "notes");
        add_field!(data.condition, "condition");

        let query = format!("UPDATE devices SET {} WHERE imei1 = $1", sets.join(", "));
        let mut builder = sqlx::query(&query).bind(imei);

        macro_rules! bind_field {
            ($field:expr) => {
                if let Some(ref val) = $field {
                    builder = builder.bind(val);
                }
            };
        }

        bind_field!(data.imei2);
        bind_field!(data.model);
        bind_field!(data.notes);
        bind_field!(data.condition);

        builder.execute(&mut *tx).await?;

        let device = fetch_device(&mut tx, imei).await?;

        write_audit(
            &mut tx,
            NewAuditEntry::new(
                actor,
                AuditAction::Update,
                AuditResource::Device,
                imei,
                json!({
                    "imei2": data.imei2,
                    "model": data.model,
                    "notes": data.notes,
                    "condition": data.condition,
                }),
            ),
        )
        .await?;

        tx.commit().await?;
        Ok(device)
    }

    /// Delete a device with no open aggregates, no line and no history
    pub async fn devices_delete(&self, imei: &str, actor: &Actor) -> AppResult<()> {
        let mut tx = self.pool.begin().await?;

        lock_device(&mut tx, imei).await?;
        let device = fetch_device(&mut tx, imei).await?;

        let occupancy = device_occupancy(&mut tx, imei).await?;
        if let Some(open) = occupancy.open_custody {
            return Err(InvalidTransition::OpenCustodyExists { record_id: open.id }.into());
        }
        if let Some(order_id) = occupancy.open_order_id {
            return Err(InvalidTransition::OpenMaintenanceExists { order_id }.into());
        }
        if let Some(numero) = device.line_numero.clone() {
            return Err(InvalidTransition::LineLinked {
                numero,
                device_imei: imei.to_string(),
            }
            .into());
        }

        sqlx::query("DELETE FROM devices WHERE imei1 = $1")
            .bind(imei)
            .execute(&mut *tx)
            .await
            .map_err(|e| {
                if is_foreign_key_violation(&e) {
                    InvalidTransition::HistoryExists {
                        resource: "Device",
                        id: imei.to_string(),
                    }
                    .into()
                } else {
                    AppError::from(e)
                }
            })?;

        write_audit(
            &mut tx,
            NewAuditEntry::new(actor, AuditAction::Delete, AuditResource::Device, imei, snapshot(&device)?),
        )
        .await?;

        tx.commit().await?;
        Ok(())
    }
}
