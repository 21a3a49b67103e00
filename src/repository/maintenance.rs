//! Maintenance order domain methods on Repository

use serde_json::json;
use sqlx::PgConnection;

use super::{
    device_occupancy, lock_device, refresh_device_status, snapshot, unique_violation, write_audit,
    Repository, OPEN_MAINTENANCE_INDEX,
};
use crate::{
    error::{AppError, AppResult, Conflict, InvalidTransition},
    ledger,
    models::{
        audit::{Actor, NewAuditEntry},
        enums::{AuditAction, AuditResource, DeviceCondition},
        maintenance::{
            AmendMaintenanceRequest, CloseMaintenance, MaintenanceOrder, MaintenanceQuery,
            NewMaintenanceOrder,
        },
    },
};

/// Next order number for the year of `send_date`
async fn allocate_order_number(conn: &mut PgConnection, send_date: chrono::NaiveDate) -> AppResult<String> {
    let year = ledger::order_year(send_date);
    let sequence: i32 = sqlx::query_scalar(
        r#"
        INSERT INTO maintenance_order_counters (year, last_value) VALUES ($1, 1)
        ON CONFLICT (year) DO UPDATE SET last_value = maintenance_order_counters.last_value + 1
        RETURNING last_value
        "#,
    )
    .bind(year)
    .fetch_one(&mut *conn)
    .await?;

    Ok(ledger::format_order_number(year, sequence))
}

/// Lock the device of an order, then the order itself
async fn lock_order(conn: &mut PgConnection, id: i32) -> AppResult<MaintenanceOrder> {
    let not_found = || AppError::NotFound(format!("Maintenance order {} not found", id));

    let device_imei = sqlx::query_scalar::<_, String>("SELECT device_imei FROM maintenance_orders WHERE id = $1")
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?
        .ok_or_else(not_found)?;

    lock_device(&mut *conn, &device_imei).await?;

    sqlx::query_as::<_, MaintenanceOrder>("SELECT * FROM maintenance_orders WHERE id = $1 FOR UPDATE")
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?
        .ok_or_else(not_found)
}

impl Repository {
    /// List maintenance orders, newest first
    pub async fn maintenance_list(&self, query: &MaintenanceQuery) -> AppResult<Vec<MaintenanceOrder>> {
        let mut conditions = Vec::new();
        let mut idx = 1;

        if query.status.is_some() {
            conditions.push(format!("status = ${}", idx));
            idx += 1;
        }
        if query.device_imei.is_some() {
            conditions.push(format!("device_imei = ${}", idx));
        }

        let where_clause = if conditions.is_empty() {
            String::new()
        } else {
            format!("WHERE {}", conditions.join(" AND "))
        };

        let sql = format!(
            "SELECT * FROM maintenance_orders {} ORDER BY send_date DESC, id DESC",
            where_clause
        );

        let mut builder = sqlx::query_as::<_, MaintenanceOrder>(&sql);
        if let Some(status) = query.status {
            builder = builder.bind(status);
        }
        if let Some(ref imei) = query.device_imei {
            builder = builder.bind(imei);
        }

        let rows = builder.fetch_all(&self.pool).await?;
        Ok(rows)
    }

    /// Get maintenance order by ID
    pub async fn maintenance_get(&self, id: i32) -> AppResult<MaintenanceOrder> {
        sqlx::query_as::<_, MaintenanceOrder>("SELECT * FROM maintenance_orders WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Maintenance order {} not found", id)))
    }

    /// Send a free device out for repair
    pub async fn maintenance_send(&self, new: &NewMaintenanceOrder, actor: &Actor) -> AppResult<MaintenanceOrder> {
        let imei = new.device_imei.as_str();
        let mut tx = self.pool.begin().await?;

        let previous_condition = lock_device(&mut tx, imei).await?;
        let occupancy = device_occupancy(&mut tx, imei).await?;
        if let Err(conflict) = ledger::maintenance_guard(&occupancy) {
            tracing::warn!(device = %imei, %conflict, "Send to maintenance refused");
            return Err(conflict.into());
        }

        let order_number = allocate_order_number(&mut tx, new.send_date).await?;

        let inserted = sqlx::query_as::<_, MaintenanceOrder>(
            r#"
            INSERT INTO maintenance_orders (
                order_number, device_imei, send_date, reported_defect, supplier,
                previous_condition, status, opened_by
            )
            VALUES ($1, $2, $3, $4, $5, $6, 'in_repair', $7)
            RETURNING *
            "#,
        )
        .bind(&order_number)
        .bind(imei)
        .bind(new.send_date)
        .bind(&new.reported_defect)
        .bind(&new.supplier)
        .bind(previous_condition)
        .bind(&new.opened_by)
        .fetch_one(&mut *tx)
        .await;

        let order = match inserted {
            Ok(order) => order,
            Err(e) if unique_violation(&e) == Some(OPEN_MAINTENANCE_INDEX) => {
                drop(tx);
                let open_id = sqlx::query_scalar::<_, i32>(
                    "SELECT id FROM maintenance_orders WHERE device_imei = $1 AND status = 'in_repair'",
                )
                .bind(imei)
                .fetch_optional(&self.pool)
                .await?;
                return match open_id {
                    Some(conflicting_order_id) => {
                        tracing::warn!(device = %imei, conflicting_order_id, "Send to maintenance lost a race");
                        Err(Conflict::DeviceUnderMaintenance { conflicting_order_id }.into())
                    }
                    None => Err(e.into()),
                };
            }
            Err(e) => return Err(e.into()),
        };

        sqlx::query("UPDATE devices SET condition = $1, updated_at = NOW() WHERE imei1 = $2")
            .bind(DeviceCondition::InMaintenance)
            .bind(imei)
            .execute(&mut *tx)
            .await?;
        refresh_device_status(&mut tx, imei).await?;

        write_audit(
            &mut tx,
            NewAuditEntry::new(
                actor,
                AuditAction::SendToMaintenance,
                AuditResource::MaintenanceOrder,
                order.id,
                json!({
                    "order_number": order.order_number,
                    "device_imei": imei,
                    "previous_condition": previous_condition,
                    "reported_defect": order.reported_defect,
                }),
            ),
        )
        .await?;

        tx.commit().await?;

        tracing::info!(
            order_id = order.id,
            order_number = %order.order_number,
            device = %imei,
            "Device sent to maintenance"
        );
        Ok(order)
    }

    /// Close an open order and hand the device back with its new condition
    pub async fn maintenance_close(&self, id: i32, close: &CloseMaintenance, actor: &Actor) -> AppResult<MaintenanceOrder> {
        let mut tx = self.pool.begin().await?;

        let current = lock_order(&mut tx, id).await?;
        if !current.is_open() {
            return Err(InvalidTransition::OrderAlreadyClosed { order_id: id }.into());
        }
        ledger::ensure_not_before(current.send_date, close.return_date, "Return date")?;

        let order = sqlx::query_as::<_, MaintenanceOrder>(
            r#"
            UPDATE maintenance_orders SET
                status = $2,
                return_date = $3,
                service_performed = $4,
                cost = $5,
                post_condition = $6,
                closed_by = $7,
                updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(close.status)
        .bind(close.return_date)
        .bind(&close.service_performed)
        .bind(close.cost)
        .bind(close.post_condition)
        .bind(&close.closed_by)
        .fetch_one(&mut *tx)
        .await?;

        sqlx::query("UPDATE devices SET condition = $1, updated_at = NOW() WHERE imei1 = $2")
            .bind(close.post_condition)
            .bind(&order.device_imei)
            .execute(&mut *tx)
            .await?;
        let status = refresh_device_status(&mut tx, &order.device_imei).await?;

        write_audit(
            &mut tx,
            NewAuditEntry::new(
                actor,
                AuditAction::CloseMaintenance,
                AuditResource::MaintenanceOrder,
                id,
                json!({
                    "device_imei": order.device_imei,
                    "status": order.status,
                    "post_condition": close.post_condition,
                    "cost": order.cost,
                }),
            ),
        )
        .await?;

        tx.commit().await?;

        tracing::info!(
            order_id = id,
            device = %order.device_imei,
            outcome = ?order.status,
            ?status,
            "Maintenance order closed"
        );
        Ok(order)
    }

    /// Correct a closed order
    pub async fn maintenance_amend(
        &self,
        id: i32,
        amendment: &AmendMaintenanceRequest,
        actor: &Actor,
    ) -> AppResult<MaintenanceOrder> {
        let mut tx = self.pool.begin().await?;

        let before = lock_order(&mut tx, id).await?;
        if before.is_open() {
            return Err(InvalidTransition::OrderStillOpen { order_id: id }.into());
        }
        if let Some(return_date) = amendment.return_date {
            ledger::ensure_not_before(before.send_date, return_date, "Return date")?;
        }

        let order = sqlx::query_as::<_, MaintenanceOrder>(
            r#"
            UPDATE maintenance_orders SET
                return_date = COALESCE($2, return_date),
                service_performed = COALESCE($3, service_performed),
                cost = COALESCE($4, cost),
                supplier = COALESCE($5, supplier),
                updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(amendment.return_date)
        .bind(&amendment.service_performed)
        .bind(amendment.cost)
        .bind(&amendment.supplier)
        .fetch_one(&mut *tx)
        .await?;

        write_audit(
            &mut tx,
            NewAuditEntry::new(
                actor,
                AuditAction::AmendMaintenance,
                AuditResource::MaintenanceOrder,
                id,
                json!({
                    "before": {
                        "return_date": before.return_date,
                        "service_performed": before.service_performed,
                        "cost": before.cost,
                        "supplier": before.supplier,
                    },
                    "after": {
                        "return_date": order.return_date,
                        "service_performed": order.service_performed,
                        "cost": order.cost,
                        "supplier": order.supplier,
                    },
                }),
            ),
        )
        .await?;

        tx.commit().await?;

        tracing::info!(order_id = id, "Maintenance order amended");
        Ok(order)
    }

    /// Administrative hard delete.
    ///
    /// Deleting an open order hands the device back in the condition it had
    /// before it was sent; a closed order leaves the device untouched.
    pub async fn maintenance_delete(&self, id: i32, reason: Option<&str>, actor: &Actor) -> AppResult<()> {
        let mut tx = self.pool.begin().await?;

        let order = lock_order(&mut tx, id).await?;

        sqlx::query("DELETE FROM maintenance_orders WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        if order.is_open() {
            sqlx::query("UPDATE devices SET condition = $1, updated_at = NOW() WHERE imei1 = $2")
                .bind(order.previous_condition)
                .bind(&order.device_imei)
                .execute(&mut *tx)
                .await?;
        }
        let status = refresh_device_status(&mut tx, &order.device_imei).await?;

        write_audit(
            &mut tx,
            NewAuditEntry::new(
                actor,
                AuditAction::Delete,
                AuditResource::MaintenanceOrder,
                id,
                json!({ "reason": reason, "order": snapshot(&order)? }),
            ),
        )
        .await?;

        tx.commit().await?;

        tracing::warn!(
            order_id = id,
            order_number = %order.order_number,
            device = %order.device_imei,
            was_open = order.is_open(),
            ?status,
            actor = %actor.name,
            "Maintenance order deleted"
        );
        Ok(())
    }
}
