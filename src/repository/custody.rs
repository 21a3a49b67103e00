//! Custody record domain methods on Repository

use chrono::{Duration, Utc};
use serde_json::json;
use sqlx::PgConnection;

use super::{
    is_foreign_key_violation, lock_device, refresh_device_status, snapshot, unique_violation, write_audit, Repository,
    OPEN_CUSTODY_INDEX,
};
use crate::{
    error::{AppError, AppResult, Conflict, InvalidTransition},
    ledger::{self, CheckOutDecision},
    models::{
        audit::{Actor, NewAuditEntry},
        custody::{
            order_by_clause, page_offset, AmendReturnRequest, CheckOutOutcome, CustodyRecord, CustodyRecordListing,
            CustodyRecordListingRow, CustodyRecordRow, NewCustodyRecord, NewReturn, RecordFilter,
            RecordSort, SortDirection, UpdateAttachments,
        },
        enums::{AuditAction, AuditResource},
    },
};

/// Record columns joined with employee name, device model and current line
pub(crate) const LISTING_SELECT: &str = r#"
    SELECT r.*, e.name AS employee_name, d.model AS device_model, l.numero AS device_line
    FROM custody_records r
    JOIN employees e ON e.matricula = r.employee_matricula
    JOIN devices d ON d.imei1 = r.device_imei
    LEFT JOIN lines l ON l.linked_device_imei = r.device_imei
"#;

async fn fetch_record(conn: &mut PgConnection, id: i32) -> AppResult<CustodyRecord> {
    sqlx::query_as::<_, CustodyRecordRow>("SELECT * FROM custody_records WHERE id = $1")
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?
        .map(CustodyRecord::from)
        .ok_or_else(|| AppError::NotFound(format!("Custody record {} not found", id)))
}

/// Lock the device of a record, then the record itself
async fn lock_record(conn: &mut PgConnection, id: i32) -> AppResult<CustodyRecordRow> {
    let not_found = || AppError::NotFound(format!("Custody record {} not found", id));

    let device_imei = sqlx::query_scalar::<_, String>("SELECT device_imei FROM custody_records WHERE id = $1")
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?
        .ok_or_else(not_found)?;

    lock_device(&mut *conn, &device_imei).await?;

    sqlx::query_as::<_, CustodyRecordRow>("SELECT * FROM custody_records WHERE id = $1 FOR UPDATE")
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?
        .ok_or_else(not_found)
}

impl Repository {
    /// Get a record with its display fields
    pub async fn custody_get(&self, id: i32) -> AppResult<CustodyRecordListing> {
        sqlx::query_as::<_, CustodyRecordListingRow>(&format!("{} WHERE r.id = $1", LISTING_SELECT))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .map(CustodyRecordListing::from)
            .ok_or_else(|| AppError::NotFound(format!("Custody record {} not found", id)))
    }

    /// Paginated, filtered and sorted record listing
    pub async fn custody_list(
        &self,
        filter: RecordFilter,
        employee: Option<&str>,
        sort: RecordSort,
        direction: SortDirection,
        page: i64,
        page_size: i64,
    ) -> AppResult<(Vec<CustodyRecordListing>, i64)> {
        let offset = page_offset(page, page_size)?;

        let mut conditions: Vec<String> = filter.condition().map(String::from).into_iter().collect();
        let mut idx = 1;
        if employee.is_some() {
            conditions.push(format!("r.employee_matricula = ${}", idx));
            idx += 1;
        }

        let where_clause = if conditions.is_empty() {
            String::new()
        } else {
            format!("WHERE {}", conditions.join(" AND "))
        };

        let count_sql = format!("SELECT COUNT(*) FROM custody_records r {}", where_clause);
        let mut count_builder = sqlx::query_scalar::<_, i64>(&count_sql);
        if let Some(matricula) = employee {
            count_builder = count_builder.bind(matricula);
        }
        let total = count_builder.fetch_one(&self.pool).await?;

        let query = format!(
            "{} {} {} LIMIT ${} OFFSET ${}",
            LISTING_SELECT,
            where_clause,
            order_by_clause(sort, direction),
            idx,
            idx + 1
        );

        let mut builder = sqlx::query_as::<_, CustodyRecordListingRow>(&query);
        if let Some(matricula) = employee {
            builder = builder.bind(matricula);
        }
        let rows = builder.bind(page_size).bind(offset).fetch_all(&self.pool).await?;

        Ok((rows.into_iter().map(CustodyRecordListing::from).collect(), total))
    }

    /// Id of the open custody record of a device, read outside any transaction
    pub async fn custody_open_record_id(&self, imei: &str) -> AppResult<Option<i32>> {
        let id = sqlx::query_scalar::<_, i32>(
            "SELECT id FROM custody_records WHERE device_imei = $1 AND return_date IS NULL",
        )
        .bind(imei)
        .fetch_optional(&self.pool)
        .await?;
        Ok(id)
    }

    /// Check a device out to an employee
    pub async fn custody_check_out(
        &self,
        new: &NewCustodyRecord,
        actor: &Actor,
        duplicate_window: Duration,
    ) -> AppResult<CheckOutOutcome> {
        let imei = new.device_imei.as_str();
        let mut tx = self.pool.begin().await?;

        lock_device(&mut tx, imei).await?;

        let employee_not_found = || AppError::NotFound(format!("Employee {} not found", new.employee_matricula));

        // Share lock: a concurrent employee delete waits for this check-out
        sqlx::query_scalar::<_, i32>("SELECT 1 FROM employees WHERE matricula = $1 FOR SHARE")
            .bind(&new.employee_matricula)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(employee_not_found)?;

        let occupancy = super::device_occupancy(&mut tx, imei).await?;
        match ledger::check_out_decision(
            &occupancy,
            &new.employee_matricula,
            new.delivery_date,
            Utc::now(),
            duplicate_window,
        ) {
            Ok(CheckOutDecision::Proceed) => {}
            Ok(CheckOutDecision::Existing(record_id)) => {
                let record = fetch_record(&mut tx, record_id).await?;
                tracing::info!(
                    record_id,
                    device = %imei,
                    employee = %new.employee_matricula,
                    "Duplicate check-out folded into existing record"
                );
                return Ok(CheckOutOutcome { record, created: false });
            }
            Err(conflict) => {
                tracing::warn!(device = %imei, employee = %new.employee_matricula, %conflict, "Check-out refused");
                return Err(conflict.into());
            }
        }

        let inserted = sqlx::query_as::<_, CustodyRecordRow>(
            r#"
            INSERT INTO custody_records (
                employee_matricula, device_imei, delivery_date, delivery_condition,
                delivery_notes, delivered_by, delivery_attachment_url, accessories
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING *
            "#,
        )
        .bind(&new.employee_matricula)
        .bind(imei)
        .bind(new.delivery_date)
        .bind(&new.delivery_condition)
        .bind(&new.delivery_notes)
        .bind(&new.delivered_by)
        .bind(&new.delivery_attachment_url)
        .bind(&new.accessories)
        .fetch_one(&mut *tx)
        .await;

        let row = match inserted {
            Ok(row) => row,
            Err(e) if unique_violation(&e) == Some(OPEN_CUSTODY_INDEX) => {
                drop(tx);
                return match self.custody_open_record_id(imei).await? {
                    Some(conflicting_record_id) => {
                        tracing::warn!(device = %imei, conflicting_record_id, "Check-out lost a race");
                        Err(Conflict::DeviceAlreadyAssigned { conflicting_record_id }.into())
                    }
                    None => Err(e.into()),
                };
            }
            Err(e) if is_foreign_key_violation(&e) => return Err(employee_not_found()),
            Err(e) => return Err(e.into()),
        };

        let record = CustodyRecord::from(row);
        refresh_device_status(&mut tx, imei).await?;

        write_audit(
            &mut tx,
            NewAuditEntry::new(
                actor,
                AuditAction::CheckOut,
                AuditResource::CustodyRecord,
                record.id,
                json!({
                    "employee_matricula": record.employee_matricula,
                    "device_imei": record.device_imei,
                    "delivery": snapshot(&record.delivery)?,
                }),
            ),
        )
        .await?;

        tx.commit().await?;

        tracing::info!(
            record_id = record.id,
            device = %record.device_imei,
            employee = %record.employee_matricula,
            "Device checked out"
        );
        Ok(CheckOutOutcome { record, created: true })
    }

    /// Record the return of a device; a record is returned exactly once
    pub async fn custody_return(&self, id: i32, ret: &NewReturn, actor: &Actor) -> AppResult<CustodyRecord> {
        let mut tx = self.pool.begin().await?;

        let current = lock_record(&mut tx, id).await?;
        if current.return_date.is_some() {
            return Err(InvalidTransition::AlreadyReturned { record_id: id }.into());
        }
        ledger::ensure_not_before(current.delivery_date, ret.return_date, "Return date")?;

        let row = sqlx::query_as::<_, CustodyRecordRow>(
            r#"
            UPDATE custody_records SET
                return_date = $2,
                return_condition = $3,
                return_notes = $4,
                received_by = $5,
                return_attachment_url = COALESCE($6, return_attachment_url),
                updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(ret.return_date)
        .bind(&ret.return_condition)
        .bind(&ret.return_notes)
        .bind(&ret.received_by)
        .bind(&ret.return_attachment_url)
        .fetch_one(&mut *tx)
        .await?;

        let record = CustodyRecord::from(row);
        let status = refresh_device_status(&mut tx, &record.device_imei).await?;

        write_audit(
            &mut tx,
            NewAuditEntry::new(
                actor,
                AuditAction::Return,
                AuditResource::CustodyRecord,
                id,
                json!({
                    "device_imei": record.device_imei,
                    "return": snapshot(&record.return_info)?,
                }),
            ),
        )
        .await?;

        tx.commit().await?;

        tracing::info!(record_id = id, device = %record.device_imei, ?status, "Device returned");
        Ok(record)
    }

    /// Correct the return details of a returned record
    pub async fn custody_amend_return(
        &self,
        id: i32,
        amendment: &AmendReturnRequest,
        actor: &Actor,
    ) -> AppResult<CustodyRecord> {
        let mut tx = self.pool.begin().await?;

        let current = lock_record(&mut tx, id).await?;
        let Some(current_return_date) = current.return_date else {
            return Err(InvalidTransition::NotReturned { record_id: id }.into());
        };
        ledger::ensure_not_before(
            current.delivery_date,
            amendment.return_date.unwrap_or(current_return_date),
            "Return date",
        )?;

        let before = CustodyRecord::from(current).return_info;

        let row = sqlx::query_as::<_, CustodyRecordRow>(
            r#"
            UPDATE custody_records SET
                return_date = COALESCE($2, return_date),
                return_condition = COALESCE($3, return_condition),
                return_notes = COALESCE($4, return_notes),
                received_by = COALESCE($5, received_by),
                updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(amendment.return_date)
        .bind(&amendment.return_condition)
        .bind(&amendment.return_notes)
        .bind(&amendment.received_by)
        .fetch_one(&mut *tx)
        .await?;

        let record = CustodyRecord::from(row);

        write_audit(
            &mut tx,
            NewAuditEntry::new(
                actor,
                AuditAction::AmendReturn,
                AuditResource::CustodyRecord,
                id,
                json!({
                    "before": snapshot(&before)?,
                    "after": snapshot(&record.return_info)?,
                }),
            ),
        )
        .await?;

        tx.commit().await?;

        tracing::info!(record_id = id, "Return details amended");
        Ok(record)
    }

    /// Set attachment URLs; the return attachment needs a returned record
    pub async fn custody_update_attachments(
        &self,
        id: i32,
        attachments: &UpdateAttachments,
        actor: &Actor,
    ) -> AppResult<CustodyRecord> {
        let mut tx = self.pool.begin().await?;

        let current = lock_record(&mut tx, id).await?;
        if current.return_date.is_none() && attachments.return_attachment_url.is_some() {
            return Err(InvalidTransition::NotReturned { record_id: id }.into());
        }

        let row = sqlx::query_as::<_, CustodyRecordRow>(
            r#"
            UPDATE custody_records SET
                delivery_attachment_url = COALESCE($2, delivery_attachment_url),
                return_attachment_url = COALESCE($3, return_attachment_url),
                police_report_url = COALESCE($4, police_report_url),
                updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(&attachments.delivery_attachment_url)
        .bind(&attachments.return_attachment_url)
        .bind(&attachments.police_report_url)
        .fetch_one(&mut *tx)
        .await?;

        write_audit(
            &mut tx,
            NewAuditEntry::new(
                actor,
                AuditAction::Update,
                AuditResource::CustodyRecord,
                id,
                snapshot(attachments)?,
            ),
        )
        .await?;

        tx.commit().await?;
        Ok(row.into())
    }

    /// Administrative hard delete; the audit entry keeps a snapshot
    pub async fn custody_delete(&self, id: i32, reason: Option<&str>, actor: &Actor) -> AppResult<()> {
        let mut tx = self.pool.begin().await?;

        let record = CustodyRecord::from(lock_record(&mut tx, id).await?);

        sqlx::query("DELETE FROM custody_records WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        let status = refresh_device_status(&mut tx, &record.device_imei).await?;

        write_audit(
            &mut tx,
            NewAuditEntry::new(
                actor,
                AuditAction::Delete,
                AuditResource::CustodyRecord,
                id,
                json!({ "reason": reason, "record": snapshot(&record)? }),
            ),
        )
        .await?;

        tx.commit().await?;

        tracing::warn!(
            record_id = id,
            device = %record.device_imei,
            ?status,
            actor = %actor.name,
            "Custody record deleted"
        );
        Ok(())
    }
}
