//! Line domain methods on Repository

use serde_json::json;
use sqlx::PgConnection;

use super::{device_occupancy, lock_device, snapshot, unique_violation, write_audit, Repository};
use crate::{
    error::{AppError, AppResult, InvalidTransition},
    ledger,
    models::{
        audit::{Actor, NewAuditEntry},
        enums::{AuditAction, AuditResource, LineStatus},
        line::{CreateLine, Line, LineLink, LineTerm, NewLineTerm, UpdateLine},
    },
};

const LINE_TERM_SELECT: &str = r#"
    SELECT t.id, t.line_numero, t.employee_matricula, e.name AS employee_name,
           t.delivery_date, t.delivered_by, t.active, t.deactivated_at, t.created_at
    FROM line_terms t
    JOIN employees e ON e.matricula = t.employee_matricula
"#;

async fn lock_line(conn: &mut PgConnection, numero: &str) -> AppResult<Line> {
    sqlx::query_as::<_, Line>("SELECT * FROM lines WHERE numero = $1 FOR UPDATE")
        .bind(numero)
        .fetch_optional(&mut *conn)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Line {} not found", numero)))
}

/// Close the open link-history row of a line
async fn close_link(conn: &mut PgConnection, numero: &str, actor: &Actor) -> AppResult<()> {
    sqlx::query(
        r#"
        UPDATE line_links SET unlinked_at = NOW(), unlinked_by = $2
        WHERE line_numero = $1 AND unlinked_at IS NULL
        "#,
    )
    .bind(numero)
    .bind(&actor.name)
    .execute(&mut *conn)
    .await?;
    Ok(())
}

impl Repository {
    /// List all lines
    pub async fn lines_list(&self) -> AppResult<Vec<Line>> {
        let rows = sqlx::query_as::<_, Line>("SELECT * FROM lines ORDER BY numero")
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }

    /// Get line by number
    pub async fn lines_get(&self, numero: &str) -> AppResult<Line> {
        sqlx::query_as::<_, Line>("SELECT * FROM lines WHERE numero = $1")
            .bind(numero)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Line {} not found", numero)))
    }

    /// Create line (unlinked)
    pub async fn lines_create(&self, data: &CreateLine, actor: &Actor) -> AppResult<Line> {
        let numero = data.numero.trim();
        let mut tx = self.pool.begin().await?;

        let line = sqlx::query_as::<_, Line>(
            r#"
            INSERT INTO lines (numero, carrier, plan, status)
            VALUES ($1, $2, $3, $4)
            RETURNING *
            "#,
        )
        .bind(numero)
        .bind(&data.carrier)
        .bind(&data.plan)
        .bind(data.status.unwrap_or_default())
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| match unique_violation(&e) {
            Some(_) => AppError::Duplicate(format!("Line {} already exists", numero)),
            None => e.into(),
        })?;

        write_audit(
            &mut tx,
            NewAuditEntry::new(actor, AuditAction::Create, AuditResource::Line, numero, snapshot(&line)?),
        )
        .await?;

        tx.commit().await?;
        Ok(line)
    }

    /// Update line master data; a linked line cannot be cancelled
    pub async fn lines_update(&self, numero: &str, data: &UpdateLine, actor: &Actor) -> AppResult<Line> {
        let mut tx = self.pool.begin().await?;

        let current = lock_line(&mut tx, numero).await?;
        if data.status == Some(LineStatus::Cancelled) {
            if let Some(device_imei) = current.linked_device_imei {
                return Err(InvalidTransition::LineLinked {
                    numero: numero.to_string(),
                    device_imei,
                }
                .into());
            }
        }

        let line = sqlx::query_as::<_, Line>(
            r#"
            UPDATE lines SET
                carrier = COALESCE($2, carrier),
                plan = COALESCE($3, plan),
                status = COALESCE($4, status),
                updated_at = NOW()
            WHERE numero = $1
            RETURNING *
            "#,
        )
        .bind(numero)
        .bind(&data.carrier)
        .bind(&data.plan)
        .bind(data.status)
        .fetch_one(&mut *tx)
        .await?;

        write_audit(
            &mut tx,
            NewAuditEntry::new(
                actor,
                AuditAction::Update,
                AuditResource::Line,
                numero,
                json!({ "carrier": data.carrier, "plan": data.plan, "status": data.status }),
            ),
        )
        .await?;

        tx.commit().await?;
        Ok(line)
    }

    /// Delete an unlinked line together with its link history
    pub async fn lines_delete(&self, numero: &str, actor: &Actor) -> AppResult<()> {
        let mut tx = self.pool.begin().await?;

        let line = lock_line(&mut tx, numero).await?;
        if let Some(device_imei) = line.linked_device_imei.clone() {
            return Err(InvalidTransition::LineLinked {
                numero: numero.to_string(),
                device_imei,
            }
            .into());
        }

        sqlx::query("DELETE FROM lines WHERE numero = $1")
            .bind(numero)
            .execute(&mut *tx)
            .await?;

        write_audit(
            &mut tx,
            NewAuditEntry::new(actor, AuditAction::Delete, AuditResource::Line, numero, snapshot(&line)?),
        )
        .await?;

        tx.commit().await?;
        Ok(())
    }

    /// Insert a line into a device.
    ///
    /// Last link wins: the line leaves its previous device and any other line
    /// in the target device is taken out, all in one transaction.
    pub async fn lines_link(&self, imei: &str, numero: &str, actor: &Actor) -> AppResult<Line> {
        let mut tx = self.pool.begin().await?;

        lock_device(&mut tx, imei).await?;

        // The moving line and the one in the target device are locked in
        // numero order so that two swaps cannot wait on each other
        let locked = sqlx::query_as::<_, Line>(
            r#"
            SELECT * FROM lines
            WHERE numero = $1 OR linked_device_imei = $2
            ORDER BY numero
            FOR UPDATE
            "#,
        )
        .bind(numero)
        .bind(imei)
        .fetch_all(&mut *tx)
        .await?;

        let (moving, others): (Vec<Line>, Vec<Line>) = locked.into_iter().partition(|l| l.numero == numero);
        let line = moving
            .into_iter()
            .next()
            .ok_or_else(|| AppError::NotFound(format!("Line {} not found", numero)))?;
        let displaced = others.into_iter().next().map(|l| l.numero);

        let occupancy = device_occupancy(&mut tx, imei).await?;

        ledger::link_guard(numero, line.status, &occupancy)?;

        if line.linked_device_imei.as_deref() == Some(imei) {
            tracing::debug!("Line {} already linked to device {}", numero, imei);
            return Ok(line);
        }

        if let Some(ref other) = displaced {
            sqlx::query("UPDATE lines SET linked_device_imei = NULL, updated_at = NOW() WHERE numero = $1")
                .bind(other)
                .execute(&mut *tx)
                .await?;
            close_link(&mut tx, other, actor).await?;
        }

        if line.linked_device_imei.is_some() {
            close_link(&mut tx, numero, actor).await?;
        }

        let linked = sqlx::query_as::<_, Line>(
            r#"
            UPDATE lines SET linked_device_imei = $2, updated_at = NOW()
            WHERE numero = $1
            RETURNING *
            "#,
        )
        .bind(numero)
        .bind(imei)
        .fetch_one(&mut *tx)
        .await?;

        let custody_record_id = occupancy.open_custody.as_ref().map(|c| c.id);
        sqlx::query(
            r#"
            INSERT INTO line_links (line_numero, device_imei, linked_by, custody_record_id)
            VALUES ($1, $2, $3, $4)
            "#,
        )
        .bind(numero)
        .bind(imei)
        .bind(&actor.name)
        .bind(custody_record_id)
        .execute(&mut *tx)
        .await?;

        write_audit(
            &mut tx,
            NewAuditEntry::new(
                actor,
                AuditAction::LinkLine,
                AuditResource::Line,
                numero,
                json!({
                    "device_imei": imei,
                    "previous_device_imei": line.linked_device_imei,
                    "displaced_line": displaced,
                    "custody_record_id": custody_record_id,
                }),
            ),
        )
        .await?;

        tx.commit().await?;

        tracing::info!(
            line = %numero,
            device = %imei,
            previous_device = ?line.linked_device_imei,
            "Line linked"
        );
        Ok(linked)
    }

    /// Take a line out of its device
    pub async fn lines_unlink(&self, numero: &str, actor: &Actor) -> AppResult<Line> {
        let mut tx = self.pool.begin().await?;

        let line = lock_line(&mut tx, numero).await?;
        let device_imei = line
            .linked_device_imei
            .clone()
            .ok_or_else(|| InvalidTransition::LineNotLinked {
                numero: numero.to_string(),
            })?;

        let unlinked = sqlx::query_as::<_, Line>(
            r#"
            UPDATE lines SET linked_device_imei = NULL, updated_at = NOW()
            WHERE numero = $1
            RETURNING *
            "#,
        )
        .bind(numero)
        .fetch_one(&mut *tx)
        .await?;

        close_link(&mut tx, numero, actor).await?;

        write_audit(
            &mut tx,
            NewAuditEntry::new(
                actor,
                AuditAction::UnlinkLine,
                AuditResource::Line,
                numero,
                json!({ "device_imei": device_imei }),
            ),
        )
        .await?;

        tx.commit().await?;

        tracing::info!(line = %numero, device = %device_imei, "Line unlinked");
        Ok(unlinked)
    }

    /// Link history of a line, oldest first
    pub async fn lines_history(&self, numero: &str) -> AppResult<Vec<LineLink>> {
        self.lines_get(numero).await?;

        let rows = sqlx::query_as::<_, LineLink>(
            "SELECT * FROM line_links WHERE line_numero = $1 ORDER BY linked_at, id",
        )
        .bind(numero)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    /// Hand a line over to an employee; the line's active term, if any, is
    /// deactivated in the same transaction
    pub async fn line_terms_create(&self, numero: &str, new: &NewLineTerm, actor: &Actor) -> AppResult<LineTerm> {
        let mut tx = self.pool.begin().await?;

        let line = lock_line(&mut tx, numero).await?;
        if line.status == LineStatus::Cancelled {
            return Err(InvalidTransition::LineCancelled {
                numero: numero.to_string(),
            }
            .into());
        }

        sqlx::query_scalar::<_, i32>("SELECT 1 FROM employees WHERE matricula = $1 FOR SHARE")
            .bind(&new.employee_matricula)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Employee {} not found", new.employee_matricula)))?;

        let previous_term = sqlx::query_scalar::<_, i32>(
            r#"
            UPDATE line_terms SET active = FALSE, deactivated_at = NOW()
            WHERE line_numero = $1 AND active
            RETURNING id
            "#,
        )
        .bind(numero)
        .fetch_optional(&mut *tx)
        .await?;

        let id: i32 = sqlx::query_scalar(
            r#"
            INSERT INTO line_terms (line_numero, employee_matricula, delivery_date, delivered_by)
            VALUES ($1, $2, $3, $4)
            RETURNING id
            "#,
        )
        .bind(numero)
        .bind(&new.employee_matricula)
        .bind(new.delivery_date)
        .bind(&new.delivered_by)
        .fetch_one(&mut *tx)
        .await?;

        let term = sqlx::query_as::<_, LineTerm>(&format!("{} WHERE t.id = $1", LINE_TERM_SELECT))
            .bind(id)
            .fetch_one(&mut *tx)
            .await?;

        write_audit(
            &mut tx,
            NewAuditEntry::new(
                actor,
                AuditAction::Create,
                AuditResource::LineTerm,
                id,
                json!({
                    "line_numero": numero,
                    "employee_matricula": term.employee_matricula,
                    "delivery_date": term.delivery_date,
                    "previous_term": previous_term,
                }),
            ),
        )
        .await?;

        tx.commit().await?;

        tracing::info!(
            term_id = id,
            line = %numero,
            employee = %term.employee_matricula,
            ?previous_term,
            "Line term created"
        );
        Ok(term)
    }

    /// Terms of a line, newest first
    pub async fn line_terms_list(&self, numero: &str) -> AppResult<Vec<LineTerm>> {
        self.lines_get(numero).await?;

        let rows = sqlx::query_as::<_, LineTerm>(&format!(
            "{} WHERE t.line_numero = $1 ORDER BY t.created_at DESC, t.id DESC",
            LINE_TERM_SELECT
        ))
        .bind(numero)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }
}
