//! Employee domain methods on Repository

use serde_json::json;

use super::{is_foreign_key_violation, snapshot, unique_violation, write_audit, Repository};
use crate::{
    error::{AppError, AppResult, InvalidTransition},
    models::{
        audit::{Actor, NewAuditEntry},
        employee::{CreateEmployee, Employee, UpdateEmployee},
        enums::{AuditAction, AuditResource},
    },
};

impl Repository {
    /// List all employees
    pub async fn employees_list(&self) -> AppResult<Vec<Employee>> {
        let rows = sqlx::query_as::<_, Employee>("SELECT * FROM employees ORDER BY name, matricula")
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }

    /// Get employee by matricula
    pub async fn employees_get(&self, matricula: &str) -> AppResult<Employee> {
        sqlx::query_as::<_, Employee>("SELECT * FROM employees WHERE matricula = $1")
            .bind(matricula)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Employee {} not found", matricula)))
    }

    /// Create employee
    pub async fn employees_create(&self, data: &CreateEmployee, actor: &Actor) -> AppResult<Employee> {
        let mut tx = self.pool.begin().await?;

        let employee = sqlx::query_as::<_, Employee>(
            r#"
            INSERT INTO employees (matricula, name, position, email)
            VALUES ($1, $2, $3, $4)
            RETURNING *
            "#,
        )
        .bind(data.matricula.trim())
        .bind(&data.name)
        .bind(&data.position)
        .bind(&data.email)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| match unique_violation(&e) {
            Some(_) => AppError::Duplicate(format!("Employee {} already exists", data.matricula.trim())),
            None => e.into(),
        })?;

        write_audit(
            &mut tx,
            NewAuditEntry::new(
                actor,
                AuditAction::Create,
                AuditResource::Employee,
                &employee.matricula,
                snapshot(&employee)?,
            ),
        )
        .await?;

        tx.commit().await?;
        Ok(employee)
    }

    /// Update employee
    pub async fn employees_update(
        &self,
        matricula: &str,
        data: &UpdateEmployee,
        actor: &Actor,
    ) -> AppResult<Employee> {
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

        add_field!(data.name, "name");
        add_field!(data.position, "position");
        add_field!(data.email, "email");

        let query = format!(
            "UPDATE employees SET {} WHERE matricula = $1 RETURNING *",
            sets.join(", ")
        );

        let mut tx = self.pool.begin().await?;

        let mut builder = sqlx::query_as::<_, Employee>(&query).bind(matricula);

        macro_rules! bind_field {
            ($field:expr) => {
                if let Some(ref val) = $field {
                    builder = builder.bind(val);
                }
            };
        }

        bind_field!(data.name);
        bind_field!(data.position);
        bind_field!(data.email);

        let employee = builder
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Employee {} not found", matricula)))?;

        write_audit(
            &mut tx,
            NewAuditEntry::new(
                actor,
                AuditAction::Update,
                AuditResource::Employee,
                matricula,
                json!({ "name": data.name, "position": data.position, "email": data.email }),
            ),
        )
        .await?;

        tx.commit().await?;
        Ok(employee)
    }

    /// Delete an employee who never held a device
    pub async fn employees_delete(&self, matricula: &str, actor: &Actor) -> AppResult<()> {
        let mut tx = self.pool.begin().await?;

        let employee = sqlx::query_as::<_, Employee>(
            "SELECT * FROM employees WHERE matricula = $1 FOR UPDATE",
        )
        .bind(matricula)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Employee {} not found", matricula)))?;

        let open_record = sqlx::query_scalar::<_, i32>(
            r#"
            SELECT id FROM custody_records
            WHERE employee_matricula = $1 AND return_date IS NULL
            ORDER BY id
            LIMIT 1
            "#,
        )
        .bind(matricula)
        .fetch_optional(&mut *tx)
        .await?;

        if let Some(record_id) = open_record {
            return Err(InvalidTransition::OpenCustodyExists { record_id }.into());
        }

        sqlx::query("DELETE FROM employees WHERE matricula = $1")
            .bind(matricula)
            .execute(&mut *tx)
            .await
            .map_err(|e| {
                if is_foreign_key_violation(&e) {
                    InvalidTransition::HistoryExists {
                        resource: "Employee",
                        id: matricula.to_string(),
                    }
                    .into()
                } else {
                    AppError::from(e)
                }
            })?;

        write_audit(
            &mut tx,
            NewAuditEntry::new(
                actor,
                AuditAction::Delete,
                AuditResource::Employee,
                matricula,
                snapshot(&employee)?,
            ),
        )
        .await?;

        tx.commit().await?;
        Ok(())
    }
}
