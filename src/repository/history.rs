//! History projections on Repository (read-only)

use super::{custody::LISTING_SELECT, Repository};
use crate::{
    error::{AppError, AppResult},
    models::{
        custody::{CustodyRecordListing, CustodyRecordListingRow},
        history::{DeviceCustodyRow, DeviceMaintenanceRow},
    },
};

impl Repository {
    /// Custody and maintenance intervals of a device, unordered
    pub async fn history_device_rows(
        &self,
        imei: &str,
    ) -> AppResult<(Vec<DeviceCustodyRow>, Vec<DeviceMaintenanceRow>)> {
        if !self.devices_exists(imei).await? {
            return Err(AppError::NotFound(format!("Device {} not found", imei)));
        }

        let custody = sqlx::query_as::<_, DeviceCustodyRow>(
            r#"
            SELECT r.id, r.employee_matricula, e.name AS employee_name,
                   r.delivery_date, r.return_date, r.created_at
            FROM custody_records r
            JOIN employees e ON e.matricula = r.employee_matricula
            WHERE r.device_imei = $1
            "#,
        )
        .bind(imei)
        .fetch_all(&self.pool)
        .await?;

        let maintenance = sqlx::query_as::<_, DeviceMaintenanceRow>(
            r#"
            SELECT id, order_number, send_date, return_date, reported_defect,
                   supplier, cost, status, created_at
            FROM maintenance_orders
            WHERE device_imei = $1
            "#,
        )
        .bind(imei)
        .fetch_all(&self.pool)
        .await?;

        Ok((custody, maintenance))
    }

    /// Custody records of an employee, oldest delivery first
    pub async fn history_employee(&self, matricula: &str) -> AppResult<Vec<CustodyRecordListing>> {
        self.employees_get(matricula).await?;

        let rows = sqlx::query_as::<_, CustodyRecordListingRow>(&format!(
            "{} WHERE r.employee_matricula = $1 ORDER BY r.delivery_date, r.created_at, r.id",
            LISTING_SELECT
        ))
        .bind(matricula)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(CustodyRecordListing::from).collect())
    }
}
