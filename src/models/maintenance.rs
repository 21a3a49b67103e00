//! Maintenance order model

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

use super::audit::Actor;
use super::enums::{DeviceCondition, MaintenanceOutcome, MaintenanceStatus};
use crate::error::{AppError, AppResult};

/// Repair order for a device sent out for service
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct MaintenanceOrder {
    pub id: i32,
    /// Human-facing number, `OS-<year>-<sequence>`
    pub order_number: String,
    pub device_imei: String,
    pub send_date: NaiveDate,
    pub reported_defect: String,
    pub supplier: Option<String>,
    /// Device condition before it was sent; restored if the order is deleted while open
    pub previous_condition: DeviceCondition,
    pub status: MaintenanceStatus,
    pub opened_by: String,
    pub return_date: Option<NaiveDate>,
    pub service_performed: Option<String>,
    pub cost: Option<Decimal>,
    /// Condition written back onto the device when the order closed
    pub post_condition: Option<DeviceCondition>,
    pub closed_by: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl MaintenanceOrder {
    pub fn is_open(&self) -> bool {
        self.status.is_open()
    }
}

/// Send-to-maintenance request
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct SendToMaintenanceRequest {
    #[validate(required(message = "Device IMEI is required"), length(min = 1, message = "Device IMEI is required"))]
    pub device_imei: Option<String>,
    #[validate(required(message = "Send date is required"))]
    pub send_date: Option<NaiveDate>,
    #[validate(required(message = "Reported defect is required"), length(min = 1, message = "Reported defect is required"))]
    pub reported_defect: Option<String>,
    pub supplier: Option<String>,
}

/// Validated send-to-maintenance payload
#[derive(Debug, Clone)]
pub struct NewMaintenanceOrder {
    pub device_imei: String,
    pub send_date: NaiveDate,
    pub reported_defect: String,
    pub supplier: Option<String>,
    pub opened_by: String,
}

impl SendToMaintenanceRequest {
    pub fn into_new(self, actor: &Actor) -> AppResult<NewMaintenanceOrder> {
        self.validate()?;

        let missing = |field: &str| AppError::Validation(format!("{} is required", field));

        Ok(NewMaintenanceOrder {
            device_imei: self.device_imei.ok_or_else(|| missing("device_imei"))?,
            send_date: self.send_date.ok_or_else(|| missing("send_date"))?,
            reported_defect: self.reported_defect.ok_or_else(|| missing("reported_defect"))?,
            supplier: self.supplier.filter(|s| !s.trim().is_empty()),
            opened_by: actor.name.clone(),
        })
    }
}

/// Close-maintenance request
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CloseMaintenanceRequest {
    #[validate(required(message = "Return date is required"))]
    pub return_date: Option<NaiveDate>,
    #[validate(required(message = "Outcome is required"))]
    pub outcome: Option<MaintenanceOutcome>,
    /// Condition the device comes back in
    #[validate(required(message = "Post-repair condition is required"))]
    pub post_condition: Option<DeviceCondition>,
    pub service_performed: Option<String>,
    pub cost: Option<Decimal>,
}

/// Validated close-maintenance payload
#[derive(Debug, Clone)]
pub struct CloseMaintenance {
    pub return_date: NaiveDate,
    pub status: MaintenanceStatus,
    pub post_condition: DeviceCondition,
    pub service_performed: Option<String>,
    pub cost: Option<Decimal>,
    pub closed_by: String,
}

impl CloseMaintenanceRequest {
    pub fn into_close(self, actor: &Actor) -> AppResult<CloseMaintenance> {
        self.validate()?;

        let missing = |field: &str| AppError::Validation(format!("{} is required", field));

        let post_condition = self.post_condition.ok_or_else(|| missing("post_condition"))?;
        if post_condition == DeviceCondition::InMaintenance {
            return Err(AppError::Validation(
                "Post-repair condition cannot be InMaintenance".to_string(),
            ));
        }
        validate_cost(self.cost)?;

        Ok(CloseMaintenance {
            return_date: self.return_date.ok_or_else(|| missing("return_date"))?,
            status: self.outcome.ok_or_else(|| missing("outcome"))?.into(),
            post_condition,
            service_performed: self.service_performed,
            cost: self.cost,
            closed_by: actor.name.clone(),
        })
    }
}

/// Administrative correction of a closed order
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct AmendMaintenanceRequest {
    pub return_date: Option<NaiveDate>,
    pub service_performed: Option<String>,
    pub cost: Option<Decimal>,
    pub supplier: Option<String>,
}

impl AmendMaintenanceRequest {
    pub fn validate_fields(&self) -> AppResult<()> {
        if self.return_date.is_none()
            && self.service_performed.is_none()
            && self.cost.is_none()
            && self.supplier.is_none()
        {
            return Err(AppError::Validation(
                "At least one field must be provided for update".to_string(),
            ));
        }
        validate_cost(self.cost)
    }
}

/// Query parameters for maintenance listings
#[derive(Debug, Default, Deserialize, IntoParams, ToSchema)]
pub struct MaintenanceQuery {
    pub status: Option<MaintenanceStatus>,
    pub device_imei: Option<String>,
}

/// Query parameters for the administrative delete
#[derive(Debug, Deserialize, IntoParams, ToSchema)]
pub struct DeleteOrderQuery {
    /// Why the order is being removed (kept in the audit trail)
    pub reason: Option<String>,
}

fn validate_cost(cost: Option<Decimal>) -> AppResult<()> {
    match cost {
        Some(c) if c < Decimal::ZERO => {
            Err(AppError::Validation("Cost cannot be negative".to_string()))
        }
        _ => Ok(()),
    }
}
