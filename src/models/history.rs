//! History projections

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use sqlx::FromRow;
use utoipa::ToSchema;

use super::enums::{CustodyStatus, MaintenanceStatus};

/// Custody interval of a device, as read for its history
#[derive(Debug, Clone, FromRow)]
pub struct DeviceCustodyRow {
    pub id: i32,
    pub employee_matricula: String,
    pub employee_name: String,
    pub delivery_date: NaiveDate,
    pub return_date: Option<NaiveDate>,
    pub created_at: DateTime<Utc>,
}

/// Maintenance interval of a device, as read for its history
#[derive(Debug, Clone, FromRow)]
pub struct DeviceMaintenanceRow {
    pub id: i32,
    pub order_number: String,
    pub send_date: NaiveDate,
    pub return_date: Option<NaiveDate>,
    pub reported_defect: String,
    pub supplier: Option<String>,
    pub cost: Option<Decimal>,
    pub status: MaintenanceStatus,
    pub created_at: DateTime<Utc>,
}

/// One entry of a device timeline
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(tag = "kind")]
pub enum DeviceHistoryEntry {
    Custody {
        record_id: i32,
        employee_matricula: String,
        employee_name: String,
        start_date: NaiveDate,
        end_date: Option<NaiveDate>,
        status: CustodyStatus,
        ongoing: bool,
        recorded_at: DateTime<Utc>,
    },
    Maintenance {
        order_id: i32,
        order_number: String,
        start_date: NaiveDate,
        end_date: Option<NaiveDate>,
        status: MaintenanceStatus,
        reported_defect: String,
        supplier: Option<String>,
        cost: Option<Decimal>,
        ongoing: bool,
        recorded_at: DateTime<Utc>,
    },
}

impl DeviceHistoryEntry {
    pub fn start_date(&self) -> NaiveDate {
        match self {
            DeviceHistoryEntry::Custody { start_date, .. }
            | DeviceHistoryEntry::Maintenance { start_date, .. } => *start_date,
        }
    }

    pub fn recorded_at(&self) -> DateTime<Utc> {
        match self {
            DeviceHistoryEntry::Custody { recorded_at, .. }
            | DeviceHistoryEntry::Maintenance { recorded_at, .. } => *recorded_at,
        }
    }

    pub fn is_ongoing(&self) -> bool {
        match self {
            DeviceHistoryEntry::Custody { ongoing, .. }
            | DeviceHistoryEntry::Maintenance { ongoing, .. } => *ongoing,
        }
    }
}

impl From<DeviceCustodyRow> for DeviceHistoryEntry {
    fn from(row: DeviceCustodyRow) -> Self {
        let ongoing = row.return_date.is_none();
        DeviceHistoryEntry::Custody {
            record_id: row.id,
            employee_matricula: row.employee_matricula,
            employee_name: row.employee_name,
            start_date: row.delivery_date,
            end_date: row.return_date,
            status: if ongoing { CustodyStatus::InUse } else { CustodyStatus::Returned },
            ongoing,
            recorded_at: row.created_at,
        }
    }
}

impl From<DeviceMaintenanceRow> for DeviceHistoryEntry {
    fn from(row: DeviceMaintenanceRow) -> Self {
        DeviceHistoryEntry::Maintenance {
            order_id: row.id,
            order_number: row.order_number,
            start_date: row.send_date,
            end_date: row.return_date,
            ongoing: row.status.is_open(),
            status: row.status,
            reported_defect: row.reported_defect,
            supplier: row.supplier,
            cost: row.cost,
            recorded_at: row.created_at,
        }
    }
}
