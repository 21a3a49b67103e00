//! Shared domain enums
//!
//! Every enum is stored as a PostgreSQL enum type (snake_case labels) and
//! serialized to API clients in PascalCase.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

// ---------------------------------------------------------------------------
// DeviceCondition
// ---------------------------------------------------------------------------

/// Physical condition of a device, maintained by operators and by the
/// maintenance workflow
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema, sqlx::Type)]
#[sqlx(type_name = "device_condition", rename_all = "snake_case")]
pub enum DeviceCondition {
    New,
    ApprovedForUse,
    InMaintenance,
    Damaged,
    TotalLoss,
    Defective,
}

impl Default for DeviceCondition {
    fn default() -> Self {
        DeviceCondition::New
    }
}

impl std::fmt::Display for DeviceCondition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            DeviceCondition::New => "New",
            DeviceCondition::ApprovedForUse => "Approved for use",
            DeviceCondition::InMaintenance => "In maintenance",
            DeviceCondition::Damaged => "Damaged",
            DeviceCondition::TotalLoss => "Total loss",
            DeviceCondition::Defective => "Defective",
        };
        write!(f, "{}", label)
    }
}

// ---------------------------------------------------------------------------
// DeviceStatus
// ---------------------------------------------------------------------------

/// Availability of a device, derived from its open custody records and
/// maintenance orders
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema, sqlx::Type)]
#[sqlx(type_name = "device_status", rename_all = "snake_case")]
pub enum DeviceStatus {
    Available,
    InUse,
    Unavailable,
}

impl DeviceStatus {
    /// Derive the status from the open aggregates referencing a device.
    ///
    /// Returns `None` when both a custody record and a maintenance order are
    /// open, which the ledger never allows.
    pub fn derive(has_open_custody: bool, has_open_maintenance: bool) -> Option<Self> {
        match (has_open_custody, has_open_maintenance) {
            (false, false) => Some(DeviceStatus::Available),
            (true, false) => Some(DeviceStatus::InUse),
            (false, true) => Some(DeviceStatus::Unavailable),
            (true, true) => None,
        }
    }
}

// ---------------------------------------------------------------------------
// LineStatus
// ---------------------------------------------------------------------------

/// Carrier-side status of a phone line
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema, sqlx::Type)]
#[sqlx(type_name = "line_status", rename_all = "snake_case")]
pub enum LineStatus {
    Active,
    Inactive,
    Cancelled,
}

impl Default for LineStatus {
    fn default() -> Self {
        LineStatus::Active
    }
}

// ---------------------------------------------------------------------------
// CustodyStatus
// ---------------------------------------------------------------------------

/// Derived status of a custody record (never stored)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub enum CustodyStatus {
    InUse,
    Returned,
}

// ---------------------------------------------------------------------------
// MaintenanceStatus
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema, sqlx::Type)]
#[sqlx(type_name = "maintenance_status", rename_all = "snake_case")]
pub enum MaintenanceStatus {
    InRepair,
    Completed,
    Cancelled,
}

impl MaintenanceStatus {
    pub fn is_open(self) -> bool {
        self == MaintenanceStatus::InRepair
    }
}

/// How a maintenance order was closed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub enum MaintenanceOutcome {
    Completed,
    Cancelled,
}

impl From<MaintenanceOutcome> for MaintenanceStatus {
    fn from(outcome: MaintenanceOutcome) -> Self {
        match outcome {
            MaintenanceOutcome::Completed => MaintenanceStatus::Completed,
            MaintenanceOutcome::Cancelled => MaintenanceStatus::Cancelled,
        }
    }
}

// ---------------------------------------------------------------------------
// Audit
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema, sqlx::Type)]
#[sqlx(type_name = "audit_action", rename_all = "snake_case")]
pub enum AuditAction {
    Create,
    Update,
    Delete,
    CheckOut,
    Return,
    AmendReturn,
    SendToMaintenance,
    CloseMaintenance,
    AmendMaintenance,
    LinkLine,
    UnlinkLine,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema, sqlx::Type)]
#[sqlx(type_name = "audit_resource", rename_all = "snake_case")]
pub enum AuditResource {
    Employee,
    Device,
    Line,
    LineTerm,
    CustodyRecord,
    MaintenanceOrder,
}

impl std::str::FromStr for AuditResource {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().replace(['-', '_'], "").as_str() {
            "employee" | "employees" => Ok(AuditResource::Employee),
            "device" | "devices" => Ok(AuditResource::Device),
            "line" | "lines" => Ok(AuditResource::Line),
            "lineterm" | "lineterms" | "terms" => Ok(AuditResource::LineTerm),
            "custodyrecord" | "record" | "records" => Ok(AuditResource::CustodyRecord),
            "maintenanceorder" | "maintenance" => Ok(AuditResource::MaintenanceOrder),
            _ => Err(format!("Unknown audit resource: {}", s)),
        }
    }
}
