//! Custody record ("term") model and related request types

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

use super::audit::Actor;
use super::enums::CustodyStatus;
use crate::error::{AppError, AppResult};

/// Custody record row as stored
#[derive(Debug, Clone, FromRow)]
pub struct CustodyRecordRow {
    pub id: i32,
    pub employee_matricula: String,
    pub device_imei: String,
    pub delivery_date: NaiveDate,
    pub delivery_condition: String,
    pub delivery_notes: Option<String>,
    pub delivered_by: String,
    pub delivery_attachment_url: Option<String>,
    pub accessories: Vec<String>,
    pub return_date: Option<NaiveDate>,
    pub return_condition: Option<String>,
    pub return_notes: Option<String>,
    pub received_by: Option<String>,
    pub return_attachment_url: Option<String>,
    pub police_report_url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Hand-over of a device to an employee
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Delivery {
    pub date: NaiveDate,
    /// Condition of the device at delivery, as observed by the operator
    pub condition: String,
    pub notes: Option<String>,
    pub delivered_by: String,
    pub attachment_url: Option<String>,
    pub accessories: Vec<String>,
}

/// Hand-back of a device by an employee
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ReturnInfo {
    pub date: NaiveDate,
    pub condition: String,
    pub notes: Option<String>,
    pub received_by: String,
    pub attachment_url: Option<String>,
}

/// Custody record binding one employee to one device for an interval
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CustodyRecord {
    pub id: i32,
    pub employee_matricula: String,
    pub device_imei: String,
    /// `InUse` until the return sub-record is written
    pub status: CustodyStatus,
    pub delivery: Delivery,
    #[serde(rename = "return")]
    pub return_info: Option<ReturnInfo>,
    pub police_report_url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl CustodyRecord {
    pub fn is_open(&self) -> bool {
        self.return_info.is_none()
    }
}

impl From<CustodyRecordRow> for CustodyRecord {
    fn from(row: CustodyRecordRow) -> Self {
        let return_info = match (row.return_date, row.return_condition, row.received_by) {
            (Some(date), Some(condition), Some(received_by)) => Some(ReturnInfo {
                date,
                condition,
                notes: row.return_notes,
                received_by,
                attachment_url: row.return_attachment_url,
            }),
            _ => None,
        };

        Self {
            id: row.id,
            employee_matricula: row.employee_matricula,
            device_imei: row.device_imei,
            status: if return_info.is_some() {
                CustodyStatus::Returned
            } else {
                CustodyStatus::InUse
            },
            delivery: Delivery {
                date: row.delivery_date,
                condition: row.delivery_condition,
                notes: row.delivery_notes,
                delivered_by: row.delivered_by,
                attachment_url: row.delivery_attachment_url,
                accessories: row.accessories,
            },
            return_info,
            police_report_url: row.police_report_url,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

/// Custody record row joined with display fields for listings
#[derive(Debug, Clone, FromRow)]
pub struct CustodyRecordListingRow {
    #[sqlx(flatten)]
    pub record: CustodyRecordRow,
    pub employee_name: String,
    pub device_model: String,
    pub device_line: Option<String>,
}

/// Custody record with employee, device and line display fields
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CustodyRecordListing {
    #[serde(flatten)]
    pub record: CustodyRecord,
    pub employee_name: String,
    pub device_model: String,
    pub device_line: Option<String>,
}

impl From<CustodyRecordListingRow> for CustodyRecordListing {
    fn from(row: CustodyRecordListingRow) -> Self {
        Self {
            record: row.record.into(),
            employee_name: row.employee_name,
            device_model: row.device_model,
            device_line: row.device_line,
        }
    }
}

// ---------------------------------------------------------------------------
// Check-out
// ---------------------------------------------------------------------------

/// Check-out request
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CheckOutRequest {
    #[validate(required(message = "Employee matricula is required"), length(min = 1, message = "Employee matricula is required"))]
    pub employee_matricula: Option<String>,
    #[validate(required(message = "Device IMEI is required"), length(min = 1, message = "Device IMEI is required"))]
    pub device_imei: Option<String>,
    #[validate(required(message = "Delivery date is required"))]
    pub delivery_date: Option<NaiveDate>,
    #[validate(required(message = "Delivery condition is required"), length(min = 1, message = "Delivery condition is required"))]
    pub delivery_condition: Option<String>,
    pub delivery_notes: Option<String>,
    /// Operator handing the device over; defaults to the acting user
    pub delivered_by: Option<String>,
    pub delivery_attachment_url: Option<String>,
    #[serde(default)]
    pub accessories: Vec<String>,
}

/// Validated check-out payload
#[derive(Debug, Clone)]
pub struct NewCustodyRecord {
    pub employee_matricula: String,
    pub device_imei: String,
    pub delivery_date: NaiveDate,
    pub delivery_condition: String,
    pub delivery_notes: Option<String>,
    pub delivered_by: String,
    pub delivery_attachment_url: Option<String>,
    pub accessories: Vec<String>,
}

impl CheckOutRequest {
    /// Validate the request and resolve defaults against the acting user
    pub fn into_new(self, actor: &Actor) -> AppResult<NewCustodyRecord> {
        self.validate()?;

        let missing = |field: &str| AppError::Validation(format!("{} is required", field));

        Ok(NewCustodyRecord {
            employee_matricula: self.employee_matricula.ok_or_else(|| missing("employee_matricula"))?,
            device_imei: self.device_imei.ok_or_else(|| missing("device_imei"))?,
            delivery_date: self.delivery_date.ok_or_else(|| missing("delivery_date"))?,
            delivery_condition: self.delivery_condition.ok_or_else(|| missing("delivery_condition"))?,
            delivery_notes: self.delivery_notes,
            delivered_by: non_blank(self.delivered_by).unwrap_or_else(|| actor.name.clone()),
            delivery_attachment_url: self.delivery_attachment_url,
            accessories: self
                .accessories
                .into_iter()
                .map(|a| a.trim().to_string())
                .filter(|a| !a.is_empty())
                .collect(),
        })
    }
}

/// Result of a check-out: a fresh record, or the record created by an
/// identical request moments ago
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct CheckOutOutcome {
    pub record: CustodyRecord,
    /// `false` when a duplicate submission was folded into an existing record
    pub created: bool,
}

// ---------------------------------------------------------------------------
// Return
// ---------------------------------------------------------------------------

/// Return request
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct ReturnRequest {
    #[validate(required(message = "Return date is required"))]
    pub return_date: Option<NaiveDate>,
    #[validate(required(message = "Return condition is required"), length(min = 1, message = "Return condition is required"))]
    pub return_condition: Option<String>,
    pub return_notes: Option<String>,
    /// Operator receiving the device; defaults to the acting user
    pub received_by: Option<String>,
    pub return_attachment_url: Option<String>,
}

/// Validated return payload
#[derive(Debug, Clone)]
pub struct NewReturn {
    pub return_date: NaiveDate,
    pub return_condition: String,
    pub return_notes: Option<String>,
    pub received_by: String,
    pub return_attachment_url: Option<String>,
}

impl ReturnRequest {
    pub fn into_new(self, actor: &Actor) -> AppResult<NewReturn> {
        self.validate()?;

        let missing = |field: &str| AppError::Validation(format!("{} is required", field));

        Ok(NewReturn {
            return_date: self.return_date.ok_or_else(|| missing("return_date"))?,
            return_condition: self.return_condition.ok_or_else(|| missing("return_condition"))?,
            return_notes: self.return_notes,
            received_by: non_blank(self.received_by).unwrap_or_else(|| actor.name.clone()),
            return_attachment_url: self.return_attachment_url,
        })
    }
}

/// Correction of the return details of an already returned record
#[derive(Debug, Serialize, Deserialize, Validate, ToSchema)]
pub struct AmendReturnRequest {
    pub return_date: Option<NaiveDate>,
    #[validate(length(min = 1, message = "Return condition cannot be empty"))]
    pub return_condition: Option<String>,
    pub return_notes: Option<String>,
    #[validate(length(min = 1, message = "Receiving operator cannot be empty"))]
    pub received_by: Option<String>,
}

impl AmendReturnRequest {
    pub fn is_empty(&self) -> bool {
        self.return_date.is_none()
            && self.return_condition.is_none()
            && self.return_notes.is_none()
            && self.received_by.is_none()
    }
}

/// Attachment URLs of a record (opaque to the ledger)
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct UpdateAttachments {
    pub delivery_attachment_url: Option<String>,
    pub return_attachment_url: Option<String>,
    pub police_report_url: Option<String>,
}

impl UpdateAttachments {
    pub fn is_empty(&self) -> bool {
        self.delivery_attachment_url.is_none()
            && self.return_attachment_url.is_none()
            && self.police_report_url.is_none()
    }
}

/// Query parameters for the administrative delete
#[derive(Debug, Deserialize, IntoParams, ToSchema)]
pub struct DeleteRecordQuery {
    /// Why the record is being removed (kept in the audit trail)
    pub reason: Option<String>,
}

// ---------------------------------------------------------------------------
// Listing
// ---------------------------------------------------------------------------

/// Status filter for record listings
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub enum RecordFilter {
    #[default]
    All,
    InUse,
    Returned,
}

impl RecordFilter {
    pub fn condition(self) -> Option<&'static str> {
        match self {
            RecordFilter::All => None,
            RecordFilter::InUse => Some("r.return_date IS NULL"),
            RecordFilter::Returned => Some("r.return_date IS NOT NULL"),
        }
    }
}

/// Sortable columns for record listings
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum RecordSort {
    #[default]
    DeliveryDate,
    ReturnDate,
    Id,
    Employee,
    Device,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    Asc,
    #[default]
    Desc,
}

/// Build the ORDER BY clause for a listing; the id tiebreaker keeps pages stable
pub fn order_by_clause(sort: RecordSort, direction: SortDirection) -> String {
    let dir = match direction {
        SortDirection::Asc => "ASC",
        SortDirection::Desc => "DESC",
    };
    let column = match sort {
        RecordSort::DeliveryDate => "r.delivery_date",
        RecordSort::ReturnDate => "r.return_date",
        RecordSort::Id => "r.id",
        RecordSort::Employee => "e.name",
        RecordSort::Device => "d.model",
    };
    if sort == RecordSort::Id {
        format!("ORDER BY r.id {}", dir)
    } else {
        format!("ORDER BY {} {} NULLS LAST, r.id {}", column, dir, dir)
    }
}

/// Query parameters for record listings
#[derive(Debug, Default, Deserialize, IntoParams, ToSchema)]
pub struct RecordQuery {
    pub filter: Option<RecordFilter>,
    /// Only records of this employee
    pub employee_matricula: Option<String>,
    pub sort: Option<RecordSort>,
    pub direction: Option<SortDirection>,
    /// Page number (default: 1)
    pub page: Option<i64>,
    /// Records per page (default from configuration)
    pub page_size: Option<i64>,
}

/// Paginated record listing
#[derive(Debug, Serialize, ToSchema)]
pub struct RecordPage {
    pub records: Vec<CustodyRecordListing>,
    pub total: i64,
    pub page: i64,
    pub page_size: i64,
}

/// Row offset of a page; pages past what an `i64` offset can address are rejected
pub fn page_offset(page: i64, page_size: i64) -> AppResult<i64> {
    page.checked_sub(1)
        .and_then(|p| p.checked_mul(page_size))
        .filter(|offset| *offset >= 0)
        .ok_or_else(|| AppError::Validation(format!("Page {} is out of range", page)))
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}
