//! Phone line model and link history

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use validator::Validate;

use super::audit::Actor;
use super::enums::LineStatus;
use crate::error::{AppError, AppResult};

/// Phone line (SIM) record
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Line {
    pub numero: String,
    pub carrier: String,
    pub plan: Option<String>,
    pub status: LineStatus,
    /// Device the line is currently inserted into
    pub linked_device_imei: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Create line request
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateLine {
    #[validate(length(min = 1, max = 32, message = "Line number is required"))]
    pub numero: String,
    #[validate(length(min = 1, message = "Carrier is required"))]
    pub carrier: String,
    pub plan: Option<String>,
    pub status: Option<LineStatus>,
}

/// Update line request (numero is immutable, links go through link/unlink)
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct UpdateLine {
    #[validate(length(min = 1, message = "Carrier cannot be empty"))]
    pub carrier: Option<String>,
    pub plan: Option<String>,
    pub status: Option<LineStatus>,
}

/// One interval during which a line was inserted in a device
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct LineLink {
    pub id: i32,
    pub line_numero: String,
    pub device_imei: String,
    pub linked_at: DateTime<Utc>,
    pub linked_by: String,
    pub unlinked_at: Option<DateTime<Utc>>,
    pub unlinked_by: Option<String>,
    /// Custody record open on the device when the link was made
    pub custody_record_id: Option<i32>,
}

/// Employee answering for a line. One term per line is active; a new term
/// deactivates the previous one.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct LineTerm {
    pub id: i32,
    pub line_numero: String,
    pub employee_matricula: String,
    pub employee_name: String,
    pub delivery_date: NaiveDate,
    pub delivered_by: String,
    pub active: bool,
    pub deactivated_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

/// Create line term request
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateLineTerm {
    #[validate(required(message = "Employee matricula is required"), length(min = 1, message = "Employee matricula is required"))]
    pub employee_matricula: Option<String>,
    #[validate(required(message = "Delivery date is required"))]
    pub delivery_date: Option<NaiveDate>,
}

/// Validated line term payload
#[derive(Debug, Clone)]
pub struct NewLineTerm {
    pub employee_matricula: String,
    pub delivery_date: NaiveDate,
    pub delivered_by: String,
}

impl CreateLineTerm {
    pub fn into_new(self, actor: &Actor) -> AppResult<NewLineTerm> {
        self.validate()?;

        let missing = |field: &str| AppError::Validation(format!("{} is required", field));

        Ok(NewLineTerm {
            employee_matricula: self
                .employee_matricula
                .map(|m| m.trim().to_string())
                .ok_or_else(|| missing("employee_matricula"))?,
            delivery_date: self.delivery_date.ok_or_else(|| missing("delivery_date"))?,
            delivered_by: actor.name.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn line_term_needs_employee_and_date() {
        let actor = Actor { id: None, name: "operator".to_string() };

        let request = CreateLineTerm {
            employee_matricula: Some("E001".to_string()),
            delivery_date: None,
        };
        assert!(matches!(request.into_new(&actor), Err(AppError::Validation(_))));

        let request = CreateLineTerm {
            employee_matricula: Some(" E001 ".to_string()),
            delivery_date: NaiveDate::from_ymd_opt(2024, 4, 1),
        };
        let new = request.into_new(&actor).unwrap();
        assert_eq!(new.employee_matricula, "E001");
        assert_eq!(new.delivered_by, "operator");
    }
}
