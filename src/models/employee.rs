//! Employee model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use validator::Validate;

/// Employee record; `matricula` is the organization badge id and never changes
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Employee {
    pub matricula: String,
    pub name: String,
    pub position: String,
    pub email: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Create employee request
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateEmployee {
    #[validate(length(min = 1, max = 64, message = "Matricula is required"))]
    pub matricula: String,
    #[validate(length(min = 1, message = "Name is required"))]
    pub name: String,
    #[validate(length(min = 1, message = "Position is required"))]
    pub position: String,
    #[validate(email(message = "Invalid email format"))]
    pub email: Option<String>,
}

/// Update employee request (matricula is immutable)
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct UpdateEmployee {
    #[validate(length(min = 1, message = "Name cannot be empty"))]
    pub name: Option<String>,
    #[validate(length(min = 1, message = "Position cannot be empty"))]
    pub position: Option<String>,
    #[validate(email(message = "Invalid email format"))]
    pub email: Option<String>,
}
