//! Error types for SmartControl server

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;
use utoipa::ToSchema;

/// Application error codes exposed to API clients
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum ErrorCode {
    Failure = 1,
    DbFailure = 2,
    NotFound = 3,
    BadValue = 4,
    Duplicate = 5,
    DeviceAlreadyAssigned = 6,
    DeviceUnderMaintenance = 7,
    InvalidTransition = 8,
}

/// A recoverable violation of the ledger invariants.
///
/// Carries the id of the aggregate already holding the device so callers can
/// route the user straight to it.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(tag = "kind")]
pub enum Conflict {
    /// The device already has an open custody record
    #[error("Device is already assigned by custody record {conflicting_record_id}")]
    DeviceAlreadyAssigned { conflicting_record_id: i32 },
    /// The device already has an open maintenance order
    #[error("Device is under maintenance (order {conflicting_order_id})")]
    DeviceUnderMaintenance { conflicting_order_id: i32 },
}

/// State transitions the ledger refuses to perform
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum InvalidTransition {
    #[error("Custody record {record_id} has already been returned")]
    AlreadyReturned { record_id: i32 },

    #[error("Custody record {record_id} has not been returned yet")]
    NotReturned { record_id: i32 },

    #[error("Maintenance order {order_id} is already closed")]
    OrderAlreadyClosed { order_id: i32 },

    #[error("Maintenance order {order_id} is still open")]
    OrderStillOpen { order_id: i32 },

    #[error("Custody record {record_id} is still open")]
    OpenCustodyExists { record_id: i32 },

    #[error("Maintenance order {order_id} is still open for this device")]
    OpenMaintenanceExists { order_id: i32 },

    #[error("{resource} {id} has recorded history and cannot be deleted")]
    HistoryExists { resource: &'static str, id: String },

    #[error("Line {numero} is linked to device {device_imei}")]
    LineLinked { numero: String, device_imei: String },

    #[error("Line {numero} is not linked to any device")]
    LineNotLinked { numero: String },

    #[error("Line {numero} is cancelled and cannot be linked")]
    LineCancelled { numero: String },
}

/// Main application error type
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Duplicate: {0}")]
    Duplicate(String),

    #[error("Conflict: {0}")]
    Conflict(Conflict),

    #[error("Invalid transition: {0}")]
    InvalidTransition(#[from] InvalidTransition),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Internal server error: {0}")]
    Internal(String),
}

impl From<Conflict> for AppError {
    fn from(conflict: Conflict) -> Self {
        AppError::Conflict(conflict)
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(errors: validator::ValidationErrors) -> Self {
        AppError::Validation(errors.to_string())
    }
}

/// Error response body
#[derive(Serialize, ToSchema)]
pub struct ErrorResponse {
    pub code: u32,
    pub error: String,
    pub message: String,
    /// Present on 409 responses caused by a ledger conflict
    #[serde(skip_serializing_if = "Option::is_none")]
    pub conflict: Option<Conflict>,
}

impl AppError {
    fn parts(&self) -> (StatusCode, ErrorCode, String, Option<Conflict>) {
        match self {
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, ErrorCode::NotFound, msg.clone(), None),
            AppError::Validation(msg) => (StatusCode::BAD_REQUEST, ErrorCode::BadValue, msg.clone(), None),
            AppError::Duplicate(msg) => (StatusCode::CONFLICT, ErrorCode::Duplicate, msg.clone(), None),
            AppError::Conflict(conflict) => {
                let code = match conflict {
                    Conflict::DeviceAlreadyAssigned { .. } => ErrorCode::DeviceAlreadyAssigned,
                    Conflict::DeviceUnderMaintenance { .. } => ErrorCode::DeviceUnderMaintenance,
                };
                (StatusCode::CONFLICT, code, conflict.to_string(), Some(*conflict))
            }
            AppError::InvalidTransition(transition) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                ErrorCode::InvalidTransition,
                transition.to_string(),
                None,
            ),
            AppError::Database(e) => {
                tracing::error!("Database error: {:?}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ErrorCode::DbFailure,
                    "Database error".to_string(),
                    None,
                )
            }
            AppError::Internal(msg) => {
                tracing::error!("Internal error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ErrorCode::Failure,
                    "Internal server error".to_string(),
                    None,
                )
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message, conflict) = self.parts();

        let body = Json(ErrorResponse {
            code: code as u32,
            error: format!("{:?}", code),
            message,
            conflict,
        });

        (status, body).into_response()
    }
}

/// Result type alias for application operations
pub type AppResult<T> = Result<T, AppError>;
