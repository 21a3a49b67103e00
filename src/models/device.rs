//! Device model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

use super::enums::{DeviceCondition, DeviceStatus};

/// Device record with its currently linked line
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Device {
    pub imei1: String,
    pub imei2: Option<String>,
    pub model: String,
    /// Free-text notes (color, scratches, ...)
    pub notes: Option<String>,
    pub condition: DeviceCondition,
    /// Derived from open custody records and maintenance orders
    pub status: DeviceStatus,
    /// Number of the line currently inserted in the device
    pub line_numero: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Create device request
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateDevice {
    #[validate(length(min = 1, max = 32, message = "IMEI1 is required"))]
    pub imei1: String,
    #[validate(length(max = 32, message = "IMEI2 is too long"))]
    pub imei2: Option<String>,
    #[validate(length(min = 1, message = "Model is required"))]
    pub model: String,
    pub notes: Option<String>,
    /// Defaults to `New`
    pub condition: Option<DeviceCondition>,
}

/// Update device request (imei1 is immutable)
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct UpdateDevice {
    #[validate(length(max = 32, message = "IMEI2 is too long"))]
    pub imei2: Option<String>,
    #[validate(length(min = 1, message = "Model cannot be empty"))]
    pub model: Option<String>,
    pub notes: Option<String>,
    pub condition: Option<DeviceCondition>,
}

/// Query parameters for device listing
#[derive(Debug, Default, Deserialize, IntoParams, ToSchema)]
pub struct DeviceQuery {
    /// Only devices with this status
    pub status: Option<DeviceStatus>,
}

/// Request to link a line to a device
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct LinkLineRequest {
    #[validate(length(min = 1, message = "Line number is required"))]
    pub line_numero: String,
}
