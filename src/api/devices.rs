//! Device API endpoints

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};

use crate::{
    error::AppResult,
    models::{
        device::{CreateDevice, Device, DeviceQuery, LinkLineRequest, UpdateDevice},
        history::DeviceHistoryEntry,
        line::Line,
    },
    AppState,
};

use super::ActingUser;

/// List devices
#[utoipa::path(
    get,
    path = "/devices",
    tag = "devices",
    params(DeviceQuery),
    responses(
        (status = 200, description = "Device list", body = Vec<Device>)
    )
)]
pub async fn list_devices(
    State(state): State<AppState>,
    Query(query): Query<DeviceQuery>,
) -> AppResult<Json<Vec<Device>>> {
    let devices = state.services.devices.list(query.status).await?;
    Ok(Json(devices))
}

/// Devices that can be sent to maintenance
#[utoipa::path(
    get,
    path = "/devices/eligible-for-maintenance",
    tag = "devices",
    responses(
        (status = 200, description = "Available devices", body = Vec<Device>)
    )
)]
pub async fn eligible_for_maintenance(State(state): State<AppState>) -> AppResult<Json<Vec<Device>>> {
    let devices = state.services.devices.eligible_for_maintenance().await?;
    Ok(Json(devices))
}

/// Get device by IMEI
#[utoipa::path(
    get,
    path = "/devices/{imei}",
    tag = "devices",
    params(("imei" = String, Path, description = "Primary IMEI")),
    responses(
        (status = 200, description = "Device details", body = Device),
        (status = 404, description = "Device not found", body = crate::error::ErrorResponse)
    )
)]
pub async fn get_device(State(state): State<AppState>, Path(imei): Path<String>) -> AppResult<Json<Device>> {
    let device = state.services.devices.get(&imei).await?;
    Ok(Json(device))
}

/// Register a device
#[utoipa::path(
    post,
    path = "/devices",
    tag = "devices",
    request_body = CreateDevice,
    responses(
        (status = 201, description = "Device created", body = Device),
        (status = 409, description = "IMEI already registered", body = crate::error::ErrorResponse)
    )
)]
pub async fn create_device(
    State(state): State<AppState>,
    ActingUser(actor): ActingUser,
    Json(data): Json<CreateDevice>,
) -> AppResult<(StatusCode, Json<Device>)> {
    let device = state.services.devices.create(data, &actor).await?;
    Ok((StatusCode::CREATED, Json(device)))
}

/// Update device master data
#[utoipa::path(
    put,
    path = "/devices/{imei}",
    tag = "devices",
    params(("imei" = String, Path, description = "Primary IMEI")),
    request_body = UpdateDevice,
    responses(
        (status = 200, description = "Device updated", body = Device),
        (status = 422, description = "Condition is owned by an open maintenance order", body = crate::error::ErrorResponse)
    )
)]
pub async fn update_device(
    State(state): State<AppState>,
    ActingUser(actor): ActingUser,
    Path(imei): Path<String>,
    Json(data): Json<UpdateDevice>,
) -> AppResult<Json<Device>> {
    let device = state.services.devices.update(&imei, data, &actor).await?;
    Ok(Json(device))
}

/// Delete device
#[utoipa::path(
    delete,
    path = "/devices/{imei}",
    tag = "devices",
    params(("imei" = String, Path, description = "Primary IMEI")),
    responses(
        (status = 204, description = "Device deleted"),
        (status = 422, description = "Device is in use, in repair, carries a line or has history", body = crate::error::ErrorResponse)
    )
)]
pub async fn delete_device(
    State(state): State<AppState>,
    ActingUser(actor): ActingUser,
    Path(imei): Path<String>,
) -> AppResult<StatusCode> {
    state.services.devices.delete(&imei, &actor).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Custody and maintenance timeline of a device
#[utoipa::path(
    get,
    path = "/devices/{imei}/history",
    tag = "devices",
    params(("imei" = String, Path, description = "Primary IMEI")),
    responses(
        (status = 200, description = "Chronological history", body = Vec<DeviceHistoryEntry>),
        (status = 404, description = "Device not found", body = crate::error::ErrorResponse)
    )
)]
pub async fn device_history(
    State(state): State<AppState>,
    Path(imei): Path<String>,
) -> AppResult<Json<Vec<DeviceHistoryEntry>>> {
    let history = state.services.history.device(&imei).await?;
    Ok(Json(history))
}

/// Insert a line into the device
#[utoipa::path(
    post,
    path = "/devices/{imei}/line",
    tag = "devices",
    params(("imei" = String, Path, description = "Primary IMEI")),
    request_body = LinkLineRequest,
    responses(
        (status = 200, description = "Line linked", body = Line),
        (status = 409, description = "Device is under maintenance", body = crate::error::ErrorResponse),
        (status = 422, description = "Line is cancelled", body = crate::error::ErrorResponse)
    )
)]
pub async fn link_line(
    State(state): State<AppState>,
    ActingUser(actor): ActingUser,
    Path(imei): Path<String>,
    Json(request): Json<LinkLineRequest>,
) -> AppResult<Json<Line>> {
    let line = state.services.lines.link(&imei, request, &actor).await?;
    Ok(Json(line))
}
