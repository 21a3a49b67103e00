//! Maintenance order API endpoints

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};

use crate::{
    error::AppResult,
    models::maintenance::{
        AmendMaintenanceRequest, CloseMaintenanceRequest, DeleteOrderQuery, MaintenanceOrder,
        MaintenanceQuery, SendToMaintenanceRequest,
    },
    AppState,
};

use super::ActingUser;

/// List maintenance orders
#[utoipa::path(
    get,
    path = "/maintenance",
    tag = "maintenance",
    params(MaintenanceQuery),
    responses(
        (status = 200, description = "Maintenance orders", body = Vec<MaintenanceOrder>)
    )
)]
pub async fn list_orders(
    State(state): State<AppState>,
    Query(query): Query<MaintenanceQuery>,
) -> AppResult<Json<Vec<MaintenanceOrder>>> {
    let orders = state.services.maintenance.list(query).await?;
    Ok(Json(orders))
}

/// Get maintenance order
#[utoipa::path(
    get,
    path = "/maintenance/{id}",
    tag = "maintenance",
    params(("id" = i32, Path, description = "Order ID")),
    responses(
        (status = 200, description = "Order details", body = MaintenanceOrder),
        (status = 404, description = "Order not found", body = crate::error::ErrorResponse)
    )
)]
pub async fn get_order(State(state): State<AppState>, Path(id): Path<i32>) -> AppResult<Json<MaintenanceOrder>> {
    let order = state.services.maintenance.get(id).await?;
    Ok(Json(order))
}

/// Send a device to maintenance
#[utoipa::path(
    post,
    path = "/maintenance",
    tag = "maintenance",
    request_body = SendToMaintenanceRequest,
    responses(
        (status = 201, description = "Order opened", body = MaintenanceOrder),
        (status = 409, description = "Device in custody or already in repair", body = crate::error::ErrorResponse)
    )
)]
pub async fn send_to_maintenance(
    State(state): State<AppState>,
    ActingUser(actor): ActingUser,
    Json(request): Json<SendToMaintenanceRequest>,
) -> AppResult<(StatusCode, Json<MaintenanceOrder>)> {
    let order = state.services.maintenance.send(request, &actor).await?;
    Ok((StatusCode::CREATED, Json(order)))
}

/// Close a maintenance order
#[utoipa::path(
    post,
    path = "/maintenance/{id}/close",
    tag = "maintenance",
    params(("id" = i32, Path, description = "Order ID")),
    request_body = CloseMaintenanceRequest,
    responses(
        (status = 200, description = "Order closed", body = MaintenanceOrder),
        (status = 422, description = "Order already closed", body = crate::error::ErrorResponse)
    )
)]
pub async fn close_order(
    State(state): State<AppState>,
    ActingUser(actor): ActingUser,
    Path(id): Path<i32>,
    Json(request): Json<CloseMaintenanceRequest>,
) -> AppResult<Json<MaintenanceOrder>> {
    let order = state.services.maintenance.close(id, request, &actor).await?;
    Ok(Json(order))
}

/// Correct a closed maintenance order
#[utoipa::path(
    put,
    path = "/maintenance/{id}",
    tag = "maintenance",
    params(("id" = i32, Path, description = "Order ID")),
    request_body = AmendMaintenanceRequest,
    responses(
        (status = 200, description = "Order amended", body = MaintenanceOrder),
        (status = 422, description = "Order still open", body = crate::error::ErrorResponse)
    )
)]
pub async fn amend_order(
    State(state): State<AppState>,
    ActingUser(actor): ActingUser,
    Path(id): Path<i32>,
    Json(request): Json<AmendMaintenanceRequest>,
) -> AppResult<Json<MaintenanceOrder>> {
    let order = state.services.maintenance.amend(id, request, &actor).await?;
    Ok(Json(order))
}

/// Administrative delete of a maintenance order
#[utoipa::path(
    delete,
    path = "/maintenance/{id}",
    tag = "maintenance",
    params(
        ("id" = i32, Path, description = "Order ID"),
        DeleteOrderQuery
    ),
    responses(
        (status = 204, description = "Order deleted"),
        (status = 404, description = "Order not found", body = crate::error::ErrorResponse)
    )
)]
pub async fn delete_order(
    State(state): State<AppState>,
    ActingUser(actor): ActingUser,
    Path(id): Path<i32>,
    Query(query): Query<DeleteOrderQuery>,
) -> AppResult<StatusCode> {
    state.services.maintenance.delete(id, query.reason, &actor).await?;
    Ok(StatusCode::NO_CONTENT)
}
