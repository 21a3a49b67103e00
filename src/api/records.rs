//! Custody record API endpoints

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};

use crate::{
    error::AppResult,
    models::custody::{
        AmendReturnRequest, CheckOutOutcome, CheckOutRequest, CustodyRecord, CustodyRecordListing,
        DeleteRecordQuery, RecordPage, RecordQuery, ReturnRequest, UpdateAttachments,
    },
    AppState,
};

use super::ActingUser;

/// List custody records
#[utoipa::path(
    get,
    path = "/records",
    tag = "records",
    params(RecordQuery),
    responses(
        (status = 200, description = "Page of records", body = RecordPage)
    )
)]
pub async fn list_records(
    State(state): State<AppState>,
    Query(query): Query<RecordQuery>,
) -> AppResult<Json<RecordPage>> {
    let page = state.services.custody.list(query).await?;
    Ok(Json(page))
}

/// Get a custody record
#[utoipa::path(
    get,
    path = "/records/{id}",
    tag = "records",
    params(("id" = i32, Path, description = "Record ID")),
    responses(
        (status = 200, description = "Record details", body = CustodyRecordListing),
        (status = 404, description = "Record not found", body = crate::error::ErrorResponse)
    )
)]
pub async fn get_record(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> AppResult<Json<CustodyRecordListing>> {
    let record = state.services.custody.get(id).await?;
    Ok(Json(record))
}

/// Check a device out to an employee
#[utoipa::path(
    post,
    path = "/records",
    tag = "records",
    request_body = CheckOutRequest,
    responses(
        (status = 201, description = "Record created", body = CheckOutOutcome),
        (status = 200, description = "Duplicate submission, existing record returned", body = CheckOutOutcome),
        (status = 400, description = "Missing field", body = crate::error::ErrorResponse),
        (status = 404, description = "Employee or device not found", body = crate::error::ErrorResponse),
        (status = 409, description = "Device already assigned or under maintenance", body = crate::error::ErrorResponse)
    )
)]
pub async fn check_out(
    State(state): State<AppState>,
    ActingUser(actor): ActingUser,
    Json(request): Json<CheckOutRequest>,
) -> AppResult<(StatusCode, Json<CheckOutOutcome>)> {
    let outcome = state.services.custody.check_out(request, &actor).await?;
    let status = if outcome.created {
        StatusCode::CREATED
    } else {
        StatusCode::OK
    };
    Ok((status, Json(outcome)))
}

/// Record the return of a device
#[utoipa::path(
    post,
    path = "/records/{id}/return",
    tag = "records",
    params(("id" = i32, Path, description = "Record ID")),
    request_body = ReturnRequest,
    responses(
        (status = 200, description = "Device returned", body = CustodyRecord),
        (status = 422, description = "Record already returned", body = crate::error::ErrorResponse)
    )
)]
pub async fn return_device(
    State(state): State<AppState>,
    ActingUser(actor): ActingUser,
    Path(id): Path<i32>,
    Json(request): Json<ReturnRequest>,
) -> AppResult<Json<CustodyRecord>> {
    let record = state.services.custody.return_device(id, request, &actor).await?;
    Ok(Json(record))
}

/// Correct the return details of a returned record
#[utoipa::path(
    put,
    path = "/records/{id}/return",
    tag = "records",
    params(("id" = i32, Path, description = "Record ID")),
    request_body = AmendReturnRequest,
    responses(
        (status = 200, description = "Return amended", body = CustodyRecord),
        (status = 422, description = "Record not returned yet", body = crate::error::ErrorResponse)
    )
)]
pub async fn amend_return(
    State(state): State<AppState>,
    ActingUser(actor): ActingUser,
    Path(id): Path<i32>,
    Json(request): Json<AmendReturnRequest>,
) -> AppResult<Json<CustodyRecord>> {
    let record = state.services.custody.amend_return(id, request, &actor).await?;
    Ok(Json(record))
}

/// Set attachment URLs of a record
#[utoipa::path(
    put,
    path = "/records/{id}/attachments",
    tag = "records",
    params(("id" = i32, Path, description = "Record ID")),
    request_body = UpdateAttachments,
    responses(
        (status = 200, description = "Attachments updated", body = CustodyRecord)
    )
)]
pub async fn update_attachments(
    State(state): State<AppState>,
    ActingUser(actor): ActingUser,
    Path(id): Path<i32>,
    Json(attachments): Json<UpdateAttachments>,
) -> AppResult<Json<CustodyRecord>> {
    let record = state.services.custody.update_attachments(id, attachments, &actor).await?;
    Ok(Json(record))
}

/// Administrative delete of a record
#[utoipa::path(
    delete,
    path = "/records/{id}",
    tag = "records",
    params(
        ("id" = i32, Path, description = "Record ID"),
        DeleteRecordQuery
    ),
    responses(
        (status = 204, description = "Record deleted")
    )
)]
pub async fn delete_record(
    State(state): State<AppState>,
    ActingUser(actor): ActingUser,
    Path(id): Path<i32>,
    Query(query): Query<DeleteRecordQuery>,
) -> AppResult<StatusCode> {
    state.services.custody.delete(id, query.reason, &actor).await?;
    Ok(StatusCode::NO_CONTENT)
}
