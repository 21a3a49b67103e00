//! Line API endpoints

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};

use crate::{
    error::AppResult,
    models::line::{CreateLine, CreateLineTerm, Line, LineLink, LineTerm, UpdateLine},
    AppState,
};

use super::ActingUser;

/// List all lines
#[utoipa::path(
    get,
    path = "/lines",
    tag = "lines",
    responses(
        (status = 200, description = "Line list", body = Vec<Line>)
    )
)]
pub async fn list_lines(State(state): State<AppState>) -> AppResult<Json<Vec<Line>>> {
    let lines = state.services.lines.list().await?;
    Ok(Json(lines))
}

/// Get line by number
#[utoipa::path(
    get,
    path = "/lines/{numero}",
    tag = "lines",
    params(("numero" = String, Path, description = "Line number")),
    responses(
        (status = 200, description = "Line details", body = Line),
        (status = 404, description = "Line not found", body = crate::error::ErrorResponse)
    )
)]
pub async fn get_line(State(state): State<AppState>, Path(numero): Path<String>) -> AppResult<Json<Line>> {
    let line = state.services.lines.get(&numero).await?;
    Ok(Json(line))
}

/// Register a line
#[utoipa::path(
    post,
    path = "/lines",
    tag = "lines",
    request_body = CreateLine,
    responses(
        (status = 201, description = "Line created", body = Line),
        (status = 409, description = "Line already registered", body = crate::error::ErrorResponse)
    )
)]
pub async fn create_line(
    State(state): State<AppState>,
    ActingUser(actor): ActingUser,
    Json(data): Json<CreateLine>,
) -> AppResult<(StatusCode, Json<Line>)> {
    let line = state.services.lines.create(data, &actor).await?;
    Ok((StatusCode::CREATED, Json(line)))
}

/// Update line
#[utoipa::path(
    put,
    path = "/lines/{numero}",
    tag = "lines",
    params(("numero" = String, Path, description = "Line number")),
    request_body = UpdateLine,
    responses(
        (status = 200, description = "Line updated", body = Line),
        (status = 422, description = "A linked line cannot be cancelled", body = crate::error::ErrorResponse)
    )
)]
pub async fn update_line(
    State(state): State<AppState>,
    ActingUser(actor): ActingUser,
    Path(numero): Path<String>,
    Json(data): Json<UpdateLine>,
) -> AppResult<Json<Line>> {
    let line = state.services.lines.update(&numero, data, &actor).await?;
    Ok(Json(line))
}

/// Delete line
#[utoipa::path(
    delete,
    path = "/lines/{numero}",
    tag = "lines",
    params(("numero" = String, Path, description = "Line number")),
    responses(
        (status = 204, description = "Line deleted"),
        (status = 422, description = "Line is linked to a device", body = crate::error::ErrorResponse)
    )
)]
pub async fn delete_line(
    State(state): State<AppState>,
    ActingUser(actor): ActingUser,
    Path(numero): Path<String>,
) -> AppResult<StatusCode> {
    state.services.lines.delete(&numero, &actor).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Take a line out of its device
#[utoipa::path(
    post,
    path = "/lines/{numero}/unlink",
    tag = "lines",
    params(("numero" = String, Path, description = "Line number")),
    responses(
        (status = 200, description = "Line unlinked", body = Line),
        (status = 422, description = "Line is not linked", body = crate::error::ErrorResponse)
    )
)]
pub async fn unlink_line(
    State(state): State<AppState>,
    ActingUser(actor): ActingUser,
    Path(numero): Path<String>,
) -> AppResult<Json<Line>> {
    let line = state.services.lines.unlink(&numero, &actor).await?;
    Ok(Json(line))
}

/// Devices a line has been inserted into, oldest first
#[utoipa::path(
    get,
    path = "/lines/{numero}/history",
    tag = "lines",
    params(("numero" = String, Path, description = "Line number")),
    responses(
        (status = 200, description = "Link history", body = Vec<LineLink>)
    )
)]
pub async fn line_history(
    State(state): State<AppState>,
    Path(numero): Path<String>,
) -> AppResult<Json<Vec<LineLink>>> {
    let history = state.services.lines.history(&numero).await?;
    Ok(Json(history))
}

/// Hand a line over to an employee
#[utoipa::path(
    post,
    path = "/lines/{numero}/terms",
    tag = "lines",
    params(("numero" = String, Path, description = "Line number")),
    request_body = CreateLineTerm,
    responses(
        (status = 201, description = "Term created, previous term deactivated", body = LineTerm),
        (status = 404, description = "Line or employee not found", body = crate::error::ErrorResponse),
        (status = 422, description = "Line is cancelled", body = crate::error::ErrorResponse)
    )
)]
pub async fn create_line_term(
    State(state): State<AppState>,
    ActingUser(actor): ActingUser,
    Path(numero): Path<String>,
    Json(request): Json<CreateLineTerm>,
) -> AppResult<(StatusCode, Json<LineTerm>)> {
    let term = state.services.lines.create_term(&numero, request, &actor).await?;
    Ok((StatusCode::CREATED, Json(term)))
}

/// Terms of a line, newest first
#[utoipa::path(
    get,
    path = "/lines/{numero}/terms",
    tag = "lines",
    params(("numero" = String, Path, description = "Line number")),
    responses(
        (status = 200, description = "Line terms", body = Vec<LineTerm>)
    )
)]
pub async fn list_line_terms(
    State(state): State<AppState>,
    Path(numero): Path<String>,
) -> AppResult<Json<Vec<LineTerm>>> {
    let terms = state.services.lines.terms(&numero).await?;
    Ok(Json(terms))
}
