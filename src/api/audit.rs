//! Audit trail endpoint

use axum::{
    extract::{Path, State},
    Json,
};

use crate::{
    error::{AppError, AppResult},
    models::{audit::AuditEntry, enums::AuditResource},
    AppState,
};

/// Audit entries of a resource, newest first
#[utoipa::path(
    get,
    path = "/audit/{resource}/{target_id}",
    tag = "audit",
    params(
        ("resource" = String, Path, description = "employees, devices, lines, records or maintenance"),
        ("target_id" = String, Path, description = "Identifier of the resource")
    ),
    responses(
        (status = 200, description = "Audit trail", body = Vec<AuditEntry>),
        (status = 400, description = "Unknown resource", body = crate::error::ErrorResponse)
    )
)]
pub async fn audit_trail(
    State(state): State<AppState>,
    Path((resource, target_id)): Path<(String, String)>,
) -> AppResult<Json<Vec<AuditEntry>>> {
    let resource: AuditResource = resource.parse().map_err(AppError::Validation)?;
    let entries = state.services.history.audit_trail(resource, &target_id).await?;
    Ok(Json(entries))
}
