//! Employee API endpoints

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};

use crate::{
    error::AppResult,
    models::{
        custody::CustodyRecordListing,
        employee::{CreateEmployee, Employee, UpdateEmployee},
    },
    AppState,
};

use super::ActingUser;

/// List all employees
#[utoipa::path(
    get,
    path = "/employees",
    tag = "employees",
    responses(
        (status = 200, description = "Employee list", body = Vec<Employee>)
    )
)]
pub async fn list_employees(State(state): State<AppState>) -> AppResult<Json<Vec<Employee>>> {
    let employees = state.services.employees.list().await?;
    Ok(Json(employees))
}

/// Get employee by matricula
#[utoipa::path(
    get,
    path = "/employees/{matricula}",
    tag = "employees",
    params(("matricula" = String, Path, description = "Employee badge id")),
    responses(
        (status = 200, description = "Employee details", body = Employee),
        (status = 404, description = "Employee not found", body = crate::error::ErrorResponse)
    )
)]
pub async fn get_employee(
    State(state): State<AppState>,
    Path(matricula): Path<String>,
) -> AppResult<Json<Employee>> {
    let employee = state.services.employees.get(&matricula).await?;
    Ok(Json(employee))
}

/// Create employee
#[utoipa::path(
    post,
    path = "/employees",
    tag = "employees",
    request_body = CreateEmployee,
    responses(
        (status = 201, description = "Employee created", body = Employee),
        (status = 400, description = "Invalid payload", body = crate::error::ErrorResponse),
        (status = 409, description = "Matricula already registered", body = crate::error::ErrorResponse)
    )
)]
pub async fn create_employee(
    State(state): State<AppState>,
    ActingUser(actor): ActingUser,
    Json(data): Json<CreateEmployee>,
) -> AppResult<(StatusCode, Json<Employee>)> {
    let employee = state.services.employees.create(data, &actor).await?;
    Ok((StatusCode::CREATED, Json(employee)))
}

/// Update employee
#[utoipa::path(
    put,
    path = "/employees/{matricula}",
    tag = "employees",
    params(("matricula" = String, Path, description = "Employee badge id")),
    request_body = UpdateEmployee,
    responses(
        (status = 200, description = "Employee updated", body = Employee)
    )
)]
pub async fn update_employee(
    State(state): State<AppState>,
    ActingUser(actor): ActingUser,
    Path(matricula): Path<String>,
    Json(data): Json<UpdateEmployee>,
) -> AppResult<Json<Employee>> {
    let employee = state.services.employees.update(&matricula, data, &actor).await?;
    Ok(Json(employee))
}

/// Delete employee
#[utoipa::path(
    delete,
    path = "/employees/{matricula}",
    tag = "employees",
    params(("matricula" = String, Path, description = "Employee badge id")),
    responses(
        (status = 204, description = "Employee deleted"),
        (status = 422, description = "Employee holds a device or has custody history", body = crate::error::ErrorResponse)
    )
)]
pub async fn delete_employee(
    State(state): State<AppState>,
    ActingUser(actor): ActingUser,
    Path(matricula): Path<String>,
) -> AppResult<StatusCode> {
    state.services.employees.delete(&matricula, &actor).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Custody records of an employee, oldest first
#[utoipa::path(
    get,
    path = "/employees/{matricula}/history",
    tag = "employees",
    params(("matricula" = String, Path, description = "Employee badge id")),
    responses(
        (status = 200, description = "Custody history", body = Vec<CustodyRecordListing>)
    )
)]
pub async fn employee_history(
    State(state): State<AppState>,
    Path(matricula): Path<String>,
) -> AppResult<Json<Vec<CustodyRecordListing>>> {
    let history = state.services.history.employee(&matricula).await?;
    Ok(Json(history))
}
