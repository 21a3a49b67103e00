//! OpenAPI documentation

use axum::Router;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::api::{audit, devices, employees, health, lines, maintenance, records};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "SmartControl API",
        version = "1.0.0",
        description = "Mobile device custody and maintenance ledger REST API",
        license(name = "AGPL-3.0", url = "https://www.gnu.org/licenses/agpl-3.0.html")
    ),
    servers(
        (url = "/api/v1", description = "API v1")
    ),
    paths(
        // Health
        health::health_check,
        health::readiness_check,
        // Employees
        employees::list_employees,
        employees::get_employee,
        employees::create_employee,
        employees::update_employee,
        employees::delete_employee,
        employees::employee_history,
        // Devices
        devices::list_devices,
        devices::eligible_for_maintenance,
        devices::get_device,
        devices::create_device,
        devices::update_device,
        devices::delete_device,
        devices::device_history,
        devices::link_line,
        // Lines
        lines::list_lines,
        lines::get_line,
        lines::create_line,
        lines::update_line,
        lines::delete_line,
        lines::unlink_line,
        lines::line_history,
        lines::create_line_term,
        lines::list_line_terms,
        // Custody records
        records::list_records,
        records::get_record,
        records::check_out,
        records::return_device,
        records::amend_return,
        records::update_attachments,
        records::delete_record,
        // Maintenance
        maintenance::list_orders,
        maintenance::get_order,
        maintenance::send_to_maintenance,
        maintenance::close_order,
        maintenance::amend_order,
        maintenance::delete_order,
        // Audit
        audit::audit_trail,
    ),
    components(
        schemas(
            // Enums
            crate::models::enums::DeviceCondition,
            crate::models::enums::DeviceStatus,
            crate::models::enums::LineStatus,
            crate::models::enums::CustodyStatus,
            crate::models::enums::MaintenanceStatus,
            crate::models::enums::MaintenanceOutcome,
            crate::models::enums::AuditAction,
            crate::models::enums::AuditResource,
            // Employees
            crate::models::employee::Employee,
            crate::models::employee::CreateEmployee,
            crate::models::employee::UpdateEmployee,
            // Devices
            crate::models::device::Device,
            crate::models::device::CreateDevice,
            crate::models::device::UpdateDevice,
            crate::models::device::DeviceQuery,
            crate::models::device::LinkLineRequest,
            // Lines
            crate::models::line::Line,
            crate::models::line::CreateLine,
            crate::models::line::UpdateLine,
            crate::models::line::LineLink,
            crate::models::line::LineTerm,
            crate::models::line::CreateLineTerm,
            // Custody records
            crate::models::custody::CustodyRecord,
            crate::models::custody::CustodyRecordListing,
            crate::models::custody::Delivery,
            crate::models::custody::ReturnInfo,
            crate::models::custody::CheckOutRequest,
            crate::models::custody::CheckOutOutcome,
            crate::models::custody::ReturnRequest,
            crate::models::custody::AmendReturnRequest,
            crate::models::custody::UpdateAttachments,
            crate::models::custody::RecordFilter,
            crate::models::custody::RecordSort,
            crate::models::custody::SortDirection,
            crate::models::custody::RecordPage,
            // Maintenance
            crate::models::maintenance::MaintenanceOrder,
            crate::models::maintenance::SendToMaintenanceRequest,
            crate::models::maintenance::CloseMaintenanceRequest,
            crate::models::maintenance::AmendMaintenanceRequest,
            crate::models::maintenance::DeleteOrderQuery,
            // History and audit
            crate::models::history::DeviceHistoryEntry,
            crate::models::audit::AuditEntry,
            // Health
            health::HealthResponse,
            // Errors
            crate::error::Conflict,
            crate::error::ErrorResponse,
        )
    ),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "employees", description = "Employee master data"),
        (name = "devices", description = "Device master data, history and line linking"),
        (name = "lines", description = "Phone lines and their link history"),
        (name = "records", description = "Custody records: check-out and return"),
        (name = "maintenance", description = "Maintenance orders"),
        (name = "audit", description = "Audit trail")
    )
)]
pub struct ApiDoc;

/// Create the OpenAPI documentation router
pub fn create_openapi_router() -> Router {
    Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
}
