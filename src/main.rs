//! SmartControl Server - Asset Custody and Maintenance Ledger
//!
//! REST API server tracking device custody, phone lines and repairs.

use anyhow::Context;
use axum::{
    routing::{get, post, put},
    Router,
};
use sqlx::postgres::PgPoolOptions;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt};

use smartcontrol_server::{
    api,
    config::{AppConfig, LoggingConfig},
    repository::Repository,
    services::Services,
    AppState,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file
    dotenvy::dotenv().ok();

    // Load configuration
    let config = AppConfig::load().context("Failed to load configuration")?;

    // Keep the guard alive so buffered file logs are flushed on exit
    let _log_guard = init_tracing(&config.logging);

    tracing::info!("Starting SmartControl Server v{}", env!("CARGO_PKG_VERSION"));

    // Create database connection pool
    let pool = PgPoolOptions::new()
        .max_connections(config.database.max_connections)
        .min_connections(config.database.min_connections)
        .acquire_timeout(Duration::from_secs(config.database.acquire_timeout_secs))
        .connect(&config.database.url)
        .await
        .context("Failed to connect to database")?;

    tracing::info!("Connected to database");

    // Run migrations
    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .context("Failed to run database migrations")?;

    tracing::info!("Database migrations completed");

    let addr = SocketAddr::new(
        config.server.host.parse().context("Invalid host address")?,
        config.server.port,
    );

    // Create repository and services
    let repository = Repository::new(pool);
    let services = Services::new(repository, config.ledger.clone());

    // Create application state
    let state = AppState {
        config: Arc::new(config),
        services: Arc::new(services),
    };

    // Build router
    let app = create_router(state);

    tracing::info!("Server listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Install the global subscriber: console in pretty or JSON form, plus an
/// optional daily rolling JSON file
fn init_tracing(logging: &LoggingConfig) -> Option<WorkerGuard> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| format!("smartcontrol_server={},tower_http=debug", logging.level).into());

    let json = logging.format.eq_ignore_ascii_case("json");

    let (file_writer, guard) = match logging.directory.as_deref() {
        Some(directory) => {
            let appender = tracing_appender::rolling::daily(directory, "smartcontrol-server.log");
            let (writer, guard) = tracing_appender::non_blocking(appender);
            (Some(writer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with((!json).then(fmt::layer))
        .with(json.then(|| fmt::layer().json()))
        .with(file_writer.map(|writer| fmt::layer().json().with_ansi(false).with_writer(writer)))
        .init();

    guard
}

/// Create the application router with all routes
fn create_router(state: AppState) -> Router {
    // CORS configuration
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // API v1 routes
    let api_v1 = Router::new()
        // Health check
        .route("/health", get(api::health::health_check))
        .route("/ready", get(api::health::readiness_check))
        // Employees
        .route(
            "/employees",
            get(api::employees::list_employees).post(api::employees::create_employee),
        )
        .route(
            "/employees/:matricula",
            get(api::employees::get_employee)
                .put(api::employees::update_employee)
                .delete(api::employees::delete_employee),
        )
        .route("/employees/:matricula/history", get(api::employees::employee_history))
        // Devices
        .route(
            "/devices",
            get(api::devices::list_devices).post(api::devices::create_device),
        )
        .route(
            "/devices/eligible-for-maintenance",
            get(api::devices::eligible_for_maintenance),
        )
        .route(
            "/devices/:imei",
            get(api::devices::get_device)
                .put(api::devices::update_device)
                .delete(api::devices::delete_device),
        )
        .route("/devices/:imei/history", get(api::devices::device_history))
        .route("/devices/:imei/line", post(api::devices::link_line))
        // Lines
        .route("/lines", get(api::lines::list_lines).post(api::lines::create_line))
        .route(
            "/lines/:numero",
            get(api::lines::get_line)
                .put(api::lines::update_line)
                .delete(api::lines::delete_line),
        )
        .route("/lines/:numero/unlink", post(api::lines::unlink_line))
        .route("/lines/:numero/history", get(api::lines::line_history))
        .route(
            "/lines/:numero/terms",
            get(api::lines::list_line_terms).post(api::lines::create_line_term),
        )
        // Custody records
        .route("/records", get(api::records::list_records).post(api::records::check_out))
        .route(
            "/records/:id",
            get(api::records::get_record).delete(api::records::delete_record),
        )
        .route(
            "/records/:id/return",
            post(api::records::return_device).put(api::records::amend_return),
        )
        .route("/records/:id/attachments", put(api::records::update_attachments))
        // Maintenance
        .route(
            "/maintenance",
            get(api::maintenance::list_orders).post(api::maintenance::send_to_maintenance),
        )
        .route(
            "/maintenance/:id",
            get(api::maintenance::get_order)
                .put(api::maintenance::amend_order)
                .delete(api::maintenance::delete_order),
        )
        .route("/maintenance/:id/close", post(api::maintenance::close_order))
        // Audit
        .route("/audit/:resource/:target_id", get(api::audit::audit_trail))
        .with_state(state.clone());

    // OpenAPI documentation
    let openapi = api::openapi::create_openapi_router();

    Router::new()
        .nest("/api/v1", api_v1)
        .merge(openapi)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
}
