//! Business logic services

pub mod custody;
pub mod devices;
pub mod employees;
pub mod history;
pub mod lines;
pub mod maintenance;

use crate::{config::LedgerConfig, error::AppResult, repository::Repository};

/// Container for all services
#[derive(Clone)]
pub struct Services {
    pub employees: employees::EmployeesService,
    pub devices: devices::DevicesService,
    pub lines: lines::LinesService,
    pub custody: custody::CustodyService,
    pub maintenance: maintenance::MaintenanceService,
    pub history: history::HistoryService,
    repository: Repository,
}

impl Services {
    /// Create all services with the given repository
    pub fn new(repository: Repository, ledger: LedgerConfig) -> Self {
        Self {
            employees: employees::EmployeesService::new(repository.clone()),
            devices: devices::DevicesService::new(repository.clone()),
            lines: lines::LinesService::new(repository.clone()),
            custody: custody::CustodyService::new(repository.clone(), ledger),
            maintenance: maintenance::MaintenanceService::new(repository.clone()),
            history: history::HistoryService::new(repository.clone()),
            repository,
        }
    }

    /// Whether the database answers
    pub async fn ready(&self) -> AppResult<()> {
        self.repository.ping().await
    }
}
