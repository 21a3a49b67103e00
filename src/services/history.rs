//! History and audit projections

use crate::{
    error::AppResult,
    ledger,
    models::{
        audit::AuditEntry,
        custody::CustodyRecordListing,
        enums::AuditResource,
        history::DeviceHistoryEntry,
    },
    repository::Repository,
};

#[derive(Clone)]
pub struct HistoryService {
    repository: Repository,
}

impl HistoryService {
    pub fn new(repository: Repository) -> Self {
        Self { repository }
    }

    /// Chronological custody and maintenance timeline of a device
    pub async fn device(&self, imei: &str) -> AppResult<Vec<DeviceHistoryEntry>> {
        let (custody, maintenance) = self.repository.history_device_rows(imei).await?;
        Ok(ledger::device_timeline(custody, maintenance))
    }

    pub async fn employee(&self, matricula: &str) -> AppResult<Vec<CustodyRecordListing>> {
        self.repository.history_employee(matricula).await
    }

    pub async fn audit_trail(&self, resource: AuditResource, target_id: &str) -> AppResult<Vec<AuditEntry>> {
        self.repository.audit_trail(resource, target_id).await
    }
}
