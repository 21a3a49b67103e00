//! Maintenance workflow service

use crate::{
    error::AppResult,
    models::{
        audit::Actor,
        maintenance::{
            AmendMaintenanceRequest, CloseMaintenanceRequest, MaintenanceOrder, MaintenanceQuery,
            SendToMaintenanceRequest,
        },
    },
    repository::Repository,
};

#[derive(Clone)]
pub struct MaintenanceService {
    repository: Repository,
}

impl MaintenanceService {
    pub fn new(repository: Repository) -> Self {
        Self { repository }
    }

    pub async fn list(&self, query: MaintenanceQuery) -> AppResult<Vec<MaintenanceOrder>> {
        self.repository.maintenance_list(&query).await
    }

    pub async fn get(&self, id: i32) -> AppResult<MaintenanceOrder> {
        self.repository.maintenance_get(id).await
    }

    pub async fn send(&self, request: SendToMaintenanceRequest, actor: &Actor) -> AppResult<MaintenanceOrder> {
        let new = request.into_new(actor)?;
        self.repository.maintenance_send(&new, actor).await
    }

    pub async fn close(
        &self,
        id: i32,
        request: CloseMaintenanceRequest,
        actor: &Actor,
    ) -> AppResult<MaintenanceOrder> {
        let close = request.into_close(actor)?;
        self.repository.maintenance_close(id, &close, actor).await
    }

    pub async fn amend(
        &self,
        id: i32,
        request: AmendMaintenanceRequest,
        actor: &Actor,
    ) -> AppResult<MaintenanceOrder> {
        request.validate_fields()?;
        self.repository.maintenance_amend(id, &request, actor).await
    }

    pub async fn delete(&self, id: i32, reason: Option<String>, actor: &Actor) -> AppResult<()> {
        let reason = reason.map(|r| r.trim().to_string()).filter(|r| !r.is_empty());
        self.repository.maintenance_delete(id, reason.as_deref(), actor).await
    }
}
