//! Device service

use validator::Validate;

use crate::{
    error::{AppError, AppResult},
    models::{
        audit::Actor,
        device::{CreateDevice, Device, UpdateDevice},
        enums::{DeviceCondition, DeviceStatus},
    },
    repository::Repository,
};

#[derive(Clone)]
pub struct DevicesService {
    repository: Repository,
}

/// `InMaintenance` is set and cleared by the maintenance workflow only
fn reject_maintenance_condition(condition: Option<DeviceCondition>) -> AppResult<()> {
    if condition == Some(DeviceCondition::InMaintenance) {
        return Err(AppError::Validation(
            "Condition InMaintenance is set by sending the device to maintenance".to_string(),
        ));
    }
    Ok(())
}

impl DevicesService {
    pub fn new(repository: Repository) -> Self {
        Self { repository }
    }

    pub async fn list(&self, status: Option<DeviceStatus>) -> AppResult<Vec<Device>> {
        self.repository.devices_list(status).await
    }

    /// Devices that can be sent to maintenance (no open custody, no open order)
    pub async fn eligible_for_maintenance(&self) -> AppResult<Vec<Device>> {
        self.repository.devices_eligible_for_maintenance().await
    }

    pub async fn get(&self, imei: &str) -> AppResult<Device> {
        self.repository.devices_get(imei).await
    }

    pub async fn create(&self, data: CreateDevice, actor: &Actor) -> AppResult<Device> {
        data.validate()?;
        reject_maintenance_condition(data.condition)?;
        let device = self.repository.devices_create(&data, actor).await?;
        tracing::info!(imei = %device.imei1, model = %device.model, "Device created");
        Ok(device)
    }

    pub async fn update(&self, imei: &str, data: UpdateDevice, actor: &Actor) -> AppResult<Device> {
        data.validate()?;
        reject_maintenance_condition(data.condition)?;
        self.repository.devices_update(imei, &data, actor).await
    }

    pub async fn delete(&self, imei: &str, actor: &Actor) -> AppResult<()> {
        self.repository.devices_delete(imei, actor).await?;
        tracing::info!(imei = %imei, actor = %actor.name, "Device deleted");
        Ok(())
    }
}
