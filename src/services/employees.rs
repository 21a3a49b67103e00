//! Employee service

use validator::Validate;

use crate::{
    error::AppResult,
    models::{
        audit::Actor,
        employee::{CreateEmployee, Employee, UpdateEmployee},
    },
    repository::Repository,
};

#[derive(Clone)]
pub struct EmployeesService {
    repository: Repository,
}

impl EmployeesService {
    pub fn new(repository: Repository) -> Self {
        Self { repository }
    }

    pub async fn list(&self) -> AppResult<Vec<Employee>> {
        self.repository.employees_list().await
    }

    pub async fn get(&self, matricula: &str) -> AppResult<Employee> {
        self.repository.employees_get(matricula).await
    }

    pub async fn create(&self, data: CreateEmployee, actor: &Actor) -> AppResult<Employee> {
        data.validate()?;
        let employee = self.repository.employees_create(&data, actor).await?;
        tracing::info!(matricula = %employee.matricula, actor = %actor.name, "Employee created");
        Ok(employee)
    }

    pub async fn update(&self, matricula: &str, data: UpdateEmployee, actor: &Actor) -> AppResult<Employee> {
        data.validate()?;
        self.repository.employees_update(matricula, &data, actor).await
    }

    /// Delete an employee; refused while any custody history references them
    pub async fn delete(&self, matricula: &str, actor: &Actor) -> AppResult<()> {
        self.repository.employees_delete(matricula, actor).await?;
        tracing::info!(matricula = %matricula, actor = %actor.name, "Employee deleted");
        Ok(())
    }
}
