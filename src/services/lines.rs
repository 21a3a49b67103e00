//! Line service

use validator::Validate;

use crate::{
    error::AppResult,
    models::{
        audit::Actor,
        device::LinkLineRequest,
        line::{CreateLine, CreateLineTerm, Line, LineLink, LineTerm, UpdateLine},
    },
    repository::Repository,
};

#[derive(Clone)]
pub struct LinesService {
    repository: Repository,
}

impl LinesService {
    pub fn new(repository: Repository) -> Self {
        Self { repository }
    }

    pub async fn list(&self) -> AppResult<Vec<Line>> {
        self.repository.lines_list().await
    }

    pub async fn get(&self, numero: &str) -> AppResult<Line> {
        self.repository.lines_get(numero).await
    }

    pub async fn create(&self, data: CreateLine, actor: &Actor) -> AppResult<Line> {
        data.validate()?;
        self.repository.lines_create(&data, actor).await
    }

    pub async fn update(&self, numero: &str, data: UpdateLine, actor: &Actor) -> AppResult<Line> {
        data.validate()?;
        self.repository.lines_update(numero, &data, actor).await
    }

    pub async fn delete(&self, numero: &str, actor: &Actor) -> AppResult<()> {
        self.repository.lines_delete(numero, actor).await
    }

    /// Insert a line into a device, moving it from wherever it was
    pub async fn link(&self, imei: &str, request: LinkLineRequest, actor: &Actor) -> AppResult<Line> {
        request.validate()?;
        self.repository.lines_link(imei, request.line_numero.trim(), actor).await
    }

    pub async fn unlink(&self, numero: &str, actor: &Actor) -> AppResult<Line> {
        self.repository.lines_unlink(numero, actor).await
    }

    pub async fn history(&self, numero: &str) -> AppResult<Vec<LineLink>> {
        self.repository.lines_history(numero).await
    }

    /// Make an employee responsible for a line
    pub async fn create_term(&self, numero: &str, request: CreateLineTerm, actor: &Actor) -> AppResult<LineTerm> {
        let new = request.into_new(actor)?;
        self.repository.line_terms_create(numero, &new, actor).await
    }

    pub async fn terms(&self, numero: &str) -> AppResult<Vec<LineTerm>> {
        self.repository.line_terms_list(numero).await
    }
}
