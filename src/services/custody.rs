//! Custody ledger service: check-out, return and record administration

use chrono::Duration;
use validator::Validate;

use crate::{
    config::LedgerConfig,
    error::{AppError, AppResult},
    models::{
        audit::Actor,
        custody::{
            AmendReturnRequest, CheckOutOutcome, CheckOutRequest, CustodyRecord, CustodyRecordListing,
            RecordPage, RecordQuery, ReturnRequest, UpdateAttachments,
        },
    },
    repository::Repository,
};

#[derive(Clone)]
pub struct CustodyService {
    repository: Repository,
    ledger: LedgerConfig,
}

impl CustodyService {
    pub fn new(repository: Repository, ledger: LedgerConfig) -> Self {
        Self { repository, ledger }
    }

    /// Check a device out to an employee.
    ///
    /// The payload is validated before anything is read, so a malformed
    /// request never touches the ledger.
    pub async fn check_out(&self, request: CheckOutRequest, actor: &Actor) -> AppResult<CheckOutOutcome> {
        let new = request.into_new(actor)?;
        let window = Duration::seconds(self.ledger.duplicate_submit_window_secs.max(0));
        self.repository.custody_check_out(&new, actor, window).await
    }

    pub async fn return_device(&self, id: i32, request: ReturnRequest, actor: &Actor) -> AppResult<CustodyRecord> {
        let ret = request.into_new(actor)?;
        self.repository.custody_return(id, &ret, actor).await
    }

    pub async fn amend_return(
        &self,
        id: i32,
        request: AmendReturnRequest,
        actor: &Actor,
    ) -> AppResult<CustodyRecord> {
        request.validate()?;
        if request.is_empty() {
            return Err(AppError::Validation(
                "At least one field must be provided for update".to_string(),
            ));
        }
        self.repository.custody_amend_return(id, &request, actor).await
    }

    pub async fn update_attachments(
        &self,
        id: i32,
        attachments: UpdateAttachments,
        actor: &Actor,
    ) -> AppResult<CustodyRecord> {
        if attachments.is_empty() {
            return Err(AppError::Validation(
                "At least one attachment must be provided".to_string(),
            ));
        }
        let record = self.repository.custody_update_attachments(id, &attachments, actor).await?;
        tracing::info!(record_id = id, "Record attachments updated");
        Ok(record)
    }

    /// Administrative override: remove a record for good
    pub async fn delete(&self, id: i32, reason: Option<String>, actor: &Actor) -> AppResult<()> {
        let reason = reason.map(|r| r.trim().to_string()).filter(|r| !r.is_empty());
        self.repository.custody_delete(id, reason.as_deref(), actor).await
    }

    pub async fn get(&self, id: i32) -> AppResult<CustodyRecordListing> {
        self.repository.custody_get(id).await
    }

    pub async fn list(&self, query: RecordQuery) -> AppResult<RecordPage> {
        let page = query.page.unwrap_or(1).max(1);
        let page_size = self.ledger.page_size(query.page_size);

        let (records, total) = self
            .repository
            .custody_list(
                query.filter.unwrap_or_default(),
                query
                    .employee_matricula
                    .as_deref()
                    .map(str::trim)
                    .filter(|m| !m.is_empty()),
                query.sort.unwrap_or_default(),
                query.direction.unwrap_or_default(),
                page,
                page_size,
            )
            .await?;

        Ok(RecordPage {
            records,
            total,
            page,
            page_size,
        })
    }
}
