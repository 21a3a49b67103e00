//! Audit trail reads on Repository

use super::Repository;
use crate::{
    error::AppResult,
    models::{audit::AuditEntry, enums::AuditResource},
};

impl Repository {
    /// Audit entries of one resource, newest first
    pub async fn audit_trail(&self, resource: AuditResource, target_id: &str) -> AppResult<Vec<AuditEntry>> {
        let rows = sqlx::query_as::<_, AuditEntry>(
            r#"
            SELECT * FROM audit_log
            WHERE resource = $1 AND target_id = $2
            ORDER BY occurred_at DESC, id DESC
            "#,
        )
        .bind(resource)
        .bind(target_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }
}
