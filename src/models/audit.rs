//! Audit trail model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;

use super::enums::{AuditAction, AuditResource};

/// Identity of the user performing a change, as supplied by the caller
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Actor {
    pub id: Option<i32>,
    pub name: String,
}

/// Stored audit entry
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct AuditEntry {
    pub id: i64,
    pub occurred_at: DateTime<Utc>,
    pub actor_id: Option<i32>,
    pub actor_name: String,
    pub action: AuditAction,
    pub resource: AuditResource,
    pub target_id: String,
    #[schema(value_type = Object)]
    pub details: serde_json::Value,
}

/// Audit entry about to be written alongside a change
#[derive(Debug, Clone)]
pub struct NewAuditEntry<'a> {
    pub actor: &'a Actor,
    pub action: AuditAction,
    pub resource: AuditResource,
    pub target_id: String,
    pub details: serde_json::Value,
}

impl<'a> NewAuditEntry<'a> {
    pub fn new(
        actor: &'a Actor,
        action: AuditAction,
        resource: AuditResource,
        target_id: impl ToString,
        details: serde_json::Value,
    ) -> Self {
        Self {
            actor,
            action,
            resource,
            target_id: target_id.to_string(),
            details,
        }
    }
}
