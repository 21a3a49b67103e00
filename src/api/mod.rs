//! API handlers for SmartControl REST endpoints

pub mod audit;
pub mod devices;
pub mod employees;
pub mod health;
pub mod lines;
pub mod maintenance;
pub mod openapi;
pub mod records;

use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{request::Parts, HeaderMap},
};

use crate::{error::AppError, models::audit::Actor, AppState};

/// Header naming the user performing a change
pub const ACTOR_NAME_HEADER: &str = "x-actor-name";
/// Optional header carrying the numeric id of that user
pub const ACTOR_ID_HEADER: &str = "x-actor-id";

/// Acting user, as asserted by the calling administrative layer
pub struct ActingUser(pub Actor);

fn actor_from_headers(headers: &HeaderMap) -> Result<Actor, AppError> {
    let name = headers
        .get(ACTOR_NAME_HEADER)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .ok_or_else(|| AppError::Validation("Missing X-Actor-Name header".to_string()))?;

    let id = match headers.get(ACTOR_ID_HEADER) {
        Some(value) => Some(
            value
                .to_str()
                .ok()
                .and_then(|v| v.trim().parse::<i32>().ok())
                .ok_or_else(|| AppError::Validation("X-Actor-Id must be an integer".to_string()))?,
        ),
        None => None,
    };

    Ok(Actor {
        id,
        name: name.to_string(),
    })
}

#[async_trait]
impl FromRequestParts<AppState> for ActingUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &AppState) -> Result<Self, Self::Rejection> {
        actor_from_headers(&parts.headers).map(ActingUser)
    }
}
