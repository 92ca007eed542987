//! API handlers for LabTrack REST endpoints

pub mod equipment;
pub mod health;
pub mod openapi;
pub mod reports;
pub mod users;

use axum::{async_trait, extract::FromRequestParts, http::request::Parts};
use chrono::Utc;

use crate::{
    error::{AppError, AppResult},
    models::user::Role,
    services::lifecycle::RequestContext,
    AppState,
};

/// Acting user identity. The upstream identity layer authenticates and
/// forwards who is acting via the `X-User` and `X-Role` headers; this server
/// records the identity, it does not verify it.
pub struct Actor {
    pub username: String,
    pub role: Role,
}

impl Actor {
    /// Context handed to the lifecycle engine: actor, role, and the host
    /// clock's current day
    pub fn context(&self) -> RequestContext {
        RequestContext {
            actor: self.username.clone(),
            role: self.role,
            today: Utc::now().date_naive(),
        }
    }

    /// Mutating operations are closed to readonly accounts
    pub fn require_write(&self) -> AppResult<()> {
        if self.role == Role::Readonly {
            return Err(AppError::Authorization(
                "Read-only accounts cannot modify inventory".to_string(),
            ));
        }
        Ok(())
    }

    pub fn require_admin(&self) -> AppResult<()> {
        if !self.role.is_admin() {
            return Err(AppError::Authorization(
                "Administrator role required".to_string(),
            ));
        }
        Ok(())
    }
}

/// Extractor for the acting user from request headers
pub struct ActingUser(pub Actor);

#[async_trait]
impl FromRequestParts<AppState> for ActingUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &AppState) -> Result<Self, Self::Rejection> {
        let username = parts
            .headers
            .get("x-user")
            .and_then(|value| value.to_str().ok())
            .filter(|value| !value.is_empty())
            .ok_or_else(|| AppError::Authorization("Missing X-User header".to_string()))?
            .to_string();

        let role = match parts.headers.get("x-role").and_then(|value| value.to_str().ok()) {
            Some(raw) => raw.parse::<Role>().map_err(AppError::Validation)?,
            None => Role::User,
        };

        Ok(ActingUser(Actor { username, role }))
    }
}
