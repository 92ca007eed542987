//! User management endpoints

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use validator::Validate;

use crate::{
    error::AppResult,
    models::{
        checkout::CascadeOutcome,
        user::{CreateUser, User, UserProfile},
    },
};

use super::ActingUser;

/// List all users
#[utoipa::path(
    get,
    path = "/users",
    tag = "users",
    responses(
        (status = 200, description = "User list", body = Vec<User>)
    )
)]
pub async fn list_users(
    State(state): State<crate::AppState>,
    ActingUser(_actor): ActingUser,
) -> AppResult<Json<Vec<User>>> {
    let users = state.services.users.list().await?;
    Ok(Json(users))
}

/// Get user by username
#[utoipa::path(
    get,
    path = "/users/{username}",
    tag = "users",
    params(("username" = String, Path, description = "Username")),
    responses(
        (status = 200, description = "User details", body = User),
        (status = 404, description = "Unknown user")
    )
)]
pub async fn get_user(
    State(state): State<crate::AppState>,
    ActingUser(_actor): ActingUser,
    Path(username): Path<String>,
) -> AppResult<Json<User>> {
    let user = state.services.users.get(&username).await?;
    Ok(Json(user))
}

/// Create a new user
#[utoipa::path(
    post,
    path = "/users",
    tag = "users",
    request_body = CreateUser,
    responses(
        (status = 201, description = "User created", body = User),
        (status = 403, description = "Administrator role required"),
        (status = 409, description = "Username already taken")
    )
)]
pub async fn create_user(
    State(state): State<crate::AppState>,
    ActingUser(actor): ActingUser,
    Json(data): Json<CreateUser>,
) -> AppResult<(StatusCode, Json<User>)> {
    actor.require_admin()?;
    data.validate()?;

    let user = state.services.users.create(&data).await?;
    Ok((StatusCode::CREATED, Json(user)))
}

/// Delete a user, force-releasing any equipment they hold
#[utoipa::path(
    delete,
    path = "/users/{username}",
    tag = "users",
    params(("username" = String, Path, description = "Username")),
    responses(
        (status = 200, description = "User deleted, holdings released", body = CascadeOutcome),
        (status = 403, description = "Administrator role required"),
        (status = 404, description = "Unknown user")
    )
)]
pub async fn delete_user(
    State(state): State<crate::AppState>,
    ActingUser(actor): ActingUser,
    Path(username): Path<String>,
) -> AppResult<Json<CascadeOutcome>> {
    actor.require_admin()?;

    let ctx = actor.context();
    let outcome = state
        .services
        .lifecycle
        .delete_user_cascade(&ctx, &username)
        .await?;
    Ok(Json(outcome))
}

/// A user's profile with current holdings and overdue count
#[utoipa::path(
    get,
    path = "/users/{username}/equipment",
    tag = "users",
    params(("username" = String, Path, description = "Username")),
    responses(
        (status = 200, description = "User profile with holdings", body = UserProfile),
        (status = 404, description = "Unknown user")
    )
)]
pub async fn get_user_equipment(
    State(state): State<crate::AppState>,
    ActingUser(actor): ActingUser,
    Path(username): Path<String>,
) -> AppResult<Json<UserProfile>> {
    let ctx = actor.context();
    let profile = state.services.users.profile(&username, ctx.today).await?;
    Ok(Json(profile))
}
