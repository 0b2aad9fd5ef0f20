//! Authentication endpoints

use axum::{extract::State, http::StatusCode, Json};
use serde::Serialize;
use utoipa::ToSchema;
use validator::Validate;

use crate::{
    error::AppResult,
    models::{
        access::{Action, Role},
        issue::IssueHistoryEntry,
        user::{LoginRequest, RegisterUser, User},
    },
};

use super::AuthenticatedUser;

/// Login response
#[derive(Serialize, ToSchema)]
pub struct LoginResponse {
    /// Signed bearer token
    pub token: String,
    pub role: Role,
    pub library_id: i32,
}

/// Register a reader in an existing library
#[utoipa::path(
    post,
    path = "/auth/register",
    tag = "auth",
    request_body = RegisterUser,
    responses(
        (status = 201, description = "User created", body = User),
        (status = 400, description = "Invalid input or email already used", body = crate::error::ErrorResponse),
        (status = 401, description = "Privileged role requested", body = crate::error::ErrorResponse),
        (status = 404, description = "Library not found", body = crate::error::ErrorResponse)
    )
)]
pub async fn register(
    State(state): State<crate::AppState>,
    Json(payload): Json<RegisterUser>,
) -> AppResult<(StatusCode, Json<User>)> {
    payload.validate()?;

    let user = state.services.auth.register(payload).await?;
    Ok((StatusCode::CREATED, Json(user)))
}

/// Authenticate with email and password
#[utoipa::path(
    post,
    path = "/auth/login",
    tag = "auth",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Login successful", body = LoginResponse),
        (status = 401, description = "Invalid credentials", body = crate::error::ErrorResponse)
    )
)]
pub async fn login(
    State(state): State<crate::AppState>,
    Json(payload): Json<LoginRequest>,
) -> AppResult<Json<LoginResponse>> {
    payload.validate()?;

    let (token, user) = state
        .services
        .auth
        .login(&payload.email, &payload.password)
        .await?;

    Ok(Json(LoginResponse {
        token,
        role: user.role,
        library_id: user.library_id,
    }))
}

/// Get current user info
#[utoipa::path(
    get,
    path = "/auth/me",
    tag = "auth",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Current user", body = User),
        (status = 401, description = "Not authenticated", body = crate::error::ErrorResponse)
    )
)]
pub async fn me(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
) -> AppResult<Json<User>> {
    let user = state.services.auth.get_by_id(claims.id).await?;
    Ok(Json(user))
}

/// Issuance history of the caller
#[utoipa::path(
    get,
    path = "/auth/userIssueInfo",
    tag = "auth",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Caller's issuances, newest first", body = Vec<IssueHistoryEntry>),
        (status = 401, description = "Not authenticated", body = crate::error::ErrorResponse)
    )
)]
pub async fn user_issue_info(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
) -> AppResult<Json<Vec<IssueHistoryEntry>>> {
    claims.require(Action::ViewOwnIssues)?;

    let history = state.services.issues.history(&claims).await?;
    Ok(Json(history))
}
