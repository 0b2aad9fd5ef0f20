//! Owner endpoints: library registration and admin rights

use axum::{extract::State, http::StatusCode, Json};
use serde::Serialize;
use utoipa::ToSchema;
use validator::Validate;

use crate::{
    error::AppResult,
    models::{
        access::Action,
        library::Library,
        user::{AdminAssignment, RegisterOwner, User},
    },
};

use super::{authorize, AuthenticatedUser};

#[derive(Serialize, ToSchema)]
pub struct OwnerRegistrationResponse {
    pub library: Library,
    pub owner: User,
}

/// Register a new library together with its owner
#[utoipa::path(
    post,
    path = "/owner/registration",
    tag = "owner",
    request_body = RegisterOwner,
    responses(
        (status = 201, description = "Library and owner created", body = OwnerRegistrationResponse),
        (status = 400, description = "Invalid input, library or email already used", body = crate::error::ErrorResponse)
    )
)]
pub async fn register_owner(
    State(state): State<crate::AppState>,
    Json(payload): Json<RegisterOwner>,
) -> AppResult<(StatusCode, Json<OwnerRegistrationResponse>)> {
    payload.validate()?;

    let (library, owner) = state.services.auth.register_owner(payload).await?;
    Ok((StatusCode::CREATED, Json(OwnerRegistrationResponse { library, owner })))
}

/// Promote a user of the owner's library to LibraryAdmin
#[utoipa::path(
    post,
    path = "/owner/assign-admin",
    tag = "owner",
    security(("bearer_auth" = [])),
    request_body = AdminAssignment,
    responses(
        (status = 200, description = "User promoted", body = User),
        (status = 400, description = "Owner cannot change their own role", body = crate::error::ErrorResponse),
        (status = 401, description = "Only owners can assign admins", body = crate::error::ErrorResponse),
        (status = 404, description = "User not found in your library", body = crate::error::ErrorResponse)
    )
)]
pub async fn assign_admin(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Json(payload): Json<AdminAssignment>,
) -> AppResult<Json<User>> {
    claims.require(Action::ManageAdmins)?;
    payload.validate()?;
    let claims = authorize(&state, claims, Action::ManageAdmins).await?;

    let user = state.services.auth.assign_admin(&claims, &payload.email).await?;
    Ok(Json(user))
}

/// Demote a LibraryAdmin of the owner's library to Reader
#[utoipa::path(
    post,
    path = "/owner/revoke-admin",
    tag = "owner",
    security(("bearer_auth" = [])),
    request_body = AdminAssignment,
    responses(
        (status = 200, description = "User demoted", body = User),
        (status = 400, description = "Owner cannot change their own role", body = crate::error::ErrorResponse),
        (status = 401, description = "Only owners can revoke admins", body = crate::error::ErrorResponse),
        (status = 404, description = "User not found in your library", body = crate::error::ErrorResponse)
    )
)]
pub async fn revoke_admin(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Json(payload): Json<AdminAssignment>,
) -> AppResult<Json<User>> {
    claims.require(Action::ManageAdmins)?;
    payload.validate()?;
    let claims = authorize(&state, claims, Action::ManageAdmins).await?;

    let user = state.services.auth.revoke_admin(&claims, &payload.email).await?;
    Ok(Json(user))
}
