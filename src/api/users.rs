//! User listing endpoint

use axum::{extract::State, Json};

use crate::{
    error::AppResult,
    models::{access::Action, user::User},
};

use super::{authorize, AuthenticatedUser};

/// List users of the caller's library
#[utoipa::path(
    get,
    path = "/users",
    tag = "users",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Users of the caller's library", body = Vec<User>),
        (status = 401, description = "Not authenticated or not allowed", body = crate::error::ErrorResponse)
    )
)]
pub async fn list_users(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
) -> AppResult<Json<Vec<User>>> {
    claims.require(Action::ViewUsers)?;
    let claims = authorize(&state, claims, Action::ViewUsers).await?;

    let users = state.services.auth.list_library_users(claims.library_id).await?;
    Ok(Json(users))
}
