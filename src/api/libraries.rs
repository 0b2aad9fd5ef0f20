//! Library endpoints

use axum::{extract::State, http::StatusCode, Json};
use validator::Validate;

use crate::{
    error::AppResult,
    models::{
        access::Action,
        library::{CreateLibrary, Library},
    },
};

use super::{authorize, AuthenticatedUser};

/// Create a library
#[utoipa::path(
    post,
    path = "/library",
    tag = "libraries",
    security(("bearer_auth" = [])),
    request_body = CreateLibrary,
    responses(
        (status = 201, description = "Library created", body = Library),
        (status = 400, description = "Invalid name or library already exists", body = crate::error::ErrorResponse),
        (status = 401, description = "Only owners can create libraries", body = crate::error::ErrorResponse)
    )
)]
pub async fn create_library(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Json(payload): Json<CreateLibrary>,
) -> AppResult<(StatusCode, Json<Library>)> {
    claims.require(Action::CreateLibrary)?;
    payload.validate()?;
    let claims = authorize(&state, claims, Action::CreateLibrary).await?;

    let library = state.services.libraries.create(&payload.name, claims.id).await?;
    Ok((StatusCode::CREATED, Json(library)))
}

/// List all libraries
#[utoipa::path(
    get,
    path = "/libraries",
    tag = "libraries",
    responses(
        (status = 200, description = "All libraries", body = Vec<Library>)
    )
)]
pub async fn list_libraries(State(state): State<crate::AppState>) -> AppResult<Json<Vec<Library>>> {
    let libraries = state.services.libraries.list().await?;
    Ok(Json(libraries))
}
