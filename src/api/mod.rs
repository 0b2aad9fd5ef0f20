//! API handlers for the LibMS REST endpoints

pub mod auth;
pub mod books;
pub mod health;
pub mod issues;
pub mod libraries;
pub mod openapi;
pub mod owner;
pub mod requests;
pub mod users;

use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts},
    routing::{get, post, put},
    Router,
};
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use crate::{
    error::{AppError, AppResult},
    models::{access::Action, user::UserClaims},
    AppState,
};

/// Extractor for the authenticated caller, taken from the bearer token
pub struct AuthenticatedUser(pub UserClaims);

#[async_trait]
impl FromRequestParts<AppState> for AuthenticatedUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let auth_header = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .ok_or_else(|| AppError::Authentication("Missing authorization header".to_string()))?;

        let token = auth_header
            .strip_prefix("Bearer ")
            .ok_or_else(|| AppError::Authentication("Invalid authorization header format".to_string()))?;

        let claims = state.services.auth.verify_token(token)?;
        Ok(AuthenticatedUser(claims))
    }
}

/// Re-check a staff action against the caller's stored role.
///
/// Token claims can outlive a demotion, so privileged handlers call this
/// after their input is validated.
pub(crate) async fn authorize(state: &AppState, claims: UserClaims, action: Action) -> AppResult<UserClaims> {
    let claims = state.services.auth.refresh_claims(claims).await?;
    claims.require(action)?;
    Ok(claims)
}

/// Build the application router with all routes
pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let api = Router::new()
        // Health
        .route("/health", get(health::health_check))
        .route("/ready", get(health::readiness_check))
        // Authentication
        .route("/auth/register", post(auth::register))
        .route("/auth/login", post(auth::login))
        .route("/auth/me", get(auth::me))
        .route("/auth/userIssueInfo", get(auth::user_issue_info))
        // Owner
        .route("/owner/registration", post(owner::register_owner))
        .route("/owner/assign-admin", post(owner::assign_admin))
        .route("/owner/revoke-admin", post(owner::revoke_admin))
        // Libraries
        .route("/library", post(libraries::create_library))
        .route("/libraries", get(libraries::list_libraries))
        // Users
        .route("/users", get(users::list_users))
        // Inventory
        .route("/books", get(books::list_books).post(books::add_book))
        .route("/books/remove", post(books::remove_copies))
        .route("/books/:isbn", put(books::update_book))
        // Requests
        .route("/requestEvents", post(requests::raise_request))
        .route(
            "/issueRequests",
            get(requests::list_requests).post(requests::raise_request),
        )
        .route(
            "/issueRequests/:id",
            get(requests::get_request).put(requests::update_request_status),
        )
        // Issuance
        .route("/issueRegistry", post(issues::issue_book))
        .route("/issueRegistry/:id/return", post(issues::return_book))
        .with_state(state);

    Router::new()
        .nest("/api", api)
        .merge(openapi::create_openapi_router())
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .layer(cors)
}
