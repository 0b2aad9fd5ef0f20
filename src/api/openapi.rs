//! OpenAPI documentation

use axum::Router;
use utoipa::{
    openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    Modify, OpenApi,
};
use utoipa_swagger_ui::SwaggerUi;

use crate::api::{auth, books, health, issues, libraries, owner, requests, users};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "LibMS API",
        version = "0.3.0",
        description = "Library management REST API: inventory, borrow requests and issuance",
        license(name = "AGPL-3.0", url = "https://www.gnu.org/licenses/agpl-3.0.html")
    ),
    servers(
        (url = "/api", description = "API")
    ),
    paths(
        // Health
        health::health_check,
        health::readiness_check,
        // Auth
        auth::register,
        auth::login,
        auth::me,
        auth::user_issue_info,
        // Owner
        owner::register_owner,
        owner::assign_admin,
        owner::revoke_admin,
        // Libraries
        libraries::create_library,
        libraries::list_libraries,
        // Users
        users::list_users,
        // Books
        books::add_book,
        books::list_books,
        books::remove_copies,
        books::update_book,
        // Requests
        requests::raise_request,
        requests::list_requests,
        requests::get_request,
        requests::update_request_status,
        // Issues
        issues::issue_book,
        issues::return_book,
    ),
    components(
        schemas(
            // Auth
            auth::LoginResponse,
            crate::models::user::LoginRequest,
            crate::models::user::RegisterUser,
            crate::models::user::User,
            crate::models::access::Role,
            // Owner
            owner::OwnerRegistrationResponse,
            crate::models::user::RegisterOwner,
            crate::models::user::AdminAssignment,
            // Libraries
            crate::models::library::Library,
            crate::models::library::CreateLibrary,
            // Books
            crate::models::book::BookInventory,
            crate::models::book::AddBook,
            crate::models::book::RemoveCopies,
            crate::models::book::UpdateBook,
            crate::models::book::BookResponse,
            // Requests
            requests::ResolutionResponse,
            crate::models::request_event::RequestEvent,
            crate::models::request_event::RequestType,
            crate::models::request_event::RequestStatus,
            crate::models::request_event::RaiseRequest,
            crate::models::request_event::UpdateRequestStatus,
            crate::models::request_event::RequestDetail,
            crate::models::request_event::RequestSummary,
            // Issues
            crate::models::issue::IssueRecord,
            crate::models::issue::IssueStatus,
            crate::models::issue::IssueBookRequest,
            crate::models::issue::IssueHistoryEntry,
            // Health
            health::HealthResponse,
            // Errors
            crate::error::ErrorResponse,
        )
    ),
    modifiers(&BearerAuth),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "auth", description = "Registration, login and identity"),
        (name = "owner", description = "Library registration and admin rights"),
        (name = "libraries", description = "Libraries"),
        (name = "users", description = "Users of a library"),
        (name = "books", description = "Book inventory"),
        (name = "requests", description = "Borrow requests"),
        (name = "issues", description = "Issue registry")
    )
)]
pub struct ApiDoc;

/// Registers the `bearer_auth` scheme referenced by the secured paths
struct BearerAuth;

impl Modify for BearerAuth {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}

/// Create the OpenAPI documentation router
pub fn create_openapi_router() -> Router {
    Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
}
