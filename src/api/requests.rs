//! Borrow request endpoints

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::Serialize;
use utoipa::ToSchema;
use validator::Validate;

use crate::{
    error::AppResult,
    models::{
        access::Action,
        issue::IssueRecord,
        request_event::{Decision, RaiseRequest, RequestEvent, RequestSummary, UpdateRequestStatus},
    },
};

use super::{authorize, AuthenticatedUser};

/// Result of approving or rejecting a request
#[derive(Serialize, ToSchema)]
pub struct ResolutionResponse {
    pub request: RequestEvent,
    /// Issuance opened by an approval
    pub issue: Option<IssueRecord>,
}

/// Raise a borrow request for a book of the caller's library
#[utoipa::path(
    post,
    path = "/requestEvents",
    tag = "requests",
    security(("bearer_auth" = [])),
    request_body = RaiseRequest,
    responses(
        (status = 201, description = "Request raised, one copy reserved", body = RequestEvent),
        (status = 400, description = "No copy available", body = crate::error::ErrorResponse),
        (status = 403, description = "Active request quota reached", body = crate::error::ErrorResponse),
        (status = 404, description = "Book not found in your library", body = crate::error::ErrorResponse)
    )
)]
pub async fn raise_request(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Json(payload): Json<RaiseRequest>,
) -> AppResult<(StatusCode, Json<RequestEvent>)> {
    claims.require(Action::RaiseRequest)?;
    payload.validate()?;

    let request = state.services.requests.raise(&claims, &payload.book_id).await?;
    Ok((StatusCode::CREATED, Json(request)))
}

/// List requests; readers only see their own
#[utoipa::path(
    get,
    path = "/issueRequests",
    tag = "requests",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Requests with book, reader and issuance details", body = Vec<RequestSummary>),
        (status = 401, description = "Not authenticated", body = crate::error::ErrorResponse)
    )
)]
pub async fn list_requests(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
) -> AppResult<Json<Vec<RequestSummary>>> {
    claims.require(Action::ViewLibraryRequests)?;
    let claims = authorize(&state, claims, Action::ViewLibraryRequests).await?;

    let requests = state.services.requests.list(&claims).await?;
    Ok(Json(requests))
}

/// Get one request
#[utoipa::path(
    get,
    path = "/issueRequests/{id}",
    tag = "requests",
    security(("bearer_auth" = [])),
    params(
        ("id" = i32, Path, description = "Request ID")
    ),
    responses(
        (status = 200, description = "Request", body = RequestEvent),
        (status = 404, description = "Request not found", body = crate::error::ErrorResponse)
    )
)]
pub async fn get_request(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i32>,
) -> AppResult<Json<RequestEvent>> {
    claims.require(Action::ViewLibraryRequests)?;
    let claims = authorize(&state, claims, Action::ViewLibraryRequests).await?;

    let request = state.services.requests.get(&claims, id).await?;
    Ok(Json(request))
}

/// Approve or reject a pending request
#[utoipa::path(
    put,
    path = "/issueRequests/{id}",
    tag = "requests",
    security(("bearer_auth" = [])),
    params(
        ("id" = i32, Path, description = "Request ID")
    ),
    request_body = UpdateRequestStatus,
    responses(
        (status = 200, description = "Request resolved", body = ResolutionResponse),
        (status = 400, description = "Invalid decision or request already resolved", body = crate::error::ErrorResponse),
        (status = 401, description = "Not allowed to resolve requests", body = crate::error::ErrorResponse),
        (status = 404, description = "Request not found", body = crate::error::ErrorResponse)
    )
)]
pub async fn update_request_status(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i32>,
    Json(payload): Json<UpdateRequestStatus>,
) -> AppResult<Json<ResolutionResponse>> {
    claims.require(Action::ResolveRequests)?;
    let decision: Decision = payload.request_type.parse()?;
    let claims = authorize(&state, claims, Action::ResolveRequests).await?;

    let resolution = state
        .services
        .requests
        .resolve(&claims, id, decision, payload.expected_return_date)
        .await?;

    Ok(Json(ResolutionResponse {
        request: resolution.request,
        issue: resolution.issue,
    }))
}
