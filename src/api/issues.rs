//! Issue registry endpoints

use axum::{
    extract::{Path, State},
    Json,
};
use chrono::Utc;
use validator::Validate;

use crate::{
    error::AppResult,
    models::{
        access::Action,
        issue::{check_expected_return, IssueBookRequest, IssueRecord},
    },
};

use super::{authorize, AuthenticatedUser};

/// Issue a copy directly to a reader
#[utoipa::path(
    post,
    path = "/issueRegistry",
    tag = "issues",
    security(("bearer_auth" = [])),
    request_body = IssueBookRequest,
    responses(
        (status = 200, description = "Book issued", body = IssueRecord),
        (status = 400, description = "Missing return date or no copy available", body = crate::error::ErrorResponse),
        (status = 401, description = "Not allowed to issue books", body = crate::error::ErrorResponse),
        (status = 404, description = "Book or reader not found", body = crate::error::ErrorResponse)
    )
)]
pub async fn issue_book(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Json(payload): Json<IssueBookRequest>,
) -> AppResult<Json<IssueRecord>> {
    claims.require(Action::IssueBooks)?;
    payload.validate()?;
    let expected_return_date = check_expected_return(payload.expected_return_date, Utc::now())?;
    let claims = authorize(&state, claims, Action::IssueBooks).await?;

    let issue = state
        .services
        .issues
        .issue_book(&claims, &payload, expected_return_date)
        .await?;
    Ok(Json(issue))
}

/// Record the return of an issued copy
#[utoipa::path(
    post,
    path = "/issueRegistry/{id}/return",
    tag = "issues",
    security(("bearer_auth" = [])),
    params(
        ("id" = i32, Path, description = "Issue ID")
    ),
    responses(
        (status = 200, description = "Book returned", body = IssueRecord),
        (status = 400, description = "Already returned", body = crate::error::ErrorResponse),
        (status = 401, description = "Not allowed to return books", body = crate::error::ErrorResponse),
        (status = 404, description = "Issue not found", body = crate::error::ErrorResponse)
    )
)]
pub async fn return_book(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i32>,
) -> AppResult<Json<IssueRecord>> {
    claims.require(Action::ReturnBooks)?;
    let claims = authorize(&state, claims, Action::ReturnBooks).await?;

    let issue = state.services.issues.return_book(&claims, id).await?;
    Ok(Json(issue))
}
