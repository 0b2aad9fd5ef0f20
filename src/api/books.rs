//! Book inventory endpoints

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use validator::Validate;

use crate::{
    error::AppResult,
    models::{
        access::Action,
        book::{AddBook, BookInventory, BookResponse, RemoveCopies, UpdateBook},
    },
    repository::books::StockChange,
};

use super::{authorize, AuthenticatedUser};

/// Add a title or more copies of an existing one
#[utoipa::path(
    post,
    path = "/books",
    tag = "books",
    security(("bearer_auth" = [])),
    request_body = AddBook,
    responses(
        (status = 201, description = "Book created", body = BookResponse),
        (status = 200, description = "Copies added to an existing book", body = BookResponse),
        (status = 400, description = "Invalid input", body = crate::error::ErrorResponse),
        (status = 401, description = "Not allowed to manage books", body = crate::error::ErrorResponse),
        (status = 404, description = "Book not found and increment_only set", body = crate::error::ErrorResponse)
    )
)]
pub async fn add_book(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Json(payload): Json<AddBook>,
) -> AppResult<(StatusCode, Json<BookResponse>)> {
    claims.require(Action::ManageBooks)?;
    payload.validate()?;
    let claims = authorize(&state, claims, Action::ManageBooks).await?;

    let change = state
        .services
        .inventory
        .add_or_increment(claims.library_id, &payload)
        .await?;

    let (status, message, book) = match change {
        StockChange::Created(book) => (StatusCode::CREATED, "Book added", book),
        StockChange::Incremented(book) => (StatusCode::OK, "Book copies incremented", book),
    };

    Ok((
        status,
        Json(BookResponse {
            message: message.to_string(),
            book: Some(book),
        }),
    ))
}

/// List books of the caller's library
#[utoipa::path(
    get,
    path = "/books",
    tag = "books",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Books of the caller's library", body = Vec<BookInventory>),
        (status = 401, description = "Not authenticated", body = crate::error::ErrorResponse)
    )
)]
pub async fn list_books(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
) -> AppResult<Json<Vec<BookInventory>>> {
    claims.require(Action::ViewBooks)?;

    let books = state.services.inventory.list_books(claims.library_id).await?;
    Ok(Json(books))
}

/// Remove copies; the title is deleted once no copy is left
#[utoipa::path(
    post,
    path = "/books/remove",
    tag = "books",
    security(("bearer_auth" = [])),
    request_body = RemoveCopies,
    responses(
        (status = 200, description = "Copies removed", body = BookResponse),
        (status = 400, description = "Invalid count or copies still issued", body = crate::error::ErrorResponse),
        (status = 401, description = "Not allowed to manage books", body = crate::error::ErrorResponse),
        (status = 404, description = "Book not found", body = crate::error::ErrorResponse)
    )
)]
pub async fn remove_copies(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Json(payload): Json<RemoveCopies>,
) -> AppResult<Json<BookResponse>> {
    claims.require(Action::ManageBooks)?;
    payload.validate()?;
    let claims = authorize(&state, claims, Action::ManageBooks).await?;

    let remaining = state
        .services
        .inventory
        .remove_copies(claims.library_id, &payload.isbn, payload.copies)
        .await?;

    let message = match remaining {
        Some(_) => "Book copies removed",
        None => "Book removed from inventory",
    };
    Ok(Json(BookResponse {
        message: message.to_string(),
        book: remaining,
    }))
}

/// Update the metadata or total copies of a title
#[utoipa::path(
    put,
    path = "/books/{isbn}",
    tag = "books",
    security(("bearer_auth" = [])),
    params(
        ("isbn" = String, Path, description = "Book ISBN")
    ),
    request_body = UpdateBook,
    responses(
        (status = 200, description = "Book updated", body = BookResponse),
        (status = 400, description = "Invalid total copies", body = crate::error::ErrorResponse),
        (status = 401, description = "Not allowed to manage books", body = crate::error::ErrorResponse),
        (status = 404, description = "Book not found", body = crate::error::ErrorResponse)
    )
)]
pub async fn update_book(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(isbn): Path<String>,
    Json(payload): Json<UpdateBook>,
) -> AppResult<Json<BookResponse>> {
    claims.require(Action::ManageBooks)?;
    let claims = authorize(&state, claims, Action::ManageBooks).await?;

    let book = state
        .services
        .inventory
        .update_book(claims.library_id, &isbn, &payload)
        .await?;

    Ok(Json(BookResponse {
        message: "Book updated".to_string(),
        book: Some(book),
    }))
}
