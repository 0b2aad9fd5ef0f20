//! Book inventory model and copy-count rules
//!
//! A row exists per (isbn, library) and always satisfies
//! `0 <= available_copies <= total_copies` with `total_copies > 0`.
//! The methods below only compute new counts; persisting them under a row
//! lock is the repository's job.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use validator::Validate;

use crate::error::{AppError, AppResult};

/// Inventory row from database
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct BookInventory {
    pub id: i32,
    pub isbn: String,
    pub library_id: i32,
    pub title: String,
    pub author: String,
    pub publisher: Option<String>,
    pub language: String,
    pub version: Option<String>,
    pub total_copies: i32,
    pub available_copies: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Outcome of removing copies from a row
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CopyRemoval {
    /// Every copy is gone, the row must be deleted
    DeleteRow,
    Shrink {
        total_copies: i32,
        available_copies: i32,
        /// `available_copies` had to be clamped at zero
        clamped: bool,
    },
}

impl BookInventory {
    pub fn add_copies(&mut self, copies: i32) -> AppResult<()> {
        if copies <= 0 {
            return Err(AppError::Validation("Copies must be greater than zero".to_string()));
        }
        match (
            self.total_copies.checked_add(copies),
            self.available_copies.checked_add(copies),
        ) {
            (Some(total_copies), Some(available_copies)) => {
                self.total_copies = total_copies;
                self.available_copies = available_copies;
                Ok(())
            }
            _ => Err(AppError::Validation(format!(
                "Adding {} copies exceeds the maximum copy count",
                copies
            ))),
        }
    }

    /// Only copies from the available pool can be removed
    pub fn plan_removal(&self, copies: i32) -> AppResult<CopyRemoval> {
        if copies <= 0 {
            return Err(AppError::Validation("Copies must be greater than zero".to_string()));
        }
        if copies > self.available_copies {
            return Err(AppError::Conflict("Cannot remove issued copies".to_string()));
        }
        let total_copies = self.total_copies - copies;
        if total_copies == 0 {
            return Ok(CopyRemoval::DeleteRow);
        }
        let remaining = self.available_copies - copies;
        Ok(CopyRemoval::Shrink {
            total_copies,
            available_copies: remaining.max(0),
            clamped: remaining < 0,
        })
    }

    /// Set a new total, moving `available_copies` by the same delta.
    /// Returns true when `available_copies` had to be clamped at zero.
    pub fn resize(&mut self, new_total: i32) -> AppResult<bool> {
        if new_total <= 0 {
            return Err(AppError::Validation(
                "Total copies must be greater than zero, remove the copies instead".to_string(),
            ));
        }
        let delta = new_total - self.total_copies;
        let available = self.available_copies + delta;
        self.total_copies = new_total;
        self.available_copies = available.max(0);
        Ok(available < 0)
    }

    /// Take one copy out of the available pool
    pub fn reserve_copy(&mut self) -> AppResult<()> {
        if self.available_copies < 1 {
            return Err(AppError::Unavailable(format!(
                "Book {} is not available for issue",
                self.isbn
            )));
        }
        self.available_copies -= 1;
        Ok(())
    }

    /// Put one copy back. Returns true when the count was already at
    /// `total_copies` and the increment was dropped.
    pub fn release_copy(&mut self) -> bool {
        if self.available_copies >= self.total_copies {
            return true;
        }
        self.available_copies += 1;
        false
    }
}

/// Add a new title or more copies of an existing one
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct AddBook {
    #[validate(length(min = 1, max = 32, message = "ISBN must be 1-32 characters"))]
    pub isbn: String,
    pub title: Option<String>,
    pub author: Option<String>,
    pub publisher: Option<String>,
    pub language: Option<String>,
    pub version: Option<String>,
    #[validate(range(min = 1, message = "Copies must be greater than zero"))]
    pub copies: i32,
    /// Fail instead of creating the title when it is not in the catalog yet
    #[serde(default)]
    pub increment_only: bool,
}

/// Metadata required to create a title, extracted from [`AddBook`]
#[derive(Debug)]
pub struct NewBook<'a> {
    pub title: &'a str,
    pub author: &'a str,
    pub publisher: Option<&'a str>,
    pub language: &'a str,
    pub version: Option<&'a str>,
}

impl AddBook {
    pub fn new_book(&self) -> AppResult<NewBook<'_>> {
        fn required(value: &Option<String>) -> Option<&str> {
            value.as_deref().map(str::trim).filter(|v| !v.is_empty())
        }

        match (required(&self.title), required(&self.author), required(&self.language)) {
            (Some(title), Some(author), Some(language)) => Ok(NewBook {
                title,
                author,
                publisher: required(&self.publisher),
                language,
                version: required(&self.version),
            }),
            _ => Err(AppError::Validation(
                "Title, author and language are required for a new book".to_string(),
            )),
        }
    }
}

/// Remove copies of a title
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct RemoveCopies {
    #[validate(length(min = 1, message = "ISBN is required"))]
    pub isbn: String,
    #[validate(range(min = 1, message = "Copies must be greater than zero"))]
    pub copies: i32,
}

/// Partial update of a title; empty strings are ignored
#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct UpdateBook {
    pub title: Option<String>,
    #[serde(alias = "authors")]
    pub author: Option<String>,
    pub publisher: Option<String>,
    pub language: Option<String>,
    pub version: Option<String>,
    pub total_copies: Option<i32>,
}

impl UpdateBook {
    /// Merge provided non-empty fields into `book`.
    /// Returns true when `available_copies` had to be clamped.
    pub fn apply(&self, book: &mut BookInventory) -> AppResult<bool> {
        fn merge(target: &mut String, value: &Option<String>) {
            if let Some(v) = value.as_deref().map(str::trim).filter(|v| !v.is_empty()) {
                *target = v.to_string();
            }
        }
        fn merge_opt(target: &mut Option<String>, value: &Option<String>) {
            if let Some(v) = value.as_deref().map(str::trim).filter(|v| !v.is_empty()) {
                *target = Some(v.to_string());
            }
        }

        merge(&mut book.title, &self.title);
        merge(&mut book.author, &self.author);
        merge(&mut book.language, &self.language);
        merge_opt(&mut book.publisher, &self.publisher);
        merge_opt(&mut book.version, &self.version);

        match self.total_copies {
            Some(total) if total != book.total_copies => book.resize(total),
            _ => Ok(false),
        }
    }
}

/// Response for add/update operations
#[derive(Debug, Serialize, ToSchema)]
pub struct BookResponse {
    pub message: String,
    pub book: Option<BookInventory>,
}
