//! Inventory ledger service

use crate::{
    error::AppResult,
    models::book::{AddBook, BookInventory, UpdateBook},
    repository::{
        books::{RemovedCopies, StockChange},
        Repository,
    },
};

#[derive(Clone)]
pub struct InventoryService {
    repository: Repository,
}

impl InventoryService {
    pub fn new(repository: Repository) -> Self {
        Self { repository }
    }

    pub async fn list_books(&self, library_id: i32) -> AppResult<Vec<BookInventory>> {
        self.repository.books.list(library_id).await
    }

    pub async fn get_book(&self, isbn: &str, library_id: i32) -> AppResult<BookInventory> {
        self.repository.books.get(isbn, library_id).await
    }

    pub async fn add_or_increment(&self, library_id: i32, input: &AddBook) -> AppResult<StockChange> {
        let change = self.repository.books.add_or_increment(library_id, input).await?;
        match &change {
            StockChange::Created(book) => tracing::info!(
                isbn = %book.isbn, library_id, copies = book.total_copies,
                "Book added to catalog"
            ),
            StockChange::Incremented(book) => tracing::info!(
                isbn = %book.isbn, library_id, added = input.copies, total = book.total_copies,
                "Book copies incremented"
            ),
        }
        Ok(change)
    }

    pub async fn remove_copies(
        &self,
        library_id: i32,
        isbn: &str,
        copies: i32,
    ) -> AppResult<Option<BookInventory>> {
        match self.repository.books.remove_copies(library_id, isbn, copies).await? {
            RemovedCopies::Deleted => {
                tracing::info!(isbn, library_id, "Last copies removed, book deleted from catalog");
                Ok(None)
            }
            RemovedCopies::Remaining { book, clamped } => {
                if clamped {
                    tracing::warn!(
                        isbn, library_id, copies,
                        "available_copies clamped at 0 while removing copies, counts were inconsistent"
                    );
                }
                tracing::info!(isbn, library_id, removed = copies, total = book.total_copies, "Book copies removed");
                Ok(Some(book))
            }
        }
    }

    pub async fn update_book(
        &self,
        library_id: i32,
        isbn: &str,
        update: &UpdateBook,
    ) -> AppResult<BookInventory> {
        let (book, clamped) = self.repository.books.update(library_id, isbn, update).await?;
        if clamped {
            tracing::warn!(
                isbn, library_id, total = book.total_copies,
                "available_copies clamped at 0 after shrinking total copies below issued copies"
            );
        }
        tracing::info!(isbn, library_id, "Book updated");
        Ok(book)
    }
}
