//! Inventory repository
//!
//! Every change to copy counts runs inside a transaction that holds the
//! inventory row with `SELECT ... FOR UPDATE`, so concurrent writers on the
//! same (isbn, library) are serialized.

use sqlx::{PgConnection, Pool, Postgres};

use crate::{
    error::{AppError, AppResult},
    models::book::{AddBook, BookInventory, CopyRemoval, UpdateBook},
};

/// Result of an add-or-increment call
#[derive(Debug)]
pub enum StockChange {
    Created(BookInventory),
    Incremented(BookInventory),
}

/// Result of a copy removal
#[derive(Debug)]
pub enum RemovedCopies {
    /// The last copies were removed and the row is gone
    Deleted,
    Remaining { book: BookInventory, clamped: bool },
}

/// Lock the inventory row for the rest of the transaction
pub(crate) async fn lock_inventory(
    conn: &mut PgConnection,
    isbn: &str,
    library_id: i32,
) -> AppResult<Option<BookInventory>> {
    let book = sqlx::query_as::<_, BookInventory>(
        "SELECT * FROM book_inventories WHERE isbn = $1 AND library_id = $2 FOR UPDATE",
    )
    .bind(isbn)
    .bind(library_id)
    .fetch_optional(conn)
    .await?;
    Ok(book)
}

/// Persist copy counts of a locked row
pub(crate) async fn save_counts(
    conn: &mut PgConnection,
    book: &BookInventory,
) -> AppResult<BookInventory> {
    let saved = sqlx::query_as::<_, BookInventory>(
        r#"
        UPDATE book_inventories
        SET total_copies = $2, available_copies = $3, updated_at = NOW()
        WHERE id = $1
        RETURNING *
        "#,
    )
    .bind(book.id)
    .bind(book.total_copies)
    .bind(book.available_copies)
    .fetch_one(conn)
    .await?;
    Ok(saved)
}

#[derive(Clone)]
pub struct BooksRepository {
    pool: Pool<Postgres>,
}

impl BooksRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// All titles of a library
    pub async fn list(&self, library_id: i32) -> AppResult<Vec<BookInventory>> {
        let books = sqlx::query_as::<_, BookInventory>(
            "SELECT * FROM book_inventories WHERE library_id = $1 ORDER BY title, isbn",
        )
        .bind(library_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(books)
    }

    pub async fn get(&self, isbn: &str, library_id: i32) -> AppResult<BookInventory> {
        sqlx::query_as::<_, BookInventory>(
            "SELECT * FROM book_inventories WHERE isbn = $1 AND library_id = $2",
        )
        .bind(isbn)
        .bind(library_id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Book {} not found in this library", isbn)))
    }

    /// Increment an existing title, or create it when allowed
    pub async fn add_or_increment(&self, library_id: i32, input: &AddBook) -> AppResult<StockChange> {
        let mut tx = self.pool.begin().await?;

        if let Some(mut book) = lock_inventory(&mut tx, &input.isbn, library_id).await? {
            book.add_copies(input.copies)?;
            let saved = save_counts(&mut tx, &book).await?;
            tx.commit().await?;
            return Ok(StockChange::Incremented(saved));
        }

        if input.increment_only {
            return Err(AppError::NotFound(format!(
                "Cannot increment copies of nonexistent book {}",
                input.isbn
            )));
        }

        let new_book = input.new_book()?;
        let created = sqlx::query_as::<_, BookInventory>(
            r#"
            INSERT INTO book_inventories
                (isbn, library_id, title, author, publisher, language, version,
                 total_copies, available_copies)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $8)
            RETURNING *
            "#,
        )
        .bind(&input.isbn)
        .bind(library_id)
        .bind(new_book.title)
        .bind(new_book.author)
        .bind(new_book.publisher)
        .bind(new_book.language)
        .bind(new_book.version)
        .bind(input.copies)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| AppError::from_unique_violation(e, "Book was created concurrently, retry"))?;

        tx.commit().await?;
        Ok(StockChange::Created(created))
    }

    /// Remove copies from the available pool, deleting the row when none remain
    pub async fn remove_copies(
        &self,
        library_id: i32,
        isbn: &str,
        copies: i32,
    ) -> AppResult<RemovedCopies> {
        let mut tx = self.pool.begin().await?;

        let mut book = lock_inventory(&mut tx, isbn, library_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Book {} not found in this library", isbn)))?;

        let outcome = match book.plan_removal(copies)? {
            CopyRemoval::DeleteRow => {
                sqlx::query("DELETE FROM book_inventories WHERE id = $1")
                    .bind(book.id)
                    .execute(&mut *tx)
                    .await?;
                RemovedCopies::Deleted
            }
            CopyRemoval::Shrink { total_copies, available_copies, clamped } => {
                book.total_copies = total_copies;
                book.available_copies = available_copies;
                let book = save_counts(&mut tx, &book).await?;
                RemovedCopies::Remaining { book, clamped }
            }
        };

        tx.commit().await?;
        Ok(outcome)
    }

    /// Merge metadata and optionally resize; returns the row and whether availability was clamped
    pub async fn update(
        &self,
        library_id: i32,
        isbn: &str,
        update: &UpdateBook,
    ) -> AppResult<(BookInventory, bool)> {
        let mut tx = self.pool.begin().await?;

        let mut book = lock_inventory(&mut tx, isbn, library_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Book {} not found in this library", isbn)))?;

        let clamped = update.apply(&mut book)?;

        let saved = sqlx::query_as::<_, BookInventory>(
            r#"
            UPDATE book_inventories
            SET title = $2, author = $3, publisher = $4, language = $5, version = $6,
                total_copies = $7, available_copies = $8, updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(book.id)
        .bind(&book.title)
        .bind(&book.author)
        .bind(&book.publisher)
        .bind(&book.language)
        .bind(&book.version)
        .bind(book.total_copies)
        .bind(book.available_copies)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok((saved, clamped))
    }
}
