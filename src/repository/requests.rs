//! Request events repository: the borrowing workflow transactions

use chrono::{DateTime, Utc};
use sqlx::{Pool, Postgres};

use crate::{
    error::{AppError, AppResult},
    models::{
        issue::{IssueRecord, NewIssue},
        request_event::{Decision, RequestDetail, RequestEvent, RequestType},
    },
};

use super::{
    books::{lock_inventory, save_counts},
    issues::insert_issue,
    users::lock_reader,
};

/// Outcome of resolving a pending request
#[derive(Debug)]
pub struct Resolution {
    pub request: RequestEvent,
    /// Created on approval
    pub issue: Option<IssueRecord>,
    /// Reject could not put the reserved copy back (row missing or already full)
    pub restock_skipped: bool,
}

#[derive(Clone)]
pub struct RequestsRepository {
    pool: Pool<Postgres>,
}

impl RequestsRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    pub async fn get(&self, id: i32, library_id: i32) -> AppResult<RequestEvent> {
        sqlx::query_as::<_, RequestEvent>(
            "SELECT * FROM request_events WHERE id = $1 AND library_id = $2",
        )
        .bind(id)
        .bind(library_id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Request {} not found", id)))
    }

    /// Quota check, availability check, reservation and insert as one unit.
    ///
    /// The reader row is locked first so that two requests from the same
    /// reader cannot both pass the quota check, then the inventory row is
    /// locked so that two readers cannot take the same last copy. Every
    /// transaction touching both rows takes them in this order.
    pub async fn raise(
        &self,
        reader_id: i32,
        library_id: i32,
        isbn: &str,
        max_active: i64,
    ) -> AppResult<RequestEvent> {
        let mut tx = self.pool.begin().await?;

        lock_reader(&mut tx, reader_id, library_id).await?;

        let active: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*)
            FROM request_events re
            LEFT JOIN issue_registries ir ON ir.request_id = re.id
            WHERE re.reader_id = $1
              AND (re.request_type = 'Issue'
                   OR (re.request_type = 'Approve' AND ir.return_date IS NULL))
            "#,
        )
        .bind(reader_id)
        .fetch_one(&mut *tx)
        .await?;

        if active >= max_active {
            return Err(AppError::QuotaExceeded(format!(
                "Maximum of {} active requests reached",
                max_active
            )));
        }

        let mut book = lock_inventory(&mut tx, isbn, library_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Book {} not found in your library", isbn)))?;
        book.reserve_copy()?;
        save_counts(&mut tx, &book).await?;

        let request = sqlx::query_as::<_, RequestEvent>(
            r#"
            INSERT INTO request_events (book_id, library_id, reader_id, request_date, request_type)
            VALUES ($1, $2, $3, NOW(), $4)
            RETURNING *
            "#,
        )
        .bind(isbn)
        .bind(library_id)
        .bind(reader_id)
        .bind(RequestType::Issue)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(request)
    }

    /// Approve or reject a pending request.
    ///
    /// Approve leaves inventory untouched (the copy was reserved when the
    /// request was raised) and opens an issuance due at `due_date`.
    /// Reject puts the reserved copy back.
    pub async fn resolve(
        &self,
        id: i32,
        library_id: i32,
        decision: Decision,
        approver_id: i32,
        due_date: DateTime<Utc>,
    ) -> AppResult<Resolution> {
        let mut tx = self.pool.begin().await?;

        let request = sqlx::query_as::<_, RequestEvent>(
            "SELECT * FROM request_events WHERE id = $1 AND library_id = $2 FOR UPDATE",
        )
        .bind(id)
        .bind(library_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Request {} not found", id)))?;

        let next = request.request_type.resolve(decision)?;

        let mut issue = None;
        let mut restock_skipped = false;
        match decision {
            Decision::Approve => {
                let new_issue = NewIssue {
                    isbn: request.book_id.clone(),
                    reader_id: request.reader_id,
                    issue_approver_id: approver_id,
                    library_id,
                    expected_return_date: due_date,
                    request_id: Some(request.id),
                };
                issue = Some(insert_issue(&mut tx, &new_issue).await?);
            }
            Decision::Reject => {
                restock_skipped = match lock_inventory(&mut tx, &request.book_id, library_id).await? {
                    Some(mut book) => {
                        let full = book.release_copy();
                        if !full {
                            save_counts(&mut tx, &book).await?;
                        }
                        full
                    }
                    None => true,
                };
            }
        }

        let request = sqlx::query_as::<_, RequestEvent>(
            r#"
            UPDATE request_events
            SET request_type = $2, approval_date = NOW(), approver_id = $3
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(next)
        .bind(approver_id)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(Resolution { request, issue, restock_skipped })
    }

    /// Joined listing of requests; `reader_id` restricts it to one reader
    pub async fn list_details(
        &self,
        library_id: i32,
        reader_id: Option<i32>,
    ) -> AppResult<Vec<RequestDetail>> {
        let details = sqlx::query_as::<_, RequestDetail>(
            r#"
            SELECT re.id, re.book_id, bi.title AS book_title,
                   re.reader_id, ru.name AS reader_name,
                   re.request_date, re.approval_date, re.approver_id,
                   ia.email AS approver_email, re.request_type,
                   ir.id AS issue_id, ir.expected_return_date, ir.return_date,
                   ra.email AS return_approver_email
            FROM request_events re
            JOIN users ru ON ru.id = re.reader_id
            LEFT JOIN book_inventories bi ON bi.isbn = re.book_id AND bi.library_id = re.library_id
            LEFT JOIN users ia ON ia.id = re.approver_id
            LEFT JOIN issue_registries ir ON ir.request_id = re.id
            LEFT JOIN users ra ON ra.id = ir.return_approver_id
            WHERE re.library_id = $1
              AND ($2::INTEGER IS NULL OR re.reader_id = $2)
            ORDER BY re.id
            "#,
        )
        .bind(library_id)
        .bind(reader_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(details)
    }
}
