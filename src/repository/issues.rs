//! Issue registry repository

use sqlx::{PgConnection, Pool, Postgres};

use crate::{
    error::{AppError, AppResult},
    models::issue::{IssueRecord, IssueStatus, NewIssue},
};

use super::{
    books::{lock_inventory, save_counts},
    users::lock_reader,
};

/// Insert an issuance on an existing transaction.
/// Approval and the direct issue endpoint both end up here.
pub(crate) async fn insert_issue(conn: &mut PgConnection, issue: &NewIssue) -> AppResult<IssueRecord> {
    let record = sqlx::query_as::<_, IssueRecord>(
        r#"
        INSERT INTO issue_registries
            (isbn, reader_id, issue_approver_id, issue_status, issue_date,
             expected_return_date, library_id, request_id)
        VALUES ($1, $2, $3, $4, NOW(), $5, $6, $7)
        RETURNING *
        "#,
    )
    .bind(&issue.isbn)
    .bind(issue.reader_id)
    .bind(issue.issue_approver_id)
    .bind(IssueStatus::Issued)
    .bind(issue.expected_return_date)
    .bind(issue.library_id)
    .bind(issue.request_id)
    .fetch_one(conn)
    .await?;
    Ok(record)
}

/// Outcome of a return
#[derive(Debug)]
pub struct ReturnedIssue {
    pub issue: IssueRecord,
    /// The copy could not be put back (row missing or already full)
    pub restock_skipped: bool,
}

#[derive(Clone)]
pub struct IssuesRepository {
    pool: Pool<Postgres>,
}

impl IssuesRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// Issue a copy without a prior request: reserves the copy itself
    pub async fn issue_direct(&self, issue: &NewIssue) -> AppResult<IssueRecord> {
        let mut tx = self.pool.begin().await?;

        lock_reader(&mut tx, issue.reader_id, issue.library_id).await?;

        let mut book = lock_inventory(&mut tx, &issue.isbn, issue.library_id)
            .await?
            .ok_or_else(|| {
                AppError::NotFound(format!("Book {} not found in this library", issue.isbn))
            })?;
        book.reserve_copy()?;
        save_counts(&mut tx, &book).await?;

        let record = insert_issue(&mut tx, issue).await?;

        tx.commit().await?;
        Ok(record)
    }

    /// Close an issuance and put the copy back into the available pool
    pub async fn return_issue(
        &self,
        id: i32,
        library_id: i32,
        return_approver_id: i32,
    ) -> AppResult<ReturnedIssue> {
        let mut tx = self.pool.begin().await?;

        let issue = sqlx::query_as::<_, IssueRecord>(
            "SELECT * FROM issue_registries WHERE id = $1 AND library_id = $2 FOR UPDATE",
        )
        .bind(id)
        .bind(library_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Issue {} not found", id)))?;

        issue.ensure_not_returned()?;

        let issue = sqlx::query_as::<_, IssueRecord>(
            r#"
            UPDATE issue_registries
            SET return_date = NOW(), return_approver_id = $2, issue_status = $3
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(return_approver_id)
        .bind(IssueStatus::Returned)
        .fetch_one(&mut *tx)
        .await?;

        let restock_skipped = match lock_inventory(&mut tx, &issue.isbn, library_id).await? {
            Some(mut book) => {
                let full = book.release_copy();
                if !full {
                    save_counts(&mut tx, &book).await?;
                }
                full
            }
            None => true,
        };

        tx.commit().await?;
        Ok(ReturnedIssue { issue, restock_skipped })
    }

    /// Issuance history of one reader, newest first
    pub async fn list_for_reader(&self, reader_id: i32) -> AppResult<Vec<IssueRecord>> {
        let issues = sqlx::query_as::<_, IssueRecord>(
            "SELECT * FROM issue_registries WHERE reader_id = $1 ORDER BY issue_date DESC, id DESC",
        )
        .bind(reader_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(issues)
    }
}
