//! Issuance ledger service

use chrono::{DateTime, Utc};

use crate::{
    error::{AppError, AppResult},
    models::{
        issue::{IssueBookRequest, IssueHistoryEntry, IssueRecord, NewIssue},
        user::UserClaims,
    },
    repository::Repository,
};

#[derive(Clone)]
pub struct IssuesService {
    repository: Repository,
}

impl IssuesService {
    pub fn new(repository: Repository) -> Self {
        Self { repository }
    }

    /// Hand a copy to a reader without a prior request.
    ///
    /// `expected_return_date` must already be checked with
    /// [`check_expected_return`](crate::models::issue::check_expected_return).
    pub async fn issue_book(
        &self,
        admin: &UserClaims,
        input: &IssueBookRequest,
        expected_return_date: DateTime<Utc>,
    ) -> AppResult<IssueRecord> {
        let issue_approver_id = match input.issue_approver_id {
            Some(id) if id != admin.id => {
                let approver = self.repository.users.get_by_id(id).await.map_err(|e| match e {
                    AppError::NotFound(_) => invalid_approver(id),
                    other => other,
                })?;
                if !approver.can_approve_in(admin.library_id) {
                    return Err(invalid_approver(id));
                }
                id
            }
            _ => admin.id,
        };

        let issue = self
            .repository
            .issues
            .issue_direct(&NewIssue {
                isbn: input.isbn.clone(),
                reader_id: input.reader_id,
                issue_approver_id,
                library_id: admin.library_id,
                expected_return_date,
                request_id: None,
            })
            .await?;

        tracing::info!(
            issue_id = issue.id,
            isbn = %issue.isbn,
            reader_id = issue.reader_id,
            approver_id = issue.issue_approver_id,
            "Book issued"
        );
        Ok(issue)
    }

    /// Record a return and put the copy back into circulation
    pub async fn return_book(&self, admin: &UserClaims, issue_id: i32) -> AppResult<IssueRecord> {
        let returned = self
            .repository
            .issues
            .return_issue(issue_id, admin.library_id, admin.id)
            .await?;

        if returned.restock_skipped {
            tracing::warn!(
                issue_id,
                isbn = %returned.issue.isbn,
                "Returned copy not restocked, inventory already full or removed"
            );
        }
        tracing::info!(issue_id, reader_id = returned.issue.reader_id, by = admin.id, "Book returned");
        Ok(returned.issue)
    }

    /// Issuance history of the caller, with overdue flags
    pub async fn history(&self, reader: &UserClaims) -> AppResult<Vec<IssueHistoryEntry>> {
        let now = Utc::now();
        let issues = self.repository.issues.list_for_reader(reader.id).await?;
        Ok(issues
            .into_iter()
            .map(|issue| IssueHistoryEntry {
                is_overdue: issue.is_overdue(now),
                issue,
            })
            .collect())
    }
}

fn invalid_approver(id: i32) -> AppError {
    AppError::Validation(format!(
        "issue_approver_id {} is not an Owner or LibraryAdmin of your library",
        id
    ))
}
