//! Borrow request workflow: raise, approve or reject, list

use chrono::{DateTime, Duration, Utc};

use crate::{
    config::CirculationConfig,
    error::{AppError, AppResult},
    models::{
        access::RequestScope,
        issue::check_expected_return,
        request_event::{Decision, RequestEvent, RequestSummary},
        user::UserClaims,
    },
    repository::{requests::Resolution, Repository},
};

#[derive(Clone)]
pub struct RequestsService {
    repository: Repository,
    circulation: CirculationConfig,
}

impl RequestsService {
    pub fn new(repository: Repository, circulation: CirculationConfig) -> Self {
        Self { repository, circulation }
    }

    /// Reserve a copy for the caller and record a pending request
    pub async fn raise(&self, reader: &UserClaims, isbn: &str) -> AppResult<RequestEvent> {
        let request = self
            .repository
            .requests
            .raise(reader.id, reader.library_id, isbn, self.circulation.max_active_requests)
            .await?;

        tracing::info!(
            request_id = request.id,
            reader_id = reader.id,
            isbn,
            library_id = reader.library_id,
            "Borrow request raised"
        );
        Ok(request)
    }

    pub async fn get(&self, caller: &UserClaims, id: i32) -> AppResult<RequestEvent> {
        let request = self.repository.requests.get(id, caller.library_id).await?;
        if caller.role.request_scope() == RequestScope::Own && request.reader_id != caller.id {
            return Err(AppError::NotFound(format!("Request {} not found", id)));
        }
        Ok(request)
    }

    /// Approve or reject a pending request of the approver's library.
    ///
    /// `due_override` replaces the configured loan duration on approval.
    pub async fn resolve(
        &self,
        approver: &UserClaims,
        id: i32,
        decision: Decision,
        due_override: Option<DateTime<Utc>>,
    ) -> AppResult<Resolution> {
        let due_date = self.due_date(due_override, Utc::now())?;

        let resolution = self
            .repository
            .requests
            .resolve(id, approver.library_id, decision, approver.id, due_date)
            .await?;

        match decision {
            Decision::Approve => tracing::info!(
                request_id = id,
                approver_id = approver.id,
                issue_id = resolution.issue.as_ref().map(|i| i.id),
                %due_date,
                "Borrow request approved"
            ),
            Decision::Reject => {
                if resolution.restock_skipped {
                    tracing::warn!(
                        request_id = id,
                        isbn = %resolution.request.book_id,
                        "Rejected request could not restore its copy, inventory already full or removed"
                    );
                }
                tracing::info!(request_id = id, approver_id = approver.id, "Borrow request rejected");
            }
        }
        Ok(resolution)
    }

    /// Requests visible to the caller: the whole library, or only their own
    pub async fn list(&self, caller: &UserClaims) -> AppResult<Vec<RequestSummary>> {
        let reader_filter = match caller.role.request_scope() {
            RequestScope::Library => None,
            RequestScope::Own => Some(caller.id),
        };
        let details = self
            .repository
            .requests
            .list_details(caller.library_id, reader_filter)
            .await?;
        Ok(details.into_iter().map(RequestSummary::from).collect())
    }

    fn due_date(
        &self,
        due_override: Option<DateTime<Utc>>,
        now: DateTime<Utc>,
    ) -> AppResult<DateTime<Utc>> {
        match due_override {
            Some(date) => check_expected_return(Some(date), now),
            None => Ok(now + Duration::days(self.circulation.loan_duration_days)),
        }
    }
}
