//! Borrow request workflow
//!
//! One row per workflow instance. It starts as `Issue` (pending) and is
//! resolved in place exactly once, to `Approve` or `Reject`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{Decode, Encode, FromRow, Postgres};
use utoipa::ToSchema;
use validator::Validate;

use crate::error::{AppError, AppResult};

/// Request state as stored in `request_events.request_type`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub enum RequestType {
    /// Pending, a copy is reserved
    Issue,
    Approve,
    Reject,
}

impl RequestType {
    pub fn as_str(&self) -> &'static str {
        match self {
            RequestType::Issue => "Issue",
            RequestType::Approve => "Approve",
            RequestType::Reject => "Reject",
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, RequestType::Issue)
    }

    /// Human-facing status label
    pub fn status(&self) -> RequestStatus {
        match self {
            RequestType::Issue => RequestStatus::Pending,
            RequestType::Approve => RequestStatus::Approved,
            RequestType::Reject => RequestStatus::Rejected,
        }
    }

    /// The only transitions are `Issue -> Approve` and `Issue -> Reject`.
    pub fn resolve(self, decision: Decision) -> AppResult<RequestType> {
        if self.is_terminal() {
            return Err(AppError::Conflict(format!(
                "Request already resolved ({})",
                self.status()
            )));
        }
        Ok(match decision {
            Decision::Approve => RequestType::Approve,
            Decision::Reject => RequestType::Reject,
        })
    }
}

impl std::str::FromStr for RequestType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Issue" => Ok(RequestType::Issue),
            "Approve" => Ok(RequestType::Approve),
            "Reject" => Ok(RequestType::Reject),
            _ => Err(format!("Invalid request type: {}", s)),
        }
    }
}

impl sqlx::Type<Postgres> for RequestType {
    fn type_info() -> sqlx::postgres::PgTypeInfo {
        <String as sqlx::Type<Postgres>>::type_info()
    }

    fn compatible(ty: &sqlx::postgres::PgTypeInfo) -> bool {
        <String as sqlx::Type<Postgres>>::compatible(ty)
    }
}

impl<'r> Decode<'r, Postgres> for RequestType {
    fn decode(value: sqlx::postgres::PgValueRef<'r>) -> Result<Self, sqlx::error::BoxDynError> {
        let s: String = Decode::<Postgres>::decode(value)?;
        s.parse().map_err(|e: String| e.into())
    }
}

impl Encode<'_, Postgres> for RequestType {
    fn encode_by_ref(&self, buf: &mut sqlx::postgres::PgArgumentBuffer) -> sqlx::encode::IsNull {
        <&str as Encode<Postgres>>::encode(self.as_str(), buf)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub enum RequestStatus {
    Pending,
    Approved,
    Rejected,
}

impl std::fmt::Display for RequestStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            RequestStatus::Pending => "Pending",
            RequestStatus::Approved => "Approved",
            RequestStatus::Rejected => "Rejected",
        };
        write!(f, "{}", s)
    }
}

/// Admin decision on a pending request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Approve,
    Reject,
}

impl std::str::FromStr for Decision {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Approve" => Ok(Decision::Approve),
            "Reject" => Ok(Decision::Reject),
            other => Err(AppError::Validation(format!(
                "request_type must be Approve or Reject, got {:?}",
                other
            ))),
        }
    }
}

/// Request row from database
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct RequestEvent {
    pub id: i32,
    /// ISBN of the requested book
    pub book_id: String,
    pub library_id: i32,
    pub reader_id: i32,
    pub request_date: DateTime<Utc>,
    pub request_type: RequestType,
    pub approval_date: Option<DateTime<Utc>>,
    pub approver_id: Option<i32>,
}

/// Raise request body
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct RaiseRequest {
    #[serde(rename = "bookID", alias = "isbn")]
    #[validate(length(min = 1, message = "bookID is required"))]
    pub book_id: String,
}

/// Approve/reject body
#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateRequestStatus {
    /// `Approve` or `Reject`
    pub request_type: String,
    /// Overrides the configured loan duration for the issuance created on approval
    pub expected_return_date: Option<DateTime<Utc>>,
}

/// Joined request listing row
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct RequestDetail {
    pub id: i32,
    pub book_id: String,
    pub book_title: Option<String>,
    pub reader_id: i32,
    pub reader_name: String,
    pub request_date: DateTime<Utc>,
    pub approval_date: Option<DateTime<Utc>>,
    pub approver_id: Option<i32>,
    pub approver_email: Option<String>,
    pub request_type: RequestType,
    pub issue_id: Option<i32>,
    pub expected_return_date: Option<DateTime<Utc>>,
    pub return_date: Option<DateTime<Utc>>,
    pub return_approver_email: Option<String>,
}

/// `RequestDetail` plus derived status labels
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct RequestSummary {
    #[serde(flatten)]
    pub detail: RequestDetail,
    pub status: RequestStatus,
    /// `Returned`, `Not Returned`, or `N/A` when nothing was issued
    pub return_status: String,
}

impl From<RequestDetail> for RequestSummary {
    fn from(detail: RequestDetail) -> Self {
        let return_status = match (detail.issue_id, detail.return_date) {
            (None, _) => "N/A",
            (Some(_), Some(_)) => "Returned",
            (Some(_), None) => "Not Returned",
        }
        .to_string();
        Self {
            status: detail.request_type.status(),
            return_status,
            detail,
        }
    }
}
