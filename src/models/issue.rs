//! Issuance (loan) records

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{Decode, Encode, FromRow, Postgres};
use utoipa::ToSchema;
use validator::Validate;

use crate::error::{AppError, AppResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub enum IssueStatus {
    Issued,
    Returned,
}

impl IssueStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            IssueStatus::Issued => "Issued",
            IssueStatus::Returned => "Returned",
        }
    }
}

impl std::str::FromStr for IssueStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Issued" => Ok(IssueStatus::Issued),
            "Returned" => Ok(IssueStatus::Returned),
            _ => Err(format!("Invalid issue status: {}", s)),
        }
    }
}

impl sqlx::Type<Postgres> for IssueStatus {
    fn type_info() -> sqlx::postgres::PgTypeInfo {
        <String as sqlx::Type<Postgres>>::type_info()
    }

    fn compatible(ty: &sqlx::postgres::PgTypeInfo) -> bool {
        <String as sqlx::Type<Postgres>>::compatible(ty)
    }
}

impl<'r> Decode<'r, Postgres> for IssueStatus {
    fn decode(value: sqlx::postgres::PgValueRef<'r>) -> Result<Self, sqlx::error::BoxDynError> {
        let s: String = Decode::<Postgres>::decode(value)?;
        s.parse().map_err(|e: String| e.into())
    }
}

impl Encode<'_, Postgres> for IssueStatus {
    fn encode_by_ref(&self, buf: &mut sqlx::postgres::PgArgumentBuffer) -> sqlx::encode::IsNull {
        <&str as Encode<Postgres>>::encode(self.as_str(), buf)
    }
}

/// Issue registry row from database
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct IssueRecord {
    pub id: i32,
    pub isbn: String,
    pub reader_id: i32,
    pub issue_approver_id: i32,
    pub issue_status: IssueStatus,
    pub issue_date: DateTime<Utc>,
    pub expected_return_date: DateTime<Utc>,
    pub return_date: Option<DateTime<Utc>>,
    pub return_approver_id: Option<i32>,
    pub library_id: i32,
    /// Originating request, `None` for a direct issue
    pub request_id: Option<i32>,
}

impl IssueRecord {
    pub fn ensure_not_returned(&self) -> AppResult<()> {
        if self.return_date.is_some() || self.issue_status == IssueStatus::Returned {
            return Err(AppError::Conflict(format!("Issue {} already returned", self.id)));
        }
        Ok(())
    }

    pub fn is_overdue(&self, now: DateTime<Utc>) -> bool {
        self.return_date.is_none() && self.expected_return_date < now
    }
}

/// Values for a new issuance, shared by approval and the direct issue endpoint
#[derive(Debug, Clone)]
pub struct NewIssue {
    pub isbn: String,
    pub reader_id: i32,
    pub issue_approver_id: i32,
    pub library_id: i32,
    pub expected_return_date: DateTime<Utc>,
    pub request_id: Option<i32>,
}

/// The expected return date must be set and lie in the future
pub fn check_expected_return(
    expected: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
) -> AppResult<DateTime<Utc>> {
    match expected {
        None => Err(AppError::Validation("Expected return date is required".to_string())),
        Some(date) if date.timestamp() <= 0 => {
            Err(AppError::Validation("Expected return date is required".to_string()))
        }
        Some(date) if date <= now => Err(AppError::Validation(
            "Expected return date must be in the future".to_string(),
        )),
        Some(date) => Ok(date),
    }
}

/// Direct issue body
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct IssueBookRequest {
    #[validate(length(min = 1, message = "ISBN is required"))]
    pub isbn: String,
    pub reader_id: i32,
    /// Defaults to the caller
    pub issue_approver_id: Option<i32>,
    pub expected_return_date: Option<DateTime<Utc>>,
}

/// Issuance with its overdue flag, as returned by history listings
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct IssueHistoryEntry {
    #[serde(flatten)]
    pub issue: IssueRecord,
    pub is_overdue: bool,
}
