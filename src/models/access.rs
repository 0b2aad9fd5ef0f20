//! Roles and the capability table consulted by every operation

use serde::{Deserialize, Serialize};
use sqlx::{Decode, Encode, Postgres};
use utoipa::ToSchema;

/// Closed set of roles a user can hold inside one library
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
pub enum Role {
    Owner,
    LibraryAdmin,
    Reader,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Owner => "Owner",
            Role::LibraryAdmin => "LibraryAdmin",
            Role::Reader => "Reader",
        }
    }

    /// Capability table lookup.
    pub fn can(self, action: Action) -> bool {
        use Action::*;
        match self {
            Role::Owner => true,
            Role::LibraryAdmin => !matches!(action, CreateLibrary | ManageAdmins),
            Role::Reader => matches!(
                action,
                RaiseRequest | ViewOwnIssues | ViewLibraryRequests | ViewBooks
            ),
        }
    }

    /// Which requests a role sees when listing the library's requests
    pub fn request_scope(self) -> RequestScope {
        match self {
            Role::Owner | Role::LibraryAdmin => RequestScope::Library,
            Role::Reader => RequestScope::Own,
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Owner" => Ok(Role::Owner),
            "LibraryAdmin" => Ok(Role::LibraryAdmin),
            "Reader" => Ok(Role::Reader),
            _ => Err(format!("Invalid role: {}", s)),
        }
    }
}

impl sqlx::Type<Postgres> for Role {
    fn type_info() -> sqlx::postgres::PgTypeInfo {
        <String as sqlx::Type<Postgres>>::type_info()
    }

    fn compatible(ty: &sqlx::postgres::PgTypeInfo) -> bool {
        <String as sqlx::Type<Postgres>>::compatible(ty)
    }
}

impl<'r> Decode<'r, Postgres> for Role {
    fn decode(value: sqlx::postgres::PgValueRef<'r>) -> Result<Self, sqlx::error::BoxDynError> {
        let s: String = Decode::<Postgres>::decode(value)?;
        s.parse().map_err(|e: String| e.into())
    }
}

impl Encode<'_, Postgres> for Role {
    fn encode_by_ref(&self, buf: &mut sqlx::postgres::PgArgumentBuffer) -> sqlx::encode::IsNull {
        <&str as Encode<Postgres>>::encode(self.as_str(), buf)
    }
}

/// Every guarded action of the service
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    CreateLibrary,
    ManageAdmins,
    ManageBooks,
    ViewBooks,
    ViewUsers,
    ResolveRequests,
    IssueBooks,
    ReturnBooks,
    RaiseRequest,
    ViewOwnIssues,
    ViewLibraryRequests,
}

impl Action {
    pub fn describe(&self) -> &'static str {
        match self {
            Action::CreateLibrary => "create libraries",
            Action::ManageAdmins => "assign or revoke admin rights",
            Action::ManageBooks => "manage books",
            Action::ViewBooks => "view books",
            Action::ViewUsers => "view users",
            Action::ResolveRequests => "approve or reject requests",
            Action::IssueBooks => "issue books",
            Action::ReturnBooks => "return books",
            Action::RaiseRequest => "raise requests",
            Action::ViewOwnIssues => "view issue history",
            Action::ViewLibraryRequests => "view requests",
        }
    }
}

/// Visibility of request listings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestScope {
    Library,
    Own,
}
