//! Data models for LibMS

pub mod access;
pub mod book;
pub mod issue;
pub mod library;
pub mod request_event;
pub mod user;

// Re-export commonly used types
pub use access::{Action, RequestScope, Role};
pub use book::BookInventory;
pub use issue::{IssueRecord, IssueStatus};
pub use library::Library;
pub use request_event::{Decision, RequestEvent, RequestType};
pub use user::{User, UserClaims};
