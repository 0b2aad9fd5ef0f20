//! User model and related types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use validator::Validate;

use super::access::{Action, Role};
use crate::error::AppError;

/// Full user model from database
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct User {
    pub id: i32,
    pub name: String,
    pub email: String,
    /// Hashed password (argon2)
    #[serde(skip_serializing)]
    pub password: String,
    pub contact_number: String,
    pub role: Role,
    pub library_id: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    /// True when this user may be recorded as the approver of an issuance in `library_id`
    pub fn can_approve_in(&self, library_id: i32) -> bool {
        self.library_id == library_id && self.role.can(Action::IssueBooks)
    }
}

/// Public self-registration
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct RegisterUser {
    #[validate(length(min = 1, message = "Name is required"))]
    pub name: String,
    #[validate(email(message = "Invalid email format"))]
    pub email: String,
    #[validate(length(min = 6, message = "Password must be at least 6 characters"))]
    pub password: String,
    #[validate(length(min = 1, message = "Contact number is required"))]
    pub contact_number: String,
    /// Only `Reader` is accepted here; other roles are granted by an owner
    pub role: Option<Role>,
    pub library_id: i32,
}

/// Owner registration, creates the library and its first owner together
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct RegisterOwner {
    #[validate(length(min = 1, message = "Name is required"))]
    pub name: String,
    #[validate(email(message = "Invalid email format"))]
    pub email: String,
    #[validate(length(min = 6, message = "Password must be at least 6 characters"))]
    pub password: String,
    #[validate(length(min = 1, message = "Contact number is required"))]
    pub contact_number: String,
    #[validate(length(min = 1, message = "Library name is required"))]
    pub library_name: String,
}

/// Values needed to insert a user row
#[derive(Debug)]
pub struct NewUser<'a> {
    pub name: &'a str,
    pub email: &'a str,
    pub password_hash: &'a str,
    pub contact_number: &'a str,
    pub role: Role,
    pub library_id: i32,
}

/// Login request
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct LoginRequest {
    #[validate(email(message = "Invalid email format"))]
    pub email: String,
    #[validate(length(min = 1, message = "Password is required"))]
    pub password: String,
}

/// Promote or demote a user of the owner's library
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct AdminAssignment {
    #[validate(email(message = "Invalid email format"))]
    pub email: String,
}

/// Signed-token claims for authenticated users
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserClaims {
    pub sub: String,
    pub id: i32,
    pub email: String,
    pub role: Role,
    pub library_id: i32,
    pub exp: i64,
    pub iat: i64,
}

impl UserClaims {
    pub fn for_user(user: &User, issued_at: DateTime<Utc>, lifetime_hours: u64) -> Self {
        let iat = issued_at.timestamp();
        Self {
            sub: user.email.clone(),
            id: user.id,
            email: user.email.clone(),
            role: user.role,
            library_id: user.library_id,
            exp: iat + lifetime_hours as i64 * 3600,
            iat,
        }
    }

    /// Create a new HS256 token
    pub fn create_token(&self, secret: &str) -> Result<String, jsonwebtoken::errors::Error> {
        use jsonwebtoken::{encode, EncodingKey, Header};
        encode(
            &Header::default(),
            self,
            &EncodingKey::from_secret(secret.as_bytes()),
        )
    }

    /// Parse and verify a token; expiry is enforced by the default validation
    pub fn from_token(token: &str, secret: &str) -> Result<Self, jsonwebtoken::errors::Error> {
        use jsonwebtoken::{decode, DecodingKey, Validation};
        let token_data = decode::<Self>(
            token,
            &DecodingKey::from_secret(secret.as_bytes()),
            &Validation::default(),
        )?;
        Ok(token_data.claims)
    }

    /// Replace the role and library carried by the token with the stored ones,
    /// so a demotion applies before the token expires
    pub fn refreshed(self, user: &User) -> Self {
        Self {
            role: user.role,
            library_id: user.library_id,
            ..self
        }
    }

    /// Fails with `Authorization` unless the caller's role permits `action`
    pub fn require(&self, action: Action) -> Result<(), AppError> {
        if self.role.can(action) {
            Ok(())
        } else {
            Err(AppError::Authorization(format!(
                "Role {} is not allowed to {}",
                self.role,
                action.describe()
            )))
        }
    }
}
