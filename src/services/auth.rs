//! Authentication, registration and role management

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use chrono::Utc;

use crate::{
    config::AuthConfig,
    error::{AppError, AppResult},
    models::{
        access::Role,
        library::Library,
        user::{NewUser, RegisterOwner, RegisterUser, User, UserClaims},
    },
    repository::Repository,
};

#[derive(Clone)]
pub struct AuthService {
    repository: Repository,
    config: AuthConfig,
}

impl AuthService {
    pub fn new(repository: Repository, config: AuthConfig) -> Self {
        Self { repository, config }
    }

    /// Authenticate by email and return a signed token
    pub async fn login(&self, email: &str, password: &str) -> AppResult<(String, User)> {
        let user = self
            .repository
            .users
            .get_by_email(email)
            .await?
            .ok_or_else(|| AppError::Authentication("Invalid credentials".to_string()))?;

        if !self.verify_password(&user, password)? {
            return Err(AppError::Authentication("Invalid credentials".to_string()));
        }

        let token = self.create_token(&user)?;
        tracing::info!(user_id = user.id, role = %user.role, "User logged in");
        Ok((token, user))
    }

    /// Verify a bearer token with the configured secret
    pub fn verify_token(&self, token: &str) -> AppResult<UserClaims> {
        UserClaims::from_token(token, &self.config.jwt_secret)
            .map_err(|e| AppError::Authentication(format!("Invalid token: {}", e)))
    }

    pub fn create_token(&self, user: &User) -> AppResult<String> {
        UserClaims::for_user(user, Utc::now(), self.config.jwt_expiration_hours)
            .create_token(&self.config.jwt_secret)
            .map_err(|e| AppError::Internal(format!("Failed to create token: {}", e)))
    }

    /// Reload the caller's role and library from storage
    pub async fn refresh_claims(&self, claims: UserClaims) -> AppResult<UserClaims> {
        let user = match self.repository.users.get_by_id(claims.id).await {
            Ok(user) => user,
            Err(AppError::NotFound(_)) => {
                return Err(AppError::Authentication("User no longer exists".to_string()))
            }
            Err(e) => return Err(e),
        };
        if user.role != claims.role {
            tracing::debug!(user_id = user.id, token_role = %claims.role, role = %user.role, "Token role is stale");
        }
        Ok(claims.refreshed(&user))
    }

    /// Public registration; only readers can sign themselves up
    pub async fn register(&self, input: RegisterUser) -> AppResult<User> {
        let role = input.role.unwrap_or(Role::Reader);
        if role != Role::Reader {
            return Err(AppError::Authorization(format!(
                "Cannot self-register as {}, ask the library owner",
                role
            )));
        }

        self.repository.libraries.get_by_id(input.library_id).await?;

        if self.repository.users.email_exists(&input.email).await? {
            return Err(AppError::Conflict("User already exists".to_string()));
        }

        let password_hash = self.hash_password(&input.password)?;
        let user = self
            .repository
            .users
            .create(&NewUser {
                name: &input.name,
                email: &input.email,
                password_hash: &password_hash,
                contact_number: &input.contact_number,
                role,
                library_id: input.library_id,
            })
            .await?;

        tracing::info!(user_id = user.id, library_id = user.library_id, "Reader registered");
        Ok(user)
    }

    /// Create a library together with its owner
    pub async fn register_owner(&self, input: RegisterOwner) -> AppResult<(Library, User)> {
        if self.repository.users.email_exists(&input.email).await? {
            return Err(AppError::Conflict("User already exists".to_string()));
        }

        let password_hash = self.hash_password(&input.password)?;
        let owner = NewUser {
            name: &input.name,
            email: &input.email,
            password_hash: &password_hash,
            contact_number: &input.contact_number,
            role: Role::Owner,
            library_id: 0,
        };

        let (library, user) = self
            .repository
            .libraries
            .create_with_owner(&input.library_name, owner)
            .await?;

        tracing::info!(library_id = library.id, owner_id = user.id, "Library registered with owner");
        Ok((library, user))
    }

    /// Promote a reader of the owner's library to LibraryAdmin
    pub async fn assign_admin(&self, owner: &UserClaims, email: &str) -> AppResult<User> {
        self.change_role(owner, email, Role::LibraryAdmin).await
    }

    /// Demote a LibraryAdmin of the owner's library back to Reader
    pub async fn revoke_admin(&self, owner: &UserClaims, email: &str) -> AppResult<User> {
        self.change_role(owner, email, Role::Reader).await
    }

    async fn change_role(&self, owner: &UserClaims, email: &str, role: Role) -> AppResult<User> {
        let target = self.repository.users.get_in_library(email, owner.library_id).await?;

        if target.id == owner.id {
            return Err(AppError::Validation("Owner cannot change their own role".to_string()));
        }
        if target.role == Role::Owner {
            return Err(AppError::Conflict("Cannot change the role of an owner".to_string()));
        }

        let user = self
            .repository
            .users
            .set_role_in_library(email, owner.library_id, role)
            .await?;

        tracing::info!(user_id = user.id, by = owner.id, role = %role, "User role changed");
        Ok(user)
    }

    pub async fn get_by_id(&self, id: i32) -> AppResult<User> {
        self.repository.users.get_by_id(id).await
    }

    pub async fn list_library_users(&self, library_id: i32) -> AppResult<Vec<User>> {
        self.repository.users.list_by_library(library_id).await
    }

    fn verify_password(&self, user: &User, password: &str) -> AppResult<bool> {
        let parsed_hash = PasswordHash::new(&user.password)
            .map_err(|_| AppError::Internal("Invalid password hash".to_string()))?;
        Ok(Argon2::default()
            .verify_password(password.as_bytes(), &parsed_hash)
            .is_ok())
    }

    /// Hash a password using Argon2
    pub fn hash_password(&self, password: &str) -> AppResult<String> {
        let salt = SaltString::generate(&mut OsRng);
        let hash = Argon2::default()
            .hash_password(password.as_bytes(), &salt)
            .map_err(|e| AppError::Internal(format!("Failed to hash password: {}", e)))?;
        Ok(hash.to_string())
    }
}
