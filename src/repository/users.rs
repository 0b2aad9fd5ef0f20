//! Users repository for database operations

use sqlx::{PgConnection, Pool, Postgres};

use crate::{
    error::{AppError, AppResult},
    models::{
        access::Role,
        user::{NewUser, User},
    },
};

/// Insert a user on an existing connection or transaction
pub(crate) async fn insert_user(conn: &mut PgConnection, user: &NewUser<'_>) -> AppResult<User> {
    sqlx::query_as::<_, User>(
        r#"
        INSERT INTO users (name, email, password, contact_number, role, library_id)
        VALUES ($1, $2, $3, $4, $5, $6)
        RETURNING *
        "#,
    )
    .bind(user.name)
    .bind(user.email)
    .bind(user.password_hash)
    .bind(user.contact_number)
    .bind(user.role)
    .bind(user.library_id)
    .fetch_one(conn)
    .await
    .map_err(|e| AppError::from_unique_violation(e, "User already exists"))
}

/// Lock a reader row ahead of any inventory row.
///
/// `FOR NO KEY UPDATE` serializes concurrent raises by the same reader while
/// leaving the `KEY SHARE` locks taken by foreign-key checks unblocked.
pub(crate) async fn lock_reader(conn: &mut PgConnection, reader_id: i32, library_id: i32) -> AppResult<()> {
    let reader: Option<i32> = sqlx::query_scalar(
        "SELECT id FROM users WHERE id = $1 AND library_id = $2 FOR NO KEY UPDATE",
    )
    .bind(reader_id)
    .bind(library_id)
    .fetch_optional(conn)
    .await?;
    match reader {
        Some(_) => Ok(()),
        None => Err(AppError::NotFound(format!(
            "Reader {} not found in this library",
            reader_id
        ))),
    }
}

#[derive(Clone)]
pub struct UsersRepository {
    pool: Pool<Postgres>,
}

impl UsersRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// Get user by ID
    pub async fn get_by_id(&self, id: i32) -> AppResult<User> {
        sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("User with id {} not found", id)))
    }

    /// Get user by email (login identifier)
    pub async fn get_by_email(&self, email: &str) -> AppResult<Option<User>> {
        let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE LOWER(email) = LOWER($1)")
            .bind(email)
            .fetch_optional(&self.pool)
            .await?;
        Ok(user)
    }

    /// Check if email already exists
    pub async fn email_exists(&self, email: &str) -> AppResult<bool> {
        let exists: bool =
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM users WHERE LOWER(email) = LOWER($1))")
                .bind(email)
                .fetch_one(&self.pool)
                .await?;
        Ok(exists)
    }

    /// Users belonging to one library
    pub async fn list_by_library(&self, library_id: i32) -> AppResult<Vec<User>> {
        let users = sqlx::query_as::<_, User>(
            "SELECT * FROM users WHERE library_id = $1 ORDER BY name, id",
        )
        .bind(library_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(users)
    }

    pub async fn create(&self, user: &NewUser<'_>) -> AppResult<User> {
        let mut conn = self.pool.acquire().await?;
        insert_user(&mut conn, user).await
    }

    /// Change the role of a user found by email inside `library_id`
    pub async fn set_role_in_library(
        &self,
        email: &str,
        library_id: i32,
        role: Role,
    ) -> AppResult<User> {
        sqlx::query_as::<_, User>(
            r#"
            UPDATE users SET role = $3, updated_at = NOW()
            WHERE LOWER(email) = LOWER($1) AND library_id = $2
            RETURNING *
            "#,
        )
        .bind(email)
        .bind(library_id)
        .bind(role)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found in your library".to_string()))
    }

    /// Find a user by email inside `library_id`
    pub async fn get_in_library(&self, email: &str, library_id: i32) -> AppResult<User> {
        sqlx::query_as::<_, User>(
            "SELECT * FROM users WHERE LOWER(email) = LOWER($1) AND library_id = $2",
        )
        .bind(email)
        .bind(library_id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found in your library".to_string()))
    }
}
