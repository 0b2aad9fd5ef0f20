//! Libraries repository

use sqlx::{Pool, Postgres};

use crate::{
    error::{AppError, AppResult},
    models::{
        library::Library,
        user::{NewUser, User},
    },
};

use super::users::insert_user;

#[derive(Clone)]
pub struct LibrariesRepository {
    pool: Pool<Postgres>,
}

impl LibrariesRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    pub async fn list(&self) -> AppResult<Vec<Library>> {
        let libraries = sqlx::query_as::<_, Library>("SELECT * FROM libraries ORDER BY name")
            .fetch_all(&self.pool)
            .await?;
        Ok(libraries)
    }

    pub async fn get_by_id(&self, id: i32) -> AppResult<Library> {
        sqlx::query_as::<_, Library>("SELECT * FROM libraries WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Library with id {} not found", id)))
    }

    pub async fn create(&self, name: &str) -> AppResult<Library> {
        sqlx::query_as::<_, Library>("INSERT INTO libraries (name) VALUES ($1) RETURNING *")
            .bind(name)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| AppError::from_unique_violation(e, "Library already exists"))
    }

    /// Create a library and its owner atomically; `owner.library_id` is replaced
    pub async fn create_with_owner(
        &self,
        name: &str,
        owner: NewUser<'_>,
    ) -> AppResult<(Library, User)> {
        let mut tx = self.pool.begin().await?;

        let library = sqlx::query_as::<_, Library>(
            "INSERT INTO libraries (name) VALUES ($1) RETURNING *",
        )
        .bind(name)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| AppError::from_unique_violation(e, "Library already exists with this name"))?;

        let owner = NewUser {
            library_id: library.id,
            ..owner
        };
        let user = insert_user(&mut tx, &owner).await?;

        tx.commit().await?;
        Ok((library, user))
    }
}
