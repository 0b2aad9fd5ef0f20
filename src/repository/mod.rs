//! Repository layer for database operations

pub mod books;
pub mod issues;
pub mod libraries;
pub mod requests;
pub mod users;

use sqlx::{Pool, Postgres};

/// Main repository struct holding database connection pool
#[derive(Clone)]
pub struct Repository {
    pub pool: Pool<Postgres>,
    pub libraries: libraries::LibrariesRepository,
    pub users: users::UsersRepository,
    pub books: books::BooksRepository,
    pub requests: requests::RequestsRepository,
    pub issues: issues::IssuesRepository,
}

impl Repository {
    /// Create a new repository with the given database pool
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self {
            libraries: libraries::LibrariesRepository::new(pool.clone()),
            users: users::UsersRepository::new(pool.clone()),
            books: books::BooksRepository::new(pool.clone()),
            requests: requests::RequestsRepository::new(pool.clone()),
            issues: issues::IssuesRepository::new(pool.clone()),
            pool,
        }
    }

    /// Round-trip to the database, used by the readiness check
    pub async fn ping(&self) -> crate::error::AppResult<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}
