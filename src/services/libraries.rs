//! Library management service

use crate::{error::AppResult, models::library::Library, repository::Repository};

#[derive(Clone)]
pub struct LibrariesService {
    repository: Repository,
}

impl LibrariesService {
    pub fn new(repository: Repository) -> Self {
        Self { repository }
    }

    pub async fn list(&self) -> AppResult<Vec<Library>> {
        self.repository.libraries.list().await
    }

    pub async fn create(&self, name: &str, created_by: i32) -> AppResult<Library> {
        let library = self.repository.libraries.create(name).await?;
        tracing::info!(library_id = library.id, created_by, "Library created");
        Ok(library)
    }
}
