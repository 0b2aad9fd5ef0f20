//! Business logic services

pub mod auth;
pub mod inventory;
pub mod issues;
pub mod libraries;
pub mod requests;

use crate::{config::AppConfig, repository::Repository};

/// Container for all services
#[derive(Clone)]
pub struct Services {
    pub auth: auth::AuthService,
    pub libraries: libraries::LibrariesService,
    pub inventory: inventory::InventoryService,
    pub requests: requests::RequestsService,
    pub issues: issues::IssuesService,
    repository: Repository,
}

impl Services {
    /// Create all services with the given repository
    pub fn new(repository: Repository, config: &AppConfig) -> Self {
        Self {
            auth: auth::AuthService::new(repository.clone(), config.auth.clone()),
            libraries: libraries::LibrariesService::new(repository.clone()),
            inventory: inventory::InventoryService::new(repository.clone()),
            requests: requests::RequestsService::new(repository.clone(), config.circulation.clone()),
            issues: issues::IssuesService::new(repository.clone()),
            repository,
        }
    }

    /// Database reachability for the readiness check
    pub async fn ping(&self) -> crate::error::AppResult<()> {
        self.repository.ping().await
    }
}
