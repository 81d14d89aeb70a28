//! Business logic services

pub mod borrows;
pub mod catalog;
pub mod clock;
pub mod users;

use std::sync::Arc;

use crate::{
    config::{AuthConfig, BorrowingConfig},
    repository::{transaction::PgUnitOfWork, Repository},
};

/// Container for all services
#[derive(Clone)]
pub struct Services {
    pub catalog: catalog::CatalogService,
    pub users: users::UsersService,
    pub borrows: borrows::BorrowService<PgUnitOfWork>,
    pub repository: Repository,
}

impl Services {
    /// Create all services with the given repository
    pub fn new(repository: Repository, auth_config: AuthConfig, borrowing_config: BorrowingConfig) -> Self {
        Self {
            catalog: catalog::CatalogService::new(repository.clone()),
            users: users::UsersService::new(repository.clone(), auth_config),
            borrows: borrows::BorrowService::new(
                repository.unit_of_work(),
                Arc::new(clock::SystemClock),
                borrowing_config,
            ),
            repository,
        }
    }
}
