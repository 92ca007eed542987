//! Business logic services

pub mod lifecycle;
pub mod reports;
pub mod users;

use crate::{config::CheckoutConfig, repository::Repository};

/// Container for all services
#[derive(Clone)]
pub struct Services {
    pub lifecycle: lifecycle::LifecycleService,
    pub reports: reports::ReportsService,
    pub users: users::UsersService,
}

impl Services {
    /// Create all services with the given repository
    pub fn new(repository: Repository, checkout_config: CheckoutConfig) -> Self {
        Self {
            lifecycle: lifecycle::LifecycleService::new(repository.clone(), checkout_config),
            reports: reports::ReportsService::new(repository.clone()),
            users: users::UsersService::new(repository),
        }
    }
}
