//! User management service

use sha2::{Digest, Sha256};

use crate::{
    error::{AppError, AppResult},
    models::user::{CreateUser, User, UserProfile},
    repository::Repository,
};

/// SHA-256 hex digest of the password
pub fn hash_password(password: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(password.as_bytes());
    hex::encode(hasher.finalize())
}

#[derive(Clone)]
pub struct UsersService {
    repository: Repository,
}

impl UsersService {
    pub fn new(repository: Repository) -> Self {
        Self { repository }
    }

    /// Get a user by username
    pub async fn get(&self, username: &str) -> AppResult<User> {
        self.repository.users.get(username).await
    }

    /// List all users
    pub async fn list(&self) -> AppResult<Vec<User>> {
        self.repository.users.list().await
    }

    /// Create a new user
    pub async fn create(&self, data: &CreateUser) -> AppResult<User> {
        if self.repository.users.exists(&data.username).await? {
            return Err(AppError::Conflict(format!(
                "Username {} already exists",
                data.username
            )));
        }

        let user = self
            .repository
            .users
            .create(data, &hash_password(&data.password))
            .await?;

        tracing::info!(username = %user.username, role = %user.role.as_str(), "user created");

        Ok(user)
    }

    /// User profile: the account plus its current holdings and how many of
    /// them are overdue as of the given day
    pub async fn profile(
        &self,
        username: &str,
        today: chrono::NaiveDate,
    ) -> AppResult<UserProfile> {
        let user = self.repository.users.get(username).await?;
        let holdings = self.repository.equipment.held_by(username).await?;
        let overdue_count = holdings
            .iter()
            .filter(|e| e.due_date.map(|d| d < today).unwrap_or(false))
            .count() as i64;

        Ok(UserProfile {
            user,
            holdings,
            overdue_count,
        })
    }
}
