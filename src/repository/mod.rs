//! Repository layer for database operations

pub mod equipment;
pub mod history;
pub mod users;

use sqlx::SqlitePool;

/// Main repository struct holding the database connection pool
#[derive(Clone)]
pub struct Repository {
    pub pool: SqlitePool,
    pub equipment: equipment::EquipmentRepository,
    pub history: history::HistoryRepository,
    pub users: users::UsersRepository,
}

impl Repository {
    /// Create a new repository with the given database pool
    pub fn new(pool: SqlitePool) -> Self {
        Self {
            equipment: equipment::EquipmentRepository::new(pool.clone()),
            history: history::HistoryRepository::new(pool.clone()),
            users: users::UsersRepository::new(pool.clone()),
            pool,
        }
    }
}
