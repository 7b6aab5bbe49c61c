pub mod migrations;
pub mod pool;
pub mod repositories;

pub use pool::{create_pool, DbPool};
pub use repositories::{PostgresMessageLedger, PostgresUserPlanRepository};

use anyhow::Result;
use std::sync::Arc;

/// Database service combining all repositories
pub struct Database {
    pool: DbPool,
    user_plan_repository: Arc<PostgresUserPlanRepository>,
    message_ledger: Arc<PostgresMessageLedger>,
}

impl Database {
    /// Create a new database service from a connection pool
    pub fn new(pool: DbPool) -> Self {
        Self {
            user_plan_repository: Arc::new(PostgresUserPlanRepository::new(pool.clone())),
            message_ledger: Arc::new(PostgresMessageLedger::new(pool.clone())),
            pool,
        }
    }

    /// Create a new database service from configuration
    pub async fn from_config(config: &config::DatabaseConfig) -> Result<Self> {
        let pool = create_pool(config).await?;
        Ok(Self::new(pool))
    }

    /// Run database migrations
    pub async fn run_migrations(&self) -> Result<()> {
        migrations::run(&self.pool).await
    }

    /// Get a reference to the connection pool
    pub fn pool(&self) -> &DbPool {
        &self.pool
    }

    pub fn user_plan_repository(&self) -> Arc<PostgresUserPlanRepository> {
        self.user_plan_repository.clone()
    }

    pub fn message_ledger(&self) -> Arc<PostgresMessageLedger> {
        self.message_ledger.clone()
    }
}
