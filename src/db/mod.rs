mod categories;
mod events;
mod participants;

use async_trait::async_trait;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;

use crate::error::{RepoError, RepoResult};
use crate::repository::StoreHealth;

pub use categories::PgCategoryRepository;
pub use events::PgEventRepository;
pub use participants::PgParticipantRepository;

pub async fn create_pool(database_url: &str, max_connections: u32) -> anyhow::Result<PgPool> {
    let pool = PgPoolOptions::new()
        .max_connections(max_connections)
        .connect(database_url)
        .await?;
    Ok(pool)
}

/// Run the migrations embedded from ./migrations/
pub async fn run_migrations(pool: &PgPool) -> anyhow::Result<()> {
    sqlx::migrate!("./migrations").run(pool).await?;
    Ok(())
}

/// Translates constraint violations on a write into the repository's
/// vocabulary. `field` names the form field the constraint guards.
fn constraint_error(err: sqlx::Error, field: &'static str) -> RepoError {
    if let sqlx::Error::Database(db_err) = &err {
        if db_err.is_foreign_key_violation() {
            return RepoError::InvalidReference { field };
        }
        if db_err.is_unique_violation() {
            return RepoError::Conflict {
                field,
                message: "Participant with this Email already exists.".to_string(),
            };
        }
    }
    RepoError::Database(err)
}

pub struct PgStoreHealth {
    pool: PgPool,
}

impl PgStoreHealth {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl StoreHealth for PgStoreHealth {
    async fn ping(&self) -> RepoResult<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}
