use async_trait::async_trait;
use sqlx::PgPool;

use crate::{
    error::{RepoError, RepoResult},
    models::category::{Category, CategoryInput, CategoryView},
    repository::CategoryRepository,
};

pub struct PgCategoryRepository {
    pool: PgPool,
}

impl PgCategoryRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CategoryRepository for PgCategoryRepository {
    async fn find_by_id(&self, id: i64) -> RepoResult<Option<Category>> {
        let category = sqlx::query_as::<_, Category>(
            "SELECT id, name, description FROM categories WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(category)
    }

    async fn find_all(&self) -> RepoResult<Vec<CategoryView>> {
        let categories = sqlx::query_as::<_, CategoryView>(
            r#"SELECT c.id, c.name, c.description, COUNT(e.id) AS event_count
             FROM categories c
             LEFT JOIN events e ON e.category_id = c.id
             GROUP BY c.id
             ORDER BY c.name COLLATE "C", c.id"#,
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(categories)
    }

    async fn count(&self) -> RepoResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM categories")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    async fn create(&self, input: CategoryInput) -> RepoResult<Category> {
        let category = sqlx::query_as::<_, Category>(
            "INSERT INTO categories (name, description)
             VALUES ($1, $2)
             RETURNING id, name, description",
        )
        .bind(&input.name)
        .bind(&input.description)
        .fetch_one(&self.pool)
        .await?;
        Ok(category)
    }

    async fn update(&self, id: i64, input: CategoryInput) -> RepoResult<Category> {
        sqlx::query_as::<_, Category>(
            "UPDATE categories
             SET name = $1,
                 description = $2
             WHERE id = $3
             RETURNING id, name, description",
        )
        .bind(&input.name)
        .bind(&input.description)
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(RepoError::NotFound { entity: "Category", id })
    }

    async fn delete(&self, id: i64) -> RepoResult<bool> {
        // events.category_id is ON DELETE SET NULL
        let result = sqlx::query("DELETE FROM categories WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
