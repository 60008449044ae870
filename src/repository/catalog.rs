//! Service catalog repository

use sqlx::{Pool, Postgres};

use crate::{error::AppResult, models::Service};

#[derive(Clone)]
pub struct CatalogRepository {
    pool: Pool<Postgres>,
}

impl CatalogRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// Get service by ID
    pub async fn get_by_id(&self, id: i32) -> AppResult<Option<Service>> {
        let service = sqlx::query_as::<_, Service>(
            r#"
            SELECT id, name, description, category, price, duration, is_active, is_popular
            FROM services
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(service)
    }

    /// Active services, popular first then by name
    pub async fn list_active(&self) -> AppResult<Vec<Service>> {
        let services = sqlx::query_as::<_, Service>(
            r#"
            SELECT id, name, description, category, price, duration, is_active, is_popular
            FROM services
            WHERE is_active = TRUE
            ORDER BY is_popular DESC, name ASC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(services)
    }
}
