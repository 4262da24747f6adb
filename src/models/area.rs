//! Area model

use serde::Serialize;
use sqlx::{FromRow, PgPool};
use uuid::Uuid;
use chrono::{DateTime, Utc};

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Area {
    pub id: Uuid,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

impl Area {
    pub async fn list(pool: &PgPool) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, Area>("SELECT * FROM areas ORDER BY name ASC")
            .fetch_all(pool)
            .await
    }

    pub async fn exists(pool: &PgPool, id: Uuid) -> Result<bool, sqlx::Error> {
        sqlx::query_scalar::<_, bool>("SELECT EXISTS(SELECT 1 FROM areas WHERE id = $1)")
            .bind(id)
            .fetch_one(pool)
            .await
    }
}
