//! Risk type catalogue

use serde::Serialize;
use sqlx::{FromRow, PgPool};
use uuid::Uuid;
use chrono::{DateTime, Utc};

use crate::rules::RiskCode;

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct RiskType {
    pub id: Uuid,
    pub code: String,
    pub name: String,
    pub description: Option<String>,
    /// JSON array of recommendation strings
    pub recommendations: serde_json::Value,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

impl RiskType {
    pub async fn list_active(pool: &PgPool) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, RiskType>(
            "SELECT * FROM risk_types WHERE is_active = true ORDER BY name ASC"
        )
        .fetch_all(pool)
        .await
    }

    pub async fn find_by_code(pool: &PgPool, code: RiskCode) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, RiskType>("SELECT * FROM risk_types WHERE code = $1")
            .bind(code.as_str())
            .fetch_optional(pool)
            .await
    }

    pub async fn exists(pool: &PgPool, id: Uuid) -> Result<bool, sqlx::Error> {
        sqlx::query_scalar::<_, bool>("SELECT EXISTS(SELECT 1 FROM risk_types WHERE id = $1)")
            .bind(id)
            .fetch_one(pool)
            .await
    }
}
