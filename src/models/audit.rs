//! Audit log

use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool, Postgres, QueryBuilder};
use uuid::Uuid;
use chrono::{DateTime, Utc};

use super::DateRange;

pub const AUDIT_LIST_LIMIT: i64 = 200;

/// Audit entry joined with the actor's name and email
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct AuditEntry {
    pub id: i64,
    pub entity_type: String,
    pub entity_id: String,
    pub action: String,
    pub actor_id: Option<Uuid>,
    pub actor_name: Option<String>,
    pub actor_email: Option<String>,
    pub payload: Option<serde_json::Value>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize, Default)]
pub struct AuditQuery {
    pub entity_type: Option<String>,
    pub from: Option<String>,
    pub to: Option<String>,
}

/// Append one entry. Callers propagate failures.
pub async fn record(
    pool: &PgPool,
    entity_type: &str,
    entity_id: &str,
    action: &str,
    actor_id: Option<Uuid>,
    payload: Option<serde_json::Value>,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        INSERT INTO audit_log (entity_type, entity_id, action, actor_id, payload)
        VALUES ($1, $2, $3, $4, $5)
        "#
    )
    .bind(entity_type)
    .bind(entity_id)
    .bind(action)
    .bind(actor_id)
    .bind(payload)
    .execute(pool)
    .await?;

    tracing::debug!("Audit: {} {} {}", entity_type, entity_id, action);
    Ok(())
}

impl AuditEntry {
    pub async fn list(
        pool: &PgPool,
        entity_type: Option<&str>,
        range: &DateRange,
    ) -> Result<Vec<Self>, sqlx::Error> {
        let mut qb = QueryBuilder::<Postgres>::new(
            r#"
            SELECT l.id, l.entity_type, l.entity_id, l.action, l.actor_id,
                   u.name AS actor_name, u.email AS actor_email,
                   l.payload, l.created_at
            FROM audit_log l
            LEFT JOIN users u ON u.id = l.actor_id
            WHERE 1 = 1
            "#
        );

        if let Some(entity_type) = entity_type {
            qb.push(" AND l.entity_type = ").push_bind(entity_type.to_string());
        }
        if let Some(from) = range.from {
            qb.push(" AND l.created_at >= ").push_bind(from);
        }
        if let Some(to) = range.to {
            qb.push(" AND l.created_at <= ").push_bind(to);
        }

        qb.push(" ORDER BY l.created_at DESC LIMIT ").push_bind(AUDIT_LIST_LIMIT);

        qb.build_query_as::<AuditEntry>().fetch_all(pool).await
    }
}
