//! Hazard report model

use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool, Postgres, QueryBuilder};
use sqlx::types::Json;
use uuid::Uuid;
use chrono::{DateTime, Utc};
use validator::Validate;

use super::DateRange;
use crate::rules::{Detection, Severity};

/// Newest reports returned by the list endpoint
pub const REPORT_LIST_LIMIT: i64 = 100;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Report {
    pub id: Uuid,
    #[serde(skip_serializing)]
    pub created_by: Uuid,
    pub area_id: Uuid,
    pub description: String,
    pub photo_url: String,
    pub is_anonymous: bool,
    pub risk_type_id_final: Option<Uuid>,
    pub severity_final: String,
    // Engine suggestion, kept next to the human decision for provenance
    pub ai_suggested_risk_type_id: Option<Uuid>,
    pub ai_suggested_severity: Option<String>,
    pub ai_detections: Option<serde_json::Value>,
    pub ai_explanation: Option<String>,
    pub ai_confidence_score: Option<f64>,
    pub first_touched_at: Option<DateTime<Utc>>,
    pub first_touched_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateReport {
    pub area_id: Uuid,
    #[validate(length(min = 1, max = 500, message = "Description must be 1-500 characters"))]
    pub description: String,
    #[validate(length(min = 1, message = "A photo is required"))]
    pub photo_url: String,
    #[serde(default)]
    pub is_anonymous: bool,
    pub risk_type_id_final: Uuid,
    pub severity_final: Severity,
    pub ai_suggested_risk_type_id: Option<Uuid>,
    pub ai_suggested_severity: Option<Severity>,
    #[validate(nested)]
    pub ai_detections: Option<Vec<Detection>>,
    #[validate(length(max = 2000))]
    pub ai_explanation: Option<String>,
    #[validate(range(min = 0.0, max = 1.0))]
    pub ai_confidence_score: Option<f64>,
}

#[derive(Debug, Deserialize, Default)]
pub struct ReportQuery {
    pub from: Option<String>,
    pub to: Option<String>,
    pub area_id: Option<Uuid>,
    pub risk_type_id: Option<Uuid>,
    pub severity: Option<Severity>,
}

#[derive(Debug, Clone, Default)]
pub struct ReportFilter {
    pub range: DateRange,
    pub area_id: Option<Uuid>,
    pub risk_type_id: Option<Uuid>,
    pub severity: Option<Severity>,
    /// Restrict to one reporter (workers only see their own)
    pub created_by: Option<Uuid>,
}

/// List row with display names; the reporter is hidden on anonymous reports
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct ReportSummary {
    pub id: Uuid,
    pub area_id: Uuid,
    pub area_name: String,
    pub description: String,
    pub photo_url: String,
    pub is_anonymous: bool,
    pub risk_type_id_final: Option<Uuid>,
    pub risk_type_name: Option<String>,
    pub severity_final: String,
    pub created_by_name: Option<String>,
    pub action_count: i64,
    pub created_at: DateTime<Utc>,
}

/// One CSV export line
#[derive(Debug, Clone, FromRow)]
pub struct ExportRow {
    pub id: Uuid,
    pub created_at: DateTime<Utc>,
    pub area_name: String,
    pub risk_type_name: Option<String>,
    pub severity_final: String,
    pub description: String,
    pub is_anonymous: bool,
    pub reporter_name: String,
    pub total_actions: i64,
    pub closed_actions: i64,
    pub ai_explanation: Option<String>,
    pub ai_confidence_score: Option<f64>,
}

impl Report {
    pub async fn create(
        pool: &PgPool,
        created_by: Uuid,
        data: &CreateReport,
    ) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, Report>(
            r#"
            INSERT INTO reports (
                created_by, area_id, description, photo_url, is_anonymous,
                risk_type_id_final, severity_final,
                ai_suggested_risk_type_id, ai_suggested_severity, ai_detections,
                ai_explanation, ai_confidence_score
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            RETURNING *
            "#
        )
        .bind(created_by)
        .bind(data.area_id)
        .bind(&data.description)
        .bind(&data.photo_url)
        .bind(data.is_anonymous)
        .bind(data.risk_type_id_final)
        .bind(data.severity_final.as_str())
        .bind(data.ai_suggested_risk_type_id)
        .bind(data.ai_suggested_severity.map(|s| s.as_str()))
        .bind(data.ai_detections.as_ref().map(Json))
        .bind(&data.ai_explanation)
        .bind(data.ai_confidence_score)
        .fetch_one(pool)
        .await
    }

    pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Report>("SELECT * FROM reports WHERE id = $1")
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    pub async fn list(pool: &PgPool, filter: &ReportFilter) -> Result<Vec<ReportSummary>, sqlx::Error> {
        let mut qb = QueryBuilder::<Postgres>::new(
            r#"
            SELECT r.id, r.area_id, a.name AS area_name, r.description, r.photo_url,
                   r.is_anonymous, r.risk_type_id_final, rt.name AS risk_type_name,
                   r.severity_final,
                   CASE WHEN r.is_anonymous THEN NULL ELSE u.name END AS created_by_name,
                   (SELECT COUNT(*) FROM actions ac WHERE ac.report_id = r.id) AS action_count,
                   r.created_at
            FROM reports r
            JOIN areas a ON a.id = r.area_id
            JOIN users u ON u.id = r.created_by
            LEFT JOIN risk_types rt ON rt.id = r.risk_type_id_final
            WHERE 1 = 1
            "#
        );

        push_report_filters(&mut qb, filter);
        qb.push(" ORDER BY r.created_at DESC LIMIT ").push_bind(REPORT_LIST_LIMIT);

        qb.build_query_as::<ReportSummary>().fetch_all(pool).await
    }

    /// Rows for the CSV export, unbounded
    pub async fn export_rows(pool: &PgPool, filter: &ReportFilter) -> Result<Vec<ExportRow>, sqlx::Error> {
        let mut qb = QueryBuilder::<Postgres>::new(
            r#"
            SELECT r.id, r.created_at, a.name AS area_name, rt.name AS risk_type_name,
                   r.severity_final, r.description, r.is_anonymous, u.name AS reporter_name,
                   (SELECT COUNT(*) FROM actions ac WHERE ac.report_id = r.id) AS total_actions,
                   (SELECT COUNT(*) FROM actions ac
                     WHERE ac.report_id = r.id AND ac.status = 'DONE') AS closed_actions,
                   r.ai_explanation, r.ai_confidence_score
            FROM reports r
            JOIN areas a ON a.id = r.area_id
            JOIN users u ON u.id = r.created_by
            LEFT JOIN risk_types rt ON rt.id = r.risk_type_id_final
            WHERE 1 = 1
            "#
        );

        push_report_filters(&mut qb, filter);
        qb.push(" ORDER BY r.created_at DESC");

        qb.build_query_as::<ExportRow>().fetch_all(pool).await
    }

    /// Record the first supervisor response. Later calls are no-ops.
    pub async fn mark_first_touch(pool: &PgPool, id: Uuid, user_id: Uuid) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            r#"
            UPDATE reports
            SET first_touched_at = NOW(), first_touched_by = $2, updated_at = NOW()
            WHERE id = $1 AND first_touched_at IS NULL
            "#
        )
        .bind(id)
        .bind(user_id)
        .execute(pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }
}

/// Appends `AND ...` clauses against a `reports r` alias
pub fn push_report_filters(qb: &mut QueryBuilder<'_, Postgres>, filter: &ReportFilter) {
    if let Some(from) = filter.range.from {
        qb.push(" AND r.created_at >= ").push_bind(from);
    }
    if let Some(to) = filter.range.to {
        qb.push(" AND r.created_at <= ").push_bind(to);
    }
    if let Some(area_id) = filter.area_id {
        qb.push(" AND r.area_id = ").push_bind(area_id);
    }
    if let Some(risk_type_id) = filter.risk_type_id {
        qb.push(" AND r.risk_type_id_final = ").push_bind(risk_type_id);
    }
    if let Some(severity) = filter.severity {
        qb.push(" AND r.severity_final = ").push_bind(severity.as_str());
    }
    if let Some(created_by) = filter.created_by {
        qb.push(" AND r.created_by = ").push_bind(created_by);
    }
}
