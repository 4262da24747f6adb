//! CSV export

use axum::{
    extract::{State, Query},
    http::header,
    response::{IntoResponse, Response},
};
use chrono::Utc;
use serde_json::json;

use crate::{AppState, AppResult, AppError};
use crate::models::{audit, DateRange, ExportRow, Report, ReportFilter, Role};
use crate::middleware::auth::{require_any_role, UserContext};
use super::metrics::MetricsQuery;

const HEADER: [&str; 12] = [
    "id",
    "created_at",
    "area",
    "risk_type",
    "severity",
    "description",
    "anonymous",
    "reported_by",
    "total_actions",
    "closed_actions",
    "ai_explanation",
    "ai_confidence",
];

/// Download reports as CSV (admin, CSST)
pub async fn reports_csv(
    State(state): State<AppState>,
    user: UserContext,
    Query(query): Query<MetricsQuery>,
) -> AppResult<Response> {
    require_any_role(&user, &[Role::Admin, Role::Csst])?;

    let filter = ReportFilter {
        range: DateRange::parse(query.from.as_deref(), query.to.as_deref())?,
        area_id: query.area_id,
        ..Default::default()
    };

    let rows = Report::export_rows(&state.pool, &filter).await?;
    let body = reports_to_csv(&rows)?;

    audit::record(
        &state.pool,
        "Export",
        "csv-export",
        "CSV_EXPORTED",
        Some(user.user_id),
        Some(json!({
            "report_count": rows.len(),
            "filters": { "from": query.from, "to": query.to, "area_id": query.area_id },
        })),
    )
    .await?;

    tracing::info!("User {} exported {} report(s)", user.user_id, rows.len());

    let disposition = format!(
        "attachment; filename=\"reports-{}.csv\"",
        Utc::now().format("%Y-%m-%d")
    );

    Ok((
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        body,
    )
        .into_response())
}

/// Render export rows; the reporter is masked on anonymous reports
pub fn reports_to_csv(rows: &[ExportRow]) -> AppResult<Vec<u8>> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(HEADER)?;

    for row in rows {
        let reported_by = if row.is_anonymous { "Anonymous" } else { row.reporter_name.as_str() };
        let confidence = row
            .ai_confidence_score
            .map(|c| format!("{:.2}", c))
            .unwrap_or_else(|| "N/A".to_string());

        writer.write_record([
            row.id.to_string(),
            row.created_at.to_rfc3339(),
            row.area_name.clone(),
            row.risk_type_name.clone().unwrap_or_else(|| "N/A".to_string()),
            row.severity_final.clone(),
            row.description.clone(),
            if row.is_anonymous { "yes" } else { "no" }.to_string(),
            reported_by.to_string(),
            row.total_actions.to_string(),
            row.closed_actions.to_string(),
            row.ai_explanation.clone().unwrap_or_default(),
            confidence,
        ])?;
    }

    writer
        .into_inner()
        .map_err(|e| AppError::InternalError(format!("CSV export failed: {}", e)))
}
