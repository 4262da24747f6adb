//! Hazard report handlers

use axum::{extract::{State, Path, Query}, http::StatusCode, Json};
use serde::Serialize;
use serde_json::json;
use uuid::Uuid;
use validator::Validate;

use crate::{AppState, AppResult, AppError};
use crate::models::{
    audit, Action, ActionView, Area, CreateReport, DateRange, Report, ReportFilter, ReportQuery,
    ReportSummary, RiskType, User,
};
use crate::middleware::auth::UserContext;

#[derive(Debug, Serialize)]
pub struct ReportDetail {
    #[serde(flatten)]
    pub report: Report,
    pub created_by_name: Option<String>,
    pub actions: Vec<ActionView>,
}

/// Create a report
pub async fn create(
    State(state): State<AppState>,
    user: UserContext,
    Json(req): Json<CreateReport>,
) -> AppResult<(StatusCode, Json<Report>)> {
    req.validate()?;

    if !Area::exists(&state.pool, req.area_id).await? {
        return Err(AppError::ValidationError("Unknown area".to_string()));
    }
    if !RiskType::exists(&state.pool, req.risk_type_id_final).await? {
        return Err(AppError::ValidationError("Unknown risk type".to_string()));
    }

    let report = Report::create(&state.pool, user.user_id, &req).await?;

    audit::record(
        &state.pool,
        "Report",
        &report.id.to_string(),
        "CREATED",
        Some(user.user_id),
        Some(json!({
            "severity": report.severity_final,
            "risk_type_id": report.risk_type_id_final,
            "ai_suggested_severity": report.ai_suggested_severity,
            "is_anonymous": report.is_anonymous,
        })),
    )
    .await?;

    tracing::info!("Report {} created in area {}", report.id, report.area_id);

    Ok((StatusCode::CREATED, Json(report)))
}

/// List reports, newest first
pub async fn list(
    State(state): State<AppState>,
    user: UserContext,
    Query(query): Query<ReportQuery>,
) -> AppResult<Json<Vec<ReportSummary>>> {
    let filter = ReportFilter {
        range: DateRange::parse(query.from.as_deref(), query.to.as_deref())?,
        area_id: query.area_id,
        risk_type_id: query.risk_type_id,
        severity: query.severity,
        created_by: (!user.sees_all_reports()).then_some(user.user_id),
    };

    let reports = Report::list(&state.pool, &filter).await?;
    Ok(Json(reports))
}

/// Get a report with its corrective actions
pub async fn get(
    State(state): State<AppState>,
    user: UserContext,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ReportDetail>> {
    let report = Report::find_by_id(&state.pool, id)
        .await?
        .ok_or_else(|| AppError::NotFound("Report not found".to_string()))?;

    if !user.sees_all_reports() && report.created_by != user.user_id {
        return Err(AppError::Forbidden);
    }

    let created_by_name = if report.is_anonymous {
        None
    } else {
        User::find_by_id(&state.pool, report.created_by).await?.map(|u| u.name)
    };

    let actions = Action::list_for_report(&state.pool, report.id).await?;

    Ok(Json(ReportDetail { report, created_by_name, actions }))
}
