//! Rule configuration handlers

use axum::{extract::State, Json};
use serde_json::json;
use validator::Validate;

use crate::{AppState, AppResult, AppError};
use crate::models::{audit, RuleConfig, RuleConfigResponse, UpdateRuleConfig};
use crate::middleware::auth::{require_admin, UserContext};

/// Current configuration
pub async fn get(
    State(state): State<AppState>,
    _user: UserContext,
) -> AppResult<Json<RuleConfigResponse>> {
    let config = RuleConfig::current(&state.pool)
        .await?
        .ok_or_else(|| AppError::NotFound("Rule configuration not found".to_string()))?;

    let warnings = config.thresholds().ordering_warnings();

    Ok(Json(RuleConfigResponse { config, warnings }))
}

/// Replace the configuration (admin only)
pub async fn update(
    State(state): State<AppState>,
    user: UserContext,
    Json(req): Json<UpdateRuleConfig>,
) -> AppResult<Json<RuleConfigResponse>> {
    require_admin(&user)?;
    req.validate()?;

    let thresholds = serde_json::to_value(req.severity_thresholds)
        .map_err(|e| AppError::InternalError(e.to_string()))?;

    let config = RuleConfig::upsert(
        &state.pool,
        req.is_enabled,
        req.min_confidence_for_auto_suggest,
        &thresholds,
        Some(user.user_id),
    )
    .await?;

    let warnings = req.severity_thresholds.ordering_warnings();
    for warning in &warnings {
        tracing::warn!("Rule config {}: {}", config.id, warning);
    }

    audit::record(
        &state.pool,
        "RuleConfig",
        &config.id.to_string(),
        "UPDATED",
        Some(user.user_id),
        Some(json!({
            "is_enabled": config.is_enabled,
            "min_confidence_for_auto_suggest": config.min_confidence_for_auto_suggest,
            "severity_thresholds": thresholds,
        })),
    )
    .await?;

    Ok(Json(RuleConfigResponse { config, warnings }))
}
