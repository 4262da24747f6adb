//! Detection analysis handler

use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::{AppState, AppResult};
use crate::models::{RiskType, RuleConfig};
use crate::middleware::auth::UserContext;
use crate::rules::{self, Detection, RuleResult};

#[derive(Debug, Deserialize, Validate)]
pub struct AnalyzeRequest {
    #[validate(nested)]
    pub detections: Vec<Detection>,
}

#[derive(Debug, Serialize)]
pub struct AnalyzeResponse {
    pub enabled: bool,
    pub suggestion: Option<RuleResult>,
    pub risk_type: Option<RiskType>,
}

/// Run the classification rules over client-side detections
pub async fn analyze(
    State(state): State<AppState>,
    user: UserContext,
    Json(req): Json<AnalyzeRequest>,
) -> AppResult<Json<AnalyzeResponse>> {
    req.validate()?;

    let config = RuleConfig::current(&state.pool).await?;

    let Some(suggestion) = suggest(config.as_ref(), &req.detections) else {
        return Ok(Json(AnalyzeResponse { enabled: false, suggestion: None, risk_type: None }));
    };

    let risk_type = match suggestion.risk_type_code {
        Some(code) => RiskType::find_by_code(&state.pool, code).await?,
        None => None,
    };

    tracing::info!(
        "Analysis for {}: {} detection(s) -> {:?} / {:?}",
        user.user_id,
        req.detections.len(),
        suggestion.rule,
        suggestion.suggested_severity
    );

    Ok(Json(AnalyzeResponse {
        enabled: true,
        suggestion: Some(suggestion),
        risk_type,
    }))
}

/// None when suggestions are switched off. A missing config row means the defaults.
fn suggest(config: Option<&RuleConfig>, detections: &[Detection]) -> Option<RuleResult> {
    match config {
        Some(cfg) if !cfg.is_enabled => None,
        Some(cfg) => Some(rules::classify_with_thresholds(
            detections,
            &cfg.thresholds(),
            cfg.min_confidence(),
        )),
        None => Some(rules::classify(detections)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use serde_json::json;
    use uuid::Uuid;
    use crate::rules::{RiskCode, Severity, SeverityThresholds};

    fn config(enabled: bool, thresholds: serde_json::Value) -> RuleConfig {
        RuleConfig {
            id: Uuid::new_v4(),
            is_enabled: enabled,
            min_confidence_for_auto_suggest: 0.5,
            severity_thresholds: thresholds,
            updated_by: None,
            updated_at: Utc::now(),
        }
    }

    fn obstruction() -> Vec<Detection> {
        vec![
            Detection::new("chair", 0.9),
            Detection::new("suitcase", 0.8),
            Detection::new("backpack", 0.85),
        ]
    }

    #[test]
    fn test_disabled_config_yields_no_suggestion() {
        let cfg = config(false, serde_json::to_value(SeverityThresholds::default()).unwrap());
        assert!(suggest(Some(&cfg), &obstruction()).is_none());
    }

    #[test]
    fn test_missing_config_uses_defaults() {
        let result = suggest(None, &obstruction()).unwrap();
        assert_eq!(result.risk_type_code, Some(RiskCode::Obstruction));
        assert_eq!(result.suggested_severity, Some(Severity::Medium));
    }

    #[test]
    fn test_stored_thresholds_are_applied() {
        let cfg = config(true, json!({
            "high": { "min_objects": 2, "min_avg_score": 0.8 },
            "medium": { "min_objects": 2, "min_avg_score": 0.5 },
            "low": { "min_objects": 1, "min_avg_score": 0.3 }
        }));
        let result = suggest(Some(&cfg), &obstruction()).unwrap();
        assert_eq!(result.suggested_severity, Some(Severity::High));
    }

    #[test]
    fn test_request_rejects_out_of_range_scores() {
        let req: AnalyzeRequest = serde_json::from_value(json!({
            "detections": [{ "class": "chair", "score": 2.0 }]
        }))
        .unwrap();
        assert!(req.validate().is_err());
    }
}
