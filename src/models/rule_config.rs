//! Classification rule configuration

use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;
use chrono::{DateTime, Utc};
use validator::{Validate, ValidationError};

use crate::rules::{SeverityThresholds, DEFAULT_MIN_CONFIDENCE};

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct RuleConfig {
    pub id: Uuid,
    pub is_enabled: bool,
    pub min_confidence_for_auto_suggest: f64,
    pub severity_thresholds: serde_json::Value,
    pub updated_by: Option<Uuid>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateRuleConfig {
    pub is_enabled: bool,
    #[validate(range(min = 0.0, max = 1.0))]
    pub min_confidence_for_auto_suggest: f64,
    #[validate(custom(function = "validate_thresholds"))]
    pub severity_thresholds: SeverityThresholds,
}

#[derive(Debug, Serialize)]
pub struct RuleConfigResponse {
    #[serde(flatten)]
    pub config: RuleConfig,
    /// Tier settings that are accepted but probably unintended
    pub warnings: Vec<String>,
}

fn validate_thresholds(thresholds: &SeverityThresholds) -> Result<(), ValidationError> {
    thresholds.validate().map_err(|e| {
        let mut err = ValidationError::new("severity_thresholds");
        err.message = Some(e.to_string().into());
        err
    })
}

impl RuleConfig {
    /// The active row, if one was ever written
    pub async fn current(pool: &PgPool) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, RuleConfig>(
            "SELECT * FROM rule_config ORDER BY updated_at DESC LIMIT 1"
        )
        .fetch_optional(pool)
        .await
    }

    /// Update the active row, or create it when the table is empty
    pub async fn upsert(
        pool: &PgPool,
        is_enabled: bool,
        min_confidence: f64,
        thresholds: &serde_json::Value,
        updated_by: Option<Uuid>,
    ) -> Result<Self, sqlx::Error> {
        if let Some(existing) = Self::current(pool).await? {
            return sqlx::query_as::<_, RuleConfig>(
                r#"
                UPDATE rule_config
                SET is_enabled = $2,
                    min_confidence_for_auto_suggest = $3,
                    severity_thresholds = $4,
                    updated_by = $5,
                    updated_at = NOW()
                WHERE id = $1
                RETURNING *
                "#
            )
            .bind(existing.id)
            .bind(is_enabled)
            .bind(min_confidence)
            .bind(thresholds)
            .bind(updated_by)
            .fetch_one(pool)
            .await;
        }

        sqlx::query_as::<_, RuleConfig>(
            r#"
            INSERT INTO rule_config (is_enabled, min_confidence_for_auto_suggest, severity_thresholds, updated_by)
            VALUES ($1, $2, $3, $4)
            RETURNING *
            "#
        )
        .bind(is_enabled)
        .bind(min_confidence)
        .bind(thresholds)
        .bind(updated_by)
        .fetch_one(pool)
        .await
    }

    /// Stored tiers; an unreadable document falls back to the defaults
    pub fn thresholds(&self) -> SeverityThresholds {
        match SeverityThresholds::from_json(&self.severity_thresholds) {
            Ok(thresholds) => thresholds,
            Err(e) => {
                tracing::warn!("Rule config {} has unusable thresholds ({}), using defaults", self.id, e);
                SeverityThresholds::default()
            }
        }
    }

    /// Confirmation floor, clamped to [0, 1]
    pub fn min_confidence(&self) -> f64 {
        let value = self.min_confidence_for_auto_suggest;
        if value.is_finite() {
            value.clamp(0.0, 1.0)
        } else {
            DEFAULT_MIN_CONFIDENCE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn config(thresholds: serde_json::Value) -> RuleConfig {
        RuleConfig {
            id: Uuid::new_v4(),
            is_enabled: true,
            min_confidence_for_auto_suggest: 0.5,
            severity_thresholds: thresholds,
            updated_by: None,
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_thresholds_from_stored_document() {
        let cfg = config(json!({
            "high": { "minObjects": 6, "minAvgScore": 0.8 },
            "medium": { "min_objects": 3, "min_avg_score": 0.5 },
            "low": { "min_objects": 1, "min_avg_score": 0.3 }
        }));
        let t = cfg.thresholds();
        assert_eq!(t.high.min_objects, 6);
        assert_eq!(t.high.min_avg_score, 0.8);
    }

    #[test]
    fn test_malformed_thresholds_fall_back() {
        let cfg = config(json!({ "high": "lots" }));
        assert_eq!(cfg.thresholds(), SeverityThresholds::default());
    }

    #[test]
    fn test_min_confidence_is_clamped() {
        let mut cfg = config(json!({}));
        cfg.min_confidence_for_auto_suggest = 1.4;
        assert_eq!(cfg.min_confidence(), 1.0);
        cfg.min_confidence_for_auto_suggest = f64::NAN;
        assert_eq!(cfg.min_confidence(), DEFAULT_MIN_CONFIDENCE);
    }

    #[test]
    fn test_update_validation() {
        let ok: UpdateRuleConfig = serde_json::from_value(json!({
            "is_enabled": true,
            "min_confidence_for_auto_suggest": 0.6,
            "severity_thresholds": SeverityThresholds::default()
        }))
        .unwrap();
        assert!(ok.validate().is_ok());

        let mut bad_thresholds = SeverityThresholds::default();
        bad_thresholds.medium.min_objects = 0;
        let bad: UpdateRuleConfig = serde_json::from_value(json!({
            "is_enabled": true,
            "min_confidence_for_auto_suggest": 1.5,
            "severity_thresholds": bad_thresholds
        }))
        .unwrap();
        let errors = bad.validate().unwrap_err();
        assert!(errors.field_errors().contains_key("min_confidence_for_auto_suggest"));
        assert!(errors.field_errors().contains_key("severity_thresholds"));
    }
}
