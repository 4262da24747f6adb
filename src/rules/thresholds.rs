//! Severity Thresholds
//!
//! Tunable tiers owned by the rule configuration store. The engine only reads
//! them; `validate` is for the admin update path.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Detections below this score are ignored entirely
pub const MIN_USABLE_SCORE: f64 = 0.30;

/// One severity tier: both conditions must hold
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TierThreshold {
    #[serde(alias = "minObjects")]
    pub min_objects: u32,
    #[serde(alias = "minAvgScore")]
    pub min_avg_score: f64,
}

impl TierThreshold {
    pub const fn new(min_objects: u32, min_avg_score: f64) -> Self {
        Self { min_objects, min_avg_score }
    }

    pub fn is_met(&self, object_count: usize, avg_score: f64) -> bool {
        object_count >= self.min_objects as usize && avg_score >= self.min_avg_score
    }
}

/// Tiers are evaluated high -> medium -> low, first match wins
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SeverityThresholds {
    pub high: TierThreshold,
    pub medium: TierThreshold,
    pub low: TierThreshold,
}

impl Default for SeverityThresholds {
    fn default() -> Self {
        Self {
            high: TierThreshold::new(5, 0.70),
            medium: TierThreshold::new(3, 0.50),
            low: TierThreshold::new(1, 0.30),
        }
    }
}

#[derive(Debug, Error, PartialEq)]
pub enum ThresholdError {
    #[error("{tier}.min_objects must be at least 1")]
    ZeroObjects { tier: &'static str },

    #[error("{tier}.min_avg_score must be between 0 and 1, got {value}")]
    ScoreOutOfRange { tier: &'static str, value: f64 },

    #[error("invalid thresholds document: {0}")]
    Malformed(String),
}

impl SeverityThresholds {
    pub fn from_json(value: &serde_json::Value) -> Result<Self, ThresholdError> {
        serde_json::from_value(value.clone()).map_err(|e| ThresholdError::Malformed(e.to_string()))
    }

    fn tiers(&self) -> [(&'static str, &TierThreshold); 3] {
        [("high", &self.high), ("medium", &self.medium), ("low", &self.low)]
    }

    /// Reject values the engine cannot work with. Tier ordering is NOT
    /// checked here, see `ordering_warnings`.
    pub fn validate(&self) -> Result<(), ThresholdError> {
        for (tier, t) in self.tiers() {
            if t.min_objects == 0 {
                return Err(ThresholdError::ZeroObjects { tier });
            }
            if !(0.0..=1.0).contains(&t.min_avg_score) {
                return Err(ThresholdError::ScoreOutOfRange { tier, value: t.min_avg_score });
            }
        }
        Ok(())
    }

    /// Out-of-order tiers. Such a configuration is still accepted as given,
    /// the caller decides whether to surface the warnings.
    pub fn ordering_warnings(&self) -> Vec<String> {
        let mut warnings = Vec::new();

        if self.medium.min_objects >= self.high.min_objects
            && self.medium.min_avg_score >= self.high.min_avg_score
        {
            warnings.push(format!(
                "medium tier ({} objects, {:.2}) is not below high tier ({} objects, {:.2}); \
                 the tiers overlap and MEDIUM can never be selected",
                self.medium.min_objects, self.medium.min_avg_score,
                self.high.min_objects, self.high.min_avg_score
            ));
        }
        if self.medium.min_objects < self.low.min_objects
            || self.medium.min_avg_score < self.low.min_avg_score
        {
            warnings.push("medium tier is looser than low tier on at least one axis".to_string());
        }

        warnings
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_defaults() {
        let t = SeverityThresholds::default();
        assert_eq!(t.high, TierThreshold::new(5, 0.7));
        assert_eq!(t.medium, TierThreshold::new(3, 0.5));
        assert_eq!(t.low, TierThreshold::new(1, 0.3));
        assert!(t.validate().is_ok());
        assert!(t.ordering_warnings().is_empty());
    }

    #[test]
    fn test_parse_camel_case_document() {
        let doc = json!({
            "high": { "minObjects": 4, "minAvgScore": 0.8 },
            "medium": { "minObjects": 2, "minAvgScore": 0.6 },
            "low": { "minObjects": 1, "minAvgScore": 0.3 }
        });
        let t = SeverityThresholds::from_json(&doc).unwrap();
        assert_eq!(t.high.min_objects, 4);
        assert_eq!(t.medium.min_avg_score, 0.6);
    }

    #[test]
    fn test_missing_tier_is_malformed() {
        let doc = json!({ "high": { "min_objects": 4, "min_avg_score": 0.8 } });
        assert!(matches!(SeverityThresholds::from_json(&doc), Err(ThresholdError::Malformed(_))));
    }

    #[test]
    fn test_validate_rejects_zero_and_out_of_range() {
        let mut t = SeverityThresholds::default();
        t.medium.min_objects = 0;
        assert_eq!(t.validate(), Err(ThresholdError::ZeroObjects { tier: "medium" }));

        let mut t = SeverityThresholds::default();
        t.high.min_avg_score = 1.5;
        assert!(matches!(t.validate(), Err(ThresholdError::ScoreOutOfRange { tier: "high", .. })));
    }

    #[test]
    fn test_inverted_tiers_accepted_with_warning() {
        let t = SeverityThresholds {
            high: TierThreshold::new(3, 0.5),
            medium: TierThreshold::new(5, 0.7),
            low: TierThreshold::new(1, 0.3),
        };
        assert!(t.validate().is_ok());
        assert_eq!(t.ordering_warnings().len(), 1);
    }

    #[test]
    fn test_tier_is_conjunction() {
        let tier = TierThreshold::new(5, 0.7);
        assert!(tier.is_met(5, 0.7));
        assert!(!tier.is_met(5, 0.69));
        assert!(!tier.is_met(4, 0.99));
    }
}
