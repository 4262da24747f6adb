//! Rules Engine Types
//!
//! Data structures only - classification logic lives in `classifier`.

use serde::{Deserialize, Serialize};
use validator::Validate;

// ============================================================================
// DETECTION (from the in-browser detector)
// ============================================================================

/// One object instance found in a photo
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct Detection {
    /// Detector label, e.g. "chair"
    #[serde(rename = "class")]
    #[validate(length(min = 1, max = 100))]
    pub label: String,
    /// Detector confidence (0.0 - 1.0)
    #[validate(range(min = 0.0, max = 1.0))]
    pub score: f64,
    /// x, y, width, height in pixels. Carried through, never classified on.
    #[serde(default, alias = "boundingBox")]
    pub bbox: [f64; 4],
}

impl Detection {
    pub fn new(label: impl Into<String>, score: f64) -> Self {
        Self {
            label: label.into(),
            score,
            bbox: [0.0; 4],
        }
    }
}

// ============================================================================
// SEVERITY
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Severity {
    High,
    Medium,
    Low,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::High => "HIGH",
            Severity::Medium => "MEDIUM",
            Severity::Low => "LOW",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "HIGH" => Some(Severity::High),
            "MEDIUM" => Some(Severity::Medium),
            "LOW" => Some(Severity::Low),
            _ => None,
        }
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ============================================================================
// RISK CATEGORY
// ============================================================================

/// Risk type codes. These match the `code` column of the risk type catalogue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RiskCode {
    #[serde(rename = "RISK_OBSTRUCTION")]
    Obstruction,
    #[serde(rename = "RISK_HOUSEKEEPING")]
    Housekeeping,
}

impl RiskCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            RiskCode::Obstruction => "RISK_OBSTRUCTION",
            RiskCode::Housekeeping => "RISK_HOUSEKEEPING",
        }
    }
}

impl std::fmt::Display for RiskCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Which branch of the engine produced the suggestion
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MatchedRule {
    /// Two or more obstacle-class objects
    Obstruction,
    /// Many objects, or many distinct kinds of objects
    Housekeeping,
    /// One or two objects, nothing else matched
    SparseDetection,
}

impl MatchedRule {
    /// Rule name as shown in the explanation
    pub fn title(&self) -> &'static str {
        match self {
            MatchedRule::Obstruction => "Obstruction/Trip hazard",
            MatchedRule::Housekeeping => "Poor housekeeping",
            MatchedRule::SparseDetection => "Sparse detection",
        }
    }
}

// ============================================================================
// RULE RESULT
// ============================================================================

/// Output of one classification call. Advisory only: a human reviews and
/// may override every field before the report is stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleResult {
    pub risk_type_code: Option<RiskCode>,
    pub suggested_severity: Option<Severity>,
    pub explanation: String,
    /// Engine self-assessed confidence, rounded to 2 decimals
    pub confidence_score: f64,
    /// Detections that passed the usable-score floor
    pub detections: Vec<Detection>,
    pub rule: Option<MatchedRule>,
    /// "2x chair, 1x backpack"
    pub inventory: String,
    pub needs_confirmation: bool,
}

impl RuleResult {
    /// Result with no category and no severity
    pub fn unclassified(explanation: impl Into<String>) -> Self {
        Self {
            risk_type_code: None,
            suggested_severity: None,
            explanation: explanation.into(),
            confidence_score: 0.0,
            detections: Vec::new(),
            rule: None,
            inventory: String::new(),
            needs_confirmation: false,
        }
    }

    pub fn is_classified(&self) -> bool {
        self.risk_type_code.is_some()
    }
}
