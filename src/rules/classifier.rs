//! Hazard Classifier
//!
//! Classification logic only - types live in `types`, tiers in `thresholds`.
//! Input: detections, SeverityThresholds, confirmation floor
//! Output: RuleResult
//!
//! Branch order matters, the first matching branch wins:
//! empty input -> low-confidence filter -> obstruction -> housekeeping ->
//! sparse fallback.

use std::collections::HashSet;

use super::classes::{display_name, is_obstacle};
use super::thresholds::{SeverityThresholds, MIN_USABLE_SCORE};
use super::types::{Detection, MatchedRule, RiskCode, RuleResult, Severity};

// ============================================================================
// CONSTANTS
// ============================================================================

/// Confidence below which the suggestion is flagged for a second look
pub const DEFAULT_MIN_CONFIDENCE: f64 = 0.5;

/// Obstacle-class objects needed for the obstruction rule
pub const OBSTRUCTION_MIN_OBJECTS: usize = 2;

/// Objects (or distinct kinds of object) needed for the housekeeping rule
pub const HOUSEKEEPING_MIN_OBJECTS: usize = 3;
pub const HOUSEKEEPING_MIN_CLASSES: usize = 3;

pub const CONFIRMATION_MARKER: &str = "Requires confirmation.";

const NOTHING_DETECTED: &str =
    "No objects detected in the image. The report can be entered manually.";

// ============================================================================
// MAIN CLASSIFICATION FUNCTION
// ============================================================================

/// Classify with the built-in thresholds and confirmation floor
pub fn classify(detections: &[Detection]) -> RuleResult {
    classify_with_thresholds(detections, &SeverityThresholds::default(), DEFAULT_MIN_CONFIDENCE)
}

/// Classification with custom thresholds. Total: every input yields a result.
pub fn classify_with_thresholds(
    detections: &[Detection],
    thresholds: &SeverityThresholds,
    min_confidence: f64,
) -> RuleResult {
    if detections.is_empty() {
        return RuleResult::unclassified(NOTHING_DETECTED);
    }

    // NaN compares false here and is dropped with the rest
    let valid: Vec<Detection> = detections
        .iter()
        .filter(|d| d.score >= MIN_USABLE_SCORE)
        .cloned()
        .collect();

    if valid.is_empty() {
        return RuleResult::unclassified(format!(
            "All {} detected object(s) scored below the usable confidence floor ({:.2}). \
             The report can be entered manually.",
            detections.len(),
            MIN_USABLE_SCORE
        ));
    }

    let obstacle_count = valid.iter().filter(|d| is_obstacle(&d.label)).count();
    let unique_classes = valid.iter().map(|d| d.label.as_str()).collect::<HashSet<_>>().len();
    let avg_score = valid.iter().map(|d| d.score).sum::<f64>() / valid.len() as f64;
    let inventory = inventory(&valid);

    tracing::debug!(
        valid = valid.len(),
        dropped = detections.len() - valid.len(),
        obstacles = obstacle_count,
        unique_classes,
        avg_score,
        "Classifying detections"
    );

    // Rule A: obstruction / trip hazard
    if obstacle_count >= OBSTRUCTION_MIN_OBJECTS {
        let severity = determine_severity(obstacle_count, avg_score, thresholds);
        let raw_confidence = tiered_confidence(obstacle_count, avg_score, thresholds);
        let needs_confirmation = raw_confidence < min_confidence;

        let explanation = format!(
            "Detected {} potentially obstructing object(s) ({}). Rule applied: {}, objects \
             that could block walkways or emergency exits. Suggested severity: {}.{}",
            obstacle_count,
            inventory,
            MatchedRule::Obstruction.title(),
            severity,
            confirmation_suffix(needs_confirmation)
        );

        return RuleResult {
            risk_type_code: Some(RiskCode::Obstruction),
            suggested_severity: Some(severity),
            explanation,
            confidence_score: round2(raw_confidence),
            detections: valid,
            rule: Some(MatchedRule::Obstruction),
            inventory,
            needs_confirmation,
        };
    }

    // Rule B: poor housekeeping (clutter)
    if valid.len() >= HOUSEKEEPING_MIN_OBJECTS || unique_classes >= HOUSEKEEPING_MIN_CLASSES {
        let severity = determine_severity(valid.len(), avg_score, thresholds);
        let raw_confidence = tiered_confidence(valid.len(), avg_score, thresholds);
        let needs_confirmation = raw_confidence < min_confidence;

        let explanation = format!(
            "Detected {} object(s) of {} distinct type(s) ({}). Rule applied: {}, a high \
             quantity or variety of scattered objects. Suggested severity: {}.{}",
            valid.len(),
            unique_classes,
            inventory,
            MatchedRule::Housekeeping.title(),
            severity,
            confirmation_suffix(needs_confirmation)
        );

        return RuleResult {
            risk_type_code: Some(RiskCode::Housekeeping),
            suggested_severity: Some(severity),
            explanation,
            confidence_score: round2(raw_confidence),
            detections: valid,
            rule: Some(MatchedRule::Housekeeping),
            inventory,
            needs_confirmation,
        };
    }

    // Fallback: one or two unremarkable objects. Confidence is halved and the
    // result always asks for a human check.
    let explanation = format!(
        "Detected {} object(s) ({}). Rule applied: {}, few objects found so a low risk is \
         suggested. Suggested severity: {}. Confirm or adjust to match the actual situation.{}",
        valid.len(),
        inventory,
        MatchedRule::SparseDetection.title(),
        Severity::Low,
        confirmation_suffix(true)
    );

    RuleResult {
        risk_type_code: Some(RiskCode::Housekeeping),
        suggested_severity: Some(Severity::Low),
        explanation,
        confidence_score: (avg_score * 50.0).round() / 100.0,
        detections: valid,
        rule: Some(MatchedRule::SparseDetection),
        inventory,
        needs_confirmation: true,
    }
}

/// Tiers in strict priority order. Count AND score must both qualify.
pub fn determine_severity(
    object_count: usize,
    avg_score: f64,
    thresholds: &SeverityThresholds,
) -> Severity {
    if thresholds.high.is_met(object_count, avg_score) {
        Severity::High
    } else if thresholds.medium.is_met(object_count, avg_score) {
        Severity::Medium
    } else {
        Severity::Low
    }
}

// ============================================================================
// HELPERS
// ============================================================================

/// `min(1, count / high.min_objects * avg)`, unrounded
fn tiered_confidence(count: usize, avg_score: f64, thresholds: &SeverityThresholds) -> f64 {
    let raw = (count as f64 / thresholds.high.min_objects as f64) * avg_score;
    raw.min(1.0)
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

fn confirmation_suffix(needs_confirmation: bool) -> String {
    if needs_confirmation {
        format!(" ⚠ {}", CONFIRMATION_MARKER)
    } else {
        String::new()
    }
}

/// "2x chair, 1x backpack", labels in first-seen order
fn inventory(detections: &[Detection]) -> String {
    let mut counts: Vec<(&str, usize)> = Vec::new();
    for d in detections {
        match counts.iter_mut().find(|(label, _)| *label == d.label) {
            Some((_, n)) => *n += 1,
            None => counts.push((d.label.as_str(), 1)),
        }
    }

    counts
        .iter()
        .map(|(label, n)| format!("{}x {}", n, display_name(label)))
        .collect::<Vec<_>>()
        .join(", ")
}

// ============================================================================
// TESTS
// ============================================================================
