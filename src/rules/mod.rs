//! Hazard Rules Engine
//!
//! Turns the detector's labeled boxes into a suggested risk category,
//! severity, confidence and explanation. Pure and deterministic: no I/O,
//! no shared state, safe to call from any number of handlers at once.
//!
//! ## Structure
//! - `types`: Detection, Severity, RiskCode, RuleResult
//! - `classes`: obstacle label set and display names
//! - `thresholds`: severity tiers and their validation
//! - `classifier`: classification logic
//!
//! ## Usage
//! ```ignore
//! use crate::rules::{classify_with_thresholds, SeverityThresholds};
//!
//! let result = classify_with_thresholds(&detections, &SeverityThresholds::default(), 0.5);
//! if result.needs_confirmation {
//!     // surface the suggestion as "please double-check"
//! }
//! ```

pub mod types;
pub mod classes;
pub mod thresholds;
pub mod classifier;

pub use types::{Detection, MatchedRule, RiskCode, RuleResult, Severity};

pub use thresholds::{SeverityThresholds, ThresholdError, TierThreshold, MIN_USABLE_SCORE};

pub use classifier::{
    classify,
    classify_with_thresholds,
    determine_severity,
    CONFIRMATION_MARKER,
    DEFAULT_MIN_CONFIDENCE,
};
