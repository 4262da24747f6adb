//! Data models

pub mod user;
pub mod area;
pub mod risk_type;
pub mod report;
pub mod action;
pub mod rule_config;
pub mod audit;

pub use user::*;
pub use area::*;
pub use risk_type::*;
pub use report::*;
pub use action::*;
pub use rule_config::*;
pub use audit::*;

use chrono::{DateTime, NaiveDate, Utc};

use crate::AppError;

/// Optional `from` / `to` bounds on `created_at`
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct DateRange {
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
}

impl DateRange {
    pub fn parse(from: Option<&str>, to: Option<&str>) -> Result<Self, AppError> {
        Ok(Self {
            from: from.map(parse_timestamp).transpose()?,
            to: to.map(parse_timestamp).transpose()?,
        })
    }
}

/// Accepts RFC 3339 or a bare `YYYY-MM-DD` (midnight UTC)
pub fn parse_timestamp(value: &str) -> Result<DateTime<Utc>, AppError> {
    let value = value.trim();

    if let Ok(ts) = DateTime::parse_from_rfc3339(value) {
        return Ok(ts.with_timezone(&Utc));
    }

    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|dt| dt.and_utc())
        .ok_or_else(|| AppError::ValidationError(format!("Invalid date: {}", value)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_parse_plain_date() {
        let ts = parse_timestamp("2026-03-15").unwrap();
        assert_eq!(ts, Utc.with_ymd_and_hms(2026, 3, 15, 0, 0, 0).unwrap());
    }

    #[test]
    fn test_parse_rfc3339_with_offset() {
        let ts = parse_timestamp("2026-03-15T08:30:00-05:00").unwrap();
        assert_eq!(ts, Utc.with_ymd_and_hms(2026, 3, 15, 13, 30, 0).unwrap());
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(matches!(parse_timestamp("15/03/2026"), Err(AppError::ValidationError(_))));
    }

    #[test]
    fn test_date_range_optional_bounds() {
        let range = DateRange::parse(Some("2026-01-01"), None).unwrap();
        assert!(range.from.is_some());
        assert!(range.to.is_none());
        assert_eq!(DateRange::parse(None, None).unwrap(), DateRange::default());
    }
}
