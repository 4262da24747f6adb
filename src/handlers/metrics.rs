//! Dashboard metrics

use std::collections::BTreeMap;

use axum::{extract::{State, Query}, Json};
use chrono::{DateTime, FixedOffset, Months, Offset, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, Postgres, QueryBuilder, Row};
use uuid::Uuid;

use crate::{AppState, AppResult};
use crate::config::Config;
use crate::models::{push_report_filters, DateRange, ReportFilter};
use crate::middleware::auth::UserContext;
use crate::rules::Severity;

/// Months covered by the trend chart
const TREND_MONTHS: u32 = 6;

#[derive(Debug, Deserialize, Default)]
pub struct MetricsQuery {
    pub from: Option<String>,
    pub to: Option<String>,
    pub area_id: Option<Uuid>,
}

impl MetricsQuery {
    fn report_filter(&self) -> AppResult<ReportFilter> {
        Ok(ReportFilter {
            range: DateRange::parse(self.from.as_deref(), self.to.as_deref())?,
            area_id: self.area_id,
            ..Default::default()
        })
    }
}

#[derive(Debug, Serialize, FromRow)]
pub struct SeverityCount {
    pub severity: String,
    pub count: i64,
}

#[derive(Debug, Serialize)]
pub struct Kpis {
    pub total_reports: i64,
    pub reports_by_severity: Vec<SeverityCount>,
    pub total_actions: i64,
    pub open_actions: i64,
    pub in_progress_actions: i64,
    pub done_actions: i64,
    pub overdue_actions: i64,
    pub closed_on_time_percent: i64,
    pub avg_first_response_hours: i64,
}

#[derive(Debug, Serialize, FromRow)]
pub struct NamedCount {
    pub name: String,
    pub count: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct MonthlyTrend {
    /// `YYYY-MM`
    pub month: String,
    pub total: i64,
    pub high: i64,
    pub medium: i64,
    pub low: i64,
}

#[derive(Debug, Serialize)]
pub struct Trends {
    pub reports_by_area: Vec<NamedCount>,
    pub reports_by_risk_type: Vec<NamedCount>,
    pub monthly_trend: Vec<MonthlyTrend>,
}

/// Headline numbers for the dashboard
pub async fn kpis(
    State(state): State<AppState>,
    _user: UserContext,
    Query(query): Query<MetricsQuery>,
) -> AppResult<Json<Kpis>> {
    let filter = query.report_filter()?;

    // Reports by severity
    let mut qb = QueryBuilder::<Postgres>::new(
        "SELECT r.severity_final AS severity, COUNT(*) AS count FROM reports r WHERE 1 = 1"
    );
    push_report_filters(&mut qb, &filter);
    qb.push(" GROUP BY r.severity_final ORDER BY r.severity_final");
    let reports_by_severity = qb.build_query_as::<SeverityCount>().fetch_all(&state.pool).await?;
    let total_reports = reports_by_severity.iter().map(|s| s.count).sum();

    // Action counts follow the area filter only
    let row = sqlx::query(
        r#"
        SELECT
            COUNT(*) AS total,
            COUNT(*) FILTER (WHERE ac.status = 'OPEN') AS open,
            COUNT(*) FILTER (WHERE ac.status = 'IN_PROGRESS') AS in_progress,
            COUNT(*) FILTER (WHERE ac.status = 'DONE') AS done,
            COUNT(*) FILTER (WHERE ac.status <> 'DONE' AND ac.due_date < NOW()) AS overdue
        FROM actions ac
        JOIN reports r ON r.id = ac.report_id
        WHERE ($1::uuid IS NULL OR r.area_id = $1)
        "#
    )
    .bind(query.area_id)
    .fetch_one(&state.pool)
    .await?;

    let done: Vec<(Option<DateTime<Utc>>, DateTime<Utc>)> = sqlx::query_as(
        r#"
        SELECT ac.closed_at, ac.due_date
        FROM actions ac
        JOIN reports r ON r.id = ac.report_id
        WHERE ac.status = 'DONE' AND ($1::uuid IS NULL OR r.area_id = $1)
        "#
    )
    .bind(query.area_id)
    .fetch_all(&state.pool)
    .await?;

    let mut qb = QueryBuilder::<Postgres>::new(
        "SELECT r.created_at, r.first_touched_at FROM reports r WHERE r.first_touched_at IS NOT NULL"
    );
    push_report_filters(&mut qb, &filter);
    let touched: Vec<(DateTime<Utc>, DateTime<Utc>)> =
        qb.build_query_as().fetch_all(&state.pool).await?;

    Ok(Json(Kpis {
        total_reports,
        reports_by_severity,
        total_actions: row.get("total"),
        open_actions: row.get("open"),
        in_progress_actions: row.get("in_progress"),
        done_actions: row.get("done"),
        overdue_actions: row.get("overdue"),
        closed_on_time_percent: closed_on_time_percent(&done),
        avg_first_response_hours: avg_first_response_hours(&touched),
    }))
}

/// Breakdowns and the monthly trend
pub async fn trends(
    State(state): State<AppState>,
    _user: UserContext,
    Query(query): Query<MetricsQuery>,
) -> AppResult<Json<Trends>> {
    let filter = query.report_filter()?;

    let mut qb = QueryBuilder::<Postgres>::new(
        r#"
        SELECT a.name AS name, COUNT(*) AS count
        FROM reports r JOIN areas a ON a.id = r.area_id
        WHERE 1 = 1
        "#
    );
    push_report_filters(&mut qb, &filter);
    qb.push(" GROUP BY a.name ORDER BY count DESC, a.name");
    let reports_by_area = qb.build_query_as::<NamedCount>().fetch_all(&state.pool).await?;

    let mut qb = QueryBuilder::<Postgres>::new(
        r#"
        SELECT rt.name AS name, COUNT(*) AS count
        FROM reports r JOIN risk_types rt ON rt.id = r.risk_type_id_final
        WHERE 1 = 1
        "#
    );
    push_report_filters(&mut qb, &filter);
    qb.push(" GROUP BY rt.name ORDER BY count DESC, rt.name");
    let reports_by_risk_type = qb.build_query_as::<NamedCount>().fetch_all(&state.pool).await?;

    // Trend window is fixed; only the area filter applies
    let now = Utc::now();
    let since = now.checked_sub_months(Months::new(TREND_MONTHS)).unwrap_or(now);
    let recent: Vec<(DateTime<Utc>, String)> = sqlx::query_as(
        r#"
        SELECT r.created_at, r.severity_final
        FROM reports r
        WHERE r.created_at >= $1 AND ($2::uuid IS NULL OR r.area_id = $2)
        "#
    )
    .bind(since)
    .bind(query.area_id)
    .fetch_all(&state.pool)
    .await?;

    Ok(Json(Trends {
        reports_by_area,
        reports_by_risk_type,
        monthly_trend: monthly_trend(&recent, report_offset(&state.config)),
    }))
}

/// Offset used to assign reports to calendar months
pub fn report_offset(config: &Config) -> FixedOffset {
    FixedOffset::east_opt(config.report_utc_offset_minutes * 60).unwrap_or_else(|| {
        tracing::warn!(
            "REPORT_UTC_OFFSET_MINUTES={} is out of range, using UTC",
            config.report_utc_offset_minutes
        );
        Utc.fix()
    })
}

/// Share of finished actions closed on or before their due date, 0-100
pub fn closed_on_time_percent(done: &[(Option<DateTime<Utc>>, DateTime<Utc>)]) -> i64 {
    if done.is_empty() {
        return 0;
    }

    let on_time = done
        .iter()
        .filter(|(closed_at, due_date)| closed_at.is_some_and(|c| c <= *due_date))
        .count();

    (on_time as f64 / done.len() as f64 * 100.0).round() as i64
}

/// Mean hours from report creation to first touch
pub fn avg_first_response_hours(touched: &[(DateTime<Utc>, DateTime<Utc>)]) -> i64 {
    if touched.is_empty() {
        return 0;
    }

    let total_hours: f64 = touched
        .iter()
        .map(|(created_at, touched_at)| (*touched_at - *created_at).num_seconds() as f64 / 3600.0)
        .sum();

    (total_hours / touched.len() as f64).round() as i64
}

/// Reports per local calendar month, oldest first
pub fn monthly_trend(reports: &[(DateTime<Utc>, String)], offset: FixedOffset) -> Vec<MonthlyTrend> {
    let mut months: BTreeMap<String, MonthlyTrend> = BTreeMap::new();

    for (created_at, severity) in reports {
        let month = created_at.with_timezone(&offset).format("%Y-%m").to_string();
        let entry = months.entry(month.clone()).or_insert_with(|| MonthlyTrend {
            month,
            ..Default::default()
        });

        entry.total += 1;
        match Severity::parse(severity) {
            Some(Severity::High) => entry.high += 1,
            Some(Severity::Medium) => entry.medium += 1,
            Some(Severity::Low) => entry.low += 1,
            None => {}
        }
    }

    months.into_values().collect()
}
