//! Corrective action model

use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool, Postgres, QueryBuilder};
use uuid::Uuid;
use chrono::{DateTime, Utc};
use validator::Validate;

use super::Role;

pub const ACTION_LIST_LIMIT: i64 = 100;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Action {
    pub id: Uuid,
    pub report_id: Uuid,
    pub assigned_to: Uuid,
    pub assigned_by: Uuid,
    pub due_date: DateTime<Utc>,
    pub description: String,
    pub status: String,
    pub close_comment: Option<String>,
    pub close_photo_url: Option<String>,
    pub closed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ActionStatus {
    Open,
    InProgress,
    Done,
}

impl ActionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Open => "OPEN",
            Self::InProgress => "IN_PROGRESS",
            Self::Done => "DONE",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "OPEN" => Some(Self::Open),
            "IN_PROGRESS" => Some(Self::InProgress),
            "DONE" => Some(Self::Done),
            _ => None,
        }
    }
}

/// Action view with the names the UI needs
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct ActionView {
    pub id: Uuid,
    pub report_id: Uuid,
    pub report_description: String,
    pub report_severity: String,
    pub area_name: String,
    pub assigned_to: Uuid,
    pub assigned_to_name: String,
    pub assigned_by: Uuid,
    pub assigned_by_name: String,
    pub due_date: DateTime<Utc>,
    pub description: String,
    pub status: String,
    pub close_comment: Option<String>,
    pub close_photo_url: Option<String>,
    pub closed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    #[sqlx(default)]
    pub is_overdue: bool,
}

impl ActionView {
    fn with_overdue(mut self, now: DateTime<Utc>) -> Self {
        self.is_overdue = is_overdue(self.due_date, &self.status, now);
        self
    }
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateAction {
    pub report_id: Uuid,
    pub assigned_to: Uuid,
    /// `YYYY-MM-DD` or RFC 3339
    #[validate(length(min = 1, message = "A due date is required"))]
    pub due_date: String,
    #[validate(length(min = 1, max = 500, message = "Description must be 1-500 characters"))]
    pub description: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateAction {
    pub status: Option<ActionStatus>,
    #[validate(length(max = 500))]
    pub close_comment: Option<String>,
    #[validate(url)]
    pub close_photo_url: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
pub struct ActionFilter {
    pub status: Option<ActionStatus>,
    pub assigned_to: Option<Uuid>,
    #[serde(default)]
    pub overdue: bool,
}

const VIEW_SELECT: &str = r#"
    SELECT ac.id, ac.report_id, r.description AS report_description,
           r.severity_final AS report_severity, a.name AS area_name,
           ac.assigned_to, ut.name AS assigned_to_name,
           ac.assigned_by, ub.name AS assigned_by_name,
           ac.due_date, ac.description, ac.status, ac.close_comment,
           ac.close_photo_url, ac.closed_at, ac.created_at
    FROM actions ac
    JOIN reports r ON r.id = ac.report_id
    JOIN areas a ON a.id = r.area_id
    JOIN users ut ON ut.id = ac.assigned_to
    JOIN users ub ON ub.id = ac.assigned_by
"#;

impl Action {
    pub async fn create(
        pool: &PgPool,
        assigned_by: Uuid,
        data: &CreateAction,
        due_date: DateTime<Utc>,
    ) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, Action>(
            r#"
            INSERT INTO actions (report_id, assigned_to, assigned_by, due_date, description, status)
            VALUES ($1, $2, $3, $4, $5, 'OPEN')
            RETURNING *
            "#
        )
        .bind(data.report_id)
        .bind(data.assigned_to)
        .bind(assigned_by)
        .bind(due_date)
        .bind(&data.description)
        .fetch_one(pool)
        .await
    }

    pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Action>("SELECT * FROM actions WHERE id = $1")
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    pub async fn find_view(pool: &PgPool, id: Uuid) -> Result<Option<ActionView>, sqlx::Error> {
        let view = sqlx::query_as::<_, ActionView>(&format!("{} WHERE ac.id = $1", VIEW_SELECT))
            .bind(id)
            .fetch_optional(pool)
            .await?;

        Ok(view.map(|v| v.with_overdue(Utc::now())))
    }

    pub async fn list(pool: &PgPool, filter: &ActionFilter) -> Result<Vec<ActionView>, sqlx::Error> {
        let mut qb = QueryBuilder::<Postgres>::new(VIEW_SELECT);
        qb.push(" WHERE 1 = 1");

        if let Some(status) = filter.status {
            qb.push(" AND ac.status = ").push_bind(status.as_str());
        }
        if let Some(assigned_to) = filter.assigned_to {
            qb.push(" AND ac.assigned_to = ").push_bind(assigned_to);
        }
        if filter.overdue {
            qb.push(" AND ac.due_date < NOW() AND ac.status <> 'DONE'");
        }

        qb.push(" ORDER BY ac.created_at DESC LIMIT ").push_bind(ACTION_LIST_LIMIT);

        let views = qb.build_query_as::<ActionView>().fetch_all(pool).await?;

        let now = Utc::now();
        Ok(views.into_iter().map(|v| v.with_overdue(now)).collect())
    }

    pub async fn list_for_report(pool: &PgPool, report_id: Uuid) -> Result<Vec<ActionView>, sqlx::Error> {
        let views = sqlx::query_as::<_, ActionView>(&format!(
            "{} WHERE ac.report_id = $1 ORDER BY ac.created_at DESC",
            VIEW_SELECT
        ))
        .bind(report_id)
        .fetch_all(pool)
        .await?;

        let now = Utc::now();
        Ok(views.into_iter().map(|v| v.with_overdue(now)).collect())
    }

    /// Closing stamps `closed_at` and keeps the close-out evidence;
    /// reopening clears `closed_at`. Marking an already `DONE` action as
    /// `DONE` again keeps the first close time, so on-time KPIs do not move.
    pub async fn update_status(
        pool: &PgPool,
        id: Uuid,
        status: ActionStatus,
        close_comment: Option<&str>,
        close_photo_url: Option<&str>,
    ) -> Result<Option<Self>, sqlx::Error> {
        let closing = status == ActionStatus::Done;

        sqlx::query_as::<_, Action>(
            r#"
            UPDATE actions
            SET status = $2,
                closed_at = CASE WHEN $3 THEN COALESCE(closed_at, NOW()) ELSE NULL END,
                close_comment = CASE WHEN $3 THEN COALESCE($4, close_comment) ELSE close_comment END,
                close_photo_url = CASE WHEN $3 THEN COALESCE($5, close_photo_url) ELSE close_photo_url END,
                updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#
        )
        .bind(id)
        .bind(status.as_str())
        .bind(closing)
        .bind(close_comment)
        .bind(close_photo_url)
        .fetch_optional(pool)
        .await
    }
}

/// Past due and not finished
pub fn is_overdue(due_date: DateTime<Utc>, status: &str, now: DateTime<Utc>) -> bool {
    due_date < now && status != ActionStatus::Done.as_str()
}

/// Managers may update any action, others only the ones assigned to them
pub fn can_update_action(role: Role, user_id: Uuid, action: &Action) -> bool {
    role.manages_actions() || action.assigned_to == user_id
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn action(assigned_to: Uuid, status: ActionStatus, due_date: DateTime<Utc>) -> Action {
        let now = Utc::now();
        Action {
            id: Uuid::new_v4(),
            report_id: Uuid::new_v4(),
            assigned_to,
            assigned_by: Uuid::new_v4(),
            due_date,
            description: "Clear the aisle".to_string(),
            status: status.as_str().to_string(),
            close_comment: None,
            close_photo_url: None,
            closed_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_overdue() {
        let now = Utc.with_ymd_and_hms(2026, 5, 10, 12, 0, 0).unwrap();
        let due = now - Duration::days(1);

        assert!(is_overdue(due, "OPEN", now));
        assert!(is_overdue(due, "IN_PROGRESS", now));
        assert!(!is_overdue(due, "DONE", now));
        assert!(!is_overdue(now + Duration::hours(1), "OPEN", now));
    }

    #[test]
    fn test_update_permissions() {
        let owner = Uuid::new_v4();
        let other = Uuid::new_v4();
        let a = action(owner, ActionStatus::Open, Utc::now());

        assert!(can_update_action(Role::Worker, owner, &a));
        assert!(!can_update_action(Role::Worker, other, &a));
        assert!(can_update_action(Role::Supervisor, other, &a));
        assert!(can_update_action(Role::Csst, other, &a));
    }

    #[test]
    fn test_status_wire_names() {
        let s: ActionStatus = serde_json::from_str("\"IN_PROGRESS\"").unwrap();
        assert_eq!(s, ActionStatus::InProgress);
        assert_eq!(ActionStatus::Done.as_str(), "DONE");
    }

    #[test]
    fn test_update_action_validation() {
        let bad = UpdateAction {
            status: Some(ActionStatus::Done),
            close_comment: Some("done".to_string()),
            close_photo_url: Some("not a url".to_string()),
        };
        assert!(bad.validate().is_err());

        let ok = UpdateAction {
            status: Some(ActionStatus::Done),
            close_comment: None,
            close_photo_url: Some("http://localhost/uploads/action-photos/1-a.png".to_string()),
        };
        assert!(ok.validate().is_ok());
    }
}
