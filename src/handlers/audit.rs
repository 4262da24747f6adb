//! Audit log viewer

use axum::{extract::{State, Query}, Json};

use crate::{AppState, AppResult};
use crate::models::{AuditEntry, AuditQuery, DateRange};
use crate::middleware::auth::{require_admin, UserContext};

/// Newest audit entries (admin only)
pub async fn list(
    State(state): State<AppState>,
    user: UserContext,
    Query(query): Query<AuditQuery>,
) -> AppResult<Json<Vec<AuditEntry>>> {
    require_admin(&user)?;

    let range = DateRange::parse(query.from.as_deref(), query.to.as_deref())?;
    let entries = AuditEntry::list(&state.pool, query.entity_type.as_deref(), &range).await?;

    Ok(Json(entries))
}
