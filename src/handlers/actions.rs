//! Corrective action handlers

use axum::{extract::{State, Path, Query}, http::StatusCode, Json};
use serde_json::json;
use uuid::Uuid;
use validator::Validate;

use crate::{AppState, AppResult, AppError};
use crate::models::{
    audit, can_update_action, parse_timestamp, Action, ActionFilter, ActionStatus, ActionView,
    CreateAction, Report, Role, UpdateAction, User, ASSIGNABLE_ROLES,
};
use crate::middleware::auth::{require_any_role, UserContext};

/// Assign a corrective action to a report
pub async fn create(
    State(state): State<AppState>,
    user: UserContext,
    Json(req): Json<CreateAction>,
) -> AppResult<(StatusCode, Json<Action>)> {
    require_any_role(&user, &ASSIGNABLE_ROLES)?;
    req.validate()?;

    let due_date = parse_timestamp(&req.due_date)?;

    let report = Report::find_by_id(&state.pool, req.report_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Report not found".to_string()))?;

    let assignee = User::find_by_id(&state.pool, req.assigned_to)
        .await?
        .filter(|u| u.is_active)
        .ok_or_else(|| AppError::ValidationError("Unknown assignee".to_string()))?;

    if !assignee.role().is_some_and(|r| ASSIGNABLE_ROLES.contains(&r)) {
        return Err(AppError::ValidationError(
            "Assignee must be a supervisor, CSST member or admin".to_string()
        ));
    }

    let action = Action::create(&state.pool, user.user_id, &req, due_date).await?;

    if Report::mark_first_touch(&state.pool, report.id, user.user_id).await? {
        tracing::info!("Report {} first touched by {}", report.id, user.user_id);
    }

    audit::record(
        &state.pool,
        "Action",
        &action.id.to_string(),
        "CREATED",
        Some(user.user_id),
        Some(json!({
            "report_id": action.report_id,
            "assigned_to": action.assigned_to,
            "due_date": action.due_date,
        })),
    )
    .await?;

    Ok((StatusCode::CREATED, Json(action)))
}

/// List actions, newest first. Workers only see what is assigned to them.
pub async fn list(
    State(state): State<AppState>,
    user: UserContext,
    Query(mut filter): Query<ActionFilter>,
) -> AppResult<Json<Vec<ActionView>>> {
    if user.role == Role::Worker {
        filter.assigned_to = Some(user.user_id);
    }

    let actions = Action::list(&state.pool, &filter).await?;
    Ok(Json(actions))
}

/// Get single action
pub async fn get(
    State(state): State<AppState>,
    user: UserContext,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ActionView>> {
    let action = Action::find_view(&state.pool, id)
        .await?
        .ok_or_else(|| AppError::NotFound("Action not found".to_string()))?;

    if !user.role.manages_actions() && action.assigned_to != user.user_id {
        return Err(AppError::Forbidden);
    }

    Ok(Json(action))
}

/// Move an action through OPEN -> IN_PROGRESS -> DONE
pub async fn update(
    State(state): State<AppState>,
    user: UserContext,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateAction>,
) -> AppResult<Json<Action>> {
    req.validate()?;

    let current = Action::find_by_id(&state.pool, id)
        .await?
        .ok_or_else(|| AppError::NotFound("Action not found".to_string()))?;

    if !can_update_action(user.role, user.user_id, &current) {
        return Err(AppError::Forbidden);
    }

    let from = ActionStatus::parse(&current.status)
        .ok_or_else(|| AppError::InternalError(format!("Unknown action status {}", current.status)))?;
    let to = req.status.unwrap_or(from);

    let action = Action::update_status(
        &state.pool,
        id,
        to,
        req.close_comment.as_deref(),
        req.close_photo_url.as_deref(),
    )
    .await?
    .ok_or_else(|| AppError::NotFound("Action not found".to_string()))?;

    audit::record(
        &state.pool,
        "Action",
        &action.id.to_string(),
        "STATUS_CHANGED",
        Some(user.user_id),
        Some(json!({ "from": from.as_str(), "to": to.as_str() })),
    )
    .await?;

    tracing::info!("Action {} moved {} -> {}", action.id, from.as_str(), to.as_str());

    Ok(Json(action))
}
