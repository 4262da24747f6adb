//! Catalogue lookups for form pickers

use axum::{extract::State, Json};

use crate::{AppState, AppResult};
use crate::models::{Area, RiskType, User, UserInfo};
use crate::middleware::auth::UserContext;

pub async fn areas(
    State(state): State<AppState>,
    _user: UserContext,
) -> AppResult<Json<Vec<Area>>> {
    Ok(Json(Area::list(&state.pool).await?))
}

pub async fn risk_types(
    State(state): State<AppState>,
    _user: UserContext,
) -> AppResult<Json<Vec<RiskType>>> {
    Ok(Json(RiskType::list_active(&state.pool).await?))
}

/// Users that can own a corrective action
pub async fn assignable_users(
    State(state): State<AppState>,
    _user: UserContext,
) -> AppResult<Json<Vec<UserInfo>>> {
    Ok(Json(User::list_assignable(&state.pool).await?))
}
