//! Authentication middleware

use axum::{
    extract::{State, Request},
    middleware::Next,
    response::Response,
    http::header::AUTHORIZATION,
};
use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use jsonwebtoken::{decode, DecodingKey, Validation};
use uuid::Uuid;

use crate::{AppState, AppError};
use crate::handlers::auth::Claims;
use crate::models::Role;

/// User context extracted from JWT
#[derive(Debug, Clone)]
pub struct UserContext {
    pub user_id: Uuid,
    pub role: Role,
}

impl UserContext {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    /// Workers are limited to their own reports
    pub fn sees_all_reports(&self) -> bool {
        self.role != Role::Worker
    }
}

/// RBAC: Require admin role
pub fn require_admin(user: &UserContext) -> Result<(), AppError> {
    if !user.is_admin() {
        tracing::warn!("Admin required but user {} has role '{}'", user.user_id, user.role.as_str());
        return Err(AppError::Forbidden);
    }
    Ok(())
}

/// RBAC: Require one of the given roles
pub fn require_any_role(user: &UserContext, allowed: &[Role]) -> Result<(), AppError> {
    if !allowed.contains(&user.role) {
        tracing::warn!(
            "One of {:?} required but user {} has role '{}'",
            allowed, user.user_id, user.role.as_str()
        );
        return Err(AppError::Forbidden);
    }
    Ok(())
}

/// Middleware: Require user JWT authentication
pub async fn require_user_auth(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let token = extract_bearer_token(&req)?;

    let token_data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(state.config.jwt_secret.as_bytes()),
        &Validation::default()
    )?;

    let claims = token_data.claims;

    let user_ctx = UserContext {
        user_id: Uuid::parse_str(&claims.sub).map_err(|_| AppError::TokenInvalid)?,
        role: Role::parse(&claims.role).ok_or(AppError::TokenInvalid)?,
    };

    req.extensions_mut().insert(user_ctx);

    Ok(next.run(req).await)
}

/// Extract bearer token from Authorization header
fn extract_bearer_token(req: &Request) -> Result<&str, AppError> {
    let auth_header = req.headers()
        .get(AUTHORIZATION)
        .ok_or(AppError::Unauthorized)?
        .to_str()
        .map_err(|_| AppError::Unauthorized)?;

    auth_header
        .strip_prefix("Bearer ")
        .filter(|t| !t.is_empty())
        .ok_or(AppError::Unauthorized)
}

#[axum::async_trait]
impl<S> FromRequestParts<S> for UserContext
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts.extensions
            .get::<UserContext>()
            .cloned()
            .ok_or(AppError::Unauthorized)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(role: Role) -> UserContext {
        UserContext { user_id: Uuid::new_v4(), role }
    }

    #[test]
    fn test_require_admin() {
        assert!(require_admin(&user(Role::Admin)).is_ok());
        assert!(matches!(require_admin(&user(Role::Csst)), Err(AppError::Forbidden)));
    }

    #[test]
    fn test_require_any_role() {
        let allowed = [Role::Admin, Role::Csst];
        assert!(require_any_role(&user(Role::Csst), &allowed).is_ok());
        assert!(matches!(
            require_any_role(&user(Role::Supervisor), &allowed),
            Err(AppError::Forbidden)
        ));
    }

    #[test]
    fn test_report_visibility() {
        assert!(!user(Role::Worker).sees_all_reports());
        assert!(user(Role::Supervisor).sees_all_reports());
    }
}
