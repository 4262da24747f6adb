//! Authentication handlers

use std::net::SocketAddr;
use std::time::Instant;

use axum::{extract::{ConnectInfo, State}, http::HeaderMap, Json};
use argon2::{Argon2, PasswordHash, PasswordVerifier};
use jsonwebtoken::{encode, Header, EncodingKey};
use serde::{Deserialize, Serialize};
use chrono::{Utc, Duration};
use validator::Validate;

use crate::{AppState, AppError, AppResult};
use crate::models::{User, LoginRequest, LoginResponse};

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,      // User ID
    pub role: String,     // User role
    pub exp: usize,       // Expiration timestamp
    pub iat: usize,       // Issued at
}

/// Login endpoint
pub async fn login(
    State(state): State<AppState>,
    connect_info: Option<ConnectInfo<SocketAddr>>,
    headers: HeaderMap,
    Json(req): Json<LoginRequest>,
) -> AppResult<Json<LoginResponse>> {
    let client = client_key(&headers, connect_info.map(|ConnectInfo(addr)| addr));
    if !state.login_attempts.try_acquire(&client, Instant::now()) {
        tracing::warn!("Login rate limit exceeded for {}", client);
        return Err(AppError::TooManyRequests);
    }

    req.validate()?;

    // Find user by email
    let user = User::find_by_email(&state.pool, &req.email)
        .await?
        .ok_or(AppError::InvalidCredentials)?;

    // Verify password
    let parsed_hash = PasswordHash::new(&user.password_hash)
        .map_err(|_| AppError::InternalError("Invalid password hash".to_string()))?;

    Argon2::default()
        .verify_password(req.password.as_bytes(), &parsed_hash)
        .map_err(|_| AppError::InvalidCredentials)?;

    User::update_last_login(&state.pool, user.id).await?;

    let (token, expires_at) =
        generate_jwt(&user, &state.config.jwt_secret, state.config.jwt_expiration_hours)?;

    tracing::info!("User {} logged in", user.id);

    Ok(Json(LoginResponse {
        token,
        expires_at,
        user: user.to_info(),
    }))
}

/// First hop of X-Forwarded-For, else the socket peer
fn client_key(headers: &HeaderMap, peer: Option<SocketAddr>) -> String {
    headers
        .get("X-Forwarded-For")
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.split(',').next())
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .or_else(|| peer.map(|addr| addr.ip().to_string()))
        .unwrap_or_else(|| "unknown".to_string())
}

/// Generate JWT token; returns the token and its expiry (unix seconds)
fn generate_jwt(user: &User, secret: &str, expiration_hours: u64) -> AppResult<(String, i64)> {
    let now = Utc::now();
    let exp = now + Duration::hours(expiration_hours as i64);

    let claims = Claims {
        sub: user.id.to_string(),
        role: user.role.clone(),
        exp: exp.timestamp() as usize,
        iat: now.timestamp() as usize,
    };

    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes())
    ).map_err(|e| AppError::InternalError(e.to_string()))?;

    Ok((token, exp.timestamp()))
}
