//! Hazardwatch Server
//!
//! Workplace hazard reporting backend. Workers submit photo reports, a rules
//! engine suggests a risk category and severity from client-side object
//! detections, and supervisors track corrective actions to closure.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                        HAZARDWATCH                          │
//! ├─────────────────────────────────────────────────────────────┤
//! │  ┌───────────┐  ┌───────────┐  ┌─────────────────────────┐ │
//! │  │  API      │  │  Auth     │  │  Rules Engine           │ │
//! │  │  (Axum)   │  │  (JWT)    │  │  (pure, deterministic)  │ │
//! │  └─────┬─────┘  └─────┬─────┘  └────────────┬────────────┘ │
//! │        └──────────────┼──────────────────────┘              │
//! │                       ▼                                     │
//! │          ┌─────────────┐   ┌──────────────┐                │
//! │          │ PostgreSQL  │   │ Photo store  │                │
//! │          └─────────────┘   └──────────────┘                │
//! └─────────────────────────────────────────────────────────────┘
//! ```

mod config;
mod db;
mod models;
mod handlers;
mod middleware;
mod error;
mod rules;
mod storage;

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::{
    Router,
    extract::DefaultBodyLimit,
    routing::{get, post},
    middleware as axum_middleware,
};
use tower_http::{
    cors::{CorsLayer, Any},
    trace::TraceLayer,
    compression::CompressionLayer,
    services::ServeDir,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use middleware::rate_limit::{InMemoryAttemptStore, LoginAttemptStore};
use storage::{LocalPhotoStore, PhotoStore};

pub use error::{AppError, AppResult};

/// How often stale login-attempt records are dropped
const ATTEMPT_PRUNE_INTERVAL: Duration = Duration::from_secs(300);

/// Multipart framing allowance on top of the file size limit
const MULTIPART_OVERHEAD_BYTES: usize = 64 * 1024;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load configuration
    dotenvy::dotenv().ok();
    init_tracing();

    let config = config::Config::from_env();

    tracing::info!("Hazardwatch server starting ({})", config.environment);
    tracing::info!("Database: {}", config.database_url.split('@').last().unwrap_or("***"));

    if config.is_production() && config.jwt_secret.contains("dev-secret") {
        anyhow::bail!("JWT_SECRET must be set in production");
    }

    // Initialize database pool
    let pool = db::create_pool(&config.database_url).await?;

    tracing::info!("Running database migrations...");
    db::run_migrations(&pool).await?;
    db::seed_defaults(&pool, &config).await?;

    tokio::fs::create_dir_all(&config.upload_dir).await?;

    let login_attempts = Arc::new(InMemoryAttemptStore::new(
        config.login_max_attempts,
        Duration::from_secs(config.login_window_secs),
    ));
    spawn_attempt_pruner(login_attempts.clone());

    let state = AppState {
        pool,
        config: config.clone(),
        login_attempts,
        photos: Arc::new(LocalPhotoStore::new(&config.upload_dir, &config.public_base_url)),
    };

    let app = create_router(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    tracing::info!("🚀 Server listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>()).await?;

    Ok(())
}

/// `LOG_FORMAT=json` switches to one JSON object per line
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "hazardwatch=debug,tower_http=debug".into());
    let json = std::env::var("LOG_FORMAT").is_ok_and(|v| v.eq_ignore_ascii_case("json"));

    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}

fn spawn_attempt_pruner(store: Arc<InMemoryAttemptStore>) {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(ATTEMPT_PRUNE_INTERVAL);
        loop {
            ticker.tick().await;
            store.prune(Instant::now());
        }
    });
}

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub pool: sqlx::PgPool,
    pub config: config::Config,
    pub login_attempts: Arc<dyn LoginAttemptStore>,
    pub photos: Arc<dyn PhotoStore>,
}

/// Create the main router with all routes
fn create_router(state: AppState) -> Router {
    // Public routes (no auth required)
    let public_routes = Router::new()
        .route("/health", get(handlers::health::check))
        .route("/api/v1/auth/login", post(handlers::auth::login));

    // Everything else requires a user JWT
    let protected_routes = Router::new()
        // Analysis
        .route("/api/v1/analyze", post(handlers::analyze::analyze))

        // Reports
        .route("/api/v1/reports", get(handlers::reports::list).post(handlers::reports::create))
        .route("/api/v1/reports/:id", get(handlers::reports::get))

        // Corrective actions
        .route("/api/v1/actions", get(handlers::actions::list).post(handlers::actions::create))
        .route("/api/v1/actions/:id", get(handlers::actions::get).patch(handlers::actions::update))

        // Metrics
        .route("/api/v1/metrics/kpis", get(handlers::metrics::kpis))
        .route("/api/v1/metrics/trends", get(handlers::metrics::trends))

        // Administration
        .route("/api/v1/admin/rules", get(handlers::rules::get).put(handlers::rules::update))
        .route("/api/v1/admin/export/csv", get(handlers::export::reports_csv))
        .route("/api/v1/admin/audit", get(handlers::audit::list))

        // Catalogues
        .route("/api/v1/areas", get(handlers::catalog::areas))
        .route("/api/v1/risk-types", get(handlers::catalog::risk_types))
        .route("/api/v1/users", get(handlers::catalog::assignable_users))

        // Photos
        .route(
            "/api/v1/uploads",
            post(handlers::uploads::upload)
                .layer(DefaultBodyLimit::max(state.config.max_upload_bytes + MULTIPART_OVERHEAD_BYTES)),
        )

        .layer(axum_middleware::from_fn_with_state(
            state.clone(),
            middleware::auth::require_user_auth
        ));

    Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .nest_service("/uploads", ServeDir::new(&state.config.upload_dir))
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any)
        )
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{to_bytes, Body};
    use axum::http::{header, Method, Request, StatusCode};
    use chrono::Utc;
    use jsonwebtoken::{encode, EncodingKey, Header};
    use serde_json::{json, Value};
    use sqlx::postgres::PgPoolOptions;
    use tower::ServiceExt;
    use uuid::Uuid;

    use crate::handlers::auth::Claims;
    use crate::models::Role;
    use crate::rules::SeverityThresholds;

    /// State whose database is never reachable; routes under test must
    /// answer before touching it.
    fn test_state(upload_dir: &std::path::Path) -> AppState {
        let mut config = config::Config::for_tests();
        config.upload_dir = upload_dir.to_path_buf();

        let pool = PgPoolOptions::new()
            .acquire_timeout(Duration::from_millis(200))
            .connect_lazy(&config.database_url)
            .unwrap();

        AppState {
            pool,
            login_attempts: Arc::new(InMemoryAttemptStore::new(
                config.login_max_attempts,
                Duration::from_secs(config.login_window_secs),
            )),
            photos: Arc::new(LocalPhotoStore::new(upload_dir, &config.public_base_url)),
            config,
        }
    }

    fn token(role: Role) -> String {
        let now = Utc::now().timestamp() as usize;
        let claims = Claims {
            sub: Uuid::new_v4().to_string(),
            role: role.as_str().to_string(),
            exp: now + 3600,
            iat: now,
        };
        encode(&Header::default(), &claims, &EncodingKey::from_secret(b"test-secret")).unwrap()
    }

    fn json_request(method: Method, uri: &str, role: Option<Role>, body: Value) -> Request<Body> {
        let mut builder = Request::builder()
            .method(method)
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json");
        if let Some(role) = role {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token(role)));
        }
        builder.body(Body::from(body.to_string())).unwrap()
    }

    fn multipart_request(role: Role, content_type: &str, file_name: &str, data: &[u8]) -> Request<Body> {
        let mut body = Vec::new();
        body.extend_from_slice(b"--XBOUNDARY\r\n");
        body.extend_from_slice(
            format!(
                "Content-Disposition: form-data; name=\"file\"; filename=\"{}\"\r\nContent-Type: {}\r\n\r\n",
                file_name, content_type
            )
            .as_bytes(),
        );
        body.extend_from_slice(data);
        body.extend_from_slice(b"\r\n--XBOUNDARY--\r\n");

        Request::builder()
            .method(Method::POST)
            .uri("/api/v1/uploads")
            .header(header::CONTENT_TYPE, "multipart/form-data; boundary=XBOUNDARY")
            .header(header::AUTHORIZATION, format!("Bearer {}", token(role)))
            .body(Body::from(body))
            .unwrap()
    }

    async fn body_json(response: axum::response::Response) -> Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_health_answers_without_database() {
        let dir = tempfile::tempdir().unwrap();
        let app = create_router(test_state(dir.path()));

        let response = app
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["status"], "degraded");
        assert_eq!(body["version"], env!("CARGO_PKG_VERSION"));
    }

    #[tokio::test]
    async fn test_protected_routes_require_token() {
        let dir = tempfile::tempdir().unwrap();
        let app = create_router(test_state(dir.path()));

        let response = app
            .clone()
            .oneshot(Request::builder().uri("/api/v1/reports").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/api/v1/reports")
                    .header(header::AUTHORIZATION, "Bearer not-a-jwt")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(body_json(response).await["error"], "Invalid token");
    }

    #[tokio::test]
    async fn test_rule_update_is_admin_only() {
        let dir = tempfile::tempdir().unwrap();
        let app = create_router(test_state(dir.path()));

        let body = json!({
            "is_enabled": true,
            "min_confidence_for_auto_suggest": 0.5,
            "severity_thresholds": SeverityThresholds::default(),
        });

        for role in [Role::Worker, Role::Supervisor, Role::Csst] {
            let response = app
                .clone()
                .oneshot(json_request(Method::PUT, "/api/v1/admin/rules", Some(role), body.clone()))
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::FORBIDDEN);
        }
    }

    #[tokio::test]
    async fn test_workers_cannot_assign_actions_or_export() {
        let dir = tempfile::tempdir().unwrap();
        let app = create_router(test_state(dir.path()));

        let response = app
            .clone()
            .oneshot(json_request(
                Method::POST,
                "/api/v1/actions",
                Some(Role::Worker),
                json!({
                    "report_id": Uuid::new_v4(),
                    "assigned_to": Uuid::new_v4(),
                    "due_date": "2026-06-01",
                    "description": "Clear the aisle",
                }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/api/v1/admin/export/csv")
                    .header(header::AUTHORIZATION, format!("Bearer {}", token(Role::Supervisor)))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn test_analyze_rejects_invalid_scores_before_lookup() {
        let dir = tempfile::tempdir().unwrap();
        let app = create_router(test_state(dir.path()));

        let response = app
            .oneshot(json_request(
                Method::POST,
                "/api/v1/analyze",
                Some(Role::Worker),
                json!({ "detections": [{ "class": "chair", "score": 1.5 }] }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_login_is_rate_limited_per_client() {
        let dir = tempfile::tempdir().unwrap();
        let app = create_router(test_state(dir.path()));

        let attempt = |ip: &'static str| {
            Request::builder()
                .method(Method::POST)
                .uri("/api/v1/auth/login")
                .header(header::CONTENT_TYPE, "application/json")
                .header("X-Forwarded-For", ip)
                .body(Body::from(json!({ "email": "not-an-email", "password": "" }).to_string()))
                .unwrap()
        };

        // Malformed credentials fail validation without a database round trip
        for _ in 0..5 {
            let response = app.clone().oneshot(attempt("198.51.100.4")).await.unwrap();
            assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        }

        let response = app.clone().oneshot(attempt("198.51.100.4")).await.unwrap();
        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);

        let response = app.oneshot(attempt("198.51.100.5")).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_upload_stores_photo_and_serves_it() {
        let dir = tempfile::tempdir().unwrap();
        let app = create_router(test_state(dir.path()));

        let response = app
            .clone()
            .oneshot(multipart_request(Role::Worker, "image/png", "aisle 3.png", b"fake-png"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);

        let url = body_json(response).await["url"].as_str().unwrap().to_string();
        assert!(url.starts_with("http://localhost/uploads/report-photos/"));
        assert!(url.ends_with("-aisle_3.png"));

        let path = url.trim_start_matches("http://localhost");
        let response = app
            .oneshot(Request::builder().uri(path).body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&bytes[..], b"fake-png");
    }

    #[tokio::test]
    async fn test_upload_rejects_unsupported_and_oversized_files() {
        let dir = tempfile::tempdir().unwrap();
        let app = create_router(test_state(dir.path()));

        let response = app
            .clone()
            .oneshot(multipart_request(Role::Worker, "image/gif", "a.gif", b"gif"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        // Test config caps uploads at 1 KiB
        let response = app
            .oneshot(multipart_request(Role::Worker, "image/jpeg", "big.jpg", &[0u8; 2048]))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
    }
}
