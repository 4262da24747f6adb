//! Database module - PostgreSQL connection, migrations and bootstrap data

use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::SaltString;
use argon2::{Argon2, PasswordHasher};
use sqlx::{postgres::PgPoolOptions, PgPool};

use crate::config::Config;
use crate::models::{Role, RuleConfig, User};
use crate::rules::SeverityThresholds;

/// Create database connection pool
pub async fn create_pool(database_url: &str) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .connect(database_url)
        .await
}

/// Run database migrations
pub async fn run_migrations(pool: &PgPool) -> Result<(), sqlx::Error> {
    // Multiple statements: goes through the simple query protocol
    sqlx::raw_sql(SCHEMA_SQL)
        .execute(pool)
        .await?;

    tracing::info!("Database schema applied successfully");
    Ok(())
}

/// Seed catalogues, the default rule config and the bootstrap admin
pub async fn seed_defaults(pool: &PgPool, config: &Config) -> anyhow::Result<()> {
    for (code, name, description, recommendations) in RISK_TYPES {
        sqlx::query(
            r#"
            INSERT INTO risk_types (code, name, description, recommendations)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (code) DO NOTHING
            "#
        )
        .bind(code)
        .bind(name)
        .bind(description)
        .bind(serde_json::json!(recommendations))
        .execute(pool)
        .await?;
    }

    for name in AREAS {
        sqlx::query("INSERT INTO areas (name) VALUES ($1) ON CONFLICT (name) DO NOTHING")
            .bind(name)
            .execute(pool)
            .await?;
    }

    if RuleConfig::current(pool).await?.is_none() {
        let thresholds = serde_json::to_value(SeverityThresholds::default())?;
        RuleConfig::upsert(pool, true, 0.5, &thresholds, None).await?;
        tracing::info!("Default rule config created");
    }

    if let (Some(email), Some(password)) = (&config.admin_email, &config.admin_password) {
        if User::find_by_email(pool, email).await?.is_none() {
            let salt = SaltString::generate(&mut OsRng);
            let password_hash = Argon2::default()
                .hash_password(password.as_bytes(), &salt)
                .map_err(|e| anyhow::anyhow!("hashing admin password: {}", e))?
                .to_string();

            User::create(pool, email, "Administrator", Role::Admin, &password_hash).await?;
            tracing::info!("Bootstrap admin created: {}", email);
        }
    }

    Ok(())
}

const RISK_TYPES: [(&str, &str, &str, [&str; 4]); 2] = [
    (
        "RISK_OBSTRUCTION",
        "Obstruction / Trip hazard",
        "Objects blocking aisles, emergency exits or transit zones, creating a trip or fall risk.",
        [
            "Remove objects from the transit area immediately",
            "Mark off the zone temporarily",
            "Verify that emergency exits are clear",
            "Train staff on keeping aisles clear",
        ],
    ),
    (
        "RISK_HOUSEKEEPING",
        "Poor housekeeping",
        "A large quantity or variety of scattered objects, indicating a lack of order and cleanliness.",
        [
            "Introduce a 5S programme in the area",
            "Assign per-shift owners for order and cleanliness",
            "Provide suitable shelving and containers",
            "Run periodic housekeeping inspections",
        ],
    ),
];

const AREAS: [&str; 6] = [
    "Central Warehouse",
    "Production Plant",
    "Administrative Offices",
    "Loading Zone",
    "Maintenance Workshop",
    "Canteen",
];

/// Database schema SQL
const SCHEMA_SQL: &str = r#"
-- Users
CREATE TABLE IF NOT EXISTS users (
    id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
    email VARCHAR(255) NOT NULL UNIQUE,
    password_hash VARCHAR(255) NOT NULL,
    name VARCHAR(255) NOT NULL,
    role VARCHAR(20) NOT NULL DEFAULT 'WORKER',
    is_active BOOLEAN NOT NULL DEFAULT true,
    last_login TIMESTAMPTZ,
    created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
    updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
);

-- Areas
CREATE TABLE IF NOT EXISTS areas (
    id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
    name VARCHAR(255) NOT NULL UNIQUE,
    created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
);

-- Risk type catalogue
CREATE TABLE IF NOT EXISTS risk_types (
    id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
    code VARCHAR(50) NOT NULL UNIQUE,
    name VARCHAR(255) NOT NULL,
    description TEXT,
    recommendations JSONB NOT NULL DEFAULT '[]'::jsonb,
    is_active BOOLEAN NOT NULL DEFAULT true,
    created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
);

-- Hazard reports
CREATE TABLE IF NOT EXISTS reports (
    id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
    created_by UUID NOT NULL REFERENCES users(id),
    area_id UUID NOT NULL REFERENCES areas(id),
    description VARCHAR(500) NOT NULL,
    photo_url TEXT NOT NULL,
    is_anonymous BOOLEAN NOT NULL DEFAULT false,
    risk_type_id_final UUID REFERENCES risk_types(id),
    severity_final VARCHAR(10) NOT NULL,
    ai_suggested_risk_type_id UUID REFERENCES risk_types(id),
    ai_suggested_severity VARCHAR(10),
    ai_detections JSONB,
    ai_explanation TEXT,
    ai_confidence_score DOUBLE PRECISION,
    first_touched_at TIMESTAMPTZ,
    first_touched_by UUID REFERENCES users(id),
    created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
    updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
);

-- Corrective actions
CREATE TABLE IF NOT EXISTS actions (
    id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
    report_id UUID NOT NULL REFERENCES reports(id) ON DELETE CASCADE,
    assigned_to UUID NOT NULL REFERENCES users(id),
    assigned_by UUID NOT NULL REFERENCES users(id),
    due_date TIMESTAMPTZ NOT NULL,
    description VARCHAR(500) NOT NULL,
    status VARCHAR(20) NOT NULL DEFAULT 'OPEN',
    close_comment VARCHAR(500),
    close_photo_url TEXT,
    closed_at TIMESTAMPTZ,
    created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
    updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
);

-- Classification rule configuration (single row)
CREATE TABLE IF NOT EXISTS rule_config (
    id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
    is_enabled BOOLEAN NOT NULL DEFAULT true,
    min_confidence_for_auto_suggest DOUBLE PRECISION NOT NULL DEFAULT 0.5,
    severity_thresholds JSONB NOT NULL,
    updated_by UUID REFERENCES users(id),
    updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
);

-- Audit Log
CREATE TABLE IF NOT EXISTS audit_log (
    id BIGSERIAL PRIMARY KEY,
    entity_type VARCHAR(50) NOT NULL,
    entity_id VARCHAR(100) NOT NULL,
    action VARCHAR(50) NOT NULL,
    actor_id UUID REFERENCES users(id),
    payload JSONB,
    created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
);

-- Indexes
CREATE INDEX IF NOT EXISTS idx_reports_created ON reports(created_at);
CREATE INDEX IF NOT EXISTS idx_reports_area ON reports(area_id);
CREATE INDEX IF NOT EXISTS idx_reports_creator ON reports(created_by);
CREATE INDEX IF NOT EXISTS idx_reports_severity ON reports(severity_final);
CREATE INDEX IF NOT EXISTS idx_actions_report ON actions(report_id);
CREATE INDEX IF NOT EXISTS idx_actions_assignee ON actions(assigned_to);
CREATE INDEX IF NOT EXISTS idx_actions_status_due ON actions(status, due_date);
CREATE INDEX IF NOT EXISTS idx_audit_entity ON audit_log(entity_type, created_at);
"#;
