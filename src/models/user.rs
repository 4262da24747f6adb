//! User model

use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;
use chrono::{DateTime, Utc};
use validator::Validate;

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub name: String,
    pub role: String,
    pub is_active: bool,
    pub last_login: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Role {
    Worker,
    Supervisor,
    /// Workplace safety and health committee
    Csst,
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Worker => "WORKER",
            Self::Supervisor => "SUPERVISOR",
            Self::Csst => "CSST",
            Self::Admin => "ADMIN",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "WORKER" => Some(Self::Worker),
            "SUPERVISOR" => Some(Self::Supervisor),
            "CSST" => Some(Self::Csst),
            "ADMIN" => Some(Self::Admin),
            _ => None,
        }
    }

    /// May assign and manage corrective actions
    pub fn manages_actions(&self) -> bool {
        matches!(self, Self::Supervisor | Self::Csst | Self::Admin)
    }
}

/// Roles that can be picked as an action assignee
pub const ASSIGNABLE_ROLES: [Role; 3] = [Role::Supervisor, Role::Csst, Role::Admin];

#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 1, message = "Password is required"))]
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub token: String,
    pub expires_at: i64,
    pub user: UserInfo,
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct UserInfo {
    pub id: Uuid,
    pub email: String,
    pub name: String,
    pub role: String,
}

impl User {
    pub async fn create(
        pool: &PgPool,
        email: &str,
        name: &str,
        role: Role,
        password_hash: &str,
    ) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (email, password_hash, name, role)
            VALUES ($1, $2, $3, $4)
            RETURNING *
            "#
        )
        .bind(email)
        .bind(password_hash)
        .bind(name)
        .bind(role.as_str())
        .fetch_one(pool)
        .await
    }

    pub async fn find_by_email(pool: &PgPool, email: &str) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, User>("SELECT * FROM users WHERE email = $1 AND is_active = true")
            .bind(email)
            .fetch_optional(pool)
            .await
    }

    pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = $1")
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    pub async fn update_last_login(pool: &PgPool, id: Uuid) -> Result<(), sqlx::Error> {
        sqlx::query("UPDATE users SET last_login = NOW() WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;
        Ok(())
    }

    /// Active users who can own a corrective action
    pub async fn list_assignable(pool: &PgPool) -> Result<Vec<UserInfo>, sqlx::Error> {
        let roles: Vec<&str> = ASSIGNABLE_ROLES.iter().map(Role::as_str).collect();

        sqlx::query_as::<_, UserInfo>(
            r#"
            SELECT id, email, name, role FROM users
            WHERE role = ANY($1) AND is_active = true
            ORDER BY name ASC
            "#
        )
        .bind(&roles)
        .fetch_all(pool)
        .await
    }

    pub fn role(&self) -> Option<Role> {
        Role::parse(&self.role)
    }

    pub fn to_info(&self) -> UserInfo {
        UserInfo {
            id: self.id,
            email: self.email.clone(),
            name: self.name.clone(),
            role: self.role.clone(),
        }
    }
}
