use crate::crypto::password::{burn_verification, hash_password, verify_password};
use crate::error::{AppError, AppResult};
use async_trait::async_trait;
use serde::Serialize;
use sqlx::{PgPool, Row};
use utoipa::ToSchema;

#[derive(Serialize, Debug, Clone, PartialEq, ToSchema)]
pub struct AuthenticatedUser {
    pub id: i64,
    pub username: String,
    pub full_name: String,
    pub email: Option<String>,
    pub role: String,
    pub is_break_glass: bool,
}

/// Checks a username/password pair and returns the profile it belongs to.
#[async_trait]
pub trait CredentialVerifier: Send + Sync {
    async fn verify(&self, username: &str, password: &str) -> AppResult<AuthenticatedUser>;
}

/// Verifies against the `users` table. Break-glass accounts go through the same path.
pub struct PgCredentialVerifier {
    pool: PgPool,
}

impl PgCredentialVerifier {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CredentialVerifier for PgCredentialVerifier {
    async fn verify(&self, username: &str, password: &str) -> AppResult<AuthenticatedUser> {
        let row = sqlx::query(
            "SELECT id, username, full_name, email, role, is_break_glass, password_hash \
             FROM users WHERE username = $1 AND active",
        )
        .bind(username.trim())
        .fetch_optional(&self.pool)
        .await?;

        let Some(row) = row else {
            run_blocking_check(password.to_string(), None).await?;
            tracing::info!(username = username.trim(), "login rejected: unknown or inactive user");
            return Err(AppError::Unauthorized);
        };

        let stored: String = row.try_get("password_hash")?;
        if !run_blocking_check(password.to_string(), Some(stored)).await? {
            tracing::info!(username = username.trim(), "login rejected: bad password");
            return Err(AppError::Unauthorized);
        }

        let user = AuthenticatedUser {
            id: row.try_get("id")?,
            username: row.try_get("username")?,
            full_name: row.try_get("full_name")?,
            email: row.try_get("email")?,
            role: row.try_get("role")?,
            is_break_glass: row.try_get("is_break_glass")?,
        };
        if user.is_break_glass {
            tracing::warn!(username = %user.username, "break-glass account used");
        }
        Ok(user)
    }
}

/// Argon2 is CPU-bound; keep it off the async workers. Without a stored hash the check
/// runs against a dummy so unknown usernames take as long as wrong passwords.
async fn run_blocking_check(password: String, stored: Option<String>) -> AppResult<bool> {
    tokio::task::spawn_blocking(move || match stored {
        Some(stored) => verify_password(&password, &stored),
        None => {
            burn_verification(&password);
            false
        }
    })
    .await
    .map_err(|e| AppError::Internal(format!("password check task failed: {}", e)))
}

/// Creates the break-glass account, or resets its password and re-activates it.
pub async fn seed_break_glass(pool: &PgPool, username: &str, password: &str) -> AppResult<i64> {
    let hashed = hash_password(password)
        .map_err(|e| AppError::Internal(format!("hash break-glass password: {}", e)))?;
    let id: i64 = sqlx::query_scalar(
        "INSERT INTO users (username, full_name, role, active, password_hash, is_break_glass) \
         VALUES ($1, 'Break-glass administrator', 'admin', TRUE, $2, TRUE) \
         ON CONFLICT (username) DO UPDATE \
         SET password_hash = EXCLUDED.password_hash, active = TRUE, is_break_glass = TRUE \
         RETURNING id",
    )
    .bind(username)
    .bind(hashed)
    .fetch_one(pool)
    .await?;
    Ok(id)
}
