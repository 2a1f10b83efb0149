use sqlx::{FromRow, PgPool};
use tracing::debug;
use uuid::Uuid;

use crate::core::error::{AppError, Result};
use crate::features::auth::model::{ApiKeyPermission, AuthenticatedUser};

#[derive(Debug, FromRow)]
struct KeyOwnerRow {
    user_id: Uuid,
    user_name: String,
    user_email: String,
    user_role: String,
    permission: String,
}

/// Credential store: maps presented API keys to their owning user.
///
/// Keys are issued out of band and read-only here; lookup is a single
/// exact-match point query.
pub struct ApiKeyService {
    pool: PgPool,
}

impl ApiKeyService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Resolve a presented key to its owning user, or Unauthorized.
    pub async fn resolve(&self, key: &str) -> Result<AuthenticatedUser> {
        let row = sqlx::query_as::<_, KeyOwnerRow>(
            r#"
            SELECT u.id AS user_id,
                   u.name AS user_name,
                   u.email AS user_email,
                   u.role AS user_role,
                   k.permission
            FROM api_keys k
            JOIN users u ON u.id = k.user_id
            WHERE k.key = $1
            "#,
        )
        .bind(key)
        .fetch_optional(&self.pool)
        .await?;

        let row = row.ok_or_else(|| AppError::Unauthorized("Invalid API key".to_string()))?;

        // The column is CHECK-constrained, so a parse failure means the
        // schema and this enum have drifted apart.
        let permission = row.permission.parse::<ApiKeyPermission>().map_err(|_| {
            AppError::Internal(format!("Unknown permission level: {}", row.permission))
        })?;

        debug!("API key resolved: user_id={}", row.user_id);

        Ok(AuthenticatedUser {
            id: row.user_id,
            name: row.user_name,
            email: row.user_email,
            role: row.user_role,
            permission,
        })
    }
}
