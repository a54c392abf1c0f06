//! Schema bootstrap for the account tables.

use error::DatabaseError;

use crate::pool::DbPool;

const CREATE_ROLES: &str = "CREATE TABLE IF NOT EXISTS roles (
    role_id INT PRIMARY KEY,
    role_name VARCHAR(32) NOT NULL UNIQUE
)";

const CREATE_USERS: &str = "CREATE TABLE IF NOT EXISTS users (
    user_id BIGINT AUTO_INCREMENT PRIMARY KEY,
    username VARCHAR(64) CHARACTER SET utf8mb4 COLLATE utf8mb4_bin NOT NULL,
    email VARCHAR(255) CHARACTER SET utf8mb4 COLLATE utf8mb4_bin NOT NULL,
    password_hash VARCHAR(255) NOT NULL,
    avatar_url VARCHAR(512) NULL,
    status VARCHAR(16) NOT NULL DEFAULT 'Active',
    created_at DATETIME(6) NOT NULL,
    role_id INT NOT NULL,
    UNIQUE KEY ux_users_username (username),
    UNIQUE KEY ux_users_email (email),
    CONSTRAINT fk_users_role FOREIGN KEY (role_id) REFERENCES roles (role_id)
)";

/// Seeded roles: (id, name). Ids are what `users.role_id` stores.
pub const SEED_ROLES: [(i32, &str); 3] = [(1, "Admin"), (2, "Moderator"), (3, "Member")];

/// Create the `roles` and `users` tables if missing and seed the roles.
pub async fn ensure_schema(pool: &DbPool) -> Result<(), DatabaseError> {
    for statement in [CREATE_ROLES, CREATE_USERS] {
        sqlx::query(statement).execute(pool).await.map_err(|e| {
            tracing::error!("Schema bootstrap failed: {}", e);
            DatabaseError::QueryFailed(e.to_string())
        })?;
    }

    for (id, name) in SEED_ROLES {
        sqlx::query("INSERT IGNORE INTO roles (role_id, role_name) VALUES (?, ?)")
            .bind(id)
            .bind(name)
            .execute(pool)
            .await
            .map_err(|e| DatabaseError::QueryFailed(e.to_string()))?;
    }

    tracing::info!("Account schema is ready");
    Ok(())
}
