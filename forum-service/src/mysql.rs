//! MySQL-backed account repository.

use async_trait::async_trait;
use auth::{AccountId, Role};
use chrono::{NaiveDateTime, Utc};
use db::sqlx::mysql::MySqlRow;
use db::{sqlx, DbPool, Row};

use crate::models::{Account, AccountStatus, NewAccount};
use crate::repository::{AccountRepository, RepositoryError};

const SELECT_ACCOUNT: &str = "SELECT user_id, username, email, password_hash, avatar_url, \
     status, created_at, role_id FROM users";

pub struct MySqlAccountRepository {
    pool: DbPool,
}

impl MySqlAccountRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn account_from_row(row: &MySqlRow) -> Result<Account, RepositoryError> {
    let role_id: i32 = row.try_get("role_id").map_err(query_error)?;
    let role = Role::from_id(role_id).ok_or_else(|| {
        RepositoryError::DatabaseError(format!("unknown role id {role_id}"))
    })?;
    let status: String = row.try_get("status").map_err(query_error)?;
    let created_at: NaiveDateTime = row.try_get("created_at").map_err(query_error)?;

    Ok(Account {
        id: AccountId(row.try_get("user_id").map_err(query_error)?),
        username: row.try_get("username").map_err(query_error)?,
        email: row.try_get("email").map_err(query_error)?,
        password_hash: row.try_get("password_hash").map_err(query_error)?,
        avatar_url: row.try_get("avatar_url").map_err(query_error)?,
        role,
        status: status.parse().map_err(RepositoryError::DatabaseError)?,
        created_at: created_at.and_utc(),
    })
}

fn query_error(e: sqlx::Error) -> RepositoryError {
    tracing::error!("Account query failed: {}", e);
    RepositoryError::DatabaseError(e.to_string())
}

/// Classify a unique-key violation by the index named in the message.
fn duplicate_from_message(message: &str) -> Option<RepositoryError> {
    if message.contains("ux_users_username") {
        Some(RepositoryError::DuplicateUsername)
    } else if message.contains("ux_users_email") {
        Some(RepositoryError::DuplicateEmail)
    } else {
        None
    }
}

fn write_error(e: sqlx::Error) -> RepositoryError {
    if let Some(db_err) = e.as_database_error() {
        if db_err.is_unique_violation() {
            if let Some(err) = duplicate_from_message(db_err.message()) {
                return err;
            }
        }
    }
    query_error(e)
}

#[async_trait]
impl AccountRepository for MySqlAccountRepository {
    async fn find_by_id(&self, id: AccountId) -> Result<Option<Account>, RepositoryError> {
        let row = sqlx::query(&format!("{SELECT_ACCOUNT} WHERE user_id = ?"))
            .bind(id.as_i64())
            .fetch_optional(&self.pool)
            .await
            .map_err(query_error)?;
        row.as_ref().map(account_from_row).transpose()
    }

    async fn find_by_username(&self, username: &str) -> Result<Option<Account>, RepositoryError> {
        let row = sqlx::query(&format!("{SELECT_ACCOUNT} WHERE username = ?"))
            .bind(username)
            .fetch_optional(&self.pool)
            .await
            .map_err(query_error)?;
        row.as_ref().map(account_from_row).transpose()
    }

    async fn username_taken(
        &self,
        username: &str,
        except: Option<AccountId>,
    ) -> Result<bool, RepositoryError> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM users WHERE username = ? AND (? IS NULL OR user_id <> ?)",
        )
        .bind(username)
        .bind(except.map(AccountId::as_i64))
        .bind(except.map(AccountId::as_i64))
        .fetch_one(&self.pool)
        .await
        .map_err(query_error)?;
        Ok(count > 0)
    }

    async fn email_taken(
        &self,
        email: &str,
        except: Option<AccountId>,
    ) -> Result<bool, RepositoryError> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM users WHERE email = ? AND (? IS NULL OR user_id <> ?)",
        )
        .bind(email)
        .bind(except.map(AccountId::as_i64))
        .bind(except.map(AccountId::as_i64))
        .fetch_one(&self.pool)
        .await
        .map_err(query_error)?;
        Ok(count > 0)
    }

    async fn list(&self) -> Result<Vec<Account>, RepositoryError> {
        let rows = sqlx::query(&format!("{SELECT_ACCOUNT} ORDER BY user_id"))
            .fetch_all(&self.pool)
            .await
            .map_err(query_error)?;
        rows.iter().map(account_from_row).collect()
    }

    async fn create(&self, account: NewAccount) -> Result<Account, RepositoryError> {
        let created_at = Utc::now();
        let result = sqlx::query(
            "INSERT INTO users (username, email, password_hash, status, created_at, role_id) \
             VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(&account.username)
        .bind(&account.email)
        .bind(&account.password_hash)
        .bind(AccountStatus::Active.as_str())
        .bind(created_at.naive_utc())
        .bind(account.role.id())
        .execute(&self.pool)
        .await
        .map_err(write_error)?;

        let id = AccountId(result.last_insert_id() as i64);
        tracing::info!("Created account {} ({})", id, account.username);

        Ok(Account {
            id,
            username: account.username,
            email: account.email,
            password_hash: account.password_hash,
            avatar_url: None,
            role: account.role,
            status: AccountStatus::Active,
            created_at,
        })
    }

    async fn update_profile(&self, account: &Account) -> Result<Account, RepositoryError> {
        sqlx::query(
            "UPDATE users SET username = ?, email = ?, avatar_url = ?, password_hash = ? \
             WHERE user_id = ?",
        )
        .bind(&account.username)
        .bind(&account.email)
        .bind(&account.avatar_url)
        .bind(&account.password_hash)
        .bind(account.id.as_i64())
        .execute(&self.pool)
        .await
        .map_err(write_error)?;

        // rows_affected is 0 for a no-op update too, so re-read instead.
        self.find_by_id(account.id)
            .await?
            .ok_or(RepositoryError::NotFound(account.id))
    }

    async fn set_status(
        &self,
        id: AccountId,
        status: AccountStatus,
    ) -> Result<Account, RepositoryError> {
        sqlx::query("UPDATE users SET status = ? WHERE user_id = ?")
            .bind(status.as_str())
            .bind(id.as_i64())
            .execute(&self.pool)
            .await
            .map_err(query_error)?;

        self.find_by_id(id).await?.ok_or(RepositoryError::NotFound(id))
    }

    async fn delete(&self, id: AccountId) -> Result<bool, RepositoryError> {
        let result = sqlx::query("DELETE FROM users WHERE user_id = ?")
            .bind(id.as_i64())
            .execute(&self.pool)
            .await
            .map_err(query_error)?;
        Ok(result.rows_affected() > 0)
    }
}
