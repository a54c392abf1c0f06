//! Account repository
//!
//! Credential store operations for forum accounts.

use async_trait::async_trait;
use auth::AccountId;
use chrono::Utc;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicI64, Ordering};
use thiserror::Error;
use tokio::sync::RwLock;

use crate::models::{Account, AccountStatus, NewAccount};

/// Repository errors
#[derive(Error, Debug)]
pub enum RepositoryError {
    #[error("Account not found: {0}")]
    NotFound(AccountId),

    #[error("Username already exists")]
    DuplicateUsername,

    #[error("Email already exists")]
    DuplicateEmail,

    #[error("Database error: {0}")]
    DatabaseError(String),
}

/// Credential store for forum accounts.
///
/// Implementations must keep username and email unique across accounts.
#[async_trait]
pub trait AccountRepository: Send + Sync {
    /// Find an account by id
    async fn find_by_id(&self, id: AccountId) -> Result<Option<Account>, RepositoryError>;

    /// Find an account by exact username
    async fn find_by_username(&self, username: &str) -> Result<Option<Account>, RepositoryError>;

    /// Whether another account (not `except`) already uses `username`
    async fn username_taken(
        &self,
        username: &str,
        except: Option<AccountId>,
    ) -> Result<bool, RepositoryError>;

    /// Whether another account (not `except`) already uses `email`
    async fn email_taken(
        &self,
        email: &str,
        except: Option<AccountId>,
    ) -> Result<bool, RepositoryError>;

    /// All accounts ordered by id
    async fn list(&self) -> Result<Vec<Account>, RepositoryError>;

    /// Create a new account as Active
    async fn create(&self, account: NewAccount) -> Result<Account, RepositoryError>;

    /// Persist username, email, avatar and password hash of an existing account
    async fn update_profile(&self, account: &Account) -> Result<Account, RepositoryError>;

    /// Change the account status
    async fn set_status(
        &self,
        id: AccountId,
        status: AccountStatus,
    ) -> Result<Account, RepositoryError>;

    /// Delete an account; returns whether it existed
    async fn delete(&self, id: AccountId) -> Result<bool, RepositoryError>;
}

/// In-memory repository for testing and development
pub struct InMemoryAccountRepository {
    accounts: RwLock<BTreeMap<AccountId, Account>>,
    next_id: AtomicI64,
}

impl InMemoryAccountRepository {
    pub fn new() -> Self {
        Self {
            accounts: RwLock::new(BTreeMap::new()),
            next_id: AtomicI64::new(1),
        }
    }
}

impl Default for InMemoryAccountRepository {
    fn default() -> Self {
        Self::new()
    }
}

fn conflict(
    accounts: &BTreeMap<AccountId, Account>,
    username: &str,
    email: &str,
    except: Option<AccountId>,
) -> Option<RepositoryError> {
    let others = accounts.values().filter(|a| Some(a.id) != except);
    for other in others {
        if other.username == username {
            return Some(RepositoryError::DuplicateUsername);
        }
        if other.email == email {
            return Some(RepositoryError::DuplicateEmail);
        }
    }
    None
}

#[async_trait]
impl AccountRepository for InMemoryAccountRepository {
    async fn find_by_id(&self, id: AccountId) -> Result<Option<Account>, RepositoryError> {
        Ok(self.accounts.read().await.get(&id).cloned())
    }

    async fn find_by_username(&self, username: &str) -> Result<Option<Account>, RepositoryError> {
        let accounts = self.accounts.read().await;
        Ok(accounts.values().find(|a| a.username == username).cloned())
    }

    async fn username_taken(
        &self,
        username: &str,
        except: Option<AccountId>,
    ) -> Result<bool, RepositoryError> {
        let accounts = self.accounts.read().await;
        Ok(accounts
            .values()
            .any(|a| a.username == username && Some(a.id) != except))
    }

    async fn email_taken(
        &self,
        email: &str,
        except: Option<AccountId>,
    ) -> Result<bool, RepositoryError> {
        let accounts = self.accounts.read().await;
        Ok(accounts
            .values()
            .any(|a| a.email == email && Some(a.id) != except))
    }

    async fn list(&self) -> Result<Vec<Account>, RepositoryError> {
        Ok(self.accounts.read().await.values().cloned().collect())
    }

    async fn create(&self, account: NewAccount) -> Result<Account, RepositoryError> {
        let mut accounts = self.accounts.write().await;
        if let Some(err) = conflict(&accounts, &account.username, &account.email, None) {
            return Err(err);
        }

        let created = Account {
            id: AccountId(self.next_id.fetch_add(1, Ordering::SeqCst)),
            username: account.username,
            email: account.email,
            password_hash: account.password_hash,
            avatar_url: None,
            role: account.role,
            status: AccountStatus::Active,
            created_at: Utc::now(),
        };
        accounts.insert(created.id, created.clone());
        Ok(created)
    }

    async fn update_profile(&self, account: &Account) -> Result<Account, RepositoryError> {
        let mut accounts = self.accounts.write().await;
        if let Some(err) = conflict(&accounts, &account.username, &account.email, Some(account.id)) {
            return Err(err);
        }

        let existing = accounts
            .get_mut(&account.id)
            .ok_or(RepositoryError::NotFound(account.id))?;
        existing.username = account.username.clone();
        existing.email = account.email.clone();
        existing.avatar_url = account.avatar_url.clone();
        existing.password_hash = account.password_hash.clone();
        Ok(existing.clone())
    }

    async fn set_status(
        &self,
        id: AccountId,
        status: AccountStatus,
    ) -> Result<Account, RepositoryError> {
        let mut accounts = self.accounts.write().await;
        let existing = accounts.get_mut(&id).ok_or(RepositoryError::NotFound(id))?;
        existing.status = status;
        Ok(existing.clone())
    }

    async fn delete(&self, id: AccountId) -> Result<bool, RepositoryError> {
        Ok(self.accounts.write().await.remove(&id).is_some())
    }
}
