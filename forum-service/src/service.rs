//! Account service
//!
//! Registration, login and the account lifecycle, composed over the password
//! hasher, token issuer/verifier and access policy from the `auth` crate.

use auth::{
    AccountId, Action, Claims, Decision, JwtConfig, PasswordHasher, ResourceKind, Role,
    TokenIssuer, TokenVerifier,
};
use error::{AppError, AuthError, DatabaseError, Result};

use crate::models::{Account, AccountStatus, AccountSummary, AuthSession, NewAccount, ProfileUpdate};
use crate::repository::{AccountRepository, InMemoryAccountRepository, RepositoryError};

impl From<RepositoryError> for AppError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::NotFound(id) => AppError::NotFound(format!("Account {id}")),
            RepositoryError::DuplicateUsername => AppError::DuplicateUsername,
            RepositoryError::DuplicateEmail => AppError::DuplicateEmail,
            RepositoryError::DatabaseError(msg) => {
                AppError::Database(DatabaseError::QueryFailed(msg))
            }
        }
    }
}

/// Account service for authentication and account administration
pub struct AccountService<R = InMemoryAccountRepository> {
    repository: R,
    hasher: PasswordHasher,
    issuer: TokenIssuer,
    verifier: TokenVerifier,
}

impl AccountService<InMemoryAccountRepository> {
    /// Create a service backed by an in-memory repository
    pub fn in_memory(jwt: &JwtConfig, hasher: PasswordHasher) -> Result<Self> {
        Self::new(InMemoryAccountRepository::new(), jwt, hasher)
    }
}

impl<R: AccountRepository> AccountService<R> {
    /// Fails with [`AppError::Configuration`] if the JWT settings are incomplete.
    pub fn new(repository: R, jwt: &JwtConfig, hasher: PasswordHasher) -> Result<Self> {
        Ok(Self {
            repository,
            hasher,
            issuer: TokenIssuer::new(jwt)?,
            verifier: TokenVerifier::new(jwt)?,
        })
    }

    async fn hash_password(&self, password: &str) -> Result<String> {
        let hasher = self.hasher;
        let password = password.to_owned();
        tokio::task::spawn_blocking(move || hasher.hash(&password))
            .await
            .map_err(|e| AppError::Internal(format!("hashing task failed: {e}")))?
    }

    async fn verify_password(&self, password: &str, stored_hash: &str) -> Result<bool> {
        let hasher = self.hasher;
        let password = password.to_owned();
        let stored_hash = stored_hash.to_owned();
        tokio::task::spawn_blocking(move || hasher.verify(&password, &stored_hash))
            .await
            .map_err(|e| AppError::Internal(format!("verification task failed: {e}")))
    }

    fn session(&self, account: &Account) -> Result<AuthSession> {
        Ok(AuthSession {
            user: account.summary(),
            token: self.issuer.issue(account)?,
        })
    }

    async fn load(&self, id: AccountId) -> Result<Account> {
        self.repository
            .find_by_id(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Account {id}")))
    }

    /// Register a new Member account and sign it in
    pub async fn register(&self, username: &str, email: &str, password: &str) -> Result<AuthSession> {
        AppError::require("username", username)?;
        AppError::require("email", email)?;
        AppError::require("password", password)?;

        if self.repository.username_taken(username, None).await? {
            return Err(AppError::DuplicateUsername);
        }
        if self.repository.email_taken(email, None).await? {
            return Err(AppError::DuplicateEmail);
        }

        let password_hash = self.hash_password(password).await?;
        let account = self
            .repository
            .create(NewAccount {
                username: username.to_string(),
                email: email.to_string(),
                password_hash,
                role: Role::Member,
            })
            .await?;

        tracing::info!("Registered account {} ({})", account.id, account.username);
        self.session(&account)
    }

    /// Exchange credentials for a token
    pub async fn login(&self, username: &str, password: &str) -> Result<AuthSession> {
        AppError::require("username", username)?;
        AppError::require("password", password)?;

        let account = self
            .repository
            .find_by_username(username)
            .await?
            .ok_or_else(|| {
                tracing::warn!("Login attempt for unknown username");
                AppError::NotFound("Account".into())
            })?;

        if !self.verify_password(password, &account.password_hash).await? {
            tracing::warn!("Failed login for account {}", account.id);
            return Err(AuthError::BadPassword.into());
        }

        if account.is_banned() {
            tracing::warn!("Banned account {} attempted to log in", account.id);
            return Err(AuthError::Banned.into());
        }

        tracing::info!("Account {} logged in", account.id);
        self.session(&account)
    }

    /// Verify a bearer token
    pub fn authenticate(&self, token: &str) -> std::result::Result<Claims, AuthError> {
        self.verifier.verify(token)
    }

    /// Access decision for a resource owned by `owner`
    pub fn authorize(
        &self,
        claims: &Claims,
        owner: Option<AccountId>,
        kind: ResourceKind,
        action: Action,
    ) -> Decision {
        auth::authorize(claims, owner, kind, action)
    }

    /// The caller's own account
    pub async fn current_account(&self, claims: &Claims) -> Result<AccountSummary> {
        Ok(self.load(claims.sub).await?.summary())
    }

    pub async fn get_account(&self, id: AccountId) -> Result<AccountSummary> {
        Ok(self.load(id).await?.summary())
    }

    pub async fn list_accounts(&self) -> Result<Vec<AccountSummary>> {
        let accounts = self.repository.list().await?;
        Ok(accounts.iter().map(Account::summary).collect())
    }

    /// Update the caller's own profile. Admins get no override here.
    pub async fn update_profile(
        &self,
        claims: &Claims,
        id: AccountId,
        update: ProfileUpdate,
    ) -> Result<AccountSummary> {
        AppError::require("username", &update.username)?;
        AppError::require("email", &update.email)?;

        let mut account = self.load(id).await?;
        self.authorize(claims, Some(account.id), ResourceKind::Profile, Action::Update)
            .into_result()?;

        if self.repository.username_taken(&update.username, Some(id)).await? {
            return Err(AppError::DuplicateUsername);
        }
        if self.repository.email_taken(&update.email, Some(id)).await? {
            return Err(AppError::DuplicateEmail);
        }

        account.username = update.username;
        account.email = update.email;
        if let Some(avatar_url) = update.avatar_url {
            account.avatar_url = Some(avatar_url);
        }
        if let Some(password) = update.password.filter(|p| !p.is_empty()) {
            account.password_hash = self.hash_password(&password).await?;
        }

        let updated = self.repository.update_profile(&account).await?;
        tracing::info!("Account {} updated its profile", updated.id);
        Ok(updated.summary())
    }

    /// Ban an account (Admin only, never oneself)
    pub async fn ban(&self, claims: &Claims, id: AccountId) -> Result<AccountSummary> {
        self.authorize(claims, Some(id), ResourceKind::Account, Action::Administer)
            .into_result()?;

        if claims.sub == id {
            return Err(AppError::validation("id", "You cannot ban yourself"));
        }

        let account = self.load(id).await?;
        if account.is_banned() {
            return Err(AppError::validation("id", "Account is already banned"));
        }

        let banned = self.repository.set_status(id, AccountStatus::Banned).await?;
        // Tokens already issued to this account stay valid until they expire.
        tracing::info!("Account {} banned by {}", id, claims.sub);
        Ok(banned.summary())
    }

    /// Lift a ban (Admin only)
    pub async fn unban(&self, claims: &Claims, id: AccountId) -> Result<AccountSummary> {
        self.authorize(claims, Some(id), ResourceKind::Account, Action::Administer)
            .into_result()?;

        let account = self.load(id).await?;
        if !account.is_banned() {
            return Err(AppError::validation("id", "Account is not banned"));
        }

        let active = self.repository.set_status(id, AccountStatus::Active).await?;
        tracing::info!("Account {} unbanned by {}", id, claims.sub);
        Ok(active.summary())
    }

    /// Delete an account (Admin only). Deleting a missing account succeeds.
    pub async fn delete_account(&self, claims: &Claims, id: AccountId) -> Result<()> {
        self.authorize(claims, Some(id), ResourceKind::Account, Action::Delete)
            .into_result()?;

        if self.repository.delete(id).await? {
            tracing::info!("Account {} deleted by {}", id, claims.sub);
        } else {
            tracing::debug!("Delete of missing account {} ignored", id);
        }
        Ok(())
    }

    /// Create an Admin account unless the username already exists.
    pub async fn bootstrap_admin(&self, username: &str, email: &str, password: &str) -> Result<AccountSummary> {
        AppError::require("username", username)?;
        AppError::require("email", email)?;
        AppError::require("password", password)?;

        if let Some(existing) = self.repository.find_by_username(username).await? {
            return Ok(existing.summary());
        }

        let password_hash = self.hash_password(password).await?;
        let admin = self
            .repository
            .create(NewAccount {
                username: username.to_string(),
                email: email.to_string(),
                password_hash,
                role: Role::Admin,
            })
            .await?;

        tracing::info!("Bootstrapped admin account {} ({})", admin.id, admin.username);
        Ok(admin.summary())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn service() -> AccountService {
        let jwt = JwtConfig::new("test-secret-key", "forum-api", "forum-clients");
        AccountService::in_memory(&jwt, PasswordHasher::new(4).unwrap()).unwrap()
    }

    async fn admin_claims(service: &AccountService) -> Claims {
        service.bootstrap_admin("root", "root@x.com", "rootpw").await.unwrap();
        let session = service.login("root", "rootpw").await.unwrap();
        service.authenticate(&session.token).unwrap()
    }

    #[tokio::test]
    async fn test_register_issues_member_token() {
        let service = service();

        let session = service.register("alice", "a@x.com", "pw123").await.unwrap();
        assert_eq!(session.user.username, "alice");
        assert_eq!(session.user.role_name, Role::Member);
        assert_eq!(session.user.status, AccountStatus::Active);

        let claims = service.authenticate(&session.token).unwrap();
        assert_eq!(claims.sub, session.user.user_id);
        assert_eq!(claims.role, Role::Member);
        assert_eq!(claims.name, "alice");
    }

    #[tokio::test]
    async fn test_register_validation_and_duplicates() {
        let service = service();
        service.register("alice", "a@x.com", "pw123").await.unwrap();

        assert!(matches!(
            service.register("", "b@x.com", "pw").await,
            Err(AppError::Validation { ref field, .. }) if field == "username"
        ));
        assert!(matches!(
            service.register("bob", "b@x.com", " ").await,
            Err(AppError::Validation { ref field, .. }) if field == "password"
        ));
        assert!(matches!(
            service.register("alice", "other@x.com", "pw").await,
            Err(AppError::DuplicateUsername)
        ));
        assert!(matches!(
            service.register("bob", "a@x.com", "pw").await,
            Err(AppError::DuplicateEmail)
        ));
    }

    #[tokio::test]
    async fn test_login_failures() {
        let service = service();
        service.register("alice", "a@x.com", "pw123").await.unwrap();

        assert!(matches!(
            service.login("nobody", "pw123").await,
            Err(AppError::NotFound(_))
        ));
        assert!(matches!(
            service.login("alice", "wrong").await,
            Err(AppError::Auth(AuthError::BadPassword))
        ));
        assert!(service.login("alice", "pw123").await.is_ok());
    }

    #[tokio::test]
    async fn test_ban_rules() {
        let service = service();
        let admin = admin_claims(&service).await;
        let alice = service.register("alice", "a@x.com", "pw123").await.unwrap();
        let alice_claims = service.authenticate(&alice.token).unwrap();
        let alice_id = alice.user.user_id;

        assert!(matches!(
            service.ban(&alice_claims, admin.sub).await,
            Err(AppError::Auth(AuthError::Forbidden))
        ));
        assert!(matches!(
            service.ban(&admin, admin.sub).await,
            Err(AppError::Validation { .. })
        ));
        assert!(matches!(
            service.unban(&admin, alice_id).await,
            Err(AppError::Validation { .. })
        ));
        assert!(matches!(
            service.ban(&admin, AccountId(999)).await,
            Err(AppError::NotFound(_))
        ));

        let banned = service.ban(&admin, alice_id).await.unwrap();
        assert_eq!(banned.status, AccountStatus::Banned);
        assert!(matches!(
            service.ban(&admin, alice_id).await,
            Err(AppError::Validation { .. })
        ));

        // Correct password still refused while banned.
        assert!(matches!(
            service.login("alice", "pw123").await,
            Err(AppError::Auth(AuthError::Banned))
        ));
        // Wrong password reports the password failure, not the ban.
        assert!(matches!(
            service.login("alice", "nope").await,
            Err(AppError::Auth(AuthError::BadPassword))
        ));
        // No revocation: the earlier token still authenticates.
        assert!(service.authenticate(&alice.token).is_ok());
    }

    #[tokio::test]
    async fn test_update_profile_is_owner_only() {
        let service = service();
        let admin = admin_claims(&service).await;
        let alice = service.register("alice", "a@x.com", "pw123").await.unwrap();
        let alice_claims = service.authenticate(&alice.token).unwrap();
        service.register("bob", "b@x.com", "pw").await.unwrap();

        let update = ProfileUpdate {
            username: "alice2".into(),
            email: "a2@x.com".into(),
            avatar_url: Some("https://x.com/a.png".into()),
            password: Some("newpw".into()),
        };

        assert!(matches!(
            service.update_profile(&admin, alice.user.user_id, update.clone()).await,
            Err(AppError::Auth(AuthError::Forbidden))
        ));

        let taken = ProfileUpdate {
            username: "bob".into(),
            ..update.clone()
        };
        assert!(matches!(
            service.update_profile(&alice_claims, alice.user.user_id, taken).await,
            Err(AppError::DuplicateUsername)
        ));

        let updated = service
            .update_profile(&alice_claims, alice.user.user_id, update)
            .await
            .unwrap();
        assert_eq!(updated.username, "alice2");
        assert_eq!(updated.avatar_url.as_deref(), Some("https://x.com/a.png"));

        assert!(service.login("alice2", "newpw").await.is_ok());
        assert!(matches!(
            service.login("alice2", "pw123").await,
            Err(AppError::Auth(AuthError::BadPassword))
        ));
    }

    #[tokio::test]
    async fn test_delete_account_requires_admin() {
        let service = service();
        let admin = admin_claims(&service).await;
        let alice = service.register("alice", "a@x.com", "pw123").await.unwrap();
        let alice_claims = service.authenticate(&alice.token).unwrap();

        assert!(matches!(
            service.delete_account(&alice_claims, alice.user.user_id).await,
            Err(AppError::Auth(AuthError::Forbidden))
        ));

        service.delete_account(&admin, alice.user.user_id).await.unwrap();
        service.delete_account(&admin, alice.user.user_id).await.unwrap();

        assert!(matches!(
            service.current_account(&alice_claims).await,
            Err(AppError::NotFound(_))
        ));
        assert_eq!(service.list_accounts().await.unwrap().len(), 1);
    }
}
