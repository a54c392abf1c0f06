//! Account models
//!
//! Domain models for forum accounts and the shapes returned to clients.

use auth::{AccountId, Role, TokenSubject};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Authentication-relevant account status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum AccountStatus {
    #[default]
    Active,
    Banned,
}

impl AccountStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            AccountStatus::Active => "Active",
            AccountStatus::Banned => "Banned",
        }
    }
}

impl fmt::Display for AccountStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AccountStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Active" => Ok(AccountStatus::Active),
            "Banned" => Ok(AccountStatus::Banned),
            other => Err(format!("unknown account status '{other}'")),
        }
    }
}

/// A stored forum account.
#[derive(Debug, Clone)]
pub struct Account {
    pub id: AccountId,
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub avatar_url: Option<String>,
    pub role: Role,
    pub status: AccountStatus,
    pub created_at: DateTime<Utc>,
}

impl Account {
    pub fn is_banned(&self) -> bool {
        self.status == AccountStatus::Banned
    }

    pub fn summary(&self) -> AccountSummary {
        AccountSummary {
            user_id: self.id,
            username: self.username.clone(),
            email: self.email.clone(),
            avatar_url: self.avatar_url.clone(),
            status: self.status,
            role_name: self.role,
            created_at: self.created_at,
        }
    }
}

impl TokenSubject for Account {
    fn account_id(&self) -> AccountId {
        self.id
    }

    fn display_name(&self) -> &str {
        &self.username
    }

    fn role(&self) -> Role {
        self.role
    }
}

/// Account fields supplied on creation; the store assigns id and timestamp.
#[derive(Debug, Clone)]
pub struct NewAccount {
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub role: Role,
}

/// Client-facing view of an account. Never carries the password hash.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountSummary {
    pub user_id: AccountId,
    pub username: String,
    pub email: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avatar_url: Option<String>,
    pub status: AccountStatus,
    pub role_name: Role,
    pub created_at: DateTime<Utc>,
}

/// Result of a successful registration or login.
#[derive(Debug, Clone)]
pub struct AuthSession {
    pub user: AccountSummary,
    pub token: String,
}

/// Requested changes to the caller's own profile.
#[derive(Debug, Clone, Default)]
pub struct ProfileUpdate {
    pub username: String,
    pub email: String,
    /// `None` keeps the current avatar.
    pub avatar_url: Option<String>,
    /// `None` or empty keeps the current password.
    pub password: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn account() -> Account {
        Account {
            id: AccountId(5),
            username: "alice".into(),
            email: "a@x.com".into(),
            password_hash: "$2b$04$secret".into(),
            avatar_url: None,
            role: Role::Member,
            status: AccountStatus::Active,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_summary_hides_password_hash() {
        let json = serde_json::to_value(account().summary()).unwrap();

        assert_eq!(json["userId"], 5);
        assert_eq!(json["roleName"], "Member");
        assert_eq!(json["status"], "Active");
        assert!(json.get("avatarUrl").is_none());
        assert!(!json.to_string().contains("secret"));
    }

    #[test]
    fn test_status_parsing() {
        assert_eq!("Banned".parse::<AccountStatus>(), Ok(AccountStatus::Banned));
        assert!("banned".parse::<AccountStatus>().is_err());
        assert_eq!(AccountStatus::default(), AccountStatus::Active);
    }
}
