//! JWT claims, account identity and role definitions.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Forum roles. Closed set; stored as the seeded role-table id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Role {
    /// Full administrative access
    Admin,
    /// Moderation staff
    Moderator,
    /// Regular registered user
    Member,
}

impl Role {
    /// Id of this role in the `roles` table.
    pub fn id(self) -> i32 {
        match self {
            Role::Admin => 1,
            Role::Moderator => 2,
            Role::Member => 3,
        }
    }

    /// Map a stored role id back to a role.
    pub fn from_id(id: i32) -> Option<Self> {
        match id {
            1 => Some(Role::Admin),
            2 => Some(Role::Moderator),
            3 => Some(Role::Member),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Role::Admin => "Admin",
            Role::Moderator => "Moderator",
            Role::Member => "Member",
        }
    }
}

impl Default for Role {
    fn default() -> Self {
        Self::Member
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Admin" => Ok(Role::Admin),
            "Moderator" => Ok(Role::Moderator),
            "Member" => Ok(Role::Member),
            other => Err(format!("unknown role '{other}'")),
        }
    }
}

/// Identifier of a forum account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AccountId(pub i64);

impl AccountId {
    pub fn as_i64(self) -> i64 {
        self.0
    }
}

impl fmt::Display for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

impl FromStr for AccountId {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(s.parse()?))
    }
}

impl From<i64> for AccountId {
    fn from(value: i64) -> Self {
        Self(value)
    }
}

/// Verified identity carried by a token.
///
/// Only the token verifier produces these from a bearer string; everything
/// downstream consumes this typed form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Claims {
    /// Subject (account id)
    pub sub: AccountId,
    /// Display name (username at issuance)
    pub name: String,
    /// Account role at issuance
    pub role: Role,
    /// Issued at (Unix timestamp)
    pub iat: i64,
    /// Expiration time (Unix timestamp)
    pub exp: i64,
    /// Issuer
    pub iss: String,
    /// Audience
    pub aud: String,
}

impl Claims {
    /// Check whether the claims have expired at `now` (Unix seconds).
    pub fn is_expired_at(&self, now: i64) -> bool {
        now >= self.exp
    }

    /// Check if the caller has the admin role.
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}
