//! Ownership and role based access decisions.
//!
//! Everything here is a pure function of the verified [`Claims`] and what the
//! caller knows about the target resource. No I/O.

use error::AuthError;
use serde::{Deserialize, Serialize};

use crate::claims::{AccountId, Claims};

/// Kinds of forum resources guarded by the policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResourceKind {
    Topic,
    Comment,
    Message,
    Notification,
    /// The caller's own profile (update/read self).
    Profile,
    Category,
    /// Another account's record (delete, ban, unban).
    Account,
}

impl ResourceKind {
    /// Kinds where an Admin does not get to act on someone else's record.
    pub fn is_owner_only(self) -> bool {
        matches!(self, ResourceKind::Message | ResourceKind::Profile)
    }
}

/// What the caller is trying to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    Read,
    Create,
    Update,
    Delete,
    /// Administrative operations such as ban/unban.
    Administer,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Allow,
    Deny,
}

impl Decision {
    /// Deny surfaces as [`AuthError::Forbidden`].
    pub fn into_result(self) -> Result<(), AuthError> {
        match self {
            Decision::Allow => Ok(()),
            Decision::Deny => Err(AuthError::Forbidden),
        }
    }

    fn from_bool(allowed: bool) -> Self {
        if allowed {
            Decision::Allow
        } else {
            Decision::Deny
        }
    }
}

/// Owner always may act; Admin may act on anything except messages and
/// profiles.
pub fn can_modify(claims: &Claims, owner: AccountId, kind: ResourceKind) -> bool {
    if claims.sub == owner {
        return true;
    }
    claims.is_admin() && !kind.is_owner_only()
}

/// Decide whether `claims` may perform `action` on a resource of `kind`
/// owned by `owner` (if the resource has an owner).
pub fn authorize(
    claims: &Claims,
    owner: Option<AccountId>,
    kind: ResourceKind,
    action: Action,
) -> Decision {
    use Action::*;
    use ResourceKind::*;

    let decision = match (kind, action) {
        (_, Administer) => Decision::from_bool(claims.is_admin()),

        (Category | Account, Read | Create) => Decision::Allow,
        (Category | Account, Update | Delete) => Decision::from_bool(claims.is_admin()),

        (Topic, Read) => Decision::Allow,
        (Topic | Comment | Message | Notification | Profile, Create) => Decision::Allow,

        // Topics are public; a single comment is visible to its author or an Admin.
        (Comment | Message | Notification | Profile, Read)
        | (Topic | Comment | Message | Notification | Profile, Update | Delete) => match owner {
            Some(owner) => Decision::from_bool(can_modify(claims, owner, kind)),
            None => Decision::Deny,
        },
    };

    if decision == Decision::Deny {
        tracing::debug!(
            "Denied {:?} on {:?} (owner {:?}) for account {} ({})",
            action,
            kind,
            owner,
            claims.sub,
            claims.role
        );
    }
    decision
}
