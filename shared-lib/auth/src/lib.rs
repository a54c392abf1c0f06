//! Authentication and authorization library for the forum services.
//!
//! This crate provides password hashing, JWT issuance/verification and the
//! ownership-based access policy. It knows nothing about HTTP or storage.

mod claims;
mod jwt;
mod password;
mod policy;

pub use claims::{AccountId, Claims, Role};
pub use jwt::{JwtConfig, TokenIssuer, TokenSubject, TokenVerifier, TOKEN_LIFETIME_SECS};
pub use password::PasswordHasher;
pub use policy::{authorize, can_modify, Action, Decision, ResourceKind};
