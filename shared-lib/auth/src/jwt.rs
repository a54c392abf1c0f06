//! JWT issuance and verification.

use error::{AppError, AuthError};
use hmac::{Hmac, Mac};
use jwt::{SignWithKey, VerifyWithKey};
use serde::{Deserialize, Serialize};
use sha2::Sha256;

use crate::claims::{AccountId, Claims, Role};

type HmacSha256 = Hmac<Sha256>;

/// Lifetime of an issued token: seven days.
pub const TOKEN_LIFETIME_SECS: i64 = 7 * 24 * 60 * 60;

/// JWT configuration, loaded once at startup.
#[derive(Clone)]
pub struct JwtConfig {
    /// Secret key for signing tokens
    pub secret: String,
    /// Token issuer
    pub issuer: String,
    /// Token audience
    pub audience: String,
    /// Token validity duration in seconds
    pub expires_in_secs: i64,
}

impl JwtConfig {
    /// Create a new JWT configuration with the standard seven-day lifetime.
    pub fn new(
        secret: impl Into<String>,
        issuer: impl Into<String>,
        audience: impl Into<String>,
    ) -> Self {
        Self {
            secret: secret.into(),
            issuer: issuer.into(),
            audience: audience.into(),
            expires_in_secs: TOKEN_LIFETIME_SECS,
        }
    }

    /// Key, issuer and audience must all be present.
    pub fn validate(&self) -> Result<(), AppError> {
        for (name, value) in [
            ("JWT key", &self.secret),
            ("JWT issuer", &self.issuer),
            ("JWT audience", &self.audience),
        ] {
            if value.trim().is_empty() {
                return Err(AppError::Configuration(format!("{name} must be configured")));
            }
        }
        if self.expires_in_secs <= 0 {
            return Err(AppError::Configuration("JWT lifetime must be positive".into()));
        }
        Ok(())
    }

    fn signing_key(&self) -> Result<HmacSha256, AppError> {
        HmacSha256::new_from_slice(self.secret.as_bytes()).map_err(|e| {
            tracing::error!("Failed to create HMAC key: {}", e);
            AppError::Configuration("JWT key is not a usable HMAC key".into())
        })
    }
}

impl std::fmt::Debug for JwtConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JwtConfig")
            .field("secret", &"***")
            .field("issuer", &self.issuer)
            .field("audience", &self.audience)
            .field("expires_in_secs", &self.expires_in_secs)
            .finish()
    }
}

/// Anything a token can be issued for.
pub trait TokenSubject {
    fn account_id(&self) -> AccountId;
    fn display_name(&self) -> &str;
    fn role(&self) -> Role;
}

/// Claims as they travel inside the token. `sub` is a string on the wire.
#[derive(Debug, Serialize, Deserialize)]
struct TokenPayload {
    sub: String,
    name: String,
    role: Role,
    iat: i64,
    exp: i64,
    iss: String,
    aud: String,
}

/// Builds signed bearer tokens for verified accounts.
#[derive(Clone)]
pub struct TokenIssuer {
    key: HmacSha256,
    issuer: String,
    audience: String,
    expires_in_secs: i64,
}

impl TokenIssuer {
    pub fn new(config: &JwtConfig) -> Result<Self, AppError> {
        config.validate()?;
        Ok(Self {
            key: config.signing_key()?,
            issuer: config.issuer.clone(),
            audience: config.audience.clone(),
            expires_in_secs: config.expires_in_secs,
        })
    }

    /// Issue a token for `subject`, valid from now.
    pub fn issue(&self, subject: &impl TokenSubject) -> Result<String, AuthError> {
        self.issue_at(subject, chrono::Utc::now().timestamp())
    }

    /// Issue a token as if the current time were `now` (Unix seconds).
    pub fn issue_at(&self, subject: &impl TokenSubject, now: i64) -> Result<String, AuthError> {
        let payload = TokenPayload {
            sub: subject.account_id().to_string(),
            name: subject.display_name().to_string(),
            role: subject.role(),
            iat: now,
            exp: now + self.expires_in_secs,
            iss: self.issuer.clone(),
            aud: self.audience.clone(),
        };

        payload.sign_with_key(&self.key).map_err(|e| {
            tracing::error!("Failed to encode JWT: {}", e);
            AuthError::TokenCreationFailed
        })
    }
}

/// Validates inbound bearer tokens and yields typed [`Claims`].
#[derive(Clone)]
pub struct TokenVerifier {
    key: HmacSha256,
    issuer: String,
    audience: String,
}

impl TokenVerifier {
    pub fn new(config: &JwtConfig) -> Result<Self, AppError> {
        config.validate()?;
        Ok(Self {
            key: config.signing_key()?,
            issuer: config.issuer.clone(),
            audience: config.audience.clone(),
        })
    }

    /// Verify `token` against the current time.
    pub fn verify(&self, token: &str) -> Result<Claims, AuthError> {
        self.verify_at(token, chrono::Utc::now().timestamp())
    }

    /// Checks signature, issuer, audience, then expiry. Every failure is
    /// reported to the caller as [`AuthError::Unauthenticated`].
    pub fn verify_at(&self, token: &str, now: i64) -> Result<Claims, AuthError> {
        let payload: TokenPayload = token.verify_with_key(&self.key).map_err(|e| {
            tracing::warn!("Rejected token: {}", e);
            AuthError::Unauthenticated
        })?;

        if payload.iss != self.issuer {
            tracing::warn!("Rejected token: issuer '{}' does not match", payload.iss);
            return Err(AuthError::Unauthenticated);
        }

        if payload.aud != self.audience {
            tracing::warn!("Rejected token: audience '{}' does not match", payload.aud);
            return Err(AuthError::Unauthenticated);
        }

        let sub: AccountId = payload.sub.parse().map_err(|_| {
            tracing::warn!("Rejected token: subject '{}' is not an account id", payload.sub);
            AuthError::Unauthenticated
        })?;

        let claims = Claims {
            sub,
            name: payload.name,
            role: payload.role,
            iat: payload.iat,
            exp: payload.exp,
            iss: payload.iss,
            aud: payload.aud,
        };

        if claims.is_expired_at(now) {
            tracing::debug!("Rejected token for account {}: expired", claims.sub);
            return Err(AuthError::Unauthenticated);
        }

        Ok(claims)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Subject(i64, &'static str, Role);

    impl TokenSubject for Subject {
        fn account_id(&self) -> AccountId {
            AccountId(self.0)
        }
        fn display_name(&self) -> &str {
            self.1
        }
        fn role(&self) -> Role {
            self.2
        }
    }

    fn config() -> JwtConfig {
        JwtConfig::new("test-secret-key", "forum-api", "forum-clients")
    }

    fn pair(config: &JwtConfig) -> (TokenIssuer, TokenVerifier) {
        (
            TokenIssuer::new(config).unwrap(),
            TokenVerifier::new(config).unwrap(),
        )
    }

    #[test]
    fn test_issue_verify_round_trip() {
        let (issuer, verifier) = pair(&config());
        let token = issuer.issue(&Subject(42, "alice", Role::Member)).unwrap();

        assert_eq!(token.split('.').count(), 3);

        let claims = verifier.verify(&token).expect("token should verify");
        assert_eq!(claims.sub, AccountId(42));
        assert_eq!(claims.name, "alice");
        assert_eq!(claims.role, Role::Member);
        assert_eq!(claims.iss, "forum-api");
        assert_eq!(claims.aud, "forum-clients");
        assert_eq!(claims.exp - claims.iat, TOKEN_LIFETIME_SECS);
    }

    #[test]
    fn test_expired_token_is_unauthenticated() {
        let (issuer, verifier) = pair(&config());
        let issued_at = 1_700_000_000;
        let token = issuer
            .issue_at(&Subject(1, "bob", Role::Admin), issued_at)
            .unwrap();

        assert!(verifier.verify_at(&token, issued_at + TOKEN_LIFETIME_SECS - 1).is_ok());
        assert_eq!(
            verifier.verify_at(&token, issued_at + TOKEN_LIFETIME_SECS),
            Err(AuthError::Unauthenticated)
        );
        assert_eq!(verifier.verify(&token), Err(AuthError::Unauthenticated));
    }

    #[test]
    fn test_wrong_key_issuer_or_audience_is_rejected() {
        let (issuer, _) = pair(&config());
        let token = issuer.issue(&Subject(7, "carol", Role::Moderator)).unwrap();

        let mut other_key = config();
        other_key.secret = "another-secret".into();
        let mut other_issuer = config();
        other_issuer.issuer = "someone-else".into();
        let mut other_audience = config();
        other_audience.audience = "mobile".into();

        for cfg in [other_key, other_issuer, other_audience] {
            let verifier = TokenVerifier::new(&cfg).unwrap();
            assert_eq!(verifier.verify(&token), Err(AuthError::Unauthenticated));
        }
    }

    #[test]
    fn test_tampered_or_garbage_token_is_rejected() {
        let (issuer, verifier) = pair(&config());
        let token = issuer.issue(&Subject(7, "carol", Role::Member)).unwrap();

        // Admin payload spliced under the member token's signature.
        let parts: Vec<&str> = token.split('.').collect();
        let admin = issuer.issue(&Subject(7, "carol", Role::Admin)).unwrap();
        let forged_payload = admin.split('.').nth(1).unwrap();
        let spliced = format!("{}.{}.{}", parts[0], forged_payload, parts[2]);

        assert_eq!(verifier.verify(&spliced), Err(AuthError::Unauthenticated));
        assert_eq!(verifier.verify("not-a-token"), Err(AuthError::Unauthenticated));
        assert_eq!(verifier.verify(""), Err(AuthError::Unauthenticated));
    }

    #[test]
    fn test_missing_configuration_is_fatal() {
        for cfg in [
            JwtConfig::new("", "forum-api", "forum-clients"),
            JwtConfig::new("secret", " ", "forum-clients"),
            JwtConfig::new("secret", "forum-api", ""),
        ] {
            assert!(matches!(
                TokenIssuer::new(&cfg),
                Err(AppError::Configuration(_))
            ));
            assert!(matches!(
                TokenVerifier::new(&cfg),
                Err(AppError::Configuration(_))
            ));
        }
    }
}
