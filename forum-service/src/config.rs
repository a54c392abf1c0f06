use auth::{JwtConfig, PasswordHasher};
use db::DbConfig;
use error::AppError;

/// Credentials for the admin account created at startup.
#[derive(Clone)]
pub struct AdminBootstrap {
    pub username: String,
    pub email: String,
    pub password: String,
}

/// Forum service configuration, loaded once at startup
#[derive(Debug, Clone)]
pub struct ForumConfig {
    /// HTTP listen address
    pub http_addr: String,

    /// Token signing settings
    pub jwt: JwtConfig,

    /// bcrypt cost factor
    pub bcrypt_cost: u32,

    /// Database connection settings
    pub db: DbConfig,

    /// Keep accounts in process memory instead of MySQL
    pub use_in_memory_store: bool,

    /// Optional admin account to create on startup
    pub admin: Option<AdminBootstrap>,

    /// Service version
    pub version: String,
}

impl std::fmt::Debug for AdminBootstrap {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AdminBootstrap")
            .field("username", &self.username)
            .field("email", &self.email)
            .finish_non_exhaustive()
    }
}

impl ForumConfig {
    /// Create configuration from environment variables.
    ///
    /// `JWT_KEY`, `JWT_ISSUER` and `JWT_AUDIENCE` are required.
    pub fn from_env() -> Result<Self, AppError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, AppError> {
        let required = |key: &str| {
            lookup(key)
                .filter(|v| !v.trim().is_empty())
                .ok_or_else(|| AppError::Configuration(format!("{key} must be set")))
        };

        let jwt = JwtConfig::new(
            required("JWT_KEY")?,
            required("JWT_ISSUER")?,
            required("JWT_AUDIENCE")?,
        );
        jwt.validate()?;

        let bcrypt_cost = match lookup("BCRYPT_COST") {
            Some(cost) => cost.parse().map_err(|_| {
                AppError::Configuration(format!("BCRYPT_COST must be a number, got '{cost}'"))
            })?,
            None => PasswordHasher::default().cost(),
        };

        let use_in_memory_store = lookup("USE_IN_MEMORY_STORE")
            .map(|v| v.to_lowercase() == "true" || v == "1")
            .unwrap_or(false);

        let admin = match (
            lookup("ADMIN_USERNAME"),
            lookup("ADMIN_EMAIL"),
            lookup("ADMIN_PASSWORD"),
        ) {
            (Some(username), Some(email), Some(password)) => Some(AdminBootstrap {
                username,
                email,
                password,
            }),
            _ => None,
        };

        Ok(Self {
            http_addr: lookup("HTTP_ADDR").unwrap_or_else(|| "0.0.0.0:8080".to_string()),
            jwt,
            bcrypt_cost,
            db: DbConfig::from_lookup(&lookup),
            use_in_memory_store,
            admin,
            version: env!("CARGO_PKG_VERSION").to_string(),
        })
    }

    /// Password hasher with the configured cost
    pub fn password_hasher(&self) -> Result<PasswordHasher, AppError> {
        PasswordHasher::new(self.bcrypt_cost)
    }
}
