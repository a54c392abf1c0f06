//! Password hashing.

use error::AppError;

/// Salted, adaptive-cost password hashing (bcrypt).
///
/// The produced string embeds algorithm, cost and salt, so nothing else
/// needs to be stored next to it.
#[derive(Debug, Clone, Copy)]
pub struct PasswordHasher {
    cost: u32,
}

impl PasswordHasher {
    /// Create a hasher with an explicit bcrypt cost (4..=31).
    pub fn new(cost: u32) -> Result<Self, AppError> {
        if !(4..=31).contains(&cost) {
            return Err(AppError::Configuration(format!(
                "bcrypt cost must be between 4 and 31, got {cost}"
            )));
        }
        Ok(Self { cost })
    }

    pub fn cost(&self) -> u32 {
        self.cost
    }

    pub fn hash(&self, plaintext: &str) -> Result<String, AppError> {
        bcrypt::hash(plaintext, self.cost).map_err(|e| {
            tracing::error!("Failed to hash password: {}", e);
            AppError::Internal("password hashing failed".into())
        })
    }

    /// A malformed or empty stored hash verifies as `false`.
    pub fn verify(&self, plaintext: &str, stored_hash: &str) -> bool {
        if stored_hash.is_empty() {
            return false;
        }
        match bcrypt::verify(plaintext, stored_hash) {
            Ok(matches) => matches,
            Err(e) => {
                tracing::warn!("Stored password hash could not be parsed: {}", e);
                false
            }
        }
    }
}

impl Default for PasswordHasher {
    fn default() -> Self {
        Self {
            cost: bcrypt::DEFAULT_COST,
        }
    }
}
