//! bcrypt password hasher producing `$2a$` hashes.

use bcrypt::Version;
use schemabridge_application::PasswordHasher;
use schemabridge_core::{AppError, AppResult};

const DEFAULT_COST: u32 = 10;

/// bcrypt hasher in the format the target system verifies.
#[derive(Debug, Clone, Copy)]
pub struct BcryptPasswordHasher {
    cost: u32,
}

impl BcryptPasswordHasher {
    /// Creates a hasher with cost factor 10.
    #[must_use]
    pub fn new() -> Self {
        Self { cost: DEFAULT_COST }
    }
}

impl Default for BcryptPasswordHasher {
    fn default() -> Self {
        Self::new()
    }
}

impl PasswordHasher for BcryptPasswordHasher {
    fn hash_password(&self, salted_password: &str) -> AppResult<String> {
        bcrypt::hash_with_result(salted_password, self.cost)
            .map(|parts| parts.format_for_version(Version::TwoA))
            .map_err(|error| AppError::Internal(format!("failed to hash password: {error}")))
    }
}
