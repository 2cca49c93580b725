use async_trait::async_trait;
use schemabridge_core::AppResult;
use serde_json::Value;

/// Administrator row written straight into the target's metadata database.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdminUserRecord {
    /// Unique email.
    pub email: String,
    /// Given name.
    pub first_name: String,
    /// Family name.
    pub last_name: String,
    /// Hash of `password_salt + password`.
    pub password_hash: String,
    /// Random salt prefixed to the password before hashing.
    pub password_salt: String,
    /// Superuser flag.
    pub is_superuser: bool,
}

/// Database connection row already present in the metadata database.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExistingDatabase {
    /// Row id.
    pub id: i64,
    /// Display name.
    pub name: String,
}

/// Database connection row to write.
#[derive(Debug, Clone, PartialEq)]
pub struct DatabaseRecord {
    /// Display name.
    pub name: String,
    /// Engine name.
    pub engine: String,
    /// Engine-specific details.
    pub details: Value,
}

/// Direct write access to the target system's own metadata database.
///
/// Every method is a single statement (or a statement per row) in its own
/// implicit transaction.
#[async_trait]
pub trait MetabaseMetadataStore: Send + Sync {
    /// Inserts or updates a user keyed by email; the user is always active.
    async fn upsert_user(&self, user: &AdminUserRecord) -> AppResult<()>;

    /// Adds the user to the named groups, ignoring existing memberships.
    async fn add_group_memberships(&self, email: &str, group_names: &[String]) -> AppResult<()>;

    /// Lists existing database connections ordered by id.
    async fn list_databases(&self) -> AppResult<Vec<ExistingDatabase>>;

    /// Truncates all database connections (cascading) and inserts the given ones.
    async fn replace_databases(&self, databases: &[DatabaseRecord]) -> AppResult<()>;

    /// Overwrites one existing database connection.
    async fn update_database(&self, id: i64, database: &DatabaseRecord) -> AppResult<()>;

    /// Inserts or updates settings by key.
    async fn upsert_settings(&self, settings: &[(String, String)]) -> AppResult<()>;

    /// Removes the one-time setup token.
    async fn delete_setup_token(&self) -> AppResult<()>;
}

/// Password hashing in the format the target system verifies.
pub trait PasswordHasher: Send + Sync {
    /// Hashes an already salted password.
    fn hash_password(&self, salted_password: &str) -> AppResult<String>;
}
