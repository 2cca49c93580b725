use serde_json::{Value, json};

/// Connection of the target system to a data warehouse, per supported engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DatabaseConnection {
    /// PostgreSQL warehouse.
    Postgres {
        /// Host name.
        host: String,
        /// TCP port.
        port: u16,
        /// Database name.
        database: String,
        /// Login user.
        user: String,
        /// Login password.
        password: String,
        /// libpq `sslmode`, if any.
        sslmode: Option<String>,
    },
    /// SQL Server warehouse on its default instance.
    SqlServer {
        /// Host name.
        host: String,
        /// TCP port.
        port: u16,
        /// Database name.
        database: String,
        /// Login user.
        user: String,
        /// Login password.
        password: String,
    },
}

impl DatabaseConnection {
    /// Returns the engine name the target system expects.
    #[must_use]
    pub fn engine(&self) -> &'static str {
        match self {
            Self::Postgres { .. } => "postgres",
            Self::SqlServer { .. } => "sqlserver",
        }
    }

    /// Returns the engine-specific connection details record.
    #[must_use]
    pub fn details(&self) -> Value {
        match self {
            Self::Postgres {
                host,
                port,
                database,
                user,
                password,
                sslmode,
            } => {
                let ssl = sslmode
                    .as_deref()
                    .is_some_and(|mode| matches!(mode, "require" | "verify-ca" | "verify-full"));
                let mut details = json!({
                    "host": host,
                    "port": port,
                    "dbname": database,
                    "user": user,
                    "password": password,
                    "ssl": ssl,
                });
                if let (Some(mode), Some(object)) = (sslmode, details.as_object_mut()) {
                    object.insert("ssl-mode".to_owned(), Value::String(mode.clone()));
                }
                details
            }
            // Named instances are not supported.
            Self::SqlServer {
                host,
                port,
                database,
                user,
                password,
            } => json!({
                "host": host,
                "instance": "MSSQLSERVER",
                "port": port,
                "db": database,
                "user": user,
                "password": password,
                "ssl": false,
                "additional-options": "encrypt=true",
                "tunnel-enabled": false,
            }),
        }
    }
}
