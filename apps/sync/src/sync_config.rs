use std::env;
use std::path::{Path, PathBuf};
use std::time::Duration;

use schemabridge_core::{AppError, AppResult};
use schemabridge_domain::DatabaseConnection;
use schemabridge_infrastructure::TargetCredentials;

/// Runtime settings of the sync binary, read from the environment.
#[derive(Debug, Clone)]
pub struct SyncConfig {
    pub metabase_url: String,
    pub credentials: TargetCredentials,
    pub admin_first_name: String,
    pub admin_last_name: String,
    pub data_db_name: String,
    pub schema_sync_wait: Duration,
    pub report_timezone: String,
    pub acl_change_channel: String,
    schema_registry_path: Option<PathBuf>,
    acl_database_url: Option<String>,
    metadata_database_url: Option<String>,
    data_connection: Option<DatabaseConnection>,
}

impl SyncConfig {
    pub fn load() -> AppResult<Self> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    fn from_lookup<F>(lookup: F) -> AppResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let env = EnvReader { lookup };

        let metabase_url = env.required("METABASE_URL")?;
        url::Url::parse(metabase_url.as_str()).map_err(|error| {
            AppError::Validation(format!("invalid METABASE_URL '{metabase_url}': {error}"))
        })?;
        let metabase_url = metabase_url.trim_end_matches('/').to_owned();

        let credentials = TargetCredentials {
            username: env.required("METABASE_ADMIN_EMAIL")?,
            password: env.required("METABASE_ADMIN_PASSWORD")?,
        };
        let wait_seconds = env.parse_u64("METABASE_SCHEMA_SYNC_WAIT_SECONDS", 5)?;

        Ok(Self {
            metabase_url,
            credentials,
            admin_first_name: env.or_default("METABASE_ADMIN_FIRST_NAME", "Admin"),
            admin_last_name: env.or_default("METABASE_ADMIN_LAST_NAME", "User"),
            data_db_name: env.or_default("METABASE_DATA_DB_NAME", "dwh"),
            schema_sync_wait: Duration::from_secs(wait_seconds),
            report_timezone: env.or_default("METABASE_REPORT_TIMEZONE", "Europe/Berlin"),
            acl_change_channel: env.or_default("ACL_CHANGE_CHANNEL", "acl_changes"),
            schema_registry_path: env.optional("SCHEMA_REGISTRY_PATH").map(PathBuf::from),
            acl_database_url: env.optional("ACL_DATABASE_URL"),
            metadata_database_url: env.optional("METABASE_METADATA_DATABASE_URL"),
            data_connection: env.data_connection()?,
        })
    }

    pub fn schema_registry_path(&self) -> AppResult<&Path> {
        self.schema_registry_path
            .as_deref()
            .ok_or_else(|| missing("SCHEMA_REGISTRY_PATH"))
    }

    pub fn acl_database_url(&self) -> AppResult<&str> {
        self.acl_database_url
            .as_deref()
            .ok_or_else(|| missing("ACL_DATABASE_URL"))
    }

    pub fn metadata_database_url(&self) -> AppResult<&str> {
        self.metadata_database_url
            .as_deref()
            .ok_or_else(|| missing("METABASE_METADATA_DATABASE_URL"))
    }

    pub fn data_connection(&self) -> AppResult<&DatabaseConnection> {
        self.data_connection
            .as_ref()
            .ok_or_else(|| missing("DATA_DB_HOST"))
    }
}

fn missing(name: &str) -> AppError {
    AppError::Validation(format!("{name} is required for this command"))
}

struct EnvReader<F> {
    lookup: F,
}

impl<F> EnvReader<F>
where
    F: Fn(&str) -> Option<String>,
{
    fn optional(&self, name: &str) -> Option<String> {
        (self.lookup)(name)
            .map(|value| value.trim().to_owned())
            .filter(|value| !value.is_empty())
    }

    fn required(&self, name: &str) -> AppResult<String> {
        self.optional(name)
            .ok_or_else(|| AppError::Validation(format!("{name} is required")))
    }

    fn or_default(&self, name: &str, default: &str) -> String {
        self.optional(name).unwrap_or_else(|| default.to_owned())
    }

    fn parse_u64(&self, name: &str, default: u64) -> AppResult<u64> {
        match self.optional(name) {
            Some(value) => value.parse::<u64>().map_err(|error| {
                AppError::Validation(format!("invalid {name} value '{value}': {error}"))
            }),
            None => Ok(default),
        }
    }

    fn parse_u16(&self, name: &str, default: u16) -> AppResult<u16> {
        match self.optional(name) {
            Some(value) => value.parse::<u16>().map_err(|error| {
                AppError::Validation(format!("invalid {name} value '{value}': {error}"))
            }),
            None => Ok(default),
        }
    }

    /// Present only when `DATA_DB_HOST` is set.
    fn data_connection(&self) -> AppResult<Option<DatabaseConnection>> {
        let Some(host) = self.optional("DATA_DB_HOST") else {
            return Ok(None);
        };

        let connection = match self.or_default("DATA_DB_ENGINE", "postgres").as_str() {
            "postgres" => DatabaseConnection::Postgres {
                host,
                port: self.parse_u16("DATA_DB_PORT", 5432)?,
                database: self.required("DATA_DB_NAME")?,
                user: self.required("DATA_DB_USER")?,
                password: self.required("DATA_DB_PASSWORD")?,
                sslmode: self.optional("DATA_DB_SSLMODE"),
            },
            "sqlserver" => DatabaseConnection::SqlServer {
                host,
                port: self.parse_u16("DATA_DB_PORT", 1433)?,
                database: self.required("DATA_DB_NAME")?,
                user: self.required("DATA_DB_USER")?,
                password: self.required("DATA_DB_PASSWORD")?,
            },
            other => {
                return Err(AppError::Validation(format!(
                    "unsupported DATA_DB_ENGINE '{other}', expected postgres or sqlserver"
                )));
            }
        };

        Ok(Some(connection))
    }
}
