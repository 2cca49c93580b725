//! Schema bridge command line: seeds the BI target and reconciles metadata and access.

#![forbid(unsafe_code)]

mod sync_config;

use std::env;
use std::sync::Arc;

use schemabridge_application::{
    AccessSyncListener, AccessSyncOptions, AccessSyncService, AclEventHub, BootstrapInput,
    BootstrapService, MetadataSyncOptions, MetadataSyncService, TargetApi, default_settings,
};
use schemabridge_core::{AppError, AppResult};
use schemabridge_infrastructure::{
    BcryptPasswordHasher, HttpTargetApiClient, JsonSchemaRegistry, PostgresAclChangeFeed,
    PostgresAclStore, PostgresMetabaseMetadataStore,
};
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use crate::sync_config::SyncConfig;

const USAGE: &str = "usage: schemabridge-sync <setup|update-metadata|sync-acl|watch-acl>";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Command {
    Setup,
    UpdateMetadata,
    SyncAcl,
    WatchAcl,
}

impl Command {
    fn parse(value: &str) -> AppResult<Self> {
        match value {
            "setup" => Ok(Self::Setup),
            "update-metadata" => Ok(Self::UpdateMetadata),
            "sync-acl" => Ok(Self::SyncAcl),
            "watch-acl" => Ok(Self::WatchAcl),
            other => Err(AppError::Validation(format!(
                "unknown command '{other}'; {USAGE}"
            ))),
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), AppError> {
    dotenvy::dotenv().ok();
    init_tracing();

    let command = env::args()
        .nth(1)
        .ok_or_else(|| AppError::Validation(USAGE.to_owned()))
        .and_then(|value| Command::parse(value.as_str()))?;
    let config = SyncConfig::load()?;
    info!(?command, metabase_url = %config.metabase_url, "schemabridge-sync started");

    let result = match command {
        Command::Setup => run_setup(&config).await,
        Command::UpdateMetadata => run_update_metadata(&config).await,
        Command::SyncAcl => run_sync_acl(&config).await,
        Command::WatchAcl => run_watch_acl(&config).await,
    };

    if let Err(error) = &result {
        error!(?command, error = %error, "schemabridge-sync failed");
    }
    result
}

async fn run_setup(config: &SyncConfig) -> AppResult<()> {
    let pool = connect_pool(config.metadata_database_url()?).await?;
    let service = BootstrapService::new(
        Arc::new(PostgresMetabaseMetadataStore::new(pool)),
        Arc::new(BcryptPasswordHasher::new()),
    );

    service
        .setup(&BootstrapInput {
            admin_email: config.credentials.username.clone(),
            admin_first_name: config.admin_first_name.clone(),
            admin_last_name: config.admin_last_name.clone(),
            admin_password: config.credentials.password.clone(),
            databases: vec![(
                config.data_db_name.clone(),
                config.data_connection()?.clone(),
            )],
            settings: default_settings(
                config.credentials.username.as_str(),
                config.report_timezone.as_str(),
            ),
        })
        .await
}

async fn run_update_metadata(config: &SyncConfig) -> AppResult<()> {
    let service = MetadataSyncService::new(
        build_target_api(config)?,
        Arc::new(JsonSchemaRegistry::new(config.schema_registry_path()?)),
        MetadataSyncOptions {
            database_name: config.data_db_name.clone(),
            schema_sync_wait: config.schema_sync_wait,
        },
    );

    if service.update_metadata().await? {
        Ok(())
    } else {
        Err(AppError::NotFound(format!(
            "database '{}' does not exist in the target",
            config.data_db_name
        )))
    }
}

async fn run_sync_acl(config: &SyncConfig) -> AppResult<()> {
    let pool = connect_pool(config.acl_database_url()?).await?;
    build_access_sync(config, pool)?.sync().await.map(|_| ())
}

async fn run_watch_acl(config: &SyncConfig) -> AppResult<()> {
    let pool = connect_pool(config.acl_database_url()?).await?;
    let service = build_access_sync(config, pool.clone())?;
    service.sync().await?;

    let hub = AclEventHub::default();
    hub.subscribe(Arc::new(AccessSyncListener::new(service)))
        .await;

    PostgresAclChangeFeed::new(pool, config.acl_change_channel.clone())
        .run(&hub)
        .await
}

fn build_access_sync(config: &SyncConfig, acl_pool: PgPool) -> AppResult<AccessSyncService> {
    Ok(AccessSyncService::new(
        build_target_api(config)?,
        Arc::new(PostgresAclStore::new(acl_pool)),
        Arc::new(JsonSchemaRegistry::new(config.schema_registry_path()?)),
        AccessSyncOptions {
            admin_email: config.credentials.username.clone(),
            database_name: config.data_db_name.clone(),
        },
    ))
}

fn build_target_api(config: &SyncConfig) -> AppResult<Arc<dyn TargetApi>> {
    let http_client = reqwest::Client::builder()
        .build()
        .map_err(|error| AppError::Internal(format!("failed to build HTTP client: {error}")))?;

    Ok(Arc::new(HttpTargetApiClient::new(
        http_client,
        config.metabase_url.as_str(),
        config.credentials.clone(),
    )))
}

async fn connect_pool(database_url: &str) -> AppResult<PgPool> {
    PgPoolOptions::new()
        .max_connections(2)
        .connect(database_url)
        .await
        .map_err(|error| AppError::Internal(format!("failed to connect to database: {error}")))
}

fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .compact()
        .init();
}
