//! Infrastructure adapters for the target REST API, PostgreSQL and the file system.

#![forbid(unsafe_code)]

mod bcrypt_password_hasher;
mod http_target_api_client;
mod json_schema_registry;
mod postgres_acl_change_feed;
mod postgres_acl_store;
mod postgres_metabase_metadata_store;

pub use bcrypt_password_hasher::BcryptPasswordHasher;
pub use http_target_api_client::{HttpTargetApiClient, TargetCredentials};
pub use json_schema_registry::{JsonSchemaRegistry, parse_registry_document};
pub use postgres_acl_change_feed::PostgresAclChangeFeed;
pub use postgres_acl_store::PostgresAclStore;
pub use postgres_metabase_metadata_store::PostgresMetabaseMetadataStore;
