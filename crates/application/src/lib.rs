//! Application services and ports.

#![forbid(unsafe_code)]

mod access_sync_service;
mod acl_events;
mod bootstrap_ports;
mod bootstrap_service;
mod metadata_sync_service;
mod source_ports;
mod target_api;

#[cfg(test)]
mod test_support;

pub use access_sync_service::{
    AccessSyncOptions, AccessSyncReport, AccessSyncService, ResourceCatalog,
};
pub use acl_events::{AccessSyncListener, AclChangeEvent, AclChangeListener, AclEventHub};
pub use bootstrap_ports::{
    AdminUserRecord, DatabaseRecord, ExistingDatabase, MetabaseMetadataStore, PasswordHasher,
};
pub use bootstrap_service::{BootstrapInput, BootstrapService, default_settings};
pub use metadata_sync_service::{
    MetadataSyncOptions, MetadataSyncService, MetadataSyncSummary, REVISION_MESSAGE,
};
pub use source_ports::{AclStore, SchemaRegistry};
pub use target_api::{TargetApi, fetch_as, fetch_list};
