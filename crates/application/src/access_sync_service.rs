use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;

use schemabridge_core::AppResult;
use schemabridge_domain::{AclResource, DataSet, TargetGroup, TargetUser, data_set_resources};
use tokio::sync::RwLock;
use tracing::info;

use crate::{AclStore, SchemaRegistry, TargetApi, fetch_list};

mod graph;
mod identities;


const GROUPS_PATH: &str = "/api/permissions/group";
const USERS_PATH: &str = "/api/user";

/// Settings the access reconciler needs besides its ports.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessSyncOptions {
    /// Login of the bootstrap administrator, never deleted.
    pub admin_email: String,
    /// Target database whose tables receive permissions.
    pub database_name: String,
}

/// Counters describing what one access sync changed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AccessSyncReport {
    /// Groups created for new roles.
    pub groups_created: usize,
    /// Groups removed because their role vanished.
    pub groups_deleted: usize,
    /// Users created.
    pub users_created: usize,
    /// Deactivated users brought back.
    pub users_reactivated: usize,
    /// Users whose profile and memberships were rewritten.
    pub users_updated: usize,
    /// Users deactivated because they belong to no role.
    pub users_deleted: usize,
    /// Members skipped because their identity is not an email address.
    pub members_skipped: usize,
    /// Groups carried in the pushed permission graph.
    pub graph_groups: usize,
}

/// Lazily built, process-wide list of ACL resources derived from the schema registry.
///
/// Later registry changes are not observed until the process restarts.
#[derive(Debug, Default)]
pub struct ResourceCatalog {
    resources: RwLock<Option<Vec<AclResource>>>,
}

impl ResourceCatalog {
    /// Returns the cached resources, building them on first use.
    pub async fn resources(&self, registry: &dyn SchemaRegistry) -> AppResult<Vec<AclResource>> {
        if let Some(resources) = self.resources.read().await.as_ref() {
            return Ok(resources.clone());
        }

        let mut cached = self.resources.write().await;
        if let Some(resources) = cached.as_ref() {
            return Ok(resources.clone());
        }

        let data_sets = registry.list_data_sets().await?;
        let resources = data_set_resources(data_sets.iter().map(DataSet::name))?;
        info!(count = resources.len(), "built acl resource catalog");
        *cached = Some(resources.clone());
        Ok(resources)
    }
}

/// Mirrors ACL roles, users and data set permissions into the target system.
#[derive(Clone)]
pub struct AccessSyncService {
    target_api: Arc<dyn TargetApi>,
    acl_store: Arc<dyn AclStore>,
    schema_registry: Arc<dyn SchemaRegistry>,
    resource_catalog: Arc<ResourceCatalog>,
    options: AccessSyncOptions,
}

impl AccessSyncService {
    /// Creates a new access sync service.
    #[must_use]
    pub fn new(
        target_api: Arc<dyn TargetApi>,
        acl_store: Arc<dyn AclStore>,
        schema_registry: Arc<dyn SchemaRegistry>,
        options: AccessSyncOptions,
    ) -> Self {
        Self {
            target_api,
            acl_store,
            schema_registry,
            resource_catalog: Arc::new(ResourceCatalog::default()),
            options,
        }
    }

    /// Runs one full reconciliation pass.
    ///
    /// Groups are created before users so memberships can reference them,
    /// and orphaned groups are removed before the permission graph is read.
    pub async fn sync(&self) -> AppResult<AccessSyncReport> {
        info!("starting access sync");
        let mut report = AccessSyncReport::default();

        let mut groups: BTreeMap<String, i64> =
            fetch_list::<TargetGroup>(self.target_api.as_ref(), GROUPS_PATH)
                .await?
                .into_iter()
                .map(|group| (group.name, group.id))
                .collect();
        let users: Vec<TargetUser> = fetch_list(
            self.target_api.as_ref(),
            &format!("{USERS_PATH}?include_deactivated=true"),
        )
        .await?;
        let roles = self.acl_store.list_roles().await?;

        self.create_missing_groups(&roles, &mut groups, &mut report)
            .await?;
        let mirrored: HashSet<String> = self
            .upsert_role_members(&roles, &groups, &users, &mut report)
            .await?;
        self.delete_orphaned_groups(&roles, &mut groups, &mut report)
            .await?;
        self.delete_orphaned_users(&mirrored, &users, &mut report)
            .await?;
        self.push_permission_graph(&groups, &mut report).await?;

        info!(
            groups_created = report.groups_created,
            groups_deleted = report.groups_deleted,
            users_created = report.users_created,
            users_reactivated = report.users_reactivated,
            users_updated = report.users_updated,
            users_deleted = report.users_deleted,
            graph_groups = report.graph_groups,
            "access sync finished"
        );
        Ok(report)
    }
}
