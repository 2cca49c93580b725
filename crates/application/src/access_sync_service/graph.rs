use schemabridge_core::AppError;
use schemabridge_domain::{GraphInputs, TargetDatabase, TargetTable, derive_permission_graph};
use serde::Deserialize;
use tracing::{info, warn};

use crate::fetch_as;

use super::*;

const GRAPH_PATH: &str = "/api/permissions/graph";

#[derive(Debug, Deserialize)]
struct GraphRevision {
    revision: i64,
}

impl AccessSyncService {
    pub(super) async fn push_permission_graph(
        &self,
        groups: &BTreeMap<String, i64>,
        report: &mut AccessSyncReport,
    ) -> AppResult<()> {
        let current: GraphRevision = fetch_as(self.target_api.as_ref(), GRAPH_PATH).await?;
        let resources = self
            .resource_catalog
            .resources(self.schema_registry.as_ref())
            .await?;
        let grants = self.acl_store.list_permission_grants().await?;

        let database = fetch_list::<TargetDatabase>(self.target_api.as_ref(), "/api/database")
            .await?
            .into_iter()
            .find(|database| database.name == self.options.database_name)
            .ok_or_else(|| {
                AppError::NotFound(format!(
                    "database '{}' does not exist in the target",
                    self.options.database_name
                ))
            })?;
        let tables: Vec<TargetTable> = fetch_list::<TargetTable>(self.target_api.as_ref(), "/api/table")
            .await?
            .into_iter()
            .filter(|table| table.db_id == database.id)
            .collect();

        for resource in &resources {
            if !tables.iter().any(|table| table.name == resource.name()) {
                warn!(data_set = %resource.name(), "no table for data set, skipping permissions");
            }
        }

        let graph = derive_permission_graph(&GraphInputs {
            revision: current.revision,
            database_id: database.id,
            groups,
            resources: &resources,
            tables: &tables,
            grants: &grants,
        });
        report.graph_groups = graph.groups.len();

        let body = serde_json::to_value(&graph).map_err(|error| {
            AppError::Internal(format!("failed to encode permission graph: {error}"))
        })?;
        info!(revision = current.revision, groups = graph.groups.len(), "pushing permission graph");
        self.target_api
            .put(GRAPH_PATH, body)
            .await
            .map_err(|error| match error {
                AppError::Http { status: 409, body } => AppError::Conflict(format!(
                    "permission graph revision {} is stale: {body}",
                    current.revision
                )),
                other => other,
            })?;

        Ok(())
    }
}
