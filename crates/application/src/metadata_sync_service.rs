use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use schemabridge_core::AppResult;
use schemabridge_domain::{DataSet, DatabaseMetadata, TargetDatabase};
use tracing::{error, info};

use crate::{SchemaRegistry, TargetApi, fetch_as, fetch_list};

mod annotations;
mod metrics;


/// Revision message attached to every metric write.
pub const REVISION_MESSAGE: &str = "Auto schema import";

/// Settings the metadata reconciler needs besides its ports.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetadataSyncOptions {
    /// Target database holding the flattened data set tables.
    pub database_name: String,
    /// Fixed wait after triggering the target's own schema sync.
    pub schema_sync_wait: Duration,
}

/// Counters describing what one metadata sync changed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MetadataSyncSummary {
    /// Tables matched to a data set and annotated.
    pub tables_annotated: usize,
    /// Tables without a data set, hidden.
    pub tables_hidden: usize,
    /// Field annotations written.
    pub fields_updated: usize,
    /// Field annotations that failed and were skipped.
    pub fields_skipped: usize,
    /// Metrics created.
    pub metrics_created: usize,
    /// Existing metrics rewritten.
    pub metrics_updated: usize,
    /// Metrics archived because their definition vanished.
    pub metrics_archived: usize,
    /// Metrics that could not be translated or written.
    pub metrics_skipped: usize,
}

/// Pushes data set descriptions, field visibility and metric definitions into the target.
#[derive(Clone)]
pub struct MetadataSyncService {
    target_api: Arc<dyn TargetApi>,
    schema_registry: Arc<dyn SchemaRegistry>,
    options: MetadataSyncOptions,
}

impl MetadataSyncService {
    /// Creates a new metadata sync service.
    #[must_use]
    pub fn new(
        target_api: Arc<dyn TargetApi>,
        schema_registry: Arc<dyn SchemaRegistry>,
        options: MetadataSyncOptions,
    ) -> Self {
        Self {
            target_api,
            schema_registry,
            options,
        }
    }

    /// Runs one metadata reconciliation pass.
    ///
    /// Returns `false` without touching anything when the configured database
    /// is unknown to the target. Failures on a single field or metric are
    /// logged and skipped; everything else aborts the run.
    pub async fn update_metadata(&self) -> AppResult<bool> {
        let databases: Vec<TargetDatabase> =
            fetch_list(self.target_api.as_ref(), "/api/database").await?;
        let Some(database) = databases
            .into_iter()
            .find(|database| database.name == self.options.database_name)
        else {
            error!(database = %self.options.database_name, "database not found in target");
            return Ok(false);
        };

        info!(database = %database.name, "triggering schema sync");
        self.target_api
            .post(&format!("/api/database/{}/sync_schema", database.id), None)
            .await?;
        info!(
            seconds = self.options.schema_sync_wait.as_secs(),
            "waiting for schema sync"
        );
        tokio::time::sleep(self.options.schema_sync_wait).await;

        let metadata: DatabaseMetadata = fetch_as(
            self.target_api.as_ref(),
            &format!("/api/database/{}/metadata?include_hidden=true", database.id),
        )
        .await?;
        let data_sets: HashMap<String, DataSet> = self
            .schema_registry
            .list_data_sets()
            .await?
            .into_iter()
            .map(|data_set| (data_set.name().to_owned(), data_set))
            .collect();

        let mut summary = MetadataSyncSummary::default();
        for table in &metadata.tables {
            match data_sets.get(&table.name) {
                Some(data_set) => {
                    info!(table = %table.name, "updating table metadata");
                    self.annotate_table(table, data_set, &mut summary).await?;
                    self.sync_metrics(table, data_set, &mut summary).await?;
                }
                None => self.hide_table(table, &mut summary).await?,
            }
        }

        info!(database = %database.name, "discarding cached field values");
        self.target_api
            .post(&format!("/api/database/{}/discard_values", database.id), None)
            .await?;
        info!(database = %database.name, "rescanning field values");
        self.target_api
            .post(&format!("/api/database/{}/rescan_values", database.id), None)
            .await?;

        info!(
            tables_annotated = summary.tables_annotated,
            tables_hidden = summary.tables_hidden,
            fields_updated = summary.fields_updated,
            fields_skipped = summary.fields_skipped,
            metrics_created = summary.metrics_created,
            metrics_updated = summary.metrics_updated,
            metrics_archived = summary.metrics_archived,
            metrics_skipped = summary.metrics_skipped,
            "metadata sync finished"
        );
        Ok(true)
    }
}
