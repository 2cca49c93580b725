use schemabridge_domain::{FormulaTranslator, MetricDefinition, TargetTableMetadata};
use serde_json::{Value, json};
use tracing::warn;

use super::*;

impl MetadataSyncService {
    pub(super) async fn sync_metrics(
        &self,
        table: &TargetTableMetadata,
        data_set: &DataSet,
        summary: &mut MetadataSyncSummary,
    ) -> AppResult<()> {
        let translator = FormulaTranslator::new(&table.name, &table.fields);

        // Translation is pure; any failure concerns this metric only.
        for metric in data_set.metrics() {
            let payload = match translator.translate(metric) {
                Ok(aggregation) => metric_payload(table.id, metric, aggregation),
                Err(error) => {
                    warn!(table = %table.name, metric = %metric.name(), error = %error, "skipping metric");
                    summary.metrics_skipped += 1;
                    continue;
                }
            };

            let existing = table
                .metrics
                .iter()
                .find(|existing| existing.name == metric.name());
            let result = match existing {
                Some(existing) => {
                    let mut payload = payload;
                    payload["archived"] = json!(false);
                    self.target_api
                        .put(&format!("/api/metric/{}", existing.id), payload)
                        .await
                        .map(|_| summary.metrics_updated += 1)
                }
                None => self
                    .target_api
                    .post("/api/metric", Some(payload))
                    .await
                    .map(|_| summary.metrics_created += 1),
            };

            match result {
                Ok(()) => {}
                Err(error) if error.is_item_level() => {
                    error!(table = %table.name, metric = %metric.name(), error = %error, "failed to write metric");
                    summary.metrics_skipped += 1;
                }
                Err(error) => return Err(error),
            }
        }

        for stale in table
            .metrics
            .iter()
            .filter(|existing| !existing.archived && !data_set.has_metric(&existing.name))
        {
            info!(table = %table.name, metric = %stale.name, "archiving metric");
            self.target_api
                .put(
                    &format!("/api/metric/{}", stale.id),
                    json!({ "archived": true, "revision_message": REVISION_MESSAGE }),
                )
                .await?;
            summary.metrics_archived += 1;
        }

        Ok(())
    }
}

/// Builds the create/update payload of a metric from its translated aggregation.
///
/// Composed metrics are wrapped so the target labels them with their
/// human-readable formula instead of the raw expression.
pub(super) fn metric_payload(table_id: i64, metric: &MetricDefinition, aggregation: Value) -> Value {
    let aggregation = match metric {
        MetricDefinition::Simple(_) => aggregation,
        MetricDefinition::Composed(_) => json!([
            "aggregation-options",
            aggregation,
            { "display-name": metric.display_formula() }
        ]),
    };

    json!({
        "name": metric.name(),
        "description": metric.description(),
        "table_id": table_id,
        "definition": {
            "source-table": table_id,
            "aggregation": [aggregation],
        },
        "show_in_getting_started": false,
        "how_is_this_calculated": metric.display_formula(),
        "revision_message": REVISION_MESSAGE,
    })
}
