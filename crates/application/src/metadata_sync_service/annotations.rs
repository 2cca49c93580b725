use schemabridge_domain::{AttributeDefinition, TargetTableMetadata};
use serde_json::{Value, json};
use tracing::{debug, warn};

use super::*;

const HIDDEN_FIELD_DESCRIPTION: &str = ">> technical field hidden by schema sync";

impl MetadataSyncService {
    pub(super) async fn annotate_table(
        &self,
        table: &TargetTableMetadata,
        data_set: &DataSet,
        summary: &mut MetadataSyncSummary,
    ) -> AppResult<()> {
        self.target_api
            .put(&format!("/api/table/{}", table.id), table_payload(data_set))
            .await?;
        summary.tables_annotated += 1;

        for field in &table.fields {
            let payload = field_payload(data_set.attribute(&field.name));
            match self
                .target_api
                .put(&format!("/api/field/{}", field.id), payload)
                .await
            {
                Ok(_) => {
                    debug!(table = %table.name, field = %field.name, "updated field");
                    summary.fields_updated += 1;
                }
                Err(error) if error.is_item_level() => {
                    warn!(table = %table.name, field = %field.name, error = %error, "skipping field");
                    summary.fields_skipped += 1;
                }
                Err(error) => return Err(error),
            }
        }

        Ok(())
    }

    pub(super) async fn hide_table(
        &self,
        table: &TargetTableMetadata,
        summary: &mut MetadataSyncSummary,
    ) -> AppResult<()> {
        info!(table = %table.name, "hiding table without data set");
        self.target_api
            .put(
                &format!("/api/table/{}", table.id),
                json!({ "visibility_type": "hidden" }),
            )
            .await?;
        summary.tables_hidden += 1;
        Ok(())
    }
}

fn table_payload(data_set: &DataSet) -> Value {
    json!({
        "description": data_set.description(),
        "show_in_getting_started": true,
        "field_order": "database",
        "visibility_type": null,
    })
}

fn field_payload(attribute: Option<&AttributeDefinition>) -> Value {
    match attribute {
        Some(attribute) => json!({
            "description": attribute
                .description
                .as_deref()
                .filter(|description| !description.is_empty())
                .unwrap_or("tbd"),
            "visibility_type": "normal",
        }),
        None => json!({
            "description": HIDDEN_FIELD_DESCRIPTION,
            "visibility_type": "sensitive",
        }),
    }
}
