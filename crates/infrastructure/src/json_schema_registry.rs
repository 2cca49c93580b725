//! Schema registry read from a JSON document on disk.

use std::path::PathBuf;

use async_trait::async_trait;
use schemabridge_application::SchemaRegistry;
use schemabridge_core::{AppError, AppResult};
use schemabridge_domain::{AttributeDefinition, DataSet, MetricSpec, resolve_metric_specs};
use serde::Deserialize;
use tracing::debug;

#[derive(Debug, Deserialize)]
struct RegistryDocument {
    data_sets: Vec<DataSetDocument>,
}

#[derive(Debug, Deserialize)]
struct DataSetDocument {
    name: String,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    attributes: Vec<AttributeDefinition>,
    #[serde(default)]
    metrics: Vec<MetricSpec>,
}

/// Re-reads the registry document on every call.
#[derive(Debug, Clone)]
pub struct JsonSchemaRegistry {
    path: PathBuf,
}

impl JsonSchemaRegistry {
    /// Creates a registry backed by the document at `path`.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

/// Parses a registry document and resolves metric parents.
pub fn parse_registry_document(document: &str) -> AppResult<Vec<DataSet>> {
    let document: RegistryDocument = serde_json::from_str(document)
        .map_err(|error| AppError::Validation(format!("invalid schema registry: {error}")))?;

    document
        .data_sets
        .into_iter()
        .map(|data_set| {
            let metrics = resolve_metric_specs(&data_set.metrics).map_err(|error| {
                AppError::Validation(format!("data set '{}': {error}", data_set.name))
            })?;
            DataSet::new(
                data_set.name,
                data_set.description,
                data_set.attributes,
                metrics,
            )
        })
        .collect()
}

#[async_trait]
impl SchemaRegistry for JsonSchemaRegistry {
    async fn list_data_sets(&self) -> AppResult<Vec<DataSet>> {
        let document = tokio::fs::read_to_string(&self.path).await.map_err(|error| {
            AppError::Internal(format!(
                "failed to read schema registry '{}': {error}",
                self.path.display()
            ))
        })?;

        let data_sets = parse_registry_document(&document)?;
        debug!(path = %self.path.display(), count = data_sets.len(), "loaded schema registry");
        Ok(data_sets)
    }
}
