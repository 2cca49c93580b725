use std::collections::HashSet;

use schemabridge_core::{AppError, AppResult, NonEmptyString};
use serde::{Deserialize, Serialize};

use crate::metric::MetricDefinition;

/// Attribute of a data set, mirrored as a column of its flattened table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttributeDefinition {
    /// Column name in the flattened table.
    pub name: String,
    /// Human description.
    #[serde(default)]
    pub description: Option<String>,
}

/// Data set of the schema registry: one flattened table with attributes and metrics.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataSet {
    name: NonEmptyString,
    description: Option<String>,
    attributes: Vec<AttributeDefinition>,
    metrics: Vec<MetricDefinition>,
}

impl DataSet {
    /// Creates a validated data set; metric names must be unique.
    pub fn new(
        name: impl Into<String>,
        description: Option<String>,
        attributes: Vec<AttributeDefinition>,
        metrics: Vec<MetricDefinition>,
    ) -> AppResult<Self> {
        let name = NonEmptyString::new(name)?;

        let mut seen = HashSet::new();
        for metric in &metrics {
            if !seen.insert(metric.name()) {
                return Err(AppError::Validation(format!(
                    "data set '{}' declares metric '{}' more than once",
                    name,
                    metric.name()
                )));
            }
        }

        Ok(Self {
            name,
            description,
            attributes,
            metrics,
        })
    }

    /// Returns the data set name, which equals its table name in the target.
    #[must_use]
    pub fn name(&self) -> &str {
        self.name.as_str()
    }

    /// Returns the human description.
    #[must_use]
    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    /// Returns all attributes.
    #[must_use]
    pub fn attributes(&self) -> &[AttributeDefinition] {
        &self.attributes
    }

    /// Finds the attribute backing a column.
    #[must_use]
    pub fn attribute(&self, column_name: &str) -> Option<&AttributeDefinition> {
        self.attributes
            .iter()
            .find(|attribute| attribute.name == column_name)
    }

    /// Returns metrics in declaration order.
    #[must_use]
    pub fn metrics(&self) -> &[MetricDefinition] {
        &self.metrics
    }

    /// Returns whether the data set defines a metric with this name.
    #[must_use]
    pub fn has_metric(&self, name: &str) -> bool {
        self.metrics.iter().any(|metric| metric.name() == name)
    }
}
