use std::collections::HashMap;

use schemabridge_core::{AppError, AppResult, NonEmptyString};
use serde::{Deserialize, Serialize};

use crate::formula::{render_display_formula, render_formula_template};

/// Aggregation applied by a simple metric.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Aggregation {
    /// Sum of values.
    Sum,
    /// Average of values.
    Avg,
    /// Number of rows.
    Count,
    /// Number of distinct values.
    DistinctCount,
}

impl Aggregation {
    /// Returns the stable source-side value.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Sum => "sum",
            Self::Avg => "avg",
            Self::Count => "count",
            Self::DistinctCount => "distinct-count",
        }
    }

    /// Returns the aggregation token of the target query language.
    #[must_use]
    pub fn target_token(&self) -> &'static str {
        match self {
            Self::DistinctCount => "distinct",
            other => other.as_str(),
        }
    }

    fn display_name(&self) -> &'static str {
        match self {
            Self::Sum => "SUM",
            Self::Avg => "AVG",
            Self::Count => "COUNT",
            Self::DistinctCount => "COUNT DISTINCT",
        }
    }
}

/// Measure defined as one aggregation over one field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SimpleMetric {
    name: NonEmptyString,
    description: String,
    field_name: NonEmptyString,
    aggregation: Aggregation,
}

impl SimpleMetric {
    /// Creates a simple metric.
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        field_name: impl Into<String>,
        aggregation: Aggregation,
    ) -> AppResult<Self> {
        Ok(Self {
            name: NonEmptyString::new(name)?,
            description: description.into(),
            field_name: NonEmptyString::new(field_name)?,
            aggregation,
        })
    }

    /// Returns the metric name.
    #[must_use]
    pub fn name(&self) -> &str {
        self.name.as_str()
    }

    /// Returns the name of the aggregated field.
    #[must_use]
    pub fn field_name(&self) -> &str {
        self.field_name.as_str()
    }

    /// Returns the aggregation kind.
    #[must_use]
    pub fn aggregation(&self) -> Aggregation {
        self.aggregation
    }
}

/// Measure defined as an algebraic formula over other metrics.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComposedMetric {
    name: NonEmptyString,
    description: String,
    formula_template: NonEmptyString,
    parent_metrics: Vec<MetricDefinition>,
}

impl ComposedMetric {
    /// Creates a composed metric; the template must only reference existing parents.
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        formula_template: impl Into<String>,
        parent_metrics: Vec<MetricDefinition>,
    ) -> AppResult<Self> {
        let formula_template = NonEmptyString::new(formula_template)?;
        render_formula_template(formula_template.as_str(), parent_metrics.len())?;

        Ok(Self {
            name: NonEmptyString::new(name)?,
            description: description.into(),
            formula_template,
            parent_metrics,
        })
    }

    /// Returns the metric name.
    #[must_use]
    pub fn name(&self) -> &str {
        self.name.as_str()
    }

    /// Returns the formula template with positional placeholders.
    #[must_use]
    pub fn formula_template(&self) -> &str {
        self.formula_template.as_str()
    }

    /// Returns parent metrics in declaration order.
    #[must_use]
    pub fn parent_metrics(&self) -> &[MetricDefinition] {
        &self.parent_metrics
    }
}

/// Internal metric definition sourced from the schema registry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MetricDefinition {
    /// Aggregation over a field.
    Simple(SimpleMetric),
    /// Formula over parent metrics.
    Composed(ComposedMetric),
}

impl MetricDefinition {
    /// Returns the metric name.
    #[must_use]
    pub fn name(&self) -> &str {
        match self {
            Self::Simple(metric) => metric.name(),
            Self::Composed(metric) => metric.name(),
        }
    }

    /// Returns the human description.
    #[must_use]
    pub fn description(&self) -> &str {
        match self {
            Self::Simple(metric) => metric.description.as_str(),
            Self::Composed(metric) => metric.description.as_str(),
        }
    }

    /// Returns a human-readable rendering of how the metric is calculated.
    #[must_use]
    pub fn display_formula(&self) -> String {
        match self {
            Self::Simple(metric) => format!(
                "{}({})",
                metric.aggregation.display_name(),
                metric.field_name()
            ),
            Self::Composed(metric) => {
                let names: Vec<&str> = metric
                    .parent_metrics
                    .iter()
                    .map(MetricDefinition::name)
                    .collect();
                render_display_formula(metric.formula_template(), &names)
                    .unwrap_or_else(|_| metric.formula_template().to_owned())
            }
        }
    }
}

/// Metric as declared in the registry, with parents referenced by name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum MetricSpec {
    /// Simple metric declaration.
    Simple {
        /// Metric name.
        name: String,
        /// Human description.
        #[serde(default)]
        description: String,
        /// Aggregation kind.
        aggregation: Aggregation,
        /// Aggregated field; defaults to the metric name.
        #[serde(default)]
        field: Option<String>,
    },
    /// Composed metric declaration.
    Composed {
        /// Metric name.
        name: String,
        /// Human description.
        #[serde(default)]
        description: String,
        /// Template such as `{0}/{1}`.
        formula_template: String,
        /// Names of parent metrics in placeholder order.
        parent_metrics: Vec<String>,
    },
}

impl MetricSpec {
    fn name(&self) -> &str {
        match self {
            Self::Simple { name, .. } | Self::Composed { name, .. } => name.as_str(),
        }
    }
}

/// Resolves registry declarations into full definitions, in declaration order.
///
/// Parents are embedded by value. Unknown parents and cycles are rejected.
pub fn resolve_metric_specs(specs: &[MetricSpec]) -> AppResult<Vec<MetricDefinition>> {
    let mut by_name: HashMap<&str, &MetricSpec> = HashMap::new();
    for spec in specs {
        if by_name.insert(spec.name(), spec).is_some() {
            return Err(AppError::Validation(format!(
                "metric '{}' is declared more than once",
                spec.name()
            )));
        }
    }

    let mut resolved = HashMap::new();
    specs
        .iter()
        .map(|spec| resolve_metric(spec.name(), &by_name, &mut resolved, &mut Vec::new()))
        .collect()
}

fn resolve_metric(
    name: &str,
    by_name: &HashMap<&str, &MetricSpec>,
    resolved: &mut HashMap<String, MetricDefinition>,
    visiting: &mut Vec<String>,
) -> AppResult<MetricDefinition> {
    if let Some(definition) = resolved.get(name) {
        return Ok(definition.clone());
    }

    if visiting.iter().any(|visited| visited == name) {
        return Err(AppError::Validation(format!(
            "metric '{name}' depends on itself via {}",
            visiting.join(" -> ")
        )));
    }

    let spec = by_name
        .get(name)
        .ok_or_else(|| AppError::Validation(format!("unknown parent metric '{name}'")))?;

    let definition = match spec {
        MetricSpec::Simple {
            name,
            description,
            aggregation,
            field,
        } => MetricDefinition::Simple(SimpleMetric::new(
            name.as_str(),
            description.as_str(),
            field.clone().unwrap_or_else(|| name.clone()),
            *aggregation,
        )?),
        MetricSpec::Composed {
            name,
            description,
            formula_template,
            parent_metrics,
        } => {
            visiting.push(name.clone());
            let parents = parent_metrics
                .iter()
                .map(|parent| resolve_metric(parent, by_name, resolved, visiting))
                .collect::<AppResult<Vec<_>>>()?;
            visiting.pop();

            MetricDefinition::Composed(ComposedMetric::new(
                name.as_str(),
                description.as_str(),
                formula_template.as_str(),
                parents,
            )?)
        }
    };

    resolved.insert(name.to_owned(), definition.clone());
    Ok(definition)
}
