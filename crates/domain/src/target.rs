//! Records of the target business-intelligence system as returned by its API.
//!
//! Unknown attributes are ignored; only what reconciliation reads is modelled.

use serde::{Deserialize, Serialize};

/// Database connected to the target system.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TargetDatabase {
    /// Target id.
    pub id: i64,
    /// Display name.
    pub name: String,
}

/// Permission group of the target system.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TargetGroup {
    /// Target id.
    pub id: i64,
    /// Unique group name.
    pub name: String,
}

/// User account of the target system.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TargetUser {
    /// Target id.
    pub id: i64,
    /// Unique email.
    pub email: String,
    /// Whether the account is active.
    #[serde(default = "default_active")]
    pub is_active: bool,
}

fn default_active() -> bool {
    true
}

/// Table as listed by the table endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TargetTable {
    /// Target id.
    pub id: i64,
    /// Table name.
    pub name: String,
    /// Schema the table lives in.
    #[serde(default)]
    pub schema: Option<String>,
    /// Owning database id.
    pub db_id: i64,
}

/// Field of a target table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TargetField {
    /// Target id.
    pub id: i64,
    /// Column name.
    pub name: String,
}

/// Metric stored in the target system.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TargetMetric {
    /// Target id.
    pub id: i64,
    /// Metric name.
    pub name: String,
    /// Whether the metric is archived.
    #[serde(default)]
    pub archived: bool,
}

/// Table with its fields and metrics from the database metadata endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TargetTableMetadata {
    /// Target id.
    pub id: i64,
    /// Table name.
    pub name: String,
    /// Schema the table lives in.
    #[serde(default)]
    pub schema: Option<String>,
    /// Fields in database order.
    #[serde(default)]
    pub fields: Vec<TargetField>,
    /// Metrics defined on the table.
    #[serde(default)]
    pub metrics: Vec<TargetMetric>,
}

/// Full metadata of one target database.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatabaseMetadata {
    /// Tables including hidden ones.
    #[serde(default)]
    pub tables: Vec<TargetTableMetadata>,
}

/// List payload; newer target versions wrap lists in a `data` envelope.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum ListResponse<T> {
    /// Bare JSON array.
    Bare(Vec<T>),
    /// `{"data": [...]}` envelope.
    Envelope {
        /// Listed items.
        data: Vec<T>,
    },
}

impl<T> ListResponse<T> {
    /// Returns the listed items.
    #[must_use]
    pub fn into_items(self) -> Vec<T> {
        match self {
            Self::Bare(items) | Self::Envelope { data: items } => items,
        }
    }
}
