//! Domain entities, invariants and the pure reconciliation algorithms.

#![forbid(unsafe_code)]

mod acl;
mod connection;
mod data_set;
pub mod formula;
mod identity;
mod metric;
mod permission_graph;
mod target;

pub use acl::{
    AclResource, PermissionGrant, ROOT_RESOURCE_NAME, data_set_resources, role_can_access,
    role_subject_key,
};
pub use connection::DatabaseConnection;
pub use data_set::{AttributeDefinition, DataSet};
pub use formula::FormulaTranslator;
pub use identity::{
    ADMINISTRATORS_GROUP, ALL_USERS_GROUP, GUEST_EMAIL, PersonName, Role, is_reserved_group,
};
pub use metric::{
    Aggregation, ComposedMetric, MetricDefinition, MetricSpec, SimpleMetric, resolve_metric_specs,
};
pub use permission_graph::{
    DatabaseAccess, GraphInputs, NativeAccess, PermissionGraph, SchemaAccess,
    SchemaTablePermissions, TableAccess, derive_permission_graph,
};
pub use target::{
    DatabaseMetadata, ListResponse, TargetDatabase, TargetField, TargetGroup, TargetMetric,
    TargetTable, TargetTableMetadata, TargetUser,
};
