use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::acl::{AclResource, PermissionGrant, role_can_access};
use crate::identity::{ADMINISTRATORS_GROUP, ALL_USERS_GROUP};
use crate::target::TargetTable;

/// Native-query access of a group to a database.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NativeAccess {
    /// Native queries allowed.
    Write,
    /// Native queries denied.
    None,
}

/// Coarse access of a group to every schema of a database.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SchemaAccess {
    /// Every schema readable.
    All,
    /// No schema readable.
    None,
}

/// Access of a group to a single table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TableAccess {
    /// Table readable.
    All,
    /// Table hidden.
    None,
}

/// Table permissions of one group, grouped by schema then table id.
pub type SchemaTablePermissions = BTreeMap<String, BTreeMap<i64, TableAccess>>;

/// Access of one group to one database.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum DatabaseAccess {
    /// Database-wide access used by the reserved groups.
    Coarse {
        /// Native query access.
        native: NativeAccess,
        /// Schema access.
        schemas: SchemaAccess,
    },
    /// Per-table access.
    Tables {
        /// Schema name to table id to access.
        schemas: SchemaTablePermissions,
    },
}

impl DatabaseAccess {
    /// Full write access to every schema.
    #[must_use]
    pub fn full() -> Self {
        Self::Coarse {
            native: NativeAccess::Write,
            schemas: SchemaAccess::All,
        }
    }

    /// No access at all.
    #[must_use]
    pub fn none() -> Self {
        Self::Coarse {
            native: NativeAccess::None,
            schemas: SchemaAccess::None,
        }
    }
}

/// Full group to database access matrix pushed to the target in one write.
///
/// `revision` is the optimistic-concurrency token the graph was read at.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PermissionGraph {
    /// Revision token of the graph this one replaces.
    pub revision: i64,
    /// Group id to database id to access.
    pub groups: BTreeMap<i64, BTreeMap<i64, DatabaseAccess>>,
}

impl PermissionGraph {
    /// Creates an empty graph bound to a revision token.
    #[must_use]
    pub fn new(revision: i64) -> Self {
        Self {
            revision,
            groups: BTreeMap::new(),
        }
    }

    /// Sets the access of a group to a database.
    pub fn grant(&mut self, group_id: i64, database_id: i64, access: DatabaseAccess) {
        self.groups
            .entry(group_id)
            .or_default()
            .insert(database_id, access);
    }
}

/// Everything needed to derive the permission graph of one database.
#[derive(Debug, Clone, Copy)]
pub struct GraphInputs<'a> {
    /// Revision token read from the target.
    pub revision: i64,
    /// Database the graph covers.
    pub database_id: i64,
    /// Target group name to group id.
    pub groups: &'a BTreeMap<String, i64>,
    /// Data set resources known to the ACL model.
    pub resources: &'a [AclResource],
    /// Tables of the database.
    pub tables: &'a [TargetTable],
    /// Granted (subject, resource prefix) pairs.
    pub grants: &'a [PermissionGrant],
}

/// Derives the permission graph from ACL grants.
///
/// Administrators get full access and All Users none. Every other group gets
/// `all` or `none` for every table backing a data set, so revoked access is
/// written back as `none`. A group is left out only when no data set has a
/// table in the database. Resources without a matching table are skipped.
#[must_use]
pub fn derive_permission_graph(inputs: &GraphInputs<'_>) -> PermissionGraph {
    let mut graph = PermissionGraph::new(inputs.revision);

    for (group_name, group_id) in inputs.groups {
        if group_name == ADMINISTRATORS_GROUP {
            graph.grant(*group_id, inputs.database_id, DatabaseAccess::full());
            continue;
        }
        if group_name == ALL_USERS_GROUP {
            graph.grant(*group_id, inputs.database_id, DatabaseAccess::none());
            continue;
        }

        let mut schemas = SchemaTablePermissions::new();
        for resource in inputs.resources {
            let Some(table) = inputs
                .tables
                .iter()
                .find(|table| table.name == resource.name())
            else {
                continue;
            };

            let access = if role_can_access(inputs.grants, group_name, resource) {
                TableAccess::All
            } else {
                TableAccess::None
            };
            schemas
                .entry(table.schema.clone().unwrap_or_default())
                .or_default()
                .insert(table.id, access);
        }

        if !schemas.is_empty() {
            graph.grant(
                *group_id,
                inputs.database_id,
                DatabaseAccess::Tables { schemas },
            );
        }
    }

    graph
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use schemabridge_core::AppResult;
    use serde_json::json;

    use super::{
        DatabaseAccess, GraphInputs, PermissionGraph, SchemaTablePermissions, TableAccess,
        derive_permission_graph,
    };
    use crate::acl::{PermissionGrant, data_set_resources};
    use crate::target::TargetTable;

    fn table(id: i64, name: &str) -> TargetTable {
        TargetTable {
            id,
            name: name.to_owned(),
            schema: Some("public".to_owned()),
            db_id: 1,
        }
    }

    fn grant(subject_key: &str, resource_key: &str) -> PermissionGrant {
        PermissionGrant {
            subject_key: subject_key.to_owned(),
            resource_key: resource_key.to_owned(),
        }
    }

    fn public_tables(tables: &[(i64, TableAccess)]) -> DatabaseAccess {
        let mut schemas = SchemaTablePermissions::new();
        schemas.insert("public".to_owned(), tables.iter().copied().collect());
        DatabaseAccess::Tables { schemas }
    }

    fn databases(database_id: i64, access: DatabaseAccess) -> BTreeMap<i64, DatabaseAccess> {
        BTreeMap::from([(database_id, access)])
    }

    #[test]
    fn graph_serializes_in_target_shape() -> Result<(), serde_json::Error> {
        let mut graph = PermissionGraph::new(7);
        graph.grant(2, 1, DatabaseAccess::full());
        graph.grant(1, 1, DatabaseAccess::none());
        graph.grant(
            5,
            1,
            public_tables(&[(10, TableAccess::All), (11, TableAccess::None)]),
        );

        assert_eq!(
            serde_json::to_value(&graph)?,
            json!({
                "revision": 7,
                "groups": {
                    "1": {"1": {"native": "none", "schemas": "none"}},
                    "2": {"1": {"native": "write", "schemas": "all"}},
                    "5": {"1": {"schemas": {"public": {"10": "all", "11": "none"}}}}
                }
            })
        );
        Ok(())
    }

    #[test]
    fn empty_graph_keeps_revision_only() -> Result<(), serde_json::Error> {
        let graph = PermissionGraph::new(3);
        assert_eq!(
            serde_json::to_value(&graph)?,
            json!({"revision": 3, "groups": {}})
        );
        Ok(())
    }

    #[test]
    fn analysts_read_only_granted_tables() -> AppResult<()> {
        let groups = BTreeMap::from([
            ("Administrators".to_owned(), 2),
            ("All Users".to_owned(), 1),
            ("Analysts".to_owned(), 5),
        ]);
        let resources = data_set_resources(["Orders", "Customers"])?;
        let tables = vec![table(10, "Orders"), table(11, "Customers")];
        let grants = vec![grant("role:Analysts", "resource:Metabase/Orders")];

        let graph = derive_permission_graph(&GraphInputs {
            revision: 7,
            database_id: 1,
            groups: &groups,
            resources: &resources,
            tables: &tables,
            grants: &grants,
        });

        assert_eq!(graph.groups.get(&2), Some(&databases(1, DatabaseAccess::full())));
        assert_eq!(graph.groups.get(&1), Some(&databases(1, DatabaseAccess::none())));
        assert_eq!(
            graph.groups.get(&5),
            Some(&databases(
                1,
                public_tables(&[(10, TableAccess::All), (11, TableAccess::None)])
            ))
        );
        Ok(())
    }

    #[test]
    fn root_grant_covers_every_data_set() -> AppResult<()> {
        let groups = BTreeMap::from([("Finance".to_owned(), 9)]);
        let resources = data_set_resources(["Orders", "Customers"])?;
        let tables = vec![table(10, "Orders"), table(11, "Customers")];
        let grants = vec![grant("role:Finance", "resource:Metabase")];

        let graph = derive_permission_graph(&GraphInputs {
            revision: 1,
            database_id: 1,
            groups: &groups,
            resources: &resources,
            tables: &tables,
            grants: &grants,
        });

        assert_eq!(
            graph.groups.get(&9),
            Some(&databases(
                1,
                public_tables(&[(10, TableAccess::All), (11, TableAccess::All)])
            ))
        );
        Ok(())
    }

    #[test]
    fn group_without_grants_has_every_table_revoked() -> AppResult<()> {
        let groups = BTreeMap::from([("Interns".to_owned(), 6)]);
        let resources = data_set_resources(["Orders"])?;
        let tables = vec![table(10, "Orders")];
        let grants = vec![grant("role:Analysts", "resource:Metabase/Orders")];

        let graph = derive_permission_graph(&GraphInputs {
            revision: 4,
            database_id: 1,
            groups: &groups,
            resources: &resources,
            tables: &tables,
            grants: &grants,
        });

        assert_eq!(graph.revision, 4);
        assert_eq!(
            graph.groups.get(&6),
            Some(&databases(1, public_tables(&[(10, TableAccess::None)])))
        );
        Ok(())
    }

    #[test]
    fn group_is_omitted_when_no_table_backs_a_data_set() -> AppResult<()> {
        let groups = BTreeMap::from([("Analysts".to_owned(), 5)]);
        let resources = data_set_resources(["Returns"])?;
        let tables = vec![table(10, "Orders")];
        let grants = vec![grant("role:Analysts", "resource:Metabase")];

        let graph = derive_permission_graph(&GraphInputs {
            revision: 2,
            database_id: 1,
            groups: &groups,
            resources: &resources,
            tables: &tables,
            grants: &grants,
        });

        assert!(graph.groups.is_empty());
        Ok(())
    }

    #[test]
    fn resources_without_tables_are_skipped() -> AppResult<()> {
        let groups = BTreeMap::from([("Analysts".to_owned(), 5)]);
        let resources = data_set_resources(["Orders", "Returns"])?;
        let tables = vec![table(10, "Orders")];
        let grants = vec![grant("role:Analysts", "resource:Metabase")];

        let graph = derive_permission_graph(&GraphInputs {
            revision: 1,
            database_id: 3,
            groups: &groups,
            resources: &resources,
            tables: &tables,
            grants: &grants,
        });

        assert_eq!(
            graph.groups.get(&5),
            Some(&databases(3, public_tables(&[(10, TableAccess::All)])))
        );
        Ok(())
    }
}
