use async_trait::async_trait;
use schemabridge_core::AppResult;
use schemabridge_domain::{DataSet, PermissionGrant, Role};

/// Source-of-truth store of users, roles and permissions.
#[async_trait]
pub trait AclStore: Send + Sync {
    /// Lists every role with its member emails.
    async fn list_roles(&self) -> AppResult<Vec<Role>>;

    /// Lists every granted (subject key, resource key prefix) pair.
    async fn list_permission_grants(&self) -> AppResult<Vec<PermissionGrant>>;
}

/// Source-of-truth registry of data sets and their metrics.
#[async_trait]
pub trait SchemaRegistry: Send + Sync {
    /// Lists every data set with resolved metric definitions.
    async fn list_data_sets(&self) -> AppResult<Vec<DataSet>>;
}
