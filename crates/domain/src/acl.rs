use schemabridge_core::{AppResult, NonEmptyString};
use serde::{Deserialize, Serialize};

/// Name of the root resource every data set resource hangs under.
pub const ROOT_RESOURCE_NAME: &str = "Metabase";

const SUBJECT_KEY_PREFIX: &str = "role:";
const RESOURCE_KEY_PREFIX: &str = "resource:";

/// Returns the ACL subject key of a role.
#[must_use]
pub fn role_subject_key(role_name: &str) -> String {
    format!("{SUBJECT_KEY_PREFIX}{role_name}")
}

/// Protectable entity of the ACL model, addressed by its path from the root.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AclResource {
    path: Vec<String>,
}

impl AclResource {
    /// Returns the root resource.
    #[must_use]
    pub fn root() -> Self {
        Self {
            path: vec![ROOT_RESOURCE_NAME.to_owned()],
        }
    }

    /// Creates a child resource.
    pub fn child(&self, name: impl Into<String>) -> AppResult<Self> {
        let mut path = self.path.clone();
        path.push(NonEmptyString::new(name)?.into());
        Ok(Self { path })
    }

    /// Returns the resource's own name.
    #[must_use]
    pub fn name(&self) -> &str {
        self.path.last().map(String::as_str).unwrap_or_default()
    }

    /// Returns the key the ACL store uses for this resource.
    #[must_use]
    pub fn key(&self) -> String {
        format!("{RESOURCE_KEY_PREFIX}{}", self.path.join("/"))
    }
}

/// Builds one resource per data set under the root resource.
pub fn data_set_resources<'a>(
    data_set_names: impl IntoIterator<Item = &'a str>,
) -> AppResult<Vec<AclResource>> {
    let root = AclResource::root();
    data_set_names
        .into_iter()
        .map(|name| root.child(name))
        .collect()
}

/// Grant row of the ACL store: a subject may access every resource whose key
/// starts with `resource_key`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PermissionGrant {
    /// Subject key, for example `role:Analysts`.
    pub subject_key: String,
    /// Resource key prefix, for example `resource:Metabase`.
    pub resource_key: String,
}

impl PermissionGrant {
    /// Returns whether this grant covers the subject and resource.
    #[must_use]
    pub fn covers(&self, subject_key: &str, resource: &AclResource) -> bool {
        self.subject_key == subject_key && resource.key().starts_with(self.resource_key.as_str())
    }
}

/// Returns whether any grant gives the role access to the resource.
#[must_use]
pub fn role_can_access(grants: &[PermissionGrant], role_name: &str, resource: &AclResource) -> bool {
    let subject_key = role_subject_key(role_name);
    grants
        .iter()
        .any(|grant| grant.covers(subject_key.as_str(), resource))
}
