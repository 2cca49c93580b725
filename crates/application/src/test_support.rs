use std::collections::HashMap;

use async_trait::async_trait;
use schemabridge_core::{AppError, AppResult};
use schemabridge_domain::{DataSet, PermissionGrant, Role};
use serde_json::{Value, json};
use tokio::sync::Mutex;

use crate::{AclStore, SchemaRegistry, TargetApi};

/// Call recorded by [`FakeTargetApi`].
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct ApiCall {
    pub method: &'static str,
    pub path: String,
    pub body: Option<Value>,
}

/// In-memory target that answers GETs from canned responses and records writes.
pub(crate) struct FakeTargetApi {
    responses: HashMap<String, Value>,
    failures: HashMap<(&'static str, String), u16>,
    next_id: Mutex<i64>,
    calls: Mutex<Vec<ApiCall>>,
}

impl FakeTargetApi {
    pub(crate) fn new() -> Self {
        Self {
            responses: HashMap::new(),
            failures: HashMap::new(),
            next_id: Mutex::new(100),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn with_response(mut self, path: &str, body: Value) -> Self {
        self.responses.insert(path.to_owned(), body);
        self
    }

    pub(crate) fn with_failure(mut self, method: &'static str, path: &str, status: u16) -> Self {
        self.failures.insert((method, path.to_owned()), status);
        self
    }

    pub(crate) async fn calls(&self) -> Vec<ApiCall> {
        self.calls.lock().await.clone()
    }

    pub(crate) async fn writes(&self) -> Vec<ApiCall> {
        self.calls
            .lock()
            .await
            .iter()
            .filter(|call| call.method != "GET")
            .cloned()
            .collect()
    }

    pub(crate) async fn calls_to(&self, method: &str, path: &str) -> Vec<ApiCall> {
        self.calls
            .lock()
            .await
            .iter()
            .filter(|call| call.method == method && call.path == path)
            .cloned()
            .collect()
    }

    async fn record(&self, method: &'static str, path: &str, body: Option<Value>) -> AppResult<()> {
        self.calls.lock().await.push(ApiCall {
            method,
            path: path.to_owned(),
            body,
        });

        match self.failures.get(&(method, path.to_owned())) {
            Some(status) => Err(AppError::Http {
                status: *status,
                body: "rejected".to_owned(),
            }),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl TargetApi for FakeTargetApi {
    async fn get(&self, path: &str) -> AppResult<Value> {
        self.record("GET", path, None).await?;
        self.responses
            .get(path)
            .cloned()
            .ok_or_else(|| AppError::Http {
                status: 404,
                body: format!("no canned response for {path}"),
            })
    }

    async fn post(&self, path: &str, body: Option<Value>) -> AppResult<Value> {
        self.record("POST", path, body.clone()).await?;
        match body {
            Some(Value::Object(mut fields)) => {
                let mut next_id = self.next_id.lock().await;
                fields.insert("id".to_owned(), json!(*next_id));
                *next_id += 1;
                Ok(Value::Object(fields))
            }
            _ => Ok(Value::Null),
        }
    }

    async fn put(&self, path: &str, body: Value) -> AppResult<Value> {
        self.record("PUT", path, Some(body.clone())).await?;
        Ok(body)
    }

    async fn delete(&self, path: &str) -> AppResult<()> {
        self.record("DELETE", path, None).await
    }
}

/// ACL store backed by fixed roles and grants.
#[derive(Default)]
pub(crate) struct FakeAclStore {
    pub roles: Vec<Role>,
    pub grants: Vec<PermissionGrant>,
}

#[async_trait]
impl AclStore for FakeAclStore {
    async fn list_roles(&self) -> AppResult<Vec<Role>> {
        Ok(self.roles.clone())
    }

    async fn list_permission_grants(&self) -> AppResult<Vec<PermissionGrant>> {
        Ok(self.grants.clone())
    }
}

/// Schema registry backed by fixed data sets that counts its reads.
#[derive(Default)]
pub(crate) struct FakeSchemaRegistry {
    pub data_sets: Vec<DataSet>,
    pub reads: Mutex<usize>,
}

#[async_trait]
impl SchemaRegistry for FakeSchemaRegistry {
    async fn list_data_sets(&self) -> AppResult<Vec<DataSet>> {
        *self.reads.lock().await += 1;
        Ok(self.data_sets.clone())
    }
}

pub(crate) fn role(name: &str, members: &[&str]) -> Role {
    match Role::new(name, members.iter().map(|member| (*member).to_owned()).collect()) {
        Ok(role) => role,
        Err(error) => panic!("invalid role fixture: {error}"),
    }
}

pub(crate) fn grant(subject_key: &str, resource_key: &str) -> PermissionGrant {
    PermissionGrant {
        subject_key: subject_key.to_owned(),
        resource_key: resource_key.to_owned(),
    }
}
