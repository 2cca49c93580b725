use async_trait::async_trait;
use schemabridge_core::{AppError, AppResult};
use schemabridge_domain::ListResponse;
use serde::de::DeserializeOwned;
use serde_json::Value;

/// Authenticated REST gateway to the target business-intelligence system.
///
/// Each call is one round-trip; implementations do not retry.
#[async_trait]
pub trait TargetApi: Send + Sync {
    /// Issues a GET and returns the parsed JSON body.
    async fn get(&self, path: &str) -> AppResult<Value>;

    /// Issues a POST with an optional JSON body.
    async fn post(&self, path: &str, body: Option<Value>) -> AppResult<Value>;

    /// Issues a PUT with a JSON body.
    async fn put(&self, path: &str, body: Value) -> AppResult<Value>;

    /// Issues a DELETE.
    async fn delete(&self, path: &str) -> AppResult<()>;
}

/// Fetches a path and decodes the response into `T`.
pub async fn fetch_as<T: DeserializeOwned>(api: &dyn TargetApi, path: &str) -> AppResult<T> {
    let value = api.get(path).await?;
    serde_json::from_value(value).map_err(|error| {
        AppError::Internal(format!("unexpected response shape from '{path}': {error}"))
    })
}

/// Fetches a list endpoint, accepting bare arrays and `data` envelopes.
pub async fn fetch_list<T: DeserializeOwned>(api: &dyn TargetApi, path: &str) -> AppResult<Vec<T>> {
    fetch_as::<ListResponse<T>>(api, path)
        .await
        .map(ListResponse::into_items)
}
