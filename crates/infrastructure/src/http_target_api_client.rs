//! Session-authenticated REST client for the target business-intelligence system.

use async_trait::async_trait;
use reqwest::{Method, StatusCode};
use schemabridge_application::TargetApi;
use schemabridge_core::{AppError, AppResult};
use serde::Deserialize;
use serde_json::{Value, json};
use tokio::sync::Mutex;
use tracing::{debug, info};


const SESSION_HEADER: &str = "X-Metabase-Session";

/// Login of the account the client authenticates as.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetCredentials {
    /// Login email.
    pub username: String,
    /// Login password.
    pub password: String,
}

#[derive(Debug, Deserialize)]
struct SessionResponse {
    id: String,
}

/// `reqwest` implementation of the target API port.
///
/// Logs in lazily on first use and caches the session token. A request
/// rejected with 401 drops the token, logs in once more and is reissued once.
pub struct HttpTargetApiClient {
    http_client: reqwest::Client,
    base_url: String,
    credentials: TargetCredentials,
    session_token: Mutex<Option<String>>,
}

impl HttpTargetApiClient {
    /// Creates a client for the target reachable at `base_url`.
    #[must_use]
    pub fn new(
        http_client: reqwest::Client,
        base_url: &str,
        credentials: TargetCredentials,
    ) -> Self {
        Self {
            http_client,
            base_url: base_url.trim_end_matches('/').to_owned(),
            credentials,
            session_token: Mutex::new(None),
        }
    }

    async fn request(&self, method: Method, path: &str, body: Option<&Value>) -> AppResult<Value> {
        let token = self.session_token().await?;
        let response = self.send(method.clone(), path, body, &token).await?;
        if response.status() != StatusCode::UNAUTHORIZED {
            return decode_response(response, &method, path).await;
        }

        info!(path, "session rejected, logging in again");
        self.drop_session(&token).await;
        let token = self.session_token().await?;
        let response = self.send(method.clone(), path, body, &token).await?;
        if response.status() == StatusCode::UNAUTHORIZED {
            return Err(AppError::Unauthorized(format!(
                "{method} {path} rejected after renewing the session"
            )));
        }

        decode_response(response, &method, path).await
    }

    async fn send(
        &self,
        method: Method,
        path: &str,
        body: Option<&Value>,
        token: &str,
    ) -> AppResult<reqwest::Response> {
        debug!(method = %method, path, "target request");
        let mut builder = self
            .http_client
            .request(method.clone(), format!("{}{path}", self.base_url))
            .header(SESSION_HEADER, token);
        if let Some(body) = body {
            builder = builder.json(body);
        }

        builder
            .send()
            .await
            .map_err(|error| AppError::Transport(format!("{method} {path} failed: {error}")))
    }

    async fn session_token(&self) -> AppResult<String> {
        let mut cached = self.session_token.lock().await;
        if let Some(token) = cached.as_ref() {
            return Ok(token.clone());
        }

        let token = self.login().await?;
        *cached = Some(token.clone());
        Ok(token)
    }

    async fn drop_session(&self, rejected: &str) {
        let mut cached = self.session_token.lock().await;
        if cached.as_deref() == Some(rejected) {
            *cached = None;
        }
    }

    async fn login(&self) -> AppResult<String> {
        info!(username = %self.credentials.username, "logging in to target");
        let response = self
            .http_client
            .post(format!("{}/api/session", self.base_url))
            .json(&json!({
                "username": self.credentials.username,
                "password": self.credentials.password,
            }))
            .send()
            .await
            .map_err(|error| AppError::Transport(format!("login failed: {error}")))?;

        let status = response.status();
        if matches!(
            status,
            StatusCode::BAD_REQUEST | StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN
        ) {
            return Err(AppError::Unauthorized(format!(
                "target rejected credentials of '{}' with status {status}",
                self.credentials.username
            )));
        }

        let session: SessionResponse = serde_json::from_value(
            decode_response(response, &Method::POST, "/api/session").await?,
        )
        .map_err(|error| AppError::Internal(format!("unexpected login response: {error}")))?;
        Ok(session.id)
    }
}

async fn decode_response(response: reqwest::Response, method: &Method, path: &str) -> AppResult<Value> {
    let status = response.status();
    let body = response
        .text()
        .await
        .map_err(|error| AppError::Transport(format!("{method} {path} body unreadable: {error}")))?;

    if !status.is_success() {
        return Err(AppError::Http {
            status: status.as_u16(),
            body,
        });
    }
    if body.trim().is_empty() {
        return Ok(Value::Null);
    }

    serde_json::from_str(&body).map_err(|error| {
        AppError::Internal(format!("{method} {path} returned invalid JSON: {error}"))
    })
}

#[async_trait]
impl TargetApi for HttpTargetApiClient {
    async fn get(&self, path: &str) -> AppResult<Value> {
        self.request(Method::GET, path, None).await
    }

    async fn post(&self, path: &str, body: Option<Value>) -> AppResult<Value> {
        self.request(Method::POST, path, body.as_ref()).await
    }

    async fn put(&self, path: &str, body: Value) -> AppResult<Value> {
        self.request(Method::PUT, path, Some(&body)).await
    }

    async fn delete(&self, path: &str) -> AppResult<()> {
        self.request(Method::DELETE, path, None).await.map(|_| ())
    }
}
