//! Metabase API client
//!
//! The [`MetabaseApi`] trait is the boundary to the remote service. The HTTP
//! implementation speaks the session-token protocol: one credential exchange,
//! then every request carries `X-Metabase-Session`.

use crate::config::MetabaseConfig;
use crate::error::SyncError;
use crate::model::{ArtifactRecord, NodeId, RemoteNode, COLLECTION_KIND};
use async_trait::async_trait;
use reqwest::{Client, Response, StatusCode};
use serde::Serialize;
use serde_json::Value;
use std::fmt;
use std::time::Duration;
use tracing::{debug, info};

/// Header carrying the session token on authenticated requests.
pub const SESSION_HEADER: &str = "X-Metabase-Session";

/// Session token returned by `POST /api/session`.
#[derive(Clone, PartialEq, Eq)]
pub struct SessionToken(String);

impl SessionToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for SessionToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SessionToken(..)")
    }
}

/// Read access to the Metabase instance.
#[async_trait]
pub trait MetabaseApi: Send + Sync {
    /// Exchange credentials for a session token.
    async fn authenticate(&self) -> Result<SessionToken, SyncError>;

    /// Top-level collections (`/api/collection/tree`).
    async fn fetch_collection_tree(&self, token: &SessionToken)
        -> Result<Vec<RemoteNode>, SyncError>;

    /// Direct children of one collection, in server order.
    async fn fetch_collection_items(
        &self,
        token: &SessionToken,
        collection: &NodeId,
    ) -> Result<Vec<RemoteNode>, SyncError>;

    /// Every card visible to the session.
    async fn fetch_cards(&self, token: &SessionToken) -> Result<Vec<ArtifactRecord>, SyncError>;

    /// Compile a structured query definition into native SQL.
    async fn compile_query(
        &self,
        token: &SessionToken,
        dataset_query: &Value,
    ) -> Result<String, SyncError>;
}

#[derive(Serialize)]
struct SessionRequest<'a> {
    username: &'a str,
    password: &'a str,
}

fn map_http_error(endpoint: &str, error: reqwest::Error) -> SyncError {
    if error.is_timeout() {
        SyncError::transport(endpoint, format!("Request timeout: {}", error))
    } else if error.is_connect() {
        SyncError::transport(endpoint, format!("Connection error: {}", error))
    } else if error.is_decode() {
        SyncError::transport(endpoint, format!("Failed to decode response: {}", error))
    } else {
        SyncError::transport(endpoint, format!("HTTP error: {}", error))
    }
}

async fn status_error(endpoint: &str, response: Response) -> SyncError {
    let status = response.status();
    let error_text = response
        .text()
        .await
        .unwrap_or_else(|_| "Unknown error".to_string());
    SyncError::transport(
        endpoint,
        format!("Request failed with status {}: {}", status, error_text),
    )
}

fn build_http_client(config: &MetabaseConfig) -> Result<Client, SyncError> {
    Client::builder()
        .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
        .timeout(Duration::from_secs(config.request_timeout_secs))
        .build()
        .map_err(|e| SyncError::Config(format!("Failed to create HTTP client: {}", e)))
}

/// Entries of an items listing: `{"data": [...]}` or a bare array.
fn listing_entries(endpoint: &str, body: Value) -> Result<Vec<Value>, SyncError> {
    match body {
        Value::Array(items) => Ok(items),
        Value::Object(mut map) => match map.remove("data") {
            Some(Value::Array(items)) => Ok(items),
            _ => Err(SyncError::transport(endpoint, "response has no data array")),
        },
        other => Err(SyncError::transport(
            endpoint,
            format!("unexpected response shape: {}", other),
        )),
    }
}

/// Entries that fail to parse are dropped with a debug line; the server owns
/// the schema and a malformed entry should not hide its siblings.
fn parse_nodes(endpoint: &str, entries: Vec<Value>, default_kind: &str) -> Vec<RemoteNode> {
    entries
        .into_iter()
        .filter_map(|entry| match RemoteNode::from_value(entry, default_kind) {
            Ok(node) => Some(node),
            Err(reason) => {
                debug!(endpoint, reason = %reason, "Skipping unparseable entry");
                None
            }
        })
        .collect()
}

/// reqwest-backed client
pub struct HttpMetabaseClient {
    client: Client,
    base_url: String,
    user: String,
    password: String,
}

impl HttpMetabaseClient {
    pub fn new(config: &MetabaseConfig) -> Result<Self, SyncError> {
        let client = build_http_client(config)?;
        Ok(Self {
            client,
            base_url: config.url.trim_end_matches('/').to_string(),
            user: config.user.clone(),
            password: config.password.clone(),
        })
    }

    fn url(&self, endpoint: &str) -> String {
        format!("{}{}", self.base_url, endpoint)
    }

    async fn get_json(&self, token: &SessionToken, endpoint: &str) -> Result<Value, SyncError> {
        info!(endpoint, "visiting");
        let response = self
            .client
            .get(self.url(endpoint))
            .header(SESSION_HEADER, token.as_str())
            .send()
            .await
            .map_err(|e| map_http_error(endpoint, e))?;

        if !response.status().is_success() {
            return Err(status_error(endpoint, response).await);
        }

        response
            .json()
            .await
            .map_err(|e| map_http_error(endpoint, e))
    }
}

#[async_trait]
impl MetabaseApi for HttpMetabaseClient {
    async fn authenticate(&self) -> Result<SessionToken, SyncError> {
        let endpoint = "/api/session";
        info!(endpoint, "visiting");
        let response = self
            .client
            .post(self.url(endpoint))
            .json(&SessionRequest {
                username: &self.user,
                password: &self.password,
            })
            .send()
            .await
            .map_err(|e| SyncError::Auth(map_http_error(endpoint, e).to_string()))?;

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            return Err(SyncError::Auth(format!(
                "credentials rejected for user {} ({})",
                self.user, status
            )));
        }
        if !status.is_success() {
            return Err(SyncError::Auth(status_error(endpoint, response).await.to_string()));
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| SyncError::Auth(format!("Failed to parse session response: {}", e)))?;
        body.get("id")
            .and_then(Value::as_str)
            .filter(|id| !id.is_empty())
            .map(SessionToken::new)
            .ok_or_else(|| SyncError::Auth("session response carries no id".to_string()))
    }

    async fn fetch_collection_tree(
        &self,
        token: &SessionToken,
    ) -> Result<Vec<RemoteNode>, SyncError> {
        let endpoint = "/api/collection/tree?tree=true";
        let body = self.get_json(token, endpoint).await?;
        let entries = listing_entries(endpoint, body)?;
        Ok(parse_nodes(endpoint, entries, COLLECTION_KIND))
    }

    async fn fetch_collection_items(
        &self,
        token: &SessionToken,
        collection: &NodeId,
    ) -> Result<Vec<RemoteNode>, SyncError> {
        let endpoint = format!("/api/collection/{}/items", collection);
        let body = self.get_json(token, &endpoint).await?;
        let entries = listing_entries(&endpoint, body)?;
        // Items always carry `model`; an entry without one is not a collection.
        Ok(parse_nodes(&endpoint, entries, "unknown"))
    }

    async fn fetch_cards(&self, token: &SessionToken) -> Result<Vec<ArtifactRecord>, SyncError> {
        let endpoint = "/api/card/";
        let body = self.get_json(token, endpoint).await?;
        let entries = listing_entries(endpoint, body)?;
        Ok(entries
            .into_iter()
            .filter_map(|entry| match ArtifactRecord::from_value(entry) {
                Ok(card) => Some(card),
                Err(reason) => {
                    debug!(endpoint, reason = %reason, "Skipping unparseable card");
                    None
                }
            })
            .collect())
    }

    async fn compile_query(
        &self,
        token: &SessionToken,
        dataset_query: &Value,
    ) -> Result<String, SyncError> {
        let endpoint = "/api/dataset/native";
        info!(endpoint, "visiting to build sql from query builder");
        let body = serde_json::to_string_pretty(dataset_query)
            .map_err(|e| SyncError::transport(endpoint, format!("Failed to encode query: {}", e)))?;
        let response = self
            .client
            .post(self.url(endpoint))
            .header(SESSION_HEADER, token.as_str())
            .header("Content-Type", "application/json")
            .body(body)
            .send()
            .await
            .map_err(|e| map_http_error(endpoint, e))?;

        if !response.status().is_success() {
            return Err(status_error(endpoint, response).await);
        }

        let compiled: Value = response
            .json()
            .await
            .map_err(|e| map_http_error(endpoint, e))?;
        compiled
            .get("query")
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| SyncError::transport(endpoint, "compile response has no query"))
    }
}
