//! Shared test utilities for integration tests
//!
//! An in-memory Metabase that serves a fixed hierarchy and card list, so the
//! whole pipeline runs without a network.

use async_trait::async_trait;
use metabase_git_sync::client::{MetabaseApi, SessionToken};
use metabase_git_sync::config::SyncConfig;
use metabase_git_sync::error::SyncError;
use metabase_git_sync::model::{ArtifactRecord, NodeId, RemoteNode, COLLECTION_KIND};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::Mutex;

#[derive(Default)]
pub struct FakeMetabase {
    pub reject_login: bool,
    roots: Vec<Value>,
    items: HashMap<NodeId, Vec<Value>>,
    failing_collections: Vec<NodeId>,
    cards: Vec<Value>,
    compiled: HashMap<String, String>,
    calls: Mutex<Vec<String>>,
}

impl FakeMetabase {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn root(mut self, record: Value) -> Self {
        self.roots.push(record);
        self
    }

    pub fn items(mut self, collection: u64, records: Vec<Value>) -> Self {
        self.items.insert(NodeId::from(collection), records);
        self
    }

    pub fn failing_collection(mut self, collection: u64) -> Self {
        self.failing_collections.push(NodeId::from(collection));
        self
    }

    pub fn card(mut self, record: Value) -> Self {
        self.cards.push(record);
        self
    }

    pub fn native_card(self, id: u64, sql: &str) -> Self {
        self.card(json!({
            "id": id,
            "name": format!("card {}", id),
            "query_type": "native",
            "dataset_query": {"type": "native", "native": {"query": sql}}
        }))
    }

    /// A builder card whose definition compiles to `sql`.
    pub fn builder_card(mut self, id: u64, source_table: u64, sql: &str) -> Self {
        let definition = json!({"type": "query", "query": {"source-table": source_table}});
        self.compiled.insert(definition.to_string(), sql.to_string());
        self.card(json!({
            "id": id,
            "name": format!("card {}", id),
            "query_type": "query",
            "dataset_query": definition
        }))
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    fn called(&self, what: String) {
        self.calls.lock().unwrap().push(what);
    }
}

#[async_trait]
impl MetabaseApi for FakeMetabase {
    async fn authenticate(&self) -> Result<SessionToken, SyncError> {
        self.called("session".into());
        if self.reject_login {
            return Err(SyncError::Auth("401 Unauthorized".into()));
        }
        Ok(SessionToken::new("fake-session"))
    }

    async fn fetch_collection_tree(
        &self,
        _token: &SessionToken,
    ) -> Result<Vec<RemoteNode>, SyncError> {
        self.called("collection/tree".into());
        self.roots
            .iter()
            .map(|v| {
                RemoteNode::from_value(v.clone(), COLLECTION_KIND)
                    .map_err(|e| SyncError::transport("/api/collection/tree", e))
            })
            .collect()
    }

    async fn fetch_collection_items(
        &self,
        _token: &SessionToken,
        collection: &NodeId,
    ) -> Result<Vec<RemoteNode>, SyncError> {
        let endpoint = format!("collection/{}/items", collection);
        self.called(endpoint.clone());
        if self.failing_collections.contains(collection) {
            return Err(SyncError::transport(endpoint, "502 Bad Gateway"));
        }
        self.items
            .get(collection)
            .cloned()
            .unwrap_or_default()
            .into_iter()
            .map(|v| {
                RemoteNode::from_value(v, "card").map_err(|e| SyncError::transport(&endpoint, e))
            })
            .collect()
    }

    async fn fetch_cards(&self, _token: &SessionToken) -> Result<Vec<ArtifactRecord>, SyncError> {
        self.called("card".into());
        self.cards
            .iter()
            .map(|v| {
                ArtifactRecord::from_value(v.clone()).map_err(|e| SyncError::transport("/api/card", e))
            })
            .collect()
    }

    async fn compile_query(
        &self,
        _token: &SessionToken,
        dataset_query: &Value,
    ) -> Result<String, SyncError> {
        self.called("dataset/native".into());
        self.compiled
            .get(&dataset_query.to_string())
            .cloned()
            .ok_or_else(|| SyncError::transport("/api/dataset/native", "400 Bad Request"))
    }
}

/// Config pointing nowhere in particular; the fake ignores the URL.
pub fn test_config() -> SyncConfig {
    let mut config = SyncConfig::default();
    config.metabase.url = "https://metabase.test".to_string();
    config.metabase.user = "analyst@example.com".to_string();
    config.metabase.password = "secret".to_string();
    config
}

/// Whether a `git` executable is available for archive tests.
pub fn git_available() -> bool {
    std::process::Command::new("git")
        .arg("--version")
        .output()
        .map(|o| o.status.success())
        .unwrap_or(false)
}
