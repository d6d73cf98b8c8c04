//! Artifact resolution: one canonical SQL body per card.
//!
//! Native cards pass their SQL through untouched; query-builder cards are
//! compiled by the server. Anything else is kept without a body.

use crate::client::{MetabaseApi, SessionToken};
use crate::error::SyncError;
use crate::model::{ArtifactRecord, NodeId, QueryForm};
use crate::report::DegradationLog;
use serde_json::Value;
use std::collections::BTreeMap;
use tracing::{debug, info, instrument};

/// A card and its resolved body, if any.
#[derive(Debug, Clone, PartialEq)]
pub struct Artifact {
    pub record: ArtifactRecord,
    pub body: Option<String>,
}

impl Artifact {
    pub fn new(record: ArtifactRecord, body: Option<String>) -> Self {
        Self { record, body }
    }

    pub fn id(&self) -> &NodeId {
        &self.record.id
    }

    /// The card record as written into leaf metadata.
    pub fn record_value(&self) -> Value {
        Value::Object(self.record.record.clone())
    }
}

/// Card id to card plus body. Read-only once built.
///
/// Keyed by id alone: a dashboard or pulse item whose id equals a card id
/// is materialized with that card's record and body.
#[derive(Debug, Clone, Default)]
pub struct ArtifactMap {
    entries: BTreeMap<NodeId, Artifact>,
}

impl ArtifactMap {
    /// Build the map. A later artifact with an id already present is dropped,
    /// since card ids are unique on the server this only guards bad input.
    pub fn from_artifacts(artifacts: impl IntoIterator<Item = Artifact>) -> Self {
        let mut entries = BTreeMap::new();
        for artifact in artifacts {
            entries.entry(artifact.id().clone()).or_insert(artifact);
        }
        Self { entries }
    }

    pub fn get(&self, id: &NodeId) -> Option<&Artifact> {
        self.entries.get(id)
    }

    pub fn contains(&self, id: &NodeId) -> bool {
        self.entries.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn resolved_count(&self) -> usize {
        self.entries.values().filter(|a| a.body.is_some()).count()
    }
}

/// Derive the SQL body for one card.
pub async fn resolve_body(
    api: &dyn MetabaseApi,
    token: &SessionToken,
    card: &ArtifactRecord,
) -> Result<String, SyncError> {
    match card.query_form() {
        QueryForm::Native => card
            .native_query()
            .map(str::to_string)
            .ok_or_else(|| SyncError::SerializationGap {
                id: card.id.clone(),
                reason: "native card has no dataset_query.native.query".to_string(),
            }),
        QueryForm::Builder => {
            let definition = card.dataset_query().ok_or_else(|| SyncError::SerializationGap {
                id: card.id.clone(),
                reason: "builder card has no dataset_query".to_string(),
            })?;
            api.compile_query(token, definition).await
        }
        QueryForm::Other(query_type) => Err(SyncError::SerializationGap {
            id: card.id.clone(),
            reason: format!("unsupported query_type {}", query_type),
        }),
    }
}

/// Resolve every card, sequentially. Failures leave that card without a body.
#[instrument(skip_all, fields(cards = cards.len()))]
pub async fn resolve_artifacts(
    api: &dyn MetabaseApi,
    token: &SessionToken,
    cards: Vec<ArtifactRecord>,
    log: &mut DegradationLog,
) -> ArtifactMap {
    let mut artifacts = Vec::with_capacity(cards.len());
    for card in cards {
        let body = match resolve_body(api, token, &card).await {
            Ok(body) => {
                debug!(card_id = %card.id, bytes = body.len(), "Resolved card body");
                Some(body)
            }
            Err(e) => {
                log.record(format!("card {}", card.id), &e);
                None
            }
        };
        artifacts.push(Artifact::new(card, body));
    }
    let map = ArtifactMap::from_artifacts(artifacts);
    info!(
        artifacts = map.len(),
        resolved = map.resolved_count(),
        "Artifact map built"
    );
    map
}
