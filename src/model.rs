//! Remote records as the pipeline sees them.
//!
//! Metabase responses are kept as raw JSON objects so the metadata files carry
//! every field the server sent. Typed accessors pull out the few fields the
//! pipeline actually needs (id, model, slug, query definition).

use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize, Serializer};
use serde_json::{Map, Value};
use std::fmt;

/// Kind tag of hierarchy nodes. Every other `model` value is a leaf.
pub const COLLECTION_KIND: &str = "collection";

/// Remote identifier.
///
/// Metabase uses integer ids for most objects and strings for a few special
/// collections (`"root"`, personal collections in some versions). Both are kept
/// in their textual form, which is also what appears in paths.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(String);

impl NodeId {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Read an id out of a JSON value; integers and non-empty strings qualify.
    pub fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Number(n) => Some(NodeId(n.to_string())),
            Value::String(s) if !s.is_empty() => Some(NodeId(s.clone())),
            _ => None,
        }
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<u64> for NodeId {
    fn from(id: u64) -> Self {
        NodeId(id.to_string())
    }
}

impl From<&str> for NodeId {
    fn from(id: &str) -> Self {
        NodeId(id.to_string())
    }
}

impl Serialize for NodeId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for NodeId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        NodeId::from_value(&value)
            .ok_or_else(|| de::Error::custom(format!("invalid node id: {}", value)))
    }
}

/// One entry of the collection hierarchy: a collection or an item inside one.
#[derive(Debug, Clone, PartialEq)]
pub struct RemoteNode {
    pub id: NodeId,
    pub kind: String,
    pub slug: Option<String>,
    /// Full record as returned by the server.
    pub record: Map<String, Value>,
}

impl RemoteNode {
    /// Build a node from a raw JSON object.
    ///
    /// `default_kind` applies when the record has no `model` field, which is the
    /// case for entries of the collection tree listing.
    pub fn from_value(value: Value, default_kind: &str) -> Result<Self, String> {
        let record = match value {
            Value::Object(map) => map,
            other => return Err(format!("expected an object, got {}", other)),
        };
        let id = record
            .get("id")
            .and_then(NodeId::from_value)
            .ok_or_else(|| "record has no usable id".to_string())?;
        let kind = record
            .get("model")
            .and_then(Value::as_str)
            .filter(|k| !k.is_empty())
            .unwrap_or(default_kind)
            .to_string();
        let slug = record
            .get("slug")
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
            .map(str::to_string);
        Ok(Self {
            id,
            kind,
            slug,
            record,
        })
    }

    pub fn is_collection(&self) -> bool {
        self.kind == COLLECTION_KIND
    }
}

/// Authoring form of a card's query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryForm {
    /// Hand-written SQL; already canonical.
    Native,
    /// Query-builder (MBQL) definition; must be compiled to SQL remotely.
    Builder,
    /// Anything else, including a missing `query_type`.
    Other(String),
}

impl QueryForm {
    pub fn parse(query_type: Option<&str>) -> Self {
        match query_type {
            Some("native") => QueryForm::Native,
            Some("query") => QueryForm::Builder,
            Some(other) => QueryForm::Other(other.to_string()),
            None => QueryForm::Other("<missing>".to_string()),
        }
    }
}

/// A card (question/model/metric) from the card listing.
#[derive(Debug, Clone, PartialEq)]
pub struct ArtifactRecord {
    pub id: NodeId,
    pub record: Map<String, Value>,
}

impl ArtifactRecord {
    pub fn from_value(value: Value) -> Result<Self, String> {
        let record = match value {
            Value::Object(map) => map,
            other => return Err(format!("expected an object, got {}", other)),
        };
        let id = record
            .get("id")
            .and_then(NodeId::from_value)
            .ok_or_else(|| "card has no usable id".to_string())?;
        Ok(Self { id, record })
    }

    pub fn query_form(&self) -> QueryForm {
        QueryForm::parse(self.record.get("query_type").and_then(Value::as_str))
    }

    /// Structured query definition sent to the compile endpoint.
    pub fn dataset_query(&self) -> Option<&Value> {
        self.record.get("dataset_query").filter(|v| !v.is_null())
    }

    /// `dataset_query.native.query` for native cards.
    pub fn native_query(&self) -> Option<&str> {
        self.dataset_query()?
            .get("native")?
            .get("query")?
            .as_str()
    }
}
