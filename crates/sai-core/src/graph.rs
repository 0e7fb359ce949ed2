//! Typed view over a decoded graph document
//!
//! A `Graph` is one subject with an ordered map of vocabulary terms to values.
//! The resource layers only ever read and write through terms; the wire
//! syntax belongs to a `GraphCodec`.

use crate::errors::{Result, SaiError};
use crate::identifiers::ResourceId;
use crate::vocabulary::rdf;
use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Object of a single statement
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum Value {
    /// Reference to another document or term
    Node(ResourceId),
    /// Plain literal
    Text(String),
    /// Boolean literal
    Boolean(bool),
    /// Timestamp literal
    DateTime(DateTime<Utc>),
}

impl Value {
    /// Node value
    pub fn node(id: &ResourceId) -> Self {
        Self::Node(id.clone())
    }

    /// Text value
    pub fn text(value: impl Into<String>) -> Self {
        Self::Text(value.into())
    }

    /// Node reference, if this is one
    pub fn as_node(&self) -> Option<&ResourceId> {
        match self {
            Self::Node(id) => Some(id),
            _ => None,
        }
    }

    /// Text, if this is a text literal or a node (by identifier)
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Text(text) => Some(text),
            Self::Node(id) => Some(id.as_str()),
            _ => None,
        }
    }

    /// Boolean literal, if this is one
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    /// Timestamp literal, if this is one
    pub fn as_datetime(&self) -> Option<DateTime<Utc>> {
        match self {
            Self::DateTime(at) => Some(*at),
            _ => None,
        }
    }

    fn write_canonical(&self, out: &mut Vec<u8>) {
        match self {
            Self::Node(id) => {
                out.push(b'n');
                write_chunk(out, id.as_str().as_bytes());
            }
            Self::Text(text) => {
                out.push(b't');
                write_chunk(out, text.as_bytes());
            }
            Self::Boolean(b) => {
                out.push(b'b');
                out.push(u8::from(*b));
            }
            Self::DateTime(at) => {
                out.push(b'd');
                write_chunk(
                    out,
                    at.to_rfc3339_opts(SecondsFormat::Nanos, true).as_bytes(),
                );
            }
        }
    }
}

impl From<ResourceId> for Value {
    fn from(id: ResourceId) -> Self {
        Self::Node(id)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Self::Boolean(b)
    }
}

impl From<DateTime<Utc>> for Value {
    fn from(at: DateTime<Utc>) -> Self {
        Self::DateTime(at)
    }
}

fn write_chunk(out: &mut Vec<u8>, bytes: &[u8]) {
    out.extend_from_slice(&(bytes.len() as u64).to_le_bytes());
    out.extend_from_slice(bytes);
}

/// Decoded document: one subject and its statements keyed by term
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Graph {
    id: ResourceId,
    properties: BTreeMap<String, Vec<Value>>,
}

impl Graph {
    /// Empty graph about `id`
    pub fn new(id: ResourceId) -> Self {
        Self {
            id,
            properties: BTreeMap::new(),
        }
    }

    /// Subject identifier
    pub fn id(&self) -> &ResourceId {
        &self.id
    }

    /// Re-address the graph; statements are kept
    pub fn set_id(&mut self, id: ResourceId) {
        self.id = id;
    }

    /// Terms with at least one value
    pub fn terms(&self) -> impl Iterator<Item = &str> {
        self.properties.keys().map(String::as_str)
    }

    /// True when the graph has no statements
    pub fn is_empty(&self) -> bool {
        self.properties.is_empty()
    }

    /// All values for a term
    pub fn values(&self, term: &str) -> &[Value] {
        self.properties.get(term).map(Vec::as_slice).unwrap_or(&[])
    }

    /// First value for a term
    pub fn get(&self, term: &str) -> Option<&Value> {
        self.values(term).first()
    }

    /// Node references for a term, in stored order
    pub fn nodes(&self, term: &str) -> Vec<ResourceId> {
        self.values(term)
            .iter()
            .filter_map(Value::as_node)
            .cloned()
            .collect()
    }

    /// First node reference for a term
    pub fn node(&self, term: &str) -> Option<ResourceId> {
        self.values(term).iter().find_map(Value::as_node).cloned()
    }

    /// First node reference for a term, or an `Invalid` error naming it
    pub fn require_node(&self, term: &str) -> Result<ResourceId> {
        self.node(term).ok_or_else(|| self.missing(term))
    }

    /// First text literal for a term
    pub fn text(&self, term: &str) -> Option<&str> {
        self.values(term).iter().find_map(Value::as_str)
    }

    /// First text literal for a term, or an `Invalid` error naming it
    pub fn require_text(&self, term: &str) -> Result<&str> {
        self.text(term).ok_or_else(|| self.missing(term))
    }

    /// First boolean literal for a term
    pub fn boolean(&self, term: &str) -> Option<bool> {
        self.values(term).iter().find_map(Value::as_bool)
    }

    /// First timestamp literal for a term
    pub fn datetime(&self, term: &str) -> Option<DateTime<Utc>> {
        self.values(term).iter().find_map(Value::as_datetime)
    }

    /// First timestamp literal for a term, or an `Invalid` error naming it
    pub fn require_datetime(&self, term: &str) -> Result<DateTime<Utc>> {
        self.datetime(term).ok_or_else(|| self.missing(term))
    }

    /// True when `value` is stored under `term`
    pub fn contains(&self, term: &str, value: &Value) -> bool {
        self.values(term).contains(value)
    }

    /// Replace all values of a term with a single value
    pub fn set(&mut self, term: &str, value: impl Into<Value>) {
        self.properties.insert(term.to_string(), vec![value.into()]);
    }

    /// Replace all values of a term with node references
    pub fn set_nodes<'a>(&mut self, term: &str, nodes: impl IntoIterator<Item = &'a ResourceId>) {
        let values: Vec<Value> = nodes.into_iter().map(Value::node).collect();
        if values.is_empty() {
            self.properties.remove(term);
        } else {
            self.properties.insert(term.to_string(), values);
        }
    }

    /// Set the term when `value` is present, clear it otherwise
    pub fn set_optional(&mut self, term: &str, value: Option<impl Into<Value>>) {
        match value {
            Some(value) => self.set(term, value),
            None => {
                self.properties.remove(term);
            }
        }
    }

    /// Append a value unless it is already stored. Returns whether it was added.
    pub fn add(&mut self, term: &str, value: impl Into<Value>) -> bool {
        let value = value.into();
        let values = self.properties.entry(term.to_string()).or_default();
        if values.contains(&value) {
            return false;
        }
        values.push(value);
        true
    }

    /// Remove one value. Returns whether it was present.
    pub fn remove_value(&mut self, term: &str, value: &Value) -> bool {
        let Some(values) = self.properties.get_mut(term) else {
            return false;
        };
        let before = values.len();
        values.retain(|v| v != value);
        let removed = values.len() != before;
        if values.is_empty() {
            self.properties.remove(term);
        }
        removed
    }

    /// Remove every value of a term
    pub fn remove(&mut self, term: &str) {
        self.properties.remove(term);
    }

    /// True when the graph declares `type_term` as its type
    pub fn has_type(&self, type_term: &str) -> bool {
        self.values(rdf::TYPE)
            .iter()
            .any(|v| v.as_str() == Some(type_term))
    }

    /// Declare the graph's type
    pub fn set_type(&mut self, type_term: &str) -> Result<()> {
        let ty = ResourceId::parse(type_term)?;
        self.set(rdf::TYPE, ty);
        Ok(())
    }

    /// Fail with `Invalid` unless the graph declares `type_term`
    pub fn expect_type(&self, type_term: &str) -> Result<()> {
        if self.has_type(type_term) {
            Ok(())
        } else {
            Err(SaiError::invalid(format!(
                "{} is not typed as {type_term}",
                self.id
            )))
        }
    }

    /// Deterministic byte form of the statements, independent of the subject.
    ///
    /// Terms are ordered by the map, values are sorted, and every chunk is
    /// length-prefixed.
    pub fn canonical_bytes(&self) -> Vec<u8> {
        let mut out = Vec::new();
        for (term, values) in &self.properties {
            if values.is_empty() {
                continue;
            }
            write_chunk(&mut out, term.as_bytes());
            let mut sorted: Vec<&Value> = values.iter().collect();
            sorted.sort();
            out.extend_from_slice(&(sorted.len() as u64).to_le_bytes());
            for value in sorted {
                value.write_canonical(&mut out);
            }
        }
        out
    }

    fn missing(&self, term: &str) -> SaiError {
        SaiError::invalid(format!("{} is missing required term {term}", self.id))
    }
}

/// Graph codec collaborator: converts between bodies and graph views
pub trait GraphCodec: Send + Sync {
    /// Media type produced by `encode` and accepted by `decode`
    fn content_type(&self) -> &str;

    /// Decode a fetched body about `id`
    fn decode(&self, id: &ResourceId, body: &[u8]) -> Result<Graph>;

    /// Encode a graph for a write
    fn encode(&self, graph: &Graph) -> Result<Vec<u8>>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vocabulary::interop;

    fn id(s: &str) -> ResourceId {
        ResourceId::parse(s).unwrap()
    }

    #[test]
    fn test_canonical_bytes_ignore_subject_and_order() {
        let a_ref = id("https://alice.example/data/a");
        let b_ref = id("https://alice.example/data/b");

        let mut first = Graph::new(id("https://alice.example/grants/1"));
        first.add(interop::HAS_DATA_INSTANCE, a_ref.clone());
        first.add(interop::HAS_DATA_INSTANCE, b_ref.clone());

        let mut second = Graph::new(id("https://alice.example/grants/2"));
        second.add(interop::HAS_DATA_INSTANCE, b_ref);
        second.add(interop::HAS_DATA_INSTANCE, a_ref);

        assert_eq!(first.canonical_bytes(), second.canonical_bytes());
    }

    #[test]
    fn test_add_is_set_like() {
        let mut graph = Graph::new(id("https://alice.example/registry/"));
        let member = id("https://alice.example/registry/a");
        assert!(graph.add(interop::HAS_DATA_REGISTRATION, member.clone()));
        assert!(!graph.add(interop::HAS_DATA_REGISTRATION, member.clone()));
        assert_eq!(graph.nodes(interop::HAS_DATA_REGISTRATION), vec![member.clone()]);

        assert!(graph.remove_value(interop::HAS_DATA_REGISTRATION, &Value::node(&member)));
        assert!(graph.is_empty());
    }

    #[test]
    fn test_type_assertion() {
        let mut graph = Graph::new(id("https://alice.example/registries/agents/"));
        graph.set_type(interop::AGENT_REGISTRY).unwrap();
        assert!(graph.has_type(interop::AGENT_REGISTRY));
        assert!(graph.expect_type(interop::DATA_REGISTRY).is_err());
    }

    #[test]
    fn test_require_names_term() {
        let graph = Graph::new(id("https://alice.example/authz/1"));
        let err = graph.require_node(interop::GRANTEE).unwrap_err();
        assert!(err.to_string().contains("grantee"));
        assert!(err.to_string().contains("https://alice.example/authz/1"));
    }
}
