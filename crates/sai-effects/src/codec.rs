//! JSON graph codec
//!
//! Expanded-form documents: the subject under `@id`, then one array per
//! term whose entries are `{"@id": ...}` for nodes or
//! `{"@value": ..., "@type": ...}` for literals. Relative node identifiers are
//! resolved against the document identifier.

use chrono::{DateTime, Utc};
use sai_core::{Graph, GraphCodec, ResourceId, Result, SaiError, Value};
use serde_json::{json, Map, Value as Json};

const XSD_BOOLEAN: &str = "http://www.w3.org/2001/XMLSchema#boolean";
const XSD_DATE_TIME: &str = "http://www.w3.org/2001/XMLSchema#dateTime";

/// Expanded JSON graph codec
#[derive(Debug, Clone)]
pub struct JsonGraphCodec {
    content_type: String,
}

impl JsonGraphCodec {
    /// Codec advertising `application/ld+json`
    pub fn new() -> Self {
        Self::with_content_type("application/ld+json")
    }

    /// Codec advertising a custom media type
    pub fn with_content_type(content_type: impl Into<String>) -> Self {
        Self {
            content_type: content_type.into(),
        }
    }

    fn resolve(base: &ResourceId, raw: &str) -> Result<ResourceId> {
        match ResourceId::parse(raw) {
            Ok(id) => Ok(id),
            Err(_) => base
                .as_url()
                .join(raw)
                .map(ResourceId::from_url)
                .map_err(|e| SaiError::serialization(format!("Bad @id '{raw}' in {base}: {e}"))),
        }
    }

    fn decode_value(base: &ResourceId, term: &str, entry: &Json) -> Result<Value> {
        let object = entry.as_object().ok_or_else(|| {
            SaiError::serialization(format!("Value of {term} in {base} is not an object"))
        })?;
        if let Some(node) = object.get("@id") {
            let raw = node.as_str().ok_or_else(|| {
                SaiError::serialization(format!("@id of {term} in {base} is not a string"))
            })?;
            return Ok(Value::Node(Self::resolve(base, raw)?));
        }
        let literal = object.get("@value").ok_or_else(|| {
            SaiError::serialization(format!("Value of {term} in {base} has neither @id nor @value"))
        })?;
        match (literal, object.get("@type").and_then(Json::as_str)) {
            (Json::Bool(b), _) => Ok(Value::Boolean(*b)),
            (Json::String(s), Some(XSD_BOOLEAN)) => Ok(Value::Boolean(s == "true")),
            (Json::String(s), Some(XSD_DATE_TIME)) => DateTime::parse_from_rfc3339(s)
                .map(|at| Value::DateTime(at.with_timezone(&Utc)))
                .map_err(|e| {
                    SaiError::serialization(format!("Bad timestamp for {term} in {base}: {e}"))
                }),
            (Json::String(s), _) => Ok(Value::Text(s.clone())),
            (other, _) => Ok(Value::Text(other.to_string())),
        }
    }

    fn encode_value(value: &Value) -> Json {
        match value {
            Value::Node(id) => json!({ "@id": id.as_str() }),
            Value::Text(text) => json!({ "@value": text }),
            Value::Boolean(b) => json!({ "@value": b, "@type": XSD_BOOLEAN }),
            Value::DateTime(at) => json!({ "@value": at.to_rfc3339(), "@type": XSD_DATE_TIME }),
        }
    }
}

impl Default for JsonGraphCodec {
    fn default() -> Self {
        Self::new()
    }
}

impl GraphCodec for JsonGraphCodec {
    fn content_type(&self) -> &str {
        &self.content_type
    }

    fn decode(&self, id: &ResourceId, body: &[u8]) -> Result<Graph> {
        let mut graph = Graph::new(id.clone());
        if body.is_empty() {
            return Ok(graph);
        }
        let document: Json = serde_json::from_slice(body)?;
        let object = document
            .as_object()
            .ok_or_else(|| SaiError::serialization(format!("Document {id} is not a JSON object")))?;

        for (term, entries) in object {
            if term.starts_with('@') {
                continue;
            }
            let entries = match entries {
                Json::Array(items) => items.clone(),
                single => vec![single.clone()],
            };
            for entry in &entries {
                graph.add(term, Self::decode_value(id, term, entry)?);
            }
        }
        Ok(graph)
    }

    fn encode(&self, graph: &Graph) -> Result<Vec<u8>> {
        let mut object = Map::new();
        object.insert("@id".to_string(), Json::String(graph.id().to_string()));
        for term in graph.terms() {
            let values: Vec<Json> = graph.values(term).iter().map(Self::encode_value).collect();
            object.insert(term.to_string(), Json::Array(values));
        }
        Ok(serde_json::to_vec(&Json::Object(object))?)
    }
}
