//! Gremlin engine: each render describes one graph vertex or edge.
//!
//! ```json
//! { "type": "vertex", "id": "p-1", "label": "person", "properties": { "name": "ann" } }
//! { "type": "edge", "id": "e-1", "label": "knows",
//!   "outVertexId": "p-1", "inVertexId": "p-2",
//!   "outVertexLabel": "person", "inVertexLabel": "person",
//!   "outVertexPartitionKey": "p-1", "inVertexPartitionKey": "p-2",
//!   "properties": { "since": 2019 } }
//! ```
//!
//! Property values are kept as strings; non-string JSON values are written in their
//! compact JSON form.

use crate::engine::{Engine, EngineCore, EngineKind};
use crate::error::EngineError;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;
use synth_template::{TemplateData, TemplateStore};

/// A vertex or edge ready for a graph bulk import.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum GraphElement {
    Vertex(GremlinVertex),
    Edge(GremlinEdge),
}

impl GraphElement {
    pub fn id(&self) -> &str {
        match self {
            GraphElement::Vertex(vertex) => &vertex.id,
            GraphElement::Edge(edge) => &edge.id,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GremlinVertex {
    #[serde(deserialize_with = "scalar_string")]
    pub id: String,
    pub label: String,
    #[serde(default, deserialize_with = "string_properties")]
    pub properties: BTreeMap<String, String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GremlinEdge {
    #[serde(deserialize_with = "scalar_string")]
    pub id: String,
    pub label: String,
    #[serde(deserialize_with = "scalar_string")]
    pub out_vertex_id: String,
    #[serde(deserialize_with = "scalar_string")]
    pub in_vertex_id: String,
    pub out_vertex_label: String,
    pub in_vertex_label: String,
    #[serde(deserialize_with = "scalar_string")]
    pub out_vertex_partition_key: String,
    #[serde(deserialize_with = "scalar_string")]
    pub in_vertex_partition_key: String,
    #[serde(default, deserialize_with = "string_properties")]
    pub properties: BTreeMap<String, String>,
}

fn value_string(value: Value) -> String {
    match value {
        Value::String(text) => text,
        other => other.to_string(),
    }
}

fn scalar_string<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    Value::deserialize(deserializer).map(value_string)
}

fn string_properties<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<BTreeMap<String, String>, D::Error> {
    let properties = BTreeMap::<String, Value>::deserialize(deserializer)?;
    Ok(properties
        .into_iter()
        .map(|(key, value)| (key, value_string(value)))
        .collect())
}

#[derive(Debug)]
pub struct GremlinEngine {
    core: EngineCore,
}

impl GremlinEngine {
    pub fn new(
        store: Arc<TemplateStore>,
        provider: &str,
        template_name: &str,
    ) -> Result<Self, EngineError> {
        Ok(Self {
            core: EngineCore::initialize(EngineKind::Gremlin, store, provider, template_name)?,
        })
    }
}

impl Engine for GremlinEngine {
    type Output = GraphElement;

    fn kind(&self) -> EngineKind {
        EngineKind::Gremlin
    }

    fn template(&self) -> &TemplateData {
        self.core.template()
    }

    fn build_payload(&self, worker: usize) -> Result<GraphElement, EngineError> {
        let rendered = self.core.render(worker)?;
        serde_json::from_str(&rendered).map_err(|e| self.core.format_error(e))
    }
}
