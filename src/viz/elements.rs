//! Visualization elements: the node/edge records the front-end graph
//! renderer consumes.
//!
//! Nodes are keyed by method id and edges by `"<source>-<target>"`, so
//! feeding the same node or the same pair twice into an
//! [`ElementCollector`] yields one element. The renderer shows simple
//! directed adjacency, never multi-edges.

use std::collections::btree_map::Entry;
use std::collections::BTreeMap;

use serde::Serialize;
use serde_json::{Map, Value};

use crate::types::{CallEdge, Method};

// ---------------------------------------------------------------------------
// Element types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ElementGroup {
    Nodes,
    Edges,
}

/// A method rendered as a graph node.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NodeElement {
    pub group: ElementGroup,
    pub id: String,
    pub data: NodeData,
}

/// Node payload: every stored attribute plus the (optionally filled)
/// one-hop neighborhood.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NodeData {
    #[serde(flatten)]
    pub attributes: Map<String, Value>,
    pub callers: Vec<NodeElement>,
    pub callees: Vec<NodeElement>,
}

/// A `calls` edge rendered as a graph edge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EdgeElement {
    pub group: ElementGroup,
    pub id: String,
    pub data: EdgeData,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EdgeData {
    pub id: String,
    pub source: String,
    pub target: String,
    pub value: Option<i64>,
}

/// A batch of nodes and edges.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ElementSet {
    pub nodes: Vec<NodeElement>,
    pub edges: Vec<EdgeElement>,
}

impl ElementSet {
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty() && self.edges.is_empty()
    }
}

/// Method detail: the method node (with callers/callees filled) and the
/// shortest entry-point path leading to it.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct MethodDetail {
    pub nodes: Vec<NodeElement>,
    pub edges: Vec<EdgeElement>,
    pub path: ElementSet,
}

// ---------------------------------------------------------------------------
// Transcoding
// ---------------------------------------------------------------------------

/// Keys owned by [`NodeData`] itself; stored attributes with these names
/// are dropped so they cannot shadow the neighborhood lists.
const RESERVED_KEYS: [&str; 2] = ["callers", "callees"];

/// Synthesized identifier of the edge between `source` and `target`.
pub fn edge_id(source: &str, target: &str) -> String {
    format!("{source}-{target}")
}

/// Render a method as a node element with empty neighborhood lists.
///
/// `data` holds every CSV attribute verbatim, plus `id` (always the stored
/// id) and the normalized `name`, `parent`, `isEntryPoint` and `graph`
/// fields where the CSV did not already use those keys.
pub fn node_element(method: &Method) -> NodeElement {
    let mut attributes = method.attributes.clone();
    for key in RESERVED_KEYS {
        attributes.remove(key);
    }
    attributes.insert("id".into(), Value::String(method.id.clone()));
    attributes
        .entry("name")
        .or_insert_with(|| Value::String(method.name.clone()));
    attributes
        .entry("parent")
        .or_insert_with(|| method.parent.clone().map_or(Value::Null, Value::String));
    attributes
        .entry("isEntryPoint")
        .or_insert(Value::Bool(method.is_entry_point));
    attributes
        .entry("graph")
        .or_insert_with(|| Value::String(method.graph.clone()));

    NodeElement {
        group: ElementGroup::Nodes,
        id: method.id.clone(),
        data: NodeData {
            attributes,
            callers: Vec::new(),
            callees: Vec::new(),
        },
    }
}

/// Render a `source -> target` edge with an optional weight.
pub fn edge_element(source: &str, target: &str, value: Option<i64>) -> EdgeElement {
    let id = edge_id(source, target);
    EdgeElement {
        group: ElementGroup::Edges,
        id: id.clone(),
        data: EdgeData {
            id,
            source: source.to_string(),
            target: target.to_string(),
            value,
        },
    }
}

/// Render a stored call edge.
pub fn call_edge_element(edge: &CallEdge) -> EdgeElement {
    edge_element(&edge.source, &edge.target, Some(edge.value))
}

// ---------------------------------------------------------------------------
// ElementCollector
// ---------------------------------------------------------------------------

/// Collapses elements by id; the last node written under an id wins.
#[derive(Debug, Default)]
pub struct ElementCollector {
    nodes: BTreeMap<String, NodeElement>,
    edges: BTreeMap<String, EdgeElement>,
}

impl ElementCollector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert (or replace) a node and return it for further filling.
    pub fn add_node(&mut self, node: NodeElement) -> &mut NodeElement {
        match self.nodes.entry(node.id.clone()) {
            Entry::Occupied(mut slot) => {
                slot.insert(node);
                slot.into_mut()
            }
            Entry::Vacant(slot) => slot.insert(node),
        }
    }

    pub fn add_edge(&mut self, edge: EdgeElement) {
        self.edges.insert(edge.id.clone(), edge);
    }

    pub fn finish(self) -> ElementSet {
        ElementSet {
            nodes: self.nodes.into_values().collect(),
            edges: self.edges.into_values().collect(),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
