//! Read-side facade: runs store queries and reshapes the rows into
//! visualization elements or the method tree.
//!
//! Unknown graphs and methods are soft misses and produce empty results, not
//! errors.

use tracing::{debug, info};

use crate::error::Result;
use crate::graph::store::GraphStore;
use crate::graph::traversal::GraphTraversal;
use crate::types::{CallEdge, GraphSummary, Message, Method};
use crate::viz::elements::{
    call_edge_element, node_element, ElementCollector, ElementSet, MethodDetail, NodeElement,
};
use crate::viz::tree::{build_tree, TreeItem};

/// Which side of a method to expand.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Callers,
    Callees,
}

/// Query facade bound to a store.
pub struct GraphQueries<'a> {
    store: &'a GraphStore,
}

impl<'a> GraphQueries<'a> {
    pub fn new(store: &'a GraphStore) -> Self {
        Self { store }
    }

    /// Every graph with node/edge counts and comparison link, by name.
    pub fn list_graphs(&self) -> Result<Vec<GraphSummary>> {
        self.store.list_graphs()
    }

    /// Delete a graph and report what was removed.
    pub fn delete_graph(&self, graph: &str) -> Result<Message> {
        let summary = self.store.delete_graph(graph)?;
        let message = format!(
            "Deleted {} nodes and {} edges",
            summary.nodes_deleted, summary.relationships_deleted
        );
        info!(graph, "{message}");
        Ok(Message::new(message))
    }

    /// The grouped method tree of a graph.
    pub fn method_tree(&self, graph: &str) -> Result<Vec<TreeItem>> {
        let methods = self.store.get_method_descriptors(graph)?;
        debug!(graph, methods = methods.len(), "building method tree");
        Ok(build_tree(&methods))
    }

    /// A method with its direct callers/callees and the shortest path from
    /// an entry point to it.
    pub fn method_detail(&self, graph: &str, id: &str) -> Result<MethodDetail> {
        let Some(method) = self.store.get_method(graph, id)? else {
            return Ok(MethodDetail::default());
        };

        let mut node = node_element(&method);
        node.data.callers = self.neighbor_nodes(graph, id, Direction::Callers)?;
        node.data.callees = self.neighbor_nodes(graph, id, Direction::Callees)?;

        let path = match GraphTraversal::new(self.store).find_entry_path(graph, id)? {
            Some(path) => ElementSet {
                nodes: path.nodes.iter().map(node_element).collect(),
                edges: path.edges.iter().map(call_edge_element).collect(),
            },
            None => ElementSet::default(),
        };

        Ok(MethodDetail {
            nodes: vec![node],
            edges: Vec::new(),
            path,
        })
    }

    /// Direct neighbors of a method in one direction, each with its
    /// connecting edge.
    ///
    /// With `expand`, every neighbor's own callers and callees are filled
    /// into its `data`. `only` restricts the result to one neighbor id.
    pub fn neighbors(
        &self,
        graph: &str,
        id: &str,
        direction: Direction,
        only: Option<&str>,
        expand: bool,
    ) -> Result<ElementSet> {
        if self.store.get_method(graph, id)?.is_none() {
            return Ok(ElementSet::default());
        }

        let mut collector = ElementCollector::new();
        for (neighbor, edge) in self.direct(graph, id, direction)? {
            if only.is_some_and(|wanted| wanted != neighbor.id) {
                continue;
            }
            collector.add_edge(call_edge_element(&edge));
            let node = collector.add_node(node_element(&neighbor));
            if expand {
                node.data.callers = self.neighbor_nodes(graph, &neighbor.id, Direction::Callers)?;
                node.data.callees = self.neighbor_nodes(graph, &neighbor.id, Direction::Callees)?;
            }
        }

        Ok(collector.finish())
    }

    /// Callers of `id`, expanded one more hop.
    pub fn callers(&self, graph: &str, id: &str, only: Option<&str>) -> Result<ElementSet> {
        self.neighbors(graph, id, Direction::Callers, only, true)
    }

    /// Callees of `id`, expanded one more hop.
    pub fn callees(&self, graph: &str, id: &str, only: Option<&str>) -> Result<ElementSet> {
        self.neighbors(graph, id, Direction::Callees, only, true)
    }

    fn direct(&self, graph: &str, id: &str, direction: Direction) -> Result<Vec<(Method, CallEdge)>> {
        match direction {
            Direction::Callers => self.store.get_callers(graph, id),
            Direction::Callees => self.store.get_callees(graph, id),
        }
    }

    fn neighbor_nodes(
        &self,
        graph: &str,
        id: &str,
        direction: Direction,
    ) -> Result<Vec<NodeElement>> {
        Ok(self
            .direct(graph, id, direction)?
            .iter()
            .map(|(m, _)| node_element(m))
            .collect())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
