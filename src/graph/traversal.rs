//! Entry-point path search over a graph's `calls` edges.
//!
//! SQLite has no shortest-path operator, so the search runs in Rust: one
//! breadth-first pass seeded with every entry point of the graph at once.
//! Neighbors are visited in (source, target) order and the first arrival at
//! a node fixes its predecessor. When several equal-length paths exist, the
//! one returned is an artifact of that order and is not otherwise chosen.

use std::collections::{HashMap, HashSet, VecDeque};

use crate::error::{CallGraphError, Result};
use crate::graph::store::GraphStore;
use crate::types::{CallEdge, Method};

/// A shortest path from an entry point to a target method, in path order.
///
/// `edges[i]` connects `nodes[i]` to `nodes[i + 1]`.
#[derive(Debug, Clone)]
pub struct EntryPath {
    pub nodes: Vec<Method>,
    pub edges: Vec<CallEdge>,
}

/// Path queries bound to a store.
pub struct GraphTraversal<'a> {
    store: &'a GraphStore,
}

impl<'a> GraphTraversal<'a> {
    pub fn new(store: &'a GraphStore) -> Self {
        Self { store }
    }

    /// Find the shortest `calls` path from any entry point of `graph` to
    /// `target_id`.
    ///
    /// Returns `None` when the graph has no entry point that reaches the
    /// target. An entry point's own path is the single node.
    pub fn find_entry_path(&self, graph: &str, target_id: &str) -> Result<Option<EntryPath>> {
        let entries = self.store.get_entry_points(graph)?;
        if entries.is_empty() {
            return Ok(None);
        }

        let edges = self.store.get_edges(graph)?;
        let mut adjacency: HashMap<&str, Vec<&CallEdge>> = HashMap::new();
        for edge in &edges {
            adjacency.entry(edge.source.as_str()).or_default().push(edge);
        }

        let ids = match shortest_path_ids(&entries, &adjacency, target_id) {
            Some(ids) => ids,
            None => return Ok(None),
        };

        let mut nodes = Vec::with_capacity(ids.len());
        for id in &ids {
            let method = self.store.get_method(graph, id)?.ok_or_else(|| {
                CallGraphError::NotFound(format!("Method {id} on entry path is missing"))
            })?;
            nodes.push(method);
        }

        let path_edges = ids
            .windows(2)
            .filter_map(|w| {
                adjacency
                    .get(w[0].as_str())
                    .and_then(|out| out.iter().find(|e| e.target == w[1]))
                    .map(|e| (*e).clone())
            })
            .collect();

        Ok(Some(EntryPath {
            nodes,
            edges: path_edges,
        }))
    }
}

/// Multi-source BFS returning the node ids of the path, entry first.
fn shortest_path_ids(
    entries: &[String],
    adjacency: &HashMap<&str, Vec<&CallEdge>>,
    target_id: &str,
) -> Option<Vec<String>> {
    if entries.iter().any(|e| e == target_id) {
        return Some(vec![target_id.to_string()]);
    }

    let mut predecessor: HashMap<&str, &str> = HashMap::new();
    let mut visited: HashSet<&str> = entries.iter().map(String::as_str).collect();
    let mut queue: VecDeque<&str> = entries.iter().map(String::as_str).collect();

    while let Some(current) = queue.pop_front() {
        let Some(out) = adjacency.get(current) else {
            continue;
        };
        for edge in out {
            let next = edge.target.as_str();
            if !visited.insert(next) {
                continue;
            }
            predecessor.insert(next, current);
            if next == target_id {
                return Some(reconstruct(&predecessor, next));
            }
            queue.push_back(next);
        }
    }

    None
}

fn reconstruct(predecessor: &HashMap<&str, &str>, end: &str) -> Vec<String> {
    let mut path = vec![end.to_string()];
    let mut current = end;
    while let Some(prev) = predecessor.get(current) {
        path.push(prev.to_string());
        current = prev;
    }
    path.reverse();
    path
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
