//! SQLite access layer for the call graph.
//!
//! Reads go through [`GraphStore`]; every namespace mutation goes through a
//! [`GraphWriter`], which wraps a single transaction so a purge-and-rebuild
//! either lands completely or not at all. Statements use `prepare_cached`,
//! so repeated lookups (one per neighbor during expansion) reuse the
//! compiled statement.

use rusqlite::{params, Connection, OptionalExtension, Transaction};

use crate::db::converters::{row_to_call_edge, row_to_descriptor, row_to_method};
use crate::db::schema::{ensure_constraints, initialize_database};
use crate::error::Result;
use crate::types::{CallEdge, GraphSummary, Method, MethodDescriptor, MutationSummary};

// ---------------------------------------------------------------------------
// SQL constants
// ---------------------------------------------------------------------------

const LIST_GRAPHS_SQL: &str = "\
SELECT m.graph AS name,
       count(*) AS node_count,
       (SELECT count(*) FROM calls c WHERE c.graph = m.graph) AS edge_count,
       (SELECT meta.other_graph FROM meta WHERE meta.graph_name = m.graph) AS other_graph
FROM methods m
GROUP BY m.graph
ORDER BY m.graph";

const GET_METHOD_SQL: &str = "\
SELECT * FROM methods WHERE graph = ?1 AND id = ?2";

const METHOD_DESCRIPTORS_SQL: &str = "\
SELECT id, name, parent FROM methods
WHERE graph = ?1
ORDER BY parent, name, id";

const CALLERS_SQL: &str = "\
SELECT m.*, c.source_id, c.target_id, c.value
FROM calls c
JOIN methods m ON m.graph = c.graph AND m.id = c.source_id
WHERE c.graph = ?1 AND c.target_id = ?2
ORDER BY m.id";

const CALLEES_SQL: &str = "\
SELECT m.*, c.source_id, c.target_id, c.value
FROM calls c
JOIN methods m ON m.graph = c.graph AND m.id = c.target_id
WHERE c.graph = ?1 AND c.source_id = ?2
ORDER BY m.id";

const GRAPH_EDGES_SQL: &str = "\
SELECT * FROM calls WHERE graph = ?1 ORDER BY source_id, target_id";

const ENTRY_POINTS_SQL: &str = "\
SELECT id FROM methods WHERE graph = ?1 AND is_entrypoint = 1 ORDER BY id";

const DELETE_CALLS_SQL: &str = "DELETE FROM calls WHERE graph = ?1";

const DELETE_METHODS_SQL: &str = "DELETE FROM methods WHERE graph = ?1";

const DELETE_META_SQL: &str = "DELETE FROM meta WHERE graph_name = ?1";

const UNLINK_COMPARISONS_SQL: &str = "DELETE FROM meta WHERE other_graph = ?1";

const INSERT_METHOD_SQL: &str = "\
INSERT INTO methods (graph, id, name, parent, is_entrypoint, attributes)
VALUES (?1, ?2, ?3, ?4, ?5, ?6)";

/// Merge one call: insert the edge when both endpoints exist in the graph,
/// or bump `value` if the pair is already connected.
const MERGE_CALL_SQL: &str = "\
INSERT INTO calls (graph, source_id, target_id, value)
SELECT ?1, ?2, ?3, 1
WHERE EXISTS (SELECT 1 FROM methods WHERE graph = ?1 AND id = ?2)
  AND EXISTS (SELECT 1 FROM methods WHERE graph = ?1 AND id = ?3)
ON CONFLICT (graph, source_id, target_id) DO UPDATE SET value = value + 1
RETURNING value";

const UPSERT_META_SQL: &str = "\
INSERT INTO meta (graph_name, other_graph) VALUES (?1, ?2)
ON CONFLICT (graph_name) DO UPDATE SET other_graph = excluded.other_graph";

// ---------------------------------------------------------------------------
// GraphStore
// ---------------------------------------------------------------------------

/// Typed wrapper around the call graph SQLite database.
pub struct GraphStore {
    pub conn: Connection,
}

impl std::fmt::Debug for GraphStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GraphStore").finish_non_exhaustive()
    }
}

impl GraphStore {
    /// Open (or create) the database at `db_path`, apply the schema, and
    /// return a ready-to-use store.
    pub fn new(db_path: &str) -> Result<Self> {
        let conn = initialize_database(db_path)?;
        Ok(Self { conn })
    }

    /// Wrap an already-open connection. Useful in tests where the caller
    /// has already called `initialize_database(":memory:")`.
    pub fn from_connection(conn: Connection) -> Self {
        Self { conn }
    }

    /// Start a write transaction. Dropping the writer without calling
    /// [`GraphWriter::commit`] rolls every change back.
    pub fn writer(&self) -> Result<GraphWriter<'_>> {
        Ok(GraphWriter {
            tx: self.conn.unchecked_transaction()?,
        })
    }

    // -------------------------------------------------------------------
    // Graph-level operations
    // -------------------------------------------------------------------

    /// Every graph with its node/edge counts and comparison link, by name.
    pub fn list_graphs(&self) -> Result<Vec<GraphSummary>> {
        let mut stmt = self.conn.prepare_cached(LIST_GRAPHS_SQL)?;
        let rows = stmt.query_map([], |row| {
            let node_count: i64 = row.get("node_count")?;
            let edge_count: i64 = row.get("edge_count")?;
            Ok(GraphSummary {
                name: row.get("name")?,
                node_count: node_count as usize,
                edge_count: edge_count as usize,
                other_graph: row.get("other_graph")?,
            })
        })?;
        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Into::into)
    }

    /// Delete a graph's edges, nodes and metadata (including links from
    /// other graphs that compare against it). Unknown graphs delete nothing.
    pub fn delete_graph(&self, graph: &str) -> Result<MutationSummary> {
        let writer = self.writer()?;
        let summary = writer.purge_graph(graph)?;
        writer.unlink_comparisons(graph)?;
        writer.commit()?;
        Ok(summary)
    }

    /// The comparison graph registered for `graph`, if any.
    pub fn get_other_graph(&self, graph: &str) -> Result<Option<String>> {
        let mut stmt = self
            .conn
            .prepare_cached("SELECT other_graph FROM meta WHERE graph_name = ?1")?;
        let other: Option<Option<String>> = stmt
            .query_row(params![graph], |row| row.get(0))
            .optional()?;
        Ok(other.flatten())
    }

    // -------------------------------------------------------------------
    // Queries: methods
    // -------------------------------------------------------------------

    /// Retrieve one method, or `None` if the graph has no such id.
    pub fn get_method(&self, graph: &str, id: &str) -> Result<Option<Method>> {
        let mut stmt = self.conn.prepare_cached(GET_METHOD_SQL)?;
        let method = stmt.query_row(params![graph, id], row_to_method).optional()?;
        Ok(method)
    }

    /// All methods of a graph, ordered by grouping key (nulls first), then
    /// name.
    pub fn get_method_descriptors(&self, graph: &str) -> Result<Vec<MethodDescriptor>> {
        let mut stmt = self.conn.prepare_cached(METHOD_DESCRIPTORS_SQL)?;
        let rows = stmt.query_map(params![graph], row_to_descriptor)?;
        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Into::into)
    }

    /// Ids of the graph's entry-point methods, ascending.
    pub fn get_entry_points(&self, graph: &str) -> Result<Vec<String>> {
        let mut stmt = self.conn.prepare_cached(ENTRY_POINTS_SQL)?;
        let rows = stmt.query_map(params![graph], |row| row.get(0))?;
        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Into::into)
    }

    // -------------------------------------------------------------------
    // Queries: neighbors
    // -------------------------------------------------------------------

    /// Methods with a direct `calls` edge into `id`, each with that edge.
    pub fn get_callers(&self, graph: &str, id: &str) -> Result<Vec<(Method, CallEdge)>> {
        self.neighbors(CALLERS_SQL, graph, id)
    }

    /// Methods `id` calls directly, each with the connecting edge.
    pub fn get_callees(&self, graph: &str, id: &str) -> Result<Vec<(Method, CallEdge)>> {
        self.neighbors(CALLEES_SQL, graph, id)
    }

    fn neighbors(&self, sql: &str, graph: &str, id: &str) -> Result<Vec<(Method, CallEdge)>> {
        let mut stmt = self.conn.prepare_cached(sql)?;
        let rows = stmt.query_map(params![graph, id], |row| {
            Ok((row_to_method(row)?, row_to_call_edge(row)?))
        })?;
        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Into::into)
    }

    // -------------------------------------------------------------------
    // Queries: edges & counts
    // -------------------------------------------------------------------

    /// Every edge of a graph, ordered by (source, target).
    pub fn get_edges(&self, graph: &str) -> Result<Vec<CallEdge>> {
        let mut stmt = self.conn.prepare_cached(GRAPH_EDGES_SQL)?;
        let rows = stmt.query_map(params![graph], row_to_call_edge)?;
        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Into::into)
    }

    /// Number of methods in a graph.
    pub fn get_method_count(&self, graph: &str) -> Result<usize> {
        count(&self.conn, "SELECT count(*) FROM methods WHERE graph = ?1", graph)
    }

    /// Number of `calls` edges in a graph.
    pub fn get_edge_count(&self, graph: &str) -> Result<usize> {
        count(&self.conn, "SELECT count(*) FROM calls WHERE graph = ?1", graph)
    }
}

fn count(conn: &Connection, sql: &str, graph: &str) -> Result<usize> {
    let mut stmt = conn.prepare_cached(sql)?;
    let n: i64 = stmt.query_row(params![graph], |row| row.get(0))?;
    Ok(n as usize)
}

// ---------------------------------------------------------------------------
// GraphWriter
// ---------------------------------------------------------------------------

/// A write transaction over the call graph.
pub struct GraphWriter<'a> {
    tx: Transaction<'a>,
}

impl GraphWriter<'_> {
    /// Delete every edge, then every node, of `graph`, plus its own
    /// comparison link.
    pub fn purge_graph(&self, graph: &str) -> Result<MutationSummary> {
        let relationships_deleted = self
            .tx
            .prepare_cached(DELETE_CALLS_SQL)?
            .execute(params![graph])?;
        let nodes_deleted = self
            .tx
            .prepare_cached(DELETE_METHODS_SQL)?
            .execute(params![graph])?;
        self.tx.prepare_cached(DELETE_META_SQL)?.execute(params![graph])?;

        Ok(MutationSummary {
            nodes_deleted,
            relationships_deleted,
            ..Default::default()
        })
    }

    /// Remove comparison links from other graphs that point at `graph`.
    pub fn unlink_comparisons(&self, graph: &str) -> Result<usize> {
        let n = self
            .tx
            .prepare_cached(UNLINK_COMPARISONS_SQL)?
            .execute(params![graph])?;
        Ok(n)
    }

    /// Re-declare uniqueness constraints and lookup indexes.
    pub fn ensure_constraints(&self) -> Result<()> {
        ensure_constraints(&self.tx)?;
        Ok(())
    }

    /// Create one node per method. Fails on a duplicate `(id, graph)`.
    pub fn insert_methods(&self, methods: &[Method]) -> Result<MutationSummary> {
        let mut stmt = self.tx.prepare_cached(INSERT_METHOD_SQL)?;
        let mut nodes_created = 0;
        for method in methods {
            let attributes = serde_json::to_string(&method.attributes)?;
            nodes_created += stmt.execute(params![
                method.graph,
                method.id,
                method.name,
                method.parent,
                method.is_entry_point as i32,
                attributes,
            ])?;
        }
        Ok(MutationSummary {
            nodes_created,
            ..Default::default()
        })
    }

    /// Merge one batch of `(source, target)` calls into `graph`.
    ///
    /// A pair creates an edge the first time it is seen and bumps `value` on
    /// every later occurrence. Pairs naming a method missing from the graph
    /// are skipped and appear in neither counter.
    pub fn merge_calls(&self, graph: &str, pairs: &[(String, String)]) -> Result<MutationSummary> {
        let mut stmt = self.tx.prepare_cached(MERGE_CALL_SQL)?;
        let mut summary = MutationSummary::default();
        for (source, target) in pairs {
            let value: Option<i64> = stmt
                .query_row(params![graph, source, target], |row| row.get(0))
                .optional()?;
            match value {
                Some(1) => summary.relationships_created += 1,
                Some(_) => summary.relationships_merged += 1,
                None => {}
            }
        }
        Ok(summary)
    }

    /// Number of `calls` edges currently in `graph` (as seen by this
    /// transaction).
    pub fn count_calls(&self, graph: &str) -> Result<usize> {
        count(&self.tx, "SELECT count(*) FROM calls WHERE graph = ?1", graph)
    }

    /// Register `other` as the comparison graph of `graph`.
    pub fn set_other_graph(&self, graph: &str, other: &str) -> Result<()> {
        self.tx
            .prepare_cached(UPSERT_META_SQL)?
            .execute(params![graph, other])?;
        Ok(())
    }

    pub fn commit(self) -> Result<()> {
        self.tx.commit()?;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
