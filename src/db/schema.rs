//! SQLite schema initialization for the call graph store.
//!
//! Three tables: `methods` (graph nodes), `calls` (graph edges) and `meta`
//! (per-graph comparison links). Every node and edge row carries its graph
//! name; all lookups are scoped by it.

use rusqlite::Connection;

// ---------------------------------------------------------------------------
// DDL constants
// ---------------------------------------------------------------------------

const CREATE_METHODS: &str = "\
CREATE TABLE IF NOT EXISTS methods (
  graph TEXT NOT NULL,
  id TEXT NOT NULL,
  name TEXT NOT NULL,
  parent TEXT,
  is_entrypoint INTEGER NOT NULL DEFAULT 0,
  attributes TEXT NOT NULL DEFAULT '{}'
)";

const CREATE_CALLS: &str = "\
CREATE TABLE IF NOT EXISTS calls (
  graph TEXT NOT NULL,
  source_id TEXT NOT NULL,
  target_id TEXT NOT NULL,
  value INTEGER NOT NULL DEFAULT 1,
  UNIQUE (graph, source_id, target_id)
)";

const CREATE_META: &str = "\
CREATE TABLE IF NOT EXISTS meta (
  graph_name TEXT PRIMARY KEY,
  other_graph TEXT
)";

// Constraints & indexes ------------------------------------------------------

/// Uniqueness of `(id, graph)` for methods plus the lookup indexes. All
/// statements are `IF NOT EXISTS`, so this is re-run on every import.
const CONSTRAINTS: &[&str] = &[
    "CREATE UNIQUE INDEX IF NOT EXISTS unique_method_id ON methods(id, graph)",
    "CREATE INDEX IF NOT EXISTS method_id ON methods(id)",
    "CREATE INDEX IF NOT EXISTS method_graph ON methods(graph)",
    "CREATE INDEX IF NOT EXISTS method_graph_parent ON methods(graph, parent, name)",
    "CREATE INDEX IF NOT EXISTS method_graph_entry ON methods(graph, is_entrypoint)",
    "CREATE INDEX IF NOT EXISTS calls_graph_target ON calls(graph, target_id)",
    "CREATE INDEX IF NOT EXISTS meta_other_graph ON meta(other_graph)",
];

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// (Re-)declare the uniqueness constraints and lookup indexes.
pub fn ensure_constraints(conn: &Connection) -> rusqlite::Result<()> {
    for ddl in CONSTRAINTS {
        conn.execute_batch(ddl)?;
    }
    Ok(())
}

/// Open (or create) the SQLite database at `db_path` and apply the schema.
///
/// The returned connection has WAL mode and synchronous NORMAL configured.
/// Pass `":memory:"` for a throwaway database.
///
/// # Errors
///
/// Returns a `rusqlite::Error` if the database cannot be opened or any DDL
/// statement fails.
pub fn initialize_database(db_path: &str) -> rusqlite::Result<Connection> {
    let conn = Connection::open(db_path)?;

    // -- Pragmas ----------------------------------------------------------
    conn.pragma_update(None, "journal_mode", "WAL")?;
    conn.pragma_update(None, "synchronous", "NORMAL")?;

    // -- Tables -----------------------------------------------------------
    conn.execute_batch(CREATE_METHODS)?;
    conn.execute_batch(CREATE_CALLS)?;
    conn.execute_batch(CREATE_META)?;

    // -- Indexes ----------------------------------------------------------
    ensure_constraints(&conn)?;

    Ok(conn)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn table_names(conn: &Connection) -> Vec<String> {
        let mut stmt = conn
            .prepare("SELECT name FROM sqlite_master WHERE type = 'table' ORDER BY name")
            .unwrap();
        stmt.query_map([], |row| row.get(0))
            .unwrap()
            .map(|r| r.unwrap())
            .collect()
    }

    #[test]
    fn initialize_creates_tables() {
        let conn = initialize_database(":memory:").unwrap();
        assert_eq!(table_names(&conn), vec!["calls", "meta", "methods"]);
    }

    #[test]
    fn ensure_constraints_is_idempotent() {
        let conn = initialize_database(":memory:").unwrap();
        ensure_constraints(&conn).unwrap();
        ensure_constraints(&conn).unwrap();
    }

    #[test]
    fn method_id_is_unique_per_graph() {
        let conn = initialize_database(":memory:").unwrap();
        conn.execute(
            "INSERT INTO methods (graph, id, name) VALUES ('a', '1', 'main')",
            [],
        )
        .unwrap();
        // Same id in another graph is fine.
        conn.execute(
            "INSERT INTO methods (graph, id, name) VALUES ('b', '1', 'main')",
            [],
        )
        .unwrap();
        let dup = conn.execute(
            "INSERT INTO methods (graph, id, name) VALUES ('a', '1', 'other')",
            [],
        );
        assert!(dup.is_err(), "duplicate (id, graph) must be rejected");
    }
}
