//! Row-to-struct converters for call graph queries.
//!
//! Converts raw `rusqlite::Row` values into the domain types defined in
//! `crate::types`. Columns are read by name, so joined queries only need to
//! select the expected column names.

use rusqlite::Row;

use crate::types::{CallEdge, Method, MethodDescriptor};

// ---------------------------------------------------------------------------
// Method conversion
// ---------------------------------------------------------------------------

/// Convert a row selecting `methods.*` into a [`Method`].
///
/// The `attributes` column is a JSON object string; an unparsable value
/// yields an empty attribute map rather than an error.
pub fn row_to_method(row: &Row<'_>) -> rusqlite::Result<Method> {
    let graph: String = row.get("graph")?;
    let id: String = row.get("id")?;
    let name: String = row.get("name")?;
    let parent: Option<String> = row.get("parent")?;
    let is_entry_point: bool = row.get::<_, i64>("is_entrypoint")? != 0;
    let attributes_json: Option<String> = row.get("attributes")?;

    let attributes = attributes_json
        .as_deref()
        .and_then(|s| serde_json::from_str(s).ok())
        .unwrap_or_default();

    Ok(Method {
        graph,
        id,
        name,
        parent,
        is_entry_point,
        attributes,
    })
}

/// Convert a row with `id`, `name` and `parent` columns into a
/// [`MethodDescriptor`].
pub fn row_to_descriptor(row: &Row<'_>) -> rusqlite::Result<MethodDescriptor> {
    Ok(MethodDescriptor {
        id: row.get("id")?,
        name: row.get("name")?,
        parent: row.get("parent")?,
    })
}

// ---------------------------------------------------------------------------
// Edge conversion
// ---------------------------------------------------------------------------

/// Convert a row with `graph`, `source_id`, `target_id` and `value` columns
/// into a [`CallEdge`].
pub fn row_to_call_edge(row: &Row<'_>) -> rusqlite::Result<CallEdge> {
    Ok(CallEdge {
        graph: row.get("graph")?,
        source: row.get("source_id")?,
        target: row.get("target_id")?,
        value: row.get("value")?,
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
