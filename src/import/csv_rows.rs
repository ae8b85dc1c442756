//! Header-driven readers for the three import files.
//!
//! Columns are located by normalized name (see [`normalize_column`]), so
//! `method_id`, `methodId` and `Method-Id` all resolve to the same column.
//! Candidate lists below use the snake_case spelling that error messages
//! show. Cells are trimmed.

use std::collections::hash_map::Entry;
use std::collections::HashMap;

use csv::{ReaderBuilder, StringRecord, Trim};
use serde_json::{Map, Value};

use crate::error::{CallGraphError, Result};
use crate::types::{normalize_column, parse_flag, FileRole, Method};

// ---------------------------------------------------------------------------
// Column names
// ---------------------------------------------------------------------------

const METHOD_ID: &[&str] = &["id"];
const METHOD_NAME: &[&str] = &["name"];
/// Grouping key candidates, most specific first.
const METHOD_PARENT: &[&str] = &["parent_class", "parent", "declaring_type", "type"];
const METHOD_ENTRY: &[&str] = &["is_entry_point", "entry_point"];

const INVOKE_ID: &[&str] = &["id", "invoke_id"];
const INVOKE_METHOD: &[&str] = &["method_id"];

const TARGET_INVOKE: &[&str] = &["invoke_id"];
const TARGET_METHOD: &[&str] = &["target_id"];

/// Normalized header row of one file.
struct Header {
    raw: Vec<String>,
    normalized: Vec<String>,
}

impl Header {
    fn new(record: &StringRecord) -> Self {
        let raw: Vec<String> = record
            .iter()
            .map(|h| h.trim_start_matches('\u{feff}').to_string())
            .collect();
        let normalized = raw.iter().map(|h| normalize_column(h)).collect();
        Self { raw, normalized }
    }

    /// Index of the first candidate column present in the header.
    fn find(&self, candidates: &[&str]) -> Option<usize> {
        candidates
            .iter()
            .find_map(|c| {
                let wanted = normalize_column(c);
                self.normalized.iter().position(|n| *n == wanted)
            })
    }

    fn require(&self, role: FileRole, candidates: &[&str]) -> Result<usize> {
        self.find(candidates).ok_or_else(|| {
            CallGraphError::InvalidInput(format!(
                "The {role} file has no {} column",
                candidates.join("/")
            ))
        })
    }
}

fn reader(bytes: &[u8]) -> csv::Reader<&[u8]> {
    ReaderBuilder::new()
        .has_headers(true)
        .trim(Trim::All)
        .from_reader(bytes)
}

/// Non-empty cell at `idx`.
fn cell(record: &StringRecord, idx: usize) -> Option<&str> {
    record.get(idx).filter(|v| !v.is_empty())
}

// ---------------------------------------------------------------------------
// Readers
// ---------------------------------------------------------------------------

/// Parse the methods file into one [`Method`] per row of `graph`.
///
/// Every column is kept as a string attribute under its header. A row with
/// an empty id is rejected.
pub fn read_methods(bytes: &[u8], graph: &str) -> Result<Vec<Method>> {
    let mut rdr = reader(bytes);
    let header = Header::new(rdr.headers()?);
    let id_col = header.require(FileRole::Methods, METHOD_ID)?;
    let name_col = header.find(METHOD_NAME);
    let entry_col = header.find(METHOD_ENTRY);
    let parent_cols: Vec<usize> = METHOD_PARENT
        .iter()
        .filter_map(|c| header.find(&[*c]))
        .collect();

    let mut methods = Vec::new();
    for (line, record) in rdr.records().enumerate() {
        let record = record?;
        let id = cell(&record, id_col).ok_or_else(|| {
            CallGraphError::InvalidInput(format!("Row {} of the methods file has no id", line + 1))
        })?;

        let mut attributes = Map::new();
        for (key, value) in header.raw.iter().zip(record.iter()) {
            attributes.insert(key.clone(), Value::String(value.to_string()));
        }

        methods.push(Method {
            graph: graph.to_string(),
            id: id.to_string(),
            name: name_col
                .and_then(|c| cell(&record, c))
                .unwrap_or(id)
                .to_string(),
            parent: parent_cols
                .iter()
                .find_map(|&c| cell(&record, c))
                .map(String::from),
            is_entry_point: entry_col
                .and_then(|c| record.get(c))
                .is_some_and(parse_flag),
            attributes,
        });
    }

    Ok(methods)
}

/// Parse the invokes file into `invoke id -> originating method id`.
///
/// Rows missing either cell are dropped. An invoke id may appear only once.
pub fn read_invokes(bytes: &[u8]) -> Result<HashMap<String, String>> {
    let mut rdr = reader(bytes);
    let header = Header::new(rdr.headers()?);
    let invoke_col = header.require(FileRole::Invokes, INVOKE_ID)?;
    let method_col = header.require(FileRole::Invokes, INVOKE_METHOD)?;

    let mut invokes = HashMap::new();
    for record in rdr.records() {
        let record = record?;
        let (Some(invoke), Some(method)) = (cell(&record, invoke_col), cell(&record, method_col))
        else {
            continue;
        };
        match invokes.entry(invoke.to_string()) {
            Entry::Occupied(_) => {
                return Err(CallGraphError::InvalidInput(format!(
                    "Duplicate invoke id {invoke} in the invokes file"
                )));
            }
            Entry::Vacant(slot) => {
                slot.insert(method.to_string());
            }
        }
    }
    Ok(invokes)
}

/// Parse the targets file into `(invoke id, target method id)` pairs, in
/// file order. Rows missing either cell are dropped.
pub fn read_targets(bytes: &[u8]) -> Result<Vec<(String, String)>> {
    let mut rdr = reader(bytes);
    let header = Header::new(rdr.headers()?);
    let invoke_col = header.require(FileRole::Targets, TARGET_INVOKE)?;
    let target_col = header.require(FileRole::Targets, TARGET_METHOD)?;

    let mut targets = Vec::new();
    for record in rdr.records() {
        let record = record?;
        if let (Some(invoke), Some(target)) = (cell(&record, invoke_col), cell(&record, target_col))
        {
            targets.push((invoke.to_string(), target.to_string()));
        }
    }
    Ok(targets)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn methods_keep_all_columns() {
        let csv = "id,name,type,bci\n1,main,entry,0\n2,helper,normal,7\n";
        let methods = read_methods(csv.as_bytes(), "demo").unwrap();

        assert_eq!(methods.len(), 2);
        assert_eq!(methods[0].id, "1");
        assert_eq!(methods[0].name, "main");
        assert_eq!(methods[0].graph, "demo");
        assert_eq!(methods[0].parent.as_deref(), Some("entry"));
        assert_eq!(methods[1].attributes["bci"], json!("7"));
        assert_eq!(methods[1].attributes.len(), 4);
    }

    #[test]
    fn methods_parent_prefers_declaring_class() {
        let csv = "Id,Name,Type,Parent_Class,IsEntryPoint\n1,run,normal,com.App,true\n2,go,,,\n";
        let methods = read_methods(csv.as_bytes(), "g").unwrap();

        assert_eq!(methods[0].parent.as_deref(), Some("com.App"));
        assert!(methods[0].is_entry_point);
        assert_eq!(methods[1].parent, None);
        assert!(!methods[1].is_entry_point);
        assert!(methods[0].attributes.contains_key("Parent_Class"));
    }

    #[test]
    fn methods_name_defaults_to_id() {
        let methods = read_methods(b"id\n42\n", "g").unwrap();
        assert_eq!(methods[0].name, "42");
    }

    #[test]
    fn methods_strip_byte_order_mark() {
        let methods = read_methods("\u{feff}id,name\n1,main\n".as_bytes(), "g").unwrap();
        assert_eq!(methods[0].id, "1");
        assert!(methods[0].attributes.contains_key("id"));
    }

    #[test]
    fn methods_without_id_column_are_rejected() {
        let err = read_methods(b"name\nmain\n", "g").unwrap_err();
        assert_eq!(err.to_string(), "The methods file has no id column");
        assert!(err.is_client_error());
    }

    #[test]
    fn methods_row_without_id_is_rejected() {
        let err = read_methods(b"id,name\n1,a\n,b\n", "g").unwrap_err();
        assert_eq!(err.to_string(), "Row 2 of the methods file has no id");
    }

    #[test]
    fn ragged_rows_are_csv_errors() {
        let err = read_methods(b"id,name\n1,a,extra\n", "g").unwrap_err();
        assert!(matches!(err, CallGraphError::Csv(_)));
    }

    #[test]
    fn invokes_accept_either_id_column() {
        let a = read_invokes(b"invokeId,methodId\ni1,1\n").unwrap();
        let b = read_invokes(b"id,method_id\ni1,1\n").unwrap();
        assert_eq!(a, b);
        assert_eq!(a["i1"], "1");
    }

    #[test]
    fn invokes_missing_method_column_names_it() {
        let err = read_invokes(b"id,target\ni1,1\n").unwrap_err();
        assert_eq!(err.to_string(), "The invokes file has no method_id column");
    }

    #[test]
    fn invokes_reject_repeated_id() {
        let err = read_invokes(b"id,method_id\ni1,1\ni2,1\ni1,2\n").unwrap_err();
        assert_eq!(err.to_string(), "Duplicate invoke id i1 in the invokes file");
        assert!(err.is_client_error());
    }

    #[test]
    fn missing_id_column_lists_every_spelling() {
        let err = read_targets(b"target_id\n1\n").unwrap_err();
        assert_eq!(err.to_string(), "The targets file has no invoke_id column");
        let err = read_invokes(b"method_id\n1\n").unwrap_err();
        assert_eq!(err.to_string(), "The invokes file has no id/invoke_id column");
    }

    #[test]
    fn targets_keep_file_order_and_drop_blank_rows() {
        let targets = read_targets(b"invoke_id,target_id\ni2,3\ni1,\ni1,2\n").unwrap();
        assert_eq!(
            targets,
            vec![("i2".to_string(), "3".to_string()), ("i1".into(), "2".into())]
        );
    }

    #[test]
    fn targets_missing_column_is_rejected() {
        let err = read_targets(b"invoke_id\ni1\n").unwrap_err();
        assert_eq!(err.to_string(), "The targets file has no target_id column");
    }
}
