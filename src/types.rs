//! Core domain types for the call graph store.
//!
//! A *graph* (namespace) is one imported call-graph dataset. Methods and
//! calls are always scoped by their graph name, so several datasets can live
//! in the same database side by side.

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Method
// ---------------------------------------------------------------------------

/// A method node in a call graph.
///
/// `attributes` holds every column of the imported CSV row verbatim (keyed
/// by the CSV header); `name`, `parent` and `is_entry_point` are the
/// normalized views the queries work with.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Method {
    pub graph: String,
    pub id: String,
    pub name: String,
    /// Grouping key (containing class/type), `None` for top-level methods.
    pub parent: Option<String>,
    pub is_entry_point: bool,
    pub attributes: serde_json::Map<String, serde_json::Value>,
}

// ---------------------------------------------------------------------------
// CallEdge
// ---------------------------------------------------------------------------

/// A directed `calls` edge between two methods of the same graph.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallEdge {
    pub graph: String,
    pub source: String,
    pub target: String,
    /// Number of call sites that resolved to this (source, target) pair.
    pub value: i64,
}

// ---------------------------------------------------------------------------
// MethodDescriptor
// ---------------------------------------------------------------------------

/// The slim projection of a method used to build the method tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MethodDescriptor {
    pub id: String,
    pub name: String,
    pub parent: Option<String>,
}

// ---------------------------------------------------------------------------
// GraphSummary
// ---------------------------------------------------------------------------

/// One row of the graph listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphSummary {
    pub name: String,
    pub node_count: usize,
    pub edge_count: usize,
    /// Comparison graph registered for this graph, if any.
    pub other_graph: Option<String>,
}

// ---------------------------------------------------------------------------
// MutationSummary
// ---------------------------------------------------------------------------

/// Counters reported by a mutating store operation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct MutationSummary {
    pub nodes_created: usize,
    pub nodes_deleted: usize,
    pub relationships_created: usize,
    /// Existing relationships whose weight was bumped.
    pub relationships_merged: usize,
    pub relationships_deleted: usize,
}

impl std::ops::AddAssign for MutationSummary {
    fn add_assign(&mut self, other: Self) {
        self.nodes_created += other.nodes_created;
        self.nodes_deleted += other.nodes_deleted;
        self.relationships_created += other.relationships_created;
        self.relationships_merged += other.relationships_merged;
        self.relationships_deleted += other.relationships_deleted;
    }
}

// ---------------------------------------------------------------------------
// Message
// ---------------------------------------------------------------------------

/// `{"message": ...}` response body used by mutating endpoints.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub message: String,
}

impl Message {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

// ---------------------------------------------------------------------------
// FileRole
// ---------------------------------------------------------------------------

/// The three CSV inputs of an import, identified by filename substring.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileRole {
    Methods,
    Invokes,
    Targets,
}

impl FileRole {
    /// All roles, in the order they are loaded and reported.
    pub const ALL: [FileRole; 3] = [FileRole::Methods, FileRole::Invokes, FileRole::Targets];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Methods => "methods",
            Self::Invokes => "invokes",
            Self::Targets => "targets",
        }
    }

    /// Whether `file_name` is a CSV file carrying this role.
    pub fn matches(&self, file_name: &str) -> bool {
        let lower = file_name.to_lowercase();
        lower.ends_with(".csv") && lower.contains(self.as_str())
    }
}

impl std::fmt::Display for FileRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Interpret a boolean-like CSV cell (`true`, `1`, `yes`, ...).
pub fn parse_flag(value: &str) -> bool {
    matches!(
        value.trim().to_lowercase().as_str(),
        "true" | "1" | "yes" | "y" | "t"
    )
}

/// Normalize a CSV header for loose matching: lowercase, with `_`, `-` and
/// spaces removed, so `MethodId`, `method_id` and `method-id` compare equal.
pub fn normalize_column(name: &str) -> String {
    name.trim()
        .trim_start_matches('\u{feff}')
        .chars()
        .filter(|c| !matches!(c, '_' | '-' | ' '))
        .flat_map(char::to_lowercase)
        .collect()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
