//! Import pipeline: replace a graph with the contents of three CSV files.
//!
//! # Phases
//!
//! 1. **Select** the newest `methods`, `invokes` and `targets` upload.
//! 2. **Persist** the selected files under `<csv_dir>/<graph>/` as audit
//!    copies. Nothing reads them back.
//! 3. **Parse** all three files. Any CSV or column error aborts here,
//!    before the store is touched.
//! 4. **Rebuild** inside one write transaction: purge the graph, re-declare
//!    constraints, insert methods, merge calls batch by batch, count the
//!    resulting edges and record the comparison graph. A failure anywhere in
//!    this phase rolls back to the previous contents.

use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;

use sha2::{Digest, Sha256};
use tracing::{debug, info, warn};

use crate::error::{CallGraphError, Result};
use crate::graph::store::GraphStore;
use crate::import::csv_rows::{read_invokes, read_methods, read_targets};
use crate::import::selection::{select_newest, SelectedFiles, UploadedFile};
use crate::types::{FileRole, Method, MutationSummary};

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Number of target rows merged per batch.
pub const DEFAULT_BATCH_SIZE: usize = 1000;

// ---------------------------------------------------------------------------
// Public types
// ---------------------------------------------------------------------------

/// Options shared by every import run.
#[derive(Debug, Clone)]
pub struct ImportOptions {
    /// Root of the audit copies.
    pub csv_dir: PathBuf,
    pub batch_size: usize,
}

impl Default for ImportOptions {
    fn default() -> Self {
        Self {
            csv_dir: PathBuf::from("csv"),
            batch_size: DEFAULT_BATCH_SIZE,
        }
    }
}

/// One import request.
#[derive(Debug, Clone)]
pub struct ImportRequest {
    pub graph: String,
    pub other_graph: Option<String>,
    pub files: Vec<UploadedFile>,
}

/// Summary of an import run.
#[derive(Debug, Clone)]
pub struct ImportResult {
    pub graph: String,
    pub nodes_created: usize,
    pub edges_created: usize,
    /// Target rows that resolved to no edge.
    pub skipped_targets: usize,
    pub saved_files: Vec<PathBuf>,
    pub duration_ms: u128,
}

impl std::fmt::Display for ImportResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Imported {} nodes and {} edges",
            self.nodes_created, self.edges_created
        )
    }
}

/// Parsed contents of the three selected files.
struct ParsedFiles {
    methods: Vec<Method>,
    invokes: HashMap<String, String>,
    targets: Vec<(String, String)>,
}

// ---------------------------------------------------------------------------
// Pipeline
// ---------------------------------------------------------------------------

pub struct ImportPipeline<'a> {
    store: &'a GraphStore,
    options: &'a ImportOptions,
}

impl<'a> ImportPipeline<'a> {
    pub fn new(store: &'a GraphStore, options: &'a ImportOptions) -> Self {
        Self { store, options }
    }

    /// Run every phase for `request` and report what was created.
    pub fn run(&self, request: &ImportRequest) -> Result<ImportResult> {
        let start = Instant::now();
        let graph = request.graph.as_str();
        validate_graph_name(graph)?;
        if let Some(other) = request.other_graph.as_deref() {
            validate_graph_name(other)?;
        }

        // ---- Select ----
        let selected = select_newest(&request.files)?;
        for role in FileRole::ALL {
            info!(graph, %role, file = %selected.get(role).file_name, "selected import file");
        }

        // ---- Persist ----
        let saved_files = save_files(&self.options.csv_dir, graph, &selected)?;
        info!(graph, dir = %self.options.csv_dir.join(graph).display(), "saved import files");

        // ---- Parse ----
        let parsed = parse_files(graph, &selected)?;

        // ---- Rebuild ----
        let writer = self.store.writer()?;
        let purged = writer.purge_graph(graph)?;
        info!(
            graph,
            nodes = purged.nodes_deleted,
            edges = purged.relationships_deleted,
            "purged previous graph"
        );

        writer.ensure_constraints()?;

        let created = writer.insert_methods(&parsed.methods)?;
        info!(graph, nodes = created.nodes_created, "created methods");

        let batch_size = self.options.batch_size.max(1);
        let mut calls = MutationSummary::default();
        for (batch, rows) in parsed.targets.chunks(batch_size).enumerate() {
            let pairs: Vec<(String, String)> = rows
                .iter()
                .filter_map(|(invoke, target)| {
                    parsed
                        .invokes
                        .get(invoke)
                        .map(|source| (source.clone(), target.clone()))
                })
                .collect();
            let merged = writer.merge_calls(graph, &pairs)?;
            debug!(
                graph,
                batch,
                rows = rows.len(),
                created = merged.relationships_created,
                merged = merged.relationships_merged,
                "merged call batch"
            );
            calls += merged;
        }
        let skipped_targets =
            parsed.targets.len() - calls.relationships_created - calls.relationships_merged;
        if skipped_targets > 0 {
            warn!(
                graph,
                skipped = skipped_targets,
                "target rows with an unknown invoke or method were skipped"
            );
        }

        let edges_created = calls.relationships_created;
        let stored = writer.count_calls(graph)?;
        info!(graph, edges = edges_created, stored, "created calls");

        if let Some(other) = request.other_graph.as_deref() {
            writer.set_other_graph(graph, other)?;
            debug!(graph, other, "linked comparison graph");
        }

        writer.commit()?;
        drop(parsed);

        let result = ImportResult {
            graph: graph.to_string(),
            nodes_created: created.nodes_created,
            edges_created,
            skipped_targets,
            saved_files,
            duration_ms: start.elapsed().as_millis(),
        };
        info!(graph, duration_ms = result.duration_ms as u64, "{result}");
        Ok(result)
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Reject graph names that are empty or would not get a directory of their
/// own under the CSV directory.
pub fn validate_graph_name(name: &str) -> Result<()> {
    if name.trim().is_empty() {
        return Err(CallGraphError::InvalidInput(
            "Graph name must not be empty".into(),
        ));
    }
    if name == "."
        || name.contains('/')
        || name.contains('\\')
        || name.contains("..")
        || name.contains('\0')
    {
        return Err(CallGraphError::InvalidInput(format!(
            "Invalid graph name: {name}"
        )));
    }
    Ok(())
}

/// Write the selected files to `<csv_dir>/<graph>/call_tree_<role>.csv`.
fn save_files(csv_dir: &Path, graph: &str, selected: &SelectedFiles<'_>) -> Result<Vec<PathBuf>> {
    let dir = csv_dir.join(graph);
    fs::create_dir_all(&dir)?;

    let mut saved = Vec::with_capacity(FileRole::ALL.len());
    for role in FileRole::ALL {
        let file = selected.get(role);
        let path = dir.join(format!("call_tree_{role}.csv"));
        fs::write(&path, &file.contents)?;
        debug!(
            path = %path.display(),
            bytes = file.contents.len(),
            sha256 = %sha256_hex(&file.contents),
            "wrote audit copy"
        );
        saved.push(path);
    }
    Ok(saved)
}

fn parse_files(graph: &str, selected: &SelectedFiles<'_>) -> Result<ParsedFiles> {
    let methods = read_methods(&selected.methods.contents, graph)?;
    let mut seen = HashSet::with_capacity(methods.len());
    if let Some(dup) = methods.iter().find(|m| !seen.insert(m.id.as_str())) {
        return Err(CallGraphError::InvalidInput(format!(
            "Duplicate method id {} in the methods file",
            dup.id
        )));
    }

    let invokes = read_invokes(&selected.invokes.contents)?;
    let targets = read_targets(&selected.targets.contents)?;
    debug!(
        graph,
        methods = methods.len(),
        invokes = invokes.len(),
        targets = targets.len(),
        "parsed import files"
    );

    Ok(ParsedFiles {
        methods,
        invokes,
        targets,
    })
}

fn sha256_hex(content: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content);
    hex::encode(hasher.finalize())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
