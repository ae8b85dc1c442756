//! End-to-end import tests against a file-backed database.
//!
//! These tests run the import pipeline the way the CLI does, then reopen
//! the database and verify the graph through the query facade.

use std::path::Path;

use pretty_assertions::assert_eq;
use tempfile::TempDir;

use callgraph::graph::queries::GraphQueries;
use callgraph::graph::store::GraphStore;
use callgraph::import::{ImportOptions, ImportPipeline, ImportRequest, UploadedFile};
use callgraph::viz::tree::TreeItem;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn open(dir: &Path) -> GraphStore {
    GraphStore::new(&dir.join("callgraph.db").to_string_lossy()).unwrap()
}

fn options(dir: &Path, batch_size: usize) -> ImportOptions {
    ImportOptions {
        csv_dir: dir.join("csv"),
        batch_size,
    }
}

fn request(graph: &str, methods: String, invokes: String, targets: String) -> ImportRequest {
    ImportRequest {
        graph: graph.into(),
        other_graph: None,
        files: vec![
            UploadedFile::new("call_tree_methods.csv", 1, methods),
            UploadedFile::new("call_tree_invokes.csv", 1, invokes),
            UploadedFile::new("call_tree_targets.csv", 1, targets),
        ],
    }
}

/// A chain `0 -> 1 -> ... -> n-1` where method 0 is the only entry point,
/// each call site listed `repeat` times.
fn chain(n: usize, repeat: usize) -> (String, String, String) {
    let mut methods = String::from("id,name,parent,is_entry_point\n");
    for i in 0..n {
        let parent = if i % 2 == 0 { "Even" } else { "Odd" };
        methods.push_str(&format!("{i},m{i},{parent},{}\n", i == 0));
    }

    let mut invokes = String::from("id,method_id\n");
    let mut targets = String::from("invoke_id,target_id\n");
    for i in 0..n.saturating_sub(1) {
        for r in 0..repeat {
            invokes.push_str(&format!("inv{i}_{r},{i}\n"));
            targets.push_str(&format!("inv{i}_{r},{}\n", i + 1));
        }
    }
    (methods, invokes, targets)
}

// ===========================================================================
// Tests
// ===========================================================================

#[test]
fn import_survives_reopen() {
    let dir = TempDir::new().unwrap();
    {
        let store = open(dir.path());
        let opts = options(dir.path(), 1000);
        let (m, i, t) = chain(5, 1);
        let result = ImportPipeline::new(&store, &opts)
            .run(&request("chain", m, i, t))
            .unwrap();
        assert_eq!(result.to_string(), "Imported 5 nodes and 4 edges");
    }

    let store = open(dir.path());
    let graphs = GraphQueries::new(&store).list_graphs().unwrap();
    assert_eq!(graphs.len(), 1);
    assert_eq!(graphs[0].name, "chain");
    assert_eq!(graphs[0].node_count, 5);
    assert_eq!(graphs[0].edge_count, 4);
}

#[test]
fn many_batches_produce_same_graph_as_one() {
    let dir = TempDir::new().unwrap();
    let store = open(dir.path());
    let (m, i, t) = chain(300, 4);

    let small = options(dir.path(), 7);
    let big = options(dir.path(), 10_000);
    let a = ImportPipeline::new(&store, &small)
        .run(&request("a", m.clone(), i.clone(), t.clone()))
        .unwrap();
    let b = ImportPipeline::new(&store, &big)
        .run(&request("b", m, i, t))
        .unwrap();

    assert_eq!(a.nodes_created, 300);
    assert_eq!(a.edges_created, 299);
    assert_eq!(a.edges_created, b.edges_created);
    assert!(store.get_edges("a").unwrap().iter().all(|e| e.value == 4));
}

#[test]
fn graphs_are_isolated() {
    let dir = TempDir::new().unwrap();
    let store = open(dir.path());
    let opts = options(dir.path(), 1000);
    let pipeline = ImportPipeline::new(&store, &opts);

    let (m, i, t) = chain(4, 1);
    pipeline.run(&request("left", m, i, t)).unwrap();
    let (m, i, t) = chain(2, 1);
    pipeline.run(&request("right", m, i, t)).unwrap();

    // Same method ids in both graphs; each sees only its own edges.
    let queries = GraphQueries::new(&store);
    assert_eq!(queries.callees("left", "1", None).unwrap().nodes.len(), 1);
    assert!(queries.callees("right", "1", None).unwrap().is_empty());

    queries.delete_graph("right").unwrap();
    assert_eq!(store.get_method_count("left").unwrap(), 4);
}

#[test]
fn long_chain_path_runs_from_the_entry() {
    let dir = TempDir::new().unwrap();
    let store = open(dir.path());
    let opts = options(dir.path(), 1000);
    let (m, i, t) = chain(12, 1);
    ImportPipeline::new(&store, &opts)
        .run(&request("chain", m, i, t))
        .unwrap();

    let detail = GraphQueries::new(&store).method_detail("chain", "11").unwrap();
    let ids: Vec<&str> = detail.path.nodes.iter().map(|n| n.id.as_str()).collect();
    let expected: Vec<String> = (0..12).map(|i| i.to_string()).collect();
    assert_eq!(ids, expected.iter().map(String::as_str).collect::<Vec<_>>());
    assert_eq!(detail.path.edges.len(), 11);
}

#[test]
fn tree_after_import_groups_by_parent() {
    let dir = TempDir::new().unwrap();
    let store = open(dir.path());
    let opts = options(dir.path(), 1000);
    let (m, i, t) = chain(5, 1);
    ImportPipeline::new(&store, &opts)
        .run(&request("chain", m, i, t))
        .unwrap();

    let tree = GraphQueries::new(&store).method_tree("chain").unwrap();
    let groups: Vec<(&str, usize)> = tree
        .iter()
        .map(|item| match item {
            TreeItem::Group { name, children, .. } => (name.as_str(), children.len()),
            TreeItem::Leaf(leaf) => (leaf.id.as_str(), 1),
        })
        .collect();
    assert_eq!(groups, vec![("Even", 3), ("Odd", 2)]);
}

#[test]
fn audit_copies_are_overwritten_by_reimport() {
    let dir = TempDir::new().unwrap();
    let store = open(dir.path());
    let opts = options(dir.path(), 1000);
    let pipeline = ImportPipeline::new(&store, &opts);

    let (m, i, t) = chain(3, 1);
    pipeline.run(&request("g", m, i, t)).unwrap();
    let (m, i, t) = chain(4, 1);
    pipeline.run(&request("g", m.clone(), i, t)).unwrap();

    let saved = std::fs::read_to_string(dir.path().join("csv/g/call_tree_methods.csv")).unwrap();
    assert_eq!(saved, m);
}

#[test]
fn malformed_targets_leave_previous_graph() {
    let dir = TempDir::new().unwrap();
    let store = open(dir.path());
    let opts = options(dir.path(), 1000);
    let pipeline = ImportPipeline::new(&store, &opts);

    let (m, i, t) = chain(3, 1);
    pipeline.run(&request("g", m.clone(), i.clone(), t)).unwrap();

    let err = pipeline
        .run(&request("g", m, i, "invoke_id,target_id\nx,1,extra\n".into()))
        .unwrap_err();
    assert_eq!(err.code(), "csv");
    assert_eq!(store.get_method_count("g").unwrap(), 3);
    assert_eq!(store.get_edge_count("g").unwrap(), 2);
}
