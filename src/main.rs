use std::fs;
use std::path::{Path, PathBuf};
use std::process;

use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use walkdir::WalkDir;

use callgraph::config::{load_config, CallGraphConfig, CliOverrides};
use callgraph::error::Result;
use callgraph::graph::queries::GraphQueries;
use callgraph::graph::store::GraphStore;
use callgraph::import::{ImportPipeline, ImportRequest, UploadedFile};
use callgraph::observability::init_logging;

#[derive(Parser)]
#[command(name = "callgraph")]
#[command(version, about = "Call graph explorer: CSV import, graph queries and HTTP API")]
struct Cli {
    /// Database path (overrides config and CALLGRAPH_DB)
    #[arg(long, global = true)]
    db: Option<PathBuf>,

    /// Directory for audit copies of imported CSV files
    #[arg(long, global = true)]
    csv_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP API server
    Serve {
        /// Bind address, e.g. 127.0.0.1:8000
        #[arg(long)]
        addr: Option<String>,
    },
    /// Import methods/invokes/targets CSV files into a graph
    Import {
        /// Graph (namespace) to replace
        #[arg(long)]
        graph: String,
        /// Comparison graph to link to
        #[arg(long)]
        other_graph: Option<String>,
        /// CSV files or directories containing them
        #[arg(required = true)]
        paths: Vec<PathBuf>,
    },
    /// List graphs with node and edge counts
    Graphs,
    /// Delete a graph
    Delete {
        name: String,
    },
    /// Print the method tree of a graph as JSON
    Tree {
        name: String,
    },
}

fn main() {
    init_logging();
    let cli = Cli::parse();

    let addr = match &cli.command {
        Commands::Serve { addr } => addr.clone(),
        _ => None,
    };
    let overrides = CliOverrides {
        addr,
        db_path: cli.db.clone(),
        csv_dir: cli.csv_dir.clone(),
    };
    let cwd = std::env::current_dir().ok();
    let config = load_config(&overrides, cwd.as_deref()).unwrap_or_else(|e| fail("invalid configuration", e));

    match cli.command {
        Commands::Serve { .. } => cmd_serve(&config),
        Commands::Import {
            graph,
            other_graph,
            paths,
        } => cmd_import(&config, graph, other_graph, &paths),
        Commands::Graphs => cmd_graphs(&config),
        Commands::Delete { name } => cmd_delete(&config, &name),
        Commands::Tree { name } => cmd_tree(&config, &name),
    }
}

// ---------------------------------------------------------------------------
// CLI command implementations
// ---------------------------------------------------------------------------

fn fail(context: &str, e: impl std::fmt::Display) -> ! {
    eprintln!("Error: {}: {}", context, e);
    process::exit(1);
}

fn open_store(config: &CallGraphConfig) -> GraphStore {
    let db_path = config.storage.db_path.to_string_lossy();
    GraphStore::new(&db_path).unwrap_or_else(|e| fail("cannot open database", e))
}

fn cmd_serve(config: &CallGraphConfig) {
    let rt = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .unwrap_or_else(|e| fail("cannot create async runtime", e));

    rt.block_on(async {
        if let Err(e) = callgraph::viz::run_server(config).await {
            fail("server failed", e);
        }
    });
}

fn cmd_import(config: &CallGraphConfig, graph: String, other_graph: Option<String>, paths: &[PathBuf]) {
    let files = collect_uploads(paths).unwrap_or_else(|e| fail("cannot read input files", e));
    let store = open_store(config);
    let options = config.import_options();
    let request = ImportRequest {
        graph,
        other_graph,
        files,
    };

    match ImportPipeline::new(&store, &options).run(&request) {
        Ok(result) => println!("{result}"),
        Err(e) => fail("import failed", e),
    }
}

fn cmd_graphs(config: &CallGraphConfig) {
    let store = open_store(config);
    let graphs = GraphQueries::new(&store)
        .list_graphs()
        .unwrap_or_else(|e| fail("cannot list graphs", e));

    if graphs.is_empty() {
        println!("No graphs imported.");
        return;
    }
    for g in graphs {
        match g.other_graph {
            Some(other) => println!(
                "{}  nodes={} edges={} other={}",
                g.name, g.node_count, g.edge_count, other
            ),
            None => println!("{}  nodes={} edges={}", g.name, g.node_count, g.edge_count),
        }
    }
}

fn cmd_delete(config: &CallGraphConfig, name: &str) {
    let store = open_store(config);
    match GraphQueries::new(&store).delete_graph(name) {
        Ok(msg) => println!("{}", msg.message),
        Err(e) => fail("delete failed", e),
    }
}

fn cmd_tree(config: &CallGraphConfig, name: &str) {
    let store = open_store(config);
    let tree = GraphQueries::new(&store)
        .method_tree(name)
        .unwrap_or_else(|e| fail("cannot build tree", e));
    match serde_json::to_string_pretty(&tree) {
        Ok(json) => println!("{json}"),
        Err(e) => fail("cannot serialize tree", e),
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Read every file under `paths` (directories are walked) as an upload
/// stamped with its modification time in milliseconds.
fn collect_uploads(paths: &[PathBuf]) -> Result<Vec<UploadedFile>> {
    let mut uploads = Vec::new();
    for root in paths {
        for entry in WalkDir::new(root).sort_by_file_name() {
            let entry = entry.map_err(std::io::Error::from)?;
            if entry.file_type().is_file() {
                uploads.push(read_upload(entry.path())?);
            }
        }
    }
    Ok(uploads)
}

fn read_upload(path: &Path) -> Result<UploadedFile> {
    let modified: DateTime<Utc> = fs::metadata(path)?.modified()?.into();
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    Ok(UploadedFile::new(
        file_name,
        modified.timestamp_millis(),
        fs::read(path)?,
    ))
}
