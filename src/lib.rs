//! Call graph explorer library.
//!
//! Imports method/invoke/target CSV exports into a namespaced SQLite call
//! graph and serves it to a graph viewer over HTTP: graph listings, a
//! grouped method tree, caller/callee expansion and shortest entry-point
//! paths.

pub mod config;
pub mod db;
pub mod error;
pub mod graph;
pub mod import;
pub mod observability;
pub mod types;
pub mod viz;
