//! Graph layer: SQLite-backed call graph store, path search and the
//! read-side query facade.

pub mod queries;
pub mod store;
pub mod traversal;
