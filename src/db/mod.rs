//! Database layer for the call graph store.
//!
//! - [`schema`]: DDL and initialization (`initialize_database`, `ensure_constraints`).
//! - [`converters`]: Row-to-struct conversions (`row_to_method`, `row_to_call_edge`).

pub mod converters;
pub mod schema;

pub use converters::{row_to_call_edge, row_to_descriptor, row_to_method};
pub use schema::{ensure_constraints, initialize_database};
