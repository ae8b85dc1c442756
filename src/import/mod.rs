//! CSV import: file selection, row parsing and the graph rebuild pipeline.

pub mod csv_rows;
pub mod pipeline;
pub mod selection;

pub use pipeline::{ImportOptions, ImportPipeline, ImportRequest, ImportResult};
pub use selection::{attach_timestamps, select_newest, UploadedFile};
