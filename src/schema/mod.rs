//! Column-named tabular input and output
//!
//! Student and benchmark data arrive as a generic table of string cells keyed by
//! column name. The adapter maps those tables onto typed records and flattens
//! scoring results back into a table for export.

mod adapter;
mod table;

pub use adapter::*;
pub use table::*;
