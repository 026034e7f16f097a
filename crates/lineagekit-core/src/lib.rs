pub mod analyzer;
pub mod dialect;
pub mod error;
pub mod graph;
pub mod model;
pub mod parser;
pub mod resolver;

// Re-export main types and functions
pub use analyzer::{LineageRun, LineageRunner};
pub use dialect::Dialect;
pub use error::{GraphError, ParseError, ParseErrorKind, Position};
pub use graph::{ColumnId, LineageGraph, DEFAULT_PATH_LIMIT};
pub use model::{Column, ColumnParent, Schema, SubQuery, Table, DEFAULT_SCHEMA, UNRESOLVED_QUALIFIER};
pub use parser::{estimate_statement_count, parse_script};
pub use resolver::{ColumnResolver, NoopResolver};
