//! Request and response bodies of the HTTP API.

use serde::{Deserialize, Serialize};

fn default_true() -> bool {
    true
}

/// Body accepted by every lineage endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct LineageRequest {
    pub sql: String,
    /// Falls back to the configured default dialect.
    #[serde(default)]
    pub dialect: Option<String>,
    /// Skip statements that carry no lineage instead of failing.
    #[serde(default)]
    pub silent_mode: bool,
    /// Resolve table columns through the metadata catalog when configured.
    #[serde(default = "default_true", alias = "openmetadata_enabled")]
    pub catalog_enabled: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineageMetadata {
    pub processing_time_ms: f64,
    pub dialect_used: String,
    pub statement_count: usize,
    pub successful_statements: usize,
    pub failed_statements: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnPair {
    pub target: String,
    pub sources: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnPairsResponse {
    pub column_pairs: Vec<ColumnPair>,
    pub warnings: Vec<String>,
    pub metadata: LineageMetadata,
}

/// A table with the `<default>` schema sentinel already removed.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TableRef {
    pub schema: Option<String>,
    pub table: String,
}

impl TableRef {
    /// `schema.table`, or `table` when no schema was written.
    pub fn rendered(&self) -> String {
        match &self.schema {
            Some(schema) => format!("{schema}.{}", self.table),
            None => self.table.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TableLineage {
    pub source_tables: Vec<TableRef>,
    pub target_tables: Vec<TableRef>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableLineageResponse {
    pub source_tables: Vec<TableRef>,
    pub target_tables: Vec<TableRef>,
    pub warnings: Vec<String>,
    pub metadata: LineageMetadata,
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ColumnPath {
    pub path: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnLineageResponse {
    pub column_lineage_paths: Vec<ColumnPath>,
    pub warnings: Vec<String>,
    pub metadata: LineageMetadata,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DialectsResponse {
    pub dialects: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    #[serde(rename = "openmetadata_configured", alias = "catalog_configured")]
    pub catalog_configured: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceInfo {
    pub service: String,
    pub version: String,
    pub health: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheClearedResponse {
    pub cleared_entries: usize,
}
