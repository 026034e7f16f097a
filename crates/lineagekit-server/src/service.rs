//! Runs the lineage engine for one request and packages a view of the result.

use std::time::Instant;

use lineagekit_core::{
    estimate_statement_count, ColumnResolver, Dialect, LineageGraph, LineageRunner,
};
use tracing::{debug, warn};

use crate::models::{
    ColumnLineageResponse, ColumnPairsResponse, LineageMetadata, TableLineageResponse,
};
use crate::projector;

/// SQL plus the per-request options that shape the analysis.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnalysisInput {
    pub sql: String,
    pub dialect: String,
    pub silent_mode: bool,
}

/// A view payload together with the warnings and counters gathered while
/// producing it.
#[derive(Debug, Clone, PartialEq)]
pub struct Report<T> {
    pub payload: T,
    pub warnings: Vec<String>,
    pub metadata: LineageMetadata,
}

/// Lineage analysis bound to one column resolver.
///
/// Parse failures never escape: they come back as an empty view with the
/// error message in `warnings` and every statement counted as failed.
pub struct LineageService<'r> {
    resolver: &'r dyn ColumnResolver,
}

impl<'r> LineageService<'r> {
    pub fn new(resolver: &'r dyn ColumnResolver) -> Self {
        Self { resolver }
    }

    pub fn column_pairs(&self, input: &AnalysisInput) -> ColumnPairsResponse {
        let report = self.analyze(input, projector::column_pairs::<LineageGraph>);
        ColumnPairsResponse {
            column_pairs: report.payload,
            warnings: report.warnings,
            metadata: report.metadata,
        }
    }

    pub fn table_lineage(&self, input: &AnalysisInput) -> TableLineageResponse {
        let report = self.analyze(input, projector::table_lineage::<LineageGraph>);
        TableLineageResponse {
            source_tables: report.payload.source_tables,
            target_tables: report.payload.target_tables,
            warnings: report.warnings,
            metadata: report.metadata,
        }
    }

    pub fn column_lineage(&self, input: &AnalysisInput) -> ColumnLineageResponse {
        let report = self.analyze(input, projector::column_lineage_paths::<LineageGraph>);
        ColumnLineageResponse {
            column_lineage_paths: report.payload,
            warnings: report.warnings,
            metadata: report.metadata,
        }
    }

    /// Parses `input` and hands the graph to `view`.
    pub fn analyze<T, F>(&self, input: &AnalysisInput, view: F) -> Report<T>
    where
        T: Default,
        F: FnOnce(&LineageGraph, &mut Vec<String>) -> T,
    {
        let started = Instant::now();
        let mut warnings = Vec::new();

        let outcome = input.dialect.parse::<Dialect>().and_then(|dialect| {
            LineageRunner::new(dialect, self.resolver)
                .silent_mode(input.silent_mode)
                .run(&input.sql)
        });

        let (payload, statement_count, failed_statements) = match outcome {
            Ok(run) => {
                debug!(
                    statements = run.statement_count,
                    skipped = run.skipped_statements,
                    columns = run.graph.columns().len(),
                    "lineage graph built"
                );
                let payload = view(&run.graph, &mut warnings);
                (payload, run.statement_count, run.skipped_statements)
            }
            Err(err) => {
                warn!(dialect = %input.dialect, error = %err, "lineage analysis failed");
                let estimated = estimate_statement_count(&input.sql);
                warnings.push(format!("Parsing error: {err}"));
                warnings.push(format!("Error processing lineage: {err}"));
                (T::default(), estimated, estimated)
            }
        };

        let elapsed_ms = started.elapsed().as_secs_f64() * 1000.0;
        Report {
            payload,
            warnings,
            metadata: LineageMetadata {
                processing_time_ms: (elapsed_ms * 100.0).round() / 100.0,
                dialect_used: input.dialect.clone(),
                statement_count,
                successful_statements: statement_count - failed_statements,
                failed_statements,
            },
        }
    }
}
