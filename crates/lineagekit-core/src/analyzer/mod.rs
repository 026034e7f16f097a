//! Builds a [`LineageGraph`] from parsed SQL.
//!
//! The analyzer walks each statement once. `SELECT` projections are resolved
//! against a stack of [`scope::Scope`]s (one per nested `SELECT`), CTEs and
//! derived tables become subquery nodes, and whatever a statement writes
//! (`INSERT`, `CREATE TABLE AS`, `CREATE VIEW`) becomes table-owned column
//! nodes linked to the columns they were computed from.

mod expression;
mod naming;
mod query;
mod scope;
mod statements;

use std::collections::{BTreeSet, HashMap};

use crate::dialect::Dialect;
use crate::error::ParseError;
use crate::graph::LineageGraph;
use crate::model::{Column, Table};
use crate::parser::parse_script;
use crate::resolver::ColumnResolver;
use scope::{DerivedRelation, Scope};
use statements::StatementOutcome;

#[cfg(feature = "tracing")]
use tracing::{debug, info_span};

/// Result of one lineage run over a SQL script.
#[derive(Debug, Clone, Default)]
pub struct LineageRun {
    pub graph: LineageGraph,
    /// Statements the parser produced.
    pub statement_count: usize,
    /// Statements ignored because silent mode was on.
    pub skipped_statements: usize,
}

/// Entry point: parse a script in one dialect and build its lineage graph.
///
/// # Example
///
/// ```
/// use lineagekit_core::{Dialect, LineageRunner, NoopResolver};
///
/// let run = LineageRunner::new(Dialect::Ansi, &NoopResolver)
///     .run("INSERT INTO mart.daily SELECT id FROM staging.events")
///     .unwrap();
/// assert_eq!(run.statement_count, 1);
/// assert_eq!(run.graph.target_tables()[0].name, "daily");
/// ```
pub struct LineageRunner<'r> {
    dialect: Dialect,
    silent_mode: bool,
    resolver: &'r dyn ColumnResolver,
}

impl<'r> LineageRunner<'r> {
    pub fn new(dialect: Dialect, resolver: &'r dyn ColumnResolver) -> Self {
        Self {
            dialect,
            silent_mode: false,
            resolver,
        }
    }

    /// When on, statements without lineage semantics are skipped instead of
    /// failing the run.
    pub fn silent_mode(mut self, silent_mode: bool) -> Self {
        self.silent_mode = silent_mode;
        self
    }

    pub fn dialect(&self) -> Dialect {
        self.dialect
    }

    pub fn run(&self, sql: &str) -> Result<LineageRun, ParseError> {
        #[cfg(feature = "tracing")]
        let _span = info_span!("lineage_run", dialect = %self.dialect).entered();

        let statements = parse_script(sql, self.dialect)?;
        let mut analyzer = Analyzer::new(self.resolver);
        let mut skipped_statements = 0;

        for (index, statement) in statements.iter().enumerate() {
            match analyzer.analyze_statement(statement) {
                StatementOutcome::Analyzed => {}
                StatementOutcome::Unsupported(kind) if self.silent_mode => {
                    #[cfg(feature = "tracing")]
                    debug!(index, kind = %kind, "skipping statement without lineage");
                    skipped_statements += 1;
                }
                StatementOutcome::Unsupported(kind) => {
                    return Err(ParseError::unsupported_statement(index, &kind)
                        .with_dialect(self.dialect));
                }
            }
        }

        Ok(LineageRun {
            graph: analyzer.graph,
            statement_count: statements.len(),
            skipped_statements,
        })
    }
}

pub(crate) struct Analyzer<'r> {
    resolver: &'r dyn ColumnResolver,
    graph: LineageGraph,
    /// Column lists learned from DDL and CTAS earlier in the script.
    known_columns: HashMap<Table, Vec<String>>,
    earlier_writes: BTreeSet<Table>,
    statement_writes: BTreeSet<Table>,
    ctes: Vec<HashMap<String, DerivedRelation>>,
    scopes: Vec<Scope>,
    anonymous_subqueries: usize,
}

impl<'r> Analyzer<'r> {
    fn new(resolver: &'r dyn ColumnResolver) -> Self {
        Self {
            resolver,
            graph: LineageGraph::new(),
            known_columns: HashMap::new(),
            earlier_writes: BTreeSet::new(),
            statement_writes: BTreeSet::new(),
            ctes: Vec::new(),
            scopes: Vec::new(),
            anonymous_subqueries: 0,
        }
    }

    fn record_read(&mut self, table: Table) {
        if self.earlier_writes.contains(&table) {
            self.graph.mark_intermediate(table.clone());
        }
        self.graph.add_read_table(table);
    }

    fn record_write(&mut self, table: Table) {
        self.statement_writes.insert(table.clone());
        self.graph.add_written_table(table);
    }

    fn finish_statement(&mut self) {
        self.earlier_writes.append(&mut self.statement_writes);
        self.ctes.clear();
        self.scopes.clear();
    }

    /// Columns of a physical table: script-local knowledge first, then the
    /// resolver.
    fn table_columns(&self, table: &Table) -> Vec<String> {
        if let Some(columns) = self.known_columns.get(table) {
            return columns.clone();
        }
        self.resolver
            .columns_of(table.schema.qualifier(), &table.name)
            .into_iter()
            .map(|name| name.to_lowercase())
            .collect()
    }

    fn lookup_cte(&self, name: &str) -> Option<DerivedRelation> {
        self.ctes
            .iter()
            .rev()
            .find_map(|frame| frame.get(name).cloned())
    }

    fn next_anonymous_alias(&mut self) -> String {
        self.anonymous_subqueries += 1;
        format!("subquery_{}", self.anonymous_subqueries)
    }

    /// Adds `target` and an edge into it from every source.
    fn link(&mut self, target: &Column, sources: &[Column]) {
        let target_id = self.graph.add_column(target.clone());
        for source in sources {
            let source_id = self.graph.add_column(source.clone());
            self.graph.add_edge(source_id, target_id);
        }
    }
}
