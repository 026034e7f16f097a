//! Projects a lineage graph into the three views served by the API.
//!
//! Each view is computed independently. A failure while walking the graph
//! for one view is recorded as a warning and leaves that view empty; the
//! other views are unaffected. All output is ordered by rendered identifier
//! so identical graphs always produce identical responses.

use std::collections::{BTreeMap, BTreeSet};

use lineagekit_core::{Column, ColumnParent, GraphError, LineageGraph, Table};

use crate::models::{ColumnPair, ColumnPath, TableLineage, TableRef};

/// Read access to the parts of a lineage graph the projector needs.
pub trait LineageSource {
    fn source_tables(&self) -> Result<Vec<Table>, GraphError>;
    fn target_tables(&self) -> Result<Vec<Table>, GraphError>;
    fn column_paths(&self) -> Result<Vec<Vec<&Column>>, GraphError>;
}

impl LineageSource for LineageGraph {
    fn source_tables(&self) -> Result<Vec<Table>, GraphError> {
        Ok(LineageGraph::source_tables(self))
    }

    fn target_tables(&self) -> Result<Vec<Table>, GraphError> {
        Ok(LineageGraph::target_tables(self))
    }

    fn column_paths(&self) -> Result<Vec<Vec<&Column>>, GraphError> {
        LineageGraph::column_paths(self)
    }
}

/// Canonical string form of a column.
///
/// - no parent: `column`
/// - table parent: `schema.table.column`, or `table.column` for the
///   `<default>` schema
/// - subquery or CTE parent: `alias.column`
/// - unresolved parent: `label.column`
pub fn render_column(column: &Column) -> String {
    match &column.parent {
        None => column.name.clone(),
        Some(ColumnParent::Table(table)) => match table.schema.qualifier() {
            Some(schema) => format!("{schema}.{}.{}", table.name, column.name),
            None => format!("{}.{}", table.name, column.name),
        },
        Some(ColumnParent::SubQuery(subquery)) => format!("{}.{}", subquery.alias, column.name),
        Some(ColumnParent::Unknown { label }) => format!("{label}.{}", column.name),
    }
}

pub fn render_table(table: &Table) -> TableRef {
    TableRef {
        schema: table.schema.qualifier().map(str::to_string),
        table: table.name.clone(),
    }
}

/// For every target column, its immediate upstream columns.
///
/// The source of a path is its second-to-last node; a single-node path is
/// its own source. Targets are sorted by rendered name and each source list
/// is sorted and deduplicated.
pub fn column_pairs<S: LineageSource + ?Sized>(
    graph: &S,
    warnings: &mut Vec<String>,
) -> Vec<ColumnPair> {
    let pairs = graph.column_paths().and_then(|paths| {
        let mut grouped: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();
        for path in paths {
            let (target, source) = match path.as_slice() {
                [] => return Err(GraphError::EmptyPath),
                [only] => (*only, *only),
                [.., source, target] => (*target, *source),
            };
            grouped
                .entry(render_column(target))
                .or_default()
                .insert(render_column(source));
        }
        Ok(grouped)
    });

    match pairs {
        Ok(grouped) => grouped
            .into_iter()
            .map(|(target, sources)| ColumnPair {
                target,
                sources: sources.into_iter().collect(),
            })
            .collect(),
        Err(err) => {
            warnings.push(format!("Column lineage extraction warning: {err}"));
            Vec::new()
        }
    }
}

/// Source and target tables, each sorted by rendered name.
pub fn table_lineage<S: LineageSource + ?Sized>(
    graph: &S,
    warnings: &mut Vec<String>,
) -> TableLineage {
    let tables = graph.source_tables().and_then(|sources| {
        let targets = graph.target_tables()?;
        Ok(TableLineage {
            source_tables: render_tables(&sources),
            target_tables: render_tables(&targets),
        })
    });

    tables.unwrap_or_else(|err| {
        warnings.push(format!("Table lineage extraction warning: {err}"));
        TableLineage::default()
    })
}

fn render_tables(tables: &[Table]) -> Vec<TableRef> {
    let rendered: BTreeMap<String, TableRef> = tables
        .iter()
        .map(render_table)
        .map(|table| (table.rendered(), table))
        .collect();
    rendered.into_values().collect()
}

/// Every complete source-to-target path, sorted and deduplicated.
pub fn column_lineage_paths<S: LineageSource + ?Sized>(
    graph: &S,
    warnings: &mut Vec<String>,
) -> Vec<ColumnPath> {
    let paths = graph.column_paths().and_then(|paths| {
        let mut rendered = BTreeSet::new();
        for path in paths {
            if path.is_empty() {
                return Err(GraphError::EmptyPath);
            }
            rendered.insert(ColumnPath {
                path: path.into_iter().map(render_column).collect(),
            });
        }
        Ok(rendered)
    });

    match paths {
        Ok(rendered) => rendered.into_iter().collect(),
        Err(err) => {
            warnings.push(format!("Column lineage path extraction warning: {err}"));
            Vec::new()
        }
    }
}
