//! Column-level lineage graph and the traversals the service needs from it.

use std::collections::{BTreeSet, HashMap};

use crate::error::GraphError;
use crate::model::{Column, Table};

/// Index of a column inside a [`LineageGraph`].
pub type ColumnId = usize;

/// Upper bound on the number of paths [`LineageGraph::column_paths`] enumerates.
pub const DEFAULT_PATH_LIMIT: usize = 100_000;

/// Directed graph of column-to-column derivations plus the tables each
/// statement read and wrote.
///
/// Columns are deduplicated by value: adding the same [`Column`] twice returns
/// the same id, which is how lineage through an intermediate table written by
/// one statement and read by the next ends up connected.
#[derive(Debug, Clone, Default)]
pub struct LineageGraph {
    columns: Vec<Column>,
    index: HashMap<Column, ColumnId>,
    edges: BTreeSet<(ColumnId, ColumnId)>,
    read_tables: BTreeSet<Table>,
    written_tables: BTreeSet<Table>,
    intermediate_tables: BTreeSet<Table>,
}

impl LineageGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Interns `column` and returns its id.
    pub fn add_column(&mut self, column: Column) -> ColumnId {
        if let Some(id) = self.index.get(&column) {
            return *id;
        }
        let id = self.columns.len();
        self.index.insert(column.clone(), id);
        self.columns.push(column);
        id
    }

    /// Records that `target` is derived from `source`.
    ///
    /// Ids are not validated here; [`LineageGraph::column_paths`] reports an
    /// edge pointing outside the graph as [`GraphError::DanglingEdge`].
    pub fn add_edge(&mut self, source: ColumnId, target: ColumnId) {
        self.edges.insert((source, target));
    }

    pub fn add_read_table(&mut self, table: Table) {
        self.read_tables.insert(table);
    }

    pub fn add_written_table(&mut self, table: Table) {
        self.written_tables.insert(table);
    }

    /// Marks a table that one statement wrote and a later statement read.
    pub fn mark_intermediate(&mut self, table: Table) {
        self.intermediate_tables.insert(table);
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    /// Tables read by the SQL that no earlier statement produced.
    pub fn source_tables(&self) -> Vec<Table> {
        self.read_tables
            .difference(&self.intermediate_tables)
            .cloned()
            .collect()
    }

    /// Tables written by the SQL that no later statement consumed.
    pub fn target_tables(&self) -> Vec<Table> {
        self.written_tables
            .difference(&self.intermediate_tables)
            .cloned()
            .collect()
    }

    pub fn intermediate_tables(&self) -> Vec<Table> {
        self.intermediate_tables.iter().cloned().collect()
    }

    /// Every simple path from a column with no predecessors to a column with
    /// no successors, using [`DEFAULT_PATH_LIMIT`].
    pub fn column_paths(&self) -> Result<Vec<Vec<&Column>>, GraphError> {
        self.column_paths_with_limit(DEFAULT_PATH_LIMIT)
    }

    /// Like [`LineageGraph::column_paths`] with an explicit path budget.
    ///
    /// A column with no edges at all yields a single-element path. Self-loops
    /// are ignored and cycles are never walked twice within one path.
    pub fn column_paths_with_limit(&self, limit: usize) -> Result<Vec<Vec<&Column>>, GraphError> {
        let node_count = self.columns.len();
        let mut successors: Vec<Vec<ColumnId>> = vec![Vec::new(); node_count];
        let mut has_predecessor = vec![false; node_count];

        for &(source, target) in &self.edges {
            for index in [source, target] {
                if index >= node_count {
                    return Err(GraphError::DanglingEdge { index });
                }
            }
            if source == target {
                continue;
            }
            successors[source].push(target);
            has_predecessor[target] = true;
        }

        let mut paths = Vec::new();
        let mut current = Vec::new();
        let mut on_path = vec![false; node_count];
        for root in (0..node_count).filter(|id| !has_predecessor[*id]) {
            self.walk(
                root,
                &successors,
                &mut on_path,
                &mut current,
                &mut paths,
                limit,
            )?;
        }
        Ok(paths)
    }

    fn walk<'a>(
        &'a self,
        node: ColumnId,
        successors: &[Vec<ColumnId>],
        on_path: &mut [bool],
        current: &mut Vec<ColumnId>,
        paths: &mut Vec<Vec<&'a Column>>,
        limit: usize,
    ) -> Result<(), GraphError> {
        current.push(node);
        on_path[node] = true;

        if successors[node].is_empty() {
            if paths.len() >= limit {
                return Err(GraphError::PathLimit { limit });
            }
            paths.push(current.iter().map(|id| &self.columns[*id]).collect());
        } else {
            for &next in &successors[node] {
                if !on_path[next] {
                    self.walk(next, successors, on_path, current, paths, limit)?;
                }
            }
        }

        on_path[node] = false;
        current.pop();
        Ok(())
    }
}
