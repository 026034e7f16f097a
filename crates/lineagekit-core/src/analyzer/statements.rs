//! Per-statement lineage: what a statement writes and where it comes from.

use sqlparser::ast::{self, ColumnDef, ObjectName, Query, Statement, TableObject};

use super::naming::{normalize_ident, statement_kind, table_from_object_name};
use super::query::ProjectedColumn;
use super::Analyzer;
use crate::model::{Column, Table};

pub(super) enum StatementOutcome {
    Analyzed,
    /// The statement has no lineage semantics; carries a short kind label.
    Unsupported(String),
}

impl Analyzer<'_> {
    pub(super) fn analyze_statement(&mut self, statement: &Statement) -> StatementOutcome {
        let outcome = match statement {
            Statement::Query(query) => {
                self.analyze_select_statement(query);
                StatementOutcome::Analyzed
            }
            Statement::Insert(insert) => self.analyze_insert(insert),
            Statement::CreateTable(create) => {
                match &create.query {
                    Some(query) => self.analyze_create_as(&create.name, query),
                    None => self.register_table_definition(&create.name, &create.columns),
                }
                StatementOutcome::Analyzed
            }
            Statement::CreateView { name, query, .. } => {
                self.analyze_create_as(name, query);
                StatementOutcome::Analyzed
            }
            other => StatementOutcome::Unsupported(statement_kind(other)),
        };
        self.finish_statement();
        outcome
    }

    /// A bare `SELECT`: outputs are unowned columns.
    fn analyze_select_statement(&mut self, query: &Query) {
        for projected in self.analyze_query(query) {
            self.link(&Column::unparented(projected.name), &projected.sources);
        }
    }

    fn analyze_insert(&mut self, insert: &ast::Insert) -> StatementOutcome {
        let TableObject::TableName(name) = &insert.table else {
            return StatementOutcome::Unsupported("INSERT INTO FUNCTION".to_string());
        };
        let target = table_from_object_name(name);
        self.record_write(target.clone());

        let Some(source) = &insert.source else {
            return StatementOutcome::Analyzed;
        };
        let projection = self.analyze_query(source);
        let explicit: Vec<String> = insert.columns.iter().map(normalize_ident).collect();
        let names = self.target_column_names(&target, explicit, &projection);

        for (name, projected) in names.into_iter().zip(projection) {
            self.link(&Column::of_table(&target, name), &projected.sources);
        }
        StatementOutcome::Analyzed
    }

    /// `CREATE TABLE ... AS SELECT` and `CREATE VIEW ... AS SELECT`.
    fn analyze_create_as(&mut self, name: &ObjectName, query: &Query) {
        let target = table_from_object_name(name);
        self.record_write(target.clone());

        let projection = self.analyze_query(query);
        let names: Vec<String> = projection.iter().map(|p| p.name.clone()).collect();
        for projected in projection {
            self.link(&Column::of_table(&target, projected.name), &projected.sources);
        }
        if !names.iter().any(|n| n == "*") {
            self.known_columns.insert(target, names);
        }
    }

    /// Plain DDL has no lineage but tells later statements the column order.
    fn register_table_definition(&mut self, name: &ObjectName, columns: &[ColumnDef]) {
        let table = table_from_object_name(name);
        let names = columns.iter().map(|c| normalize_ident(&c.name)).collect();
        self.known_columns.insert(table, names);
    }

    /// Target column names for an `INSERT`: the explicit column list, else
    /// the table's known columns when they line up one-to-one with the
    /// projection, else the projection's own names.
    fn target_column_names(
        &self,
        target: &Table,
        explicit: Vec<String>,
        projection: &[ProjectedColumn],
    ) -> Vec<String> {
        if !explicit.is_empty() {
            return explicit;
        }
        let projected: Vec<String> = projection.iter().map(|p| p.name.clone()).collect();
        if projected.iter().any(|name| name == "*") {
            return projected;
        }
        let known = self.table_columns(target);
        if !known.is_empty() && known.len() == projected.len() {
            known
        } else {
            projected
        }
    }
}
