//! Queries, set operations, `SELECT` projections and FROM clauses.

use std::collections::HashMap;

use sqlparser::ast::{
    Expr, Query, Select, SelectItem, SelectItemQualifiedWildcardKind, SetExpr, TableFactor,
    TableWithJoins,
};

use super::naming::{normalize_ident, normalize_qualifier, object_name_parts};
use super::scope::{DerivedRelation, Relation, Scope};
use super::Analyzer;
use crate::model::{Column, ColumnParent, Table};

/// One output column of a query and the columns it is computed from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct ProjectedColumn {
    pub(crate) name: String,
    pub(crate) sources: Vec<Column>,
}

impl ProjectedColumn {
    fn new(name: impl Into<String>, sources: Vec<Column>) -> Self {
        Self {
            name: name.into(),
            sources,
        }
    }
}

/// Output name of an unaliased projection item.
fn projected_name(expr: &Expr) -> String {
    match expr {
        Expr::Identifier(ident) => normalize_ident(ident),
        Expr::CompoundIdentifier(parts) => parts.last().map(normalize_ident).unwrap_or_default(),
        Expr::Nested(inner) => projected_name(inner),
        other => other.to_string(),
    }
}

impl Analyzer<'_> {
    pub(super) fn analyze_query(&mut self, query: &Query) -> Vec<ProjectedColumn> {
        let has_ctes = query.with.is_some();
        if let Some(with) = &query.with {
            self.ctes.push(HashMap::new());
            // Each CTE can see the ones declared before it.
            for cte in &with.cte_tables {
                let name = normalize_ident(&cte.alias.name);
                let projection = self.analyze_query(&cte.query);
                let relation = self.materialize_derived(&name, projection);
                if let Some(frame) = self.ctes.last_mut() {
                    frame.insert(name, relation);
                }
            }
        }

        let projection = self.analyze_set_expr(&query.body);

        if has_ctes {
            self.ctes.pop();
        }
        projection
    }

    fn analyze_set_expr(&mut self, body: &SetExpr) -> Vec<ProjectedColumn> {
        match body {
            SetExpr::Select(select) => self.analyze_select(select),
            SetExpr::Query(query) => self.analyze_query(query),
            // Branches line up by position and take the left branch's names.
            SetExpr::SetOperation { left, right, .. } => {
                let mut merged = self.analyze_set_expr(left);
                let right = self.analyze_set_expr(right);
                for (position, column) in right.into_iter().enumerate() {
                    match merged.get_mut(position) {
                        Some(existing) => {
                            for source in column.sources {
                                if !existing.sources.contains(&source) {
                                    existing.sources.push(source);
                                }
                            }
                        }
                        None => merged.push(column),
                    }
                }
                merged
            }
            _ => Vec::new(),
        }
    }

    fn analyze_select(&mut self, select: &Select) -> Vec<ProjectedColumn> {
        self.scopes.push(Scope::default());

        for table_with_joins in &select.from {
            self.register_table_with_joins(table_with_joins);
        }

        let mut projection = Vec::new();
        for item in &select.projection {
            match item {
                SelectItem::UnnamedExpr(expr) => {
                    let sources = self.expression_sources(expr);
                    projection.push(ProjectedColumn::new(projected_name(expr), sources));
                }
                SelectItem::ExprWithAlias { expr, alias } => {
                    let sources = self.expression_sources(expr);
                    projection.push(ProjectedColumn::new(normalize_ident(alias), sources));
                }
                SelectItem::QualifiedWildcard(kind, _) => {
                    let qualifier = match kind {
                        SelectItemQualifiedWildcardKind::ObjectName(name) => {
                            object_name_parts(name).join(".")
                        }
                        SelectItemQualifiedWildcardKind::Expr(expr) => {
                            normalize_qualifier(&expr.to_string())
                        }
                    };
                    self.expand_wildcard(Some(&qualifier), &mut projection);
                }
                SelectItem::Wildcard(_) => self.expand_wildcard(None, &mut projection),
            }
        }

        if let Some(selection) = &select.selection {
            self.visit_predicate(selection);
        }
        if let Some(having) = &select.having {
            self.visit_predicate(having);
        }

        self.scopes.pop();
        projection
    }

    fn register_table_with_joins(&mut self, table_with_joins: &TableWithJoins) {
        self.register_table_factor(&table_with_joins.relation);
        for join in &table_with_joins.joins {
            self.register_table_factor(&join.relation);
        }
    }

    fn register_table_factor(&mut self, factor: &TableFactor) {
        match factor {
            TableFactor::Table { name, alias, .. } => {
                let parts = object_name_parts(name);
                let alias = alias.as_ref().map(|a| normalize_ident(&a.name));
                if let [single] = parts.as_slice() {
                    if let Some(cte) = self.lookup_cte(single) {
                        self.push_relation(alias, Relation::Derived(cte));
                        return;
                    }
                }
                let table = Table::from_parts(&parts);
                self.record_read(table.clone());
                self.push_relation(alias, Relation::Table(table));
            }
            TableFactor::Derived {
                subquery, alias, ..
            } => {
                let projection = self.analyze_query(subquery);
                let alias = match alias {
                    Some(alias) => normalize_ident(&alias.name),
                    None => self.next_anonymous_alias(),
                };
                let relation = self.materialize_derived(&alias, projection);
                self.push_relation(Some(alias), Relation::Derived(relation));
            }
            TableFactor::NestedJoin {
                table_with_joins, ..
            } => self.register_table_with_joins(table_with_joins),
            _ => {}
        }
    }

    fn push_relation(&mut self, alias: Option<String>, relation: Relation) {
        if let Some(scope) = self.scopes.last_mut() {
            scope.push(alias, relation);
        }
    }

    /// Expands `*` or `q.*`. Tables whose columns are unknown contribute a
    /// single `*` column.
    fn expand_wildcard(&self, qualifier: Option<&str>, projection: &mut Vec<ProjectedColumn>) {
        let Some(scope) = self.scopes.last() else {
            return;
        };

        let mut matched = false;
        for entry in scope
            .entries()
            .iter()
            .filter(|entry| qualifier.map_or(true, |q| entry.matches(q)))
        {
            matched = true;
            match &entry.relation {
                Relation::Table(table) => {
                    let columns = self.table_columns(table);
                    if columns.is_empty() {
                        projection.push(ProjectedColumn::new("*", vec![Column::of_table(table, "*")]));
                    }
                    for name in columns {
                        let source = Column::of_table(table, name.as_str());
                        projection.push(ProjectedColumn::new(name, vec![source]));
                    }
                }
                Relation::Derived(derived) => {
                    for column in &derived.columns {
                        projection.push(ProjectedColumn::new(
                            column.name.clone(),
                            vec![column.clone()],
                        ));
                    }
                }
            }
        }

        if let (false, Some(qualifier)) = (matched, qualifier) {
            let source = Column::new("*", Some(ColumnParent::unknown(qualifier)));
            projection.push(ProjectedColumn::new("*", vec![source]));
        }
    }

    /// Turns a subquery's projection into subquery-owned nodes.
    pub(super) fn materialize_derived(
        &mut self,
        alias: &str,
        projection: Vec<ProjectedColumn>,
    ) -> DerivedRelation {
        let mut columns: Vec<Column> = Vec::with_capacity(projection.len());
        for projected in projection {
            let column = Column::of_subquery(alias, projected.name);
            self.link(&column, &projected.sources);
            if !columns.contains(&column) {
                columns.push(column);
            }
        }
        DerivedRelation {
            alias: alias.to_string(),
            columns,
        }
    }
}
