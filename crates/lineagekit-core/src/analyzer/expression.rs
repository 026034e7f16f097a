//! Column references inside expressions.
//!
//! Walking an expression does two things: it resolves every column the
//! expression reads against the current scope, and it analyzes any subquery
//! it contains so that the tables those subqueries read are recorded.

use sqlparser::ast::{self, Expr, FunctionArg, FunctionArgExpr};
#[cfg(feature = "tracing")]
use tracing::debug;

use super::naming::normalize_ident;
use super::scope::Relation;
use super::Analyzer;
use crate::model::{Column, ColumnParent, UNRESOLVED_QUALIFIER};

/// Nesting depth past which the walk stops descending.
pub(super) const MAX_RECURSION_DEPTH: usize = 100;

impl Analyzer<'_> {
    /// Source columns an expression reads, deduplicated in first-seen order.
    pub(super) fn expression_sources(&mut self, expr: &Expr) -> Vec<Column> {
        let mut sources = Vec::new();
        self.collect_sources(expr, &mut sources, 0);
        let mut seen = Vec::with_capacity(sources.len());
        for column in sources {
            if !seen.contains(&column) {
                seen.push(column);
            }
        }
        seen
    }

    /// Walks a filter predicate only for the subqueries it reads.
    pub(super) fn visit_predicate(&mut self, expr: &Expr) {
        let mut ignored = Vec::new();
        self.collect_sources(expr, &mut ignored, 0);
    }

    fn collect_sources(&mut self, expr: &Expr, out: &mut Vec<Column>, depth: usize) {
        if depth > MAX_RECURSION_DEPTH {
            #[cfg(feature = "tracing")]
            debug!(depth, "expression nesting limit reached");
            return;
        }
        let next = depth + 1;

        match expr {
            Expr::Identifier(ident) => {
                out.extend(self.resolve_column(None, &normalize_ident(ident)));
            }
            Expr::CompoundIdentifier(parts) => match parts.split_last() {
                Some((column, [])) => out.extend(self.resolve_column(None, &normalize_ident(column))),
                Some((column, qualifier)) => {
                    let qualifier = qualifier
                        .iter()
                        .map(normalize_ident)
                        .collect::<Vec<_>>()
                        .join(".");
                    out.extend(self.resolve_column(Some(&qualifier), &normalize_ident(column)));
                }
                None => {}
            },
            Expr::BinaryOp { left, right, .. } => {
                self.collect_sources(left, out, next);
                self.collect_sources(right, out, next);
            }
            Expr::UnaryOp { expr, .. }
            | Expr::Nested(expr)
            | Expr::Cast { expr, .. }
            | Expr::Extract { expr, .. }
            | Expr::IsNull(expr)
            | Expr::IsNotNull(expr)
            | Expr::IsTrue(expr)
            | Expr::IsNotTrue(expr)
            | Expr::IsFalse(expr)
            | Expr::IsNotFalse(expr) => self.collect_sources(expr, out, next),
            Expr::Function(func) => match &func.args {
                ast::FunctionArguments::List(arg_list) => {
                    for arg in &arg_list.args {
                        match arg {
                            FunctionArg::Unnamed(FunctionArgExpr::Expr(e))
                            | FunctionArg::Named {
                                arg: FunctionArgExpr::Expr(e),
                                ..
                            } => self.collect_sources(e, out, next),
                            _ => {}
                        }
                    }
                }
                ast::FunctionArguments::Subquery(query) => {
                    for projected in self.analyze_query(query) {
                        out.extend(projected.sources);
                    }
                }
                ast::FunctionArguments::None => {}
            },
            Expr::Case {
                operand,
                conditions,
                else_result,
                ..
            } => {
                if let Some(operand) = operand {
                    self.collect_sources(operand, out, next);
                }
                for case_when in conditions {
                    self.collect_sources(&case_when.condition, out, next);
                    self.collect_sources(&case_when.result, out, next);
                }
                if let Some(else_result) = else_result {
                    self.collect_sources(else_result, out, next);
                }
            }
            Expr::InList { expr, list, .. } => {
                self.collect_sources(expr, out, next);
                for item in list {
                    self.collect_sources(item, out, next);
                }
            }
            Expr::Between {
                expr, low, high, ..
            } => {
                self.collect_sources(expr, out, next);
                self.collect_sources(low, out, next);
                self.collect_sources(high, out, next);
            }
            Expr::Like { expr, pattern, .. } | Expr::ILike { expr, pattern, .. } => {
                self.collect_sources(expr, out, next);
                self.collect_sources(pattern, out, next);
            }
            Expr::Tuple(exprs) => {
                for e in exprs {
                    self.collect_sources(e, out, next);
                }
            }
            // A scalar subquery contributes whatever its projection reads.
            Expr::Subquery(query) => {
                for projected in self.analyze_query(query) {
                    out.extend(projected.sources);
                }
            }
            // Membership and existence tests only filter rows.
            Expr::InSubquery { expr, subquery, .. } => {
                self.collect_sources(expr, out, next);
                self.analyze_query(subquery);
            }
            Expr::Exists { subquery, .. } => {
                self.analyze_query(subquery);
            }
            _ => {}
        }
    }

    /// Binds a column reference to the relation that owns it.
    ///
    /// Qualified references search enclosing scopes too, so correlated
    /// subqueries resolve. An unqualified reference with several candidate
    /// relations is attributed to the single relation known to have the
    /// column; otherwise it is left unresolved.
    pub(super) fn resolve_column(&self, qualifier: Option<&str>, name: &str) -> Option<Column> {
        let innermost = self.scopes.last()?;
        match qualifier {
            Some(qualifier) => {
                let bound = self
                    .scopes
                    .iter()
                    .rev()
                    .find_map(|scope| scope.find(qualifier))
                    .map(|entry| entry.relation.column(name));
                Some(bound.unwrap_or_else(|| {
                    Column::new(name, Some(ColumnParent::unknown(qualifier)))
                }))
            }
            None => match innermost.entries() {
                [] => None,
                [only] => Some(only.relation.column(name)),
                entries => {
                    let mut owners = entries
                        .iter()
                        .filter(|entry| self.relation_has_column(&entry.relation, name));
                    match (owners.next(), owners.next()) {
                        (Some(owner), None) => Some(owner.relation.column(name)),
                        _ => Some(Column::new(
                            name,
                            Some(ColumnParent::unknown(UNRESOLVED_QUALIFIER)),
                        )),
                    }
                }
            },
        }
    }

    fn relation_has_column(&self, relation: &Relation, name: &str) -> bool {
        match relation {
            Relation::Table(table) => self.table_columns(table).iter().any(|c| c == name),
            Relation::Derived(derived) => derived.column(name).is_some(),
        }
    }
}
