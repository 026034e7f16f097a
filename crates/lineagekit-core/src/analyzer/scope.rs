//! Relations visible to a `SELECT` and how column qualifiers bind to them.

use crate::model::{Column, Table};

/// Output columns of a CTE or derived table.
#[derive(Debug, Clone)]
pub(crate) struct DerivedRelation {
    pub(crate) alias: String,
    pub(crate) columns: Vec<Column>,
}

impl DerivedRelation {
    pub(crate) fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|column| column.name == name)
    }
}

#[derive(Debug, Clone)]
pub(crate) enum Relation {
    Table(Table),
    Derived(DerivedRelation),
}

impl Relation {
    /// The node a reference to `name` through this relation stands for.
    pub(crate) fn column(&self, name: &str) -> Column {
        match self {
            Relation::Table(table) => Column::of_table(table, name),
            Relation::Derived(derived) => derived
                .column(name)
                .cloned()
                .unwrap_or_else(|| Column::of_subquery(&derived.alias, name)),
        }
    }
}

#[derive(Debug, Clone)]
pub(crate) struct ScopeEntry {
    pub(crate) alias: Option<String>,
    pub(crate) relation: Relation,
}

impl ScopeEntry {
    pub(crate) fn matches(&self, qualifier: &str) -> bool {
        if let Some(alias) = &self.alias {
            return alias == qualifier;
        }
        match &self.relation {
            Relation::Table(table) => {
                table.name == qualifier
                    || table
                        .schema
                        .qualifier()
                        .is_some_and(|schema| format!("{schema}.{}", table.name) == qualifier)
            }
            Relation::Derived(derived) => derived.alias == qualifier,
        }
    }
}

/// FROM-clause relations of one `SELECT`, in declaration order.
#[derive(Debug, Clone, Default)]
pub(crate) struct Scope {
    entries: Vec<ScopeEntry>,
}

impl Scope {
    pub(crate) fn push(&mut self, alias: Option<String>, relation: Relation) {
        self.entries.push(ScopeEntry { alias, relation });
    }

    pub(crate) fn entries(&self) -> &[ScopeEntry] {
        &self.entries
    }

    pub(crate) fn find(&self, qualifier: &str) -> Option<&ScopeEntry> {
        self.entries.iter().find(|entry| entry.matches(qualifier))
    }
}
