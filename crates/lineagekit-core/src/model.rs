//! Tables, subqueries and columns as they appear in a lineage graph.

use serde::Serialize;

/// Schema qualifier recorded for tables referenced without an explicit schema.
pub const DEFAULT_SCHEMA: &str = "<default>";

/// Qualifier used for columns whose owning relation could not be determined.
pub const UNRESOLVED_QUALIFIER: &str = "<unknown>";

/// Schema (or `catalog.schema`) qualifier of a table.
///
/// The default value is the [`DEFAULT_SCHEMA`] sentinel, which means the SQL
/// did not name a schema.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct Schema {
    raw_name: String,
}

impl Schema {
    pub fn new(raw_name: impl Into<String>) -> Self {
        Self {
            raw_name: raw_name.into(),
        }
    }

    pub fn raw_name(&self) -> &str {
        &self.raw_name
    }

    /// True for the sentinel (and for an empty qualifier).
    pub fn is_default(&self) -> bool {
        self.raw_name.is_empty() || self.raw_name == DEFAULT_SCHEMA
    }

    /// The explicit qualifier, or `None` when the schema is the sentinel.
    pub fn qualifier(&self) -> Option<&str> {
        (!self.is_default()).then_some(self.raw_name.as_str())
    }
}

impl Default for Schema {
    fn default() -> Self {
        Self::new(DEFAULT_SCHEMA)
    }
}

/// A physical table.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct Table {
    pub schema: Schema,
    pub name: String,
}

impl Table {
    /// Builds a table; `None` or an empty schema selects the default sentinel.
    pub fn new(schema: Option<&str>, name: impl Into<String>) -> Self {
        let schema = match schema {
            Some(s) if !s.is_empty() => Schema::new(s),
            _ => Schema::default(),
        };
        Self {
            schema,
            name: name.into(),
        }
    }

    /// Builds a table from dotted name parts; everything before the last part
    /// becomes the schema qualifier (`catalog.schema.table` keeps
    /// `catalog.schema`).
    pub fn from_parts(parts: &[String]) -> Self {
        match parts.split_last() {
            Some((name, [])) => Self::new(None, name.clone()),
            Some((name, qualifier)) => Self::new(Some(&qualifier.join(".")), name.clone()),
            None => Self::new(None, String::new()),
        }
    }
}

/// A named subquery or CTE.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct SubQuery {
    pub alias: String,
}

impl SubQuery {
    pub fn new(alias: impl Into<String>) -> Self {
        Self {
            alias: alias.into(),
        }
    }
}

/// The relation that owns a column.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ColumnParent {
    Table(Table),
    SubQuery(SubQuery),
    /// The SQL referenced a qualifier the analyzer could not bind to a
    /// relation in scope; the label is that qualifier as written.
    Unknown { label: String },
}

impl ColumnParent {
    pub fn unknown(label: impl Into<String>) -> Self {
        Self::Unknown {
            label: label.into(),
        }
    }
}

/// A column node in the lineage graph.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct Column {
    pub name: String,
    pub parent: Option<ColumnParent>,
}

impl Column {
    pub fn new(name: impl Into<String>, parent: Option<ColumnParent>) -> Self {
        Self {
            name: name.into(),
            parent,
        }
    }

    /// A column of a top-level `SELECT` that is not written anywhere.
    pub fn unparented(name: impl Into<String>) -> Self {
        Self::new(name, None)
    }

    pub fn of_table(table: &Table, name: impl Into<String>) -> Self {
        Self::new(name, Some(ColumnParent::Table(table.clone())))
    }

    pub fn of_subquery(alias: &str, name: impl Into<String>) -> Self {
        Self::new(name, Some(ColumnParent::SubQuery(SubQuery::new(alias))))
    }
}
