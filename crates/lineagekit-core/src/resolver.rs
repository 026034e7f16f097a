//! Column metadata callback used while building lineage.

/// Answers "which columns does this table have?" for the analyzer.
///
/// Called synchronously, zero or more times per run, whenever the analyzer
/// needs a table's column list (wildcard expansion, attributing an unqualified
/// column across several tables, positional `INSERT` targets). Implementations
/// must not fail: an unknown table is an empty list.
pub trait ColumnResolver: Send + Sync {
    /// `schema` is `None` when the SQL did not qualify the table.
    fn columns_of(&self, schema: Option<&str>, table: &str) -> Vec<String>;
}

/// Resolver that knows nothing; lineage falls back to what the SQL spells out.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopResolver;

impl ColumnResolver for NoopResolver {
    fn columns_of(&self, _schema: Option<&str>, _table: &str) -> Vec<String> {
        Vec::new()
    }
}

impl<F> ColumnResolver for F
where
    F: Fn(Option<&str>, &str) -> Vec<String> + Send + Sync,
{
    fn columns_of(&self, schema: Option<&str>, table: &str) -> Vec<String> {
        self(schema, table)
    }
}
