//! SQL dialect registry.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ParseError;

/// SQL dialects the lineage engine can parse.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Dialect {
    #[default]
    Ansi,
    Bigquery,
    Clickhouse,
    Databricks,
    Duckdb,
    Generic,
    Hive,
    Mssql,
    Mysql,
    Postgres,
    Redshift,
    Snowflake,
    Sparksql,
    Sqlite,
}

/// Every accepted dialect name, including aliases, with the dialect it selects.
const DIALECT_NAMES: &[(&str, Dialect)] = &[
    ("ansi", Dialect::Ansi),
    ("bigquery", Dialect::Bigquery),
    ("clickhouse", Dialect::Clickhouse),
    ("databricks", Dialect::Databricks),
    ("duckdb", Dialect::Duckdb),
    ("generic", Dialect::Generic),
    ("hive", Dialect::Hive),
    ("mssql", Dialect::Mssql),
    ("mysql", Dialect::Mysql),
    ("non-validating", Dialect::Generic),
    ("postgres", Dialect::Postgres),
    ("redshift", Dialect::Redshift),
    ("snowflake", Dialect::Snowflake),
    ("sparksql", Dialect::Sparksql),
    ("sqlite", Dialect::Sqlite),
    ("tsql", Dialect::Mssql),
];

impl Dialect {
    pub fn grammar(&self) -> Box<dyn sqlparser::dialect::Dialect> {
        use sqlparser::dialect::{
            AnsiDialect, BigQueryDialect, ClickHouseDialect, DatabricksDialect, DuckDbDialect,
            GenericDialect, HiveDialect, MsSqlDialect, MySqlDialect, PostgreSqlDialect,
            RedshiftSqlDialect, SQLiteDialect, SnowflakeDialect,
        };
        match self {
            Self::Ansi => Box::new(AnsiDialect {}),
            Self::Bigquery => Box::new(BigQueryDialect {}),
            Self::Clickhouse => Box::new(ClickHouseDialect {}),
            // Spark SQL shares the Databricks grammar closely enough for lineage.
            Self::Databricks | Self::Sparksql => Box::new(DatabricksDialect {}),
            Self::Duckdb => Box::new(DuckDbDialect {}),
            Self::Generic => Box::new(GenericDialect {}),
            Self::Hive => Box::new(HiveDialect {}),
            Self::Mssql => Box::new(MsSqlDialect {}),
            Self::Mysql => Box::new(MySqlDialect {}),
            Self::Postgres => Box::new(PostgreSqlDialect {}),
            Self::Redshift => Box::new(RedshiftSqlDialect {}),
            Self::Snowflake => Box::new(SnowflakeDialect {}),
            Self::Sqlite => Box::new(SQLiteDialect {}),
        }
    }

    /// Canonical lowercase name of this dialect.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Ansi => "ansi",
            Self::Bigquery => "bigquery",
            Self::Clickhouse => "clickhouse",
            Self::Databricks => "databricks",
            Self::Duckdb => "duckdb",
            Self::Generic => "generic",
            Self::Hive => "hive",
            Self::Mssql => "mssql",
            Self::Mysql => "mysql",
            Self::Postgres => "postgres",
            Self::Redshift => "redshift",
            Self::Snowflake => "snowflake",
            Self::Sparksql => "sparksql",
            Self::Sqlite => "sqlite",
        }
    }

    /// All dialect names accepted by [`Dialect::from_str`], sorted and de-duplicated.
    pub fn supported_names() -> Vec<&'static str> {
        let mut names: Vec<&'static str> = DIALECT_NAMES.iter().map(|(name, _)| *name).collect();
        names.sort_unstable();
        names.dedup();
        names
    }
}

impl fmt::Display for Dialect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Dialect {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase();
        DIALECT_NAMES
            .iter()
            .find(|(name, _)| *name == wanted)
            .map(|(_, dialect)| *dialect)
            .ok_or_else(|| ParseError::unsupported_dialect(s))
    }
}
