use lineagekit_core::{
    Column, ColumnParent, ColumnResolver, Dialect, LineageRun, LineageRunner, NoopResolver,
    ParseErrorKind, Table,
};
use rstest::rstest;
use std::collections::BTreeSet;

fn run_with(sql: &str, dialect: Dialect, resolver: &dyn ColumnResolver) -> LineageRun {
    LineageRunner::new(dialect, resolver)
        .run(sql.trim())
        .unwrap_or_else(|err| panic!("lineage failed for {sql}: {err}"))
}

fn run(sql: &str) -> LineageRun {
    run_with(sql, Dialect::Generic, &NoopResolver)
}

fn label(column: &Column) -> String {
    match &column.parent {
        Some(ColumnParent::Table(table)) => match table.schema.qualifier() {
            Some(schema) => format!("{schema}.{}.{}", table.name, column.name),
            None => format!("{}.{}", table.name, column.name),
        },
        Some(ColumnParent::SubQuery(subquery)) => format!("{}.{}", subquery.alias, column.name),
        Some(ColumnParent::Unknown { label }) => format!("{label}.{}", column.name),
        None => column.name.clone(),
    }
}

fn paths(run: &LineageRun) -> BTreeSet<Vec<String>> {
    run.graph
        .column_paths()
        .expect("paths")
        .into_iter()
        .map(|path| path.into_iter().map(label).collect())
        .collect()
}

fn path(columns: &[&str]) -> Vec<String> {
    columns.iter().map(|c| c.to_string()).collect()
}

fn table(schema: Option<&str>, name: &str) -> Table {
    Table::new(schema, name)
}

#[test]
fn insert_select_maps_columns_by_position() {
    let run = run(
        "INSERT INTO mart.orders_daily (order_id, total) \
         SELECT o.id, o.amount * 2 FROM sales.orders o",
    );

    assert_eq!(run.graph.source_tables(), vec![table(Some("sales"), "orders")]);
    assert_eq!(run.graph.target_tables(), vec![table(Some("mart"), "orders_daily")]);
    assert_eq!(
        paths(&run),
        BTreeSet::from([
            path(&["sales.orders.amount", "mart.orders_daily.total"]),
            path(&["sales.orders.id", "mart.orders_daily.order_id"]),
        ])
    );
}

#[test]
fn ctas_routes_through_cte_nodes() {
    let run = run("CREATE TABLE t AS WITH c AS (SELECT a FROM s) SELECT a FROM c");
    assert_eq!(paths(&run), BTreeSet::from([path(&["s.a", "c.a", "t.a"])]));
    assert_eq!(run.graph.source_tables(), vec![table(None, "s")]);
    assert_eq!(run.graph.target_tables(), vec![table(None, "t")]);
}

#[test]
fn intermediate_table_connects_statements() {
    let run = run(
        "CREATE TABLE tmp AS SELECT id FROM raw_events; \
         INSERT INTO final_table SELECT id FROM tmp",
    );

    assert_eq!(run.statement_count, 2);
    assert_eq!(run.graph.source_tables(), vec![table(None, "raw_events")]);
    assert_eq!(run.graph.target_tables(), vec![table(None, "final_table")]);
    assert_eq!(run.graph.intermediate_tables(), vec![table(None, "tmp")]);
    assert_eq!(
        paths(&run),
        BTreeSet::from([path(&["raw_events.id", "tmp.id", "final_table.id"])])
    );
}

#[test]
fn same_statement_read_and_write_is_not_intermediate() {
    let run = run("INSERT INTO t SELECT x FROM t");
    assert_eq!(run.graph.source_tables(), vec![table(None, "t")]);
    assert_eq!(run.graph.target_tables(), vec![table(None, "t")]);
}

#[test]
fn wildcard_expands_through_resolver() {
    let resolver = |schema: Option<&str>, name: &str| match (schema, name) {
        (None, "users") => vec!["id".to_string(), "name".to_string()],
        _ => Vec::new(),
    };
    let run = run_with("INSERT INTO t SELECT * FROM users", Dialect::Generic, &resolver);
    assert_eq!(
        paths(&run),
        BTreeSet::from([
            path(&["users.id", "t.id"]),
            path(&["users.name", "t.name"]),
        ])
    );
}

#[test]
fn qualified_wildcard_expands_only_its_table() {
    let resolver = |schema: Option<&str>, name: &str| match (schema, name) {
        (Some("sales"), "orders") => vec!["id".to_string(), "total".to_string()],
        (None, "customers") => vec!["id".to_string(), "name".to_string()],
        _ => Vec::new(),
    };
    let run = run_with(
        "INSERT INTO t SELECT o.* FROM sales.orders o JOIN customers c ON o.id = c.id",
        Dialect::Ansi,
        &resolver,
    );
    assert_eq!(
        paths(&run),
        BTreeSet::from([
            path(&["sales.orders.id", "t.id"]),
            path(&["sales.orders.total", "t.total"]),
        ])
    );
}

#[test]
fn wildcard_without_metadata_is_star() {
    let run = run("INSERT INTO t SELECT * FROM users");
    assert_eq!(paths(&run), BTreeSet::from([path(&["users.*", "t.*"])]));
}

#[test]
fn ambiguous_column_without_metadata_is_unresolved() {
    let run = run("INSERT INTO t SELECT id FROM a JOIN b ON a.k = b.k");
    assert_eq!(paths(&run), BTreeSet::from([path(&["<unknown>.id", "t.id"])]));
}

#[test]
fn ambiguous_column_is_attributed_with_metadata() {
    let resolver = |_: Option<&str>, name: &str| match name {
        "a" => vec!["id".to_string(), "k".to_string()],
        "b" => vec!["k".to_string()],
        _ => Vec::new(),
    };
    let run = run_with(
        "INSERT INTO t SELECT id FROM a JOIN b ON a.k = b.k",
        Dialect::Generic,
        &resolver,
    );
    assert_eq!(paths(&run), BTreeSet::from([path(&["a.id", "t.id"])]));
}

#[test]
fn unknown_qualifier_is_kept_as_label() {
    let run = run("INSERT INTO t SELECT z.id FROM a");
    assert_eq!(paths(&run), BTreeSet::from([path(&["z.id", "t.id"])]));
}

#[test]
fn ddl_column_order_drives_positional_insert() {
    let run = run("CREATE TABLE t (x INT, y INT); INSERT INTO t SELECT a, b FROM s");
    assert_eq!(
        paths(&run),
        BTreeSet::from([path(&["s.a", "t.x"]), path(&["s.b", "t.y"])])
    );
    assert_eq!(run.graph.target_tables(), vec![table(None, "t")]);
}

#[test]
fn create_view_writes_the_view() {
    let run = run("CREATE VIEW reporting.v AS SELECT id FROM s");
    assert_eq!(run.graph.target_tables(), vec![table(Some("reporting"), "v")]);
    assert_eq!(paths(&run), BTreeSet::from([path(&["s.id", "reporting.v.id"])]));
}

#[test]
fn subqueries_in_projection_and_filter_are_read() {
    let run = run(
        "INSERT INTO t SELECT id, (SELECT max(v) FROM lookup) AS peak FROM s \
         WHERE id IN (SELECT id FROM allow_list)",
    );
    assert_eq!(
        run.graph.source_tables(),
        vec![table(None, "allow_list"), table(None, "lookup"), table(None, "s")]
    );
    assert!(paths(&run).contains(&path(&["lookup.v", "t.peak"])));
}

#[test]
fn union_branches_feed_the_same_target() {
    let run = run("INSERT INTO t SELECT a FROM x UNION ALL SELECT b FROM y");
    assert_eq!(
        paths(&run),
        BTreeSet::from([path(&["x.a", "t.a"]), path(&["y.b", "t.a"])])
    );
}

#[test]
fn top_level_select_has_unowned_outputs() {
    let run = run("SELECT col1 AS renamed FROM table1");
    assert_eq!(paths(&run), BTreeSet::from([path(&["table1.col1", "renamed"])]));
    assert!(run.graph.target_tables().is_empty());
}

#[test]
fn quoted_identifiers_keep_case() {
    let run = run("INSERT INTO t SELECT \"Id\" FROM s");
    assert_eq!(paths(&run), BTreeSet::from([path(&["s.Id", "t.Id"])]));
}

#[rstest]
#[case(Dialect::Ansi)]
#[case(Dialect::Postgres)]
#[case(Dialect::Snowflake)]
#[case(Dialect::Mysql)]
#[case(Dialect::Hive)]
#[case(Dialect::Sparksql)]
fn simple_insert_across_dialects(#[case] dialect: Dialect) {
    let run = run_with(
        "INSERT INTO tgt SELECT a, b FROM src",
        dialect,
        &NoopResolver,
    );
    assert_eq!(run.graph.source_tables(), vec![table(None, "src")]);
    assert_eq!(run.graph.target_tables(), vec![table(None, "tgt")]);
    assert_eq!(paths(&run).len(), 2);
}

#[test]
fn syntax_error_reports_dialect() {
    let err = LineageRunner::new(Dialect::Postgres, &NoopResolver)
        .run("SELEC 1")
        .unwrap_err();
    assert_ne!(err.kind, ParseErrorKind::UnsupportedStatement);
    assert_eq!(err.dialect, Some(Dialect::Postgres));
}

#[test]
fn unsupported_statement_is_rejected_unless_silent() {
    let sql = "INSERT INTO t SELECT a FROM s; DELETE FROM t WHERE a = 1";
    let err = LineageRunner::new(Dialect::Generic, &NoopResolver)
        .run(sql)
        .unwrap_err();
    assert_eq!(err.kind, ParseErrorKind::UnsupportedStatement);
    assert!(err.message.starts_with("statement #2 (DELETE)"));

    let run = LineageRunner::new(Dialect::Generic, &NoopResolver)
        .silent_mode(true)
        .run(sql)
        .unwrap();
    assert_eq!(run.skipped_statements, 1);
    assert_eq!(paths(&run), BTreeSet::from([path(&["s.a", "t.a"])]));
}
