#![no_main]

use lineagekit_core::{estimate_statement_count, Dialect, LineageRunner, NoopResolver};
use libfuzzer_sys::fuzz_target;

// First byte picks the dialect, the rest is SQL.
const DIALECTS: [Dialect; 4] = [
    Dialect::Generic,
    Dialect::Ansi,
    Dialect::Postgres,
    Dialect::Hive,
];

fuzz_target!(|data: &[u8]| {
    let Some((selector, rest)) = data.split_first() else {
        return;
    };
    let Ok(sql) = std::str::from_utf8(rest) else {
        return;
    };
    let dialect = DIALECTS[usize::from(*selector) % DIALECTS.len()];

    let _ = estimate_statement_count(sql);
    if let Ok(run) = LineageRunner::new(dialect, &NoopResolver)
        .silent_mode(true)
        .run(sql)
    {
        let _ = run.graph.column_paths_with_limit(1_000);
        let _ = run.graph.source_tables();
        let _ = run.graph.target_tables();
    }
});
