use std::sync::Arc;
use std::thread;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use lineagekit_core::{Column, ColumnParent, Table};
use lineagekit_server::projector::render_column;
use lineagekit_server::AdmissionController;
use proptest::prelude::*;

fn at(millis: u64) -> SystemTime {
    UNIX_EPOCH + Duration::from_millis(millis)
}

proptest! {
    #[test]
    fn never_admits_more_than_limit_per_window(
        limit in 1u32..20,
        window_secs in 1u64..120,
        gaps in prop::collection::vec(0u64..5_000, 1..200),
    ) {
        let controller = AdmissionController::new(limit, Duration::from_secs(window_secs));
        let window_ms = window_secs * 1000;
        let mut now = 1_000_000u64;
        let mut admitted: Vec<u64> = Vec::new();

        for gap in gaps {
            now += gap;
            let decision = controller.allow("client", at(now));
            // Reference model: count admissions inside [now - window, now].
            let in_window = admitted.iter().filter(|ts| **ts >= now - window_ms).count() as u32;
            prop_assert_eq!(decision.permitted, in_window < limit);
            if decision.permitted {
                admitted.push(now);
                prop_assert_eq!(decision.remaining, limit - in_window - 1);
            } else {
                prop_assert_eq!(decision.remaining, 0);
            }
            prop_assert_eq!(decision.reset_at, (now + window_ms) / 1000);
        }
    }

    #[test]
    fn default_schema_never_rendered(table in "[a-z_]{1,12}", column in "[a-z_]{1,12}") {
        let rendered = render_column(&Column::of_table(&Table::new(None, table.clone()), column.clone()));
        prop_assert_eq!(rendered, format!("{table}.{column}"));
    }

    #[test]
    fn explicit_schema_always_rendered(
        schema in "[a-z]{1,8}",
        table in "[a-z]{1,8}",
        column in "[a-z]{1,8}",
    ) {
        let column = Column::new(
            column.clone(),
            Some(ColumnParent::Table(Table::new(Some(&schema), table.clone()))),
        );
        prop_assert_eq!(render_column(&column), format!("{schema}.{table}.{}", column.name));
    }
}

#[test]
fn concurrent_requests_cannot_overshoot_the_limit() {
    let controller = Arc::new(AdmissionController::new(50, Duration::from_secs(60)));
    let now = SystemTime::now();

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let controller = Arc::clone(&controller);
            thread::spawn(move || {
                (0..25)
                    .filter(|_| controller.allow("shared", now).permitted)
                    .count()
            })
        })
        .collect();

    let admitted: usize = handles.into_iter().map(|h| h.join().unwrap()).sum();
    assert_eq!(admitted, 50);
}

#[test]
fn record_is_dropped_once_its_window_empties() {
    let controller = AdmissionController::new(3, Duration::from_secs(10));
    controller.allow("a", at(0));
    controller.allow("b", at(5_000));
    assert_eq!(controller.tracked_identities(), 2);

    controller.sweep(at(12_000));
    assert_eq!(controller.tracked_identities(), 1);

    controller.sweep(at(16_000));
    assert_eq!(controller.tracked_identities(), 0);
}
