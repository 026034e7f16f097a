//! Cached, catalog-backed column resolution.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};
use std::time::{Duration, Instant};

use lineagekit_core::ColumnResolver;
use tracing::{debug, info, warn};

use super::{CatalogClient, CatalogLookup};

#[derive(Debug, Clone)]
struct CachedColumns {
    columns: Vec<String>,
    fetched_at: Instant,
}

/// Process-wide cache of table columns keyed by [`locator`].
///
/// Entries are valid while `now - fetched_at < ttl`. Expired entries are
/// left in place and overwritten by the next successful fetch.
#[derive(Debug)]
pub struct ColumnCache {
    ttl: Duration,
    entries: RwLock<HashMap<String, CachedColumns>>,
}

impl ColumnCache {
    #[must_use]
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: RwLock::new(HashMap::new()),
        }
    }

    /// Returns the cached columns if the entry is still fresh at `now`.
    pub fn get(&self, locator: &str, now: Instant) -> Option<Vec<String>> {
        let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
        entries
            .get(locator)
            .filter(|entry| now.saturating_duration_since(entry.fetched_at) < self.ttl)
            .map(|entry| entry.columns.clone())
    }

    pub fn insert(&self, locator: String, columns: Vec<String>, fetched_at: Instant) {
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        entries.insert(
            locator,
            CachedColumns {
                columns,
                fetched_at,
            },
        );
    }

    /// Drops every entry and returns how many there were.
    pub fn clear(&self) -> usize {
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        let cleared = entries.len();
        entries.clear();
        info!(entries = cleared, "cleared catalog column cache");
        cleared
    }

    pub fn len(&self) -> usize {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Cache key for a table: `schema.table` (or `table`), lower-cased.
pub fn locator(schema: Option<&str>, table: &str) -> String {
    match schema {
        Some(schema) => format!("{schema}.{table}").to_lowercase(),
        None => table.to_lowercase(),
    }
}

/// Fully qualified names to try, most specific first.
pub fn candidate_fqns(schema: Option<&str>, table: &str) -> Vec<String> {
    let mut candidates = Vec::with_capacity(2);
    if let Some(schema) = schema {
        candidates.push(format!("{schema}.{table}"));
    }
    candidates.push(table.to_string());
    candidates
}

/// [`ColumnResolver`] backed by a [`CatalogClient`] and a shared [`ColumnCache`].
///
/// The catalog is probed once in [`MetadataResolver::connect`]. If that
/// probe fails the resolver stays disconnected for its whole lifetime and
/// answers every lookup with an empty list without touching the network.
pub struct MetadataResolver {
    client: Arc<dyn CatalogClient>,
    cache: Arc<ColumnCache>,
    connected: bool,
}

impl MetadataResolver {
    pub fn connect(client: Arc<dyn CatalogClient>, cache: Arc<ColumnCache>) -> Self {
        let connected = match client.probe() {
            Ok(()) => {
                info!("connected to metadata catalog");
                true
            }
            Err(err) => {
                warn!(error = %err, "metadata catalog unavailable; column lookups disabled");
                false
            }
        };
        Self {
            client,
            cache,
            connected,
        }
    }

    pub fn is_connected(&self) -> bool {
        self.connected
    }

    pub fn clear_cache(&self) -> usize {
        self.cache.clear()
    }

    /// Columns of `schema.table` as seen at `now`; empty when unknown.
    pub fn lookup_at(&self, schema: Option<&str>, table: &str, now: Instant) -> Vec<String> {
        if !self.connected {
            warn!(
                schema = schema.unwrap_or_default(),
                table, "catalog not connected; no columns for table"
            );
            return Vec::new();
        }

        let key = locator(schema, table);
        if let Some(columns) = self.cache.get(&key, now) {
            debug!(locator = %key, columns = columns.len(), "catalog cache hit");
            return columns;
        }

        match self.fetch(schema, table) {
            Some(columns) => {
                debug!(locator = %key, columns = columns.len(), "fetched columns from catalog");
                self.cache.insert(key, columns.clone(), now);
                columns
            }
            None => {
                warn!(locator = %key, "table not found in catalog under any name");
                Vec::new()
            }
        }
    }

    /// First candidate that resolves to a non-empty column list.
    fn fetch(&self, schema: Option<&str>, table: &str) -> Option<Vec<String>> {
        for fqn in candidate_fqns(schema, table) {
            match self.client.lookup(&fqn) {
                Ok(CatalogLookup::Found(columns)) if !columns.is_empty() => return Some(columns),
                Ok(CatalogLookup::Found(_)) => {
                    debug!(fqn = %fqn, "catalog table has no columns");
                }
                Ok(CatalogLookup::NotFound) => {}
                Ok(CatalogLookup::Unexpected { status, body }) => {
                    warn!(fqn = %fqn, status, body = %body, "unexpected catalog response");
                }
                Err(err) => {
                    warn!(fqn = %fqn, error = %err, "catalog lookup failed");
                }
            }
        }
        None
    }
}

impl ColumnResolver for MetadataResolver {
    fn columns_of(&self, schema: Option<&str>, table: &str) -> Vec<String> {
        self.lookup_at(schema, table, Instant::now())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::CatalogError;
    use std::sync::Mutex;

    /// Scripted catalog that records every name it is asked for.
    #[derive(Default)]
    struct FakeCatalog {
        down: bool,
        tables: HashMap<String, CatalogLookup>,
        calls: Mutex<Vec<String>>,
    }

    impl FakeCatalog {
        fn with(mut self, fqn: &str, lookup: CatalogLookup) -> Self {
            self.tables.insert(fqn.to_string(), lookup);
            self
        }

        fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }
    }

    impl CatalogClient for FakeCatalog {
        fn probe(&self) -> Result<(), CatalogError> {
            if self.down {
                Err(CatalogError::Unavailable { status: 503 })
            } else {
                Ok(())
            }
        }

        fn lookup(&self, fqn: &str) -> Result<CatalogLookup, CatalogError> {
            self.calls.lock().unwrap().push(fqn.to_string());
            Ok(self
                .tables
                .get(fqn)
                .cloned()
                .unwrap_or(CatalogLookup::NotFound))
        }
    }

    fn columns(names: &[&str]) -> Vec<String> {
        names.iter().map(|n| n.to_string()).collect()
    }

    fn resolver(catalog: FakeCatalog, ttl: u64) -> (MetadataResolver, Arc<FakeCatalog>) {
        let catalog = Arc::new(catalog);
        let cache = Arc::new(ColumnCache::new(Duration::from_secs(ttl)));
        let client: Arc<dyn CatalogClient> = catalog.clone();
        (MetadataResolver::connect(client, cache), catalog)
    }

    #[test]
    fn falls_back_to_bare_table_name() {
        let (resolver, catalog) = resolver(
            FakeCatalog::default()
                .with("sales.orders", CatalogLookup::Found(Vec::new()))
                .with("orders", CatalogLookup::Found(columns(&["id", "total"]))),
            300,
        );

        assert_eq!(
            resolver.columns_of(Some("sales"), "orders"),
            columns(&["id", "total"])
        );
        assert_eq!(catalog.calls(), vec!["sales.orders", "orders"]);
    }

    #[test]
    fn qualified_name_wins_when_present() {
        let (resolver, catalog) = resolver(
            FakeCatalog::default()
                .with("sales.orders", CatalogLookup::Found(columns(&["id"])))
                .with("orders", CatalogLookup::Found(columns(&["other"]))),
            300,
        );
        assert_eq!(resolver.columns_of(Some("sales"), "orders"), columns(&["id"]));
        assert_eq!(catalog.calls(), vec!["sales.orders"]);
    }

    #[test]
    fn unexpected_status_does_not_stop_fallback() {
        let (resolver, catalog) = resolver(
            FakeCatalog::default()
                .with(
                    "sales.orders",
                    CatalogLookup::Unexpected {
                        status: 500,
                        body: "boom".to_string(),
                    },
                )
                .with("orders", CatalogLookup::Found(columns(&["id"]))),
            300,
        );
        assert_eq!(resolver.columns_of(Some("sales"), "orders"), columns(&["id"]));
        assert_eq!(catalog.calls().len(), 2);
    }

    #[test]
    fn cache_hit_within_ttl_and_refetch_after() {
        let (resolver, catalog) = resolver(
            FakeCatalog::default().with("orders", CatalogLookup::Found(columns(&["id"]))),
            300,
        );
        let start = Instant::now();

        resolver.lookup_at(None, "orders", start);
        resolver.lookup_at(None, "orders", start + Duration::from_secs(299));
        assert_eq!(catalog.calls().len(), 1);

        resolver.lookup_at(None, "orders", start + Duration::from_secs(300));
        assert_eq!(catalog.calls().len(), 2);
    }

    #[test]
    fn misses_are_not_cached() {
        let (resolver, catalog) = resolver(FakeCatalog::default(), 300);
        assert!(resolver.columns_of(Some("s"), "ghost").is_empty());
        assert!(resolver.columns_of(Some("s"), "ghost").is_empty());
        assert_eq!(catalog.calls().len(), 4);
        assert!(resolver.cache.is_empty());
    }

    #[test]
    fn failed_probe_disables_lookups() {
        let (resolver, catalog) = resolver(
            FakeCatalog {
                down: true,
                ..FakeCatalog::default()
            }
            .with("orders", CatalogLookup::Found(columns(&["id"]))),
            300,
        );
        assert!(!resolver.is_connected());
        assert!(resolver.columns_of(None, "orders").is_empty());
        assert!(catalog.calls().is_empty());
    }

    #[test]
    fn clear_cache_forces_refetch() {
        let (resolver, catalog) = resolver(
            FakeCatalog::default().with("orders", CatalogLookup::Found(columns(&["id"]))),
            300,
        );
        resolver.columns_of(None, "orders");
        assert_eq!(resolver.clear_cache(), 1);
        resolver.columns_of(None, "orders");
        assert_eq!(catalog.calls().len(), 2);
    }

    #[test]
    fn locator_is_case_insensitive() {
        assert_eq!(locator(Some("Sales"), "Orders"), "sales.orders");
        assert_eq!(locator(None, "Orders"), "orders");
        assert_eq!(candidate_fqns(None, "orders"), vec!["orders"]);
    }
}
