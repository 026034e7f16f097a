//! Shared application state for the server.
//!
//! Everything here is created once at startup and shared across handlers via
//! `Arc`, so tests can build isolated instances with their own limiter,
//! cache and catalog.

use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::runtime::Handle;

use crate::admission::AdmissionController;
use crate::catalog::{CatalogClient, ColumnCache, OpenMetadataClient};
use crate::config::ServiceConfig;

/// Shared application state.
pub struct AppState {
    /// Validated service configuration
    pub config: ServiceConfig,
    /// Per-client rate limiter
    pub admission: AdmissionController,
    /// Column cache shared by every request's resolver
    pub cache: Arc<ColumnCache>,
    /// Metadata catalog, when configured
    pub catalog: Option<Arc<dyn CatalogClient>>,
}

impl AppState {
    /// Builds state from configuration, connecting the OpenMetadata client
    /// when a catalog is configured. Must be called inside a Tokio runtime.
    pub fn new(config: ServiceConfig) -> Result<Self> {
        let catalog = match config.catalog() {
            Some(settings) => {
                let runtime = Handle::try_current().context("no Tokio runtime for catalog client")?;
                let client = OpenMetadataClient::new(&settings, runtime)
                    .context("failed to set up OpenMetadata client")?;
                Some(Arc::new(client) as Arc<dyn CatalogClient>)
            }
            None => None,
        };
        Ok(Self::with_catalog(config, catalog))
    }

    /// Builds state around an explicit catalog client.
    pub fn with_catalog(config: ServiceConfig, catalog: Option<Arc<dyn CatalogClient>>) -> Self {
        let admission = AdmissionController::new(config.rate_limit, config.rate_limit_window());
        let cache = Arc::new(ColumnCache::new(std::time::Duration::from_secs(
            config.openmetadata_cache_ttl_secs,
        )));
        Self {
            config,
            admission,
            cache,
            catalog,
        }
    }

    pub fn catalog_configured(&self) -> bool {
        self.catalog.is_some()
    }
}
