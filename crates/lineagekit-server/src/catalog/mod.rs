//! Column metadata from an external data catalog.
//!
//! The lineage engine asks for the columns of a table through a synchronous
//! [`lineagekit_core::ColumnResolver`]. [`MetadataResolver`] answers from a
//! shared [`ColumnCache`] and falls back to a [`CatalogClient`] on a miss.

mod client;
mod resolver;

use thiserror::Error;

pub use client::OpenMetadataClient;
pub use resolver::{candidate_fqns, locator, ColumnCache, MetadataResolver};

/// Result of looking up one fully qualified name in the catalog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CatalogLookup {
    /// The table exists; its columns in catalog order (possibly empty).
    Found(Vec<String>),
    /// The catalog has no table under this name.
    NotFound,
    /// Any other non-success status.
    Unexpected { status: u16, body: String },
}

/// Transport-level failures talking to the catalog.
///
/// These never reach an API caller; the resolver logs them and reports the
/// table as having no known columns.
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("invalid catalog base URL '{url}'")]
    InvalidUrl { url: String },

    #[error("failed to build catalog HTTP client: {0}")]
    Client(#[source] reqwest::Error),

    #[error("catalog request to {url} failed: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("catalog liveness check returned HTTP {status}")]
    Unavailable { status: u16 },

    #[error("unreadable table document for '{fqn}': {source}")]
    Decode {
        fqn: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Blocking access to a metadata catalog.
///
/// Implementations are called from the blocking thread pool, never from an
/// async task.
pub trait CatalogClient: Send + Sync {
    /// One liveness check.
    fn probe(&self) -> Result<(), CatalogError>;

    /// Looks up a table by fully qualified name.
    fn lookup(&self, fqn: &str) -> Result<CatalogLookup, CatalogError>;
}
