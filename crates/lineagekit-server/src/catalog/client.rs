//! HTTP client for the OpenMetadata REST API.

use reqwest::{StatusCode, Url};
use serde::Deserialize;
use tokio::runtime::Handle;

use super::{CatalogClient, CatalogError, CatalogLookup};
use crate::config::CatalogSettings;

/// The subset of an OpenMetadata table entity the resolver needs.
#[derive(Debug, Deserialize)]
struct TableDocument {
    #[serde(default)]
    columns: Vec<ColumnDocument>,
}

#[derive(Debug, Deserialize)]
struct ColumnDocument {
    name: String,
}

/// Talks to `{base}/system/status` and `{base}/tables/name/{fqn}`.
///
/// Requests run on the async `reqwest` client and are driven to completion
/// with [`Handle::block_on`], so methods must be called from a blocking
/// thread (for example inside `spawn_blocking`).
#[derive(Clone)]
pub struct OpenMetadataClient {
    base_url: Url,
    api_key: String,
    http: reqwest::Client,
    runtime: Handle,
}

impl std::fmt::Debug for OpenMetadataClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenMetadataClient")
            .field("base_url", &self.base_url.as_str())
            .field("api_key", &"<redacted>")
            .finish()
    }
}

impl OpenMetadataClient {
    pub fn new(settings: &CatalogSettings, runtime: Handle) -> Result<Self, CatalogError> {
        let trimmed = settings.base_url.trim_end_matches('/');
        let base_url = Url::parse(trimmed).map_err(|_| CatalogError::InvalidUrl {
            url: settings.base_url.clone(),
        })?;
        if base_url.cannot_be_a_base() {
            return Err(CatalogError::InvalidUrl {
                url: settings.base_url.clone(),
            });
        }
        let http = reqwest::Client::builder()
            .timeout(settings.timeout)
            .build()
            .map_err(CatalogError::Client)?;

        Ok(Self {
            base_url,
            api_key: settings.api_key.clone(),
            http,
            runtime,
        })
    }

    fn endpoint(&self, segments: &[&str]) -> Result<Url, CatalogError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| CatalogError::InvalidUrl {
                url: self.base_url.to_string(),
            })?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    /// Issues an authenticated GET and returns the status and body text.
    fn get(&self, url: Url) -> Result<(StatusCode, String), CatalogError> {
        let request = self
            .http
            .get(url.clone())
            .bearer_auth(&self.api_key)
            .header(reqwest::header::CONTENT_TYPE, "application/json");

        self.runtime.block_on(async move {
            let response = request
                .send()
                .await
                .map_err(|source| CatalogError::Transport {
                    url: url.to_string(),
                    source,
                })?;
            let status = response.status();
            let body = response
                .text()
                .await
                .map_err(|source| CatalogError::Transport {
                    url: url.to_string(),
                    source,
                })?;
            Ok((status, body))
        })
    }
}

impl CatalogClient for OpenMetadataClient {
    fn probe(&self) -> Result<(), CatalogError> {
        let (status, _) = self.get(self.endpoint(&["system", "status"])?)?;
        if status.is_success() {
            Ok(())
        } else {
            Err(CatalogError::Unavailable {
                status: status.as_u16(),
            })
        }
    }

    fn lookup(&self, fqn: &str) -> Result<CatalogLookup, CatalogError> {
        let (status, body) = self.get(self.endpoint(&["tables", "name", fqn])?)?;
        match status {
            StatusCode::OK => {
                let document: TableDocument =
                    serde_json::from_str(&body).map_err(|source| CatalogError::Decode {
                        fqn: fqn.to_string(),
                        source,
                    })?;
                Ok(CatalogLookup::Found(
                    document.columns.into_iter().map(|c| c.name).collect(),
                ))
            }
            StatusCode::NOT_FOUND => Ok(CatalogLookup::NotFound),
            other => Ok(CatalogLookup::Unexpected {
                status: other.as_u16(),
                body,
            }),
        }
    }
}
