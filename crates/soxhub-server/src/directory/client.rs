//! HTTP client for the directory service
//!
//! Wraps `reqwest` with the configured base URL, bearer token and timeout.
//! Site and list ids are resolved lazily and cached for the lifetime of
//! the process; the ids are stable upstream, so a concurrent double-fetch
//! is harmless.

use std::sync::Arc;
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::sync::RwLock;
use tracing::{debug, info};

use crate::config::DirectoryConfig;
use crate::directory::types::{Collection, ColumnDefinition, ListResource, SiteResource};

/// Shared handle to the directory client, absent when not configured
pub type DirectoryHandle = Option<Arc<DirectoryClient>>;

/// Errors from directory service calls
#[derive(Debug, thiserror::Error)]
pub enum DirectoryError {
    #[error("Directory request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Directory API returned {status}: {snippet}")]
    Api {
        status: reqwest::StatusCode,
        snippet: String,
    },

    #[error("List '{0}' not found in site")]
    ListNotFound(String),
}

/// Resolved ids, populated on first use
#[derive(Debug, Default, Clone, Serialize)]
pub struct IdCache {
    pub site_id: Option<String>,
    pub list_id: Option<String>,
}

/// Client for the Graph-style directory API
pub struct DirectoryClient {
    client: reqwest::Client,
    base_url: String,
    token: String,
    hostname: String,
    site_path: String,
    list_name: String,
    cache: RwLock<IdCache>,
}

impl DirectoryClient {
    /// Build a client from validated configuration
    pub fn new(config: &DirectoryConfig) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            token: config.token.clone(),
            hostname: config.hostname.clone(),
            site_path: config.site_path.trim_matches('/').to_string(),
            list_name: config.list_name.clone(),
            cache: RwLock::new(IdCache::default()),
        })
    }

    /// Display name of the backing list
    pub fn list_name(&self) -> &str {
        &self.list_name
    }

    /// Current cache contents
    pub async fn cache_state(&self) -> IdCache {
        self.cache.read().await.clone()
    }

    /// Resolve the site id for the configured hostname and site path
    ///
    /// Served from the cache after the first successful resolution.
    pub async fn site_id(&self) -> Result<String, DirectoryError> {
        if let Some(id) = self.cache.read().await.site_id.clone() {
            return Ok(id);
        }

        let url = format!("{}/sites/{}:/{}", self.base_url, self.hostname, self.site_path);
        let site: SiteResource = self.send(self.client.get(&url)).await?;

        info!(site_id = %site.id, "Resolved directory site");
        self.cache.write().await.site_id = Some(site.id.clone());

        Ok(site.id)
    }

    /// Resolve the id of the configured list within the site
    ///
    /// Served from the cache after the first successful resolution.
    pub async fn list_id(&self) -> Result<String, DirectoryError> {
        if let Some(id) = self.cache.read().await.list_id.clone() {
            return Ok(id);
        }

        let site_id = self.site_id().await?;

        let url = format!("{}/sites/{}/lists", self.base_url, site_id);
        let filter = format!("displayName eq '{}'", self.list_name);
        let collection: Collection<ListResource> = self
            .send(self.client.get(&url).query(&[("$filter", filter.as_str())]))
            .await?;

        let list = collection
            .value
            .into_iter()
            .next()
            .ok_or_else(|| DirectoryError::ListNotFound(self.list_name.clone()))?;

        info!(list_id = %list.id, "Resolved directory list");
        self.cache.write().await.list_id = Some(list.id.clone());

        Ok(list.id)
    }

    /// Enumerate the columns of the configured list
    pub async fn columns(&self) -> Result<Vec<ColumnDefinition>, DirectoryError> {
        let site_id = self.site_id().await?;
        let list_id = self.list_id().await?;

        let url = format!("{}/sites/{}/lists/{}/columns", self.base_url, site_id, list_id);
        let collection: Collection<ColumnDefinition> = self.send(self.client.get(&url)).await?;

        Ok(collection.value)
    }

    /// Send a request with the bearer token and decode the JSON body
    ///
    /// Non-success statuses become [`DirectoryError::Api`] carrying the
    /// status and the first part of the response body.
    async fn send<T: DeserializeOwned>(
        &self,
        request: reqwest::RequestBuilder,
    ) -> Result<T, DirectoryError> {
        let response = request.bearer_auth(&self.token).send().await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let snippet: String = body.chars().take(200).collect();
            debug!(%status, "Directory API error");
            return Err(DirectoryError::Api { status, snippet });
        }

        Ok(response.json::<T>().await?)
    }
}

impl std::fmt::Debug for DirectoryClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DirectoryClient")
            .field("base_url", &self.base_url)
            .field("hostname", &self.hostname)
            .field("site_path", &self.site_path)
            .field("list_name", &self.list_name)
            .finish_non_exhaustive()
    }
}
