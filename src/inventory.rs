//! Remote asset inventory.
//!
//! Lists every asset stored on the remote host by following the listing
//! cursor until the host stops returning one. The result is a snapshot: it
//! is rebuilt on every audit and never updated in place.
//!
//! # Cloudinary
//!
//! [`CloudinaryAdmin`] talks to the Admin API:
//!
//! ```text
//! GET {api_base_url}/v1_1/{cloud_name}/resources/{resource_type}/{upload_type}
//!     ?max_results=500&next_cursor=...
//! ```
//!
//! Requests use HTTP basic auth with credentials read from the environment
//! variables `CLOUDINARY_API_KEY` and `CLOUDINARY_API_SECRET`; both are required.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::collections::BTreeSet;
use std::time::Duration;
use tracing::debug;

use crate::config::AssetHostConfig;
use crate::error::{InventoryFetchError, TransportError};
use crate::models::AssetId;

/// One page of a listing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InventoryPage {
    pub ids: Vec<AssetId>,
    /// Cursor for the next page; `None` on the last page.
    pub next_cursor: Option<String>,
}

/// A remote host that can list its assets page by page.
pub trait AssetHost {
    /// Fetch the page after `cursor`, or the first page when `cursor` is `None`.
    fn list_page(&self, cursor: Option<&str>) -> Result<InventoryPage, TransportError>;
}

/// Every asset id currently stored remotely.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RemoteInventory {
    ids: BTreeSet<AssetId>,
    pages: usize,
}

impl RemoteInventory {
    pub fn contains(&self, id: &AssetId) -> bool {
        self.ids.contains(id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &AssetId> {
        self.ids.iter()
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Number of listing requests it took to build this snapshot.
    pub fn pages(&self) -> usize {
        self.pages
    }
}

impl FromIterator<AssetId> for RemoteInventory {
    fn from_iter<I: IntoIterator<Item = AssetId>>(iter: I) -> Self {
        Self {
            ids: iter.into_iter().collect(),
            pages: 0,
        }
    }
}

/// List the whole inventory, one page after another.
///
/// Stops only when a page has no cursor (an empty cursor counts as none).
/// Any failed request aborts the fetch and nothing is returned.
pub fn fetch_inventory(host: &dyn AssetHost) -> Result<RemoteInventory, InventoryFetchError> {
    let mut ids = BTreeSet::new();
    let mut cursor: Option<String> = None;
    let mut page = 0;

    loop {
        page += 1;
        let batch = host
            .list_page(cursor.as_deref())
            .map_err(|source| InventoryFetchError { page, source })?;
        debug!(page, assets = batch.ids.len(), "fetched inventory page");
        ids.extend(batch.ids);

        match batch.next_cursor.filter(|c| !c.is_empty()) {
            Some(next) => cursor = Some(next),
            None => break,
        }
    }

    Ok(RemoteInventory { ids, pages: page })
}

// ============ Cloudinary Admin API ============

/// Admin API credentials.
pub struct CloudinaryCredentials {
    api_key: String,
    api_secret: String,
}

impl CloudinaryCredentials {
    pub fn new(api_key: impl Into<String>, api_secret: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            api_secret: api_secret.into(),
        }
    }

    /// Load credentials from `CLOUDINARY_API_KEY` and `CLOUDINARY_API_SECRET`.
    pub fn from_env() -> Result<Self> {
        let api_key = std::env::var("CLOUDINARY_API_KEY")
            .context("CLOUDINARY_API_KEY environment variable not set")?;
        let api_secret = std::env::var("CLOUDINARY_API_SECRET")
            .context("CLOUDINARY_API_SECRET environment variable not set")?;
        Ok(Self::new(api_key, api_secret))
    }
}

/// [`AssetHost`] backed by the Cloudinary Admin API.
pub struct CloudinaryAdmin {
    client: reqwest::blocking::Client,
    list_url: String,
    page_size: usize,
    credentials: CloudinaryCredentials,
}

impl CloudinaryAdmin {
    pub fn new(config: &AssetHostConfig, credentials: CloudinaryCredentials) -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            client,
            list_url: list_url(config),
            page_size: config.page_size,
            credentials,
        })
    }

    /// Build a client using credentials from the environment.
    pub fn from_env(config: &AssetHostConfig) -> Result<Self> {
        Self::new(config, CloudinaryCredentials::from_env()?)
    }
}

impl AssetHost for CloudinaryAdmin {
    fn list_page(&self, cursor: Option<&str>) -> Result<InventoryPage, TransportError> {
        let mut request = self
            .client
            .get(&self.list_url)
            .basic_auth(&self.credentials.api_key, Some(&self.credentials.api_secret))
            .query(&[("max_results", self.page_size)]);
        if let Some(cursor) = cursor {
            request = request.query(&[("next_cursor", cursor)]);
        }

        let response = request.send()?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(TransportError::Status {
                status: status.as_u16(),
                body: body.chars().take(500).collect(),
            });
        }

        let body = response.text()?;
        parse_resources_page(&body)
    }
}

fn list_url(config: &AssetHostConfig) -> String {
    format!(
        "{}/v1_1/{}/resources/{}/{}",
        config.api_base_url.trim_end_matches('/'),
        config.cloud_name,
        config.resource_type,
        config.upload_type
    )
}

#[derive(Deserialize)]
struct ResourcesResponse {
    #[serde(default)]
    resources: Vec<Resource>,
    #[serde(default)]
    next_cursor: Option<String>,
}

#[derive(Deserialize)]
struct Resource {
    public_id: String,
}

/// Decode one Admin API listing response.
fn parse_resources_page(body: &str) -> Result<InventoryPage, TransportError> {
    let response: ResourcesResponse =
        serde_json::from_str(body).map_err(|e| TransportError::Decode(e.to_string()))?;
    Ok(InventoryPage {
        ids: response
            .resources
            .into_iter()
            .map(|r| AssetId::new(r.public_id))
            .collect(),
        next_cursor: response.next_cursor,
    })
}
