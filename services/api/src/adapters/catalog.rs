//! services/api/src/adapters/catalog.rs
//!
//! This module contains the adapter for the external book catalog (Google Books
//! volumes API). It implements the `CatalogSearchService` port from the `core` crate.

use async_trait::async_trait;
use reading_tracker_core::{
    domain::CatalogEntry,
    ports::{CatalogSearchService, PortError, PortResult},
};
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, warn};

//=========================================================================================
// Wire Types
//=========================================================================================

#[derive(Debug, Deserialize)]
struct VolumesResponse {
    items: Option<Vec<Volume>>,
}

#[derive(Debug, Deserialize)]
struct Volume {
    id: String,
    #[serde(rename = "volumeInfo")]
    volume_info: VolumeInfo,
}

#[derive(Debug, Deserialize)]
struct VolumeInfo {
    title: Option<String>,
    authors: Option<Vec<String>>,
    #[serde(rename = "imageLinks")]
    image_links: Option<ImageLinks>,
    #[serde(rename = "pageCount")]
    page_count: Option<i32>,
    description: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ImageLinks {
    thumbnail: Option<String>,
}

impl Volume {
    fn into_entry(self) -> Option<CatalogEntry> {
        let info = self.volume_info;
        let title = info.title.filter(|t| !t.trim().is_empty())?;
        // Google Books often hands out http thumbnails; upgrade them.
        let cover_url = info
            .image_links
            .and_then(|links| links.thumbnail)
            .map(|thumb| thumb.replace("http://", "https://"));

        Some(CatalogEntry {
            external_id: self.id,
            title,
            authors: info.authors.unwrap_or_default(),
            cover_url,
            page_count: info.page_count,
            description: info.description,
        })
    }
}

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// An adapter that implements `CatalogSearchService` against the Google Books API.
#[derive(Clone)]
pub struct GoogleBooksAdapter {
    client: reqwest::Client,
    base_url: String,
    max_results: u32,
}

impl GoogleBooksAdapter {
    /// Creates a new `GoogleBooksAdapter` whose requests give up after `timeout`.
    pub fn new(
        base_url: impl Into<String>,
        max_results: u32,
        timeout: Duration,
    ) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            max_results,
        })
    }

    fn degrade(&self, query: &str, e: reqwest::Error) -> PortResult<Vec<CatalogEntry>> {
        if e.is_timeout() {
            return Err(PortError::Timeout(format!("catalog search '{}'", query)));
        }
        warn!("Catalog search for '{}' failed: {}", query, e);
        Ok(Vec::new())
    }
}

//=========================================================================================
// `CatalogSearchService` Trait Implementation
//=========================================================================================

#[async_trait]
impl CatalogSearchService for GoogleBooksAdapter {
    async fn search(&self, query: &str) -> PortResult<Vec<CatalogEntry>> {
        let query = query.trim();
        if query.is_empty() {
            return Ok(Vec::new());
        }

        let url = format!("{}/volumes", self.base_url);
        let max_results = self.max_results.to_string();
        let response = match self
            .client
            .get(&url)
            .query(&[("q", query), ("maxResults", max_results.as_str())])
            .send()
            .await
        {
            Ok(response) => response,
            Err(e) => return self.degrade(query, e),
        };

        if !response.status().is_success() {
            warn!(
                "Catalog search for '{}' returned status {}",
                query,
                response.status()
            );
            return Ok(Vec::new());
        }

        let body = match response.text().await {
            Ok(body) => body,
            Err(e) => return self.degrade(query, e),
        };

        let parsed: VolumesResponse = match serde_json::from_str(&body) {
            Ok(parsed) => parsed,
            Err(e) => {
                warn!("Catalog search for '{}' returned a malformed body: {}", query, e);
                return Ok(Vec::new());
            }
        };

        let entries: Vec<CatalogEntry> = parsed
            .items
            .unwrap_or_default()
            .into_iter()
            .filter_map(Volume::into_entry)
            .collect();
        debug!("Catalog search for '{}' found {} entries", query, entries.len());
        Ok(entries)
    }
}
