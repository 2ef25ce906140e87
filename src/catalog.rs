#![forbid(unsafe_code)]

use std::fmt;
use std::sync::{Arc, LazyLock};

use scraper::{Html, Selector};
use tracing::debug;
use url::Url;

use crate::error::FetchError;
use crate::http::HttpClient;

static ENTRY_LINK: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("a.movie-video__link").expect("valid catalog link selector"));

/// Absolute URL of one item on the catalog page.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CatalogEntry(String);

impl CatalogEntry {
    pub fn new(url: impl Into<String>) -> Self {
        Self(url.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CatalogEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

pub struct CatalogDiscoverer {
    client: Arc<dyn HttpClient>,
    catalog_url: String,
    site_origin: Url,
}

impl CatalogDiscoverer {
    pub fn new(
        client: Arc<dyn HttpClient>,
        catalog_url: impl Into<String>,
        site_origin: Url,
    ) -> Self {
        Self {
            client,
            catalog_url: catalog_url.into(),
            site_origin,
        }
    }

    /// Fetches the catalog page. An unreachable page is an error; a page
    /// without entries is not.
    pub fn discover(&self) -> Result<Vec<CatalogEntry>, FetchError> {
        let html = self.client.get_text(&self.catalog_url)?;
        let entries = extract_entries(&html, &self.site_origin);
        debug!(count = entries.len(), url = %self.catalog_url, "parsed catalog page");
        Ok(entries)
    }
}

/// Collects entry links in document order, resolving relative hrefs against
/// `origin`.
pub fn extract_entries(html: &str, origin: &Url) -> Vec<CatalogEntry> {
    let document = Html::parse_document(html);
    document
        .select(&ENTRY_LINK)
        .filter_map(|anchor| anchor.value().attr("href"))
        .map(str::trim)
        .filter(|href| !href.is_empty())
        .filter_map(|href| match origin.join(href) {
            Ok(url) => Some(CatalogEntry::new(url)),
            Err(err) => {
                debug!(href, %err, "ignoring unparsable catalog link");
                None
            }
        })
        .collect()
}
