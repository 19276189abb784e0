//! Adapter for directory-index style listings (Myrient).
//!
//! Collection pages list one anchor per system subdirectory; system pages
//! list one table row per file, with the display size in the second cell.

use scraper::Html;
use url::Url;

use super::parse::{
    ancestor_named, element_text, extract_year, parse_url, resolve_href, system_display_name,
    ANCHOR_SELECTOR, TD_SELECTOR,
};
use super::{ListingContext, ListingEntry, ListingError, ListingSource, Region, Source};
use crate::cache::CacheKey;

const PARENT_LINK: &str = "../";

/// Listing adapter for Myrient's file index.
#[derive(Debug, Clone)]
pub struct MyrientAdapter {
    context: ListingContext,
}

impl MyrientAdapter {
    pub fn new(context: ListingContext) -> Self {
        Self { context }
    }

    fn collection_url(collection: &str) -> Result<Url, ListingError> {
        let url = Source::Myrient
            .collection_url(collection)
            .ok_or_else(|| ListingError::UnknownCollection(collection.to_string()))?;
        parse_url(url)
    }

    fn fetch_systems(&self, collection: &str) -> Result<Vec<String>, ListingError> {
        let url = Self::collection_url(collection)?;
        let html = self
            .context
            .fetch_page(url.as_str(), self.context.config().systems_timeout)?;
        let systems = parse_systems(&html);
        tracing::debug!(collection, count = systems.len(), "Parsed systems");
        Ok(systems)
    }

    fn fetch_games(&self, collection: &str, system: &str) -> Result<Vec<ListingEntry>, ListingError> {
        let base = Self::collection_url(collection)?;
        let page = resolve_href(&base, &format!("{}/", system))?;
        let html = self
            .context
            .fetch_page(page.as_str(), self.context.config().games_timeout)?;
        Ok(parse_games(&html, &page, system))
    }
}

impl ListingSource for MyrientAdapter {
    fn source(&self) -> Source {
        Source::Myrient
    }

    fn list_systems(&self, collection: &str) -> Vec<String> {
        tracing::info!(collection, "Listing Myrient systems");
        let key = CacheKey::systems(Source::Myrient, collection);
        self.context.cached(&key, || self.fetch_systems(collection))
    }

    fn list_games(&self, collection: &str, system: &str) -> Vec<ListingEntry> {
        tracing::info!(collection, system, "Listing Myrient games");
        if collection.is_empty() || system.is_empty() {
            return Vec::new();
        }
        let key = CacheKey::games(Source::Myrient, collection, system);
        self.context.cached(&key, || self.fetch_games(collection, system))
    }
}

/// Subdirectory names linked from a directory index.
///
/// Keeps hrefs ending in `/`, except the parent link and links that leave the
/// current directory (absolute paths or full URLs).
pub fn parse_systems(html: &str) -> Vec<String> {
    let document = Html::parse_document(html);
    document
        .select(&ANCHOR_SELECTOR)
        .filter_map(|a| a.value().attr("href"))
        .filter(|href| {
            href.ends_with('/')
                && *href != PARENT_LINK
                && !href.starts_with('/')
                && !href.contains("://")
        })
        .map(|href| href.trim_end_matches('/').to_string())
        .filter(|name| !name.is_empty() && name != ".")
        .collect()
}

/// Entries linked from a system's directory index.
///
/// The parent link and column-sort links (`?C=N&O=D`) are skipped. `system`
/// is the id as listed by [`parse_systems`]; entries carry its decoded name.
pub fn parse_games(html: &str, page: &Url, system: &str) -> Vec<ListingEntry> {
    let document = Html::parse_document(html);
    let display = system_display_name(system);
    let mut games = Vec::new();

    for link in document.select(&ANCHOR_SELECTOR) {
        let Some(href) = link.value().attr("href") else {
            continue;
        };
        if href == PARENT_LINK || href.starts_with('?') || href.starts_with('#') {
            continue;
        }

        let mut name = element_text(&link);
        if name.is_empty() {
            match link.value().attr("title") {
                Some(title) => name = title.trim().to_string(),
                None => continue,
            }
        }

        let size = ancestor_named(&link, "tr")
            .and_then(|row| row.select(&TD_SELECTOR).nth(1))
            .map(|td| element_text(&td))
            .unwrap_or_else(|| "?".to_string());

        let url = match resolve_href(page, href) {
            Ok(url) => url,
            Err(e) => {
                tracing::debug!(href, error = %e, "Skipping unresolvable link");
                continue;
            }
        };

        games.push(ListingEntry {
            region: Region::from_name(&name),
            year: extract_year(&name).unwrap_or_default().to_string(),
            size,
            system: display.clone(),
            url: url.to_string(),
            name,
        });
    }

    tracing::info!(system, count = games.len(), "Parsed games");
    games
}
