//! Adapter for card-based listings (hShop).
//!
//! Categories come from the site's navigation links. A category page lists
//! titles as `div.card` blocks; pages without cards are read as table rows.

use scraper::Html;
use url::Url;

use super::parse::{
    element_text, element_text_spaced, find_bare_year, find_size_label, parse_url, resolve_href,
    system_display_name, ANCHOR_SELECTOR, CARD_BODY_SELECTOR, CARD_SELECTOR, CARD_TITLE_SELECTOR,
    TD_SELECTOR, TR_SELECTOR,
};
use super::{ListingContext, ListingEntry, ListingError, ListingSource, Region, Source};
use crate::cache::CacheKey;

/// Site-relative prefixes that are not content categories.
const EXCLUDED_PREFIXES: &[&str] = &["/wiki", "/discord", "/donate"];

/// Navigation entries that are not content categories.
const EXCLUDED_CATEGORIES: &[&str] = &["home", "extras", "themes", "videos"];

const UNKNOWN: &str = "?";

/// Listing adapter for hShop.
#[derive(Debug, Clone)]
pub struct HShopAdapter {
    context: ListingContext,
}

impl HShopAdapter {
    pub fn new(context: ListingContext) -> Self {
        Self { context }
    }

    fn collection_url(collection: &str) -> Result<Url, ListingError> {
        let url = Source::HShop
            .collection_url(collection)
            .ok_or_else(|| ListingError::UnknownCollection(collection.to_string()))?;
        parse_url(url)
    }

    fn fetch_systems(&self, collection: &str) -> Result<Vec<String>, ListingError> {
        let url = Self::collection_url(collection)?;
        let html = self
            .context
            .fetch_page(url.as_str(), self.context.config().systems_timeout)?;
        let categories = parse_categories(&html);
        tracing::info!(?categories, "hShop categories found");
        Ok(categories)
    }

    fn fetch_games(&self, collection: &str, system: &str) -> Result<Vec<ListingEntry>, ListingError> {
        let base = Self::collection_url(collection)?;
        let page = resolve_href(&base, system)?;
        let html = self
            .context
            .fetch_page(page.as_str(), self.context.config().games_timeout)?;
        Ok(parse_games(&html, &page, system))
    }
}

impl ListingSource for HShopAdapter {
    fn source(&self) -> Source {
        Source::HShop
    }

    fn list_systems(&self, collection: &str) -> Vec<String> {
        tracing::info!(collection, "Listing hShop categories");
        let key = CacheKey::systems(Source::HShop, collection);
        self.context.cached(&key, || self.fetch_systems(collection))
    }

    fn list_games(&self, collection: &str, system: &str) -> Vec<ListingEntry> {
        tracing::info!(collection, system, "Listing hShop titles");
        if system.is_empty() {
            return Vec::new();
        }
        let key = CacheKey::games(Source::HShop, collection, system);
        self.context.cached(&key, || self.fetch_games(collection, system))
    }
}

/// Category names from site-relative navigation links, in page order.
pub fn parse_categories(html: &str) -> Vec<String> {
    let document = Html::parse_document(html);
    let mut categories: Vec<String> = Vec::new();

    for href in document
        .select(&ANCHOR_SELECTOR)
        .filter_map(|a| a.value().attr("href"))
    {
        if !href.starts_with('/') || href.len() <= 1 {
            continue;
        }
        if EXCLUDED_PREFIXES.iter().any(|p| href.starts_with(p)) {
            continue;
        }

        let category = href
            .split(['?', '#'])
            .next()
            .unwrap_or_default()
            .trim_start_matches('/');

        let lowered = category.to_ascii_lowercase();
        if category.is_empty() || EXCLUDED_CATEGORIES.contains(&lowered.as_str()) {
            continue;
        }
        if !categories.iter().any(|c| c == category) {
            categories.push(category.to_string());
        }
    }

    categories
}

/// Titles listed on a category page.
pub fn parse_games(html: &str, page: &Url, system: &str) -> Vec<ListingEntry> {
    let document = Html::parse_document(html);
    let system = system_display_name(system);
    let mut games = Vec::new();

    for card in document.select(&CARD_SELECTOR) {
        let name = card
            .select(&CARD_TITLE_SELECTOR)
            .next()
            .map(|h| element_text(&h))
            .unwrap_or_else(|| "Unknown".to_string());

        let body_text = card
            .select(&CARD_BODY_SELECTOR)
            .next()
            .map(|body| element_text_spaced(&body))
            .unwrap_or_default();

        let size = find_size_label(&body_text).unwrap_or(UNKNOWN).to_string();
        let year = find_bare_year(&body_text).unwrap_or(UNKNOWN).to_string();

        let url = card
            .select(&ANCHOR_SELECTOR)
            .find(|a| element_text(a).to_lowercase().contains("download"))
            .and_then(|a| a.value().attr("href"))
            .and_then(|href| resolve_href(page, href).ok())
            .unwrap_or_else(|| page.clone());

        games.push(ListingEntry {
            name,
            size,
            region: Region::Usa,
            year,
            system: system.clone(),
            url: url.to_string(),
        });
    }

    if games.is_empty() {
        for row in document.select(&TR_SELECTOR) {
            let cols: Vec<_> = row.select(&TD_SELECTOR).collect();
            if cols.len() < 2 {
                continue;
            }
            games.push(ListingEntry {
                name: element_text(&cols[0]),
                size: element_text(&cols[1]),
                region: Region::Usa,
                year: UNKNOWN.to_string(),
                system: system.clone(),
                url: page.to_string(),
            });
        }
    }

    tracing::info!(system = %system, count = games.len(), "hShop titles parsed");
    games
}
