//! Helpers shared by the listing adapters.

use std::fmt;
use std::sync::LazyLock;

use percent_encoding::percent_decode_str;
use regex::Regex;
use scraper::{ElementRef, Selector};
use serde::{Deserialize, Serialize};
use url::Url;

use super::ListingError;

macro_rules! selector {
    ($name:ident, $css:expr) => {
        pub(crate) static $name: LazyLock<Selector> =
            LazyLock::new(|| Selector::parse($css).unwrap());
    };
}

macro_rules! regex {
    ($name:ident, $regex:expr) => {
        pub(crate) static $name: LazyLock<Regex> = LazyLock::new(|| Regex::new($regex).unwrap());
    };
}

selector!(ANCHOR_SELECTOR, "a[href]");
selector!(TD_SELECTOR, "td");
selector!(TR_SELECTOR, "tr");
selector!(CARD_SELECTOR, "div.card");
selector!(CARD_TITLE_SELECTOR, "h5");
selector!(CARD_BODY_SELECTOR, "div.card-body");
// Four-digit year in parentheses, e.g. "Game (1994)(Publisher)".
regex!(PAREN_YEAR_REGEX, r"\(((?:19|20)\d{2})\)");
regex!(BARE_YEAR_REGEX, r"(?:19|20)\d{2}");
regex!(SIZE_LABEL_REGEX, r"Size:\s*(\S+)");

/// Release region inferred from an entry name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Region {
    #[serde(rename = "USA")]
    Usa,
    #[serde(rename = "JAP")]
    Jap,
    #[serde(rename = "EUR")]
    Eur,
    Other,
}

impl Region {
    /// Classify by substring: `(USA`, `(JAP`, `(EUR`, checked in that order.
    pub fn from_name(name: &str) -> Self {
        if name.contains("(USA") {
            Region::Usa
        } else if name.contains("(JAP") {
            Region::Jap
        } else if name.contains("(EUR") {
            Region::Eur
        } else {
            Region::Other
        }
    }

    /// Display label, matching the serialized form.
    pub fn label(self) -> &'static str {
        match self {
            Region::Usa => "USA",
            Region::Jap => "JAP",
            Region::Eur => "EUR",
            Region::Other => "Other",
        }
    }
}

impl fmt::Display for Region {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Extract a parenthesised four-digit year (`19xx` or `20xx`) from a name.
pub fn extract_year(name: &str) -> Option<&str> {
    PAREN_YEAR_REGEX
        .captures(name)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str())
}

/// First `19xx`/`20xx` run anywhere in free text.
pub(crate) fn find_bare_year(text: &str) -> Option<&str> {
    BARE_YEAR_REGEX.find(text).map(|m| m.as_str())
}

/// Value following a `Size:` label in free text.
pub(crate) fn find_size_label(text: &str) -> Option<&str> {
    SIZE_LABEL_REGEX
        .captures(text)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str())
}

/// Human-readable system name from a system id taken from an href.
///
/// `Sega%20-%2032X` becomes `Sega - 32X`, the name reference dat files use.
pub fn system_display_name(id: &str) -> String {
    percent_decode_str(id).decode_utf8_lossy().into_owned()
}

pub(crate) fn parse_url(url: &str) -> Result<Url, ListingError> {
    Url::parse(url).map_err(|e| ListingError::Url {
        url: url.to_string(),
        reason: e.to_string(),
    })
}

/// Resolve an href from a listing page against the page URL.
///
/// Relative hrefs are anchored with `./` so a name containing `:` is never
/// mistaken for a URL scheme.
pub(crate) fn resolve_href(base: &Url, href: &str) -> Result<Url, ListingError> {
    let is_absolute = href.starts_with('/') || href.contains("://");
    let joined = if is_absolute {
        base.join(href)
    } else {
        base.join(&format!("./{}", href))
    };
    joined.map_err(|e| ListingError::Url {
        url: href.to_string(),
        reason: e.to_string(),
    })
}

/// Concatenated, trimmed text content of an element.
pub(crate) fn element_text(element: &ElementRef<'_>) -> String {
    element.text().collect::<String>().trim().to_string()
}

/// Text content with whitespace runs collapsed to single spaces.
pub(crate) fn element_text_spaced(element: &ElementRef<'_>) -> String {
    element
        .text()
        .flat_map(str::split_whitespace)
        .collect::<Vec<_>>()
        .join(" ")
}

/// Nearest enclosing element with the given tag name.
pub(crate) fn ancestor_named<'a>(element: &ElementRef<'a>, tag: &str) -> Option<ElementRef<'a>> {
    element
        .ancestors()
        .filter_map(ElementRef::wrap)
        .find(|e| e.value().name() == tag)
}
