//! romfetch - browse, download and identify game archives
//!
//! This library discovers downloadable entries on remote file-listing sites,
//! caches those listings, streams large files to disk with Range-based resume,
//! and identifies downloaded files against per-system reference dat files.
//!
//! # Modules
//!
//! - [`listing`]: site adapters turning listing pages into [`listing::ListingEntry`] values
//! - [`cache`]: TTL-keyed JSON persistence for listings
//! - [`download`]: resumable, progress-reporting transfers
//! - [`reference`]: dat parsing, indexing and file identification
//! - [`http`]: the injectable HTTP client seam
//! - [`config`]: the INI configuration file
//! - [`context`]: wiring of client and configuration into components
//! - [`logging`]: subscriber setup for front ends
//!
//! # Example
//!
//! ```ignore
//! use romfetch::config::ConfigFile;
//! use romfetch::context::Context;
//! use romfetch::download::CancelToken;
//! use romfetch::listing::{ListingSource, Source};
//!
//! let ctx = Context::new(ConfigFile::load()?)?;
//! let games = ctx.site_adapter(Source::Myrient).list_games("No-Intro", "Sega%20-%2032X");
//!
//! let entry = &games[0];
//! let dest = std::path::Path::new("downloads").join(&entry.name);
//! ctx.downloader().fetch(&entry.url, &dest, &CancelToken::new(), |p| {
//!     println!("{:.1}%", p.percent().unwrap_or(0.0));
//! })?;
//!
//! let found = ctx.identifier().identify(&dest, "Sega - 32X")?;
//! ```

pub mod cache;
pub mod config;
pub mod context;
pub mod download;
pub mod http;
pub mod listing;
pub mod logging;
pub mod reference;

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_is_set() {
        assert!(!VERSION.is_empty());
    }
}
