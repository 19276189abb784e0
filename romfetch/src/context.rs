//! Explicit wiring of the shared HTTP client and configuration.
//!
//! Nothing in the library holds process-wide state. A front end builds one
//! [`Context`] and asks it for the components it needs; each component gets
//! the same client and the paths and timeouts from [`ConfigFile`].

use std::fmt;
use std::sync::Arc;

use crate::cache::ListingCache;
use crate::config::ConfigFile;
use crate::download::{DownloadConfig, Downloader};
use crate::http::{HttpClient, HttpResult, ReqwestClient};
use crate::listing::{ListingConfig, ListingContext, SiteAdapter, Source};
use crate::reference::{Identifier, ReferenceDatabase};

/// Shared client plus configuration, the factory for every component.
#[derive(Clone)]
pub struct Context {
    client: Arc<dyn HttpClient>,
    config: ConfigFile,
    reference: Arc<ReferenceDatabase>,
}

impl Context {
    /// Build a context around a real HTTP client configured from `config`.
    pub fn new(config: ConfigFile) -> HttpResult<Self> {
        let client =
            ReqwestClient::with_settings(config.network.connect_timeout, &config.network.user_agent)?;
        Ok(Self::with_client(Arc::new(client), config))
    }

    /// Build a context around an existing client.
    pub fn with_client(client: Arc<dyn HttpClient>, config: ConfigFile) -> Self {
        let reference = Arc::new(
            ReferenceDatabase::new(Arc::clone(&client), &config.cache.directory)
                .with_base_url(config.reference.dat_base_url.clone()),
        );
        Self {
            client,
            config,
            reference,
        }
    }

    pub fn config(&self) -> &ConfigFile {
        &self.config
    }

    pub fn client(&self) -> Arc<dyn HttpClient> {
        Arc::clone(&self.client)
    }

    /// The listing cache rooted at the configured cache directory.
    pub fn listing_cache(&self) -> ListingCache {
        ListingCache::new(&self.config.cache.directory)
    }

    pub fn listing_config(&self) -> ListingConfig {
        ListingConfig::default()
            .with_max_age(self.config.cache.listing_ttl)
            .with_systems_timeout(self.config.network.systems_timeout)
            .with_games_timeout(self.config.network.games_timeout)
    }

    /// The listing adapter for `source`.
    pub fn site_adapter(&self, source: Source) -> SiteAdapter {
        let context = ListingContext::new(self.client(), self.listing_cache(), self.listing_config());
        SiteAdapter::new(source, context)
    }

    /// The reference database shared by every identifier from this context,
    /// so parsed dat files are reused.
    pub fn reference_database(&self) -> Arc<ReferenceDatabase> {
        Arc::clone(&self.reference)
    }

    pub fn identifier(&self) -> Identifier {
        Identifier::new(self.reference_database()).with_max_age(self.config.cache.dat_ttl)
    }

    pub fn downloader(&self) -> Downloader {
        let config = DownloadConfig::default().with_chunk_size(self.config.download.chunk_size);
        Downloader::with_config(self.client(), config)
    }
}

impl fmt::Debug for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Context")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::CacheKey;
    use crate::http::mock::MockHttpClient;
    use crate::listing::ListingSource;
    use std::time::Duration;
    use tempfile::TempDir;

    fn config(temp: &TempDir) -> ConfigFile {
        let mut config = ConfigFile::default();
        config.cache.directory = temp.path().join("cache");
        config.cache.listing_ttl = Duration::from_secs(120);
        config.download.chunk_size = 512;
        config.reference.dat_base_url = "https://dats.example.com/dat/".to_string();
        config
    }

    #[test]
    fn test_components_follow_config() {
        let temp = TempDir::new().unwrap();
        let ctx = Context::with_client(Arc::new(MockHttpClient::new()), config(&temp));

        assert_eq!(ctx.listing_cache().root(), temp.path().join("cache"));
        assert_eq!(ctx.listing_config().max_age, Duration::from_secs(120));
        assert_eq!(ctx.downloader().config().chunk_size, 512);
        assert_eq!(
            ctx.reference_database().dat_path("Nintendo - Game Boy"),
            temp.path().join("cache").join("libretrodb").join("Nintendo - Game Boy.dat")
        );
        assert_eq!(
            ctx.reference_database().dat_url("Nintendo - Game Boy").unwrap().as_str(),
            "https://dats.example.com/dat/Nintendo%20-%20Game%20Boy.dat"
        );
    }

    #[test]
    fn test_identifiers_share_one_database() {
        let temp = TempDir::new().unwrap();
        let ctx = Context::with_client(Arc::new(MockHttpClient::new()), config(&temp));

        let a = ctx.identifier();
        let b = ctx.identifier();
        assert!(std::ptr::eq(a.database(), b.database()));
    }

    #[test]
    fn test_site_adapter_uses_configured_cache() {
        let temp = TempDir::new().unwrap();
        let url = "https://myrient.erista.me/files/No-Intro/";
        let html = r#"<table><tr><td><a href="Sega%20-%2032X/">Sega - 32X/</a></td></tr></table>"#;
        let client = Arc::new(MockHttpClient::new().serve(url, html));
        let ctx = Context::with_client(client, config(&temp));

        let systems = ctx.site_adapter(Source::Myrient).list_systems("No-Intro");

        assert_eq!(systems, vec!["Sega%20-%2032X".to_string()]);
        let key = CacheKey::systems(Source::Myrient, "No-Intro");
        assert!(ctx.listing_cache().path_for(&key).exists());
    }
}
