//! Persistent user configuration.
//!
//! Settings live in an INI file at `~/.romfetch/config.ini`:
//!
//! ```ini
//! [cache]
//! directory = ~/.romfetch/cache
//! listing_ttl_secs = 86400
//! dat_ttl_secs = 86400
//!
//! [network]
//! connect_timeout_secs = 10
//! systems_timeout_secs = 10
//! games_timeout_secs = 15
//! user_agent = romfetch/0.1.0
//!
//! [reference]
//! dat_base_url = https://raw.githubusercontent.com/libretro/libretro-database/master/dat/
//!
//! [download]
//! chunk_size = 8192
//! ```
//!
//! A missing file yields the defaults. Unknown keys are ignored. Every
//! recognised key is addressable as `section.key` through [`ConfigKey`].

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use ini::Ini;
use thiserror::Error;
use url::Url;

use crate::cache::DEFAULT_MAX_AGE;
use crate::download::DEFAULT_CHUNK_SIZE;
use crate::http::{DEFAULT_CONNECT_TIMEOUT_SECS, DEFAULT_USER_AGENT};
use crate::reference::DEFAULT_DAT_BASE_URL;

/// Name of the per-user configuration directory under the home directory.
const CONFIG_DIR_NAME: &str = ".romfetch";

/// Name of the configuration file.
const CONFIG_FILE_NAME: &str = "config.ini";

/// Errors raised while loading, saving or editing configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The configuration file could not be read or written.
    #[error("failed to access {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// The configuration file is not valid INI.
    #[error("failed to parse {path}: {reason}")]
    Parse { path: PathBuf, reason: String },

    /// A key holds a value of the wrong shape.
    #[error("invalid value '{value}' for {key}: {reason}")]
    InvalidValue {
        key: String,
        value: String,
        reason: String,
    },

    /// A `section.key` name that is not recognised.
    #[error("unknown configuration key '{0}'")]
    UnknownKey(String),
}

/// `[cache]` section.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheSettings {
    /// Root for listing records and dat files.
    pub directory: PathBuf,
    /// Maximum age of a cached listing.
    pub listing_ttl: Duration,
    /// Maximum age of a cached dat file.
    pub dat_ttl: Duration,
}

/// `[network]` section.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NetworkSettings {
    pub connect_timeout: Duration,
    /// Timeout for system-list pages.
    pub systems_timeout: Duration,
    /// Timeout for game-list pages.
    pub games_timeout: Duration,
    pub user_agent: String,
}

/// `[reference]` section.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReferenceSettings {
    /// Directory URL holding `<system>.dat` files. Always ends with `/`.
    pub dat_base_url: String,
}

/// `[download]` section.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadSettings {
    pub chunk_size: usize,
}

/// The full configuration file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigFile {
    pub cache: CacheSettings,
    pub network: NetworkSettings,
    pub reference: ReferenceSettings,
    pub download: DownloadSettings,
}

impl Default for ConfigFile {
    fn default() -> Self {
        Self {
            cache: CacheSettings {
                directory: config_directory().join("cache"),
                listing_ttl: DEFAULT_MAX_AGE,
                dat_ttl: DEFAULT_MAX_AGE,
            },
            network: NetworkSettings {
                connect_timeout: Duration::from_secs(DEFAULT_CONNECT_TIMEOUT_SECS),
                systems_timeout: Duration::from_secs(10),
                games_timeout: Duration::from_secs(15),
                user_agent: DEFAULT_USER_AGENT.to_string(),
            },
            reference: ReferenceSettings {
                dat_base_url: DEFAULT_DAT_BASE_URL.to_string(),
            },
            download: DownloadSettings {
                chunk_size: DEFAULT_CHUNK_SIZE,
            },
        }
    }
}

impl ConfigFile {
    /// Load from the default location, falling back to defaults when the
    /// file does not exist.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(&config_file_path())
    }

    /// Load from `path`, falling back to defaults when it does not exist.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        if !path.exists() {
            tracing::debug!(path = %path.display(), "No configuration file, using defaults");
            return Ok(config);
        }

        let ini = Ini::load_from_file(path).map_err(|e| match e {
            ini::Error::Io(source) => ConfigError::Io {
                path: path.to_path_buf(),
                source,
            },
            ini::Error::Parse(err) => ConfigError::Parse {
                path: path.to_path_buf(),
                reason: err.to_string(),
            },
        })?;

        for key in ConfigKey::all() {
            if let Some(value) = ini.get_from(Some(key.section()), key.key_name()) {
                key.set(&mut config, value)?;
            }
        }

        Ok(config)
    }

    /// Save to the default location.
    pub fn save(&self) -> Result<(), ConfigError> {
        self.save_to(&config_file_path())
    }

    /// Write every key to `path`, creating its directory if needed.
    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        let io_err = |source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        };

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(io_err)?;
        }

        let mut ini = Ini::new();
        for key in ConfigKey::all() {
            ini.with_section(Some(key.section()))
                .set(key.key_name(), key.get(self));
        }
        ini.write_to_file(path).map_err(io_err)?;

        tracing::info!(path = %path.display(), "Saved configuration");
        Ok(())
    }
}

/// A configuration entry addressable as `section.key`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConfigKey {
    CacheDirectory,
    CacheListingTtl,
    CacheDatTtl,
    NetworkConnectTimeout,
    NetworkSystemsTimeout,
    NetworkGamesTimeout,
    NetworkUserAgent,
    ReferenceDatBaseUrl,
    DownloadChunkSize,
}

impl ConfigKey {
    /// Every key, in file order.
    pub fn all() -> &'static [ConfigKey] {
        &[
            ConfigKey::CacheDirectory,
            ConfigKey::CacheListingTtl,
            ConfigKey::CacheDatTtl,
            ConfigKey::NetworkConnectTimeout,
            ConfigKey::NetworkSystemsTimeout,
            ConfigKey::NetworkGamesTimeout,
            ConfigKey::NetworkUserAgent,
            ConfigKey::ReferenceDatBaseUrl,
            ConfigKey::DownloadChunkSize,
        ]
    }

    pub fn section(self) -> &'static str {
        match self {
            ConfigKey::CacheDirectory | ConfigKey::CacheListingTtl | ConfigKey::CacheDatTtl => {
                "cache"
            }
            ConfigKey::NetworkConnectTimeout
            | ConfigKey::NetworkSystemsTimeout
            | ConfigKey::NetworkGamesTimeout
            | ConfigKey::NetworkUserAgent => "network",
            ConfigKey::ReferenceDatBaseUrl => "reference",
            ConfigKey::DownloadChunkSize => "download",
        }
    }

    pub fn key_name(self) -> &'static str {
        match self {
            ConfigKey::CacheDirectory => "directory",
            ConfigKey::CacheListingTtl => "listing_ttl_secs",
            ConfigKey::CacheDatTtl => "dat_ttl_secs",
            ConfigKey::NetworkConnectTimeout => "connect_timeout_secs",
            ConfigKey::NetworkSystemsTimeout => "systems_timeout_secs",
            ConfigKey::NetworkGamesTimeout => "games_timeout_secs",
            ConfigKey::NetworkUserAgent => "user_agent",
            ConfigKey::ReferenceDatBaseUrl => "dat_base_url",
            ConfigKey::DownloadChunkSize => "chunk_size",
        }
    }

    /// Full `section.key` name.
    pub fn name(self) -> String {
        format!("{}.{}", self.section(), self.key_name())
    }

    /// Current value rendered as it is stored in the file.
    pub fn get(self, config: &ConfigFile) -> String {
        match self {
            ConfigKey::CacheDirectory => config.cache.directory.display().to_string(),
            ConfigKey::CacheListingTtl => config.cache.listing_ttl.as_secs().to_string(),
            ConfigKey::CacheDatTtl => config.cache.dat_ttl.as_secs().to_string(),
            ConfigKey::NetworkConnectTimeout => config.network.connect_timeout.as_secs().to_string(),
            ConfigKey::NetworkSystemsTimeout => config.network.systems_timeout.as_secs().to_string(),
            ConfigKey::NetworkGamesTimeout => config.network.games_timeout.as_secs().to_string(),
            ConfigKey::NetworkUserAgent => config.network.user_agent.clone(),
            ConfigKey::ReferenceDatBaseUrl => config.reference.dat_base_url.clone(),
            ConfigKey::DownloadChunkSize => config.download.chunk_size.to_string(),
        }
    }

    /// Parse `value` and store it in `config`.
    pub fn set(self, config: &mut ConfigFile, value: &str) -> Result<(), ConfigError> {
        let value = value.trim();
        let invalid = |reason: &str| ConfigError::InvalidValue {
            key: self.name(),
            value: value.to_string(),
            reason: reason.to_string(),
        };
        let secs = || {
            value
                .parse::<u64>()
                .map(Duration::from_secs)
                .map_err(|_| invalid("expected a whole number of seconds"))
        };

        match self {
            ConfigKey::CacheDirectory => {
                if value.is_empty() {
                    return Err(invalid("directory must not be empty"));
                }
                config.cache.directory = expand_tilde(value);
            }
            ConfigKey::CacheListingTtl => config.cache.listing_ttl = secs()?,
            ConfigKey::CacheDatTtl => config.cache.dat_ttl = secs()?,
            ConfigKey::NetworkConnectTimeout => config.network.connect_timeout = secs()?,
            ConfigKey::NetworkSystemsTimeout => config.network.systems_timeout = secs()?,
            ConfigKey::NetworkGamesTimeout => config.network.games_timeout = secs()?,
            ConfigKey::NetworkUserAgent => {
                if value.is_empty() {
                    return Err(invalid("user agent must not be empty"));
                }
                config.network.user_agent = value.to_string();
            }
            ConfigKey::ReferenceDatBaseUrl => {
                let mut url = Url::parse(value).map_err(|e| invalid(&e.to_string()))?;
                if !url.path().ends_with('/') {
                    let path = format!("{}/", url.path());
                    url.set_path(&path);
                }
                config.reference.dat_base_url = url.to_string();
            }
            ConfigKey::DownloadChunkSize => {
                config.download.chunk_size = value
                    .parse::<usize>()
                    .ok()
                    .filter(|&n| n > 0)
                    .ok_or_else(|| invalid("expected a positive number of bytes"))?;
            }
        }
        Ok(())
    }
}

impl fmt::Display for ConfigKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.section(), self.key_name())
    }
}

impl FromStr for ConfigKey {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase();
        ConfigKey::all()
            .iter()
            .copied()
            .find(|key| key.name() == wanted)
            .ok_or_else(|| ConfigError::UnknownKey(s.to_string()))
    }
}

/// `~/.romfetch`, or `./.romfetch` when no home directory is known.
pub fn config_directory() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(CONFIG_DIR_NAME)
}

/// `~/.romfetch/config.ini`.
pub fn config_file_path() -> PathBuf {
    config_directory().join(CONFIG_FILE_NAME)
}

fn expand_tilde(value: &str) -> PathBuf {
    match value.strip_prefix("~/") {
        Some(rest) => match dirs::home_dir() {
            Some(home) => home.join(rest),
            None => PathBuf::from(value),
        },
        None => PathBuf::from(value),
    }
}

/// Human-readable byte count, e.g. `1.5 MB`.
pub fn format_size(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;

    if bytes >= GB {
        format!("{:.1} GB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.1} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.1} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} B", bytes)
    }
}
