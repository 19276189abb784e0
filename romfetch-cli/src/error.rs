//! CLI error type.

use romfetch::cache::CacheError;
use romfetch::config::ConfigError;
use romfetch::download::DownloadError;
use romfetch::http::HttpError;
use romfetch::logging::LoggingError;
use romfetch::reference::ReferenceError;
use thiserror::Error;

/// Errors surfaced to the user by a command.
#[derive(Debug, Error)]
pub enum CliError {
    /// Bad configuration or command-line input.
    #[error("{0}")]
    Config(String),

    #[error(transparent)]
    ConfigFile(#[from] ConfigError),

    #[error("failed to start logging: {0}")]
    Logging(#[from] LoggingError),

    #[error(transparent)]
    Http(#[from] HttpError),

    #[error(transparent)]
    Download(#[from] DownloadError),

    #[error(transparent)]
    Reference(#[from] ReferenceError),

    #[error("cache clear failed: {0}")]
    CacheClear(CacheError),

    #[error("cache stats failed: {0}")]
    CacheStats(CacheError),

    #[error("failed to install Ctrl-C handler: {0}")]
    Signal(String),
}
