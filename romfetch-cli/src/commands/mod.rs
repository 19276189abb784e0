//! Command implementations and the helpers they share.

pub mod cache;
pub mod config;
pub mod download;
pub mod games;
pub mod identify;
pub mod systems;

use romfetch::config::ConfigFile;
use romfetch::context::Context;
use romfetch::listing::Source;

use crate::error::CliError;

/// Load the configuration file and build a context around a real client.
fn load_context() -> Result<Context, CliError> {
    let config = ConfigFile::load()?;
    Ok(Context::new(config)?)
}

/// Parse a source name, listing the valid choices on failure.
fn parse_source(name: &str) -> Result<Source, CliError> {
    name.parse().map_err(|_| {
        let known: Vec<String> = Source::ALL.iter().map(|s| s.slug().to_string()).collect();
        CliError::Config(format!(
            "Unknown source '{}'. Expected one of: {}",
            name,
            known.join(", ")
        ))
    })
}

/// Reject a collection the source does not know, listing the valid ones.
fn require_collection(source: Source, collection: &str) -> Result<(), CliError> {
    if source.collection_url(collection).is_some() {
        return Ok(());
    }
    let known: Vec<&str> = source.collections().iter().map(|(name, _)| *name).collect();
    Err(CliError::Config(format!(
        "Unknown {} collection '{}'. Expected one of: {}",
        source,
        collection,
        known.join(", ")
    )))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_source() {
        assert_eq!(parse_source("MYRIENT").unwrap(), Source::Myrient);
        let err = parse_source("ftp").unwrap_err().to_string();
        assert!(err.contains("myrient, hshop"));
    }

    #[test]
    fn test_require_collection() {
        assert!(require_collection(Source::Myrient, "Redump").is_ok());
        let err = require_collection(Source::HShop, "Redump").unwrap_err().to_string();
        assert!(err.contains("3DS"));
    }
}
