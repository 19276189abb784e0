//! Listing cache CLI commands.

use clap::Subcommand;
use romfetch::config::{format_size, ConfigFile};
use romfetch::context::Context;

use crate::error::CliError;

/// Cache action subcommands.
#[derive(Debug, Subcommand)]
pub enum CacheAction {
    /// Remove every cached listing
    Clear,
    /// Show listing cache statistics
    Stats,
}

/// Run a cache subcommand.
///
/// Only the listing cache is touched; downloaded dat files are refreshed by
/// age and are left alone.
pub fn run(action: CacheAction) -> Result<(), CliError> {
    let ctx = Context::new(ConfigFile::load()?)?;
    let cache = ctx.listing_cache();

    match action {
        CacheAction::Clear => {
            println!("Clearing listing cache at: {}", cache.root().display());
            let result = cache.clear().map_err(CliError::CacheClear)?;
            println!(
                "Deleted {} files, freed {}",
                result.files_deleted,
                format_size(result.bytes_freed)
            );
        }
        CacheAction::Stats => {
            println!("Listing cache: {}", cache.root().display());
            let stats = cache.stats().map_err(CliError::CacheStats)?;
            println!("  Listings: {}", stats.records);
            println!("  Size:     {}", format_size(stats.bytes));
        }
    }
    Ok(())
}
