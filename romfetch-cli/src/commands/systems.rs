//! `systems` command.

use romfetch::listing::ListingSource;

use super::{load_context, parse_source, require_collection};
use crate::error::CliError;

/// Print the systems of a collection, one per line.
pub fn run(source: &str, collection: &str) -> Result<(), CliError> {
    let source = parse_source(source)?;
    require_collection(source, collection)?;

    let ctx = load_context()?;
    let systems = ctx.site_adapter(source).list_systems(collection);

    if systems.is_empty() {
        println!("No systems found for {} {}.", source, collection);
        return Ok(());
    }

    for system in &systems {
        println!("{}", system);
    }
    println!();
    println!("{} systems", systems.len());
    Ok(())
}
