//! `games` command.

use romfetch::listing::{ListingEntry, ListingSource, Region};

use super::{load_context, parse_source, require_collection};
use crate::error::CliError;

/// Arguments of the `games` command.
#[derive(Debug)]
pub struct GamesArgs {
    pub source: String,
    pub collection: String,
    pub system: String,
    pub region: Option<String>,
    pub filter: Option<String>,
}

/// Print the entries of a system as a table.
pub fn run(args: GamesArgs) -> Result<(), CliError> {
    let source = parse_source(&args.source)?;
    require_collection(source, &args.collection)?;
    let region = args.region.as_deref().map(parse_region).transpose()?;

    let ctx = load_context()?;
    let games = ctx
        .site_adapter(source)
        .list_games(&args.collection, &args.system);
    let shown = select(&games, region, args.filter.as_deref());

    if shown.is_empty() {
        println!("No games found.");
        return Ok(());
    }

    let name_width = shown.iter().map(|g| g.name.chars().count()).max().unwrap_or(4).min(70);
    println!(
        "{:<name_width$}  {:>10}  {:<6}  {:<4}",
        "Name", "Size", "Region", "Year"
    );
    for game in &shown {
        println!(
            "{:<name_width$}  {:>10}  {:<6}  {:<4}",
            game.name,
            game.size,
            game.region.label(),
            game.year
        );
    }
    println!();
    println!("{} of {} entries", shown.len(), games.len());
    Ok(())
}

fn parse_region(value: &str) -> Result<Region, CliError> {
    match value.to_ascii_uppercase().as_str() {
        "USA" => Ok(Region::Usa),
        "JAP" => Ok(Region::Jap),
        "EUR" => Ok(Region::Eur),
        "OTHER" => Ok(Region::Other),
        _ => Err(CliError::Config(format!(
            "Unknown region '{}'. Expected one of: USA, JAP, EUR, Other",
            value
        ))),
    }
}

/// Entries matching the region and a case-insensitive name filter.
fn select<'a>(
    games: &'a [ListingEntry],
    region: Option<Region>,
    filter: Option<&str>,
) -> Vec<&'a ListingEntry> {
    let needle = filter.map(str::to_lowercase);
    games
        .iter()
        .filter(|g| region.map_or(true, |r| g.region == r))
        .filter(|g| {
            needle
                .as_deref()
                .map_or(true, |n| g.name.to_lowercase().contains(n))
        })
        .collect()
}
