//! `identify` command.

use std::path::Path;

use romfetch::reference::Identification;

use super::load_context;
use crate::error::CliError;

/// Identify `path` against the reference dat of `system`.
pub fn run(path: &Path, system: &str, verify: bool) -> Result<(), CliError> {
    let identifier = load_context()?.identifier();

    let Some(found) = identifier.identify(path, system)? else {
        println!("No match for {} in {}", path.display(), system);
        return Ok(());
    };

    print_identification(&found);

    if verify {
        let verified = identifier.verify(path, &found.entry)?;
        println!(
            "  Checksums:    {}",
            if verified { "verified" } else { "MISMATCH" }
        );
    }

    Ok(())
}

fn print_identification(found: &Identification) {
    let entry = &found.entry;
    println!("{}", entry.name);
    println!("  Matched by:   {}", found.matched_by);
    if let Some(description) = &entry.description {
        println!("  Description:  {}", description);
    }
    if let Some(year) = &entry.year {
        println!("  Year:         {}", year);
    }
    if let Some(manufacturer) = &entry.manufacturer {
        println!("  Manufacturer: {}", manufacturer);
    }
}
