//! romfetch CLI - Command-line interface
//!
//! This binary is a thin front end over the romfetch library: it parses
//! arguments, builds a [`Context`](romfetch::context::Context) from the
//! configuration file, and renders results and progress.

mod commands;
mod error;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};

use commands::cache::CacheAction;
use commands::config::ConfigCommands;
use error::CliError;

#[derive(Debug, Parser)]
#[command(name = "romfetch", version = romfetch::VERSION, about = "Browse, download and identify game archives")]
struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Also write logs to this file
    #[arg(long, global = true, value_name = "PATH")]
    log_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// List the systems of a collection
    Systems {
        /// Listing source (myrient, hshop)
        source: String,
        /// Collection name, e.g. No-Intro or 3DS
        collection: String,
    },

    /// List the games of one system
    Games {
        /// Listing source (myrient, hshop)
        source: String,
        /// Collection name
        collection: String,
        /// System identifier as printed by `systems`
        system: String,
        /// Only show entries of this region (USA, JAP, EUR, Other)
        #[arg(long)]
        region: Option<String>,
        /// Only show entries whose name contains this text (case-insensitive)
        #[arg(long)]
        filter: Option<String>,
    },

    /// Download a file, resuming a partial download at the destination
    Download {
        /// URL to download
        url: String,
        /// Destination file
        dest: PathBuf,
    },

    /// Identify a local file against the reference database of a system
    Identify {
        /// File to identify
        path: PathBuf,
        /// Reference system name, e.g. "Sega - 32X"
        system: String,
        /// Also check every checksum of the matched entry
        #[arg(long)]
        verify: bool,
    },

    /// Manage the listing cache
    Cache {
        #[command(subcommand)]
        action: CacheAction,
    },

    /// View or change configuration
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let _guard = match romfetch::logging::init_logging(cli.verbose, cli.log_file.as_deref()) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("Error: {}", CliError::from(e));
            return ExitCode::FAILURE;
        }
    };

    match run(cli.command) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "Command failed");
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(command: Commands) -> Result<(), CliError> {
    match command {
        Commands::Systems { source, collection } => commands::systems::run(&source, &collection),
        Commands::Games {
            source,
            collection,
            system,
            region,
            filter,
        } => commands::games::run(commands::games::GamesArgs {
            source,
            collection,
            system,
            region,
            filter,
        }),
        Commands::Download { url, dest } => commands::download::run(&url, &dest),
        Commands::Identify {
            path,
            system,
            verify,
        } => commands::identify::run(&path, &system, verify),
        Commands::Cache { action } => commands::cache::run(action),
        Commands::Config { command } => commands::config::run(command),
    }
}
