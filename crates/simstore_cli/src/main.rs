//! simstore CLI
//!
//! Command-line tools for simstore snapshots.
//!
//! # Commands
//!
//! - `inspect` - Display snapshot counters and store statistics
//! - `verify` - Check snapshot integrity
//! - `dump` - Print the records of a store

mod commands;

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// simstore snapshot tools.
#[derive(Parser)]
#[command(name = "simstore")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Storage directory holding saved.json
    #[arg(global = true, short, long)]
    path: Option<PathBuf>,

    /// Enable verbose output
    #[arg(global = true, short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Display snapshot counters and store statistics
    Inspect {
        /// Show per-store statistics
        #[arg(short, long)]
        stores: bool,

        /// Output format (text, json)
        #[arg(short, long, default_value = "text")]
        format: String,
    },

    /// Check snapshot integrity
    Verify,

    /// Print the records of a store
    Dump {
        /// Qualified store code (e.g. acme/blog/posts)
        #[arg(short, long)]
        store: String,

        /// Maximum number of records to print
        #[arg(short, long)]
        limit: Option<usize>,

        /// Output format (text, json)
        #[arg(short, long, default_value = "text")]
        format: String,
    },

    /// Show version information
    Version,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    match cli.command {
        Commands::Inspect { stores, format } => {
            let path = cli.path.ok_or("Storage path required for inspect")?;
            commands::inspect::run(&path, stores, &format)?;
        }
        Commands::Verify => {
            let path = cli.path.ok_or("Storage path required for verify")?;
            commands::verify::run(&path)?;
        }
        Commands::Dump {
            store,
            limit,
            format,
        } => {
            let path = cli.path.ok_or("Storage path required for dump")?;
            commands::dump::run(&path, &store, limit, &format)?;
        }
        Commands::Version => {
            println!("simstore CLI v{}", env!("CARGO_PKG_VERSION"));
            println!("simstore core v{}", simstore_core::VERSION);
        }
    }

    Ok(())
}
