//! pmkit CLI
//!
//! Command-line tools for pmkit persistent regions.
//!
//! # Commands
//!
//! - `create` - Create a zeroed region file
//! - `inspect` - Display region layout, naming and log statistics
//! - `names` - List registered names
//! - `retrieve` / `register` / `deregister` - Edit the naming table
//! - `dump-log` - Dump log headers for debugging

mod commands;

use clap::{Parser, Subcommand};
use pmkit_core::{Config, PmAddr};
use pmkit_region::RegionSize;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// pmkit command-line region tools.
#[derive(Parser)]
#[command(name = "pmkit")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to the region file
    #[arg(global = true, short, long)]
    path: Option<PathBuf>,

    /// Bytes at the region start reserved for the naming table
    #[arg(global = true, long, default_value_t = Config::default().naming_bytes)]
    naming_bytes: usize,

    /// Enable verbose output
    #[arg(global = true, short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create a zeroed region file
    Create {
        /// Region size in bytes
        #[arg(short, long, default_value_t = 64 * 1024 * 1024)]
        size: u64,
    },

    /// Display region layout, naming and log statistics
    Inspect {
        /// Output format (text, json)
        #[arg(short, long, default_value = "text")]
        format: String,
    },

    /// List registered names
    Names {
        /// Output format (text, json)
        #[arg(short, long, default_value = "text")]
        format: String,
    },

    /// Print the address registered under an id
    Retrieve {
        /// Seed id
        id: String,
    },

    /// Register an id at an address
    Register {
        /// Seed id
        id: String,

        /// Address (decimal, or hex with a 0x prefix)
        #[arg(value_parser = commands::naming::parse_addr)]
        addr: PmAddr,
    },

    /// Remove an id
    Deregister {
        /// Seed id
        id: String,
    },

    /// Dump log headers for debugging
    DumpLog {
        /// Maximum number of headers to dump
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

    // Initialize logging
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let existing = Config::default()
        .region_size(RegionSize::WholeFile)
        .create_if_missing(false)
        .naming_bytes(cli.naming_bytes);

    match cli.command {
        Commands::Create { size } => {
            let path = cli.path.ok_or("Region path required for create")?;
            let config = Config::default()
                .region_size(RegionSize::Exact(size))
                .naming_bytes(cli.naming_bytes);
            commands::create::run(&path, config)?;
        }
        Commands::Inspect { format } => {
            let path = cli.path.ok_or("Region path required for inspect")?;
            commands::inspect::run(&path, existing, &format)?;
        }
        Commands::Names { format } => {
            let path = cli.path.ok_or("Region path required for names")?;
            commands::naming::list(&path, existing, &format)?;
        }
        Commands::Retrieve { id } => {
            let path = cli.path.ok_or("Region path required for retrieve")?;
            commands::naming::retrieve(&path, existing, &id)?;
        }
        Commands::Register { id, addr } => {
            let path = cli.path.ok_or("Region path required for register")?;
            commands::naming::register(&path, existing, &id, addr)?;
        }
        Commands::Deregister { id } => {
            let path = cli.path.ok_or("Region path required for deregister")?;
            commands::naming::deregister(&path, existing, &id)?;
        }
        Commands::DumpLog { limit, format } => {
            let path = cli.path.ok_or("Region path required for dump-log")?;
            commands::dump_log::run(&path, existing, limit, &format)?;
        }
        Commands::Version => {
            println!("pmkit CLI v{}", env!("CARGO_PKG_VERSION"));
            println!("pmkit Core v{}", pmkit_core::VERSION);
        }
    }

    Ok(())
}
