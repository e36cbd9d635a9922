//! Eventide CLI
//!
//! Command-line tools for exploring Eventide journals and buses.
//!
//! # Commands
//!
//! - `demo` - Run a product catalog through a journal, publisher and topic
//! - `stream` - Load entries from a JSON file and materialize a stream
//! - `stress` - Run concurrent write, read and publish stress tests
//! - `version` - Show version information

mod commands;

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Eventide command-line tools.
#[derive(Parser)]
#[command(name = "eventide")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(global = true, short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Define products, publish their events and print what subscribers see
    Demo {
        /// Number of products to define
        #[arg(short, long, default_value = "3")]
        products: usize,

        /// Only publish the product category instead of the whole journal
        #[arg(short, long)]
        category: bool,

        /// Output format (text, json)
        #[arg(short, long, default_value = "text")]
        format: String,
    },

    /// Load entries from a JSON file and materialize a stream
    Stream {
        /// JSON file holding an array of entries
        #[arg(short, long)]
        input: PathBuf,

        /// Stream to materialize; `cat-<key>` reads a category, `*` the whole journal
        name: String,

        /// Output format (text, json)
        #[arg(short, long, default_value = "text")]
        format: String,
    },

    /// Run stress tests against an in-memory journal and topic
    Stress {
        /// Number of operations per test
        #[arg(short, long, default_value = "10000")]
        operations: usize,

        /// Number of concurrent threads
        #[arg(short, long, default_value = "4")]
        threads: usize,

        /// Entries per written batch
        #[arg(short, long, default_value = "1")]
        batch_size: usize,
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

    match cli.command {
        Commands::Demo {
            products,
            category,
            format,
        } => {
            commands::demo::run(products, category, &format)?;
        }
        Commands::Stream {
            input,
            name,
            format,
        } => {
            commands::stream::run(&input, &name, &format)?;
        }
        Commands::Stress {
            operations,
            threads,
            batch_size,
        } => {
            commands::stress::run(operations, threads, batch_size)?;
        }
        Commands::Version => {
            println!("Eventide CLI v{}", env!("CARGO_PKG_VERSION"));
        }
    }

    Ok(())
}
