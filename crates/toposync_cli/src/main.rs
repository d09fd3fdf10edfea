//! toposync CLI
//!
//! Command-line tools for the toposync topology reconciler.
//!
//! # Commands
//!
//! - `replay` - Replay a node event log and print the resulting store
//! - `version` - Show version information

mod commands;

use clap::{Parser, Subcommand};
use commands::replay::ReplayArgs;
use tracing_subscriber::EnvFilter;

/// toposync command-line tools.
#[derive(Parser)]
#[command(name = "toposync")]
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
    /// Replay a node event log through the reconciler
    Replay(ReplayArgs),

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
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Replay(args) => {
            commands::replay::run(&args)?;
        }
        Commands::Version => {
            println!("toposync CLI v{}", env!("CARGO_PKG_VERSION"));
            println!("toposync core v{}", toposync_core::VERSION);
            println!("toposync store v{}", toposync_store::VERSION);
        }
    }

    Ok(())
}
