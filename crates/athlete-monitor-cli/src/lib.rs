//! Athlete Monitor CLI
//!
//! Command-line driver for the simulated athlete vital-sign monitor.
//!
//! # Features
//!
//! - **run**: Tick the default squad and print each snapshot
//! - **ranges**: Show or validate a vital range table
//! - **version**: Display version information
//!
//! # Usage
//!
//! ```bash
//! # Ten ticks at one-second cadence, reproducible
//! athlete-monitor run --ticks 10 --seed 42
//!
//! # Fast run with the reference infection advisor and JSON output
//! athlete-monitor run --ticks 120 --interval 50 --advisor --format json
//!
//! # Validate a custom range table
//! athlete-monitor ranges --file ranges.json
//! ```

use clap::{Parser, Subcommand};

pub mod monitor;

/// Athlete Monitor Command Line Interface
#[derive(Parser, Debug)]
#[command(name = "athlete-monitor")]
#[command(author, version, about = "Simulated athlete vital signs with health status classification")]
#[command(propagate_version = true)]
pub struct Cli {
    /// Command to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Top-level commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the simulation for the default squad
    Run(monitor::RunArgs),

    /// Show or validate a vital range table
    Ranges(monitor::RangesArgs),

    /// Display version information
    Version,
}
